//! `sofablend serve`: a console controlling the live server.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use log::error;
use sofablend_server::{lock_scene, MessageHandler, SceneSink, ServerOptions, ServerSession, SharedScene};

use super::ServerArgs;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Start listening immediately
    #[arg(long)]
    pub start: bool,
}

/// A line typed on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Status,
    Outline,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "status" => Self::Status,
            "outline" => Self::Outline,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

const HELP: &str = "commands: start, stop, status, outline, help, quit";

/// Owns the optional running session and the live scene it feeds.
pub struct Console {
    options: ServerOptions,
    handler: Arc<dyn MessageHandler>,
    scene: SharedScene,
    session: Option<ServerSession>,
}

impl Console {
    pub fn new(options: ServerOptions) -> Self {
        let sink = SceneSink::new();
        let scene = sink.scene();
        Self {
            options,
            handler: Arc::new(sink),
            scene,
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(ServerSession::is_running)
    }

    /// Run one command, writing its reply to `out`. Returns `false` on quit.
    pub fn execute(&mut self, command: ConsoleCommand, out: &mut impl Write) -> Result<bool> {
        match command {
            ConsoleCommand::Start => {
                if let Some(session) = &self.session {
                    writeln!(out, "already running on {}", session.local_addr())?;
                } else {
                    match ServerSession::start(self.options.clone(), Arc::clone(&self.handler)) {
                        Ok(session) => {
                            writeln!(out, "listening on {}", session.local_addr())?;
                            self.session = Some(session);
                        }
                        Err(e) => {
                            error!("{e}");
                            writeln!(out, "failed to start: {e}")?;
                        }
                    }
                }
            }
            ConsoleCommand::Stop => match self.session.take() {
                Some(session) => {
                    session.stop();
                    writeln!(out, "stopped")?;
                }
                None => writeln!(out, "not running")?,
            },
            ConsoleCommand::Status => {
                let scene = lock_scene(&self.scene)?;
                let state = match &self.session {
                    Some(session) => format!("running on {}", session.local_addr()),
                    None => "stopped".to_string(),
                };
                let iteration = scene
                    .last_iteration
                    .map_or_else(|| "none".to_string(), |i| i.to_string());
                writeln!(
                    out,
                    "{state}; last iteration {iteration}; {} collections, {} objects",
                    scene.graph.collection_count(),
                    scene.graph.object_count()
                )?;
            }
            ConsoleCommand::Outline => {
                let scene = lock_scene(&self.scene)?;
                write!(out, "{}", scene.graph.outline())?;
            }
            ConsoleCommand::Help => writeln!(out, "{HELP}")?,
            ConsoleCommand::Empty => {}
            ConsoleCommand::Unknown(other) => writeln!(out, "unknown command '{other}'; {HELP}")?,
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Stop the session, if any.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }
}

pub fn run(settings: &Settings, args: ServeArgs) -> Result<()> {
    let options = args.server.apply(settings.server.clone());
    let auto_start = options.auto_start || args.start;
    let mut console = Console::new(options);
    let mut stdout = io::stdout();

    if auto_start {
        console.execute(ConsoleCommand::Start, &mut stdout)?;
    }
    writeln!(stdout, "{HELP}")?;

    for line in io::stdin().lock().lines() {
        if !console.execute(ConsoleCommand::parse(&line?), &mut stdout)? {
            break;
        }
        stdout.flush()?;
    }

    console.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ServerOptions {
        ServerOptions::new().with_host("127.0.0.1").with_port(0).with_read_timeout_ms(20)
    }

    fn run_line(console: &mut Console, line: &str) -> (bool, String) {
        let mut out = Vec::new();
        let keep_going = console.execute(ConsoleCommand::parse(line), &mut out).unwrap();
        (keep_going, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse() {
        assert_eq!(ConsoleCommand::parse("  start \n"), ConsoleCommand::Start);
        assert_eq!(ConsoleCommand::parse("exit"), ConsoleCommand::Quit);
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("go"), ConsoleCommand::Unknown("go".into()));
    }

    #[test]
    fn test_start_stop_cycle() {
        let mut console = Console::new(options());
        assert!(run_line(&mut console, "start").1.starts_with("listening on 127.0.0.1:"));
        assert!(console.is_running());
        assert!(run_line(&mut console, "start").1.starts_with("already running"));
        assert!(run_line(&mut console, "status").1.starts_with("running on"));

        assert_eq!(run_line(&mut console, "stop").1, "stopped\n");
        assert!(!console.is_running());
        assert_eq!(run_line(&mut console, "stop").1, "not running\n");
        assert_eq!(
            run_line(&mut console, "status").1,
            "stopped; last iteration none; 0 collections, 0 objects\n"
        );
    }

    #[test]
    fn test_quit() {
        let mut console = Console::new(options());
        assert!(run_line(&mut console, "outline").0);
        assert!(!run_line(&mut console, "quit").0);
    }
}
