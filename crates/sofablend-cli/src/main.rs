//! `sofablend` - mirror SOFA simulations into a scene graph.
//!
//! Run with: sofablend [--config sofablend.toml] <command>

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};

use crate::commands::{import, record, replay, serve};
use crate::config::Settings;

#[derive(Debug, Parser)]
#[command(name = "sofablend", version, about = "Mirror SOFA simulations into a scene graph")]
struct Cli {
    /// Settings file (defaults to ./sofablend.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the live server with an interactive console
    Serve(serve::ServeArgs),
    /// Import bake directories and print the scene
    Import(import::ImportArgs),
    /// Stream a bake to a running server
    Replay(replay::ReplayArgs),
    /// Serve a live stream and bake it to disk
    Record(record::RecordArgs),
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(args) => serve::run(&settings, args),
        Command::Import(args) => import::run(&settings, args),
        Command::Replay(args) => replay::run(&settings, args),
        Command::Record(args) => record::run(&settings, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "sofablend", "--config", "s.toml", "record", "out", "--port", "4000", "--timing", "realtime", "--all-objects",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("s.toml")));
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.dir, PathBuf::from("out"));
        assert_eq!(args.server.port, Some(4000));
        assert_eq!(args.timing, Some(sofablend_io::bake::Timing::Realtime));
        assert!(args.all_objects);
    }

    #[test]
    fn test_parse_import_frame() {
        let cli = Cli::try_parse_from(["sofablend", "import", "a", "b", "--frame", "12"]).unwrap();
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.dirs.len(), 2);
        assert_eq!(args.frame, 12);
    }
}
