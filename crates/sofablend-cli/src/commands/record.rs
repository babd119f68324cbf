//! `sofablend record`: serve a live stream and bake it to disk.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Args;
use log::info;
use sofablend_io::bake::{BakeExporter, ExportOptions, SelectionRule, Timing};
use sofablend_io::{ApplyReport, LiveMessage};
use sofablend_server::{MessageHandler, SceneSink, ServerError, ServerSession};

use super::ServerArgs;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Directory to bake into (wiped first)
    pub dir: PathBuf,
    #[command(flatten)]
    pub server: ServerArgs,
    /// Frames per second of the bake
    #[arg(long)]
    pub fps: Option<f64>,
    /// Clock driving frame emission: simulation or realtime
    #[arg(long)]
    pub timing: Option<Timing>,
    /// Bake every object with all its geometry, ignoring the selection
    #[arg(long)]
    pub all_objects: bool,
}

impl RecordArgs {
    pub fn export_options(&self, mut options: ExportOptions) -> ExportOptions {
        options.base_dir = self.dir.clone();
        if let Some(fps) = self.fps {
            options.fps = fps;
        }
        if let Some(timing) = self.timing {
            options.timing = timing;
        }
        if self.all_objects {
            options.selection = vec![SelectionRule::new("*")];
        }
        options
    }
}

/// Applies live messages to a scene and bakes each one as a simulation step.
///
/// The export starts with the first message, whose tree becomes the
/// manifest. Objects showing up in later messages are added to it. Each
/// message counts as one step of one frame period.
pub struct RecordSink {
    sink: SceneSink,
    options: ExportOptions,
    exporter: Mutex<Option<BakeExporter>>,
}

impl RecordSink {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            sink: SceneSink::new(),
            options,
            exporter: Mutex::new(None),
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.exporter
            .lock()
            .ok()
            .and_then(|exporter| exporter.as_ref().map(BakeExporter::frames_written))
            .unwrap_or(0)
    }
}

impl MessageHandler for RecordSink {
    fn handle(&self, message: LiveMessage) -> sofablend_server::Result<ApplyReport> {
        let root = message.root.with_synthesized_paths();
        let report = self.sink.handle(message)?;

        let mut exporter = self.exporter.lock().map_err(|_| ServerError::Poisoned)?;
        if exporter.is_none() {
            *exporter = Some(BakeExporter::new(&root, &self.options)?);
        }
        if let Some(exporter) = exporter.as_mut() {
            exporter.refresh(&root)?;
            exporter.step(&root, self.options.fps.recip())?;
        }
        Ok(report)
    }
}

pub fn run(settings: &Settings, args: RecordArgs) -> Result<()> {
    let options = args.server.apply(settings.server.clone());
    let export = args.export_options(settings.export.clone());
    let sink = Arc::new(RecordSink::new(export));

    let session = ServerSession::start(options, Arc::clone(&sink) as Arc<dyn MessageHandler>)?;
    println!(
        "recording on {} into '{}'; type 'quit' to stop",
        session.local_addr(),
        args.dir.display()
    );

    for line in io::stdin().lock().lines() {
        if matches!(line?.trim(), "quit" | "exit") {
            break;
        }
    }

    session.stop();
    info!("wrote {} frames to {}", sink.frames_written(), args.dir.display());
    Ok(())
}
