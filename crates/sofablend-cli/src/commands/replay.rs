//! `sofablend replay`: stream a bake to a running server as live messages.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use sofablend_io::bake::BakeDirectory;
use sofablend_io::{LiveMessage, SourceNode};
use sofablend_server::StreamClient;

use super::ServerArgs;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Bake directory to stream
    pub dir: PathBuf,
    #[command(flatten)]
    pub server: ServerArgs,
    /// Number of frames to send; defaults to every frame present
    #[arg(long)]
    pub frames: Option<u64>,
    /// Frames per second; defaults to the export setting
    #[arg(long)]
    pub fps: Option<f64>,
}

/// The live message carrying every object's geometry at `frame`, or `None`
/// when the bake holds no file for that frame.
pub fn frame_message(bake: &BakeDirectory, frame: u64) -> Result<Option<LiveMessage>> {
    let mut root = bake.manifest().clone();
    let filled = fill(&mut root, bake, frame)?;
    Ok((filled > 0).then(|| LiveMessage::new(frame, root)))
}

fn fill(node: &mut SourceNode, bake: &BakeDirectory, frame: u64) -> Result<usize> {
    let mut filled = 0;
    for object in &mut node.objects {
        let Some(path) = object.path.as_deref() else {
            continue;
        };
        if let Some(payload) = bake.read_frame(path, frame)? {
            object.fields = payload.fields;
            filled += 1;
        }
    }
    for child in &mut node.children {
        filled += fill(child, bake, frame)?;
    }
    Ok(filled)
}

pub fn run(settings: &Settings, args: ReplayArgs) -> Result<()> {
    let fps = args.fps.unwrap_or(settings.export.fps);
    if fps.is_nan() || fps <= 0.0 {
        bail!("fps must be positive, got {fps}");
    }
    let bake = BakeDirectory::open(&args.dir)
        .with_context(|| format!("failed to open bake '{}'", args.dir.display()))?;
    let address = args.server.apply(settings.server.clone()).address();
    let mut client =
        StreamClient::connect(&address).with_context(|| format!("failed to connect to {address}"))?;
    info!("replaying '{}' to {address} at {fps} fps", bake.name());

    let period = Duration::from_secs_f64(fps.recip());
    let mut sent = 0;
    while args.frames.map_or(true, |limit| sent < limit) {
        let Some(message) = frame_message(&bake, sent)? else {
            break;
        };
        client.send(&message)?;
        sent += 1;
        thread::sleep(period);
    }

    info!("sent {sent} frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sofablend_io::bake::BakeWriter;
    use sofablend_io::{FramePayload, SourceObject};

    #[test]
    fn test_frame_message_fills_objects() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = BakeWriter::create(tmp.path()).unwrap();
        let manifest = SourceNode::new("root")
            .with_path("/")
            .with_object(SourceObject::new("a").with_path("/a").with_class("MechanicalObject"))
            .with_object(SourceObject::new("b").with_path("/b").with_class("OglModel"));
        writer.write_manifest(&manifest).unwrap();
        writer
            .write_frame("/a", &FramePayload::new(1).with_field("position", json!([[1, 2, 3]])))
            .unwrap();

        let bake = BakeDirectory::open(tmp.path()).unwrap();
        assert!(frame_message(&bake, 0).unwrap().is_none());

        let message = frame_message(&bake, 1).unwrap().unwrap();
        assert_eq!(message.iteration, 1);
        assert_eq!(message.root.objects[0].fields["position"], json!([[1, 2, 3]]));
        assert!(message.root.objects[1].fields.is_empty());
    }
}
