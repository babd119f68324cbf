//! `sofablend import`: load bake directories and print the resulting scene.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::warn;
use sofablend_core::SceneGraph;
use sofablend_io::bake::BakeLibrary;
use sofablend_io::ApplyReport;

use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Bake directories (each holding a scene.json)
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,
    /// Frame to load after import
    #[arg(long, default_value_t = 0)]
    pub frame: u64,
    /// Also print the bounding box of every object with vertices
    #[arg(long)]
    pub bounds: bool,
}

/// Import the bakes into a fresh graph at `frame`.
pub fn import(args: &ImportArgs) -> Result<SceneGraph> {
    let mut library = BakeLibrary::new();
    for dir in &args.dirs {
        library
            .add(dir)
            .with_context(|| format!("failed to register bake '{}'", dir.display()))?;
    }

    let mut graph = SceneGraph::new();
    report_failures(&library.import_all(&mut graph)?);
    if args.frame > 0 {
        report_failures(&library.load_frame_all(&mut graph, args.frame)?);
    }
    Ok(graph)
}

/// One line per object with vertices: label, then min and max corners.
pub fn bounds_report(graph: &SceneGraph) -> String {
    let mut out = String::new();
    for &root in graph.roots() {
        for id in graph.objects_under(root) {
            let Some(object) = graph.object(id) else {
                continue;
            };
            if let Some((min, max)) = object.mesh.bounds() {
                let _ = writeln!(
                    out,
                    "{}: ({}, {}, {}) .. ({}, {}, {})",
                    object.name, min.x, min.y, min.z, max.x, max.y, max.z
                );
            }
        }
    }
    out
}

fn report_failures(report: &ApplyReport) {
    for failure in &report.failures {
        warn!("{}: {}", failure.key, failure.error);
    }
}

pub fn run(_settings: &Settings, args: ImportArgs) -> Result<()> {
    let graph = import(&args)?;
    print!("{}", graph.outline());
    if args.bounds {
        print!("{}", bounds_report(&graph));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sofablend_io::bake::BakeWriter;
    use sofablend_io::{FramePayload, SourceNode, SourceObject};
    use std::path::Path;

    fn write_bake(dir: &Path) {
        let writer = BakeWriter::create(dir).unwrap();
        let manifest = SourceNode::new("root").with_path("/").with_class("Node").with_child(
            SourceNode::new("Liver")
                .with_path("/Liver")
                .with_class("Node")
                .with_object(SourceObject::new("dofs").with_path("/Liver/dofs").with_class("MechanicalObject")),
        );
        writer.write_manifest(&manifest).unwrap();
        writer
            .write_frame(
                "/Liver/dofs",
                &FramePayload::new(0)
                    .with_field("position", json!([[0, 0, 0], [1, 0, 0]]))
                    .with_field("edges", json!([[0, 1]])),
            )
            .unwrap();
        writer
            .write_frame(
                "/Liver/dofs",
                &FramePayload::new(3).with_field("position", json!([[0, 0, 0], [1, 0, 0], [2, 0, 0]])),
            )
            .unwrap();
    }

    #[test]
    fn test_import_outline() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("liver");
        write_bake(&dir);

        let graph = import(&ImportArgs { dirs: vec![dir], frame: 0, bounds: false }).unwrap();
        assert_eq!(
            graph.outline(),
            "SOFA Collections/\n  liver/\n    root/\n      Liver/\n        dofs (MechanicalObject) [v=2 e=1 f=0]\n"
        );
    }

    #[test]
    fn test_import_at_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("liver");
        write_bake(&dir);

        let graph = import(&ImportArgs { dirs: vec![dir], frame: 3, bounds: false }).unwrap();
        assert!(graph.outline().contains("dofs (MechanicalObject) [v=3 e=0 f=0]"));
    }

    #[test]
    fn test_import_rejects_plain_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let args = ImportArgs {
            dirs: vec![tmp.path().to_path_buf()],
            frame: 0,
            bounds: false,
        };
        assert!(import(&args).is_err());
    }

    #[test]
    fn test_bounds_report() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("liver");
        write_bake(&dir);

        let graph = import(&ImportArgs { dirs: vec![dir], frame: 3, bounds: true }).unwrap();
        assert_eq!(bounds_report(&graph), "dofs (MechanicalObject): (0, 0, 0) .. (2, 0, 0)\n");
        assert_eq!(bounds_report(&SceneGraph::new()), "");
    }
}
