//! Baking a running simulation to disk.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::{FrameClock, Timing};
use super::selection::{select, FieldSelection, Selected, SelectionRule};
use super::writer::BakeWriter;
use crate::error::{Error, Result};
use crate::schema::{FramePayload, SourceNode};

/// Access to a running simulation.
pub trait SimulationSource {
    /// Current node/object hierarchy.
    fn hierarchy(&self) -> SourceNode;

    /// Current value of one field of the object at `object_path`.
    fn field(&self, object_path: &str, name: &str) -> Option<Value>;
}

/// A source tree that already carries its field values, such as a
/// received live message.
impl SimulationSource for SourceNode {
    fn hierarchy(&self) -> SourceNode {
        self.clone()
    }

    fn field(&self, object_path: &str, name: &str) -> Option<Value> {
        self.find_object(object_path)
            .and_then(|o| o.fields.get(name))
            .cloned()
    }
}

/// Options for a bake export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Frames per second of the bake.
    pub fps: f64,
    pub timing: Timing,
    /// Directory written by the export. Wiped when the export starts.
    pub base_dir: PathBuf,
    /// Objects and fields to export.
    pub selection: Vec<SelectionRule>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: 24.0,
            timing: Timing::Simulation,
            base_dir: PathBuf::from("sofa_export"),
            selection: SelectionRule::default_rules(),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_selection(mut self, selection: Vec<SelectionRule>) -> Self {
        self.selection = selection;
        self
    }
}

/// Writes a bake directory while a simulation runs.
#[derive(Debug)]
pub struct BakeExporter {
    writer: BakeWriter,
    clock: FrameClock,
    manifest: SourceNode,
    rules: Vec<SelectionRule>,
    selected: Vec<Selected>,
}

impl BakeExporter {
    /// Start an export: wipe the base directory, write the manifest of
    /// `hierarchy` and resolve the selection against it.
    pub fn new(hierarchy: &SourceNode, options: &ExportOptions) -> Result<Self> {
        if options.fps.is_nan() || options.fps <= 0.0 {
            return Err(Error::invalid(format!("fps must be positive, got {}", options.fps)));
        }

        let manifest = hierarchy.with_synthesized_paths().manifest();
        let selected = select(&manifest, &options.selection)?;

        let writer = BakeWriter::create(&options.base_dir)?;
        writer.write_manifest(&manifest)?;

        info!(
            "exporting {} objects to {} at {} fps ({} time)",
            selected.len(),
            options.base_dir.display(),
            options.fps,
            options.timing
        );
        for s in &selected {
            debug!("  {} ({})", s.path, s.class_name);
        }

        Ok(Self {
            writer,
            clock: FrameClock::new(options.fps, options.timing),
            manifest,
            rules: options.selection.clone(),
            selected,
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn manifest(&self) -> &SourceNode {
        &self.manifest
    }

    pub fn selected(&self) -> &[Selected] {
        &self.selected
    }

    pub fn frames_written(&self) -> u64 {
        self.clock.frames_emitted()
    }

    /// Pick up objects of `hierarchy` the manifest does not list yet: extend
    /// and rewrite the manifest, then resolve the selection again. Returns
    /// the number of objects added.
    pub fn refresh(&mut self, hierarchy: &SourceNode) -> Result<usize> {
        let added = self.manifest.merge(&hierarchy.with_synthesized_paths().manifest());
        if added == 0 {
            return Ok(0);
        }
        self.selected = select(&self.manifest, &self.rules)?;
        self.writer.write_manifest(&self.manifest)?;
        info!(
            "{} new objects in the hierarchy, now exporting {}",
            added,
            self.selected.len()
        );
        Ok(added)
    }

    /// Account for one simulation step of `dt` seconds, writing a frame when
    /// the clock emits one. Returns the frame written, if any.
    pub fn step(&mut self, source: &dyn SimulationSource, dt: f64) -> Result<Option<u64>> {
        match self.clock.advance(dt) {
            Some(frame) => {
                self.capture(source, frame)?;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Write one frame file per selected object.
    pub fn capture(&self, source: &dyn SimulationSource, frame: u64) -> Result<()> {
        debug!("saving frame {} at t={:.4}", frame, self.clock.current_time());
        for selected in &self.selected {
            let payload = frame_payload(source, selected, frame)?;
            self.writer.write_frame(&selected.path, &payload)?;
        }
        Ok(())
    }
}

fn frame_payload(source: &dyn SimulationSource, selected: &Selected, frame: u64) -> Result<FramePayload> {
    let path = selected.path.as_str();
    let mut payload = FramePayload::new(frame);

    match &selected.fields {
        FieldSelection::All => {
            let empty = || Value::Array(Vec::new());
            let position = source
                .field(path, "vertices")
                .filter(|v| v.as_array().is_some_and(|a| !a.is_empty()))
                .or_else(|| source.field(path, "position"))
                .unwrap_or_else(empty);
            payload.fields.insert("position".into(), position);
            for name in ["edges", "triangles", "quads"] {
                let value = source.field(path, name).unwrap_or_else(empty);
                payload.fields.insert(name.into(), value);
            }
        }
        FieldSelection::Named(names) => {
            for name in names {
                let value = source.field(path, name).ok_or_else(|| Error::UnknownField {
                    field: name.clone(),
                    path: path.to_string(),
                })?;
                payload.fields.insert(name.clone(), value);
            }
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::reader::BakeDirectory;
    use crate::schema::SourceObject;
    use serde_json::json;

    fn source(x: f64) -> SourceNode {
        SourceNode::new("root").with_class("Node").with_child(
            SourceNode::new("Liver")
                .with_class("Node")
                .with_object(
                    SourceObject::new("dofs")
                        .with_class("MechanicalObject")
                        .with_field("position", json!([[x, 0, 0], [1, 0, 0]]))
                        .with_field("edges", json!([[0, 1]]))
                        .with_field("velocity", json!([[0, 0, 0], [0, 0, 0]])),
                )
                .with_object(
                    SourceObject::new("visual")
                        .with_class("OglModel")
                        .with_field("position", json!([[0, 0, 0]]))
                        .with_field("vertices", json!([[0, 0, 0], [0, 1, 0], [0, 0, 1]]))
                        .with_field("triangles", json!([[0, 1, 2]])),
                ),
        )
        .with_synthesized_paths()
    }

    fn options(dir: &Path) -> ExportOptions {
        ExportOptions::new().with_fps(4.0).with_base_dir(dir)
    }

    #[test]
    fn test_new_writes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("export");
        let exporter = BakeExporter::new(&source(0.0), &options(&dir)).unwrap();

        let bake = BakeDirectory::open(&dir).unwrap();
        assert_eq!(bake.manifest(), exporter.manifest());
        assert_eq!(bake.manifest().object_count(), 2);
        assert!(bake
            .manifest()
            .find_object("/root/Liver/dofs")
            .is_some_and(|o| o.fields.is_empty()));
        assert_eq!(exporter.selected().len(), 2);
    }

    #[test]
    fn test_step_writes_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("export");
        let mut exporter = BakeExporter::new(&source(0.0), &options(&dir)).unwrap();

        assert_eq!(exporter.step(&source(0.0), 0.25).unwrap(), None);
        assert_eq!(exporter.step(&source(2.0), 0.25).unwrap(), Some(0));
        assert_eq!(exporter.frames_written(), 1);

        let bake = BakeDirectory::open(&dir).unwrap();
        let dofs = bake.read_frame("/root/Liver/dofs", 0).unwrap().unwrap();
        assert_eq!(dofs.frame, Some(0));
        assert_eq!(dofs.fields["position"], json!([[2.0, 0, 0], [1, 0, 0]]));
        assert_eq!(dofs.fields["edges"], json!([[0, 1]]));
        assert_eq!(dofs.fields["quads"], json!([]));
        assert!(!dofs.fields.contains_key("velocity"));

        let visual = bake.read_frame("/root/Liver/visual", 0).unwrap().unwrap();
        assert_eq!(visual.fields["position"], json!([[0, 0, 0], [0, 1, 0], [0, 0, 1]]));
        assert!(bake.read_frame("/root/Liver/visual", 1).unwrap().is_none());
    }

    #[test]
    fn test_refresh_picks_up_new_objects() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("export");
        let mut exporter = BakeExporter::new(&source(0.0), &options(&dir)).unwrap();
        assert_eq!(exporter.refresh(&source(1.0)).unwrap(), 0);

        let mut grown = source(1.0);
        grown.children[0].objects.push(
            SourceObject::new("collision")
                .with_path("/root/Liver/collision")
                .with_class("MechanicalObject")
                .with_field("position", json!([[5, 5, 5]])),
        );
        assert_eq!(exporter.refresh(&grown).unwrap(), 1);
        assert_eq!(exporter.selected().len(), 3);

        exporter.capture(&grown, 0).unwrap();
        let bake = BakeDirectory::open(&dir).unwrap();
        assert_eq!(bake.manifest().object_count(), 3);
        let payload = bake.read_frame("/root/Liver/collision", 0).unwrap().unwrap();
        assert_eq!(payload.fields["position"], json!([[5, 5, 5]]));
    }

    #[test]
    fn test_named_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("export");
        let rules = vec![SelectionRule::new("MechanicalObject").with_datafield("position,velocity")];
        let exporter = BakeExporter::new(&source(0.0), &options(&dir).with_selection(rules)).unwrap();
        exporter.capture(&source(0.0), 7).unwrap();

        let bake = BakeDirectory::open(&dir).unwrap();
        let payload = bake.read_frame("/root/Liver/dofs", 7).unwrap().unwrap();
        let keys: Vec<&str> = payload.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["position", "velocity"]);
    }

    #[test]
    fn test_missing_named_field() {
        let tmp = tempfile::tempdir().unwrap();
        let rules = vec![SelectionRule::new("OglModel").with_datafield("normals")];
        let exporter =
            BakeExporter::new(&source(0.0), &options(tmp.path()).with_selection(rules)).unwrap();
        let result = exporter.capture(&source(0.0), 0);
        assert!(matches!(result, Err(Error::UnknownField { ref field, .. }) if field == "normals"));
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        let tmp = tempfile::tempdir().unwrap();
        let result = BakeExporter::new(&source(0.0), &options(tmp.path()).with_fps(0.0));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_options_from_json() {
        let options: ExportOptions = serde_json::from_value(json!({"fps": 30.0, "timing": "realtime"})).unwrap();
        assert_eq!(options.fps, 30.0);
        assert_eq!(options.timing, Timing::Realtime);
        assert_eq!(options.base_dir, PathBuf::from("sofa_export"));
        assert_eq!(options.selection, SelectionRule::default_rules());
    }
}
