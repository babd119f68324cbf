//! Reading bake directories back into a scene graph.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;
use sofablend_core::{CollectionId, EntityKey, SceneGraph, BAKE_ROOT};

use super::paths::{frame_file_path, scene_file_path};
use crate::apply::{apply_frame, apply_manifest, ApplyReport};
use crate::error::{Error, Result};
use crate::schema::{FramePayload, SourceNode};

/// An opened bake directory: its manifest plus access to frame files.
#[derive(Debug, Clone)]
pub struct BakeDirectory {
    dir: PathBuf,
    name: String,
    manifest: SourceNode,
}

impl BakeDirectory {
    /// Open a bake directory by reading its `scene.json`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let bytes = match fs::read(scene_file_path(&dir)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotABake(dir)),
            Err(e) => return Err(e.into()),
        };
        let manifest: SourceNode = serde_json::from_slice(&bytes)?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bake".into());
        Ok(Self { dir, name, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory base name; used as the bake's collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &SourceNode {
        &self.manifest
    }

    /// Read one object's frame file.
    ///
    /// A missing file means "no update for this frame" and yields `None`.
    pub fn read_frame(&self, object_path: &str, frame: u64) -> Result<Option<FramePayload>> {
        let path = frame_file_path(&self.dir, object_path, frame);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Result of importing a bake directory.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Collection holding the imported simulation.
    pub root: CollectionId,
    pub report: ApplyReport,
}

/// Import a bake into the graph and load its first frame.
///
/// The simulation lands under `SOFA Collections/<directory name>`. Importing
/// the same directory again reuses every existing entity.
pub fn import_bake(graph: &mut SceneGraph, bake: &BakeDirectory) -> Result<ImportOutcome> {
    let bakes_root = graph.ensure_root(BAKE_ROOT);
    let (root, _) = graph.ensure_collection(bakes_root, EntityKey::named(bake.name()), None)?;

    let mut report = apply_manifest(graph, root, bake.manifest());
    report.merge(load_frame(graph, root, bake, 0)?);
    info!(
        "imported {} ({} objects)",
        bake.dir().display(),
        graph.objects_under(root).len()
    );
    Ok(ImportOutcome { root, report })
}

/// Load one frame for every object under `root` that has a simulation path.
///
/// Objects without a frame file keep their geometry. Unreadable or
/// malformed frame files are reported per object; other I/O failures abort.
pub fn load_frame(
    graph: &mut SceneGraph,
    root: CollectionId,
    bake: &BakeDirectory,
    frame: u64,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for id in graph.objects_under(root) {
        let Some(path) = graph.object(id).and_then(|o| o.path.clone()) else {
            continue;
        };
        let payload = match bake.read_frame(&path, frame) {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(Error::Json(e)) => {
                report.fail(path, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        match apply_frame(graph, id, &payload) {
            Ok(true) => report.objects_updated += 1,
            Ok(false) => {}
            Err(e) => report.fail(path, e),
        }
    }

    Ok(report)
}

/// Remove every imported bake. Returns whether anything was removed.
pub fn remove_baked(graph: &mut SceneGraph) -> bool {
    match graph.root_by_key(BAKE_ROOT) {
        Some(root) => graph.remove_collection(root).is_ok(),
        None => false,
    }
}
