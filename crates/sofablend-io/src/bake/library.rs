//! The set of bake directories registered for playback.

use std::path::Path;

use log::info;
use sofablend_core::{CollectionId, SceneGraph};

use super::reader::{import_bake, load_frame, remove_baked, BakeDirectory};
use crate::apply::ApplyReport;
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    bake: BakeDirectory,
    root: Option<CollectionId>,
}

/// Registered bakes and the collections they were imported into.
#[derive(Debug, Clone, Default)]
pub struct BakeLibrary {
    entries: Vec<Entry>,
}

impl BakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bake directory. Its `scene.json` must parse.
    ///
    /// Registering the same directory twice keeps the first registration.
    pub fn add(&mut self, dir: impl AsRef<Path>) -> Result<&BakeDirectory> {
        let dir = dir.as_ref();
        let index = match self.entries.iter().position(|e| e.bake.dir() == dir) {
            Some(index) => index,
            None => {
                let bake = BakeDirectory::open(dir)?;
                info!("registered bake '{}' ({} objects)", bake.name(), bake.manifest().object_count());
                self.entries.push(Entry { bake, root: None });
                self.entries.len() - 1
            }
        };
        Ok(&self.entries[index].bake)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BakeDirectory> {
        self.entries.iter().map(|e| &e.bake)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Import every registered bake and load its first frame.
    pub fn import_all(&mut self, graph: &mut SceneGraph) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        for entry in &mut self.entries {
            let outcome = import_bake(graph, &entry.bake)?;
            entry.root = Some(outcome.root);
            report.merge(outcome.report);
        }
        Ok(report)
    }

    /// Load `frame` into every imported bake still present in the graph.
    pub fn load_frame_all(&self, graph: &mut SceneGraph, frame: u64) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        for entry in &self.entries {
            let Some(root) = entry.root.filter(|&root| graph.collection(root).is_some()) else {
                continue;
            };
            report.merge(load_frame(graph, root, &entry.bake, frame)?);
        }
        Ok(report)
    }

    /// Forget every registration and remove the imported bakes.
    pub fn clear(&mut self, graph: &mut SceneGraph) -> bool {
        self.entries.clear();
        remove_baked(graph)
    }
}
