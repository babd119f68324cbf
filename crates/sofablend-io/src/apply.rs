//! Merging decoded payloads into a scene graph.
//!
//! One applier serves the live stream, the hierarchy manifest and the bake
//! frames. Nodes become collections and objects become mesh objects, both
//! looked up by path (or name when no path is given) and created when
//! absent. Geometry is replaced wholesale. A failing object is recorded in
//! the [`ApplyReport`] and processing continues with its siblings.

use log::{debug, warn};
use sofablend_core::{CollectionId, EntityKey, ObjectId, SceneGraph, LIVE_ROOT};

use crate::decode::decode_mesh;
use crate::error::Error;
use crate::schema::{FramePayload, LiveMessage, SourceNode, SourceObject};

/// How objects are labelled when they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectLabel {
    /// Use the object name as-is (live stream).
    #[default]
    Name,
    /// Use `"{name} ({class})"` (bake import).
    NameAndClass,
}

/// Options for applying a source tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub label: ObjectLabel,
}

impl ApplyOptions {
    /// Options used for streamed messages.
    pub fn live() -> Self {
        Self {
            label: ObjectLabel::Name,
        }
    }

    /// Options used for hierarchy manifests.
    pub fn manifest() -> Self {
        Self {
            label: ObjectLabel::NameAndClass,
        }
    }
}

/// One object or node that could not be applied.
#[derive(Debug)]
pub struct ApplyFailure {
    /// Path or name of the offending entity.
    pub key: String,
    pub error: Error,
}

/// Summary of an apply operation.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub collections_created: usize,
    pub objects_created: usize,
    /// Objects whose geometry was replaced.
    pub objects_updated: usize,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ApplyReport) {
        self.collections_created += other.collections_created;
        self.objects_created += other.objects_created;
        self.objects_updated += other.objects_updated;
        self.failures.extend(other.failures);
    }

    pub(crate) fn fail(&mut self, key: impl Into<String>, error: impl Into<Error>) {
        let key = key.into();
        let error = error.into();
        warn!("[{}] skipped: {}", key, error);
        self.failures.push(ApplyFailure { key, error });
    }
}

/// Apply a source node (and its subtree) under `parent`.
pub fn apply_node(
    graph: &mut SceneGraph,
    parent: CollectionId,
    node: &SourceNode,
    options: &ApplyOptions,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    apply_node_into(graph, parent, node, options, &mut report);
    report
}

/// Apply a hierarchy manifest under `parent`.
///
/// Manifest objects carry no geometry, so applying the same manifest twice
/// leaves the graph shape unchanged.
pub fn apply_manifest(graph: &mut SceneGraph, parent: CollectionId, manifest: &SourceNode) -> ApplyReport {
    apply_node(graph, parent, manifest, &ApplyOptions::manifest())
}

/// Apply one streamed message under the live root collection.
pub fn apply_live_message(graph: &mut SceneGraph, message: &LiveMessage) -> ApplyReport {
    debug!("iteration #{}", message.iteration);
    let root = graph.ensure_root(LIVE_ROOT);
    apply_node(graph, root, &message.root, &ApplyOptions::live())
}

/// Replace an object's geometry from a frame payload.
///
/// Returns `false` when the payload holds no geometry; the object is then
/// left untouched.
pub fn apply_frame(graph: &mut SceneGraph, object: ObjectId, payload: &FramePayload) -> Result<bool, Error> {
    match decode_mesh(&payload.fields)? {
        Some(mesh) => {
            graph.replace_mesh(object, mesh)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn apply_node_into(
    graph: &mut SceneGraph,
    parent: CollectionId,
    node: &SourceNode,
    options: &ApplyOptions,
    report: &mut ApplyReport,
) {
    let Some(name) = node.name.as_deref() else {
        let key = node.path.clone().unwrap_or_else(|| "<unnamed node>".into());
        report.fail(key, Error::MissingRequired("node_name".into()));
        return;
    };

    let key = EntityKey::with_path(name, node.path.as_deref());
    let collection = match graph.ensure_collection(parent, key, node.class_name.as_deref()) {
        Ok((id, created)) => {
            if created {
                report.collections_created += 1;
            }
            id
        }
        Err(error) => {
            report.fail(key.key(), error);
            return;
        }
    };

    for child in &node.children {
        apply_node_into(graph, collection, child, options, report);
    }
    for object in &node.objects {
        apply_object(graph, collection, object, options, report);
    }
}

fn apply_object(
    graph: &mut SceneGraph,
    collection: CollectionId,
    object: &SourceObject,
    options: &ApplyOptions,
    report: &mut ApplyReport,
) {
    let label = match options.label {
        ObjectLabel::Name => object.name.clone(),
        ObjectLabel::NameAndClass => object.label(),
    };
    let key = EntityKey::with_path(&label, object.path.as_deref());

    let id = match graph.ensure_object(collection, key, object.class_name.as_deref()) {
        Ok((id, created)) => {
            if created {
                report.objects_created += 1;
            }
            id
        }
        Err(error) => {
            report.fail(key.key(), error);
            return;
        }
    };

    match decode_mesh(&object.fields) {
        Ok(Some(mesh)) => match graph.replace_mesh(id, mesh) {
            Ok(()) => report.objects_updated += 1,
            Err(error) => report.fail(key.key(), error),
        },
        Ok(None) => {}
        Err(error) => report.fail(key.key(), error),
    }
}
