//! Sofablend IO - simulation payloads in and out of the scene graph.
//!
//! This crate handles:
//! - The JSON schema of live messages, hierarchy manifests and frame files
//! - Geometry decoding with rank dispatch and attribute typing
//! - A single applier merging any payload into a [`SceneGraph`]
//! - Bake directories: writing, reading, playback and export
//!
//! # Example
//!
//! ```ignore
//! use sofablend_core::SceneGraph;
//! use sofablend_io::bake::{import_bake, load_frame, BakeDirectory};
//!
//! let bake = BakeDirectory::open("sofa_export")?;
//! let mut graph = SceneGraph::new();
//! let outcome = import_bake(&mut graph, &bake)?;
//! load_frame(&mut graph, outcome.root, &bake, 10)?;
//! ```
//!
//! [`SceneGraph`]: sofablend_core::SceneGraph

pub mod apply;
pub mod bake;
pub mod decode;
pub mod error;
pub mod schema;

pub use apply::{apply_frame, apply_live_message, apply_manifest, apply_node, ApplyFailure, ApplyOptions, ApplyReport, ObjectLabel};
pub use decode::decode_mesh;
pub use error::{Error, Result};
pub use schema::{FieldMap, FramePayload, LiveMessage, SourceNode, SourceObject};
