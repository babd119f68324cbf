//! sofablend-core: the scene-graph model SOFA simulations are mirrored into.
//!
//! A [`SceneGraph`] holds nested [`Collection`]s that own [`MeshObject`]s.
//! Each object carries a [`Mesh`] with positions, topology and named
//! per-vertex attribute channels.
//!
//! ```text
//! SOFA Collections/
//!   liver_bake/          <- one collection per simulation node
//!     Liver/
//!       dofs (MechanicalObject)   <- mesh object, keyed by its path
//! ```
//!
//! Entities are keyed by their simulation path when they have one, so the
//! same path observed on every frame always lands on the same entity.

pub mod error;
pub mod graph;
pub mod mesh;

pub use error::{GraphError, ShapeError};
pub use graph::{Collection, CollectionId, EntityKey, MeshObject, ObjectId, SceneGraph};
pub use mesh::{AttributeData, AttributeKind, Mesh};

/// Root collection used by the live streaming path.
pub const LIVE_ROOT: &str = "SOFA Collection";

/// Root collection under which baked simulations are imported.
pub const BAKE_ROOT: &str = "SOFA Collections";
