//! Error types for sofablend-core.

use thiserror::Error;

use crate::graph::{CollectionId, ObjectId};

/// Errors raised while turning a payload into mesh geometry.
///
/// A shape error is always scoped to one object: the object keeps its
/// previous geometry and its siblings are still processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    /// Position entries have a rank other than 1, 2, 3 or 7, or mixed ranks.
    #[error("unsupported position rank {rank} at vertex {index}")]
    UnsupportedPositionRank { rank: usize, index: usize },

    /// Attribute values are neither scalars nor 2/3/4-vectors.
    #[error("unsupported attribute '{name}', sample value: {sample}")]
    UnsupportedAttribute { name: String, sample: String },

    /// Attribute length does not match the mesh vertex count.
    #[error("attribute '{name}' has {len} values but the mesh has {vertices} vertices")]
    AttributeLength {
        name: String,
        len: usize,
        vertices: usize,
    },

    /// An index tuple has the wrong arity or holds a non-index value.
    #[error("malformed {field} at entry {index}")]
    MalformedIndices { field: String, index: usize },

    /// An index references a vertex that does not exist.
    #[error("{field} references vertex {vertex} but the mesh has {vertices} vertices")]
    IndexOutOfRange {
        field: String,
        vertex: u32,
        vertices: usize,
    },

    /// Index data without positions references more placeholder vertices
    /// than allowed.
    #[error("{field} references vertex {vertex}, beyond the {limit} placeholder vertices allowed without positions")]
    TooManyPlaceholders {
        field: String,
        vertex: u32,
        limit: usize,
    },

    /// A numeric component could not be read.
    #[error("non-numeric value in '{field}' at entry {index}")]
    NotNumeric { field: String, index: usize },
}

/// Errors raised by structural scene-graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown collection {0:?}")]
    UnknownCollection(CollectionId),

    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),
}
