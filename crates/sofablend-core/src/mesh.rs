//! Mesh geometry and per-vertex attributes.

use glam::{Vec2, Vec3, Vec4};
use indexmap::IndexMap;

use crate::error::ShapeError;

/// Semantic kind of a per-vertex attribute channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeKind {
    /// One float per vertex.
    Float,
    /// Two floats per vertex (plane coordinates).
    Float2,
    /// Three floats per vertex.
    Vector,
    /// Four floats per vertex (RGBA).
    Color,
}

impl AttributeKind {
    /// Number of float components per vertex.
    pub fn components(self) -> usize {
        match self {
            AttributeKind::Float => 1,
            AttributeKind::Float2 => 2,
            AttributeKind::Vector => 3,
            AttributeKind::Color => 4,
        }
    }

    /// Kind for a vector of the given inner length, if one exists.
    pub fn for_vector_len(len: usize) -> Option<Self> {
        match len {
            2 => Some(AttributeKind::Float2),
            3 => Some(AttributeKind::Vector),
            4 => Some(AttributeKind::Color),
            _ => None,
        }
    }
}

/// Values of a per-vertex attribute channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeData {
    Float(Vec<f32>),
    Float2(Vec<Vec2>),
    Vector(Vec<Vec3>),
    Color(Vec<Vec4>),
}

impl AttributeData {
    /// Number of per-vertex values.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Float(v) => v.len(),
            AttributeData::Float2(v) => v.len(),
            AttributeData::Vector(v) => v.len(),
            AttributeData::Color(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeData::Float(_) => AttributeKind::Float,
            AttributeData::Float2(_) => AttributeKind::Float2,
            AttributeData::Vector(_) => AttributeKind::Vector,
            AttributeData::Color(_) => AttributeKind::Color,
        }
    }

    /// Scalar values, if this is a `Float` channel.
    pub fn as_float(&self) -> Option<&[f32]> {
        match self {
            AttributeData::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Geometry of one mesh object.
///
/// Faces hold triangles first, then quads, then any free polygons, in the
/// order they were supplied.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// Loose edges (2 indices each).
    pub edges: Vec<[u32; 2]>,
    /// Polygons (3 or more indices each).
    pub faces: Vec<Vec<u32>>,
    /// Named per-vertex channels, in insertion order.
    pub attributes: IndexMap<String, AttributeData>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from positions only.
    pub fn with_vertices(vertices: Vec<Vec3>) -> Self {
        Self {
            vertices,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when the mesh has no vertices, edges, faces or attributes.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.edges.is_empty()
            && self.faces.is_empty()
            && self.attributes.is_empty()
    }

    /// Get an attribute channel by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeData> {
        self.attributes.get(name)
    }

    /// Pad the vertex list with zero vectors up to `count`.
    pub fn ensure_vertex_count(&mut self, count: usize) {
        if self.vertices.len() < count {
            self.vertices.resize(count, Vec3::ZERO);
        }
    }

    /// Add or replace an attribute channel.
    ///
    /// A mesh without vertices is first expanded with zero vectors to the
    /// attribute's length; otherwise the lengths must agree.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        data: AttributeData,
    ) -> Result<(), ShapeError> {
        let name = name.into();
        if self.vertices.is_empty() {
            self.ensure_vertex_count(data.len());
        }
        if data.len() != self.vertices.len() {
            return Err(ShapeError::AttributeLength {
                name,
                len: data.len(),
                vertices: self.vertices.len(),
            });
        }
        self.attributes.insert(name, data);
        Ok(())
    }

    /// Highest vertex index referenced by edges or faces.
    pub fn max_index(&self) -> Option<u32> {
        self.edges
            .iter()
            .flat_map(|e| e.iter())
            .chain(self.faces.iter().flat_map(|f| f.iter()))
            .copied()
            .max()
    }

    /// Check indices and attribute lengths against the vertex count.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let vertices = self.vertices.len();
        let out_of_range = |field: &str, vertex: u32| ShapeError::IndexOutOfRange {
            field: field.to_string(),
            vertex,
            vertices,
        };

        for edge in &self.edges {
            if let Some(&v) = edge.iter().find(|&&v| v as usize >= vertices) {
                return Err(out_of_range("edges", v));
            }
        }
        for face in &self.faces {
            if let Some(&v) = face.iter().find(|&&v| v as usize >= vertices) {
                return Err(out_of_range("faces", v));
            }
        }
        for (name, data) in &self.attributes {
            if data.len() != vertices {
                return Err(ShapeError::AttributeLength {
                    name: name.clone(),
                    len: data.len(),
                    vertices,
                });
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds of the vertices, if any.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices[1..]
                .iter()
                .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
        )
    }
}
