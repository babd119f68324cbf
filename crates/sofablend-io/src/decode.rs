//! Turning payload fields into mesh geometry.
//!
//! Positions are dispatched on their rank, topology is read from
//! `edges`/`triangles`/`quads`/`faces`, and every other field becomes a
//! per-vertex attribute channel. The whole mesh is built before anything
//! touches the scene graph, so a failing payload never leaves an object
//! half-updated.

use glam::{Vec2, Vec3, Vec4};
use serde_json::Value;
use sofablend_core::{AttributeData, AttributeKind, Mesh, ShapeError};

use crate::schema::FieldMap;

/// Fields that describe identity rather than geometry.
pub const RESERVED_FIELDS: &[&str] = &["frame", "iteration", "name", "node_name", "path", "class", "type"];

/// Fields consumed as positions or topology.
pub const GEOMETRY_FIELDS: &[&str] = &["position", "vertices", "edges", "triangles", "quads", "faces"];

/// Most zero vertices synthesized for index data that comes without
/// positions.
pub const MAX_PLACEHOLDER_VERTICES: usize = 1 << 20;

/// Names of the orientation channels produced by rank-7 positions.
pub const ORIENTATION_CHANNELS: [&str; 4] = ["qx", "qy", "qz", "qw"];

/// Positions decoded from a rank-dispatched array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPositions {
    pub positions: Vec<Vec3>,
    /// Per-vertex (qx, qy, qz, qw), present for rank-7 input.
    pub orientation: Option<Vec<Vec4>>,
}

/// True when the field map carries anything beyond identity keys.
pub fn has_geometry(fields: &FieldMap) -> bool {
    fields.keys().any(|k| !RESERVED_FIELDS.contains(&k.as_str()))
}

/// Build a mesh from payload fields.
///
/// Returns `Ok(None)` when there is no geometry at all, which callers treat
/// as "leave the current mesh alone".
pub fn decode_mesh(fields: &FieldMap) -> Result<Option<Mesh>, ShapeError> {
    if !has_geometry(fields) {
        return Ok(None);
    }

    let mut mesh = Mesh::new();
    let mut orientation = None;

    // Non-empty `vertices` wins over `position`.
    let positions = match (fields.get("vertices"), fields.get("position")) {
        (Some(v), _) if is_non_empty_array(v) => Some(("vertices", v)),
        (_, Some(p)) => Some(("position", p)),
        (Some(v), None) => Some(("vertices", v)),
        (None, None) => None,
    };
    if let Some((field, value)) = positions {
        let decoded = decode_positions(field, value)?;
        mesh.vertices = decoded.positions;
        orientation = decoded.orientation;
    }

    if let Some(value) = fields.get("edges") {
        for tuple in decode_indices("edges", value, Some(2))? {
            mesh.edges.push([tuple[0], tuple[1]]);
        }
    }
    if let Some(value) = fields.get("triangles") {
        mesh.faces.extend(decode_indices("triangles", value, Some(3))?);
    }
    if let Some(value) = fields.get("quads") {
        mesh.faces.extend(decode_indices("quads", value, Some(4))?);
    }
    if let Some(value) = fields.get("faces") {
        let polygons = decode_indices("faces", value, None)?;
        if let Some(index) = polygons.iter().position(|p| p.len() < 3) {
            return Err(ShapeError::MalformedIndices {
                field: "faces".into(),
                index,
            });
        }
        mesh.faces.extend(polygons);
    }

    // Index data without positions: placeholder vertices up to max index.
    if mesh.vertices.is_empty() {
        if let Some(max) = mesh.max_index() {
            let count = max as usize + 1;
            if count > MAX_PLACEHOLDER_VERTICES {
                let field = if mesh.edges.iter().flatten().any(|&i| i == max) {
                    "edges"
                } else {
                    "faces"
                };
                return Err(ShapeError::TooManyPlaceholders {
                    field: field.into(),
                    vertex: max,
                    limit: MAX_PLACEHOLDER_VERTICES,
                });
            }
            mesh.ensure_vertex_count(count);
        }
    }

    if let Some(orientation) = orientation {
        for (channel, name) in ORIENTATION_CHANNELS.iter().enumerate() {
            let values = orientation.iter().map(|q| q[channel]).collect();
            mesh.set_attribute(*name, AttributeData::Float(values))?;
        }
    }

    for (name, value) in fields {
        if RESERVED_FIELDS.contains(&name.as_str()) || GEOMETRY_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if let Some(data) = decode_attribute(name, value)? {
            mesh.set_attribute(name.clone(), data)?;
        }
    }

    mesh.validate()?;
    Ok(Some(mesh))
}

/// Decode a position array of uniform rank 1, 2, 3 or 7.
pub fn decode_positions(field: &str, value: &Value) -> Result<DecodedPositions, ShapeError> {
    let entries = value.as_array().ok_or_else(|| ShapeError::NotNumeric {
        field: field.to_string(),
        index: 0,
    })?;
    let Some(first) = entries.first() else {
        return Ok(DecodedPositions::default());
    };

    let rank = entry_rank(first);
    let mut positions = Vec::with_capacity(entries.len());
    let mut orientation = (rank == 7).then(|| Vec::with_capacity(entries.len()));

    for (index, entry) in entries.iter().enumerate() {
        let components = read_components(field, index, entry)?;
        if components.len() != rank {
            return Err(ShapeError::UnsupportedPositionRank {
                rank: components.len(),
                index,
            });
        }
        let position = match rank {
            1 => Vec3::new(components[0], 0.0, 0.0),
            2 => Vec3::new(components[0], components[1], 0.0),
            3 => Vec3::new(components[0], components[1], components[2]),
            7 => {
                if let Some(orientation) = orientation.as_mut() {
                    orientation.push(Vec4::new(
                        components[3],
                        components[4],
                        components[5],
                        components[6],
                    ));
                }
                Vec3::new(components[0], components[1], components[2])
            }
            _ => return Err(ShapeError::UnsupportedPositionRank { rank, index }),
        };
        positions.push(position);
    }

    Ok(DecodedPositions {
        positions,
        orientation,
    })
}

/// Decode an array of index tuples, optionally of a fixed arity.
pub fn decode_indices(
    field: &str,
    value: &Value,
    arity: Option<usize>,
) -> Result<Vec<Vec<u32>>, ShapeError> {
    let malformed = |index: usize| ShapeError::MalformedIndices {
        field: field.to_string(),
        index,
    };

    let entries = value.as_array().ok_or_else(|| malformed(0))?;
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let tuple = entry.as_array().ok_or_else(|| malformed(index))?;
            if arity.is_some_and(|n| tuple.len() != n) {
                return Err(malformed(index));
            }
            tuple
                .iter()
                .map(|v| as_index(v).ok_or_else(|| malformed(index)))
                .collect()
        })
        .collect()
}

/// Decode an extra per-vertex attribute. Empty arrays yield `None`.
pub fn decode_attribute(name: &str, value: &Value) -> Result<Option<AttributeData>, ShapeError> {
    let unsupported = |sample: &Value| ShapeError::UnsupportedAttribute {
        name: name.to_string(),
        sample: sample.to_string(),
    };

    let entries = value.as_array().ok_or_else(|| unsupported(value))?;
    let Some(first) = entries.first() else {
        return Ok(None);
    };

    if first.is_number() {
        let values = entries
            .iter()
            .map(|v| v.as_f64().map(|x| x as f32).ok_or_else(|| unsupported(v)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(AttributeData::Float(values)));
    }

    let len = first.as_array().map(Vec::len).unwrap_or(0);
    let kind = AttributeKind::for_vector_len(len).ok_or_else(|| unsupported(first))?;

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = entry
            .as_array()
            .filter(|row| row.len() == kind.components())
            .and_then(|row| row.iter().map(|c| c.as_f64().map(|x| x as f32)).collect::<Option<Vec<_>>>())
            .ok_or_else(|| unsupported(entry))?;
        rows.push(row);
    }

    let data = match kind {
        AttributeKind::Float2 => AttributeData::Float2(rows.iter().map(|r| Vec2::new(r[0], r[1])).collect()),
        AttributeKind::Vector => {
            AttributeData::Vector(rows.iter().map(|r| Vec3::new(r[0], r[1], r[2])).collect())
        }
        AttributeKind::Color => {
            AttributeData::Color(rows.iter().map(|r| Vec4::new(r[0], r[1], r[2], r[3])).collect())
        }
        AttributeKind::Float => return Err(unsupported(first)),
    };
    Ok(Some(data))
}

fn is_non_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(|a| !a.is_empty())
}

/// Rank of a position entry; bare numbers count as rank 1.
fn entry_rank(entry: &Value) -> usize {
    match entry {
        Value::Array(components) => components.len(),
        _ => 1,
    }
}

fn read_components(field: &str, index: usize, entry: &Value) -> Result<Vec<f32>, ShapeError> {
    let not_numeric = || ShapeError::NotNumeric {
        field: field.to_string(),
        index,
    };
    match entry {
        Value::Number(n) => Ok(vec![n.as_f64().ok_or_else(not_numeric)? as f32]),
        Value::Array(components) => components
            .iter()
            .map(|c| c.as_f64().map(|x| x as f32).ok_or_else(not_numeric))
            .collect(),
        _ => Err(not_numeric()),
    }
}

fn as_index(value: &Value) -> Option<u32> {
    if let Some(i) = value.as_u64() {
        return u32::try_from(i).ok();
    }
    // numpy sometimes serializes indices as floats
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
}
