//! JSON schema shared by the live stream, the hierarchy manifest and the
//! per-frame bake files.
//!
//! The live path sends a tree of nodes whose objects carry geometry; the
//! manifest (`scene.json`) sends the same tree without geometry; a frame
//! file holds the geometry of a single object.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Open, order-preserving map of payload fields.
pub type FieldMap = IndexMap<String, serde_json::Value>;

/// A simulation node: a grouping entity with child nodes and objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Display name (`node_name` on the live path).
    #[serde(default, alias = "node_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable simulation path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Originating class tag.
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<SourceNode>,
    /// Leaf objects.
    #[serde(default)]
    pub objects: Vec<SourceObject>,
}

impl SourceNode {
    /// Create a named node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set the simulation path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the class tag.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append an object.
    pub fn with_object(mut self, object: SourceObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Visit every object in the tree, node objects before child nodes.
    pub fn visit_objects<'a>(&'a self, visit: &mut impl FnMut(&'a SourceObject)) {
        for object in &self.objects {
            visit(object);
        }
        for child in &self.children {
            child.visit_objects(visit);
        }
    }

    /// Total number of objects in the tree.
    pub fn object_count(&self) -> usize {
        let mut count = 0;
        self.visit_objects(&mut |_| count += 1);
        count
    }

    /// Find an object anywhere in the tree by path.
    pub fn find_object(&self, path: &str) -> Option<&SourceObject> {
        self.objects
            .iter()
            .find(|o| o.path.as_deref() == Some(path))
            .or_else(|| self.children.iter().find_map(|c| c.find_object(path)))
    }

    /// Copy of the tree without any object payload fields.
    pub fn manifest(&self) -> SourceNode {
        SourceNode {
            name: self.name.clone(),
            path: self.path.clone(),
            class_name: self.class_name.clone(),
            children: self.children.iter().map(SourceNode::manifest).collect(),
            objects: self
                .objects
                .iter()
                .map(|o| SourceObject {
                    name: o.name.clone(),
                    path: o.path.clone(),
                    class_name: o.class_name.clone(),
                    template: o.template.clone(),
                    fields: FieldMap::new(),
                })
                .collect(),
        }
    }

    /// Add the nodes and objects of `other` that this tree lacks, matched
    /// by path or, without one, by name. Returns the number of objects added.
    pub fn merge(&mut self, other: &SourceNode) -> usize {
        let mut added = 0;
        for object in &other.objects {
            if !self.objects.iter().any(|o| o.key() == object.key()) {
                self.objects.push(object.clone());
                added += 1;
            }
        }
        for child in &other.children {
            match self.children.iter_mut().find(|c| c.key() == child.key()) {
                Some(existing) => added += existing.merge(child),
                None => {
                    added += child.object_count();
                    self.children.push(child.clone());
                }
            }
        }
        added
    }

    fn key(&self) -> Option<&str> {
        self.path.as_deref().or(self.name.as_deref())
    }

    /// Fill missing paths from names: `{parent}/{name}`.
    ///
    /// Live clients may omit paths; baking needs one per object.
    pub fn with_synthesized_paths(&self) -> SourceNode {
        self.synthesize_paths("")
    }

    fn synthesize_paths(&self, parent: &str) -> SourceNode {
        let path = self.path.clone().unwrap_or_else(|| {
            format!("{parent}/{}", self.name.as_deref().unwrap_or_default())
        });
        SourceNode {
            name: self.name.clone(),
            class_name: self.class_name.clone(),
            children: self
                .children
                .iter()
                .map(|c| c.synthesize_paths(&path))
                .collect(),
            objects: self
                .objects
                .iter()
                .map(|o| {
                    let mut object = o.clone();
                    if object.path.is_none() {
                        object.path = Some(format!("{path}/{}", o.name));
                    }
                    object
                })
                .collect(),
            path: Some(path),
        }
    }
}

/// A simulation object: a leaf carrying geometry fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Display name.
    pub name: String,
    /// Stable simulation path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Originating class tag.
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Template name (informational).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Geometry and attribute fields.
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl SourceObject {
    /// Create a named object.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the simulation path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the class tag.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Add a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Name used for display: `"{name} ({class})"` when the class is known.
    pub fn label(&self) -> String {
        match &self.class_name {
            Some(class_name) => format!("{} ({})", self.name, class_name),
            None => self.name.clone(),
        }
    }
}

/// One message of the live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMessage {
    /// Frame counter.
    pub iteration: u64,
    /// Root node of the streamed tree.
    #[serde(flatten)]
    pub root: SourceNode,
}

impl LiveMessage {
    pub fn new(iteration: u64, root: SourceNode) -> Self {
        Self { iteration, root }
    }

    /// Parse a message from a JSON payload.
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Geometry of one object at one frame, as stored in a bake file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    /// Frame number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    /// Geometry and attribute fields.
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl FramePayload {
    /// Create an empty payload for a frame.
    pub fn new(frame: u64) -> Self {
        Self {
            frame: Some(frame),
            fields: FieldMap::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_live_message() {
        let message: LiveMessage = serde_json::from_value(json!({
            "iteration": 3,
            "node_name": "root",
            "objects": [{"name": "Visual", "position": [[0, 0, 0]], "faces": []}],
            "children": [{"node_name": "child"}]
        }))
        .unwrap();

        assert_eq!(message.iteration, 3);
        assert_eq!(message.root.name.as_deref(), Some("root"));
        assert_eq!(message.root.children[0].name.as_deref(), Some("child"));
        let object = &message.root.objects[0];
        assert_eq!(object.name, "Visual");
        assert_eq!(object.fields.keys().collect::<Vec<_>>(), vec!["position", "faces"]);
    }

    #[test]
    fn test_live_message_requires_iteration() {
        let result = LiveMessage::from_slice(br#"{"node_name": "root"}"#);
        assert!(matches!(result, Err(crate::Error::Json(_))));
    }

    #[test]
    fn test_parse_manifest() {
        let manifest: SourceNode = serde_json::from_value(json!({
            "name": "root",
            "path": "/",
            "class": "Node",
            "children": [],
            "objects": [{"name": "dofs", "path": "/dofs", "class": "MechanicalObject", "type": "Vec3d"}]
        }))
        .unwrap();

        let object = &manifest.objects[0];
        assert_eq!(object.class_name.as_deref(), Some("MechanicalObject"));
        assert_eq!(object.template.as_deref(), Some("Vec3d"));
        assert!(object.fields.is_empty());
        assert_eq!(object.label(), "dofs (MechanicalObject)");
    }

    #[test]
    fn test_frame_payload_layout() {
        let payload = FramePayload::new(4).with_field("position", json!([[1, 2, 3]]));
        let text = serde_json::to_string(&payload).unwrap();
        assert_eq!(text, r#"{"frame":4,"position":[[1,2,3]]}"#);

        let back: FramePayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_find_object_and_count() {
        let tree = SourceNode::new("root")
            .with_object(SourceObject::new("a").with_path("/a"))
            .with_child(SourceNode::new("child").with_object(SourceObject::new("b").with_path("/child/b")));

        assert_eq!(tree.object_count(), 2);
        assert_eq!(tree.find_object("/child/b").unwrap().name, "b");
        assert!(tree.find_object("/missing").is_none());
    }

    #[test]
    fn test_manifest_strips_fields() {
        let tree = SourceNode::new("root").with_object(
            SourceObject::new("a").with_field("position", json!([[0, 0, 0]])),
        );
        assert!(tree.manifest().objects[0].fields.is_empty());
    }

    #[test]
    fn test_synthesized_paths() {
        let tree = SourceNode::new("root")
            .with_object(SourceObject::new("a"))
            .with_child(SourceNode::new("child").with_object(SourceObject::new("b").with_path("/keep")));

        let filled = tree.with_synthesized_paths();
        assert_eq!(filled.path.as_deref(), Some("/root"));
        assert_eq!(filled.objects[0].path.as_deref(), Some("/root/a"));
        assert_eq!(filled.children[0].path.as_deref(), Some("/root/child"));
        assert_eq!(filled.children[0].objects[0].path.as_deref(), Some("/keep"));
    }

    #[test]
    fn test_merge_adds_missing_entries() {
        let mut tree = SourceNode::new("root")
            .with_path("/root")
            .with_object(SourceObject::new("a").with_path("/root/a"))
            .with_child(SourceNode::new("child").with_path("/root/child"));
        let seen = SourceNode::new("root")
            .with_path("/root")
            .with_object(SourceObject::new("a").with_path("/root/a"))
            .with_object(SourceObject::new("b").with_path("/root/b"))
            .with_child(
                SourceNode::new("child")
                    .with_path("/root/child")
                    .with_object(SourceObject::new("c").with_path("/root/child/c")),
            )
            .with_child(
                SourceNode::new("new")
                    .with_path("/root/new")
                    .with_object(SourceObject::new("d").with_path("/root/new/d")),
            );

        assert_eq!(tree.merge(&seen), 3);
        assert_eq!(tree.object_count(), 4);
        assert_eq!(tree.children.len(), 2);
        assert!(tree.find_object("/root/new/d").is_some());
        assert_eq!(tree.merge(&seen), 0);
    }
}
