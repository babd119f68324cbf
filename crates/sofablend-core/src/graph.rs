//! Scene graph of collections and mesh objects.
//!
//! Collections nest other collections and own mesh objects. Every entity is
//! identified inside its parent by a key: its simulation path when it has
//! one, its name otherwise. Re-observing a key updates the existing entity
//! in place; entities only go away when a whole subtree is removed.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::GraphError;
use crate::mesh::Mesh;

/// Unique identifier for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionId(pub u64);

/// Unique identifier for a mesh object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(pub u64);

/// A grouping node in the scene graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collection {
    pub id: CollectionId,
    /// Display label.
    pub name: String,
    /// Stable simulation path, when known.
    pub path: Option<String>,
    /// Originating class tag (informational).
    pub class_name: Option<String>,
    /// Parent collection (None for roots).
    pub parent: Option<CollectionId>,
    /// Child collections, in first-seen order.
    pub children: Vec<CollectionId>,
    /// Owned objects, in first-seen order.
    pub objects: Vec<ObjectId>,
}

impl Collection {
    /// Create a detached collection.
    pub fn new(id: CollectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: None,
            class_name: None,
            parent: None,
            children: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Identity key inside the parent: path if any, name otherwise.
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// A leaf geometry entity.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshObject {
    pub id: ObjectId,
    /// Display label.
    pub name: String,
    /// Stable simulation path, when known.
    pub path: Option<String>,
    /// Originating class tag (informational).
    pub class_name: Option<String>,
    /// Owning collection.
    pub collection: CollectionId,
    /// Current geometry.
    pub mesh: Mesh,
}

impl MeshObject {
    /// Identity key inside the collection: path if any, name otherwise.
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Key of a collection or object about to be looked up or created.
#[derive(Debug, Clone, Copy)]
pub struct EntityKey<'a> {
    pub name: &'a str,
    pub path: Option<&'a str>,
}

impl<'a> EntityKey<'a> {
    pub fn named(name: &'a str) -> Self {
        Self { name, path: None }
    }

    pub fn with_path(name: &'a str, path: Option<&'a str>) -> Self {
        Self { name, path }
    }

    /// The string lookups compare against.
    pub fn key(&self) -> &'a str {
        self.path.unwrap_or(self.name)
    }
}

/// The mutable target scene graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    collections: HashMap<CollectionId, Collection>,
    objects: HashMap<ObjectId, MeshObject>,
    roots: Vec<CollectionId>,
    next_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty scene graph.
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            objects: HashMap::new(),
            roots: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Top-level collections.
    pub fn roots(&self) -> &[CollectionId] {
        &self.roots
    }

    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(&id)
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> Option<&mut Collection> {
        self.collections.get_mut(&id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&MeshObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut MeshObject> {
        self.objects.get_mut(&id)
    }

    /// Find a top-level collection by key.
    pub fn root_by_key(&self, key: &str) -> Option<CollectionId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.collections.get(id).is_some_and(|c| c.key() == key))
    }

    /// Return the top-level collection with this name, creating it if needed.
    pub fn ensure_root(&mut self, name: &str) -> CollectionId {
        if let Some(id) = self.root_by_key(name) {
            return id;
        }
        let id = CollectionId(self.next_id());
        self.collections.insert(id, Collection::new(id, name));
        self.roots.push(id);
        id
    }

    /// Find a child collection of `parent` by key.
    pub fn find_child(&self, parent: CollectionId, key: &str) -> Option<CollectionId> {
        self.collections
            .get(&parent)?
            .children
            .iter()
            .copied()
            .find(|id| self.collections.get(id).is_some_and(|c| c.key() == key))
    }

    /// Find an object owned by `collection` by key.
    pub fn find_object(&self, collection: CollectionId, key: &str) -> Option<ObjectId> {
        self.collections
            .get(&collection)?
            .objects
            .iter()
            .copied()
            .find(|id| self.objects.get(id).is_some_and(|o| o.key() == key))
    }

    /// Look up a child collection by key, creating it if absent.
    ///
    /// Returns the id and whether it was created. An existing collection
    /// keeps its key; its display name follows the latest observation.
    pub fn ensure_collection(
        &mut self,
        parent: CollectionId,
        key: EntityKey<'_>,
        class_name: Option<&str>,
    ) -> Result<(CollectionId, bool), GraphError> {
        if !self.collections.contains_key(&parent) {
            return Err(GraphError::UnknownCollection(parent));
        }

        if let Some(id) = self.find_child(parent, key.key()) {
            if let Some(collection) = self.collections.get_mut(&id) {
                if collection.name != key.name {
                    collection.name = key.name.to_string();
                }
                if let Some(class_name) = class_name {
                    collection.class_name = Some(class_name.to_string());
                }
            }
            return Ok((id, false));
        }

        let id = CollectionId(self.next_id());
        let mut collection = Collection::new(id, key.name);
        collection.path = key.path.map(str::to_string);
        collection.class_name = class_name.map(str::to_string);
        collection.parent = Some(parent);
        self.collections.insert(id, collection);
        if let Some(parent) = self.collections.get_mut(&parent) {
            parent.children.push(id);
        }
        Ok((id, true))
    }

    /// Look up an object by key inside `collection`, creating it if absent.
    ///
    /// New objects start with an empty mesh.
    pub fn ensure_object(
        &mut self,
        collection: CollectionId,
        key: EntityKey<'_>,
        class_name: Option<&str>,
    ) -> Result<(ObjectId, bool), GraphError> {
        if !self.collections.contains_key(&collection) {
            return Err(GraphError::UnknownCollection(collection));
        }

        if let Some(id) = self.find_object(collection, key.key()) {
            if let Some(object) = self.objects.get_mut(&id) {
                if object.name != key.name {
                    object.name = key.name.to_string();
                }
                if let Some(class_name) = class_name {
                    object.class_name = Some(class_name.to_string());
                }
            }
            return Ok((id, false));
        }

        let id = ObjectId(self.next_id());
        self.objects.insert(
            id,
            MeshObject {
                id,
                name: key.name.to_string(),
                path: key.path.map(str::to_string),
                class_name: class_name.map(str::to_string),
                collection,
                mesh: Mesh::new(),
            },
        );
        if let Some(owner) = self.collections.get_mut(&collection) {
            owner.objects.push(id);
        }
        Ok((id, true))
    }

    /// Replace an object's geometry wholesale.
    pub fn replace_mesh(&mut self, object: ObjectId, mesh: Mesh) -> Result<(), GraphError> {
        let target = self
            .objects
            .get_mut(&object)
            .ok_or(GraphError::UnknownObject(object))?;
        target.mesh = mesh;
        Ok(())
    }

    /// Child collections of a collection.
    pub fn children(&self, id: CollectionId) -> impl Iterator<Item = &Collection> {
        self.collections
            .get(&id)
            .into_iter()
            .flat_map(|c| c.children.iter())
            .filter_map(|child| self.collections.get(child))
    }

    /// Objects directly owned by a collection.
    pub fn objects_in(&self, id: CollectionId) -> impl Iterator<Item = &MeshObject> {
        self.collections
            .get(&id)
            .into_iter()
            .flat_map(|c| c.objects.iter())
            .filter_map(|object| self.objects.get(object))
    }

    /// All objects in a subtree, depth-first pre-order.
    pub fn objects_under(&self, id: CollectionId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(collection) = self.collections.get(&current) else {
                continue;
            };
            out.extend(collection.objects.iter().copied());
            stack.extend(collection.children.iter().rev().copied());
        }
        out
    }

    /// Depth-first pre-order walk over all collections with their depth.
    pub fn walk(&self) -> impl Iterator<Item = (&Collection, usize)> {
        CollectionWalker::new(self)
    }

    /// Remove a collection with everything below it.
    ///
    /// This is the only deletion primitive: individual objects are never
    /// removed on their own.
    pub fn remove_collection(&mut self, id: CollectionId) -> Result<(), GraphError> {
        let parent = self
            .collections
            .get(&id)
            .ok_or(GraphError::UnknownCollection(id))?
            .parent;

        match parent {
            Some(parent) => {
                if let Some(parent) = self.collections.get_mut(&parent) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(collection) = self.collections.remove(&current) {
                for object in &collection.objects {
                    self.objects.remove(object);
                }
                stack.extend(collection.children);
            }
        }
        Ok(())
    }

    /// Indented textual shape of the graph.
    ///
    /// Collections end with `/`; objects list their vertex, edge and face
    /// counts.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (collection, depth) in self.walk() {
            let indent = "  ".repeat(depth);
            let _ = writeln!(out, "{indent}{}/", collection.name);
            for object in self.objects_in(collection.id) {
                let _ = writeln!(
                    out,
                    "{indent}  {} [v={} e={} f={}]",
                    object.name,
                    object.mesh.vertex_count(),
                    object.mesh.edge_count(),
                    object.mesh.face_count()
                );
            }
        }
        out
    }
}

/// Iterator for walking the collection hierarchy.
struct CollectionWalker<'a> {
    graph: &'a SceneGraph,
    stack: Vec<(CollectionId, usize)>,
}

impl<'a> CollectionWalker<'a> {
    fn new(graph: &'a SceneGraph) -> Self {
        let stack = graph.roots.iter().rev().map(|&id| (id, 0)).collect();
        Self { graph, stack }
    }
}

impl<'a> Iterator for CollectionWalker<'a> {
    type Item = (&'a Collection, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, depth) = self.stack.pop()?;
            let Some(collection) = self.graph.collections.get(&id) else {
                continue;
            };
            for &child in collection.children.iter().rev() {
                self.stack.push((child, depth + 1));
            }
            return Some((collection, depth));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sample() -> (SceneGraph, CollectionId) {
        let mut graph = SceneGraph::new();
        let root = graph.ensure_root("SOFA Collection");
        let (body, _) = graph
            .ensure_collection(root, EntityKey::with_path("body", Some("@/body")), None)
            .unwrap();
        graph
            .ensure_object(body, EntityKey::with_path("mo", Some("@/body/mo")), Some("MechanicalObject"))
            .unwrap();
        (graph, root)
    }

    #[test]
    fn test_empty_graph() {
        let graph = SceneGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.object_count(), 0);
        assert_eq!(graph.outline(), "");
    }

    #[test]
    fn test_ensure_root_is_idempotent() {
        let mut graph = SceneGraph::new();
        let a = graph.ensure_root("SOFA Collection");
        let b = graph.ensure_root("SOFA Collection");
        assert_eq!(a, b);
        assert_eq!(graph.roots().len(), 1);
    }

    #[test]
    fn test_ensure_collection_reuses_path() {
        let (mut graph, root) = sample();
        let before = graph.collection_count();

        let (id, created) = graph
            .ensure_collection(root, EntityKey::with_path("renamed", Some("@/body")), None)
            .unwrap();
        assert!(!created);
        assert_eq!(graph.collection_count(), before);
        assert_eq!(graph.collection(id).unwrap().name, "renamed");
        assert_eq!(graph.collection(id).unwrap().key(), "@/body");
    }

    #[test]
    fn test_same_name_different_path_creates_two() {
        let mut graph = SceneGraph::new();
        let root = graph.ensure_root("root");
        let (a, _) = graph
            .ensure_collection(root, EntityKey::with_path("node", Some("@/a/node")), None)
            .unwrap();
        let (b, created) = graph
            .ensure_collection(root, EntityKey::with_path("node", Some("@/b/node")), None)
            .unwrap();
        assert!(created);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ensure_object_in_unknown_collection() {
        let mut graph = SceneGraph::new();
        let err = graph
            .ensure_object(CollectionId(42), EntityKey::named("x"), None)
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownCollection(CollectionId(42)));
    }

    #[test]
    fn test_replace_mesh() {
        let (mut graph, root) = sample();
        let object = graph.objects_under(root)[0];
        graph
            .replace_mesh(object, Mesh::with_vertices(vec![Vec3::X, Vec3::Y]))
            .unwrap();
        assert_eq!(graph.object(object).unwrap().mesh.vertex_count(), 2);
    }

    #[test]
    fn test_walk_order() {
        let mut graph = SceneGraph::new();
        let root = graph.ensure_root("root");
        let (child1, _) = graph.ensure_collection(root, EntityKey::named("child1"), None).unwrap();
        graph.ensure_collection(root, EntityKey::named("child2"), None).unwrap();
        graph
            .ensure_collection(child1, EntityKey::named("grandchild"), None)
            .unwrap();

        let names: Vec<(&str, usize)> = graph.walk().map(|(c, d)| (c.name.as_str(), d)).collect();
        assert_eq!(
            names,
            vec![("root", 0), ("child1", 1), ("grandchild", 2), ("child2", 1)]
        );
    }

    #[test]
    fn test_remove_collection_subtree() {
        let (mut graph, root) = sample();
        let other = graph.ensure_root("other");
        graph.ensure_object(other, EntityKey::named("keep"), None).unwrap();

        graph.remove_collection(root).unwrap();
        assert_eq!(graph.roots(), &[other]);
        assert_eq!(graph.collection_count(), 1);
        assert_eq!(graph.object_count(), 1);
        assert!(graph.remove_collection(root).is_err());
    }

    #[test]
    fn test_outline() {
        let (graph, _) = sample();
        assert_eq!(
            graph.outline(),
            "SOFA Collection/\n  body/\n    mo [v=0 e=0 f=0]\n"
        );
    }
}
