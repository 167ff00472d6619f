#![forbid(unsafe_code)]

//! The field registry.
//!
//! [`FieldTree`] mirrors the shape of the form's values: registering
//! `address.city` creates a `Group` named `address` holding a `Field` named
//! `city`. Fields carry [`ElementHandle`]s, opaque indices into a registry the
//! UI host owns, so the tree never holds on to host elements.
//!
//! # Invariants
//!
//! 1. A `Field` never has children; a path can't pass through one.
//! 2. Groups left empty by [`FieldTree::remove`] are pruned.
//! 3. Iteration follows insertion order at every level.

use indexmap::IndexMap;

use crate::error::FieldTreeError;
use crate::path::split_path;
use crate::value::FieldValue;

/// Opaque handle to a host-owned UI element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ElementHandle(u32);

impl ElementHandle {
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Rules attached at registration. Stored for the external validator; this
/// crate does not interpret them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationRules {
    /// Error message when the field is required.
    pub required: Option<String>,
    pub min: Option<FieldValue>,
    pub max: Option<FieldValue>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub value_as_number: bool,
    pub disabled: bool,
}

impl ValidationRules {
    #[must_use]
    pub fn required(message: impl Into<String>) -> Self {
        Self {
            required: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Whether any rule is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A registered field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMeta {
    pub name: String,
    /// Primary element (a single input).
    pub element: Option<ElementHandle>,
    /// Sibling elements of a checkbox/radio group, in document order.
    pub refs: Vec<ElementHandle>,
    pub rules: ValidationRules,
    /// Whether the field's element is currently mounted.
    pub mount: bool,
    /// Per-field override of the form's unregister-on-unmount setting.
    pub should_unregister: Option<bool>,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element: None,
            refs: Vec::new(),
            rules: ValidationRules::default(),
            mount: true,
            should_unregister: None,
        }
    }

    #[must_use]
    pub fn with_element(mut self, element: ElementHandle) -> Self {
        self.element = Some(element);
        self
    }

    #[must_use]
    pub fn with_refs(mut self, refs: impl IntoIterator<Item = ElementHandle>) -> Self {
        self.refs = refs.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_should_unregister(mut self, enabled: bool) -> Self {
        self.should_unregister = Some(enabled);
        self
    }
}

/// A node of the field tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldNode {
    Group(FieldTree),
    Field(FieldMeta),
}

impl FieldNode {
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldMeta> {
        match self {
            Self::Field(meta) => Some(meta),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&FieldTree> {
        match self {
            Self::Group(tree) => Some(tree),
            Self::Field(_) => None,
        }
    }
}

/// Registered fields, keyed by path segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldTree {
    nodes: IndexMap<String, FieldNode>,
}

impl FieldTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of direct children.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Direct children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldNode)> {
        self.nodes.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Register `meta` at `meta.name`, returning the field it replaced.
    pub fn insert(&mut self, meta: FieldMeta) -> Result<Option<FieldMeta>, FieldTreeError> {
        let name = meta.name.clone();
        let segments = split_path(&name);
        if segments.is_empty() {
            return Err(FieldTreeError::EmptyName);
        }
        self.check_insert(&segments, &name)?;
        Ok(self.insert_at(&segments, meta))
    }

    fn check_insert(&self, segments: &[&str], name: &str) -> Result<(), FieldTreeError> {
        let mut level = self;
        for (depth, segment) in segments.iter().enumerate() {
            let is_last = depth + 1 == segments.len();
            match level.nodes.get(*segment) {
                None => return Ok(()),
                Some(FieldNode::Field(field)) if !is_last => {
                    return Err(FieldTreeError::NestedUnderField {
                        name: name.to_owned(),
                        field: field.name.clone(),
                    });
                }
                Some(FieldNode::Field(_)) => return Ok(()),
                Some(FieldNode::Group(_)) if is_last => {
                    return Err(FieldTreeError::ShadowsGroup {
                        name: name.to_owned(),
                    });
                }
                Some(FieldNode::Group(group)) => level = group,
            }
        }
        Ok(())
    }

    fn insert_at(&mut self, segments: &[&str], meta: FieldMeta) -> Option<FieldMeta> {
        let (head, rest) = segments.split_first()?;
        if rest.is_empty() {
            return match self
                .nodes
                .insert((*head).to_owned(), FieldNode::Field(meta))
            {
                Some(FieldNode::Field(previous)) => Some(previous),
                _ => None,
            };
        }
        let node = self
            .nodes
            .entry((*head).to_owned())
            .or_insert_with(|| FieldNode::Group(FieldTree::new()));
        match node {
            FieldNode::Group(group) => group.insert_at(rest, meta),
            FieldNode::Field(_) => None,
        }
    }

    /// Node at `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldNode> {
        let segments = split_path(name);
        let (last, parents) = segments.split_last()?;
        let mut level = self;
        for segment in parents {
            level = level.nodes.get(*segment)?.as_group()?;
        }
        level.nodes.get(*last)
    }

    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldMeta> {
        self.get(name)?.as_field()
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut FieldMeta> {
        let segments = split_path(name);
        let (last, parents) = segments.split_last()?;
        let mut level = self;
        for segment in parents {
            level = match level.nodes.get_mut(*segment)? {
                FieldNode::Group(group) => group,
                FieldNode::Field(_) => return None,
            };
        }
        match level.nodes.get_mut(*last)? {
            FieldNode::Field(meta) => Some(meta),
            FieldNode::Group(_) => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove the field at `name`, pruning groups it leaves empty.
    pub fn remove(&mut self, name: &str) -> Option<FieldMeta> {
        let segments = split_path(name);
        self.remove_at(&segments)
    }

    fn remove_at(&mut self, segments: &[&str]) -> Option<FieldMeta> {
        let (head, rest) = segments.split_first()?;
        if rest.is_empty() {
            return match self.nodes.get(*head)? {
                FieldNode::Field(_) => match self.nodes.shift_remove(*head) {
                    Some(FieldNode::Field(meta)) => Some(meta),
                    _ => None,
                },
                FieldNode::Group(_) => None,
            };
        }
        let FieldNode::Group(group) = self.nodes.get_mut(*head)? else {
            return None;
        };
        let removed = group.remove_at(rest);
        let emptied = group.is_empty();
        if removed.is_some() && emptied {
            self.nodes.shift_remove(*head);
        }
        removed
    }

    /// Every field, depth-first in insertion order.
    #[must_use]
    pub fn fields(&self) -> Vec<&FieldMeta> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldMeta>) {
        for node in self.nodes.values() {
            match node {
                FieldNode::Field(meta) => out.push(meta),
                FieldNode::Group(group) => group.collect_fields(out),
            }
        }
    }

    /// Names of every field, depth-first in insertion order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields().into_iter().map(|meta| meta.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FieldTree {
        let mut tree = FieldTree::new();
        tree.insert(FieldMeta::new("first").with_element(ElementHandle::new(1)))
            .expect("first");
        tree.insert(FieldMeta::new("address.city").with_element(ElementHandle::new(2)))
            .expect("city");
        tree.insert(FieldMeta::new("address.zip").with_element(ElementHandle::new(3)))
            .expect("zip");
        tree.insert(FieldMeta::new("items[0].label")).expect("label");
        tree
    }

    #[test]
    fn nested_names_build_groups() {
        let tree = tree();
        assert!(matches!(tree.get("address"), Some(FieldNode::Group(_))));
        assert_eq!(
            tree.get_field("address.city").and_then(|f| f.element),
            Some(ElementHandle::new(2))
        );
        assert!(tree.get_field("items.0.label").is_some());
        assert!(tree.get("address.country").is_none());
    }

    #[test]
    fn field_names_are_depth_first() {
        assert_eq!(
            tree().field_names(),
            vec!["first", "address.city", "address.zip", "items[0].label"]
        );
    }

    #[test]
    fn reinsert_replaces_and_returns_previous() {
        let mut tree = tree();
        let previous = tree
            .insert(FieldMeta::new("first").with_element(ElementHandle::new(9)))
            .expect("insert");
        assert_eq!(previous.and_then(|f| f.element), Some(ElementHandle::new(1)));
        assert_eq!(tree.field_names()[0], "first");
    }

    #[test]
    fn conflicting_paths_are_rejected() {
        let mut tree = tree();
        assert_eq!(
            tree.insert(FieldMeta::new("first.inner")),
            Err(FieldTreeError::NestedUnderField {
                name: "first.inner".into(),
                field: "first".into(),
            })
        );
        assert_eq!(
            tree.insert(FieldMeta::new("address")),
            Err(FieldTreeError::ShadowsGroup {
                name: "address".into()
            })
        );
        assert_eq!(tree.insert(FieldMeta::new("")), Err(FieldTreeError::EmptyName));
        assert_eq!(tree.field_names().len(), 4);
    }

    #[test]
    fn remove_prunes_empty_groups() {
        let mut tree = tree();
        assert!(tree.remove("address.city").is_some());
        assert!(tree.get("address").is_some());
        assert!(tree.remove("address.zip").is_some());
        assert!(tree.get("address").is_none());
        assert!(tree.remove("address.zip").is_none());
    }

    #[test]
    fn remove_ignores_groups() {
        let mut tree = tree();
        assert!(tree.remove("address").is_none());
        assert!(tree.get("address").is_some());
    }

    #[test]
    fn get_field_mut_updates_in_place() {
        let mut tree = tree();
        if let Some(meta) = tree.get_field_mut("address.zip") {
            meta.mount = false;
        }
        assert_eq!(tree.get_field("address.zip").map(|f| f.mount), Some(false));
    }

    #[test]
    fn rules_is_empty() {
        assert!(ValidationRules::default().is_empty());
        assert!(!ValidationRules::required("needed").is_empty());
    }
}
