#![forbid(unsafe_code)]

//! NodeSet type for XML canonicalization and transforms.
//!
//! A `NodeSet` is a set of nodes from one document, identified by their
//! `roxmltree::NodeId`. IDs are stable across re-parses of the same text,
//! so a set built from one parse can be applied to another.

use roxmltree::{Document, Node, NodeId, NodeType};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node in the document, comments included.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::tree(doc.root(), true)
    }

    /// Every node except comments (the `URI=""` document subset).
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree(doc.root(), false)
    }

    /// The subtree rooted at `node`, without comments (the `#id` subset).
    pub fn tree_without_comments(node: Node<'_, '_>) -> Self {
        Self::tree(node, false)
    }

    pub fn tree_with_comments(node: Node<'_, '_>) -> Self {
        Self::tree(node, true)
    }

    fn tree(node: Node<'_, '_>, include_comments: bool) -> Self {
        let nodes = node
            .descendants()
            .filter(|n| include_comments || n.node_type() != NodeType::Comment)
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn insert(&mut self, node: &Node<'_, '_>) {
        self.nodes.insert(node.id());
    }

    /// Remove `node` and all of its descendants.
    pub fn remove_subtree(&mut self, node: Node<'_, '_>) {
        for n in node.descendants() {
            self.nodes.remove(&n.id());
        }
    }

    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.intersection(&other.nodes).copied().collect(),
        }
    }

    pub fn subtract(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.difference(&other.nodes).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = "<a><!--c--><b>t<c/></b><s><x/></s></a>";

    #[test]
    fn test_tree_without_comments() {
        let doc = Document::parse(XML).unwrap();
        let a = doc.root_element();
        let with = NodeSet::tree_with_comments(a);
        let without = NodeSet::tree_without_comments(a);
        assert_eq!(with.len(), without.len() + 1);
        let comment = a.first_child().unwrap();
        assert!(with.contains(&comment));
        assert!(!without.contains(&comment));
    }

    #[test]
    fn test_remove_subtree() {
        let doc = Document::parse(XML).unwrap();
        let a = doc.root_element();
        let s = a.last_element_child().unwrap();
        let mut set = NodeSet::tree_without_comments(a);
        set.remove_subtree(s);
        assert!(!set.contains(&s));
        assert!(!set.contains(&s.first_element_child().unwrap()));
        assert!(set.contains(&a));
    }

    #[test]
    fn test_ids_survive_reparse() {
        let first = Document::parse(XML).unwrap();
        let set = NodeSet::tree_without_comments(first.root_element());
        let second = Document::parse(XML).unwrap();
        assert!(set.contains(&second.root_element()));
    }

    #[test]
    fn test_set_operations() {
        let doc = Document::parse(XML).unwrap();
        let a = doc.root_element();
        let all = NodeSet::all(&doc);
        let sub = NodeSet::tree_with_comments(a.last_element_child().unwrap());
        assert_eq!(all.intersection(&sub), sub);
        assert_eq!(all.subtract(&sub).len(), all.len() - sub.len());
        assert!(NodeSet::new().is_empty());
    }
}
