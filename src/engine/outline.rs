//! Outline index and search.
//!
//! The outline is flattened once per document into pre-order [`OutlineNode`]s.
//! Searching never touches the tree: [`OutlineIndex::filter`] returns a
//! [`VisibleNodes`] projection that the presentation re-renders from.

use super::navigation::resolve_destination;
use crate::document::{Destination, DocumentHandle, OutlineItem, PageNumber};
use crate::error::NavigationError;

/// Position of a node in pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// One outline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub id: NodeId,
    pub title: String,
    pub destination: Option<Destination>,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Immutable outline tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineIndex {
    nodes: Vec<OutlineNode>,
    roots: Vec<NodeId>,
    /// Lowercased titles, indexed like `nodes`.
    folded: Vec<String>,
}

/// Nodes shown for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNodes {
    mask: Vec<bool>,
}

impl VisibleNodes {
    pub fn contains(&self, id: NodeId) -> bool {
        self.mask.get(id.0).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.mask.iter().filter(|v| **v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.mask.iter().any(|v| *v)
    }

    /// Every node is shown.
    pub fn is_complete(&self) -> bool {
        self.mask.iter().all(|v| *v)
    }

    /// Visible ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(|(i, _)| NodeId(i))
    }
}

impl OutlineIndex {
    /// Build the index, or `None` when the outline has no entries.
    pub fn build(items: &[OutlineItem]) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let mut index = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            folded: Vec::new(),
        };
        for item in items {
            let id = index.push(item, 0, None);
            index.roots.push(id);
        }
        Some(index)
    }

    fn push(&mut self, item: &OutlineItem, depth: usize, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(OutlineNode {
            id,
            title: item.title.clone(),
            destination: item.dest.clone(),
            depth,
            parent,
            children: Vec::new(),
        });
        self.folded.push(item.title.to_lowercase());
        for child in &item.items {
            let child_id = self.push(child, depth + 1, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> &[OutlineNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&OutlineNode> {
        self.nodes.get(id.0)
    }

    /// Every node visible.
    pub fn all(&self) -> VisibleNodes {
        VisibleNodes {
            mask: vec![true; self.nodes.len()],
        }
    }

    /// Nodes whose title contains `query` (case-insensitively), plus their ancestors.
    ///
    /// A blank query shows everything.
    pub fn filter(&self, query: &str) -> VisibleNodes {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all();
        }
        let mut mask = vec![false; self.nodes.len()];
        // Reverse pre-order visits every child before its parent.
        for i in (0..self.nodes.len()).rev() {
            let matched = self.folded[i].contains(&needle)
                || self.nodes[i].children.iter().any(|child| mask[child.0]);
            mask[i] = matched;
        }
        VisibleNodes { mask }
    }

    /// Resolve node `id` to a page number through `document`.
    ///
    /// # Errors
    ///
    /// [`NavigationError::UnknownOutlineNode`] for an id outside the index and
    /// [`NavigationError::UnresolvedDestination`] when the entry has no destination
    /// or it does not map to a page.
    pub fn resolve(
        &self,
        document: &dyn DocumentHandle,
        id: NodeId,
    ) -> Result<PageNumber, NavigationError> {
        let node = self
            .node(id)
            .ok_or(NavigationError::UnknownOutlineNode(id.0))?;
        node.destination
            .as_ref()
            .and_then(|dest| resolve_destination(document, dest))
            .ok_or_else(|| NavigationError::UnresolvedDestination(node.title.clone()))
    }
}
