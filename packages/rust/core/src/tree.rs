//! Arena-backed assignment tree.
//!
//! Nodes live in a single `Vec` owned by [`AssignmentTree`] and refer to each
//! other through [`NodeId`]. The child lists are the ownership direction;
//! `parent` is a plain index kept for upward navigation only.

use std::fmt;

use themis_shared::{Result, ThemisError};

// ---------------------------------------------------------------------------
// NodeId / AssignmentNode
// ---------------------------------------------------------------------------

/// Stable handle to a node inside one [`AssignmentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One assignment or grouping page.
#[derive(Debug, Clone)]
pub struct AssignmentNode {
    /// Display label.
    pub name: String,
    /// Page listing this node's children.
    pub url: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

impl AssignmentNode {
    /// Owning node, `None` for the root and for nodes not yet attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in discovery order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// AssignmentTree
// ---------------------------------------------------------------------------

/// Rooted, ordered N-ary tree of assignment nodes.
#[derive(Debug, Clone)]
pub struct AssignmentTree {
    nodes: Vec<AssignmentNode>,
    root: NodeId,
    attached: usize,
}

impl AssignmentTree {
    /// Create a tree holding only a root node.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let root = AssignmentNode {
            name: name.into(),
            url: url.into(),
            parent: None,
            children: Vec::new(),
            attached: true,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            attached: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&AssignmentNode> {
        self.nodes.get(id.0)
    }

    /// Like [`get`](Self::get), but unknown ids are an error.
    pub fn node(&self, id: NodeId) -> Result<&AssignmentNode> {
        self.get(id)
            .ok_or_else(|| ThemisError::tree(format!("unknown node {id}")))
    }

    /// Children of `id` in discovery order; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(AssignmentNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(AssignmentNode::parent)
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.attached
    }

    /// A tree always holds its root, so this is true only when nothing hangs below it.
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].children.is_empty()
    }

    /// Build a node that records `parent` but is not yet in its child list.
    ///
    /// The node becomes part of the tree only through [`append_child`](Self::append_child).
    pub fn build_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<NodeId> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(AssignmentNode {
            name: name.into(),
            url: url.into(),
            parent: Some(parent),
            children: Vec::new(),
            attached: false,
        });
        Ok(id)
    }

    /// Attach `child` as the last child of `parent` and point it back at `parent`.
    ///
    /// `parent` must already be part of the tree and `child` must not be,
    /// so every node is attached exactly once and the tree stays acyclic.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_attached = self.node(parent)?.attached;
        let child_attached = self.node(child)?.attached;

        if parent == child {
            return Err(ThemisError::tree(format!("cannot attach node {child} to itself")));
        }
        if child_attached {
            return Err(ThemisError::tree(format!("node {child} is already attached")));
        }
        if !parent_attached {
            return Err(ThemisError::tree(format!(
                "parent {parent} is not part of the tree"
            )));
        }

        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.attached = true;
        self.nodes[parent.0].children.push(child);
        self.attached += 1;
        Ok(())
    }

    /// Move every subtree below `staged`'s root under `at`, keeping order.
    pub fn graft(&mut self, at: NodeId, staged: AssignmentTree) -> Result<()> {
        self.node(at)?;
        let mut mapped: Vec<Option<NodeId>> = vec![None; staged.nodes.len()];
        mapped[staged.root.0] = Some(at);

        for (id, _, node) in staged.iter_preorder() {
            if id == staged.root {
                continue;
            }
            let parent = node
                .parent
                .and_then(|p| mapped[p.0])
                .ok_or_else(|| ThemisError::tree(format!("staged node {id} has no parent")))?;
            let new_id = self.build_node(parent, node.name.clone(), node.url.clone())?;
            self.append_child(parent, new_id)?;
            mapped[id.0] = Some(new_id);
        }
        Ok(())
    }

    /// Edges on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        self.iter_preorder()
            .map(|(_, level, _)| level)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk from the root yielding `(id, level, node)`.
    pub fn iter_preorder(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![(self.root, 0)],
        }
    }

    /// Indented outline, one `name (url)` per line, at most `max_depth` levels below the root.
    pub fn render(&self, max_depth: Option<usize>) -> String {
        let mut out = String::new();
        for (_, level, node) in self.iter_preorder() {
            if max_depth.is_some_and(|max| level > max) {
                continue;
            }
            out.push_str(&"  ".repeat(level));
            out.push_str(&node.name);
            out.push_str(" (");
            out.push_str(&node.url);
            out.push_str(")\n");
        }
        out
    }
}

impl fmt::Display for AssignmentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

/// Iterator returned by [`AssignmentTree::iter_preorder`].
pub struct PreOrder<'a> {
    tree: &'a AssignmentTree,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeId, usize, &'a AssignmentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, level) = self.stack.pop()?;
        let node = self.tree.get(id)?;
        // Reverse so the leftmost child is popped first
        for &child in node.children.iter().rev() {
            self.stack.push((child, level + 1));
        }
        Some((id, level, node))
    }
}
