//! Traversal stack entries.

use crate::component::RenderContext;
use xssr_core::VirtualNode;

/// Where a frame is in its node's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The node has not been looked at yet.
    Enter,
    /// The opening markup is out; children are being visited.
    Children,
    /// All children are done; the closing markup is next.
    Exit,
}

/// One entry of the walker's explicit stack.
///
/// A frame owns its node. When a child is visited it is moved out of the
/// parent's child list, so the parent keeps only what its `Exit` needs.
#[derive(Debug)]
pub struct TraversalFrame {
    /// Node being visited.
    pub node: VirtualNode,
    /// Index of the next child to visit.
    pub child_index: usize,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Context inherited from enclosing components.
    pub context: RenderContext,
    /// Component expansions on the path to this node.
    pub expansions: u32,
}

impl TraversalFrame {
    /// Creates a frame in [`Phase::Enter`].
    pub fn enter(node: VirtualNode, context: RenderContext, expansions: u32) -> Self {
        Self {
            node,
            child_index: 0,
            phase: Phase::Enter,
            context,
            expansions,
        }
    }

    /// Number of children of the node.
    pub fn child_count(&self) -> usize {
        self.node.child_nodes().len()
    }

    /// Moves the next child out of the node and advances `child_index`.
    ///
    /// The phase becomes [`Phase::Exit`] once the last child has been taken.
    pub fn take_next_child(&mut self) -> Option<VirtualNode> {
        let children = match &mut self.node {
            VirtualNode::Element { children, .. } | VirtualNode::Fragment { children } => children,
            _ => return None,
        };
        let child = children.get_mut(self.child_index).map(std::mem::take)?;
        self.child_index += 1;
        self.phase = if self.child_index < children.len() {
            Phase::Children
        } else {
            Phase::Exit
        };
        Some(child)
    }

    /// Position of the most recently taken child, if any.
    pub fn last_child_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Enter => None,
            Phase::Children | Phase::Exit => self.child_index.checked_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_children_in_order_then_exits() {
        let node = VirtualNode::element("ul")
            .child(VirtualNode::text("a"))
            .child(VirtualNode::text("b"));
        let mut frame = TraversalFrame::enter(node, RenderContext::new(), 0);
        frame.phase = Phase::Children;
        assert_eq!(frame.last_child_index(), None);

        assert_eq!(frame.take_next_child(), Some(VirtualNode::text("a")));
        assert_eq!(frame.phase, Phase::Children);
        assert_eq!(frame.last_child_index(), Some(0));

        assert_eq!(frame.take_next_child(), Some(VirtualNode::text("b")));
        assert_eq!(frame.phase, Phase::Exit);
        assert_eq!(frame.last_child_index(), Some(1));

        assert_eq!(frame.take_next_child(), None);
        assert_eq!(frame.child_count(), 2, "taken children leave empty slots");
    }

    #[test]
    fn leaves_have_no_children() {
        let mut frame = TraversalFrame::enter(VirtualNode::text("x"), RenderContext::new(), 0);
        assert_eq!(frame.child_count(), 0);
        assert_eq!(frame.take_next_child(), None);
    }
}
