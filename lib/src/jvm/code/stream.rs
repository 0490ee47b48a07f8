use super::{LabelGenerator, Node, SynLabel, SynLabelGenerator};
use crate::jvm::Error;
use std::collections::HashMap;
use std::fmt;

/// Handle to a node in an [`InstructionStream`]
///
/// Handles stay valid (and keep pointing at the same node) no matter how many other nodes get
/// inserted around them.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Clone, Debug)]
struct Link {
    node: Node,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Ordered, mutable sequence of nodes making up one method body
///
/// Nodes live in an arena and are chained into a doubly-linked list, so inserting next to a node
/// found earlier is constant time and never invalidates other handles. Nodes are never removed.
///
/// The stream also owns the label generator for the method, since labels are only meaningful
/// within one stream, and tracks where each label is placed.
#[derive(Clone, Debug, Default)]
pub struct InstructionStream {
    links: Vec<Link>,
    first: Option<NodeId>,
    last: Option<NodeId>,
    label_positions: HashMap<SynLabel, NodeId>,
    label_generator: SynLabelGenerator,
}

impl InstructionStream {
    pub fn new() -> InstructionStream {
        InstructionStream::default()
    }

    /// Allocate a label for this stream (it still needs to be placed)
    pub fn fresh_label(&mut self) -> SynLabel {
        self.label_generator.fresh_label()
    }

    /// Number of nodes in the stream
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.links.get(id.0).map(|link| &link.node)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.links.get(id.0).and_then(|link| link.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.links.get(id.0).and_then(|link| link.prev)
    }

    /// Where is a label placed?
    pub fn label_position(&self, label: SynLabel) -> Option<NodeId> {
        self.label_positions.get(&label).copied()
    }

    /// Append a node to the end of the stream
    pub fn push(&mut self, node: impl Into<Node>) -> Result<NodeId, Error> {
        let id = self.allocate(node.into())?;
        self.links[id.0].prev = self.last;
        match self.last {
            Some(last) => self.links[last.0].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        Ok(id)
    }

    /// Append a label to the end of the stream
    pub fn place_label(&mut self, label: SynLabel) -> Result<NodeId, Error> {
        self.push(Node::Label(label))
    }

    /// Insert a node immediately before another node
    pub fn insert_before(&mut self, at: NodeId, node: impl Into<Node>) -> Result<NodeId, Error> {
        self.check_node(at)?;
        let id = self.allocate(node.into())?;
        let prev = self.links[at.0].prev;
        self.links[id.0].prev = prev;
        self.links[id.0].next = Some(at);
        self.links[at.0].prev = Some(id);
        match prev {
            Some(prev) => self.links[prev.0].next = Some(id),
            None => self.first = Some(id),
        }
        Ok(id)
    }

    /// Insert a node immediately after another node
    pub fn insert_after(&mut self, at: NodeId, node: impl Into<Node>) -> Result<NodeId, Error> {
        self.check_node(at)?;
        let id = self.allocate(node.into())?;
        let next = self.links[at.0].next;
        self.links[id.0].prev = Some(at);
        self.links[id.0].next = next;
        self.links[at.0].next = Some(id);
        match next {
            Some(next) => self.links[next.0].prev = Some(id),
            None => self.last = Some(id),
        }
        Ok(id)
    }

    /// First node after a label that is not itself a label
    ///
    /// Returns `None` if the label is not placed or if only labels follow it.
    pub fn first_real_after(&self, label: SynLabel) -> Option<(NodeId, &Node)> {
        let mut cursor = self.next(self.label_position(label)?);
        while let Some(id) = cursor {
            let node = &self.links[id.0].node;
            if node.as_label().is_none() {
                return Some((id, node));
            }
            cursor = self.links[id.0].next;
        }
        None
    }

    /// Ordinal position of every placed label, in stream order
    ///
    /// Consecutive labels get distinct ordinals even though they denote the same code offset.
    pub fn label_layout(&self) -> HashMap<SynLabel, usize> {
        self.iter()
            .enumerate()
            .filter_map(|(idx, (_, node))| node.as_label().map(|label| (label, idx)))
            .collect()
    }

    /// Iterate through nodes in stream order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stream: self,
            cursor: self.first,
        }
    }

    fn check_node(&self, id: NodeId) -> Result<(), Error> {
        if id.0 < self.links.len() {
            Ok(())
        } else {
            Err(Error::UnknownNode(id))
        }
    }

    /// Put a node into the arena (unlinked)
    fn allocate(&mut self, node: Node) -> Result<NodeId, Error> {
        let id = NodeId(self.links.len());
        if let Node::Label(label) = node {
            if self.label_positions.contains_key(&label) {
                return Err(Error::DuplicateLabel(label));
            }
            self.label_positions.insert(label, id);
        }
        self.links.push(Link {
            node,
            prev: None,
            next: None,
        });
        Ok(id)
    }
}

/// Iterator over the nodes of a stream, in order
pub struct Iter<'a> {
    stream: &'a InstructionStream,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let link = &self.stream.links[id.0];
        self.cursor = link.next;
        Some((id, &link.node))
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = (NodeId, &'a Node);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{Instruction, PseudoInsn};

    fn nodes(stream: &InstructionStream) -> Vec<Node> {
        stream.iter().map(|(_, node)| node.clone()).collect()
    }

    #[test]
    fn push_and_iterate() {
        let mut stream = InstructionStream::new();
        let l0 = stream.fresh_label();
        stream.place_label(l0).unwrap();
        stream.push(Instruction::Nop).unwrap();
        stream.push(Instruction::Return).unwrap();

        assert_eq!(
            nodes(&stream),
            vec![
                Node::Label(l0),
                Node::Insn(Instruction::Nop),
                Node::Insn(Instruction::Return)
            ]
        );
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn insertions_keep_handles_stable() {
        let mut stream = InstructionStream::new();
        let nop = stream.push(Instruction::Nop).unwrap();
        let ret = stream.push(Instruction::Return).unwrap();

        stream
            .insert_before(nop, PseudoInsn::SaveStackBeforeTry)
            .unwrap();
        stream
            .insert_after(nop, PseudoInsn::RestoreStackInHandler)
            .unwrap();
        stream.insert_after(ret, Instruction::AThrow).unwrap();
        let fresh = stream.fresh_label();
        stream.insert_before(nop, Node::Label(fresh)).unwrap();

        assert_eq!(
            nodes(&stream),
            vec![
                Node::Pseudo(PseudoInsn::SaveStackBeforeTry),
                Node::Label(fresh),
                Node::Insn(Instruction::Nop),
                Node::Pseudo(PseudoInsn::RestoreStackInHandler),
                Node::Insn(Instruction::Return),
                Node::Insn(Instruction::AThrow),
            ]
        );
        assert_eq!(stream.get(nop), Some(&Node::Insn(Instruction::Nop)));
        assert_eq!(stream.label_position(fresh), stream.prev(nop));
        assert_eq!(stream.get(stream.last().unwrap()), Some(&Node::Insn(Instruction::AThrow)));
        assert_eq!(
            stream.get(stream.first().unwrap()),
            Some(&Node::Pseudo(PseudoInsn::SaveStackBeforeTry))
        );
    }

    #[test]
    fn first_real_after_skips_labels() {
        let mut stream = InstructionStream::new();
        let l0 = stream.fresh_label();
        let l1 = stream.fresh_label();
        let l2 = stream.fresh_label();
        stream.place_label(l0).unwrap();
        stream.place_label(l1).unwrap();
        let store = stream.push(Instruction::AStore(1)).unwrap();
        stream.place_label(l2).unwrap();

        assert_eq!(
            stream.first_real_after(l0),
            Some((store, &Node::Insn(Instruction::AStore(1))))
        );
        assert_eq!(stream.first_real_after(l2), None);

        let unplaced = stream.fresh_label();
        assert_eq!(stream.first_real_after(unplaced), None);
    }

    #[test]
    fn duplicate_label_rejected() {
        let mut stream = InstructionStream::new();
        let l0 = stream.fresh_label();
        stream.place_label(l0).unwrap();
        match stream.place_label(l0) {
            Err(Error::DuplicateLabel(label)) => assert_eq!(label, l0),
            other => panic!("expected duplicate label error, got {:?}", other),
        }
        assert_eq!(stream.len(), 1, "failed placement should not add a node");
    }

    #[test]
    fn label_layout_is_ordered() {
        let mut stream = InstructionStream::new();
        let l0 = stream.fresh_label();
        let l1 = stream.fresh_label();
        let end = stream.place_label(l1).unwrap();
        stream.insert_before(end, Instruction::Nop).unwrap();
        stream.insert_before(end, Node::Label(l0)).unwrap();

        let layout = stream.label_layout();
        assert!(layout[&l0] < layout[&l1]);
    }
}
