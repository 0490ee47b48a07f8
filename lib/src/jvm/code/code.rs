use super::{ExceptionHandler, InstructionStream, Node, PseudoInsn};

/// Semantic representation of a method body
#[derive(Clone, Debug, Default)]
pub struct Code {
    /// Instructions, labels, and pseudo-instructions in layout order
    pub instructions: InstructionStream,

    /// Protected regions, in the order the JVM tries them
    pub exception_table: Vec<ExceptionHandler>,
}

impl Code {
    pub fn new() -> Code {
        Code::default()
    }

    /// Does this method have any `try`/`catch`?
    pub fn has_protected_regions(&self) -> bool {
        !self.exception_table.is_empty()
    }

    /// Number of pseudo-instructions of the given kind in the stream
    pub fn count_pseudo(&self, kind: PseudoInsn) -> usize {
        self.instructions
            .iter()
            .filter(|(_, node)| matches!(node, Node::Pseudo(pseudo) if *pseudo == kind))
            .count()
    }
}
