use crate::jvm;
use crate::jvm::code::{Node, SynLabel};
use std::fmt;

/// Reasons the repair gives up on a method
///
/// None of these are recoverable: they mean the method body was not shaped the way the upstream
/// decompilation is supposed to shape it, so the method is reported as failed and left untouched.
#[derive(Debug)]
pub enum Error {
    /// Exception table entry `entry` (0-based) is not structurally valid
    MalformedExceptionTable {
        entry: usize,
        reason: MalformedReason,
    },

    /// The first instruction after a region or handler start is not the expected one
    UnexpectedInstructionShape {
        label: SynLabel,
        expected: ExpectedShape,
        found: Node,
    },

    /// A label has no instruction after it (or is not placed at all)
    MissingLabelTarget(SynLabel),

    /// Error manipulating the instruction stream
    Bytecode(jvm::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// A `finally` entry appears before any regular entry dispatching to the same handler
    DefaultHandlerWithoutRegularHandler,

    /// Two `finally` entries share the same handler group
    DuplicateDefaultHandler,

    /// The end of the protected range does not come after its start
    EndNotAfterStart,

    /// Nothing but labels lies between the start of the protected range and its end
    EmptyRange,
}

/// Instruction that must open a protected region or handler
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpectedShape {
    /// `nop` marking where a protected region is entered
    RegionEntry,

    /// `astore` capturing the thrown exception
    ExceptionCapture,
}

impl ExpectedShape {
    pub fn matches(self, node: &Node) -> bool {
        use jvm::code::Instruction;
        match self {
            ExpectedShape::RegionEntry => matches!(node, Node::Insn(Instruction::Nop)),
            ExpectedShape::ExceptionCapture => matches!(node, Node::Insn(Instruction::AStore(_))),
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MalformedReason::DefaultHandlerWithoutRegularHandler => {
                "default handler is not preceded by a regular handler"
            }
            MalformedReason::DuplicateDefaultHandler => "handler already has a default handler",
            MalformedReason::EndNotAfterStart => "protected range ends before it starts",
            MalformedReason::EmptyRange => "protected range covers no instructions",
        })
    }
}

impl fmt::Display for ExpectedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpectedShape::RegionEntry => "`nop`",
            ExpectedShape::ExceptionCapture => "`astore`",
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedExceptionTable { entry, reason } => {
                write!(f, "malformed exception table entry #{}: {}", entry, reason)
            }
            Error::UnexpectedInstructionShape {
                label,
                expected,
                found,
            } => write!(
                f,
                "expected {} after {:?}, but found `{}`",
                expected, label, found
            ),
            Error::MissingLabelTarget(label) => {
                write!(f, "no instruction follows label {:?}", label)
            }
            Error::Bytecode(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bytecode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::Bytecode(err)
    }
}
