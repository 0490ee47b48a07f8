use super::SynLabel;
use crate::jvm::BinaryName;
use std::fmt;

/// Entry in a method's exception table
///
/// Unlike the class file form, positions are labels in the method's instruction stream rather
/// than bytecode offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive)
    pub start: SynLabel,

    /// End of the protected range (exclusive)
    pub end: SynLabel,

    /// Start of the exception handler
    pub handler: SynLabel,

    /// Class of exceptions caught (`None` catches everything)
    pub catch_type: Option<BinaryName>,
}

impl ExceptionHandler {
    /// Is this the catch-all entry of a `finally` block?
    ///
    /// Such entries protect the handler code itself, so their range starts where the handler
    /// does.
    pub fn is_default_handler(&self) -> bool {
        self.start == self.handler
    }
}

impl fmt::Display for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "try {:?} {:?} {:?} ", self.start, self.end, self.handler)?;
        match &self.catch_type {
            Some(class) => write!(f, "{}", class),
            None => f.write_str("*"),
        }
    }
}
