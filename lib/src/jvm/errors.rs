use super::code::{NodeId, SynLabel};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// A label is placed at two positions in the same stream (indicates a bug)
    DuplicateLabel(SynLabel),

    /// Node id does not belong to the stream it was used with
    UnknownNode(NodeId),

    /// Malformed method listing
    Parse { line: usize, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::DuplicateLabel(label) => write!(f, "label {:?} is placed more than once", label),
            Error::UnknownNode(node) => write!(f, "node {:?} is not part of this stream", node),
            Error::Parse { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
