use crate::jvm::code::Code;

/// Method with a code body
#[derive(Clone, Debug)]
pub struct Method {
    /// Name used in diagnostics (eg. `foo` or `Foo.bar(I)V`)
    pub name: String,

    /// Method code implementation
    pub code: Code,
}

impl Method {
    /// Create a new method with an empty body
    pub fn new(name: impl Into<String>) -> Method {
        Method {
            name: name.into(),
            code: Code::new(),
        }
    }
}
