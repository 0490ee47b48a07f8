use std::borrow::Cow;
use std::fmt;

/// Names of classes and interfaces, written with `/` separators (eg. `java/lang/Throwable`)
///
/// Exception table filters name the class of exceptions they catch using these.
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct BinaryName(Cow<'static, str>);

impl BinaryName {
    pub const THROWABLE: BinaryName = BinaryName(Cow::Borrowed("java/lang/Throwable"));
    pub const EXCEPTION: BinaryName = BinaryName(Cow::Borrowed("java/lang/Exception"));

    /// Check if a string would be a valid binary name
    pub fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(String::from("Binary name is empty"));
        }
        for segment in name.split('/') {
            if segment.is_empty() {
                return Err(format!("Binary name '{}' has an empty segment", name));
            }
            if segment.contains(&['.', ';', '['][..]) || segment.contains(char::is_whitespace) {
                return Err(format!(
                    "Binary name '{}' contains an illegal character",
                    name
                ));
            }
        }
        Ok(())
    }

    /// Try to construct a name from a string
    pub fn from_string(name: String) -> Result<BinaryName, String> {
        BinaryName::check_valid(&name)?;
        Ok(BinaryName(Cow::Owned(name)))
    }

    /// Extract the raw underlying string name
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for BinaryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BinaryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
