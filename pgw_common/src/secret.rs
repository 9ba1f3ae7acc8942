//! Redacting wrapper for merchant credentials.

use std::fmt;

/// A vendor credential, typically the `HashKey` or `HashIV` issued alongside a merchant id.
///
/// The wrapped value never reaches `Debug` or `Display` output, so configuration structs that
/// embed one can be logged freely. Key material only escapes through [`Secret::reveal`], which
/// keeps every use of the raw credential easy to audit.
#[derive(Clone, Default)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
