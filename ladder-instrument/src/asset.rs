use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A ticker symbol as used by the venue, upper-cased. Cheap to clone; interning is left to the
/// caller since a single-pair engine only ever holds two or three of these at once.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct Asset(String);

impl Asset {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Asset {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Asset {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
