use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(pub String);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spending category. The name is the natural key; rules and transactions
/// refer to tags by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<TagId>,
    pub name: String,
    /// Monthly budget in the smallest currency unit. Zero means tracked but unbudgeted.
    pub budget: i64,
}

impl Tag {
    pub fn new(name: &str, budget: i64) -> Self {
        Tag {
            id: None,
            name: name.trim().to_string(),
            budget,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("tag name is required"));
        }
        Ok(())
    }
}
