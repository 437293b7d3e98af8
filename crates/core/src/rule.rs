use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::AccountId;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Adds `result` to the transaction's tag set.
    Tag,
    /// Sets the transaction's alias to `result`.
    Rename,
}

impl RuleKind {
    pub fn code(self) -> i64 {
        match self {
            RuleKind::Tag => 0,
            RuleKind::Rename => 1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(RuleKind::Tag),
            1 => Ok(RuleKind::Rename),
            other => Err(Error::validation(format!("unknown rule type code {other}"))),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Tag => write!(f, "Tag"),
            RuleKind::Rename => write!(f, "Rename"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return RuleKind::from_code(code);
        }
        match s.to_lowercase().as_str() {
            "tag" => Ok(RuleKind::Tag),
            "rename" | "alias" => Ok(RuleKind::Rename),
            other => Err(Error::validation(format!("unknown rule type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Option<RuleId>,
    /// `None` applies the rule to every account.
    pub account_id: Option<AccountId>,
    pub kind: RuleKind,
    /// Case-insensitive substring matched against the transaction title.
    pub pattern: String,
    pub result: String,
    /// Creation order assigned by storage; lower sequences are applied first.
    pub sequence: i64,
}

impl Rule {
    pub fn new(account_id: Option<AccountId>, kind: RuleKind, pattern: &str, result: &str) -> Self {
        Rule {
            id: None,
            account_id: account_id.filter(|a| !a.as_str().is_empty()),
            kind,
            pattern: pattern.to_string(),
            result: result.to_string(),
            sequence: 0,
        }
    }

    pub fn is_global(&self) -> bool {
        self.account_id.is_none()
    }

    /// True when the rule is unscoped or scoped to `account`.
    pub fn applies_to(&self, account: &AccountId) -> bool {
        self.account_id.as_ref().map_or(true, |a| a == account)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(Error::validation("rule match pattern is required"));
        }
        if self.result.trim().is_empty() {
            return Err(Error::validation("rule result is required"));
        }
        Ok(())
    }
}
