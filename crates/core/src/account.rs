use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Storage-assigned opaque account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
    Investment,
}

impl AccountType {
    pub fn code(self) -> i64 {
        match self {
            AccountType::Checking => 0,
            AccountType::Savings => 1,
            AccountType::Credit => 2,
            AccountType::Investment => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(AccountType::Checking),
            1 => Ok(AccountType::Savings),
            2 => Ok(AccountType::Credit),
            3 => Ok(AccountType::Investment),
            other => Err(Error::validation(format!("unknown account type code {other}"))),
        }
    }

    /// Maps an OFX `ACCTTYPE` value; anything unrecognised is treated as checking.
    pub fn from_ofx(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "SAVINGS" | "MONEYMRKT" => AccountType::Savings,
            "CREDITLINE" | "CREDITCARD" => AccountType::Credit,
            "INVESTMENT" => AccountType::Investment,
            _ => AccountType::Checking,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Checking => write!(f, "Checking"),
            AccountType::Savings => write!(f, "Savings"),
            AccountType::Credit => write!(f, "Credit"),
            AccountType::Investment => write!(f, "Investment"),
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return AccountType::from_code(code);
        }
        match s.to_lowercase().as_str() {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "credit" => Ok(AccountType::Credit),
            "investment" => Ok(AccountType::Investment),
            other => Err(Error::validation(format!("unknown account type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    /// The bank's account number, unique across accounts.
    pub number: String,
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    /// Current balance in the smallest currency unit.
    pub balance: i64,
}

impl Account {
    pub fn new(number: &str, name: &str, account_type: AccountType) -> Self {
        Account {
            id: None,
            number: number.to_string(),
            name: name.to_string(),
            account_type,
            currency: String::new(),
            balance: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.number.trim().is_empty() {
            return Err(Error::validation("account number is required"));
        }
        Ok(())
    }
}
