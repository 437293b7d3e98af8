use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::account::AccountId;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a transaction. The kind, not the sign of the amount, decides
/// whether money left (Debit) or entered (Credit) the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn code(self) -> i64 {
        match self {
            TransactionKind::Debit => 0,
            TransactionKind::Credit => 1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(TransactionKind::Debit),
            1 => Ok(TransactionKind::Credit),
            other => Err(Error::validation(format!(
                "unknown transaction type code {other}"
            ))),
        }
    }

    /// Kind implied by an OFX `TRNTYPE`, falling back to the amount's sign.
    pub fn from_ofx(trn_type: Option<&str>, amount: i64) -> Self {
        match trn_type.map(|t| t.trim().to_uppercase()).as_deref() {
            Some("CREDIT" | "DEP" | "DIRECTDEP" | "INT" | "DIV") => TransactionKind::Credit,
            Some("DEBIT" | "PAYMENT" | "POS" | "ATM" | "CHECK" | "FEE" | "SRVCHG"
            | "DIRECTDEBIT" | "REPEATPMT" | "CASH") => TransactionKind::Debit,
            _ if amount < 0 => TransactionKind::Debit,
            _ => TransactionKind::Credit,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Debit => write!(f, "Debit"),
            TransactionKind::Credit => write!(f, "Credit"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return TransactionKind::from_code(code);
        }
        match s.to_lowercase().as_str() {
            "debit" => Ok(TransactionKind::Debit),
            "credit" => Ok(TransactionKind::Credit),
            other => Err(Error::validation(format!("unknown transaction type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<TransactionId>,
    pub account_id: AccountId,
    /// Financial-institution transaction ID; (account_id, fitid) is the dedup key.
    pub fitid: String,
    pub kind: TransactionKind,
    /// Title as imported. Rules always match against this, never the alias.
    pub title: String,
    pub alias: Option<String>,
    pub description: String,
    /// Signed amount in the smallest currency unit, as reported by the bank.
    pub amount: i64,
    pub date: NaiveDate,
    pub tags: BTreeSet<String>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        fitid: &str,
        kind: TransactionKind,
        title: &str,
        amount: i64,
        date: NaiveDate,
    ) -> Self {
        Transaction {
            id: None,
            account_id,
            fitid: fitid.to_string(),
            kind,
            title: title.to_string(),
            alias: None,
            description: String::new(),
            amount,
            date,
            tags: BTreeSet::new(),
        }
    }

    /// Alias when one is set, otherwise the imported title.
    pub fn display_title(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.title)
    }

    /// Magnitude of the amount, used when summing spending.
    pub fn magnitude(&self) -> i64 {
        self.amount.saturating_abs()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fitid.trim().is_empty() {
            return Err(Error::validation("transaction FITID is required"));
        }
        if self.account_id.as_str().is_empty() {
            return Err(Error::validation("transaction account is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn kind_codes_and_names() {
        assert_eq!(TransactionKind::from_code(0).unwrap(), TransactionKind::Debit);
        assert_eq!(TransactionKind::from_code(1).unwrap(), TransactionKind::Credit);
        assert!(matches!(TransactionKind::from_code(2), Err(Error::Validation(_))));
        assert_eq!("CREDIT".parse::<TransactionKind>().unwrap(), TransactionKind::Credit);
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn kind_from_ofx_prefers_trntype_over_sign() {
        assert_eq!(TransactionKind::from_ofx(Some("DEBIT"), 500), TransactionKind::Debit);
        assert_eq!(TransactionKind::from_ofx(Some("credit"), -500), TransactionKind::Credit);
        assert_eq!(TransactionKind::from_ofx(None, -500), TransactionKind::Debit);
        assert_eq!(TransactionKind::from_ofx(Some("OTHER"), 500), TransactionKind::Credit);
    }

    #[test]
    fn display_title_prefers_alias() {
        let mut tx = Transaction::new(
            AccountId::new("1"),
            "F1",
            TransactionKind::Debit,
            "DOMINOS PIZZA #42",
            -1599,
            date(2024, 11, 3),
        );
        assert_eq!(tx.display_title(), "DOMINOS PIZZA #42");
        tx.alias = Some("Pizza".to_string());
        assert_eq!(tx.display_title(), "Pizza");
        assert_eq!(tx.magnitude(), 1599);
    }

    #[test]
    fn validate_requires_fitid() {
        let tx = Transaction::new(
            AccountId::new("1"),
            "",
            TransactionKind::Debit,
            "x",
            1,
            date(2024, 1, 1),
        );
        assert!(matches!(tx.validate(), Err(Error::Validation(_))));
    }
}
