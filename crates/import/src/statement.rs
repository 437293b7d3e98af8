use tally_core::{AccountId, AccountType, DateRange, Result, Transaction};

/// Account details a statement reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementAccount {
    pub number: String,
    pub account_type: Option<AccountType>,
    pub currency: Option<String>,
    /// Ledger balance at statement end, in the smallest currency unit.
    pub balance: Option<i64>,
}

/// A statement record that could not become a candidate transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Zero-based position of the record in the statement.
    pub index: usize,
    pub reason: String,
}

/// Normalized output of a statement importer.
#[derive(Debug, Clone, Default)]
pub struct ParsedStatement {
    pub account: StatementAccount,
    pub period: Option<DateRange>,
    /// Candidates in statement order, each with a non-empty FITID.
    pub candidates: Vec<Transaction>,
    pub rejected: Vec<RejectedRecord>,
}

/// Turns raw statement bytes for a known account into candidate transactions.
///
/// A malformed statement as a whole is an `Error::Parse`. Individual records
/// missing a FITID (or another required field) are left out of `candidates`
/// and listed in `rejected` instead.
pub trait StatementImporter {
    fn parse(&self, account: &AccountId, data: &[u8]) -> Result<ParsedStatement>;
}
