use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::budget::ReportSettings;
use crate::error::Result;
use crate::period::{resolve_window, DateRange};
use crate::transaction::{Transaction, TransactionKind};

/// Selection over stored transactions. Empty lists do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub accounts: Vec<AccountId>,
    pub kinds: Vec<TransactionKind>,
    /// A transaction matches when it carries any of these tags.
    pub tags: Vec<String>,
    pub range: Option<DateRange>,
}

impl TransactionFilter {
    pub fn for_account(account: AccountId) -> Self {
        TransactionFilter {
            accounts: vec![account],
            ..Default::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if !self.accounts.is_empty() && !self.accounts.contains(&tx.account_id) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&tx.kind) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| tx.has_tag(t)) {
            return false;
        }
        self.range.map_or(true, |r| r.contains(tx.date))
    }
}

/// A resolved report window: the day range plus the account, type and tag filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub accounts: Vec<AccountId>,
    pub kinds: Vec<TransactionKind>,
    pub tags: Vec<String>,
    pub window: DateRange,
}

impl ReportQuery {
    /// Builds a query from raw form values. Lists are comma separated; blank
    /// entries are dropped. An unknown transaction type is a validation error.
    /// No types selects `settings.default_kinds`.
    pub fn parse(
        accounts: &str,
        types: &str,
        tags: &str,
        start: &str,
        end: &str,
        today: NaiveDate,
        settings: &ReportSettings,
    ) -> Result<Self> {
        let mut kinds = split_list(types)
            .iter()
            .map(|t| t.parse::<TransactionKind>())
            .collect::<Result<Vec<_>>>()?;
        if kinds.is_empty() {
            kinds = settings.default_kinds.clone();
        }

        Ok(ReportQuery {
            accounts: split_list(accounts).into_iter().map(AccountId).collect(),
            kinds,
            tags: split_list(tags),
            window: resolve_window(start, end, today),
        })
    }

    pub fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            accounts: self.accounts.clone(),
            kinds: self.kinds.clone(),
            tags: Vec::new(),
            range: Some(self.window),
        }
    }
}

pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
