pub mod account;
pub mod budget;
pub mod error;
pub mod memory;
pub mod money;
pub mod period;
pub mod query;
pub mod rule;
pub mod store;
pub mod tag;
pub mod transaction;

pub use account::{Account, AccountId, AccountType};
pub use budget::{BudgetCalculator, BudgetEntry, BudgetReport, MonthSpend, ReportSettings, UntaggedSummary};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use money::Money;
pub use period::{resolve_window, DateRange, Month};
pub use query::{split_list, ReportQuery, TransactionFilter};
pub use rule::{Rule, RuleId, RuleKind};
pub use store::LedgerStore;
pub use tag::{Tag, TagId};
pub use transaction::{Transaction, TransactionId, TransactionKind};
