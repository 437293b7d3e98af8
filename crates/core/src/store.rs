use crate::account::{Account, AccountId};
use crate::error::Result;
use crate::query::TransactionFilter;
use crate::rule::Rule;
use crate::tag::Tag;
use crate::transaction::Transaction;

/// Persistence seam for accounts, transactions, rules and tags.
///
/// Creates assign the record's identifier (and a rule's sequence) in place.
/// Implementations enforce the uniqueness of account numbers, tag names and
/// `(account, fitid)` pairs, reporting violations as `Error::Duplicate`.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    async fn create_account(&self, account: &mut Account) -> Result<()>;
    /// Looks an account up by its bank account number.
    async fn find_account(&self, number: &str) -> Result<Option<Account>>;
    async fn find_account_by_id(&self, id: &AccountId) -> Result<Option<Account>>;
    async fn find_accounts(&self) -> Result<Vec<Account>>;
    async fn update_account(&self, account: &Account) -> Result<()>;

    async fn create_transaction(&self, tx: &mut Transaction) -> Result<()>;
    async fn find_transaction(&self, account: &AccountId, fitid: &str)
        -> Result<Option<Transaction>>;
    /// Matching transactions ordered by date, then identifier.
    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;
    /// Persists the alias and tag set; the remaining fields are immutable.
    async fn update_transaction(&self, tx: &Transaction) -> Result<()>;

    async fn create_rule(&self, rule: &mut Rule) -> Result<()>;
    /// Rules scoped exactly to `account`; `None` returns only the global rules.
    async fn find_rules(&self, account: Option<&AccountId>) -> Result<Vec<Rule>>;

    async fn create_tag(&self, tag: &mut Tag) -> Result<()>;
    async fn find_tag(&self, name: &str) -> Result<Option<Tag>>;
    async fn find_tags(&self) -> Result<Vec<Tag>>;

    /// Every rule that applies to `account`: its own plus the global ones.
    async fn rules_for(&self, account: &AccountId) -> Result<Vec<Rule>> {
        let mut rules = self.find_rules(None).await?;
        rules.extend(self.find_rules(Some(account)).await?);
        rules.sort_by_key(|r| r.sequence);
        Ok(rules)
    }
}
