use std::io;
use std::sync::{Mutex, MutexGuard};

use crate::account::{Account, AccountId};
use crate::error::{Error, Result};
use crate::query::TransactionFilter;
use crate::rule::{Rule, RuleId};
use crate::store::LedgerStore;
use crate::tag::{Tag, TagId};
use crate::transaction::{Transaction, TransactionId};

#[derive(Default)]
struct Tables {
    next_id: i64,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    rules: Vec<Rule>,
    tags: Vec<Tag>,
    inserts: usize,
}

impl Tables {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// In-process `LedgerStore`, used in tests and for dry runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_after_inserts: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose transaction inserts start failing once `n` have succeeded.
    pub fn failing_after(n: usize) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            fail_after_inserts: Some(n),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.lock().transactions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LedgerStore for MemoryStore {
    async fn create_account(&self, account: &mut Account) -> Result<()> {
        account.validate()?;
        let mut t = self.lock();
        if t.accounts.iter().any(|a| a.number == account.number) {
            return Err(Error::Duplicate(format!("account {}", account.number)));
        }
        account.id = Some(AccountId(t.next_id()));
        t.accounts.push(account.clone());
        Ok(())
    }

    async fn find_account(&self, number: &str) -> Result<Option<Account>> {
        Ok(self.lock().accounts.iter().find(|a| a.number == number).cloned())
    }

    async fn find_account_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.id.as_ref() == Some(id))
            .cloned())
    }

    async fn find_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.lock().accounts.clone())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        account.validate()?;
        let mut t = self.lock();
        if t
            .accounts
            .iter()
            .any(|a| a.number == account.number && a.id != account.id)
        {
            return Err(Error::Duplicate(format!("account {}", account.number)));
        }
        let slot = t
            .accounts
            .iter_mut()
            .find(|a| a.id.is_some() && a.id == account.id)
            .ok_or_else(|| Error::NotFound("account".to_string()))?;
        *slot = account.clone();
        Ok(())
    }

    async fn create_transaction(&self, tx: &mut Transaction) -> Result<()> {
        tx.validate()?;
        let mut t = self.lock();
        if self.fail_after_inserts.is_some_and(|n| t.inserts >= n) {
            return Err(Error::storage(io::Error::new(
                io::ErrorKind::Other,
                "simulated storage failure",
            )));
        }
        if t
            .transactions
            .iter()
            .any(|x| x.account_id == tx.account_id && x.fitid == tx.fitid)
        {
            return Err(Error::Duplicate(format!("transaction {}", tx.fitid)));
        }
        tx.id = Some(TransactionId(t.next_id()));
        t.transactions.push(tx.clone());
        t.inserts += 1;
        Ok(())
    }

    async fn find_transaction(
        &self,
        account: &AccountId,
        fitid: &str,
    ) -> Result<Option<Transaction>> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .find(|x| &x.account_id == account && x.fitid == fitid)
            .cloned())
    }

    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut found: Vec<Transaction> = self
            .lock()
            .transactions
            .iter()
            .filter(|x| filter.matches(x))
            .cloned()
            .collect();
        // Insertion order breaks date ties.
        found.sort_by_key(|x| x.date);
        Ok(found)
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut t = self.lock();
        let slot = t
            .transactions
            .iter_mut()
            .find(|x| x.id.is_some() && x.id == tx.id)
            .ok_or_else(|| Error::NotFound("transaction".to_string()))?;
        slot.alias = tx.alias.clone();
        slot.tags = tx.tags.clone();
        Ok(())
    }

    async fn create_rule(&self, rule: &mut Rule) -> Result<()> {
        rule.validate()?;
        let mut t = self.lock();
        let id = t.next_id();
        rule.sequence = t.rules.iter().map(|r| r.sequence).max().unwrap_or(0) + 1;
        rule.id = Some(RuleId(id));
        t.rules.push(rule.clone());
        Ok(())
    }

    async fn find_rules(&self, account: Option<&AccountId>) -> Result<Vec<Rule>> {
        Ok(self
            .lock()
            .rules
            .iter()
            .filter(|r| r.account_id.as_ref() == account)
            .cloned()
            .collect())
    }

    async fn create_tag(&self, tag: &mut Tag) -> Result<()> {
        tag.validate()?;
        let mut t = self.lock();
        if t.tags.iter().any(|x| x.name == tag.name) {
            return Err(Error::Duplicate(format!("tag {}", tag.name)));
        }
        tag.id = Some(TagId(t.next_id()));
        t.tags.push(tag.clone());
        Ok(())
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|x| x.name == name).cloned())
    }

    async fn find_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.lock().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}
