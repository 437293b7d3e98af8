use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use tally_core::{
    resolve_window, Account, AccountId, AccountType, BudgetCalculator, BudgetReport, DateRange,
    Error, LedgerStore, ReportQuery, ReportSettings, Result, Rule, RuleKind, Tag, Transaction,
    TransactionFilter,
};
use tally_import::{
    parse_rules_toml, ImportError, ImportPipeline, ImportSummary, ParsedStatement, RuleEngine,
    StatementImporter,
};

/// The ledger's public operations over any `LedgerStore`.
pub struct Ledger<S: LedgerStore> {
    store: S,
    settings: ReportSettings,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, settings: ReportSettings) -> Self {
        Self { store, settings }
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    pub async fn create_account(
        &self,
        number: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account> {
        let mut account = Account::new(number.trim(), name, account_type);
        self.store.create_account(&mut account).await?;
        tracing::info!(number = %account.number, "account created");
        Ok(account)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.find_accounts().await
    }

    pub async fn find_account(&self, number: &str) -> Result<Option<Account>> {
        self.store.find_account(number).await
    }

    // ── Tags ─────────────────────────────────────────────────────────────────

    pub async fn create_tag(&self, name: &str, budget: i64) -> Result<Tag> {
        let mut tag = Tag::new(name, budget);
        self.store.create_tag(&mut tag).await?;
        Ok(tag)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.store.find_tags().await
    }

    // ── Rules ────────────────────────────────────────────────────────────────

    /// Creates a rule after checking that its scope account and, for a tag
    /// rule, the tag it assigns both exist.
    pub async fn create_rule(
        &self,
        account: Option<AccountId>,
        kind: RuleKind,
        pattern: &str,
        result: &str,
    ) -> Result<Rule> {
        let mut rule = Rule::new(account, kind, pattern.trim(), result.trim());
        rule.validate()?;
        self.check_rule_refs(&rule).await?;
        self.store.create_rule(&mut rule).await?;
        tracing::debug!(sequence = rule.sequence, pattern = %rule.pattern, "rule created");
        Ok(rule)
    }

    /// Rules scoped exactly to `account`; `None` lists the global rules.
    pub async fn rules(&self, account: Option<&AccountId>) -> Result<Vec<Rule>> {
        self.store.find_rules(account).await
    }

    /// Creates every rule of a TOML rules document, in document order. Stops
    /// at the first rule that fails; earlier rules stay created.
    pub async fn import_rules_file(&self, content: &str) -> Result<Vec<Rule>> {
        let parsed = parse_rules_toml(content)?;
        let mut created = Vec::with_capacity(parsed.len());
        for mut rule in parsed {
            self.check_rule_refs(&rule).await?;
            self.store.create_rule(&mut rule).await?;
            created.push(rule);
        }
        tracing::info!(count = created.len(), "rules imported");
        Ok(created)
    }

    async fn check_rule_refs(&self, rule: &Rule) -> Result<()> {
        if let Some(account) = &rule.account_id {
            if self.store.find_account_by_id(account).await?.is_none() {
                return Err(Error::NotFound(format!("account {account}")));
            }
        }
        if rule.kind == RuleKind::Tag && self.store.find_tag(&rule.result).await?.is_none() {
            return Err(Error::NotFound(format!("tag {}", rule.result)));
        }
        Ok(())
    }

    // ── Rule application ─────────────────────────────────────────────────────

    /// Runs every rule that applies to the transaction's account and returns
    /// the categorized copy. Nothing is persisted.
    pub async fn apply_rules(&self, tx: &Transaction) -> Result<Transaction> {
        let rules = self.store.rules_for(&tx.account_id).await?;
        Ok(RuleEngine::new(rules).transform(tx))
    }

    /// Re-runs the rules over stored transactions (all, or one account's) and
    /// persists those whose alias or tags changed. Returns how many changed.
    pub async fn reapply_rules(&self, account: Option<&AccountId>) -> Result<usize> {
        let filter = match account {
            Some(account) => TransactionFilter::for_account(account.clone()),
            None => TransactionFilter::default(),
        };
        let transactions = self.store.find_transactions(&filter).await?;

        let mut engines: HashMap<AccountId, RuleEngine> = HashMap::new();
        let mut updated = 0;
        for mut tx in transactions {
            if !engines.contains_key(&tx.account_id) {
                let rules = self.store.rules_for(&tx.account_id).await?;
                engines.insert(tx.account_id.clone(), RuleEngine::new(rules));
            }
            let Some(engine) = engines.get(&tx.account_id) else {
                continue;
            };
            if engine.apply(&mut tx) {
                self.store.update_transaction(&tx).await?;
                updated += 1;
            }
        }
        tracing::info!(updated, "rules reapplied");
        Ok(updated)
    }

    // ── Import ───────────────────────────────────────────────────────────────

    /// Imports a statement into an existing account, refreshing the account
    /// balance when the statement reports one.
    pub async fn import_statement<I: StatementImporter>(
        &self,
        account_id: &AccountId,
        data: &[u8],
        importer: &I,
    ) -> std::result::Result<ImportSummary, ImportError> {
        let mut account = self
            .store
            .find_account_by_id(account_id)
            .await
            .and_then(|found| found.ok_or_else(|| Error::NotFound(format!("account {account_id}"))))
            .map_err(not_started)?;

        let parsed = importer.parse(account_id, data).map_err(not_started)?;
        if let Some(balance) = parsed.account.balance {
            account.balance = balance;
            self.store.update_account(&account).await.map_err(not_started)?;
        }
        ImportPipeline::new(&self.store)
            .import_parsed(account_id, parsed)
            .await
    }

    /// Imports a statement into the account it names, creating the account
    /// from the statement's details when the number is unknown.
    pub async fn import_statement_auto<I: StatementImporter>(
        &self,
        data: &[u8],
        importer: &I,
    ) -> std::result::Result<(Account, ImportSummary), ImportError> {
        let unbound = AccountId::new("");
        let parsed = importer.parse(&unbound, data).map_err(not_started)?;
        let account = self.upsert_account(&parsed).await.map_err(not_started)?;
        let Some(account_id) = account.id.clone() else {
            return Err(not_started(Error::NotFound("account id".to_string())));
        };
        let summary = ImportPipeline::new(&self.store)
            .import_parsed(&account_id, parsed)
            .await?;
        Ok((account, summary))
    }

    async fn upsert_account(&self, parsed: &ParsedStatement) -> Result<Account> {
        let details = &parsed.account;
        if details.number.trim().is_empty() {
            return Err(Error::validation(
                "statement does not name an account; choose one explicitly",
            ));
        }

        match self.store.find_account(&details.number).await? {
            Some(mut account) => {
                let mut dirty = false;
                if let Some(balance) = details.balance {
                    dirty |= account.balance != balance;
                    account.balance = balance;
                }
                if account.currency.is_empty() {
                    if let Some(currency) = &details.currency {
                        account.currency = currency.clone();
                        dirty = true;
                    }
                }
                if dirty {
                    self.store.update_account(&account).await?;
                }
                Ok(account)
            }
            None => {
                let mut account = Account::new(
                    &details.number,
                    &details.number,
                    details.account_type.unwrap_or(AccountType::Checking),
                );
                account.currency = details.currency.clone().unwrap_or_default();
                account.balance = details.balance.unwrap_or(0);
                self.store.create_account(&mut account).await?;
                tracing::info!(number = %account.number, "account created from statement");
                Ok(account)
            }
        }
    }

    // ── Reporting ────────────────────────────────────────────────────────────

    /// Resolves raw `YYYY-MM` bounds against today's date.
    pub fn resolve_window(&self, raw_start: &str, raw_end: &str) -> DateRange {
        resolve_window(raw_start, raw_end, today())
    }

    /// Builds a report query from comma-separated form values.
    pub fn report_query(
        &self,
        accounts: &str,
        types: &str,
        tags: &str,
        start: &str,
        end: &str,
    ) -> Result<ReportQuery> {
        ReportQuery::parse(accounts, types, tags, start, end, today(), &self.settings)
    }

    pub async fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        self.store.find_transactions(filter).await
    }

    /// Spent vs budgeted per tag over the query window. Without a tag filter
    /// every known tag gets an entry; an unknown tag name reports a zero budget.
    pub async fn compute_budgets(&self, query: &ReportQuery) -> Result<BudgetReport> {
        let transactions = if query.window.is_empty() {
            Vec::new()
        } else {
            self.store.find_transactions(&query.filter()).await?
        };

        let known = self.store.find_tags().await?;
        let tags: Vec<Tag> = if query.tags.is_empty() {
            known
        } else {
            query
                .tags
                .iter()
                .map(|name| {
                    known
                        .iter()
                        .find(|t| &t.name == name)
                        .cloned()
                        .unwrap_or_else(|| Tag::new(name, 0))
                })
                .collect()
        };

        let report = BudgetCalculator::new(self.settings.clone()).compute(
            &transactions,
            &tags,
            query.window,
            &query.kinds,
        );
        tracing::debug!(
            window = %report.window,
            entries = report.entries.len(),
            "budget report computed"
        );
        Ok(report)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn not_started(source: Error) -> ImportError {
    ImportError {
        committed: 0,
        source,
    }
}
