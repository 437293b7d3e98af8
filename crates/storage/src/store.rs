use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};
use tally_core::{
    Account, AccountId, AccountType, Error, LedgerStore, Result, Rule, RuleId, RuleKind, Tag,
    TagId, Transaction, TransactionFilter, TransactionId, TransactionKind,
};

use crate::db::{create_db, create_memory_db, DbPool};

type AccountRow = (i64, String, String, i64, String, i64);
type TransactionRow = (
    i64,
    i64,
    String,
    i64,
    String,
    Option<String>,
    String,
    i64,
    NaiveDate,
);
type RuleRow = (i64, i64, Option<i64>, i64, String, String);

const ACCOUNT_COLUMNS: &str = "id, number, name, account_type, currency, balance";
const TAG_LOOKUP_CHUNK: usize = 500;
const TRANSACTION_COLUMNS: &str =
    "t.id, t.account_id, t.fitid, t.kind, t.title, t.alias, t.description, t.amount, t.date";

/// SQLite-backed `LedgerStore`.
///
/// Identifiers are SQLite row ids rendered as strings; an identifier that is
/// not a row id simply matches nothing.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let pool = create_db(path).await.map_err(db_err)?;
        tracing::debug!(path = %path.display(), "opened ledger database");
        Ok(Self::new(pool))
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = create_memory_db().await.map_err(db_err)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn load_tags(&self, ids: &[i64]) -> Result<HashMap<i64, BTreeSet<String>>> {
        let mut by_tx: HashMap<i64, BTreeSet<String>> = HashMap::new();
        // SQLite caps the number of bound parameters per statement.
        for chunk in ids.chunks(TAG_LOOKUP_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT transaction_id, tag FROM transaction_tags WHERE transaction_id IN (",
            );
            let mut list = qb.separated(", ");
            for id in chunk {
                list.push_bind(*id);
            }
            list.push_unseparated(")");
            let rows: Vec<(i64, String)> = qb
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
            for (id, tag) in rows {
                by_tx.entry(id).or_default().insert(tag);
            }
        }
        Ok(by_tx)
    }

    async fn hydrate(&self, rows: Vec<TransactionRow>) -> Result<Vec<Transaction>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.0).collect();
        let mut tags = self.load_tags(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let id = row.0;
                let mut tx = transaction_from_row(row)?;
                tx.tags = tags.remove(&id).unwrap_or_default();
                Ok(tx)
            })
            .collect()
    }
}

/// Maps a sqlx failure onto the ledger's error kinds.
fn db_err(e: sqlx::Error) -> Error {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return Error::Duplicate(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return Error::NotFound(format!("referenced record ({})", db.message()));
        }
        if db.is_check_violation() {
            return Error::Validation(db.message().to_string());
        }
    }
    Error::storage(e)
}

fn row_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

fn required_id(raw: &str, what: &str) -> Result<i64> {
    row_id(raw).ok_or_else(|| Error::NotFound(format!("{what} {raw}")))
}

fn account_from_row(row: AccountRow) -> Result<Account> {
    let (id, number, name, account_type, currency, balance) = row;
    Ok(Account {
        id: Some(AccountId(id.to_string())),
        number,
        name,
        account_type: AccountType::from_code(account_type)?,
        currency,
        balance,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction> {
    let (id, account_id, fitid, kind, title, alias, description, amount, date) = row;
    Ok(Transaction {
        id: Some(TransactionId(id.to_string())),
        account_id: AccountId(account_id.to_string()),
        fitid,
        kind: TransactionKind::from_code(kind)?,
        title,
        alias,
        description,
        amount,
        date,
        tags: BTreeSet::new(),
    })
}

fn rule_from_row(row: RuleRow) -> Result<Rule> {
    let (id, sequence, account_id, kind, pattern, result) = row;
    Ok(Rule {
        id: Some(RuleId(id.to_string())),
        account_id: account_id.map(|a| AccountId(a.to_string())),
        kind: RuleKind::from_code(kind)?,
        pattern,
        result,
        sequence,
    })
}

impl LedgerStore for SqliteStore {
    async fn create_account(&self, account: &mut Account) -> Result<()> {
        account.validate()?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO accounts (number, name, account_type, currency, balance) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&account.number)
        .bind(&account.name)
        .bind(account.account_type.code())
        .bind(&account.currency)
        .bind(account.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        account.id = Some(AccountId(id.to_string()));
        Ok(())
    }

    async fn find_account(&self, number: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE number = ?"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(account_from_row).transpose()
    }

    async fn find_account_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        let Some(id) = row_id(id.as_str()) else {
            return Ok(None);
        };
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(account_from_row).transpose()
    }

    async fn find_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(account_from_row).collect()
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        account.validate()?;
        let id = account
            .id
            .as_ref()
            .and_then(|id| row_id(id.as_str()))
            .ok_or_else(|| Error::NotFound("account".to_string()))?;
        let result = sqlx::query(
            "UPDATE accounts SET number = ?, name = ?, account_type = ?, currency = ?, balance = ? WHERE id = ?",
        )
        .bind(&account.number)
        .bind(&account.name)
        .bind(account.account_type.code())
        .bind(&account.currency)
        .bind(account.balance)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    async fn create_transaction(&self, tx: &mut Transaction) -> Result<()> {
        tx.validate()?;
        let account_id = required_id(tx.account_id.as_str(), "account")?;

        let mut db = self.pool.begin().await.map_err(db_err)?;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO transactions (account_id, fitid, kind, title, alias, description, amount, date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(&tx.fitid)
        .bind(tx.kind.code())
        .bind(&tx.title)
        .bind(&tx.alias)
        .bind(&tx.description)
        .bind(tx.amount)
        .bind(tx.date)
        .fetch_one(&mut *db)
        .await
        .map_err(db_err)?;

        for tag in &tx.tags {
            sqlx::query("INSERT INTO transaction_tags (transaction_id, tag) VALUES (?, ?)")
                .bind(id)
                .bind(tag)
                .execute(&mut *db)
                .await
                .map_err(db_err)?;
        }
        db.commit().await.map_err(db_err)?;

        tx.id = Some(TransactionId(id.to_string()));
        Ok(())
    }

    async fn find_transaction(
        &self,
        account: &AccountId,
        fitid: &str,
    ) -> Result<Option<Transaction>> {
        let Some(account_id) = row_id(account.as_str()) else {
            return Ok(None);
        };
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.account_id = ? AND t.fitid = ?"
        ))
        .bind(account_id)
        .bind(fitid)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE 1 = 1"
        ));

        if !filter.accounts.is_empty() {
            let ids: Vec<i64> = filter
                .accounts
                .iter()
                .filter_map(|a| row_id(a.as_str()))
                .collect();
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            qb.push(" AND t.account_id IN (");
            let mut list = qb.separated(", ");
            for id in ids {
                list.push_bind(id);
            }
            list.push_unseparated(")");
        }

        if !filter.kinds.is_empty() {
            qb.push(" AND t.kind IN (");
            let mut list = qb.separated(", ");
            for kind in &filter.kinds {
                list.push_bind(kind.code());
            }
            list.push_unseparated(")");
        }

        if !filter.tags.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM transaction_tags tt WHERE tt.transaction_id = t.id AND tt.tag IN (",
            );
            let mut list = qb.separated(", ");
            for tag in &filter.tags {
                list.push_bind(tag.clone());
            }
            list.push_unseparated("))");
        }

        if let Some(range) = filter.range {
            qb.push(" AND t.date >= ").push_bind(range.start);
            qb.push(" AND t.date <= ").push_bind(range.end);
        }

        qb.push(" ORDER BY t.date, t.id");

        let rows: Vec<TransactionRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let id = tx
            .id
            .as_ref()
            .and_then(|id| row_id(id.as_str()))
            .ok_or_else(|| Error::NotFound("transaction".to_string()))?;

        let mut db = self.pool.begin().await.map_err(db_err)?;
        let result = sqlx::query("UPDATE transactions SET alias = ? WHERE id = ?")
            .bind(&tx.alias)
            .bind(id)
            .execute(&mut *db)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("transaction {id}")));
        }

        sqlx::query("DELETE FROM transaction_tags WHERE transaction_id = ?")
            .bind(id)
            .execute(&mut *db)
            .await
            .map_err(db_err)?;
        for tag in &tx.tags {
            sqlx::query("INSERT INTO transaction_tags (transaction_id, tag) VALUES (?, ?)")
                .bind(id)
                .bind(tag)
                .execute(&mut *db)
                .await
                .map_err(db_err)?;
        }
        db.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn create_rule(&self, rule: &mut Rule) -> Result<()> {
        rule.validate()?;
        let account_id = match &rule.account_id {
            Some(account) => Some(required_id(account.as_str(), "account")?),
            None => None,
        };
        let (id, sequence): (i64, i64) = sqlx::query_as(
            r#"
            INSERT INTO rules (sequence, account_id, kind, pattern, result)
            VALUES ((SELECT COALESCE(MAX(sequence), 0) + 1 FROM rules), ?, ?, ?, ?)
            RETURNING id, sequence
            "#,
        )
        .bind(account_id)
        .bind(rule.kind.code())
        .bind(&rule.pattern)
        .bind(&rule.result)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        rule.id = Some(RuleId(id.to_string()));
        rule.sequence = sequence;
        Ok(())
    }

    async fn find_rules(&self, account: Option<&AccountId>) -> Result<Vec<Rule>> {
        let rows: Vec<RuleRow> = match account {
            None => sqlx::query_as(
                "SELECT id, sequence, account_id, kind, pattern, result FROM rules WHERE account_id IS NULL ORDER BY sequence",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?,
            Some(account) => {
                let Some(id) = row_id(account.as_str()) else {
                    return Ok(Vec::new());
                };
                sqlx::query_as(
                    "SELECT id, sequence, account_id, kind, pattern, result FROM rules WHERE account_id = ? ORDER BY sequence",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?
            }
        };
        rows.into_iter().map(rule_from_row).collect()
    }

    async fn create_tag(&self, tag: &mut Tag) -> Result<()> {
        tag.validate()?;
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO tags (name, budget) VALUES (?, ?) RETURNING id")
                .bind(&tag.name)
                .bind(tag.budget)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        tag.id = Some(TagId(id.to_string()));
        Ok(())
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, budget FROM tags WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(|(id, name, budget)| Tag {
            id: Some(TagId(id.to_string())),
            name,
            budget,
        }))
    }

    async fn find_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, budget FROM tags ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(id, name, budget)| Tag {
                id: Some(TagId(id.to_string())),
                name,
                budget,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::DateRange;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn store_with_account() -> (SqliteStore, AccountId) {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut acc = Account::new("12345", "Banking", AccountType::Checking);
        store.create_account(&mut acc).await.unwrap();
        (store, acc.id.unwrap())
    }

    fn tx(account: &AccountId, fitid: &str, amount: i64, on: NaiveDate) -> Transaction {
        Transaction::new(
            account.clone(),
            fitid,
            if amount < 0 {
                TransactionKind::Debit
            } else {
                TransactionKind::Credit
            },
            "SUPERMARKET",
            amount,
            on,
        )
    }

    #[tokio::test]
    async fn create_account_assigns_row_id() {
        let (store, id) = store_with_account().await;
        assert_eq!(id, AccountId::new("1"));

        let found = store.find_account("12345").await.unwrap().unwrap();
        assert_eq!(found.name, "Banking");
        assert_eq!(found.account_type, AccountType::Checking);
        assert!(store.find_account("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_account_requires_number() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut acc = Account::new("", "Nameless", AccountType::Savings);
        assert!(matches!(
            store.create_account(&mut acc).await,
            Err(Error::Validation(_))
        ));
        assert!(acc.id.is_none());
    }

    #[tokio::test]
    async fn duplicate_account_number_is_rejected() {
        let (store, _) = store_with_account().await;
        let mut again = Account::new("12345", "Copy", AccountType::Savings);
        assert!(matches!(
            store.create_account(&mut again).await,
            Err(Error::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn update_account_persists_balance() {
        let (store, id) = store_with_account().await;
        let mut acc = store.find_account_by_id(&id).await.unwrap().unwrap();
        acc.balance = 123_45;
        acc.currency = "BRL".into();
        store.update_account(&acc).await.unwrap();

        let found = store.find_account_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.balance, 123_45);
        assert_eq!(found.currency, "BRL");

        let mut ghost = acc.clone();
        ghost.id = Some(AccountId::new("42"));
        assert!(matches!(
            store.update_account(&ghost).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn transaction_roundtrips_with_tags() {
        let (store, acc) = store_with_account().await;
        let mut t = tx(&acc, "F1", -1500, date(2024, 3, 2));
        t.alias = Some("Market".into());
        t.description = "card purchase".into();
        t.tags.insert("Groceries".into());
        store.create_transaction(&mut t).await.unwrap();
        assert!(t.id.is_some());

        let found = store.find_transaction(&acc, "F1").await.unwrap().unwrap();
        assert_eq!(found, t);
        assert!(store.find_transaction(&acc, "F2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_pair_is_unique_per_account() {
        let (store, acc) = store_with_account().await;
        let mut other = Account::new("777", "Savings", AccountType::Savings);
        store.create_account(&mut other).await.unwrap();
        let other = other.id.unwrap();

        store
            .create_transaction(&mut tx(&acc, "F1", -100, date(2024, 1, 1)))
            .await
            .unwrap();
        assert!(matches!(
            store
                .create_transaction(&mut tx(&acc, "F1", -100, date(2024, 1, 1)))
                .await,
            Err(Error::Duplicate(_))
        ));
        store
            .create_transaction(&mut tx(&other, "F1", -100, date(2024, 1, 1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn transaction_needs_existing_account() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut t = tx(&AccountId::new("9"), "F1", -100, date(2024, 1, 1));
        assert!(matches!(
            store.create_transaction(&mut t).await,
            Err(Error::NotFound(_))
        ));
        let mut blank = tx(&AccountId::new("9"), "", -100, date(2024, 1, 1));
        assert!(matches!(
            store.create_transaction(&mut blank).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_transaction_replaces_alias_and_tags() {
        let (store, acc) = store_with_account().await;
        let mut t = tx(&acc, "F1", -100, date(2024, 1, 1));
        t.tags.insert("Old".into());
        store.create_transaction(&mut t).await.unwrap();

        t.alias = Some("Corner shop".into());
        t.tags = ["Food".to_string(), "Weekly".to_string()].into_iter().collect();
        t.title = "ignored".into();
        store.update_transaction(&t).await.unwrap();

        let found = store.find_transaction(&acc, "F1").await.unwrap().unwrap();
        assert_eq!(found.alias.as_deref(), Some("Corner shop"));
        assert_eq!(found.title, "SUPERMARKET");
        assert!(found.has_tag("Food") && found.has_tag("Weekly"));
        assert!(!found.has_tag("Old"));
    }

    #[tokio::test]
    async fn find_transactions_filters_and_orders() {
        let (store, acc) = store_with_account().await;
        let mut late = tx(&acc, "A", -300, date(2024, 3, 20));
        late.tags.insert("Food".into());
        let mut early = tx(&acc, "B", -200, date(2024, 3, 1));
        early.tags.insert("Rent".into());
        let mut credit = tx(&acc, "C", 5000, date(2024, 3, 5));
        let mut outside = tx(&acc, "D", -100, date(2024, 4, 1));
        for t in [&mut late, &mut early, &mut credit, &mut outside] {
            store.create_transaction(t).await.unwrap();
        }

        let all = store
            .find_transactions(&TransactionFilter::default())
            .await
            .unwrap();
        let order: Vec<&str> = all.iter().map(|t| t.fitid.as_str()).collect();
        assert_eq!(order, ["B", "C", "A", "D"]);

        let march = TransactionFilter {
            accounts: vec![acc.clone()],
            kinds: vec![TransactionKind::Debit],
            tags: Vec::new(),
            range: Some(DateRange::new(date(2024, 3, 1), date(2024, 3, 31))),
        };
        let found = store.find_transactions(&march).await.unwrap();
        let order: Vec<&str> = found.iter().map(|t| t.fitid.as_str()).collect();
        assert_eq!(order, ["B", "A"]);

        let tagged = TransactionFilter {
            tags: vec!["Food".into(), "Missing".into()],
            ..TransactionFilter::default()
        };
        let found = store.find_transactions(&tagged).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].has_tag("Food"));

        let unknown = TransactionFilter::for_account(AccountId::new("not-a-row"));
        assert!(store.find_transactions(&unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_rules_is_scoped_exactly() {
        let (store, acc) = store_with_account().await;
        let mut global = Rule::new(None, RuleKind::Tag, "market", "Groceries");
        let mut scoped = Rule::new(Some(acc.clone()), RuleKind::Rename, "uber", "Taxi");
        store.create_rule(&mut global).await.unwrap();
        store.create_rule(&mut scoped).await.unwrap();
        assert_eq!(global.sequence, 1);
        assert_eq!(scoped.sequence, 2);

        let globals = store.find_rules(None).await.unwrap();
        assert_eq!(globals, vec![global.clone()]);
        let own = store.find_rules(Some(&acc)).await.unwrap();
        assert_eq!(own, vec![scoped.clone()]);
        assert!(store
            .find_rules(Some(&AccountId::new("2")))
            .await
            .unwrap()
            .is_empty());

        let all = store.rules_for(&acc).await.unwrap();
        assert_eq!(all, vec![global, scoped]);
    }

    #[tokio::test]
    async fn create_rule_requires_pattern() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut rule = Rule::new(None, RuleKind::Tag, "", "Groceries");
        assert!(matches!(
            store.create_rule(&mut rule).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn tags_are_unique_and_sorted() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_tag(&mut Tag::new("Rent", 150000)).await.unwrap();
        store.create_tag(&mut Tag::new("Food", 50000)).await.unwrap();
        assert!(matches!(
            store.create_tag(&mut Tag::new("Rent", 1)).await,
            Err(Error::Duplicate(_))
        ));

        let names: Vec<String> = store
            .find_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["Food", "Rent"]);
        assert_eq!(store.find_tag("Food").await.unwrap().unwrap().budget, 50000);
        assert!(store.find_tag("Travel").await.unwrap().is_none());
    }
    #[tokio::test]
    async fn find_transactions_beyond_parameter_limit() {
        let (store, acc) = store_with_account().await;
        sqlx::query(
            r#"
            WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 33000)
            INSERT INTO transactions (account_id, fitid, kind, title, description, amount, date)
            SELECT ?, 'F' || i, 0, 'BULK', '', -100, '2024-01-01' FROM n
            "#,
        )
        .bind(acc.as_str().parse::<i64>().unwrap())
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query("INSERT INTO transaction_tags (transaction_id, tag) SELECT id, 'Bulk' FROM transactions WHERE id % 1000 = 0")
            .execute(store.pool())
            .await
            .unwrap();

        let all = store
            .find_transactions(&TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 33000);
        assert_eq!(all.iter().filter(|t| t.has_tag("Bulk")).count(), 33);
    }
}
