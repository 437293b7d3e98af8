use tally_core::{AccountId, Error, LedgerStore, Transaction};

use crate::rules::RuleEngine;
use crate::statement::ParsedStatement;

/// Outcome of a completed import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// New transactions persisted.
    pub imported: usize,
    /// Candidates already stored under the same (account, FITID).
    pub skipped: usize,
    /// Records excluded by the importer or failing validation.
    pub rejected: usize,
    /// Imported transactions that at least one rule changed.
    pub categorized: usize,
}

/// A batch that stopped part way. Everything counted in `committed` stays
/// stored; re-running the same statement is safe because of dedup.
#[derive(Debug, thiserror::Error)]
#[error("import stopped after {committed} committed transaction(s): {source}")]
pub struct ImportError {
    pub committed: usize,
    #[source]
    pub source: Error,
}

/// Orchestrates: dedup check → rule application → persist, one candidate at a time.
///
/// Callers must not run two imports for the same account concurrently.
pub struct ImportPipeline<'a, S: LedgerStore> {
    store: &'a S,
}

impl<'a, S: LedgerStore> ImportPipeline<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Imports a parsed statement's candidates, counting the records the
    /// importer already rejected.
    pub async fn import_parsed(
        &self,
        account: &AccountId,
        parsed: ParsedStatement,
    ) -> Result<ImportSummary, ImportError> {
        let mut summary = self.import(account, parsed.candidates).await?;
        summary.rejected += parsed.rejected.len();
        Ok(summary)
    }

    /// Imports candidates in order. Duplicates are skipped silently; the
    /// first storage failure stops the batch.
    pub async fn import(
        &self,
        account: &AccountId,
        candidates: Vec<Transaction>,
    ) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        let rules = self.store.rules_for(account).await.map_err(|source| ImportError {
            committed: 0,
            source,
        })?;
        let engine = RuleEngine::new(rules);

        for mut candidate in candidates {
            candidate.id = None;
            candidate.account_id = account.clone();

            if let Err(e) = candidate.validate() {
                tracing::warn!(%account, error = %e, "skipping invalid candidate");
                summary.rejected += 1;
                continue;
            }

            let existing = self
                .store
                .find_transaction(account, &candidate.fitid)
                .await
                .map_err(|source| self.abort(&summary, source))?;
            if existing.is_some() {
                tracing::debug!(%account, fitid = %candidate.fitid, "duplicate skipped");
                summary.skipped += 1;
                continue;
            }

            if engine.apply(&mut candidate) {
                summary.categorized += 1;
            }

            self.store
                .create_transaction(&mut candidate)
                .await
                .map_err(|source| self.abort(&summary, source))?;
            summary.imported += 1;
        }

        tracing::info!(
            %account,
            imported = summary.imported,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "import finished"
        );
        Ok(summary)
    }

    fn abort(&self, summary: &ImportSummary, source: Error) -> ImportError {
        tracing::warn!(committed = summary.imported, error = %source, "import aborted");
        ImportError {
            committed: summary.imported,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofx::OfxImporter;
    use crate::statement::StatementImporter;
    use chrono::NaiveDate;
    use tally_core::{MemoryStore, Rule, RuleKind, TransactionFilter, TransactionKind};

    fn candidate(fitid: &str, title: &str, amount: i64) -> Transaction {
        Transaction::new(
            AccountId::new("1"),
            fitid,
            TransactionKind::Debit,
            title,
            amount,
            NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
        )
    }

    #[tokio::test]
    async fn importing_twice_stores_one_record() {
        let store = MemoryStore::new();
        let pipeline = ImportPipeline::new(&store);
        let account = AccountId::new("1");

        let first = pipeline
            .import(&account, vec![candidate("F1", "DOMINOS", -1000)])
            .await
            .unwrap();
        let second = pipeline
            .import(&account, vec![candidate("F1", "DOMINOS", -1000)])
            .await
            .unwrap();

        assert_eq!(first.imported, 1);
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.transaction_count(), 1);
    }

    #[tokio::test]
    async fn new_transactions_are_categorized() {
        let store = MemoryStore::new();
        let account = AccountId::new("1");
        let mut scoped = Rule::new(Some(account.clone()), RuleKind::Tag, "dominos", "pizza");
        let mut global = Rule::new(None, RuleKind::Rename, "dominos", "Domino's");
        let mut other = Rule::new(Some(AccountId::new("2")), RuleKind::Tag, "dominos", "other");
        store.create_rule(&mut scoped).await.unwrap();
        store.create_rule(&mut global).await.unwrap();
        store.create_rule(&mut other).await.unwrap();

        let summary = ImportPipeline::new(&store)
            .import(
                &account,
                vec![candidate("F1", "DOMINOS PIZZA #42", -1599), candidate("F2", "RENT", -90000)],
            )
            .await
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.categorized, 1);

        let stored = store.find_transaction(&account, "F1").await.unwrap().unwrap();
        assert!(stored.has_tag("pizza"));
        assert!(!stored.has_tag("other"));
        assert_eq!(stored.alias.as_deref(), Some("Domino's"));
        assert_eq!(stored.title, "DOMINOS PIZZA #42");

        let rent = store.find_transaction(&account, "F2").await.unwrap().unwrap();
        assert!(rent.tags.is_empty());
        assert!(rent.alias.is_none());
    }

    #[tokio::test]
    async fn empty_fitid_is_excluded_without_aborting() {
        let store = MemoryStore::new();
        let summary = ImportPipeline::new(&store)
            .import(
                &AccountId::new("1"),
                vec![candidate("F1", "A", -1), candidate("", "B", -2), candidate("F3", "C", -3)],
            )
            .await
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.rejected, 1);
    }

    #[tokio::test]
    async fn storage_failure_stops_batch_and_reports_committed() {
        let store = MemoryStore::failing_after(2);
        let account = AccountId::new("1");
        let err = ImportPipeline::new(&store)
            .import(
                &account,
                vec![
                    candidate("F1", "A", -1),
                    candidate("F2", "B", -2),
                    candidate("F3", "C", -3),
                    candidate("F4", "D", -4),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.committed, 2);
        assert!(matches!(err.source, Error::Storage(_)));

        let stored = store
            .find_transactions(&TransactionFilter::for_account(account))
            .await
            .unwrap();
        let fitids: Vec<&str> = stored.iter().map(|t| t.fitid.as_str()).collect();
        assert_eq!(fitids, vec!["F1", "F2"]);
    }

    #[tokio::test]
    async fn reimporting_a_partially_imported_batch_adds_only_the_rest() {
        let store = MemoryStore::new();
        let pipeline = ImportPipeline::new(&store);
        let account = AccountId::new("1");
        let batch = vec![candidate("F1", "A", -1), candidate("F2", "B", -2)];

        pipeline.import(&account, batch[..1].to_vec()).await.unwrap();
        let retry = pipeline.import(&account, batch).await.unwrap();
        assert_eq!(retry.imported, 1);
        assert_eq!(retry.skipped, 1);
        assert_eq!(store.transaction_count(), 2);
    }

    #[tokio::test]
    async fn candidates_are_bound_to_the_target_account() {
        let store = MemoryStore::new();
        let mut stray = candidate("F1", "A", -1);
        stray.account_id = AccountId::new("99");
        ImportPipeline::new(&store)
            .import(&AccountId::new("1"), vec![stray])
            .await
            .unwrap();
        assert!(store
            .find_transaction(&AccountId::new("1"), "F1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn parsed_statement_counts_importer_rejections() {
        let ofx = b"<OFX><BANKACCTFROM><ACCTID>1</ACCTID></BANKACCTFROM>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20241101<TRNAMT>-1.00<FITID>A<NAME>X</STMTTRN>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20241102<TRNAMT>-2.00<NAME>Y</STMTTRN>
</OFX>";
        let store = MemoryStore::new();
        let account = AccountId::new("1");
        let parsed = OfxImporter.parse(&account, ofx).unwrap();
        assert_eq!(parsed.rejected.len(), 1);
        let summary = ImportPipeline::new(&store)
            .import_parsed(&account, parsed)
            .await
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.rejected, 1);
    }
}
