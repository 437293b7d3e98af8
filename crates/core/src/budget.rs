use serde::{Deserialize, Serialize};

use crate::period::{DateRange, Month};
use crate::tag::Tag;
use crate::transaction::{Transaction, TransactionKind};

/// Defaults applied when a report request leaves something unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Kinds counted as spending when the caller gives no type filter.
    pub default_kinds: Vec<TransactionKind>,
    /// Whether reports carry a summary of transactions with no tags.
    pub report_untagged: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            default_kinds: vec![TransactionKind::Debit],
            report_untagged: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSpend {
    pub month: Month,
    pub spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub tag: String,
    /// Monthly budget times the number of months in the window.
    pub budgeted: i64,
    /// Sum of transaction magnitudes; always non-negative.
    pub spent: i64,
    pub remaining: i64,
    pub months: Vec<MonthSpend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntaggedSummary {
    pub count: usize,
    pub spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub window: DateRange,
    pub kinds: Vec<TransactionKind>,
    pub entries: Vec<BudgetEntry>,
    /// `None` when untagged reporting is switched off.
    pub untagged: Option<UntaggedSummary>,
}

impl BudgetReport {
    pub fn total_budgeted(&self) -> i64 {
        self.entries.iter().map(|e| e.budgeted).sum()
    }

    pub fn total_spent(&self) -> i64 {
        self.entries.iter().map(|e| e.spent).sum()
    }
}

/// Aggregates spending per tag over a window. Performs no I/O.
pub struct BudgetCalculator {
    settings: ReportSettings,
}

impl Default for BudgetCalculator {
    fn default() -> Self {
        Self::new(ReportSettings::default())
    }
}

impl BudgetCalculator {
    pub fn new(settings: ReportSettings) -> Self {
        Self { settings }
    }

    /// Computes one entry per tag in `tags`, in the given order. Only
    /// transactions inside `window` whose kind is in `kinds` count; an empty
    /// `kinds` uses the configured default.
    pub fn compute(
        &self,
        transactions: &[Transaction],
        tags: &[Tag],
        window: DateRange,
        kinds: &[TransactionKind],
    ) -> BudgetReport {
        let kinds = if kinds.is_empty() {
            self.settings.default_kinds.clone()
        } else {
            kinds.to_vec()
        };

        let counted: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| window.contains(tx.date) && kinds.contains(&tx.kind))
            .collect();
        let months = window.months();

        let entries = tags
            .iter()
            .map(|tag| {
                let tagged: Vec<&&Transaction> =
                    counted.iter().filter(|tx| tx.has_tag(&tag.name)).collect();
                let spent: i64 = tagged.iter().map(|tx| tx.magnitude()).sum();
                let budgeted = tag.budget.saturating_mul(months.len() as i64);
                let per_month = months
                    .iter()
                    .map(|&month| MonthSpend {
                        month,
                        spent: tagged
                            .iter()
                            .filter(|tx| Month::of(tx.date) == month)
                            .map(|tx| tx.magnitude())
                            .sum(),
                    })
                    .collect();

                BudgetEntry {
                    tag: tag.name.clone(),
                    budgeted,
                    spent,
                    remaining: budgeted - spent,
                    months: per_month,
                }
            })
            .collect();

        let untagged = self.settings.report_untagged.then(|| {
            let untagged: Vec<&&Transaction> =
                counted.iter().filter(|tx| tx.tags.is_empty()).collect();
            UntaggedSummary {
                count: untagged.len(),
                spent: untagged.iter().map(|tx| tx.magnitude()).sum(),
            }
        });

        BudgetReport {
            window,
            kinds,
            entries,
            untagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(fitid: &str, kind: TransactionKind, amount: i64, on: NaiveDate, tags: &[&str]) -> Transaction {
        let mut t = Transaction::new(AccountId::new("1"), fitid, kind, fitid, amount, on);
        t.tags = tags.iter().map(|s| s.to_string()).collect();
        t
    }

    fn november() -> DateRange {
        DateRange::new(date(2024, 11, 1), date(2024, 11, 30))
    }

    #[test]
    fn groceries_budget_totals() {
        let txs = vec![
            tx("a", TransactionKind::Debit, 1000, date(2024, 11, 2), &["Groceries"]),
            tx("b", TransactionKind::Debit, 2000, date(2024, 11, 12), &["Groceries"]),
            tx("c", TransactionKind::Debit, 500, date(2024, 11, 30), &["Groceries"]),
        ];
        let report = BudgetCalculator::default().compute(
            &txs,
            &[Tag::new("Groceries", 50000)],
            november(),
            &[],
        );
        let entry = &report.entries[0];
        assert_eq!(entry.budgeted, 50000);
        assert_eq!(entry.spent, 3500);
        assert_eq!(entry.remaining, 46500);
    }

    #[test]
    fn negative_amounts_count_as_positive_spending() {
        let txs = vec![
            tx("a", TransactionKind::Debit, -1000, date(2024, 11, 2), &["Groceries"]),
            tx("b", TransactionKind::Debit, -250, date(2024, 11, 3), &["Groceries"]),
        ];
        let report = BudgetCalculator::default().compute(
            &txs,
            &[Tag::new("Groceries", 2000)],
            november(),
            &[],
        );
        assert_eq!(report.entries[0].spent, 1250);
        assert_eq!(report.entries[0].remaining, 750);
    }

    #[test]
    fn credits_and_out_of_window_are_excluded_by_default() {
        let txs = vec![
            tx("a", TransactionKind::Credit, 9000, date(2024, 11, 2), &["Groceries"]),
            tx("b", TransactionKind::Debit, 700, date(2024, 10, 31), &["Groceries"]),
            tx("c", TransactionKind::Debit, 300, date(2024, 11, 1), &["Groceries"]),
        ];
        let report = BudgetCalculator::default().compute(
            &txs,
            &[Tag::new("Groceries", 1000)],
            november(),
            &[],
        );
        assert_eq!(report.kinds, vec![TransactionKind::Debit]);
        assert_eq!(report.entries[0].spent, 300);
    }

    #[test]
    fn explicit_kinds_override_default() {
        let txs = vec![tx("a", TransactionKind::Credit, 9000, date(2024, 11, 2), &["Salary"])];
        let report = BudgetCalculator::default().compute(
            &txs,
            &[Tag::new("Salary", 0)],
            november(),
            &[TransactionKind::Credit],
        );
        assert_eq!(report.entries[0].spent, 9000);
        assert_eq!(report.entries[0].remaining, -9000);
    }

    #[test]
    fn empty_transaction_set_yields_zero_reports() {
        let report = BudgetCalculator::default().compute(
            &[],
            &[Tag::new("Groceries", 50000), Tag::new("Fun", 0)],
            november(),
            &[],
        );
        assert_eq!(report.entries.len(), 2);
        assert!(report.entries.iter().all(|e| e.spent == 0));
        assert_eq!(report.untagged, Some(UntaggedSummary::default()));
    }

    #[test]
    fn untagged_transactions_are_reported_separately() {
        let txs = vec![
            tx("a", TransactionKind::Debit, 400, date(2024, 11, 2), &[]),
            tx("b", TransactionKind::Debit, 600, date(2024, 11, 3), &[]),
            tx("c", TransactionKind::Debit, 100, date(2024, 11, 3), &["Fun"]),
        ];
        let report = BudgetCalculator::default().compute(&txs, &[Tag::new("Fun", 0)], november(), &[]);
        assert_eq!(report.untagged, Some(UntaggedSummary { count: 2, spent: 1000 }));
        assert_eq!(report.entries[0].spent, 100);

        let quiet = BudgetCalculator::new(ReportSettings {
            report_untagged: false,
            ..Default::default()
        })
        .compute(&txs, &[Tag::new("Fun", 0)], november(), &[]);
        assert_eq!(quiet.untagged, None);
    }

    #[test]
    fn multi_month_window_scales_budget_and_breaks_down_by_month() {
        let txs = vec![
            tx("a", TransactionKind::Debit, 100, date(2024, 10, 5), &["Fun"]),
            tx("b", TransactionKind::Debit, 200, date(2024, 11, 5), &["Fun"]),
            tx("c", TransactionKind::Debit, 300, date(2024, 11, 6), &["Fun"]),
        ];
        let window = DateRange::new(date(2024, 10, 1), date(2024, 11, 30));
        let report = BudgetCalculator::default().compute(&txs, &[Tag::new("Fun", 1000)], window, &[]);
        let entry = &report.entries[0];
        assert_eq!(entry.budgeted, 2000);
        assert_eq!(entry.spent, 600);
        let per_month: Vec<i64> = entry.months.iter().map(|m| m.spent).collect();
        assert_eq!(per_month, vec![100, 500]);
    }

    #[test]
    fn inverted_window_counts_nothing() {
        let txs = vec![tx("a", TransactionKind::Debit, 100, date(2024, 4, 5), &["Fun"])];
        let window = DateRange::new(date(2024, 5, 1), date(2024, 3, 31));
        let report = BudgetCalculator::default().compute(&txs, &[Tag::new("Fun", 1000)], window, &[]);
        assert_eq!(report.entries[0].spent, 0);
        assert_eq!(report.entries[0].budgeted, 0);
    }

    #[test]
    fn transaction_with_two_tags_counts_in_both() {
        let txs = vec![tx("a", TransactionKind::Debit, 800, date(2024, 11, 5), &["Fun", "Food"])];
        let report = BudgetCalculator::default().compute(
            &txs,
            &[Tag::new("Food", 0), Tag::new("Fun", 0)],
            november(),
            &[],
        );
        assert_eq!(report.entries[0].spent, 800);
        assert_eq!(report.entries[1].spent, 800);
        assert_eq!(report.total_spent(), 1600);
    }
}
