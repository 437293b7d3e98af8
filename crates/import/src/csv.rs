use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use tally_core::{AccountId, Transaction, TransactionKind};
use thiserror::Error;

use crate::statement::{ParsedStatement, RejectedRecord, StatementImporter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvColumnMapping {
    pub date_column: Option<usize>,
    pub title_column: Option<usize>,
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    pub memo_column: Option<usize>,
    /// Column holding the bank's transaction ID. Without one, IDs are derived
    /// from the row contents.
    pub fitid_column: Option<usize>,
    pub date_format: String,
}

impl Default for CsvColumnMapping {
    fn default() -> Self {
        Self {
            date_column: None,
            title_column: None,
            amount_column: None,
            debit_column: None,
            credit_column: None,
            memo_column: None,
            fitid_column: None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvImportProfile {
    pub name: String,
    pub mapping: CsvColumnMapping,
    pub has_header: bool,
    pub delimiter: String,
}

impl Default for CsvImportProfile {
    fn default() -> Self {
        Self {
            name: "Unnamed Profile".to_string(),
            mapping: CsvColumnMapping::default(),
            has_header: true,
            delimiter: ",".to_string(),
        }
    }
}

impl CsvImportProfile {
    /// `date,title,amount` with ISO dates and a header row.
    pub fn simple() -> Self {
        Self {
            name: "simple".to_string(),
            mapping: CsvColumnMapping {
                date_column: Some(0),
                title_column: Some(1),
                amount_column: Some(2),
                ..CsvColumnMapping::default()
            },
            ..Self::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No data rows")]
    NoDataRows,
}

impl From<CsvError> for tally_core::Error {
    fn from(e: CsvError) -> Self {
        tally_core::Error::Parse(e.to_string())
    }
}

/// `StatementImporter` for CSV exports described by a column profile.
pub struct CsvImporter {
    profile: CsvImportProfile,
}

impl CsvImporter {
    pub fn new(profile: CsvImportProfile) -> Self {
        Self { profile }
    }

    fn read(&self, account: &AccountId, data: &[u8]) -> Result<ParsedStatement, CsvError> {
        let mapping = &self.profile.mapping;
        let date_col = mapping
            .date_column
            .ok_or_else(|| CsvError::MissingColumn("date_column".to_string()))?;
        let has_amount = mapping.amount_column.is_some()
            || (mapping.debit_column.is_some() && mapping.credit_column.is_some());
        if !has_amount {
            return Err(CsvError::MissingColumn("amount_column".to_string()));
        }

        let delimiter = self.profile.delimiter.as_bytes().first().copied().unwrap_or(b',');
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.profile.has_header)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(data);

        let mut parsed = ParsedStatement::default();
        let mut seen: HashMap<(NaiveDate, String, i64), usize> = HashMap::new();
        let mut rows = 0usize;

        for (index, result) in reader.records().enumerate() {
            let record = result?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows += 1;

            let row = match read_row(&record, mapping, date_col) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(index, error = %e, "rejecting CSV row");
                    parsed.rejected.push(RejectedRecord {
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let fitid = match mapping.fitid_column {
                Some(col) => record.get(col).unwrap_or_default().trim().to_string(),
                None => {
                    let occurrence = seen
                        .entry((row.date, row.title.clone(), row.amount))
                        .or_insert(0);
                    let id = synthetic_fitid(row.date, &row.title, row.amount, *occurrence);
                    *occurrence += 1;
                    id
                }
            };
            if fitid.is_empty() {
                tracing::warn!(index, "rejecting CSV row without FITID");
                parsed.rejected.push(RejectedRecord {
                    index,
                    reason: "missing FITID".to_string(),
                });
                continue;
            }

            let mut tx = Transaction::new(account.clone(), &fitid, row.kind, &row.title, row.amount, row.date);
            tx.description = row.memo;
            parsed.candidates.push(tx);
        }

        if rows == 0 {
            return Err(CsvError::NoDataRows);
        }

        Ok(parsed)
    }
}

impl StatementImporter for CsvImporter {
    fn parse(&self, account: &AccountId, data: &[u8]) -> tally_core::Result<ParsedStatement> {
        Ok(self.read(account, data)?)
    }
}

struct CsvRow {
    date: NaiveDate,
    title: String,
    amount: i64,
    kind: TransactionKind,
    memo: String,
}

fn read_row(
    record: &csv::StringRecord,
    mapping: &CsvColumnMapping,
    date_col: usize,
) -> Result<CsvRow, CsvError> {
    let field = record
        .get(date_col)
        .ok_or_else(|| CsvError::MissingColumn(format!("date_column {date_col}")))?;
    let date = parse_date(field, &mapping.date_format)?;

    let title = mapping
        .title_column
        .and_then(|col| record.get(col))
        .unwrap_or_default()
        .trim()
        .to_string();

    let (amount, kind) = if let Some(col) = mapping.amount_column {
        let amount = parse_amount(record.get(col).unwrap_or_default())?;
        let kind = if amount < 0 {
            TransactionKind::Debit
        } else {
            TransactionKind::Credit
        };
        (amount, kind)
    } else {
        let pick = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|s| !s.trim().is_empty())
                .map(parse_amount)
                .transpose()
        };
        match (pick(mapping.debit_column)?, pick(mapping.credit_column)?) {
            (Some(d), _) => (-d.abs(), TransactionKind::Debit),
            (None, Some(c)) => (c.abs(), TransactionKind::Credit),
            (None, None) => return Err(CsvError::InvalidAmount("empty debit and credit".to_string())),
        }
    };

    let memo = mapping
        .memo_column
        .and_then(|col| record.get(col))
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(CsvRow {
        date,
        title,
        amount,
        kind,
        memo,
    })
}

/// Stable ID for a row without one: identical rows on the same day are told
/// apart by their occurrence index within the file.
fn synthetic_fitid(date: NaiveDate, title: &str, amount: i64, occurrence: usize) -> String {
    let digest = Sha256::digest(format!("{date}|{title}|{amount}|{occurrence}").as_bytes());
    format!("csv-{:x}", digest)
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, CsvError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &[
        "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%Y-%m-%d",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<i64, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    (dec * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or(CsvError::InvalidAmount(s))
}
