use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use tally_core::{AccountId, AccountType, DateRange, Transaction, TransactionKind};
use thiserror::Error;

use crate::statement::{ParsedStatement, RejectedRecord, StatementAccount, StatementImporter};

#[derive(Debug, Clone, Default)]
pub struct OfxTransaction {
    pub fit_id: Option<String>,
    pub trn_type: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<i64>,
    pub memo: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OfxAccount {
    pub account_id: String,
    pub bank_id: Option<String>,
    pub account_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OfxStatement {
    pub account: OfxAccount,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ledger_balance: Option<i64>,
    pub currency: Option<String>,
    pub transactions: Vec<OfxTransaction>,
}

#[derive(Error, Debug)]
pub enum OfxError {
    #[error("Failed to parse OFX: {0}")]
    ParseError(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<OfxError> for tally_core::Error {
    fn from(e: OfxError) -> Self {
        tally_core::Error::Parse(e.to_string())
    }
}

pub struct OfxParser;

impl OfxParser {
    /// Parses SGML (OFX 1.x) or XML (OFX 2.x) statements. Elements are read
    /// as a flat stream of `<TAG>value` tokens, so unclosed SGML leaves and
    /// closed XML leaves are handled the same way.
    pub fn parse(data: &str) -> Result<OfxStatement, OfxError> {
        let mut statement = OfxStatement {
            account: OfxAccount::default(),
            start_date: None,
            end_date: None,
            ledger_balance: None,
            currency: None,
            transactions: Vec::new(),
        };

        let mut saw_root = false;
        let mut in_ledger_balance = false;
        let mut in_account_from = false;
        let mut current_trx: Option<OfxTransaction> = None;

        for token in data.split('<').skip(1) {
            let Some((tag, value)) = token.split_once('>') else {
                return Err(OfxError::ParseError(format!("unterminated tag '<{}'", token.trim())));
            };
            let tag = tag.trim().to_uppercase();
            let value = value.trim();
            let value = (!value.is_empty()).then(|| decode_entities(value));

            match tag.as_str() {
                "OFX" => saw_root = true,
                "BANKACCTFROM" | "CCACCTFROM" => in_account_from = true,
                "/BANKACCTFROM" | "/CCACCTFROM" => in_account_from = false,
                // Transfer blocks (BANKACCTTO, CCACCTTO) carry the other party's account.
                "ACCTID" if in_account_from => {
                    if let Some(v) = value {
                        statement.account.account_id = v;
                    }
                }
                "BANKID" if in_account_from => statement.account.bank_id = value,
                "ACCTTYPE" if in_account_from => statement.account.account_type = value,
                "CURDEF" => statement.currency = value,
                "DTSTART" => statement.start_date = value.as_deref().and_then(parse_ofx_date),
                "DTEND" => statement.end_date = value.as_deref().and_then(parse_ofx_date),
                "LEDGERBAL" => in_ledger_balance = true,
                "/LEDGERBAL" => in_ledger_balance = false,
                "BALAMT" if in_ledger_balance => {
                    statement.ledger_balance = value.as_deref().and_then(parse_ofx_amount);
                }
                "STMTTRN" => current_trx = Some(OfxTransaction::default()),
                "/STMTTRN" => {
                    if let Some(trx) = current_trx.take() {
                        statement.transactions.push(trx);
                    }
                }
                _ => {
                    if let Some(trx) = current_trx.as_mut() {
                        match tag.as_str() {
                            "FITID" => trx.fit_id = value,
                            "TRNTYPE" => trx.trn_type = value,
                            "DTPOSTED" => trx.date = value.as_deref().and_then(parse_ofx_date),
                            "TRNAMT" => trx.amount = value.as_deref().and_then(parse_ofx_amount),
                            "MEMO" => trx.memo = value,
                            "NAME" => trx.name = value,
                            _ => {}
                        }
                    }
                }
            }
        }

        // SGML statements may omit the final </STMTTRN>.
        if let Some(trx) = current_trx.take() {
            statement.transactions.push(trx);
        }

        if !saw_root {
            return Err(OfxError::ParseError("no <OFX> element".to_string()));
        }
        if statement.account.account_id.is_empty() {
            return Err(OfxError::MissingField("ACCTID".to_string()));
        }

        Ok(statement)
    }
}

fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let (Some(y), Some(m), Some(d)) = (s.get(0..4), s.get(4..6), s.get(6..8)) {
        if let (Ok(y), Ok(m), Ok(d)) = (y.parse::<i32>(), m.parse::<u32>(), d.parse::<u32>()) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return Some(date);
            }
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

/// Decodes the predefined XML entities. `&amp;` goes last so `&amp;lt;`
/// stays a literal `&lt;`.
fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_ofx_amount(s: &str) -> Option<i64> {
    let s = s.trim().replace(',', "");
    let dec = Decimal::from_str(&s).ok()?;
    (dec * Decimal::from(100)).round().to_i64()
}

pub fn parse(data: &[u8]) -> Result<OfxStatement, OfxError> {
    let content = String::from_utf8_lossy(data);
    OfxParser::parse(&content)
}

/// `StatementImporter` for OFX/QFX downloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfxImporter;

impl StatementImporter for OfxImporter {
    fn parse(&self, account: &AccountId, data: &[u8]) -> tally_core::Result<ParsedStatement> {
        let ofx = parse(data)?;

        let mut candidates = Vec::with_capacity(ofx.transactions.len());
        let mut rejected = Vec::new();

        for (index, trx) in ofx.transactions.into_iter().enumerate() {
            let fit_id = trx.fit_id.unwrap_or_default();
            let missing = if fit_id.trim().is_empty() {
                Some("FITID")
            } else if trx.date.is_none() {
                Some("DTPOSTED")
            } else if trx.amount.is_none() {
                Some("TRNAMT")
            } else {
                None
            };
            if let Some(field) = missing {
                tracing::warn!(index, field, "rejecting OFX record");
                rejected.push(RejectedRecord {
                    index,
                    reason: format!("missing {field}"),
                });
                continue;
            }

            let (Some(date), Some(amount)) = (trx.date, trx.amount) else {
                continue;
            };
            let kind = TransactionKind::from_ofx(trx.trn_type.as_deref(), amount);
            let (title, description) = match (trx.name, trx.memo) {
                (Some(name), memo) => (name, memo.unwrap_or_default()),
                (None, Some(memo)) => (memo, String::new()),
                (None, None) => (String::new(), String::new()),
            };

            let mut tx = Transaction::new(account.clone(), fit_id.trim(), kind, &title, amount, date);
            tx.description = description;
            candidates.push(tx);
        }

        let period = match (ofx.start_date, ofx.end_date) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        };

        Ok(ParsedStatement {
            account: StatementAccount {
                number: ofx.account.account_id,
                account_type: ofx.account.account_type.as_deref().map(AccountType::from_ofx),
                currency: ofx.currency,
                balance: ofx.ledger_balance,
            },
            period,
            candidates,
            rejected,
        })
    }
}
