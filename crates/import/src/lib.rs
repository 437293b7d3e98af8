pub mod csv;
pub mod ofx;
pub mod pipeline;
pub mod rules;
pub mod statement;

pub use crate::csv::{CsvColumnMapping, CsvImportProfile, CsvImporter};
pub use ofx::{OfxImporter, OfxStatement, OfxTransaction};
pub use pipeline::{ImportError, ImportPipeline, ImportSummary};
pub use rules::{parse_rules_toml, rule_matches, RuleEngine};
pub use statement::{ParsedStatement, RejectedRecord, StatementAccount, StatementImporter};
