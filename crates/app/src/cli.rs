//! Command-line definitions. The handlers live in `commands`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tally - categorize bank statements and track spending against budgets
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal budget ledger over imported bank statements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Manage tags and their monthly budgets
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Manage categorization rules
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Import a bank statement
    Import {
        /// Statement file
        file: PathBuf,

        /// Account number to import into (defaults to the one the statement names)
        #[arg(short, long)]
        account: Option<String>,

        /// Statement format
        #[arg(short, long, value_enum, default_value_t = StatementFormat::Ofx)]
        format: StatementFormat,

        /// TOML column profile for CSV statements
        #[arg(long)]
        csv_profile: Option<PathBuf>,
    },

    /// Re-run the rules over stored transactions
    Reapply {
        /// Only this account ID
        #[arg(long)]
        account: Option<String>,
    },

    /// List stored transactions
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Spent vs budgeted per tag
    Budget {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account
    Add {
        /// Bank account number
        number: String,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,

        /// checking, savings, credit or investment
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
    },
    /// List accounts
    List,
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Create a tag
    Add {
        name: String,

        /// Monthly budget, e.g. 500.00
        #[arg(long, default_value = "0")]
        budget: String,
    },
    /// List tags
    List,
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// Create a rule
    Add {
        /// Case-insensitive text to look for in transaction titles
        pattern: String,

        /// Tag name for tag rules, alias for rename rules
        result: String,

        /// tag or rename
        #[arg(long, default_value = "tag")]
        kind: String,

        /// Restrict the rule to one account ID
        #[arg(long)]
        account: Option<String>,
    },
    /// List rules (global ones unless --account is given)
    List {
        #[arg(long)]
        account: Option<String>,
    },
    /// Create rules from a TOML rules file
    Import { file: PathBuf },
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// First month, YYYY-MM (defaults to the current month)
    #[arg(long, default_value = "")]
    pub start: String,

    /// Last month, YYYY-MM (defaults to the current month)
    #[arg(long, default_value = "")]
    pub end: String,

    /// Comma-separated account IDs
    #[arg(long, default_value = "")]
    pub accounts: String,

    /// Comma-separated transaction types (debit, credit)
    #[arg(long, default_value = "")]
    pub types: String,

    /// Comma-separated tag names
    #[arg(long, default_value = "")]
    pub tags: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatementFormat {
    Ofx,
    Csv,
}
