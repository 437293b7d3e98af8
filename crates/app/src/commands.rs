use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tally::Ledger;
use tally_core::{
    split_list, AccountId, AccountType, BudgetReport, LedgerStore, Money, RuleKind,
    TransactionFilter, TransactionKind,
};
use tally_import::{CsvImportProfile, CsvImporter, ImportSummary, OfxImporter, StatementImporter};

use crate::cli::{AccountAction, Commands, FilterArgs, RuleAction, StatementFormat, TagAction};

pub async fn run<S: LedgerStore>(ledger: &Ledger<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Account { action } => match action {
            AccountAction::Add {
                number,
                name,
                account_type,
            } => cmd_account_add(ledger, &number, &name, &account_type).await,
            AccountAction::List => cmd_account_list(ledger).await,
        },
        Commands::Tag { action } => match action {
            TagAction::Add { name, budget } => cmd_tag_add(ledger, &name, &budget).await,
            TagAction::List => cmd_tag_list(ledger).await,
        },
        Commands::Rule { action } => match action {
            RuleAction::Add {
                pattern,
                result,
                kind,
                account,
            } => cmd_rule_add(ledger, &pattern, &result, &kind, account).await,
            RuleAction::List { account } => cmd_rule_list(ledger, account).await,
            RuleAction::Import { file } => cmd_rule_import(ledger, &file).await,
        },
        Commands::Import {
            file,
            account,
            format,
            csv_profile,
        } => {
            cmd_import(
                ledger,
                &file,
                account.as_deref(),
                format,
                csv_profile.as_deref(),
            )
            .await
        }
        Commands::Reapply { account } => cmd_reapply(ledger, account).await,
        Commands::Transactions { filter } => cmd_transactions(ledger, &filter).await,
        Commands::Budget { filter, json } => cmd_budget(ledger, &filter, json).await,
    }
}

async fn cmd_account_add<S: LedgerStore>(
    ledger: &Ledger<S>,
    number: &str,
    name: &str,
    account_type: &str,
) -> Result<()> {
    let account_type: AccountType = account_type.parse()?;
    let account = ledger.create_account(number, name, account_type).await?;
    println!(
        "Created account {} ({})",
        account.number,
        account.id.map(|id| id.to_string()).unwrap_or_default()
    );
    Ok(())
}

async fn cmd_account_list<S: LedgerStore>(ledger: &Ledger<S>) -> Result<()> {
    let accounts = ledger.accounts().await?;
    if accounts.is_empty() {
        println!("No accounts yet. Import a statement or run `tally account add`.");
        return Ok(());
    }
    println!(
        "{:<6} {:<16} {:<20} {:<11} {:>14}",
        "ID", "NUMBER", "NAME", "TYPE", "BALANCE"
    );
    for account in accounts {
        println!(
            "{:<6} {:<16} {:<20} {:<11} {:>14}",
            account.id.map(|id| id.to_string()).unwrap_or_default(),
            account.number,
            account.name,
            account.account_type,
            Money::from_cents(account.balance).to_string()
        );
    }
    Ok(())
}

async fn cmd_tag_add<S: LedgerStore>(ledger: &Ledger<S>, name: &str, budget: &str) -> Result<()> {
    let budget: Money = budget.parse()?;
    let tag = ledger.create_tag(name, budget.cents()).await?;
    println!("Created tag {} with budget {}", tag.name, budget);
    Ok(())
}

async fn cmd_tag_list<S: LedgerStore>(ledger: &Ledger<S>) -> Result<()> {
    for tag in ledger.tags().await? {
        println!("{:<24} {:>12}", tag.name, Money::from_cents(tag.budget).to_string());
    }
    Ok(())
}

async fn cmd_rule_add<S: LedgerStore>(
    ledger: &Ledger<S>,
    pattern: &str,
    result: &str,
    kind: &str,
    account: Option<String>,
) -> Result<()> {
    let kind: RuleKind = kind.parse()?;
    let rule = ledger
        .create_rule(account.map(AccountId), kind, pattern, result)
        .await?;
    println!(
        "Created {} rule #{}: \"{}\" -> {}",
        rule.kind, rule.sequence, rule.pattern, rule.result
    );
    Ok(())
}

async fn cmd_rule_list<S: LedgerStore>(ledger: &Ledger<S>, account: Option<String>) -> Result<()> {
    let account = account.map(AccountId);
    let rules = ledger.rules(account.as_ref()).await?;
    if rules.is_empty() {
        println!("No rules.");
    }
    for rule in rules {
        println!(
            "#{:<4} {:<7} {:<8} {:<30} {}",
            rule.sequence,
            rule.kind.to_string(),
            rule.account_id
                .map(|a| a.to_string())
                .unwrap_or_else(|| "*".to_string()),
            rule.pattern,
            rule.result
        );
    }
    Ok(())
}

async fn cmd_rule_import<S: LedgerStore>(ledger: &Ledger<S>, file: &Path) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let created = ledger.import_rules_file(&content).await?;
    println!("Created {} rule(s) from {}", created.len(), file.display());
    Ok(())
}

async fn cmd_import<S: LedgerStore>(
    ledger: &Ledger<S>,
    file: &Path,
    account: Option<&str>,
    format: StatementFormat,
    csv_profile: Option<&Path>,
) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    match format {
        StatementFormat::Ofx => import_with(ledger, &data, account, &OfxImporter).await,
        StatementFormat::Csv => {
            let profile: CsvImportProfile = match csv_profile {
                Some(path) => {
                    let raw = fs::read_to_string(path)
                        .with_context(|| format!("read {}", path.display()))?;
                    toml::from_str(&raw)
                        .with_context(|| format!("parse CSV profile {}", path.display()))?
                }
                None => CsvImportProfile::simple(),
            };
            let importer = CsvImporter::new(profile);
            import_with(ledger, &data, account, &importer).await
        }
    }
}

async fn import_with<S: LedgerStore, I: StatementImporter>(
    ledger: &Ledger<S>,
    data: &[u8],
    account: Option<&str>,
    importer: &I,
) -> Result<()> {
    let (number, summary) = match account {
        Some(number) => {
            let Some(found) = ledger.find_account(number).await? else {
                bail!("no account with number {number}");
            };
            let Some(id) = found.id else {
                bail!("account {number} has no id");
            };
            let summary = ledger.import_statement(&id, data, importer).await?;
            (found.number, summary)
        }
        None => {
            let (account, summary) = ledger.import_statement_auto(data, importer).await?;
            (account.number, summary)
        }
    };
    print_summary(&number, &summary);
    Ok(())
}

fn print_summary(number: &str, summary: &ImportSummary) {
    println!("Imported into account {number}:");
    println!("  new:         {}", summary.imported);
    println!("  categorized: {}", summary.categorized);
    println!("  duplicates:  {}", summary.skipped);
    println!("  rejected:    {}", summary.rejected);
}

async fn cmd_reapply<S: LedgerStore>(ledger: &Ledger<S>, account: Option<String>) -> Result<()> {
    let account = account.map(AccountId);
    let updated = ledger.reapply_rules(account.as_ref()).await?;
    println!("Updated {updated} transaction(s)");
    Ok(())
}

async fn cmd_transactions<S: LedgerStore>(ledger: &Ledger<S>, args: &FilterArgs) -> Result<()> {
    let kinds = split_list(&args.types)
        .iter()
        .map(|t| t.parse::<TransactionKind>())
        .collect::<Result<Vec<_>, _>>()?;
    let filter = TransactionFilter {
        accounts: split_list(&args.accounts).into_iter().map(AccountId).collect(),
        kinds,
        tags: split_list(&args.tags),
        range: Some(ledger.resolve_window(&args.start, &args.end)),
    };

    let transactions = ledger.transactions(&filter).await?;
    for tx in &transactions {
        let tags: Vec<&str> = tx.tags.iter().map(String::as_str).collect();
        println!(
            "{}  {:<6} {:<32} {:>12}  {}",
            tx.date,
            tx.kind.to_string(),
            tx.display_title(),
            Money::from_cents(tx.amount).to_string(),
            tags.join(", ")
        );
    }
    println!("{} transaction(s)", transactions.len());
    Ok(())
}

async fn cmd_budget<S: LedgerStore>(ledger: &Ledger<S>, args: &FilterArgs, json: bool) -> Result<()> {
    let query = ledger.report_query(&args.accounts, &args.types, &args.tags, &args.start, &args.end)?;
    let report = ledger.compute_budgets(&query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &BudgetReport) {
    let kinds: Vec<String> = report.kinds.iter().map(|k| k.to_string()).collect();
    println!("Budget {} ({})", report.window, kinds.join(", "));
    println!(
        "{:<24} {:>12} {:>12} {:>12}",
        "TAG", "BUDGETED", "SPENT", "REMAINING"
    );
    for entry in &report.entries {
        println!(
            "{:<24} {:>12} {:>12} {:>12}",
            entry.tag,
            Money::from_cents(entry.budgeted).to_string(),
            Money::from_cents(entry.spent).to_string(),
            Money::from_cents(entry.remaining).to_string()
        );
        if entry.months.len() > 1 {
            for month in &entry.months {
                println!(
                    "  {:<22} {:>12} {:>12}",
                    month.month.to_string(),
                    "",
                    Money::from_cents(month.spent).to_string()
                );
            }
        }
    }
    println!(
        "{:<24} {:>12} {:>12}",
        "TOTAL",
        Money::from_cents(report.total_budgeted()).to_string(),
        Money::from_cents(report.total_spent()).to_string()
    );
    if let Some(untagged) = &report.untagged {
        println!(
            "Untagged: {} transaction(s), {}",
            untagged.count,
            Money::from_cents(untagged.spent)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{MemoryStore, ReportSettings};

    const CSV: &str = "date,title,amount\n2024-11-02,DOMINOS PIZZA #42,-18.00\n2024-11-03,PAYROLL,2500.00\n";

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new(), ReportSettings::default())
    }

    #[tokio::test]
    async fn tag_add_parses_budget() {
        let ledger = ledger();
        cmd_tag_add(&ledger, "Food", "450.50").await.unwrap();
        let tags = ledger.tags().await.unwrap();
        assert_eq!(tags[0].budget, 45050);
        assert!(cmd_tag_add(&ledger, "Rent", "lots").await.is_err());
    }

    #[tokio::test]
    async fn csv_import_into_named_account() {
        let ledger = ledger();
        cmd_account_add(&ledger, "123", "Checking", "checking").await.unwrap();
        cmd_tag_add(&ledger, "Pizza", "50").await.unwrap();
        cmd_rule_add(&ledger, "dominos", "Pizza", "tag", None).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nov.csv");
        fs::write(&path, CSV).unwrap();

        cmd_import(&ledger, &path, Some("123"), StatementFormat::Csv, None)
            .await
            .unwrap();
        let stored = ledger
            .transactions(&TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].has_tag("Pizza"));

        // A CSV statement names no account, so one must be given.
        assert!(cmd_import(&ledger, &path, None, StatementFormat::Csv, None)
            .await
            .is_err());
        assert!(cmd_import(&ledger, &path, Some("999"), StatementFormat::Csv, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_rule_kind_is_rejected() {
        let ledger = ledger();
        assert!(cmd_rule_add(&ledger, "x", "y", "color", None).await.is_err());
    }

    #[tokio::test]
    async fn budget_and_listing_accept_filters() {
        let ledger = ledger();
        let args = FilterArgs {
            start: "2024-11".into(),
            end: "2024-11".into(),
            types: "debit".into(),
            ..FilterArgs::default()
        };
        cmd_budget(&ledger, &args, true).await.unwrap();
        cmd_transactions(&ledger, &args).await.unwrap();

        let bad = FilterArgs {
            types: "refund".into(),
            ..FilterArgs::default()
        };
        assert!(cmd_budget(&ledger, &bad, false).await.is_err());
        assert!(cmd_transactions(&ledger, &bad).await.is_err());
    }
}
