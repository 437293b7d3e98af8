use serde::Deserialize;
use tally_core::{AccountId, Error, Result, Rule, RuleKind, Transaction};

/// Case-insensitive substring match of `pattern` in `title`. An empty title
/// never matches a non-empty pattern, and an empty pattern matches nothing.
pub fn rule_matches(title: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    title.to_lowercase().contains(&pattern.to_lowercase())
}

/// Applies an ordered rule set to transactions.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut rules = rules;
        // Earliest-created first; the sort is stable for equal sequences.
        rules.sort_by_key(|r| r.sequence);
        Self { rules }
    }

    /// Rules that are scoped to the transaction's account (or global) and whose
    /// pattern matches its original title, in precedence order.
    pub fn matching_rules<'a>(&'a self, tx: &'a Transaction) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules
            .iter()
            .filter(move |r| r.applies_to(&tx.account_id) && rule_matches(&tx.title, &r.pattern))
    }

    /// Runs every applicable rule against `tx` in one forward pass. Tags are
    /// only ever added and the last matching rename sets the alias, so a
    /// second application is a no-op. Returns whether `tx` changed.
    pub fn apply(&self, tx: &mut Transaction) -> bool {
        let matched: Vec<(RuleKind, String)> = self
            .matching_rules(tx)
            .map(|r| (r.kind, r.result.clone()))
            .collect();

        let mut changed = false;
        for (kind, result) in matched {
            tracing::debug!(fitid = %tx.fitid, %kind, %result, "rule matched");
            match kind {
                RuleKind::Tag => changed |= tx.tags.insert(result),
                RuleKind::Rename => {
                    if tx.alias.as_deref() != Some(result.as_str()) {
                        tx.alias = Some(result);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Returns the transformed copy, leaving the input untouched.
    pub fn transform(&self, tx: &Transaction) -> Transaction {
        let mut out = tx.clone();
        self.apply(&mut out);
        out
    }
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rule: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    #[serde(default)]
    account: Option<String>,
    kind: String,
    #[serde(rename = "match")]
    pattern: String,
    result: String,
}

/// Parses a rules document made of `[[rule]]` tables. Document order is
/// preserved so it can become creation order.
///
/// ```toml
/// [[rule]]
/// account = "1"
/// kind = "tag"
/// match = "dominos"
/// result = "pizza"
/// ```
pub fn parse_rules_toml(content: &str) -> Result<Vec<Rule>> {
    let file: RulesFile =
        toml::from_str(content).map_err(|e| Error::Parse(format!("rules file: {e}")))?;

    file.rule
        .into_iter()
        .map(|entry| {
            let kind: RuleKind = entry.kind.parse()?;
            let rule = Rule::new(
                entry.account.map(AccountId),
                kind,
                entry.pattern.trim(),
                entry.result.trim(),
            );
            rule.validate()?;
            Ok(rule)
        })
        .collect()
}
