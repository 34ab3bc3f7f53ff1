use std::collections::{BTreeSet, HashSet};

use super::model::RuleSpec;
use crate::error::PolicyError;

/// Ordinary rules partitioned by identifier
#[derive(Debug, Default, PartialEq)]
pub struct RuleDiff {
    /// Every declared rule, each carrying an id
    pub upserts: Vec<RuleSpec>,
    /// Previously known ids that are no longer declared
    pub deletes: Vec<String>,
}

/// Generate a fresh rule id
pub fn new_rule_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reject declared rules that share an assigned id
///
/// Rules without an id are skipped; they get distinct ids from the generator.
pub fn ensure_unique_ids(declared: &[RuleSpec]) -> Result<(), PolicyError> {
    let mut seen = HashSet::with_capacity(declared.len());
    for id in declared.iter().filter_map(RuleSpec::assigned_id) {
        if !seen.insert(id) {
            return Err(PolicyError::DuplicateRuleId { id: id.to_string() });
        }
    }
    Ok(())
}

/// Diff declared ordinary rules against the ids recorded by the last read
pub fn diff_rules(previous_ids: &BTreeSet<String>, declared: Vec<RuleSpec>) -> RuleDiff {
    diff_rules_with(previous_ids, declared, new_rule_id)
}

/// Same as [`diff_rules`] with a caller supplied id generator
///
/// A declared id that the previous read never saw is still an upsert; the
/// store decides whether it creates or replaces. Sequence numbers follow
/// declaration order starting at 1. Ids must already be unique, see
/// [`ensure_unique_ids`].
pub fn diff_rules_with<F>(
    previous_ids: &BTreeSet<String>,
    declared: Vec<RuleSpec>,
    mut new_id: F,
) -> RuleDiff
where
    F: FnMut() -> String,
{
    let mut declared_ids: HashSet<String> = HashSet::with_capacity(declared.len());
    let mut upserts = Vec::with_capacity(declared.len());

    for (index, mut rule) in declared.into_iter().enumerate() {
        let id = match rule.assigned_id() {
            Some(id) => id.to_string(),
            None => new_id(),
        };
        declared_ids.insert(id.clone());
        rule.id = Some(id);
        rule.sequence_number = index as u64 + 1;
        upserts.push(rule);
    }

    let deletes = previous_ids
        .iter()
        .filter(|id| !declared_ids.contains(*id))
        .cloned()
        .collect();

    RuleDiff { upserts, deletes }
}
