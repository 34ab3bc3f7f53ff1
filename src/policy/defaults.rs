use std::collections::{BTreeSet, HashSet};

use crate::{error::PolicyError, store::PolicyStore};

use super::{
    model::{Action, RuleSpec, ScopeDefault},
    scope::{ScopeResolver, ScopeTarget, single_scope},
};

/// What the synchronizer decided for one remote default rule
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultRuleOutcome {
    /// User override applied onto the remote rule
    Override(RuleSpec),
    /// Override removed since the last cycle; rule restored to its scope default
    Revert(RuleSpec),
    /// Not declared now or before; left out of the patch
    Untouched,
}

impl DefaultRuleOutcome {
    /// Rule to submit, if any
    pub fn into_update(self) -> Option<RuleSpec> {
        match self {
            DefaultRuleOutcome::Override(rule) | DefaultRuleOutcome::Revert(rule) => Some(rule),
            DefaultRuleOutcome::Untouched => None,
        }
    }
}

/// System default name, description and action for a resolved scope
pub fn derive_scope_default(scope: &str, target: &ScopeTarget) -> ScopeDefault {
    match target {
        ScopeTarget::Other => ScopeDefault {
            display_name: scope.to_string(),
            description: scope.to_string(),
            action: Action::Drop,
        },
        ScopeTarget::Tier0(gateway) => ScopeDefault {
            display_name: gateway.display_name.clone(),
            description: gateway.description.clone(),
            action: if gateway.force_whitelisting {
                Action::Allow
            } else {
                Action::Drop
            },
        },
    }
}

/// Restore a default rule to the system default of its scope, clearing tags
pub fn revert_default_rule<S: PolicyStore + ?Sized>(
    mut rule: RuleSpec,
    resolver: &ScopeResolver<'_, S>,
) -> Result<RuleSpec, PolicyError> {
    let (scope, target) = resolver.resolve(&rule)?;
    let derived = derive_scope_default(&scope, &target);

    rule.tags.clear();
    rule.display_name = derived.display_name;
    rule.description = derived.description;
    rule.action = derived.action;

    Ok(rule)
}

/// Check declared default rules before anything is read
///
/// Each rule needs exactly one scope and no scope may be overridden twice.
pub fn validate_declared_defaults(declared: &[RuleSpec]) -> Result<(), PolicyError> {
    let mut seen = HashSet::with_capacity(declared.len());
    for rule in declared {
        let scope = single_scope(rule)?;
        if !seen.insert(scope) {
            return Err(PolicyError::DuplicateDefaultScope {
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

/// Copy the user-facing attributes of a declared default rule onto the remote one
fn apply_override(mut rule: RuleSpec, declared: &RuleSpec) -> RuleSpec {
    rule.description = declared.description.clone();
    rule.action = declared.action;
    rule.log_label = declared.log_label.clone();
    rule.logged = declared.logged;
    if !declared.tags.is_empty() || !rule.tags.is_empty() {
        rule.tags = declared.tags.clone();
    }
    rule
}

/// Decide the fate of one remote default rule
///
/// Default rules are matched by scope, never by id. A rule whose id was among
/// the previously declared overrides but has no declared counterpart now gets
/// reverted.
pub fn sync_default_rule<S: PolicyStore + ?Sized>(
    rule: RuleSpec,
    declared: &[RuleSpec],
    previous_ids: &BTreeSet<String>,
    resolver: &ScopeResolver<'_, S>,
) -> Result<DefaultRuleOutcome, PolicyError> {
    if let [scope] = rule.scope.as_slice() {
        let matching = declared
            .iter()
            .find(|candidate| candidate.scope.first() == Some(scope));
        if let Some(declared_rule) = matching {
            log::debug!("Updating default rule with ID {}", rule.label());
            return Ok(DefaultRuleOutcome::Override(apply_override(
                rule,
                declared_rule,
            )));
        }
    }

    let was_declared = rule
        .assigned_id()
        .is_some_and(|id| previous_ids.contains(id));
    if was_declared {
        let reverted = revert_default_rule(rule, resolver)?;
        log::debug!("Reverting default rule with ID {}", reverted.label());
        return Ok(DefaultRuleOutcome::Revert(reverted));
    }

    Ok(DefaultRuleOutcome::Untouched)
}

/// Run [`sync_default_rule`] over every default rule of a snapshot
pub fn sync_default_rules<'r, S, I>(
    remote_defaults: I,
    declared: &[RuleSpec],
    previous_ids: &BTreeSet<String>,
    resolver: &ScopeResolver<'_, S>,
) -> Result<Vec<RuleSpec>, PolicyError>
where
    S: PolicyStore + ?Sized,
    I: IntoIterator<Item = &'r RuleSpec>,
{
    let mut updates = Vec::new();
    for rule in remote_defaults {
        let outcome = sync_default_rule(rule.clone(), declared, previous_ids, resolver)?;
        if let Some(update) = outcome.into_update() {
            updates.push(update);
        }
    }
    Ok(updates)
}
