use std::{collections::BTreeSet, fmt};

use crate::{
    error::PolicyError,
    policy::{
        PolicyTarget,
        defaults::{revert_default_rule, sync_default_rules, validate_declared_defaults},
        diff::{RuleDiff, diff_rules, ensure_unique_ids},
        model::{PolicyResource, RuleSpec, Tag},
        scope::ScopeResolver,
    },
    store::PolicyStore,
    tree::{PatchTree, PolicyHeader, compose_patch_tree},
};

/// Declared configuration of one gateway policy
pub trait DeclaredConfig {
    /// Ordinary rules in declaration order
    fn declared_rules(&self) -> Vec<RuleSpec>;
    /// Default rule overrides, one scope each
    fn declared_default_rules(&self) -> Vec<RuleSpec>;
    /// Ordinary rule ids recorded by the last successful read
    fn previous_rule_ids(&self) -> BTreeSet<String>;
    /// Ids of default rules the user overrode in the last cycle
    fn previous_default_rule_ids(&self) -> BTreeSet<String>;
    /// Policy description, `None` to leave it unchanged
    fn declared_description(&self) -> Option<String> {
        None
    }
    /// Policy tags, `None` to leave them unchanged
    fn declared_tags(&self) -> Option<Vec<Tag>> {
        None
    }
    /// Policy revision confirmed by the last cycle, if one is known
    fn previous_revision(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Create,
    Read,
    Update,
    Delete,
}

impl Intent {
    fn operation(self) -> &'static str {
        match self {
            Intent::Create => "create",
            Intent::Read => "read",
            Intent::Update => "update",
            Intent::Delete => "delete",
        }
    }
}

/// Local view of a gateway policy after a cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceView {
    pub id: String,
    pub domain: String,
    pub path: String,
    pub description: String,
    pub revision: u64,
    pub tags: Vec<Tag>,
    pub rules: Vec<RuleSpec>,
    pub default_rules: Vec<RuleSpec>,
}

impl From<PolicyResource> for ResourceView {
    fn from(policy: PolicyResource) -> Self {
        let (default_rules, rules) = policy.rules.into_iter().partition(|rule| rule.is_default);
        Self {
            id: policy.id,
            domain: policy.domain,
            path: policy.path,
            description: policy.description,
            revision: policy.revision,
            tags: policy.tags,
            rules,
            default_rules,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Present(ResourceView),
    /// Gone from the store, or reverted to factory defaults by a delete
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Reading,
    Diffing,
    Composing,
    Submitting,
    Confirming,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Reading => "reading",
            Phase::Diffing => "diffing",
            Phase::Composing => "composing",
            Phase::Submitting => "submitting",
            Phase::Confirming => "reading (confirm)",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One read-diff-compose-submit pass over a single gateway policy
struct Cycle<'a, S: PolicyStore + ?Sized> {
    store: &'a S,
    target: &'a PolicyTarget,
    intent: Intent,
    phase: Phase,
}

impl<'a, S: PolicyStore + ?Sized> Cycle<'a, S> {
    fn new(store: &'a S, target: &'a PolicyTarget, intent: Intent) -> Self {
        Self {
            store,
            target,
            intent,
            phase: Phase::Idle,
        }
    }

    /// Run the cycle to `Done`, or to `Failed` on the first error
    fn execute(&mut self, declared: &dyn DeclaredConfig) -> Result<Reconciled, PolicyError> {
        log::info!(
            "Starting {} of gateway policy {} in domain {}",
            self.intent.operation(),
            self.target.id,
            self.target.domain
        );

        match self.run(declared) {
            Ok(reconciled) => {
                log::info!(
                    "Finished {} of gateway policy {}",
                    self.intent.operation(),
                    self.target.id
                );
                Ok(reconciled)
            }
            Err(err) => {
                let failed_in = self.phase;
                self.enter(Phase::Failed);
                log::warn!(
                    "Failed to {} gateway policy {} while {}: {}",
                    self.intent.operation(),
                    self.target.id,
                    failed_in,
                    err
                );
                Err(err)
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!(
            "gateway policy {}: {} -> {}",
            self.target.id,
            self.phase,
            phase
        );
        self.phase = phase;
    }

    fn read(&self) -> Result<PolicyResource, PolicyError> {
        self.store
            .fetch_policy(&self.target.domain, &self.target.id)
            .map_err(|source| {
                PolicyError::from_store(self.intent.operation(), &self.target.id, source)
            })
    }

    fn submit(&self, tree: &PatchTree) -> Result<(), PolicyError> {
        self.store.submit_tree(tree).map_err(|source| {
            PolicyError::from_store(self.intent.operation(), &self.target.id, source)
        })
    }

    fn run(&mut self, declared: &dyn DeclaredConfig) -> Result<Reconciled, PolicyError> {
        match self.intent {
            Intent::Read => self.read_only(),
            Intent::Create | Intent::Update => self.apply(declared),
            Intent::Delete => self.revert(),
        }
    }

    fn read_only(&mut self) -> Result<Reconciled, PolicyError> {
        self.enter(Phase::Reading);
        let reconciled = match self.read() {
            Ok(policy) => Reconciled::Present(policy.into()),
            Err(PolicyError::NotFound { .. }) => {
                log::info!(
                    "gateway policy {} no longer exists in domain {}",
                    self.target.id,
                    self.target.domain
                );
                Reconciled::Absent
            }
            Err(err) => return Err(err),
        };
        self.enter(Phase::Done);
        Ok(reconciled)
    }

    fn apply(&mut self, declared: &dyn DeclaredConfig) -> Result<Reconciled, PolicyError> {
        let declared_rules = declared.declared_rules();
        ensure_unique_ids(&declared_rules)?;
        let declared_defaults = declared.declared_default_rules();
        validate_declared_defaults(&declared_defaults)?;

        self.enter(Phase::Reading);
        let policy = self.read()?;
        self.warn_on_drift(declared.previous_revision(), policy.revision);

        self.enter(Phase::Diffing);
        let diff = diff_rules(&declared.previous_rule_ids(), declared_rules);

        self.enter(Phase::Composing);
        let resolver = ScopeResolver::new(self.store, &self.target.domain);
        let default_updates = sync_default_rules(
            policy.default_rules(),
            &declared_defaults,
            &declared.previous_default_rule_ids(),
            &resolver,
        )?;

        let mut header = PolicyHeader::from_policy(&policy);
        if let Some(description) = declared.declared_description() {
            header.description = description;
        }
        if let Some(tags) = declared.declared_tags() {
            header.tags = tags;
        }
        let tree = compose_patch_tree(header, diff, default_updates);

        self.submit_and_confirm(&tree).map(Reconciled::Present)
    }

    /// Whether the policy moved since the last confirmed revision
    fn warn_on_drift(&self, previous: Option<u64>, current: u64) -> bool {
        match previous {
            Some(previous) if previous != current => {
                log::warn!(
                    "gateway policy {} changed outside this tool since the last run (revision {} -> {})",
                    self.target.id,
                    previous,
                    current
                );
                true
            }
            _ => false,
        }
    }

    /// Delete reverts the rule contents; the policy itself is not owned here
    fn revert(&mut self) -> Result<Reconciled, PolicyError> {
        self.enter(Phase::Reading);
        let policy = self.read()?;

        self.enter(Phase::Diffing);
        let diff = RuleDiff {
            upserts: Vec::new(),
            deletes: policy
                .ordinary_rules()
                .filter_map(|rule| rule.assigned_id().map(String::from))
                .collect(),
        };

        self.enter(Phase::Composing);
        let resolver = ScopeResolver::new(self.store, &self.target.domain);
        let reverted = policy
            .default_rules()
            .map(|rule| revert_default_rule(rule.clone(), &resolver))
            .collect::<Result<Vec<_>, _>>()?;

        let mut header = PolicyHeader::from_policy(&policy);
        header.description = policy.display_name.clone();
        header.tags.clear();
        let tree = compose_patch_tree(header, diff, reverted);

        self.submit_and_confirm(&tree)?;
        Ok(Reconciled::Absent)
    }

    fn submit_and_confirm(&mut self, tree: &PatchTree) -> Result<ResourceView, PolicyError> {
        self.enter(Phase::Submitting);
        log::info!(
            "Updating gateway policy {} with {} child rules",
            self.target.id,
            tree.rule_nodes().len()
        );
        self.submit(tree)?;

        self.enter(Phase::Confirming);
        let view = ResourceView::from(self.read()?);

        self.enter(Phase::Done);
        Ok(view)
    }
}

/// Entry point for reconciling gateway policies against a store
pub struct Reconciler<'a, S: PolicyStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PolicyStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Run one full cycle for `intent`
    ///
    /// Nothing is retried here. A [`PolicyError::Conflict`] means the policy
    /// changed underneath us; call again to start over from a fresh read.
    pub fn reconcile(
        &self,
        target: &PolicyTarget,
        intent: Intent,
        declared: &dyn DeclaredConfig,
    ) -> Result<Reconciled, PolicyError> {
        Cycle::new(self.store, target, intent).execute(declared)
    }
}
