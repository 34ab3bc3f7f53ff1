use std::collections::{BTreeSet, HashSet};

use crate::error::PolicyError;
use crate::policy::{
    PolicyTarget,
    model::{RuleSpec, Tag},
};
use crate::reconcile::DeclaredConfig;

use super::args::Args;
use super::config::ConfigFile;
use super::state::StateFile;

/// Declared policy merged with the state of the previous run
#[derive(Debug)]
pub struct DeclaredPolicy {
    pub target: PolicyTarget,
    description: Option<String>,
    tags: Option<Vec<Tag>>,
    rules: Vec<RuleSpec>,
    default_rules: Vec<RuleSpec>,
    previous: StateFile,
}

impl DeclaredPolicy {
    pub fn new(config: ConfigFile, previous: StateFile) -> Result<Self, PolicyError> {
        let target = PolicyTarget::from_path(&config.path)?;
        if !config.rules.is_empty() && !config.default_rules.is_empty() {
            return Err(PolicyError::ConflictingRuleKinds { path: config.path });
        }
        let mut rules: Vec<RuleSpec> = config.rules.iter().map(|rule| rule.to_rule()).collect();
        adopt_known_ids(&mut rules, &previous);

        Ok(Self {
            target,
            description: config.description,
            tags: config.tags,
            rules,
            default_rules: config
                .default_rules
                .iter()
                .map(|rule| rule.to_rule())
                .collect(),
            previous,
        })
    }

    /// Scopes the user currently overrides
    pub fn overridden_scopes(&self) -> BTreeSet<String> {
        self.default_rules
            .iter()
            .filter_map(|rule| rule.scope.first().cloned())
            .collect()
    }
}

/// Give declared rules without an id the id last recorded under the same name
fn adopt_known_ids(rules: &mut [RuleSpec], previous: &StateFile) {
    let mut taken: HashSet<String> = rules
        .iter()
        .filter_map(|rule| rule.assigned_id().map(String::from))
        .collect();

    for rule in rules.iter_mut().filter(|rule| rule.assigned_id().is_none()) {
        let known = previous
            .rules
            .iter()
            .find(|state| state.display_name == rule.display_name && !taken.contains(&state.id));
        if let Some(state) = known {
            log::debug!("Rule '{}' keeps id {}", rule.display_name, state.id);
            taken.insert(state.id.clone());
            rule.id = Some(state.id.clone());
        }
    }
}

impl DeclaredConfig for DeclaredPolicy {
    fn declared_rules(&self) -> Vec<RuleSpec> {
        self.rules.clone()
    }

    fn declared_default_rules(&self) -> Vec<RuleSpec> {
        self.default_rules.clone()
    }

    fn previous_rule_ids(&self) -> BTreeSet<String> {
        self.previous.rule_ids()
    }

    fn previous_default_rule_ids(&self) -> BTreeSet<String> {
        self.previous.default_rule_ids()
    }

    fn declared_description(&self) -> Option<String> {
        self.description.clone()
    }

    fn declared_tags(&self) -> Option<Vec<Tag>> {
        self.tags.clone()
    }

    fn previous_revision(&self) -> Option<u64> {
        self.previous.revision
    }
}

/// Load the declared policy and previous state from CLI arguments
pub struct PolicyLoader;

impl PolicyLoader {
    pub fn load(args: &Args) -> Result<DeclaredPolicy, PolicyError> {
        let config = ConfigFile::load(&args.config)?;

        let previous = match args.state.as_ref() {
            Some(state_path) => StateFile::load(state_path)?,
            None => StateFile::default(),
        };

        DeclaredPolicy::new(config, previous)
    }
}
