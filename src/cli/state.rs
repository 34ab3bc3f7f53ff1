use std::{
    collections::BTreeSet,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::PolicyError, reconcile::ResourceView, store::file::write_atomic};

/// What the previous run saw after its confirming read
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct StateFile {
    /// Policy revision confirmed by the last run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleState>,
    /// Default rules the user had overridden
    #[serde(default)]
    pub default_rule_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleState {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl StateFile {
    /// Load state, treating a missing file as an empty state
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&content).map_err(|source| PolicyError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), PolicyError> {
        let content = toml::to_string(self).map_err(|source| PolicyError::ConfigSerialize {
            path: PathBuf::from(path),
            source,
        })?;
        write_atomic(path, &content)?;
        Ok(())
    }

    /// Record a confirmed view; only default rules whose scope is overridden count
    pub fn from_view(view: &ResourceView, overridden_scopes: &BTreeSet<String>) -> Self {
        let rules = view
            .rules
            .iter()
            .filter_map(|rule| {
                rule.assigned_id().map(|id| RuleState {
                    id: id.to_string(),
                    display_name: rule.display_name.clone(),
                })
            })
            .collect();

        let default_rule_ids = view
            .default_rules
            .iter()
            .filter(|rule| {
                rule.scope
                    .first()
                    .is_some_and(|scope| overridden_scopes.contains(scope))
            })
            .filter_map(|rule| rule.assigned_id().map(String::from))
            .collect();

        Self {
            revision: Some(view.revision),
            rules,
            default_rule_ids,
        }
    }

    pub fn rule_ids(&self) -> BTreeSet<String> {
        self.rules.iter().map(|rule| rule.id.clone()).collect()
    }

    pub fn default_rule_ids(&self) -> BTreeSet<String> {
        self.default_rule_ids.iter().cloned().collect()
    }
}
