use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::PolicyError,
    policy::model::{Action, Direction, IpVersion, RuleSpec, Tag},
};

/// Declared gateway policy
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    /// Path of the gateway policy this file manages
    pub path: String,
    /// Policy description; left unchanged when omitted
    pub description: Option<String>,
    /// Policy tags; left unchanged when omitted
    #[serde(rename = "tag")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
    /// Cannot be combined with `rule` entries in one file
    #[serde(default, rename = "default_rule")]
    pub default_rules: Vec<DefaultRuleConfig>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RuleConfig {
    /// Existing rule id, if known
    pub nsx_id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub source_groups: Vec<String>,
    #[serde(default)]
    pub destination_groups: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub ip_version: IpVersion,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub logged: bool,
    #[serde(default)]
    pub log_label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, rename = "tag")]
    pub tags: Vec<Tag>,
}

/// Override for the default rule of one scope
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DefaultRuleConfig {
    /// Must hold exactly one scope
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub logged: bool,
    #[serde(default)]
    pub log_label: String,
    #[serde(default, rename = "tag")]
    pub tags: Vec<Tag>,
}

impl RuleConfig {
    pub fn to_rule(&self) -> RuleSpec {
        RuleSpec {
            id: self.nsx_id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            scope: self.scope.clone(),
            action: self.action,
            source_groups: self.source_groups.clone(),
            destination_groups: self.destination_groups.clone(),
            services: self.services.clone(),
            direction: self.direction,
            ip_version: self.ip_version,
            disabled: self.disabled,
            logged: self.logged,
            log_label: self.log_label.clone(),
            notes: self.notes.clone(),
            tags: self.tags.clone(),
            ..Default::default()
        }
    }
}

impl DefaultRuleConfig {
    pub fn to_rule(&self) -> RuleSpec {
        RuleSpec {
            scope: self.scope.clone(),
            description: self.description.clone(),
            action: self.action,
            logged: self.logged,
            log_label: self.log_label.clone(),
            tags: self.tags.clone(),
            is_default: true,
            ..Default::default()
        }
    }
}

impl ConfigFile {
    /// Load configuration file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| PolicyError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })
    }
}
