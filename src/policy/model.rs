// Model definitions shared by the diff, default-rule and tree modules
use serde::{Deserialize, Serialize};

/// Action taken by a rule when traffic matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    Allow,
    Drop,
    Reject,
    JumpToApplication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    In,
    Out,
    #[default]
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpVersion {
    Ipv4,
    Ipv6,
    #[default]
    Ipv4Ipv6,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub tag: String,
}

/// A single gateway rule, ordinary or default
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Assigned on first creation; `None` for rules not yet known to the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
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
    /// Free-form annotation propagated to the rule syslog
    #[serde(default)]
    pub log_label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_default: bool,
    /// Position among ordinary rules; 0 lets the store append
    #[serde(default)]
    pub sequence_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl RuleSpec {
    /// Id if one has been assigned; empty strings count as unassigned
    pub fn assigned_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Human readable handle for log and error messages
    pub fn label(&self) -> &str {
        self.path
            .as_deref()
            .or(self.assigned_id())
            .unwrap_or(self.display_name.as_str())
    }
}

/// System default shape of a default rule, derived for one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDefault {
    pub display_name: String,
    pub description: String,
    pub action: Action,
}

/// Attributes of a tier-0 gateway that drive its default rule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// When set the gateway's default rule allows traffic
    #[serde(default)]
    pub force_whitelisting: bool,
}

/// Gateway policy as stored remotely, with ordinary and default rules together
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyResource {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Advanced by the store on every successful write
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl PolicyResource {
    pub fn default_rules(&self) -> impl Iterator<Item = &RuleSpec> {
        self.rules.iter().filter(|rule| rule.is_default)
    }

    pub fn ordinary_rules(&self) -> impl Iterator<Item = &RuleSpec> {
        self.rules.iter().filter(|rule| !rule.is_default)
    }
}
