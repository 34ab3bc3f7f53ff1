use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::PolicyStore;
use crate::{
    error::StoreError,
    policy::model::{GatewayInfo, PolicyResource, RuleSpec},
    tree::{ChildNode, PatchTree},
};

/// On-disk layout of a [`FileStore`]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreData {
    #[serde(default, rename = "gateway")]
    pub gateways: Vec<GatewayInfo>,
    #[serde(default, rename = "policy")]
    pub policies: Vec<PolicyResource>,
}

/// Policy store persisted as a single TOML file
///
/// Follows the same patch protocol as the remote manager: a tree is applied
/// only when its revision matches, default rules can neither be created nor
/// deleted, and every successful patch bumps the policy revision.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<StoreData, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|err| {
            StoreError::Transport(format!("failed to read {}: {err}", self.path.display()))
        })?;
        toml::from_str(&content).map_err(|err| {
            StoreError::Transport(format!("failed to parse {}: {err}", self.path.display()))
        })
    }

    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let content = toml::to_string(data).map_err(|err| {
            StoreError::Transport(format!("failed to encode {}: {err}", self.path.display()))
        })?;
        write_atomic(&self.path, &content).map_err(|err| {
            StoreError::Transport(format!("failed to write {}: {err}", self.path.display()))
        })
    }
}

/// Replace `path` with `content` through a sibling temporary file
///
/// Readers see either the old or the new content, never a partial write.
pub(crate) fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

impl PolicyStore for FileStore {
    fn fetch_policy(&self, domain: &str, id: &str) -> Result<PolicyResource, StoreError> {
        self.load()?
            .policies
            .into_iter()
            .find(|policy| policy.domain == domain && policy.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "gateway policy",
                id: id.to_string(),
            })
    }

    // Tier-0 gateways are not domain scoped
    fn fetch_gateway(&self, _domain: &str, gateway_id: &str) -> Result<GatewayInfo, StoreError> {
        self.load()?
            .gateways
            .into_iter()
            .find(|gateway| gateway.id == gateway_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "tier-0 gateway",
                id: gateway_id.to_string(),
            })
    }

    fn submit_tree(&self, tree: &PatchTree) -> Result<(), StoreError> {
        let mut data = self.load()?;
        let header = tree.policy();

        let policy = data
            .policies
            .iter_mut()
            .find(|policy| policy.domain == header.domain && policy.id == header.id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "gateway policy",
                id: header.id.clone(),
            })?;

        if policy.revision != header.revision {
            return Err(StoreError::Conflict {
                submitted: header.revision,
                current: policy.revision,
            });
        }

        let patched = apply_patch(policy, tree)?;
        log::debug!(
            "Patched gateway policy {} to revision {}",
            patched.id,
            patched.revision
        );
        *policy = patched;

        self.save(&data)
    }
}

/// Apply every child of `tree` to a copy of `policy`, all or nothing
fn apply_patch(policy: &PolicyResource, tree: &PatchTree) -> Result<PolicyResource, StoreError> {
    let header = tree.policy();
    let mut patched = policy.clone();
    patched.description = header.description.clone();
    patched.tags = header.tags.clone();

    for node in tree.rule_nodes() {
        match node {
            ChildNode::RuleUpsert(rule) => upsert_rule(&mut patched, rule)?,
            ChildNode::RuleDelete { id } => delete_rule(&mut patched, id)?,
            other => {
                return Err(StoreError::Validation(format!(
                    "unexpected {} under gateway policy {}",
                    other.resource_type(),
                    policy.id
                )));
            }
        }
    }

    // Ordinary rules in sequence order, default rules stay at the end
    let (mut rules, defaults): (Vec<_>, Vec<_>) =
        patched.rules.into_iter().partition(|rule| !rule.is_default);
    rules.sort_by_key(|rule| rule.sequence_number);
    rules.extend(defaults);
    patched.rules = rules;

    patched.revision += 1;
    Ok(patched)
}

fn upsert_rule(policy: &mut PolicyResource, rule: &RuleSpec) -> Result<(), StoreError> {
    let id = rule
        .assigned_id()
        .ok_or_else(|| StoreError::Validation("rule id is required".to_string()))?;

    if let Some(existing) = policy
        .rules
        .iter_mut()
        .find(|existing| existing.assigned_id() == Some(id))
    {
        if existing.is_default != rule.is_default {
            return Err(StoreError::Validation(format!(
                "rule {id} cannot change its default flag"
            )));
        }
        let mut updated = rule.clone();
        if rule.is_default || rule.sequence_number == 0 {
            updated.sequence_number = existing.sequence_number;
        }
        updated.path = existing.path.clone();
        updated.revision = existing.revision + 1;
        *existing = updated;
        return Ok(());
    }

    if rule.is_default {
        return Err(StoreError::Validation(format!(
            "default rule {id} cannot be created"
        )));
    }

    let mut created = rule.clone();
    if created.sequence_number == 0 {
        created.sequence_number = policy
            .ordinary_rules()
            .map(|existing| existing.sequence_number)
            .max()
            .map_or(1, |max| max + 1);
    }
    created.path = Some(format!("{}/rules/{id}", policy.path));
    created.revision = 0;
    policy.rules.push(created);
    Ok(())
}

fn delete_rule(policy: &mut PolicyResource, id: &str) -> Result<(), StoreError> {
    let Some(position) = policy
        .rules
        .iter()
        .position(|rule| rule.assigned_id() == Some(id))
    else {
        return Ok(());
    };

    if policy.rules[position].is_default {
        return Err(StoreError::Validation(format!(
            "default rule {id} cannot be deleted"
        )));
    }

    policy.rules.remove(position);
    Ok(())
}
