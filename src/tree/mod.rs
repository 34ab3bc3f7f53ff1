use crate::policy::{
    diff::RuleDiff,
    model::{PolicyResource, RuleSpec, Tag},
};

const CHILD_RULE: &str = "ChildRule";
const CHILD_RESOURCE_REFERENCE: &str = "ChildResourceReference";
const INFRA: &str = "Infra";

/// Gateway policy attributes carried by the domain node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyHeader {
    pub id: String,
    pub domain: String,
    pub description: String,
    pub tags: Vec<Tag>,
    /// Revision read right before composing; the store rejects it if stale
    pub revision: u64,
}

impl PolicyHeader {
    pub fn from_policy(policy: &PolicyResource) -> Self {
        Self {
            id: policy.id.clone(),
            domain: policy.domain.clone(),
            description: policy.description.clone(),
            tags: policy.tags.clone(),
            revision: policy.revision,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainNode {
    pub policy: PolicyHeader,
    pub children: Vec<ChildNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    pub children: Vec<ChildNode>,
}

/// One node of a hierarchical patch
#[derive(Debug, Clone, PartialEq)]
pub enum ChildNode {
    RuleUpsert(Box<RuleSpec>),
    /// Only the id travels with a deletion
    RuleDelete { id: String },
    Domain(DomainNode),
    Root(RootNode),
}

impl ChildNode {
    pub fn marked_for_delete(&self) -> bool {
        matches!(self, ChildNode::RuleDelete { .. })
    }

    /// Object kind the store dispatches on
    pub fn resource_type(&self) -> &'static str {
        match self {
            ChildNode::RuleUpsert(_) | ChildNode::RuleDelete { .. } => CHILD_RULE,
            ChildNode::Domain(_) => CHILD_RESOURCE_REFERENCE,
            ChildNode::Root(_) => INFRA,
        }
    }

    pub fn children(&self) -> &[ChildNode] {
        match self {
            ChildNode::Domain(node) => &node.children,
            ChildNode::Root(node) => &node.children,
            ChildNode::RuleUpsert(_) | ChildNode::RuleDelete { .. } => &[],
        }
    }
}

/// A root node holding exactly one domain node, submitted as one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct PatchTree {
    root: ChildNode,
}

impl PatchTree {
    pub fn root(&self) -> &ChildNode {
        &self.root
    }

    pub fn domain(&self) -> &DomainNode {
        match self.root.children() {
            [ChildNode::Domain(domain)] => domain,
            _ => unreachable!("patch tree root always wraps one domain node"),
        }
    }

    pub fn policy(&self) -> &PolicyHeader {
        &self.domain().policy
    }

    pub fn revision(&self) -> u64 {
        self.policy().revision
    }

    pub fn rule_nodes(&self) -> &[ChildNode] {
        &self.domain().children
    }

    /// Rules upserted by this patch
    pub fn upserts(&self) -> impl Iterator<Item = &RuleSpec> {
        self.rule_nodes().iter().filter_map(|node| match node {
            ChildNode::RuleUpsert(rule) => Some(rule.as_ref()),
            _ => None,
        })
    }

    /// Rule ids deleted by this patch
    pub fn deletes(&self) -> impl Iterator<Item = &str> {
        self.rule_nodes().iter().filter_map(|node| match node {
            ChildNode::RuleDelete { id } => Some(id.as_str()),
            _ => None,
        })
    }
}

pub fn rule_upsert_node(rule: RuleSpec) -> ChildNode {
    log::debug!("Adding child rule with id {}", rule.label());
    ChildNode::RuleUpsert(Box::new(rule))
}

pub fn rule_delete_node(id: String) -> ChildNode {
    log::debug!("Deleting child rule with id {}", id);
    ChildNode::RuleDelete { id }
}

/// Wrap ordinary rule changes and default rule updates into a single patch
pub fn compose_patch_tree(
    policy: PolicyHeader,
    diff: RuleDiff,
    default_updates: Vec<RuleSpec>,
) -> PatchTree {
    let mut children =
        Vec::with_capacity(diff.upserts.len() + diff.deletes.len() + default_updates.len());
    children.extend(diff.upserts.into_iter().map(rule_upsert_node));
    children.extend(diff.deletes.into_iter().map(rule_delete_node));
    children.extend(default_updates.into_iter().map(rule_upsert_node));

    log::debug!(
        "Composing patch for gateway policy {} with {} child rules",
        policy.id,
        children.len()
    );

    let domain = ChildNode::Domain(DomainNode { policy, children });
    PatchTree {
        root: ChildNode::Root(RootNode {
            children: vec![domain],
        }),
    }
}
