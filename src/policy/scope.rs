use crate::{error::PolicyError, store::PolicyStore};

use super::{
    model::{GatewayInfo, RuleSpec},
    path::{id_from_path, is_tier0_scope},
};

/// What a default rule's scope points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeTarget {
    /// Tier-0 gateway, with attributes fetched during this cycle
    Tier0(GatewayInfo),
    /// Anything else; the scope path itself supplies name and description
    Other,
}

/// Resolve default rule scopes against the store
pub struct ScopeResolver<'a, S: PolicyStore + ?Sized> {
    store: &'a S,
    domain: &'a str,
}

impl<'a, S: PolicyStore + ?Sized> ScopeResolver<'a, S> {
    pub fn new(store: &'a S, domain: &'a str) -> Self {
        Self { store, domain }
    }

    /// Look up the single scope of a default rule
    ///
    /// Only tier-0 scopes reach the store. Every call fetches the gateway again
    /// since its attributes may change between cycles.
    pub fn resolve(&self, rule: &RuleSpec) -> Result<(String, ScopeTarget), PolicyError> {
        let scope = single_scope(rule)?;

        if !is_tier0_scope(scope) {
            return Ok((scope.to_string(), ScopeTarget::Other));
        }

        let gateway_id = id_from_path(scope);
        let gateway = self
            .store
            .fetch_gateway(self.domain, gateway_id)
            .map_err(|source| PolicyError::ScopeResolution {
                gateway: gateway_id.to_string(),
                rule: rule.label().to_string(),
                source,
            })?;

        Ok((scope.to_string(), ScopeTarget::Tier0(gateway)))
    }
}

/// The one scope a default rule must carry
pub fn single_scope(rule: &RuleSpec) -> Result<&str, PolicyError> {
    match rule.scope.as_slice() {
        [scope] => Ok(scope.as_str()),
        scopes => Err(PolicyError::InvalidDefaultScope {
            rule: rule.label().to_string(),
            count: scopes.len(),
        }),
    }
}
