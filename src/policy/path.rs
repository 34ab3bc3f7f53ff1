use crate::error::PolicyError;

const TIER0_SEGMENT: &str = "infra/tier-0s";
const DOMAINS_SEGMENT: &str = "domains";

/// Policy id and domain addressed by a gateway policy path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTarget {
    pub id: String,
    pub domain: String,
    pub path: String,
}

impl PolicyTarget {
    /// Parse a path such as `/infra/domains/default/gateway-policies/Policy_Default_Infra`
    pub fn from_path(path: &str) -> Result<Self, PolicyError> {
        let id = id_from_path(path);
        if id.is_empty() {
            return Err(PolicyError::InvalidPath {
                path: path.to_string(),
                reason: "failed to extract policy id".to_string(),
            });
        }

        let domain = domain_from_path(path).ok_or_else(|| PolicyError::InvalidPath {
            path: path.to_string(),
            reason: "failed to extract domain".to_string(),
        })?;

        Ok(Self {
            id: id.to_string(),
            domain: domain.to_string(),
            path: path.to_string(),
        })
    }
}

/// Last non-empty segment of an object path
pub fn id_from_path(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Segment following `domains` in an object path
pub fn domain_from_path(path: &str) -> Option<&str> {
    let mut segments = path.split('/');
    segments.find(|segment| *segment == DOMAINS_SEGMENT)?;
    segments.next().filter(|domain| !domain.is_empty())
}

/// Whether the scope path points at a tier-0 gateway
pub fn is_tier0_scope(scope: &str) -> bool {
    scope.contains(TIER0_SEGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/infra/tier-0s/gw1", "gw1")]
    #[case("/infra/tier-0s/gw1/", "gw1")]
    #[case("/infra/domains/default/gateway-policies/p1", "p1")]
    #[case("", "")]
    fn test_id_from_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(id_from_path(path), expected);
    }

    #[rstest]
    #[case("/infra/domains/default/gateway-policies/p1", Some("default"))]
    #[case("/global-infra/domains/site-a/gateway-policies/p1", Some("site-a"))]
    #[case("/infra/tier-0s/gw1", None)]
    #[case("/infra/domains/", None)]
    fn test_domain_from_path(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(domain_from_path(path), expected);
    }

    #[rstest]
    #[case("/infra/tier-0s/gw1", true)]
    #[case("/global-infra/tier-0s/gw1", true)]
    #[case("/infra/tier-1s/t1", false)]
    #[case("/infra/domains/default/groups/tier-0s", false)]
    fn test_is_tier0_scope(#[case] scope: &str, #[case] expected: bool) {
        assert_eq!(is_tier0_scope(scope), expected);
    }

    #[test]
    fn target_requires_domain() {
        let err = PolicyTarget::from_path("/infra/gateway-policies/p1").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPath { .. }));
    }

    #[test]
    fn target_from_full_path() {
        let target =
            PolicyTarget::from_path("/infra/domains/default/gateway-policies/Policy_Default_Infra")
                .unwrap();
        assert_eq!(target.id, "Policy_Default_Infra");
        assert_eq!(target.domain, "default");
    }
}
