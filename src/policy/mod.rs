pub mod defaults;
pub mod diff;
pub mod model;
pub mod path;
pub mod scope;

// Re-export main types for convenience
pub use model::{Action, GatewayInfo, PolicyResource, RuleSpec, ScopeDefault, Tag};
pub use path::PolicyTarget;
