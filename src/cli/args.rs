use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::reconcile::Intent;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reconcile a declared gateway policy against a policy store"
)]
pub struct Args {
    /// Path to the declared gateway policy (TOML)
    #[arg(long = "config", value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the policy store file (TOML)
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,

    /// Path to the state recorded by the previous run
    #[arg(long = "state", value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// What to do with the declared policy
    #[arg(value_enum)]
    pub action: CliIntent,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliIntent {
    Create,
    Read,
    Update,
    /// Revert the policy rules to their factory defaults
    Delete,
}

impl From<CliIntent> for Intent {
    fn from(intent: CliIntent) -> Self {
        match intent {
            CliIntent::Create => Intent::Create,
            CliIntent::Read => Intent::Read,
            CliIntent::Update => Intent::Update,
            CliIntent::Delete => Intent::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_update_with_state() {
        let args = Args::try_parse_from([
            "gwpolicy",
            "--config",
            "policy.toml",
            "--store",
            "store.toml",
            "--state",
            "state.toml",
            "update",
        ])
        .unwrap();

        assert_eq!(args.action, CliIntent::Update);
        assert_eq!(args.state, Some(PathBuf::from("state.toml")));
        assert_eq!(Intent::from(args.action), Intent::Update);
    }

    #[test]
    fn action_is_required() {
        let result =
            Args::try_parse_from(["gwpolicy", "--config", "policy.toml", "--store", "store.toml"]);
        assert!(result.is_err());
    }
}
