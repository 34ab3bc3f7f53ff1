pub mod args;
pub mod config;
pub mod loader;
pub mod state;

pub use args::Args;
pub use config::ConfigFile;
pub use loader::{DeclaredPolicy, PolicyLoader};
pub use state::StateFile;
