pub mod cli;
pub mod error;
pub mod policy;
pub mod reconcile;
pub mod store;
pub mod tree;
