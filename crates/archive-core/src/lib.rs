pub mod alert;
pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod paths;
pub mod query;
pub mod tarball;
