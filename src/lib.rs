//! Fleet sync Kubernetes operator
//!
//! Connects a fleet cluster to remote clusters described by RemoteCluster
//! resources and keeps RemoteObject manifests synced into them.

pub mod adapters;
pub mod cache;
pub mod client;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod events;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
