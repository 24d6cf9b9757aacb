//! Reconciliation logic shared by the controllers

pub mod namespace;
pub mod remote_object;
