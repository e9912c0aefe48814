// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for the Connector operator
//!
//! This module contains unit tests for:
//! - Reconciliation against an in-memory object store
//! - Resource generators (Deployment, Service, KEDA objects)
//! - Spec and Secret validation
//! - Status history

#[path = "../common/mod.rs"]
mod common;

mod resources;
