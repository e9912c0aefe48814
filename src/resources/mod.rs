pub mod common;
pub mod deployment;
pub mod http_scaled_object;
pub mod scaled_object;
pub mod service;
pub mod trigger_auth;
