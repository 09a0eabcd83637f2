//! Blogger - categories, articles and authors over a REST API
//!
//! The binary wires these modules together; they are public so integration
//! tests can drive the router and storage directly.

pub mod api;
pub mod collections;
pub mod entities;
pub mod errors;
pub mod jobs;
pub mod permissions;
pub mod projection;
pub mod session;
pub mod settings;
pub mod storage;
pub mod user_sync;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
