//! Relationship graph for the social backend: comments, reactions and follow edges kept
//! consistent with the content and profiles they hang off.

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod repository;
pub mod services;

pub use error::{ServiceError, ServiceResult};
pub use services::RelationshipGraph;
