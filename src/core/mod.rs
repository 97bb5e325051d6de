//! Core business logic module
//!
//! This module contains the transfer orchestration components:
//! - `engine` - Transfer execution against an injected store and strategy
//! - `policy` - Configurable request validation

pub mod engine;
pub mod policy;

pub use engine::TransferEngine;
pub use policy::TransferPolicy;
