//! Strata Core Types
//!
//! This crate provides the foundational types used throughout Strata:
//! - Identity types (EntityId, TypeId)
//! - Value types (the Value enum with all scalar and reference types)
//! - Entity records with their `created`/`updated` timestamps
//! - Conditions (`match`/`exists`/`range`/`contains`) and their evaluator
//! - An injectable time source

mod clock;
mod condition;
mod entity;
mod error;
mod id;
mod value;

pub use clock::*;
pub use condition::*;
pub use entity::*;
pub use error::*;
pub use id::*;
pub use value::*;
