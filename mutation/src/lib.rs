//! Strata Mutation
//!
//! Resolve nested create/update/upsert/delete requests, and their bulk
//! forms, against a store transaction.
//!
//! Responsibilities:
//! - Normalize raw `input` trees against the schema
//! - Resolve nested relation operations in a fixed order
//! - Apply scalar and array (`push`/`pull`/`set`) field changes
//! - Enforce uniqueness and optimistic-concurrency conditions
//! - Shape responses per field selection, including union members
//!
//! # Module Structure
//!
//! - `engine` - Engine running one request per store transaction
//! - `input` - Input tree normalizer
//! - `resolver` - Relation resolver, with per-kind logic in `ops/`
//! - `applier` - Pure scalar/array field applier
//! - `guard` - Uniqueness checks
//! - `response` / `selection` - Response assembler and field selections
//! - `validation` - Scalar coercion and required-field helpers
//! - `error` - Error types for mutation failures
//! - `result` - Outcome and side-effect types

mod applier;
mod config;
mod engine;
mod error;
mod guard;
mod input;
mod ops;
mod request;
mod resolver;
mod response;
mod result;
mod selection;
mod validation;

pub use applier::{apply, apply_all};
pub use config::{EngineConfig, MissingTargetPolicy};
pub use engine::Engine;
pub use error::{ConflictKind, MutationError, MutationResult};
pub use input::{
    FieldOp, Mutation, NormalizedRequest, Normalizer, OpGroup, Payload, RelationOp, RelationWrite,
};
pub use request::{MutationKind, MutationRequest};
pub use resolver::{linked, Resolution, Resolver};
pub use response::{Assembler, MutationResponse, TYPENAME_FIELD};
pub use result::{EdgeChange, Effects, MutationOutcome};
pub use selection::{Selection, SelectionItem};
