//! Strata Registry
//!
//! The schema of entity types the mutation engine resolves against:
//! - Scalar attributes (plain and array-valued, optionally unique)
//! - Relations (to-one / to-many, owning / inverse, union targets)
//! - Abstract types and inheritance for polymorphic targets

mod builder;
mod registry;
mod types;

pub use builder::{RegistryBuilder, RegistryError, TypeBuilder};
pub use registry::Registry;
pub use types::*;
