//! Mutation operation implementations.
//!
//! Each operation kind extends [`Resolver`](crate::resolver::Resolver) from
//! its own module.

mod bulk;
mod create;
mod delete;
mod link;
mod update;
