//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) and [`core`](crate::core)
//! layers together.
//!
//! - **Prepare Workflow** ([`prepare`]) - Loads a pool file, assembles every entry,
//!   distributes the pool into simulation sets and writes the session.
//! - **Session Materializer** ([`session`]) - Writes the on-disk session layout, the
//!   per-set aggregates and the session descriptor.

pub mod prepare;
pub mod session;
