//! # VLMP Core Library
//!
//! Composes many molecular simulations from small, typed components and writes them as
//! simulation sets that a GPU simulator can run in batches.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers from the raw inputs up to the session on disk.
//!
//! - **[`core`]: The Foundation.** The simulation tree and its merge rules, the component
//!   categories with their registry and built-in components, the selection language, and
//!   pool/session file I/O.
//!
//! - **[`engine`]: The Logic Core.** Assembly of one pool entry into one simulation,
//!   distribution of the pool into sets, aggregation of a set into a single simulation and
//!   the rewrite of output paths.
//!
//! - **[`workflows`]: The Public API.** The `prepare` pipeline and the session materializer
//!   used by the command-line front-end.

pub mod core;
pub mod engine;
pub mod workflows;
