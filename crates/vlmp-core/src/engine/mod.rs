//! # Engine Module
//!
//! This module turns pool entries into assembled simulations and groups them into
//! simulation sets ready to be written to disk.
//!
//! ## Overview
//!
//! Each pool entry is assembled independently: its components are resolved through the
//! registry, models receive contiguous id ranges, operations reshape the model set, and
//! every fragment is merged into one simulation. The assembled pool is then partitioned
//! by a distribution strategy and each set is folded into a single aggregate.
//!
//! ## Architecture
//!
//! - **Assembly** ([`assembler`], [`pool`]) - Per-entry component construction and merging
//! - **Distribution** ([`distribution`]) - Partitioning strategies over the assembled pool
//! - **Aggregation** ([`aggregate`]) - Per-set merge with id renumbering and member groups
//! - **Output paths** ([`paths`]) - Relocation of output files under each simulation folder
//! - **Configuration** ([`config`]) - Prepare workflow settings and their builder
//! - **Progress Monitoring** ([`progress`]) - Progress events for front-ends
//! - **Error Handling** ([`error`]) - Engine-level error aggregation

pub mod aggregate;
pub mod assembler;
pub mod config;
pub mod distribution;
pub mod error;
pub mod paths;
pub mod pool;
pub mod progress;
