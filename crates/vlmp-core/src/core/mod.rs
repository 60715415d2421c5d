//! # Core Module
//!
//! Stateless building blocks of the composition pipeline.
//!
//! - **Identifiers** ([`ids`]) - Local and global particle ids, id offsets and model keys
//! - **Simulation tree** ([`simulation`]) - Entries, sections and the fragment merge
//! - **Components** ([`components`]) - The component contract, built-in components, the model set and the registry
//! - **Selections** ([`selection`]) - Parsing and evaluation of particle selection expressions
//! - **File I/O** ([`io`]) - Pool input files and the session descriptor

pub mod components;
pub mod ids;
pub mod io;
pub mod selection;
pub mod simulation;
