//! Reading pool input files and reading/writing the session descriptor.

pub mod pool;
pub mod session;

pub use pool::{PoolLoadError, load_pool};
pub use session::{DESCRIPTOR_FILE, SessionDescriptor, SessionFileError, SessionSet, SessionSimulation};
