//! Typed simulation components and the registry that builds them.
//!
//! Every component belongs to one of nine [`Category`] values. Its constructor
//! validates the user parameters against the component's `available`/`required`
//! lists, reads whatever collaborators it needs from a [`BuildContext`] and
//! yields an instance implementing the trait of its category. Instances contribute
//! a [`Simulation`](crate::core::simulation::Simulation) fragment to the assembly.

mod builtin;
pub mod category;
pub mod declarative;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod model_set;
pub mod params;
pub mod registry;
pub mod traits;

pub use builtin::SIMULATION_NAME;
pub use category::Category;
pub use descriptor::{ComponentDescriptor, PoolEntry};
pub use error::{ComponentError, ParameterError};
pub use model_set::ModelSet;
pub use params::{ComponentInfo, ComponentInit};
pub use registry::{ComponentRegistry, Constructor, RegistryError};
pub use traits::BuildContext;
