use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::model::ParticleType;
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Types};
use crate::core::simulation::{Entry, EntryType, Simulation};
use indexmap::IndexMap;
use serde_json::json;

pub(crate) const TYPE_LABELS: [&str; 4] = ["name", "mass", "radius", "charge"];

const NO_PARAMS: ParameterSpec = ParameterSpec {
    available: &[],
    required: &[],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(Category::Types, "basic", Constructor::Types(build_basic));
}

/// Particle types keyed by name, in registration order.
#[derive(Debug)]
struct BasicTypes {
    info: ComponentInfo,
    types: IndexMap<String, ParticleType>,
}

fn build_basic(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Types>, ComponentError> {
    init.validated(&NO_PARAMS)?;
    Ok(Box::new(BasicTypes {
        info: init.info.clone(),
        types: IndexMap::new(),
    }))
}

impl Component for BasicTypes {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        let mut entry = Entry::new(EntryType::new("Types", "Basic")).with_labels(&TYPE_LABELS);
        for t in self.types.values() {
            entry.push_row(vec![json!(t.name), json!(t.mass), json!(t.radius), json!(t.charge)]);
        }
        let mut sim = Simulation::new();
        sim.global.types = Some(entry);
        Ok(sim)
    }
}

impl Types for BasicTypes {
    fn add_type(&mut self, particle_type: ParticleType) -> Result<(), ComponentError> {
        match self.types.get(&particle_type.name) {
            Some(existing) if *existing == particle_type => Ok(()),
            Some(existing) => Err(ComponentError::TypeConflict {
                component: self.info.clone(),
                name: particle_type.name.clone(),
                reason: format!(
                    "registered with mass {}, radius {}, charge {}; requested mass {}, radius {}, charge {}",
                    existing.mass,
                    existing.radius,
                    existing.charge,
                    particle_type.mass,
                    particle_type.radius,
                    particle_type.charge
                ),
            }),
            None => {
                self.types.insert(particle_type.name.clone(), particle_type);
                Ok(())
            }
        }
    }

    fn get(&self, name: &str) -> Option<&ParticleType> {
        self.types.get(name)
    }

    fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::Parameters;

    fn types() -> Box<dyn Types> {
        let init = ComponentInit::new(
            ComponentInfo::new(Category::Types, "basic", "basic"),
            Parameters::new(),
        );
        build_basic(&init, &BuildContext::default()).unwrap()
    }

    #[test]
    fn identical_types_register_once() {
        let mut t = types();
        t.add_type(ParticleType::new("A", 1.0, 0.5, 0.0)).unwrap();
        t.add_type(ParticleType::new("A", 1.0, 0.5, 0.0)).unwrap();
        t.add_type(ParticleType::new("B", 2.0, 0.5, 0.0)).unwrap();
        assert_eq!(t.names(), vec!["A", "B"]);

        let frag = t.fragment().unwrap();
        let entry = frag.global.types.unwrap();
        assert_eq!(entry.data.len(), 2);
        assert_eq!(entry.data[1], vec![json!("B"), json!(2.0), json!(0.5), json!(0.0)]);
    }

    #[test]
    fn conflicting_properties_are_rejected() {
        let mut t = types();
        t.add_type(ParticleType::new("A", 1.0, 0.5, 0.0)).unwrap();
        let err = t.add_type(ParticleType::new("A", 1.0, 0.7, 0.0)).unwrap_err();
        assert!(matches!(err, ComponentError::TypeConflict { ref name, .. } if name == "A"));
    }
}
