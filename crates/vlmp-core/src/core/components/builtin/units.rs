use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Units};
use crate::core::simulation::{Entry, EntryType, Simulation};
use phf::{Map, phf_map};

struct UnitSystem {
    label: &'static str,
    kboltz: f64,
    elecoef: f64,
}

static UNIT_SYSTEMS: Map<&'static str, UnitSystem> = phf_map! {
    "none" => UnitSystem { label: "None", kboltz: 1.0, elecoef: 1.0 },
    "KcalMol_A" => UnitSystem { label: "KcalMol_A", kboltz: 0.001987191, elecoef: 332.0716 },
};

const NO_PARAMS: ParameterSpec = ParameterSpec {
    available: &[],
    required: &[],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    for name in UNIT_SYSTEMS.keys() {
        registry.register_base(Category::Units, name, Constructor::Units(build));
    }
}

#[derive(Debug)]
struct UnitsComponent {
    info: ComponentInfo,
    label: &'static str,
    kboltz: f64,
    elecoef: f64,
}

fn build(init: &ComponentInit, _ctx: &BuildContext<'_>) -> Result<Box<dyn Units>, ComponentError> {
    init.validated(&NO_PARAMS)?;
    let system = UNIT_SYSTEMS
        .get(init.info.type_name.as_str())
        .ok_or_else(|| ComponentError::invalid(&init.info, "unknown unit system"))?;
    Ok(Box::new(UnitsComponent {
        info: init.info.clone(),
        label: system.label,
        kboltz: system.kboltz,
        elecoef: system.elecoef,
    }))
}

impl Component for UnitsComponent {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        let mut sim = Simulation::new();
        sim.global.units = Some(Entry::new(EntryType::new("Units", self.label)));
        Ok(sim)
    }
}

impl Units for UnitsComponent {
    fn constant(&self, name: &str) -> Option<f64> {
        match name {
            "KBOLTZ" => Some(self.kboltz),
            "ELECOEF" => Some(self.elecoef),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::Parameters;

    fn units(type_name: &str) -> Box<dyn Units> {
        let init = ComponentInit::new(
            ComponentInfo::new(Category::Units, type_name, type_name),
            Parameters::new(),
        );
        build(&init, &BuildContext::default()).unwrap()
    }

    #[test]
    fn kcal_mol_constants() {
        let u = units("KcalMol_A");
        assert_eq!(u.constant("KBOLTZ"), Some(0.001987191));
        assert_eq!(u.constant("ELECOEF"), Some(332.0716));
        assert_eq!(u.constant("AVOGADRO"), None);
    }

    #[test]
    fn none_units_emit_none_label() {
        let frag = units("none").fragment().unwrap();
        assert_eq!(
            frag.global.units.unwrap().kind,
            Some(EntryType::new("Units", "None"))
        );
    }
}
