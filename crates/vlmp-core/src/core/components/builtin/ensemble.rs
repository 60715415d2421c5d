use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec, vec3_to_value};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Ensemble};
use crate::core::simulation::{Entry, EntryType, Simulation};
use nalgebra::Vector3;
use serde_json::json;

const NVT_PARAMS: ParameterSpec = ParameterSpec {
    available: &["box", "temperature"],
    required: &["box", "temperature"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(Category::Ensemble, "NVT", Constructor::Ensemble(build_nvt));
}

#[derive(Debug)]
struct Nvt {
    info: ComponentInfo,
    box_size: Vector3<f64>,
    temperature: f64,
}

fn build_nvt(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Ensemble>, ComponentError> {
    let params = init.validated(&NVT_PARAMS)?;
    let box_size = params.vec3("box")?;
    if box_size.iter().any(|l| !l.is_finite() || *l <= 0.0) {
        return Err(params.invalid("box", "every box length must be positive").into());
    }
    let temperature = params.f64("temperature")?;
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(params
            .invalid("temperature", "must be zero or positive")
            .into());
    }
    Ok(Box::new(Nvt {
        info: init.info.clone(),
        box_size,
        temperature,
    }))
}

impl Component for Nvt {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        let mut entry =
            Entry::new(EntryType::new("Ensemble", "NVT")).with_labels(&["box", "temperature"]);
        entry.push_row(vec![vec3_to_value(&self.box_size), json!(self.temperature)]);
        let mut sim = Simulation::new();
        sim.global.ensemble = Some(entry);
        Ok(sim)
    }
}

impl Ensemble for Nvt {
    fn box_size(&self) -> Vector3<f64> {
        self.box_size
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }
}
