use super::{TYPE_PARAMETERS, index_selection, particle_type};
use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::model::{ModelData, Particle, ParticleType};
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Model};
use crate::core::selection::LocalSelection;
use crate::core::simulation::{Entry, EntryType, Simulation};
use nalgebra::Point3;
use serde_json::json;
use tracing::debug;

const WLC_PARAMS: ParameterSpec = ParameterSpec {
    available: &[
        "N",
        "b",
        "Kb",
        "Ka",
        TYPE_PARAMETERS[0],
        TYPE_PARAMETERS[1],
        TYPE_PARAMETERS[2],
        TYPE_PARAMETERS[3],
    ],
    required: &["N", "b", "Kb", "Ka"],
};

pub(crate) const BONDS_KEY: &str = "bonds_wlc";
pub(crate) const ANGLES_KEY: &str = "angles_wlc";

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(Category::Models, "WLC", Constructor::Model(build));
}

/// A worm-like chain of `N` beads laid out along z, centred at the origin.
#[derive(Debug)]
struct Wlc {
    info: ComponentInfo,
    particle_type: ParticleType,
    data: ModelData,
}

fn build(init: &ComponentInit, _ctx: &BuildContext<'_>) -> Result<Box<dyn Model>, ComponentError> {
    let params = init.validated(&WLC_PARAMS)?;
    let n = params.usize("N")?;
    if n == 0 {
        return Err(params.invalid("N", "a chain needs at least one bead").into());
    }
    let b = params.f64("b")?;
    if b <= 0.0 {
        return Err(params.invalid("b", "bond length must be positive").into());
    }
    let kb = params.f64("Kb")?;
    let ka = params.f64("Ka")?;
    let particle_type = particle_type(&params, b / 2.0)?;

    let mut data = ModelData::new();
    let centre = (n as f64 - 1.0) / 2.0;
    for i in 0..n {
        let z = (i as f64 - centre) * b;
        data.particles.push(Particle::new(
            i,
            particle_type.name.as_str(),
            Point3::new(0.0, 0.0, z),
        ));
    }

    if n >= 2 {
        let mut bonds = Entry::new(EntryType::new("Bond2", "Harmonic"))
            .with_labels(&["id_i", "id_j", "K", "r0"]);
        for i in 0..n - 1 {
            bonds.push_row(vec![json!(i), json!(i + 1), json!(kb), json!(b)]);
        }
        data.force_field.insert(BONDS_KEY.to_string(), bonds);
    }
    if n >= 3 {
        let mut angles = Entry::new(EntryType::new("Bond3", "KratkyPorodWLC"))
            .with_labels(&["id_i", "id_j", "id_k", "K"]);
        for i in 0..n - 2 {
            angles.push_row(vec![json!(i), json!(i + 1), json!(i + 2), json!(ka)]);
        }
        data.force_field.insert(ANGLES_KEY.to_string(), angles);
    }
    debug!("{}: built chain of {} beads", init.info, n);

    Ok(Box::new(Wlc {
        info: init.info.clone(),
        particle_type,
        data,
    }))
}

impl Component for Wlc {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        Ok(self.data.fragment())
    }
}

impl Model for Wlc {
    fn data(&self) -> &ModelData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ModelData {
        &mut self.data
    }

    fn particle_types(&self) -> Vec<ParticleType> {
        vec![self.particle_type.clone()]
    }

    fn defined_selections(&self) -> &[&'static str] {
        &["polymerIndex"]
    }

    fn process_selection(&self, kind: &str, options: &[String]) -> Result<LocalSelection, String> {
        match kind {
            "polymerIndex" => index_selection(self.data.len(), options),
            other => Err(format!("unsupported selection kind '{other}'")),
        }
    }
}
