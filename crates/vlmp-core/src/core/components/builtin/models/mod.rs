mod particles;
mod wlc;

use crate::core::components::error::ParameterError;
use crate::core::components::model::ParticleType;
use crate::core::components::params::Params;
use crate::core::components::registry::ComponentRegistry;
use crate::core::ids::LocalId;
use crate::core::selection::{LocalSelection, Selected};

pub(super) fn register(registry: &mut ComponentRegistry) {
    wlc::register(registry);
    particles::register(registry);
}

/// Parameters every built-in model accepts to describe its single particle type.
const TYPE_PARAMETERS: [&str; 4] = ["particleName", "mass", "radius", "charge"];

/// Reads the particle type of a single-type model, with `radius` defaulting to `default_radius`.
fn particle_type(params: &Params<'_>, default_radius: f64) -> Result<ParticleType, ParameterError> {
    let name = params.opt_str("particleName")?.unwrap_or("A");
    if name.is_empty() {
        return Err(params.invalid("particleName", "must not be empty"));
    }
    let mass = params.opt_f64("mass")?.unwrap_or(1.0);
    if mass <= 0.0 {
        return Err(params.invalid("mass", "must be positive"));
    }
    let radius = params.opt_f64("radius")?.unwrap_or(default_radius);
    if radius < 0.0 {
        return Err(params.invalid("radius", "must not be negative"));
    }
    let charge = params.opt_f64("charge")?.unwrap_or(0.0);
    Ok(ParticleType::new(name, mass, radius, charge))
}

/// Resolves index options against a model of `len` particles; `-1` is the last particle.
fn index_selection(len: usize, options: &[String]) -> Result<LocalSelection, String> {
    if options.is_empty() {
        return Err("expected at least one index".to_string());
    }
    let mut ids = Vec::with_capacity(options.len());
    for option in options {
        let index: i64 = option
            .parse()
            .map_err(|_| format!("'{option}' is not an integer index"))?;
        let resolved = if index < 0 {
            usize::try_from(index.unsigned_abs())
                .ok()
                .and_then(|back| len.checked_sub(back))
        } else {
            usize::try_from(index).ok().filter(|i| *i < len)
        };
        let id = resolved
            .ok_or_else(|| format!("index {index} is out of range for {len} particles"))?;
        ids.push(LocalId(id));
    }
    Ok(Selected::Ids(ids))
}
