use super::{TYPE_PARAMETERS, index_selection, particle_type};
use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::model::{ModelData, Particle, ParticleType};
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Model};
use crate::core::selection::LocalSelection;
use crate::core::simulation::Simulation;
use csv::{ReaderBuilder, Trim};
use nalgebra::Point3;
use std::fs::File;
use std::path::Path;

const PARTICLES_PARAMS: ParameterSpec = ParameterSpec {
    available: &[
        "positions",
        "positionsFile",
        TYPE_PARAMETERS[0],
        TYPE_PARAMETERS[1],
        TYPE_PARAMETERS[2],
        TYPE_PARAMETERS[3],
    ],
    required: &[],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(Category::Models, "PARTICLES", Constructor::Model(build));
}

/// Unbonded particles of one type, placed at explicit coordinates.
#[derive(Debug)]
struct Particles {
    info: ComponentInfo,
    particle_type: ParticleType,
    data: ModelData,
}

fn build(init: &ComponentInit, _ctx: &BuildContext<'_>) -> Result<Box<dyn Model>, ComponentError> {
    let params = init.validated(&PARTICLES_PARAMS)?;
    let inline = params.opt_points("positions")?;
    let file = params.opt_str("positionsFile")?;
    let positions = match (inline, file) {
        (Some(points), None) => points,
        (None, Some(path)) => read_positions(&init.info, Path::new(path))?,
        (Some(_), Some(_)) => {
            return Err(params
                .invalid("positionsFile", "cannot be combined with 'positions'")
                .into());
        }
        (None, None) => {
            return Err(ComponentError::invalid(
                &init.info,
                "one of 'positions' or 'positionsFile' is required",
            ));
        }
    };
    let particle_type = particle_type(&params, 0.5)?;

    let mut data = ModelData::new();
    for (i, position) in positions.into_iter().enumerate() {
        data.particles
            .push(Particle::new(i, particle_type.name.as_str(), position));
    }
    Ok(Box::new(Particles {
        info: init.info.clone(),
        particle_type,
        data,
    }))
}

/// Reads `x, y, z` rows; blank lines and `#` comments are skipped.
fn read_positions(info: &ComponentInfo, path: &Path) -> Result<Vec<Point3<f64>>, ComponentError> {
    let file = File::open(path).map_err(|e| ComponentError::Io {
        component: info.clone(),
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);
    reader
        .deserialize::<(f64, f64, f64)>()
        .map(|row| {
            row.map(|(x, y, z)| Point3::new(x, y, z))
                .map_err(|e| ComponentError::Csv {
                    component: info.clone(),
                    path: path.to_path_buf(),
                    source: e,
                })
        })
        .collect()
}

impl Component for Particles {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        Ok(self.data.fragment())
    }
}

impl Model for Particles {
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
        &["particleIndex"]
    }

    fn process_selection(&self, kind: &str, options: &[String]) -> Result<LocalSelection, String> {
        match kind {
            "particleIndex" => index_selection(self.data.len(), options),
            other => Err(format!("unsupported selection kind '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn particles(params: serde_json::Value) -> Result<Box<dyn Model>, ComponentError> {
        let init = ComponentInit::new(
            ComponentInfo::new(Category::Models, "free", "PARTICLES"),
            params.as_object().cloned().unwrap_or_default(),
        );
        build(&init, &BuildContext::default())
    }

    #[test]
    fn inline_positions_become_particles() {
        let model = particles(json!({
            "positions": [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]],
            "particleName": "S"
        }))
        .unwrap();
        assert_eq!(model.data().len(), 2);
        assert_eq!(model.data().particles[1].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(model.particle_types()[0].name, "S");
    }

    #[test]
    fn positions_are_read_from_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coords.csv");
        fs::write(&path, "# x, y, z\n0.0, 0.0, 0.0\n1.5, -2.0, 3.25\n").unwrap();
        let model = particles(json!({"positionsFile": path.to_string_lossy()})).unwrap();
        assert_eq!(model.data().len(), 2);
        assert_eq!(model.data().particles[1].position, Point3::new(1.5, -2.0, 3.25));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = particles(json!({"positionsFile": path.to_string_lossy()})).unwrap_err();
        assert!(matches!(err, ComponentError::Io { .. }));
    }

    #[test]
    fn malformed_rows_are_csv_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coords.csv");
        fs::write(&path, "0.0, zero, 0.0\n").unwrap();
        let err = particles(json!({"positionsFile": path.to_string_lossy()})).unwrap_err();
        assert!(matches!(err, ComponentError::Csv { .. }));
    }

    #[test]
    fn exactly_one_position_source_is_required() {
        assert!(particles(json!({})).is_err());
        assert!(particles(json!({"positions": [], "positionsFile": "x.csv"})).is_err());
    }
}
