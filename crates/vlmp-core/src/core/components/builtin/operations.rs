use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::model_set::ModelSet;
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, ModelOperation};
use crate::core::ids::GlobalId;
use crate::core::selection::select_ids;
use nalgebra::{Point3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::TAU;
use tracing::{debug, warn};

const CENTER_OF_MASS_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "position"],
    required: &["selection", "position"],
};

const TRANSLATION_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "translation"],
    required: &["selection", "translation"],
};

const ROTATION_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "axis", "angle"],
    required: &["selection", "axis", "angle"],
};

const RANDOM_ROTATION_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "seed"],
    required: &["selection"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(
        Category::ModelOperations,
        "setCenterOfMassPosition",
        Constructor::Operation(center_of_mass),
    );
    registry.register_base(
        Category::ModelOperations,
        "translation",
        Constructor::Operation(translation),
    );
    registry.register_base(
        Category::ModelOperations,
        "rotation",
        Constructor::Operation(rotation),
    );
    registry.register_base(
        Category::ModelOperations,
        "randomRotation",
        Constructor::Operation(random_rotation),
    );
}

#[derive(Debug, Clone)]
enum Transform {
    CenterOfMass {
        target: Point3<f64>,
        masses: HashMap<String, f64>,
    },
    Translate(Vector3<f64>),
    Rotate(Rotation3<f64>),
    RandomRotate { seed: Option<u64> },
}

/// Moves the particles picked by a selection rigidly.
#[derive(Debug)]
struct RigidOperation {
    info: ComponentInfo,
    selection: String,
    transform: Transform,
}

fn center_of_mass(
    init: &ComponentInit,
    ctx: &BuildContext<'_>,
) -> Result<Box<dyn ModelOperation>, ComponentError> {
    let params = init.validated(&CENTER_OF_MASS_PARAMS)?;
    let types = ctx.types(&init.info)?;
    let masses = types
        .names()
        .into_iter()
        .filter_map(|name| types.get(name).map(|t| (name.to_string(), t.mass)))
        .collect();
    Ok(Box::new(RigidOperation {
        info: init.info.clone(),
        selection: params.selection("selection")?,
        transform: Transform::CenterOfMass {
            target: Point3::from(params.vec3("position")?),
            masses,
        },
    }))
}

fn translation(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn ModelOperation>, ComponentError> {
    let params = init.validated(&TRANSLATION_PARAMS)?;
    Ok(Box::new(RigidOperation {
        info: init.info.clone(),
        selection: params.selection("selection")?,
        transform: Transform::Translate(params.vec3("translation")?),
    }))
}

fn rotation(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn ModelOperation>, ComponentError> {
    let params = init.validated(&ROTATION_PARAMS)?;
    let axis = params.vec3("axis")?;
    if axis.norm() == 0.0 {
        return Err(params.invalid("axis", "must not be the zero vector").into());
    }
    let angle = params.f64("angle")?;
    Ok(Box::new(RigidOperation {
        info: init.info.clone(),
        selection: params.selection("selection")?,
        transform: Transform::Rotate(Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle)),
    }))
}

fn random_rotation(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn ModelOperation>, ComponentError> {
    let params = init.validated(&RANDOM_ROTATION_PARAMS)?;
    Ok(Box::new(RigidOperation {
        info: init.info.clone(),
        selection: params.selection("selection")?,
        transform: Transform::RandomRotate {
            seed: params.opt_u64("seed")?,
        },
    }))
}

/// A uniformly distributed orientation (Shoemake's subgroup algorithm).
fn uniform_rotation(rng: &mut impl Rng) -> Rotation3<f64> {
    let u1: f64 = rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let u3: f64 = rng.gen_range(0.0..1.0);
    let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
    let q = Quaternion::new(
        b * (TAU * u3).cos(),
        a * (TAU * u2).sin(),
        a * (TAU * u2).cos(),
        b * (TAU * u3).sin(),
    );
    UnitQuaternion::from_quaternion(q).to_rotation_matrix()
}

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

fn rotate_about(points: &mut [Point3<f64>], rotation: &Rotation3<f64>) {
    let c = centroid(points);
    for p in points.iter_mut() {
        *p = c + rotation * (*p - c);
    }
}

impl RigidOperation {
    fn moved(
        &self,
        models: &ModelSet,
        ids: &[GlobalId],
        mut points: Vec<Point3<f64>>,
    ) -> Result<Vec<Point3<f64>>, ComponentError> {
        match &self.transform {
            Transform::Translate(shift) => {
                for p in points.iter_mut() {
                    *p += *shift;
                }
            }
            Transform::Rotate(rotation) => rotate_about(&mut points, rotation),
            Transform::RandomRotate { seed } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                rotate_about(&mut points, &uniform_rotation(&mut rng));
            }
            Transform::CenterOfMass { target, masses } => {
                let mut weighted = Vector3::zeros();
                let mut total = 0.0;
                for (id, p) in ids.iter().zip(&points) {
                    let type_name = models.type_of(*id).unwrap_or_default();
                    let mass = masses.get(type_name).copied().ok_or_else(|| {
                        ComponentError::invalid(
                            &self.info,
                            format!("particle type '{type_name}' of particle {id} has no mass"),
                        )
                    })?;
                    weighted += p.coords * mass;
                    total += mass;
                }
                if total <= 0.0 {
                    return Err(ComponentError::invalid(
                        &self.info,
                        "selected particles have zero total mass",
                    ));
                }
                let shift = target - Point3::from(weighted / total);
                for p in points.iter_mut() {
                    *p += shift;
                }
            }
        }
        Ok(points)
    }
}

impl ModelOperation for RigidOperation {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn apply(&self, mut models: ModelSet) -> Result<ModelSet, ComponentError> {
        let ids = select_ids(&models, &self.selection)
            .map_err(|e| ComponentError::selection(&self.info, e))?;
        if ids.is_empty() {
            warn!("{}: selection '{}' is empty, nothing to move", self.info, self.selection);
            return Ok(models);
        }
        let points = ids
            .iter()
            .map(|id| {
                models.position(*id).ok_or_else(|| {
                    ComponentError::invalid(&self.info, format!("particle {id} does not exist"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let moved = self.moved(&models, &ids, points)?;
        for (id, p) in ids.iter().zip(moved) {
            models.set_position(*id, p);
        }
        debug!("{}: moved {} particles", self.info, ids.len());
        Ok(models)
    }
}
