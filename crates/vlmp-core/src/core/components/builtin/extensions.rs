use super::{EntryComponent, Placement};
use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInit, ParameterSpec, Params, vec3_to_value};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component};
use crate::core::ids::GlobalId;
use crate::core::selection::{select_ids, select_tuples};
use crate::core::simulation::{Entry, EntryType};
use serde_json::json;
use tracing::warn;

const CONSTANT_FORCE_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "force", "startStep", "endStep"],
    required: &["selection", "force"],
};

const HARMONIC_TETHER_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "K", "position", "startStep", "endStep"],
    required: &["selection", "K", "position"],
};

const HARMONIC_BONDS_PARAMS: ParameterSpec = ParameterSpec {
    available: &["selection", "K", "r0", "startStep", "endStep"],
    required: &["selection", "K", "r0"],
};

const WCA_PARAMS: ParameterSpec = ParameterSpec {
    available: &["epsilon", "cutOffFactor", "startStep", "endStep"],
    required: &["epsilon", "cutOffFactor"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(
        Category::ModelExtensions,
        "constantForce",
        Constructor::Element(constant_force),
    );
    registry.register_base(
        Category::ModelExtensions,
        "harmonicTether",
        Constructor::Element(harmonic_tether),
    );
    registry.register_base(
        Category::ModelExtensions,
        "harmonicBonds",
        Constructor::Element(harmonic_bonds),
    );
    registry.register_base(Category::ModelExtensions, "WCA", Constructor::Element(wca));
}

fn selected_ids(
    init: &ComponentInit,
    ctx: &BuildContext<'_>,
    params: &Params<'_>,
) -> Result<Vec<GlobalId>, ComponentError> {
    let models = ctx.models(&init.info)?;
    let selection = params.selection("selection")?;
    let ids = select_ids(models, &selection).map_err(|e| ComponentError::selection(&init.info, e))?;
    if ids.is_empty() {
        warn!("{}: selection '{}' is empty", init.info, selection);
    }
    Ok(ids)
}

fn id_table(kind: EntryType, ids: &[GlobalId]) -> Entry {
    let mut entry = Entry::new(kind).with_labels(&["id"]);
    for id in ids {
        entry.push_row(vec![json!(id.0)]);
    }
    entry
}

fn finish(init: &ComponentInit, params: &Params<'_>, mut entry: Entry) -> Result<Box<dyn Component>, ComponentError> {
    params.apply_schedule(&mut entry)?;
    Ok(EntryComponent::new(init.info.clone(), Placement::ForceField, entry).boxed())
}

fn constant_force(
    init: &ComponentInit,
    ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&CONSTANT_FORCE_PARAMS)?;
    let force = params.vec3("force")?;
    let ids = selected_ids(init, ctx, &params)?;
    let entry = id_table(EntryType::new("External", "ConstantForce"), &ids)
        .with_parameter("constantForce", vec3_to_value(&force));
    finish(init, &params, entry)
}

fn harmonic_tether(
    init: &ComponentInit,
    ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&HARMONIC_TETHER_PARAMS)?;
    let k = params.f64("K")?;
    let position = params.vec3("position")?;
    let ids = selected_ids(init, ctx, &params)?;
    let entry = id_table(EntryType::new("External", "HarmonicTether"), &ids)
        .with_parameter("K", k)
        .with_parameter("position", vec3_to_value(&position));
    finish(init, &params, entry)
}

/// Explicit harmonic bonds between the pairs of a `forceField` style selection.
fn harmonic_bonds(
    init: &ComponentInit,
    ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&HARMONIC_BONDS_PARAMS)?;
    let (k, r0) = (params.f64("K")?, params.f64("r0")?);
    let models = ctx.models(&init.info)?;
    let selection = params.selection("selection")?;
    let pairs = select_tuples(models, &selection, 2)
        .map_err(|e| ComponentError::selection(&init.info, e))?;
    if pairs.is_empty() {
        warn!("{}: selection '{}' yields no pairs", init.info, selection);
    }
    let mut entry = Entry::new(EntryType::new("Bond2", "Harmonic"))
        .with_labels(&["id_i", "id_j", "K", "r0"]);
    for pair in &pairs {
        entry.push_row(vec![json!(pair[0].0), json!(pair[1].0), json!(k), json!(r0)]);
    }
    finish(init, &params, entry)
}

/// WCA repulsion for every pair of registered particle types, `sigma = r_i + r_j`.
fn wca(init: &ComponentInit, ctx: &BuildContext<'_>) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&WCA_PARAMS)?;
    let epsilon = params.f64("epsilon")?;
    let cut_off = params.f64("cutOffFactor")?;
    if cut_off <= 0.0 {
        return Err(params.invalid("cutOffFactor", "must be positive").into());
    }
    let types = ctx.types(&init.info)?;
    let registered: Vec<_> = types.names().into_iter().filter_map(|n| types.get(n)).collect();

    let mut entry = Entry::new(EntryType::new("NonBonded", "WCAType2"))
        .with_parameter("cutOffFactor", cut_off)
        .with_labels(&["name_i", "name_j", "epsilon", "sigma"]);
    for (i, ti) in registered.iter().enumerate() {
        for tj in &registered[i..] {
            entry.push_row(vec![
                json!(ti.name),
                json!(tj.name),
                json!(epsilon),
                json!(ti.radius + tj.radius),
            ]);
        }
    }
    finish(init, &params, entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::model::{ModelData, Particle, ParticleType};
    use crate::core::components::model_set::ModelSet;
    use crate::core::components::params::ComponentInfo;
    use crate::core::components::traits::{Model, Types};
    use crate::core::simulation::Simulation;
    use nalgebra::Point3;

    #[derive(Debug)]
    struct Pair {
        info: ComponentInfo,
        data: ModelData,
    }

    impl Component for Pair {
        fn info(&self) -> &ComponentInfo {
            &self.info
        }

        fn fragment(&self) -> Result<Simulation, ComponentError> {
            Ok(self.data.fragment())
        }
    }

    impl Model for Pair {
        fn data(&self) -> &ModelData {
            &self.data
        }

        fn data_mut(&mut self) -> &mut ModelData {
            &mut self.data
        }
    }

    fn models() -> ModelSet {
        let mut models = ModelSet::new();
        for name in ["A", "B"] {
            let mut data = ModelData::new();
            data.particles.push(Particle::new(0, "X", Point3::origin()));
            data.particles.push(Particle::new(1, "Y", Point3::origin()));
            let mut bonds = Entry::table(&["id_i", "id_j"]);
            bonds.push_row(vec![json!(0), json!(1)]);
            data.force_field.insert("bonds".into(), bonds);
            models
                .insert(Box::new(Pair {
                    info: ComponentInfo::new(Category::Models, name, "PAIR"),
                    data,
                }))
                .unwrap();
        }
        models.assign_offsets().unwrap();
        models
    }

    fn init(type_name: &str, params: serde_json::Value) -> ComponentInit {
        ComponentInit::new(
            ComponentInfo::new(Category::ModelExtensions, type_name, type_name),
            params.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn constant_force_lists_selected_global_ids() {
        let models = models();
        let ctx = BuildContext {
            models: Some(&models),
            ..BuildContext::default()
        };
        let c = constant_force(
            &init(
                "constantForce",
                json!({"selection": "B type Y", "force": [0.0, 0.0, 1.0], "startStep": 10}),
            ),
            &ctx,
        )
        .unwrap();
        let frag = c.fragment().unwrap();
        let entry = &frag.topology.force_field["constantForce"];
        assert_eq!(entry.data, vec![vec![json!(3)]]);
        assert_eq!(entry.parameters["constantForce"], json!([0.0, 0.0, 1.0]));
        assert_eq!(entry.parameters["startStep"], json!(10));
    }

    #[test]
    fn harmonic_bonds_take_pairs_from_force_field_selections() {
        let models = models();
        let ctx = BuildContext {
            models: Some(&models),
            ..BuildContext::default()
        };
        let c = harmonic_bonds(
            &init(
                "harmonicBonds",
                json!({"selection": "A forceField bonds or B forceField bonds", "K": 5.0, "r0": 1.0}),
            ),
            &ctx,
        )
        .unwrap();
        let frag = c.fragment().unwrap();
        let rows = &frag.topology.force_field["harmonicBonds"].data;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![json!(2), json!(3), json!(5.0), json!(1.0)]);
    }

    #[test]
    fn harmonic_bonds_reject_flat_selections() {
        let models = models();
        let ctx = BuildContext {
            models: Some(&models),
            ..BuildContext::default()
        };
        let result = harmonic_bonds(
            &init("harmonicBonds", json!({"selection": "A type X", "K": 5.0, "r0": 1.0})),
            &ctx,
        );
        assert!(matches!(result, Err(ComponentError::Selection { .. })));
    }

    #[test]
    fn extensions_need_the_model_set() {
        let result = constant_force(
            &init("constantForce", json!({"selection": "A id 0", "force": [0.0, 0.0, 1.0]})),
            &BuildContext::default(),
        );
        assert!(matches!(result, Err(ComponentError::MissingCollaborator { .. })));
    }

    #[test]
    fn wca_covers_every_type_pair_once() {
        let registry = ComponentRegistry::new();
        let Ok(Constructor::Types(build)) = registry.resolve(Category::Types, "basic") else {
            panic!("basic must be a built-in types component");
        };
        let mut types: Box<dyn Types> = build(
            &ComponentInit::new(
                ComponentInfo::new(Category::Types, "basic", "basic"),
                Default::default(),
            ),
            &BuildContext::default(),
        )
        .unwrap();
        types.add_type(ParticleType::new("A", 1.0, 0.5, 0.0)).unwrap();
        types.add_type(ParticleType::new("B", 1.0, 1.0, 0.0)).unwrap();
        let ctx = BuildContext {
            types: Some(types.as_ref()),
            ..BuildContext::default()
        };
        let c = wca(&init("WCA", json!({"epsilon": 1.0, "cutOffFactor": 2.5})), &ctx).unwrap();
        let frag = c.fragment().unwrap();
        let rows = &frag.topology.force_field["WCA"].data;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![json!("A"), json!("A"), json!(1.0), json!(1.0)]);
        assert_eq!(rows[1], vec![json!("A"), json!("B"), json!(1.0), json!(1.5)]);
        assert_eq!(rows[2], vec![json!("B"), json!("B"), json!(1.0), json!(2.0)]);
    }
}
