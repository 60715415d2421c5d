use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInfo, ComponentInit, ParameterSpec, Params};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component, Integrator};
use crate::core::simulation::{Entry, EntryType, Simulation};

const BBK_PARAMS: ParameterSpec = ParameterSpec {
    available: &["timeStep", "frictionConstant", "integrationSteps"],
    required: &["timeStep", "frictionConstant", "integrationSteps"],
};

const STEEPEST_DESCENT_PARAMS: ParameterSpec = ParameterSpec {
    available: &["h", "maxObjectiveForce", "integrationSteps"],
    required: &["h", "maxObjectiveForce", "integrationSteps"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(Category::Integrators, "BBK", Constructor::Integrator(bbk));
    registry.register_base(
        Category::Integrators,
        "SteepestDescent",
        Constructor::Integrator(steepest_descent),
    );
}

#[derive(Debug)]
struct IntegratorComponent {
    info: ComponentInfo,
    entry: Entry,
    steps: u64,
}

impl Component for IntegratorComponent {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        let mut sim = Simulation::new();
        sim.integrator
            .insert(self.info.name.clone(), self.entry.clone());
        Ok(sim)
    }
}

impl Integrator for IntegratorComponent {
    fn integration_steps(&self) -> u64 {
        self.steps
    }
}

fn positive(params: &Params<'_>, name: &str) -> Result<f64, ComponentError> {
    let value = params.f64(name)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(params.invalid(name, "must be positive").into())
    }
}

fn bbk(init: &ComponentInit, _ctx: &BuildContext<'_>) -> Result<Box<dyn Integrator>, ComponentError> {
    let params = init.validated(&BBK_PARAMS)?;
    let time_step = positive(&params, "timeStep")?;
    let friction = params.f64("frictionConstant")?;
    let steps = params.u64("integrationSteps")?;
    Ok(Box::new(IntegratorComponent {
        info: init.info.clone(),
        entry: Entry::new(EntryType::new("Langevin", "BBK"))
            .with_parameter("timeStep", time_step)
            .with_parameter("frictionConstant", friction),
        steps,
    }))
}

fn steepest_descent(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Integrator>, ComponentError> {
    let params = init.validated(&STEEPEST_DESCENT_PARAMS)?;
    let h = positive(&params, "h")?;
    let max_force = positive(&params, "maxObjectiveForce")?;
    let steps = params.u64("integrationSteps")?;
    Ok(Box::new(IntegratorComponent {
        info: init.info.clone(),
        entry: Entry::new(EntryType::new("Minimization", "SteepestDescent"))
            .with_parameter("h", h)
            .with_parameter("maxObjectiveForce", max_force),
        steps,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn init(type_name: &str, params: serde_json::Value) -> ComponentInit {
        ComponentInit::new(
            ComponentInfo::new(Category::Integrators, "main", type_name),
            params.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn bbk_reports_its_steps() {
        let i = bbk(
            &init(
                "BBK",
                json!({"timeStep": 0.01, "frictionConstant": 1.0, "integrationSteps": 1000}),
            ),
            &BuildContext::default(),
        )
        .unwrap();
        assert_eq!(i.integration_steps(), 1000);
        let frag = i.fragment().unwrap();
        let entry = &frag.integrator["main"];
        assert_eq!(entry.kind, Some(EntryType::new("Langevin", "BBK")));
        assert_eq!(entry.parameters["timeStep"], json!(0.01));
    }

    #[test]
    fn non_positive_step_size_is_rejected() {
        let result = steepest_descent(
            &init(
                "SteepestDescent",
                json!({"h": 0.0, "maxObjectiveForce": 1.0, "integrationSteps": 10}),
            ),
            &BuildContext::default(),
        );
        assert!(result.is_err());
    }
}
