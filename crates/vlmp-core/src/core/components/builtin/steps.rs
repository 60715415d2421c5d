use super::{EntryComponent, Placement};
use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInit, ParameterSpec, Params};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component};
use crate::core::simulation::{Entry, EntryType};

const SAVE_STATE_PARAMS: ParameterSpec = ParameterSpec {
    available: &[
        "intervalStep",
        "outputFilePath",
        "outputFormat",
        "startStep",
        "endStep",
    ],
    required: &["intervalStep", "outputFilePath", "outputFormat"],
};

const THERMODYNAMIC_PARAMS: ParameterSpec = ParameterSpec {
    available: &["intervalStep", "outputFilePath", "startStep", "endStep"],
    required: &["intervalStep", "outputFilePath"],
};

const INFO_PARAMS: ParameterSpec = ParameterSpec {
    available: &["intervalStep", "startStep", "endStep"],
    required: &["intervalStep"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(
        Category::SimulationSteps,
        "saveState",
        Constructor::Element(save_state),
    );
    registry.register_base(
        Category::SimulationSteps,
        "thermodynamicMeasurement",
        Constructor::Element(thermodynamic_measurement),
    );
    registry.register_base(Category::SimulationSteps, "info", Constructor::Element(info));
}

fn step_entry(params: &Params<'_>, kind: EntryType) -> Result<Entry, ComponentError> {
    let interval = params.u64("intervalStep")?;
    if interval == 0 {
        return Err(params
            .invalid("intervalStep", "must be greater than zero")
            .into());
    }
    let mut entry = Entry::new(kind).with_parameter("intervalStep", interval);
    params.apply_schedule(&mut entry)?;
    Ok(entry)
}

fn save_state(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&SAVE_STATE_PARAMS)?;
    let entry = step_entry(&params, EntryType::new("WriteStep", "WriteStep"))?
        .with_parameter("outputFilePath", params.str("outputFilePath")?)
        .with_parameter("outputFormat", params.str("outputFormat")?);
    Ok(EntryComponent::new(init.info.clone(), Placement::SimulationStep, entry).boxed())
}

fn thermodynamic_measurement(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&THERMODYNAMIC_PARAMS)?;
    let entry = step_entry(
        &params,
        EntryType::new("ThermodynamicMeasuremetStep", "ThermodynamicQuantityMeasure"),
    )?
    .with_parameter("outputFilePath", params.str("outputFilePath")?);
    Ok(EntryComponent::new(init.info.clone(), Placement::SimulationStep, entry).boxed())
}

fn info(init: &ComponentInit, _ctx: &BuildContext<'_>) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&INFO_PARAMS)?;
    let entry = step_entry(&params, EntryType::new("UtilsStep", "InfoStep"))?;
    Ok(EntryComponent::new(init.info.clone(), Placement::SimulationStep, entry).boxed())
}
