use super::{EntryComponent, Placement};
use crate::core::components::category::Category;
use crate::core::components::error::ComponentError;
use crate::core::components::params::{ComponentInit, ParameterSpec};
use crate::core::components::registry::{ComponentRegistry, Constructor};
use crate::core::components::traits::{BuildContext, Component};
use crate::core::simulation::{Entry, EntryType, INFORMATION_KEY, SIMULATION_INFORMATION};

/// The system component type that names a simulation; every pool entry needs exactly one.
pub const SIMULATION_NAME: &str = "simulationName";

const SIMULATION_NAME_PARAMS: ParameterSpec = ParameterSpec {
    available: &["simulationName"],
    required: &["simulationName"],
};

const BACKUP_PARAMS: ParameterSpec = ParameterSpec {
    available: &[
        "backupIntervalStep",
        "backupStartStep",
        "backupEndStep",
        "backupFilePath",
    ],
    required: &["backupIntervalStep"],
};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register_base(
        Category::System,
        SIMULATION_NAME,
        Constructor::Element(simulation_name),
    );
    registry.register_base(Category::System, "backup", Constructor::Element(backup));
}

fn simulation_name(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&SIMULATION_NAME_PARAMS)?;
    let name = params.str("simulationName")?;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(params
            .invalid("simulationName", "must be a non-empty name usable as a directory")
            .into());
    }
    let entry = Entry::new(EntryType::new(
        SIMULATION_INFORMATION.0,
        SIMULATION_INFORMATION.1,
    ))
    .with_parameter("name", name);
    Ok(EntryComponent::new(init.info.clone(), Placement::System, entry)
        .with_key(INFORMATION_KEY)
        .boxed())
}

fn backup(
    init: &ComponentInit,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn Component>, ComponentError> {
    let params = init.validated(&BACKUP_PARAMS)?;
    let interval = params.u64("backupIntervalStep")?;
    if interval == 0 {
        return Err(params
            .invalid("backupIntervalStep", "must be greater than zero")
            .into());
    }
    let mut entry = Entry::new(EntryType::new("Simulation", "Backup"))
        .with_parameter("backupIntervalStep", interval);
    for key in ["backupStartStep", "backupEndStep"] {
        if let Some(step) = params.opt_u64(key)? {
            entry.parameters.insert(key.to_string(), step.into());
        }
    }
    if let Some(path) = params.opt_str("backupFilePath")? {
        entry.parameters.insert("backupFilePath".to_string(), path.into());
    }
    Ok(EntryComponent::new(init.info.clone(), Placement::System, entry).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::params::ComponentInfo;
    use serde_json::json;

    fn init(type_name: &str, params: serde_json::Value) -> ComponentInit {
        ComponentInit::new(
            ComponentInfo::new(Category::System, type_name, type_name),
            params.as_object().cloned().unwrap_or_default(),
        )
    }

    #[test]
    fn simulation_name_emits_information_entry() {
        let c = simulation_name(&init(SIMULATION_NAME, json!({"simulationName": "run0"})), &BuildContext::default())
            .unwrap();
        let frag = c.fragment().unwrap();
        assert_eq!(frag.name(), Some("run0"));
        assert!(frag.system.contains_key(INFORMATION_KEY));
    }

    #[test]
    fn simulation_name_must_be_a_directory_name() {
        let result = simulation_name(
            &init(SIMULATION_NAME, json!({"simulationName": "a/b"})),
            &BuildContext::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn backup_keeps_optional_steps() {
        let c = backup(
            &init("backup", json!({"backupIntervalStep": 100, "backupEndStep": 1000})),
            &BuildContext::default(),
        )
        .unwrap();
        let frag = c.fragment().unwrap();
        let entry = &frag.system["backup"];
        assert_eq!(entry.parameters["backupIntervalStep"], json!(100));
        assert_eq!(entry.parameters["backupEndStep"], json!(1000));
        assert!(!entry.parameters.contains_key("backupStartStep"));
    }
}
