use super::category::Category;
use crate::core::simulation::Parameters;
use serde::{Deserialize, Serialize};

/// A user request for one component: `{type, name?, parameters?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
}

impl ComponentDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            parameters: Parameters::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The instance name, defaulting to the component type.
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }
}

/// One simulation description of a pool: component descriptors grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PoolEntry {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ensemble: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_operations: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_extensions: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integrators: Vec<ComponentDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub simulation_steps: Vec<ComponentDescriptor>,
}

impl PoolEntry {
    pub fn descriptors(&self, category: Category) -> &[ComponentDescriptor] {
        match category {
            Category::System => &self.system,
            Category::Units => &self.units,
            Category::Types => &self.types,
            Category::Ensemble => &self.ensemble,
            Category::Models => &self.models,
            Category::ModelOperations => &self.model_operations,
            Category::ModelExtensions => &self.model_extensions,
            Category::Integrators => &self.integrators,
            Category::SimulationSteps => &self.simulation_steps,
        }
    }

    pub fn descriptors_mut(&mut self, category: Category) -> &mut Vec<ComponentDescriptor> {
        match category {
            Category::System => &mut self.system,
            Category::Units => &mut self.units,
            Category::Types => &mut self.types,
            Category::Ensemble => &mut self.ensemble,
            Category::Models => &mut self.models,
            Category::ModelOperations => &mut self.model_operations,
            Category::ModelExtensions => &mut self.model_extensions,
            Category::Integrators => &mut self.integrators,
            Category::SimulationSteps => &mut self.simulation_steps,
        }
    }

    pub fn push(mut self, category: Category, descriptor: ComponentDescriptor) -> Self {
        self.descriptors_mut(category).push(descriptor);
        self
    }
}
