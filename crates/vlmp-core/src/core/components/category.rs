use phf::{Map, phf_map};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The nine fixed component categories, in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    System,
    Units,
    Types,
    Ensemble,
    Models,
    ModelOperations,
    ModelExtensions,
    Integrators,
    SimulationSteps,
}

static CATEGORY_NAMES: Map<&'static str, Category> = phf_map! {
    "system" => Category::System,
    "units" => Category::Units,
    "types" => Category::Types,
    "ensemble" => Category::Ensemble,
    "models" => Category::Models,
    "modelOperations" => Category::ModelOperations,
    "modelExtensions" => Category::ModelExtensions,
    "integrators" => Category::Integrators,
    "simulationSteps" => Category::SimulationSteps,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown component category '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
    /// Every category in the order the assembler instantiates them.
    pub const ALL: [Category; 9] = [
        Category::System,
        Category::Units,
        Category::Types,
        Category::Ensemble,
        Category::Models,
        Category::ModelOperations,
        Category::ModelExtensions,
        Category::Integrators,
        Category::SimulationSteps,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::System => "system",
            Category::Units => "units",
            Category::Types => "types",
            Category::Ensemble => "ensemble",
            Category::Models => "models",
            Category::ModelOperations => "modelOperations",
            Category::ModelExtensions => "modelExtensions",
            Category::Integrators => "integrators",
            Category::SimulationSteps => "simulationSteps",
        }
    }

    /// Categories that hold exactly one component per simulation.
    pub fn is_unique(self) -> bool {
        matches!(self, Category::Units | Category::Types | Category::Ensemble)
    }

    /// Categories whose components may be scheduled with `startStep`/`endStep`.
    pub fn is_scheduled(self) -> bool {
        matches!(self, Category::ModelExtensions | Category::SimulationSteps)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATEGORY_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
