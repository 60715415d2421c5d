use super::category::Category;
use super::error::ParameterError;
use crate::core::simulation::{Entry, Parameters};
use nalgebra::{Point3, Vector3};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Identity of one component instance, rendered as `category:name:type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    pub category: Category,
    pub name: String,
    pub type_name: String,
}

impl ComponentInfo {
    pub fn new(category: Category, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.category, self.name, self.type_name)
    }
}

/// The parameters a component type accepts and the subset it cannot do without.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub available: &'static [&'static str],
    pub required: &'static [&'static str],
}

/// Scheduling parameters accepted by model extensions and simulation steps.
pub const SCHEDULE_PARAMETERS: [&str; 2] = ["startStep", "endStep"];

/// Checks `required ⊆ available`, `supplied ⊆ available` and `required ⊆ supplied`.
pub fn validate_parameters<S: AsRef<str>>(
    component: &ComponentInfo,
    available: &[S],
    required: &[S],
    supplied: &Parameters,
) -> Result<(), ParameterError> {
    let is_available = |name: &str| available.iter().any(|a| a.as_ref() == name);

    if let Some(req) = required.iter().find(|r| !is_available(r.as_ref())) {
        return Err(ParameterError::RequiredNotAvailable {
            component: component.clone(),
            parameter: req.as_ref().to_string(),
        });
    }
    if let Some(key) = supplied.keys().find(|k| !is_available(k)) {
        return Err(ParameterError::Unknown {
            component: component.clone(),
            parameter: key.clone(),
            available: available
                .iter()
                .map(|a| a.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    if let Some(req) = required.iter().find(|r| !supplied.contains_key(r.as_ref())) {
        return Err(ParameterError::Missing {
            component: component.clone(),
            parameter: req.as_ref().to_string(),
        });
    }
    for unset in available
        .iter()
        .map(|a| a.as_ref())
        .filter(|a| !supplied.contains_key(*a))
    {
        debug!("{}: optional parameter '{}' not set", component, unset);
    }
    Ok(())
}

/// Everything a constructor receives about the instance it must build.
#[derive(Debug, Clone)]
pub struct ComponentInit {
    pub info: ComponentInfo,
    pub parameters: Parameters,
}

impl ComponentInit {
    pub fn new(info: ComponentInfo, parameters: Parameters) -> Self {
        Self { info, parameters }
    }

    /// Validates against `spec` and returns typed accessors.
    pub fn validated(&self, spec: &ParameterSpec) -> Result<Params<'_>, ParameterError> {
        validate_parameters(&self.info, spec.available, spec.required, &self.parameters)?;
        Ok(Params {
            component: &self.info,
            values: &self.parameters,
        })
    }
}

/// Typed read access to validated parameters.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    component: &'a ComponentInfo,
    values: &'a Parameters,
}

impl<'a> Params<'a> {
    pub fn component(&self) -> &'a ComponentInfo {
        self.component
    }

    pub fn raw(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name)
    }

    fn missing(&self, name: &str) -> ParameterError {
        ParameterError::Missing {
            component: self.component.clone(),
            parameter: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str, found: &Value) -> ParameterError {
        ParameterError::TypeMismatch {
            component: self.component.clone(),
            parameter: name.to_string(),
            expected,
            found: found.to_string(),
        }
    }

    pub fn invalid(&self, name: &str, reason: impl Into<String>) -> ParameterError {
        ParameterError::InvalidValue {
            component: self.component.clone(),
            parameter: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>, ParameterError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mismatch(name, "a number", v)),
        }
    }

    pub fn f64(&self, name: &str) -> Result<f64, ParameterError> {
        self.opt_f64(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>, ParameterError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.mismatch(name, "a non-negative integer", v)),
        }
    }

    pub fn u64(&self, name: &str) -> Result<u64, ParameterError> {
        self.opt_u64(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn usize(&self, name: &str) -> Result<usize, ParameterError> {
        let value = self.u64(name)?;
        usize::try_from(value).map_err(|_| self.invalid(name, "value does not fit in usize"))
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&'a str>, ParameterError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.mismatch(name, "a string", v)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&'a str, ParameterError> {
        self.opt_str(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_vec3(&self, name: &str) -> Result<Option<Vector3<f64>>, ParameterError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => value_to_vec3(v)
                .map(Some)
                .ok_or_else(|| self.mismatch(name, "a list of three numbers", v)),
        }
    }

    pub fn vec3(&self, name: &str) -> Result<Vector3<f64>, ParameterError> {
        self.opt_vec3(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_points(&self, name: &str) -> Result<Option<Vec<Point3<f64>>>, ParameterError> {
        let Some(v) = self.values.get(name) else {
            return Ok(None);
        };
        let items = v
            .as_array()
            .ok_or_else(|| self.mismatch(name, "a list of positions", v))?;
        items
            .iter()
            .map(|item| {
                value_to_vec3(item)
                    .map(Point3::from)
                    .ok_or_else(|| self.mismatch(name, "a list of positions", item))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A selection expression; lists of strings are joined with `or`.
    pub fn selection(&self, name: &str) -> Result<String, ParameterError> {
        let v = self.values.get(name).ok_or_else(|| self.missing(name))?;
        match v {
            Value::String(s) => Ok(s.clone()),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(|s| format!("({s})"))
                        .ok_or_else(|| self.mismatch(name, "a selection string", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|parts| parts.join(" or ")),
            other => Err(self.mismatch(name, "a selection string", other)),
        }
    }

    /// Copies `startStep`/`endStep` into the entry parameters when set.
    pub fn apply_schedule(&self, entry: &mut Entry) -> Result<(), ParameterError> {
        for key in SCHEDULE_PARAMETERS {
            if let Some(step) = self.opt_u64(key)? {
                entry.parameters.insert(key.to_string(), Value::from(step));
            }
        }
        if let (Some(start), Some(end)) = (self.opt_u64("startStep")?, self.opt_u64("endStep")?) {
            if end < start {
                return Err(self.invalid("endStep", format!("{end} is before startStep {start}")));
            }
        }
        Ok(())
    }
}

pub fn value_to_vec3(value: &Value) -> Option<Vector3<f64>> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some(Vector3::new(
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
    ))
}

pub fn vec3_to_value(v: &Vector3<f64>) -> Value {
    Value::from(vec![v.x, v.y, v.z])
}
