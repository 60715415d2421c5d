use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Free-form component parameters, kept in insertion order.
pub type Parameters = Map<String, Value>;

/// A named, ordered collection of entries (e.g. `topology.forceField`).
pub type Section = IndexMap<String, Entry>;

/// The `[Category, Subtype]` pair the simulator uses to dispatch an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryType(pub String, pub String);

impl EntryType {
    pub fn new(category: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self(category.into(), subtype.into())
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Merge conflict at '{path}': {reason}")]
pub struct MergeConflict {
    pub path: String,
    pub reason: String,
}

impl MergeConflict {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Invalid id in column '{label}', row {row}: {reason}")]
pub struct InvalidIdCell {
    pub label: String,
    pub row: usize,
    pub reason: String,
}

/// How a column carries particle ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdColumn {
    /// `id` or `id_<suffix>`: one id per row.
    Single,
    /// `idSet_<suffix>`: a list of ids per row.
    Set,
}

impl IdColumn {
    pub fn classify(label: &str) -> Option<Self> {
        if label == "id" || label.starts_with("id_") {
            Some(IdColumn::Single)
        } else if label.starts_with("idSet_") {
            Some(IdColumn::Set)
        } else {
            None
        }
    }
}

/// One table of the simulation tree: an optional type pair, parameters and labelled rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryType>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Vec<Value>>,
}

impl Entry {
    pub fn new(kind: EntryType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn table(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.data.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.parameters.is_empty()
            && self.labels.is_empty()
            && self.data.is_empty()
    }

    pub fn column(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn id_columns(&self) -> Vec<(usize, IdColumn)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| IdColumn::classify(label).map(|kind| (i, kind)))
            .collect()
    }

    pub fn has_id_columns(&self) -> bool {
        self.labels.iter().any(|l| IdColumn::classify(l).is_some())
    }

    /// Number of single-id columns, i.e. the bond order of a bonded entry.
    pub fn bond_arity(&self) -> usize {
        self.labels
            .iter()
            .filter(|l| IdColumn::classify(l) == Some(IdColumn::Single))
            .count()
    }

    /// Collects every id referenced by one row, ignoring malformed cells.
    pub fn row_ids(&self, row: &[Value]) -> Vec<usize> {
        let mut ids = Vec::new();
        for (col, kind) in self.id_columns() {
            match (kind, row.get(col)) {
                (IdColumn::Single, Some(cell)) => ids.extend(cell.as_u64().map(|v| v as usize)),
                (IdColumn::Set, Some(Value::Array(items))) => {
                    ids.extend(items.iter().filter_map(|v| v.as_u64()).map(|v| v as usize))
                }
                _ => {}
            }
        }
        ids
    }

    /// Rewrites every id cell with `f`; a `None` from `f` marks the id as invalid.
    pub fn try_map_ids(
        &mut self,
        mut f: impl FnMut(usize) -> Option<usize>,
    ) -> Result<(), InvalidIdCell> {
        let columns = self.id_columns();
        if columns.is_empty() {
            return Ok(());
        }
        for (row_index, row) in self.data.iter_mut().enumerate() {
            for &(col, kind) in &columns {
                let label = &self.labels[col];
                let cell = row.get_mut(col).ok_or_else(|| InvalidIdCell {
                    label: label.clone(),
                    row: row_index,
                    reason: "row is shorter than its labels".to_string(),
                })?;
                match kind {
                    IdColumn::Single => map_id_cell(cell, &mut f, label, row_index)?,
                    IdColumn::Set => {
                        if !cell.is_array() {
                            return Err(InvalidIdCell {
                                label: label.clone(),
                                row: row_index,
                                reason: format!("expected a list of ids, found {}", cell),
                            });
                        }
                        for item in cell.as_array_mut().into_iter().flatten() {
                            map_id_cell(item, &mut f, label, row_index)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Appends a constant-valued column to every row.
    pub fn push_column(&mut self, label: &str, value: Value) {
        self.labels.push(label.to_string());
        for row in &mut self.data {
            row.push(value.clone());
        }
    }

    /// Removes a column by label, returning whether it existed.
    pub fn remove_column(&mut self, label: &str) -> bool {
        let Some(col) = self.column(label) else {
            return false;
        };
        self.labels.remove(col);
        for row in &mut self.data {
            if col < row.len() {
                row.remove(col);
            }
        }
        true
    }

    pub fn merge(&mut self, other: Entry, path: &str) -> Result<(), MergeConflict> {
        if let Some(kind) = other.kind {
            if self.kind.is_none() {
                self.kind = Some(kind);
            } else if self.kind.as_ref() != Some(&kind) {
                return Err(MergeConflict::new(
                    path,
                    format!(
                        "type {} differs from {}",
                        kind,
                        self.kind.as_ref().map(|k| k.to_string()).unwrap_or_default()
                    ),
                ));
            }
        }
        merge_parameters(
            &mut self.parameters,
            other.parameters,
            &format!("{path}.parameters"),
        )?;
        self.append_rows(other.labels, other.data, path)
    }

    /// Appends rows labelled with `labels`, reordering them to this table's column order.
    pub fn append_rows(
        &mut self,
        labels: Vec<String>,
        data: Vec<Vec<Value>>,
        path: &str,
    ) -> Result<(), MergeConflict> {
        if labels.is_empty() && data.is_empty() {
            return Ok(());
        }
        if self.labels.is_empty() && self.data.is_empty() {
            self.labels = labels;
            self.data = data;
            return Ok(());
        }
        if self.labels == labels {
            self.data.extend(data);
            return Ok(());
        }

        let permutation = if self.labels.len() == labels.len() {
            self.labels
                .iter()
                .map(|l| labels.iter().position(|x| x == l))
                .collect::<Option<Vec<_>>>()
        } else {
            None
        };
        let permutation = permutation.ok_or_else(|| {
            MergeConflict::new(
                path,
                format!("labels {:?} do not match {:?}", labels, self.labels),
            )
        })?;

        for row in data {
            if row.len() != labels.len() {
                return Err(MergeConflict::new(
                    path,
                    format!("row has {} cells for {} labels", row.len(), labels.len()),
                ));
            }
            self.data
                .push(permutation.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(())
    }

    /// Adds the rows of `data` that are not yet present.
    pub fn union_rows(
        &mut self,
        labels: Vec<String>,
        data: Vec<Vec<Value>>,
        path: &str,
    ) -> Result<(), MergeConflict> {
        let mut aligned = Entry {
            labels: self.labels.clone(),
            ..Entry::default()
        };
        aligned.append_rows(labels, data, path)?;
        if self.labels.is_empty() {
            self.labels = aligned.labels;
        }
        for row in aligned.data {
            if !self.data.contains(&row) {
                self.data.push(row);
            }
        }
        Ok(())
    }

    /// Walks the parameters, then every object or list held in a data cell.
    fn visit_keys_mut(&mut self, visitor: &mut dyn FnMut(&str, &mut Value)) {
        visit_map_mut(&mut self.parameters, visitor);
        for cell in self.data.iter_mut().flatten() {
            visit_value_mut(cell, visitor);
        }
    }
}

fn map_id_cell(
    cell: &mut Value,
    f: &mut impl FnMut(usize) -> Option<usize>,
    label: &str,
    row: usize,
) -> Result<(), InvalidIdCell> {
    let id = cell.as_u64().ok_or_else(|| InvalidIdCell {
        label: label.to_string(),
        row,
        reason: format!("expected a non-negative integer, found {}", cell),
    })? as usize;
    let mapped = f(id).ok_or_else(|| InvalidIdCell {
        label: label.to_string(),
        row,
        reason: format!("id {} cannot be mapped", id),
    })?;
    *cell = Value::from(mapped);
    Ok(())
}

fn visit_map_mut(map: &mut Parameters, visitor: &mut dyn FnMut(&str, &mut Value)) {
    for (key, value) in map.iter_mut() {
        visitor(key, value);
        visit_value_mut(value, visitor);
    }
}

fn visit_value_mut(value: &mut Value, visitor: &mut dyn FnMut(&str, &mut Value)) {
    match value {
        Value::Object(inner) => visit_map_mut(inner, visitor),
        Value::Array(items) => {
            for item in items {
                visit_value_mut(item, visitor);
            }
        }
        _ => {}
    }
}

pub fn merge_parameters(
    dst: &mut Parameters,
    src: Parameters,
    path: &str,
) -> Result<(), MergeConflict> {
    for (key, value) in src {
        let key_path = format!("{path}.{key}");
        match dst.get_mut(&key) {
            Some(existing) => merge_value(existing, value, &key_path)?,
            None => {
                dst.insert(key, value);
            }
        }
    }
    Ok(())
}

fn merge_value(dst: &mut Value, src: Value, path: &str) -> Result<(), MergeConflict> {
    match (dst, src) {
        (Value::Object(existing), Value::Object(incoming)) => {
            merge_parameters(existing, incoming, path)
        }
        (existing, incoming) => {
            if *existing == incoming {
                Ok(())
            } else {
                Err(MergeConflict::new(
                    path,
                    format!("value {} differs from {}", incoming, existing),
                ))
            }
        }
    }
}

pub fn merge_section(dst: &mut Section, src: Section, path: &str) -> Result<(), MergeConflict> {
    for (name, entry) in src {
        let entry_path = format!("{path}.{name}");
        match dst.get_mut(&name) {
            Some(existing) => existing.merge(entry, &entry_path)?,
            None => {
                dst.insert(name, entry);
            }
        }
    }
    Ok(())
}

fn merge_optional(
    dst: &mut Option<Entry>,
    src: Option<Entry>,
    path: &str,
) -> Result<(), MergeConflict> {
    let Some(entry) = src else {
        return Ok(());
    };
    match dst {
        Some(existing) => existing.merge(entry, path),
        None => {
            *dst = Some(entry);
            Ok(())
        }
    }
}

/// `units`, `types` and `ensemble`: the simulation-wide scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Global {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<Entry>,
}

impl Global {
    pub fn is_empty(&self) -> bool {
        self.units.is_none() && self.types.is_none() && self.ensemble.is_none()
    }

    fn merge(&mut self, other: Global) -> Result<(), MergeConflict> {
        merge_optional(&mut self.units, other.units, "global.units")?;
        merge_optional(&mut self.types, other.types, "global.types")?;
        merge_optional(&mut self.ensemble, other.ensemble, "global.ensemble")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    #[serde(default, skip_serializing_if = "Entry::is_empty")]
    pub structure: Entry,
    #[serde(
        rename = "forceField",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub force_field: Section,
}

impl Topology {
    pub fn is_empty(&self) -> bool {
        self.structure.is_empty() && self.force_field.is_empty()
    }
}

/// A complete or partial simulation description.
///
/// Component fragments and assembled simulations share this type: an assembled
/// simulation is the merge of all fragments of one pool entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub system: Section,
    #[serde(default, skip_serializing_if = "Global::is_empty")]
    pub global: Global,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub integrator: Section,
    #[serde(default, skip_serializing_if = "Entry::is_empty")]
    pub state: Entry,
    #[serde(default, skip_serializing_if = "Topology::is_empty")]
    pub topology: Topology,
    #[serde(
        rename = "simulationStep",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub simulation_step: Section,
}

pub const SIMULATION_INFORMATION: (&str, &str) = ("Simulation", "Information");

/// System key of the `[Simulation, Information]` entry.
pub const INFORMATION_KEY: &str = "info";

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `other` into `self` following the key-wise merge rules.
    pub fn merge(&mut self, other: Simulation) -> Result<(), MergeConflict> {
        merge_section(&mut self.system, other.system, "system")?;
        self.global.merge(other.global)?;
        merge_section(&mut self.integrator, other.integrator, "integrator")?;
        self.state.merge(other.state, "state")?;
        self.topology
            .structure
            .merge(other.topology.structure, "topology.structure")?;
        merge_section(
            &mut self.topology.force_field,
            other.topology.force_field,
            "topology.forceField",
        )?;
        merge_section(
            &mut self.simulation_step,
            other.simulation_step,
            "simulationStep",
        )
    }

    /// The simulation name carried by the `[Simulation, Information]` system entry.
    pub fn name(&self) -> Option<&str> {
        let info = EntryType::new(SIMULATION_INFORMATION.0, SIMULATION_INFORMATION.1);
        self.system
            .values()
            .find(|e| e.kind.as_ref() == Some(&info))
            .and_then(|e| e.parameters.get("name"))
            .and_then(Value::as_str)
    }

    pub fn number_of_particles(&self) -> usize {
        self.state.data.len()
    }

    /// Tables whose id columns live in the particle id space.
    pub fn id_tables_mut(&mut self) -> impl Iterator<Item = (String, &mut Entry)> {
        std::iter::once(("state".to_string(), &mut self.state))
            .chain(std::iter::once((
                "topology.structure".to_string(),
                &mut self.topology.structure,
            )))
            .chain(
                self.topology
                    .force_field
                    .iter_mut()
                    .map(|(name, entry)| (format!("topology.forceField.{name}"), entry)),
            )
    }

    pub fn shift_ids(&mut self, offset: usize) -> Result<(), InvalidIdCell> {
        if offset == 0 {
            return Ok(());
        }
        for (_, table) in self.id_tables_mut() {
            table.try_map_ids(|id| id.checked_add(offset))?;
        }
        Ok(())
    }

    /// The sorted, de-duplicated ids of the `state` table.
    pub fn state_ids(&self) -> Result<Vec<usize>, InvalidIdCell> {
        let col = self.state.column("id").ok_or_else(|| InvalidIdCell {
            label: "id".to_string(),
            row: 0,
            reason: "state has no id column".to_string(),
        })?;
        let mut ids = Vec::with_capacity(self.state.data.len());
        for (row_index, row) in self.state.data.iter().enumerate() {
            let id = row.get(col).and_then(Value::as_u64).ok_or_else(|| InvalidIdCell {
                label: "id".to_string(),
                row: row_index,
                reason: "missing or non-integer id".to_string(),
            })?;
            ids.push(id as usize);
        }
        let unique: HashSet<usize> = ids.iter().copied().collect();
        if unique.len() != ids.len() {
            return Err(InvalidIdCell {
                label: "id".to_string(),
                row: 0,
                reason: "state contains duplicated ids".to_string(),
            });
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Visits every `(key, value)` pair of every entry, recursively: nested objects and
    /// lists in `parameters` as well as objects stored in data cells.
    pub fn visit_parameters_mut(&mut self, visitor: &mut dyn FnMut(&str, &mut Value)) {
        let Simulation {
            system,
            global,
            integrator,
            state,
            topology,
            simulation_step,
        } = self;
        let entries = system
            .values_mut()
            .chain(global.units.iter_mut())
            .chain(global.types.iter_mut())
            .chain(global.ensemble.iter_mut())
            .chain(integrator.values_mut())
            .chain(std::iter::once(state))
            .chain(std::iter::once(&mut topology.structure))
            .chain(topology.force_field.values_mut())
            .chain(simulation_step.values_mut());
        for entry in entries {
            entry.visit_keys_mut(visitor);
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
