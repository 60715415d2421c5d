use crate::core::simulation::{
    Entry, EntryType, INFORMATION_KEY, InvalidIdCell, MergeConflict, SIMULATION_INFORMATION,
    Section, Simulation,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Structure column holding the member index of every particle.
pub const SIMULATION_ID_LABEL: &str = "simulationId";
/// Simulation step entry declaring one particle group per member.
pub const GROUPS_KEY: &str = "groups_simulationId";
/// Step parameter restricting a member's steps to its particle group.
pub const GROUP_PARAMETER: &str = "group";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Cannot aggregate an empty simulation set")]
    EmptySet,
    #[error("Simulation '{member}' disagrees with the set on '{section}'")]
    Disagreement { member: String, section: String },
    #[error("Simulation '{member}' defines type '{name}' differently from an earlier member")]
    TypeConflict { member: String, name: String },
    #[error("Simulation '{member}' has invalid ids: {source}")]
    InvalidIds {
        member: String,
        #[source]
        source: InvalidIdCell,
    },
    #[error("Simulation '{member}' cannot be merged into the set: {source}")]
    Merge {
        member: String,
        #[source]
        source: MergeConflict,
    },
    #[error("Simulation '{member}' already sets '{parameter}' on step '{step}'")]
    ReservedParameter {
        member: String,
        step: String,
        parameter: &'static str,
    },
    #[error("Aggregate has no member {index}")]
    UnknownMember { index: usize },
}

fn group_name(index: usize) -> String {
    format!("simId_{index}")
}

fn step_suffix(index: usize) -> String {
    format!("_simId_{index}")
}

/// Merges the members of one simulation set into a single simulation.
///
/// Members are laid out one after another in the particle id space, in the
/// order given. Their simulation steps are renamed per member and restricted to
/// the member's particle group.
///
/// # Arguments
///
/// * `set_name` - Name carried by the aggregate's information entry.
/// * `members` - `(name, simulation)` pairs in pool order.
///
/// # Errors
///
/// Returns [`AggregationError`] if the set is empty, if members disagree on a
/// simulation-wide section, or if a table cannot be combined.
pub fn aggregate(set_name: &str, members: &[(&str, &Simulation)]) -> Result<Simulation, AggregationError> {
    if members.is_empty() {
        return Err(AggregationError::EmptySet);
    }

    let mut result = Simulation::new();
    result.system.insert(INFORMATION_KEY.to_string(), information(set_name));
    let mut groups = Entry::new(EntryType::new("Groups", "GroupsList"))
        .with_labels(&["name", "type", "selection"]);
    let mut steps = Section::new();
    let mut offset = 0;

    for (index, &(name, simulation)) in members.iter().enumerate() {
        let mut member = simulation.clone();
        let particles = member.number_of_particles();
        member
            .shift_ids(offset)
            .map_err(|source| AggregationError::InvalidIds {
                member: name.to_string(),
                source,
            })?;
        let merge_err = |source| AggregationError::Merge {
            member: name.to_string(),
            source,
        };

        merge_system(&mut result.system, member.system, name)?;
        agree(&mut result.global.units, member.global.units, name, "global.units")?;
        agree(
            &mut result.global.ensemble,
            member.global.ensemble,
            name,
            "global.ensemble",
        )?;
        if index == 0 {
            result.integrator = member.integrator;
        } else if result.integrator != member.integrator {
            return Err(disagreement(name, "integrator"));
        }
        merge_types(&mut result.global.types, member.global.types, name)?;

        let state = member.state;
        result
            .state
            .append_rows(state.labels, state.data, "state")
            .map_err(merge_err)?;
        let mut structure = member.topology.structure;
        if !structure.is_empty() {
            structure.push_column(SIMULATION_ID_LABEL, json!(index));
            result
                .topology
                .structure
                .append_rows(structure.labels, structure.data, "topology.structure")
                .map_err(merge_err)?;
        }
        merge_force_field(&mut result.topology.force_field, member.topology.force_field, name)?;

        for (step, mut entry) in member.simulation_step {
            if entry.parameters.contains_key(GROUP_PARAMETER) {
                return Err(AggregationError::ReservedParameter {
                    member: name.to_string(),
                    step,
                    parameter: GROUP_PARAMETER,
                });
            }
            entry
                .parameters
                .insert(GROUP_PARAMETER.to_string(), Value::from(group_name(index)));
            steps.insert(format!("{step}{}", step_suffix(index)), entry);
        }
        groups.push_row(vec![json!(group_name(index)), json!("SimIds"), json!([index])]);

        debug!("Member '{}' placed at id offset {}", name, offset);
        offset += particles;
    }

    result.simulation_step.insert(GROUPS_KEY.to_string(), groups);
    result.simulation_step.extend(steps);
    Ok(result)
}

/// Recovers member `index` from an aggregate built by [`aggregate`].
///
/// Force-field tables with id columns keep the rows that reference only the
/// member's particles; tables without id columns are returned whole.
pub fn project(aggregate: &Simulation, index: usize, name: &str) -> Result<Simulation, AggregationError> {
    let structure = &aggregate.topology.structure;
    let (Some(sim_col), Some(id_col)) = (structure.column(SIMULATION_ID_LABEL), structure.column("id"))
    else {
        return Err(AggregationError::UnknownMember { index });
    };
    let member_rows: Vec<&Vec<Value>> = structure
        .data
        .iter()
        .filter(|row| row.get(sim_col).and_then(Value::as_u64) == Some(index as u64))
        .collect();
    let suffix = step_suffix(index);
    let has_steps = aggregate.simulation_step.keys().any(|k| k.ends_with(&suffix));
    if member_rows.is_empty() && !has_steps {
        return Err(AggregationError::UnknownMember { index });
    }
    let ids: HashSet<usize> = member_rows
        .iter()
        .filter_map(|row| row.get(id_col).and_then(Value::as_u64))
        .map(|id| id as usize)
        .collect();
    let offset = ids.iter().copied().min().unwrap_or(0);
    let invalid = |source| AggregationError::InvalidIds {
        member: name.to_string(),
        source,
    };

    let mut result = Simulation::new();
    for (key, entry) in &aggregate.system {
        if is_information(entry) {
            result.system.insert(key.clone(), information(name));
        } else {
            result.system.insert(key.clone(), entry.clone());
        }
    }
    result.global.units = aggregate.global.units.clone();
    result.global.ensemble = aggregate.global.ensemble.clone();
    result.integrator = aggregate.integrator.clone();

    let mut member_structure = Entry {
        data: member_rows.into_iter().cloned().collect(),
        ..structure.clone()
    };
    member_structure.remove_column(SIMULATION_ID_LABEL);
    let used_types: HashSet<&str> = member_structure
        .column("type")
        .map(|col| {
            member_structure
                .data
                .iter()
                .filter_map(|row| row.get(col).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    result.global.types = aggregate.global.types.as_ref().map(|types| {
        let mut kept = types.clone();
        if let (Some(col), false) = (types.column("name"), used_types.is_empty()) {
            kept.data.retain(|row| {
                row.get(col)
                    .and_then(Value::as_str)
                    .is_some_and(|n| used_types.contains(n))
            });
        }
        kept
    });

    result.state = restrict(&aggregate.state, &ids, offset).map_err(invalid)?;
    if !member_structure.data.is_empty() {
        member_structure
            .try_map_ids(|id| id.checked_sub(offset))
            .map_err(invalid)?;
        result.topology.structure = member_structure;
    }
    for (key, entry) in &aggregate.topology.force_field {
        if !entry.has_id_columns() {
            result.topology.force_field.insert(key.clone(), entry.clone());
            continue;
        }
        let kept = restrict(entry, &ids, offset).map_err(invalid)?;
        if !kept.data.is_empty() {
            result.topology.force_field.insert(key.clone(), kept);
        }
    }

    for (key, entry) in &aggregate.simulation_step {
        if let Some(step) = key.strip_suffix(&suffix) {
            let mut entry = entry.clone();
            entry.parameters.remove(GROUP_PARAMETER);
            result.simulation_step.insert(step.to_string(), entry);
        }
    }
    Ok(result)
}

fn information(name: &str) -> Entry {
    Entry::new(EntryType::new(SIMULATION_INFORMATION.0, SIMULATION_INFORMATION.1))
        .with_parameter("name", name)
}

fn is_information(entry: &Entry) -> bool {
    entry.kind.as_ref() == Some(&EntryType::new(SIMULATION_INFORMATION.0, SIMULATION_INFORMATION.1))
}

fn disagreement(member: &str, section: &str) -> AggregationError {
    AggregationError::Disagreement {
        member: member.to_string(),
        section: section.to_string(),
    }
}

fn merge_system(dst: &mut Section, src: Section, member: &str) -> Result<(), AggregationError> {
    for (key, entry) in src {
        if is_information(&entry) {
            continue;
        }
        match dst.get(&key) {
            Some(existing) if *existing != entry => {
                return Err(disagreement(member, &format!("system.{key}")));
            }
            Some(_) => {}
            None => {
                dst.insert(key, entry);
            }
        }
    }
    Ok(())
}

fn agree(
    dst: &mut Option<Entry>,
    src: Option<Entry>,
    member: &str,
    section: &str,
) -> Result<(), AggregationError> {
    match dst {
        None => {
            *dst = src;
            Ok(())
        }
        Some(existing) if src.as_ref() == Some(existing) => Ok(()),
        Some(_) => Err(disagreement(member, section)),
    }
}

/// Unions type rows keyed by `name`; a name bound to different properties is a conflict.
fn merge_types(dst: &mut Option<Entry>, src: Option<Entry>, member: &str) -> Result<(), AggregationError> {
    let Some(src) = src else {
        return Ok(());
    };
    let Some(existing) = dst else {
        *dst = Some(src);
        return Ok(());
    };
    if existing.kind != src.kind || existing.parameters != src.parameters {
        return Err(disagreement(member, "global.types"));
    }
    let mut aligned = Entry {
        labels: existing.labels.clone(),
        ..Entry::default()
    };
    aligned
        .append_rows(src.labels, src.data, "global.types")
        .map_err(|source| AggregationError::Merge {
            member: member.to_string(),
            source,
        })?;
    if existing.labels.is_empty() {
        existing.labels = aligned.labels;
    }
    let name_col = existing
        .column("name")
        .ok_or_else(|| disagreement(member, "global.types"))?;
    for row in aligned.data {
        let name = row.get(name_col).cloned().unwrap_or(Value::Null);
        match existing.data.iter().find(|r| r.get(name_col) == Some(&name)) {
            Some(known) if *known == row => {}
            Some(_) => {
                return Err(AggregationError::TypeConflict {
                    member: member.to_string(),
                    name: name.as_str().map(str::to_string).unwrap_or_else(|| name.to_string()),
                });
            }
            None => existing.data.push(row),
        }
    }
    Ok(())
}

fn merge_force_field(dst: &mut Section, src: Section, member: &str) -> Result<(), AggregationError> {
    for (key, entry) in src {
        let path = format!("topology.forceField.{key}");
        let Some(existing) = dst.get_mut(&key) else {
            dst.insert(key, entry);
            continue;
        };
        if existing.kind != entry.kind || existing.parameters != entry.parameters {
            return Err(disagreement(member, &path));
        }
        let result = if entry.has_id_columns() {
            existing.append_rows(entry.labels, entry.data, &path)
        } else {
            existing.union_rows(entry.labels, entry.data, &path)
        };
        result.map_err(|source| AggregationError::Merge {
            member: member.to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Keeps the rows whose ids all belong to `ids`, shifted back by `offset`.
fn restrict(entry: &Entry, ids: &HashSet<usize>, offset: usize) -> Result<Entry, InvalidIdCell> {
    let mut kept = Entry {
        data: entry
            .data
            .iter()
            .filter(|row| {
                let row_ids = entry.row_ids(row);
                !row_ids.is_empty() && row_ids.iter().all(|id| ids.contains(id))
            })
            .cloned()
            .collect(),
        ..entry.clone()
    };
    kept.try_map_ids(|id| id.checked_sub(offset))?;
    Ok(kept)
}
