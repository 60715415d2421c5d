use super::Selected;
use crate::core::components::model::{ModelData, Particle};
use crate::core::ids::LocalId;
use crate::core::simulation::IdColumn;

/// Selection kinds every model answers, before model-defined kinds are consulted.
pub const COMMON_KINDS: [&str; 6] = ["id", "type", "res", "chain", "model", "forceField"];

pub fn is_common(kind: &str) -> bool {
    COMMON_KINDS.iter().any(|k| *k == kind)
}

/// Resolves a common kind against a model's data, in local ids.
pub fn resolve(
    data: &ModelData,
    kind: &str,
    options: &[String],
) -> Result<Selected<LocalId>, String> {
    match kind {
        "id" => {
            let ids = parse_id_list(options, data.particles.len())?;
            if let Some(missing) = ids.iter().find(|id| data.particle(LocalId(**id)).is_none()) {
                return Err(format!("id {missing} is not part of the model"));
            }
            Ok(Selected::Ids(ids.into_iter().map(LocalId).collect()))
        }
        "type" => {
            require_options(options)?;
            Ok(filter(data, |p| options.iter().any(|o| *o == p.type_name)))
        }
        "res" => {
            let values = parse_integers(options)?;
            Ok(filter(data, |p| values.contains(&p.res_id)))
        }
        "chain" => {
            let values = parse_integers(options)?;
            Ok(filter(data, |p| values.contains(&p.chain_id)))
        }
        "model" => {
            let values = parse_integers(options)?;
            Ok(filter(data, |p| values.contains(&p.model_id)))
        }
        "forceField" => force_field(data, options),
        other => Err(format!("'{other}' is not a common selection kind")),
    }
}

fn filter(data: &ModelData, keep: impl Fn(&Particle) -> bool) -> Selected<LocalId> {
    Selected::Ids(data.particles.iter().filter(|p| keep(p)).map(|p| p.id).collect())
}

fn require_options(options: &[String]) -> Result<(), String> {
    if options.is_empty() {
        Err("expected at least one value".to_string())
    } else {
        Ok(())
    }
}

fn parse_integers(options: &[String]) -> Result<Vec<i64>, String> {
    require_options(options)?;
    options
        .iter()
        .map(|o| o.parse::<i64>().map_err(|_| format!("'{o}' is not an integer")))
        .collect()
}

/// Parses `3 5 7:9` into `[3, 5, 7, 8, 9]`; ranges are inclusive.
///
/// Every id must be below `count`, checked before a range is expanded.
pub fn parse_id_list(options: &[String], count: usize) -> Result<Vec<usize>, String> {
    require_options(options)?;
    let parse = |s: &str| -> Result<usize, String> {
        let id = s
            .parse::<usize>()
            .map_err(|_| format!("'{s}' is not a non-negative integer"))?;
        if id >= count {
            return Err(format!("id {id} is not part of the model ({count} particles)"));
        }
        Ok(id)
    };
    let mut ids = Vec::new();
    for option in options {
        match option.split_once(':') {
            Some((a, b)) => {
                let (start, end) = (parse(a)?, parse(b)?);
                if end < start {
                    return Err(format!("range '{option}' is reversed"));
                }
                ids.extend(start..=end);
            }
            None => ids.push(parse(option)?),
        }
    }
    Ok(ids)
}

fn force_field(data: &ModelData, options: &[String]) -> Result<Selected<LocalId>, String> {
    require_options(options)?;
    let mut arity = None;
    let mut tuples: Vec<Vec<LocalId>> = Vec::new();
    for name in options {
        let entry = data
            .force_field
            .get(name)
            .ok_or_else(|| format!("force field entry '{name}' does not exist in the model"))?;
        let entry_arity = entry.bond_arity();
        if entry_arity == 0 {
            return Err(format!("force field entry '{name}' has no id columns"));
        }
        match arity {
            Some(a) if a != entry_arity => {
                return Err(format!(
                    "force field entry '{name}' has arity {entry_arity}, previous entries have {a}"
                ));
            }
            _ => arity = Some(entry_arity),
        }
        let columns: Vec<usize> = entry
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| IdColumn::classify(label) == Some(IdColumn::Single))
            .map(|(i, _)| i)
            .collect();
        for row in &entry.data {
            let tuple = columns
                .iter()
                .map(|&c| row.get(c).and_then(|v| v.as_u64()).map(|v| LocalId(v as usize)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| format!("force field entry '{name}' has a malformed id row"))?;
            tuples.push(tuple);
        }
    }
    Ok(match arity {
        Some(1) | None => Selected::Ids(tuples.into_iter().flatten().collect()),
        Some(arity) => Selected::Tuples { arity, tuples },
    })
}
