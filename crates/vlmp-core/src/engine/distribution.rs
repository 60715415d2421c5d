use super::pool::{AssembledSimulation, SimulationPool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Scoring properties understood by [`DistributionStrategy::UpperLimit`].
pub const SCORING_PROPERTIES: [&str; 1] = ["numberOfParticles"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
    #[error("Unknown distribution strategy '{0}' (expected none, one, size:<k>, upperLimit:<property>:<limit> or property:<path>)")]
    UnknownStrategy(String),
    #[error("Unknown scoring property '{0}' (available: numberOfParticles)")]
    UnknownProperty(String),
    #[error("Set size must be at least 1")]
    ZeroSize,
    #[error("Upper limit must be a positive number, got {0}")]
    InvalidLimit(f64),
    #[error("Simulation '{simulation}' has no value at path '{path}'")]
    UnresolvedPath { simulation: String, path: String },
    #[error("Simulation sets do not partition the pool: {0}")]
    NotAPartition(String),
}

/// How the assembled pool is split into simulation sets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DistributionStrategy {
    /// One set holding the whole pool.
    #[default]
    None,
    /// One set per simulation.
    One,
    /// Consecutive chunks of `size` simulations.
    Size { size: usize },
    /// Greedy packing while the summed property stays within `limit`.
    UpperLimit { property: String, limit: f64 },
    /// One set per distinct value found at a dot-separated path of the simulation.
    Property { path: String },
}

impl FromStr for DistributionStrategy {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DistributionError::UnknownStrategy(s.to_string());
        let mut parts = s.splitn(3, ':');
        let kind = parts.next().unwrap_or_default();
        let strategy = match kind {
            "none" => DistributionStrategy::None,
            "one" => DistributionStrategy::One,
            "size" => {
                let size = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(unknown)?;
                DistributionStrategy::Size { size }
            }
            "upperLimit" => {
                let property = parts.next().filter(|p| !p.is_empty()).ok_or_else(unknown)?;
                let limit = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(unknown)?;
                DistributionStrategy::UpperLimit {
                    property: property.to_string(),
                    limit,
                }
            }
            "property" => {
                let rest = s.strip_prefix("property:").filter(|p| !p.is_empty());
                return rest
                    .map(|path| DistributionStrategy::Property {
                        path: path.to_string(),
                    })
                    .ok_or_else(unknown);
            }
            _ => return Err(unknown()),
        };
        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(strategy)
    }
}

impl fmt::Display for DistributionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionStrategy::None => f.write_str("none"),
            DistributionStrategy::One => f.write_str("one"),
            DistributionStrategy::Size { size } => write!(f, "size:{size}"),
            DistributionStrategy::UpperLimit { property, limit } => {
                write!(f, "upperLimit:{property}:{limit}")
            }
            DistributionStrategy::Property { path } => write!(f, "property:{path}"),
        }
    }
}

/// An ordered group of pool members materialized together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSet {
    pub name: String,
    pub simulations: Vec<String>,
}

/// Splits the pool into sets named `simulationSet_<i>`.
///
/// # Arguments
///
/// * `pool` - The assembled simulations, in pool order.
/// * `strategy` - The partitioning rule.
///
/// # Return
///
/// Returns the sets in creation order. Every simulation appears in exactly one set.
///
/// # Errors
///
/// Returns [`DistributionError`] for invalid strategy parameters, unresolvable
/// property paths, or if the resulting sets fail the partition check.
pub fn distribute(
    pool: &SimulationPool,
    strategy: &DistributionStrategy,
) -> Result<Vec<SimulationSet>, DistributionError> {
    let members: Vec<&AssembledSimulation> = pool.iter().collect();
    let groups: Vec<Vec<&str>> = match strategy {
        DistributionStrategy::None => vec![members.iter().map(|m| m.name.as_str()).collect()],
        DistributionStrategy::One => members.iter().map(|m| vec![m.name.as_str()]).collect(),
        DistributionStrategy::Size { size } => {
            if *size == 0 {
                return Err(DistributionError::ZeroSize);
            }
            members
                .chunks(*size)
                .map(|chunk| chunk.iter().map(|m| m.name.as_str()).collect())
                .collect()
        }
        DistributionStrategy::UpperLimit { property, limit } => {
            let scores = members
                .iter()
                .map(|m| score(m, property))
                .collect::<Result<Vec<_>, _>>()?;
            if !(limit.is_finite() && *limit > 0.0) {
                return Err(DistributionError::InvalidLimit(*limit));
            }
            pack(&scores, *limit)
                .into_iter()
                .map(|group| group.into_iter().map(|i| members[i].name.as_str()).collect())
                .collect()
        }
        DistributionStrategy::Property { path } => group_by_path(&members, path)?,
    };

    let sets: Vec<SimulationSet> = groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .enumerate()
        .map(|(i, names)| SimulationSet {
            name: format!("simulationSet_{i}"),
            simulations: names.into_iter().map(str::to_string).collect(),
        })
        .collect();
    verify_partition(pool, &sets)?;
    debug!("Strategy '{}' produced {} set(s)", strategy, sets.len());
    Ok(sets)
}

fn score(member: &AssembledSimulation, property: &str) -> Result<f64, DistributionError> {
    match property {
        "numberOfParticles" => Ok(member.simulation.number_of_particles() as f64),
        other => Err(DistributionError::UnknownProperty(other.to_string())),
    }
}

/// Next-fit packing. An entry that does not fit next to the open set closes it
/// and is placed in a set of its own; packing resumes with a fresh set after it.
fn pack(scores: &[f64], limit: f64) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut sum = 0.0;
    for (i, &s) in scores.iter().enumerate() {
        if sum + s <= limit {
            current.push(i);
            sum += s;
            continue;
        }
        if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        groups.push(vec![i]);
        sum = 0.0;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn group_by_path<'a>(
    members: &[&'a AssembledSimulation],
    path: &str,
) -> Result<Vec<Vec<&'a str>>, DistributionError> {
    let mut keys: Vec<Value> = Vec::new();
    let mut groups: Vec<Vec<&'a str>> = Vec::new();
    for member in members {
        let unresolved = || DistributionError::UnresolvedPath {
            simulation: member.name.clone(),
            path: path.to_string(),
        };
        let tree = member.simulation.to_value().map_err(|_| unresolved())?;
        let value = lookup(&tree, path).ok_or_else(unresolved)?;
        match keys.iter().position(|k| k == value) {
            Some(g) => groups[g].push(member.name.as_str()),
            None => {
                keys.push(value.clone());
                groups.push(vec![member.name.as_str()]);
            }
        }
    }
    Ok(groups)
}

/// Follows a dot-separated path through objects; numeric segments index arrays.
fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Every pool member lands in exactly one set and sets hold nothing else.
pub fn verify_partition(pool: &SimulationPool, sets: &[SimulationSet]) -> Result<(), DistributionError> {
    let mut seen = HashSet::new();
    for name in sets.iter().flat_map(|s| &s.simulations) {
        if !pool.contains(name) {
            return Err(DistributionError::NotAPartition(format!(
                "'{name}' is not part of the pool"
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(DistributionError::NotAPartition(format!(
                "'{name}' appears in more than one set"
            )));
        }
    }
    if let Some(missing) = pool.names().find(|n| !seen.contains(n)) {
        return Err(DistributionError::NotAPartition(format!(
            "'{missing}' is not assigned to any set"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::descriptor::PoolEntry;
    use crate::core::simulation::{Entry, EntryType, SIMULATION_INFORMATION, Simulation};
    use serde_json::json;

    fn simulation(name: &str, particles: usize, temperature: f64) -> Simulation {
        let mut sim = Simulation::new();
        sim.system.insert(
            "info".into(),
            Entry::new(EntryType::new(SIMULATION_INFORMATION.0, SIMULATION_INFORMATION.1))
                .with_parameter("name", name),
        );
        sim.state = Entry::table(&["id", "position"]);
        for i in 0..particles {
            sim.state.push_row(vec![json!(i), json!([0.0, 0.0, 0.0])]);
        }
        let mut ensemble = Entry::new(EntryType::new("Ensemble", "NVT"))
            .with_labels(&["box", "temperature"]);
        ensemble.push_row(vec![json!([1.0, 1.0, 1.0]), json!(temperature)]);
        sim.global.ensemble = Some(ensemble);
        sim
    }

    fn pool(counts: &[usize]) -> SimulationPool {
        let mut pool = SimulationPool::new();
        for (i, &n) in counts.iter().enumerate() {
            pool.push(simulation(&format!("s{i}"), n, 1.0), PoolEntry::default())
                .unwrap();
        }
        pool
    }

    fn indexes(sets: &[SimulationSet]) -> Vec<Vec<usize>> {
        sets.iter()
            .map(|s| {
                s.simulations
                    .iter()
                    .map(|n| n[1..].parse().unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn size_chunks_in_pool_order() {
        let sets = distribute(&pool(&[1; 5]), &DistributionStrategy::Size { size: 2 }).unwrap();
        assert_eq!(indexes(&sets), vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert_eq!(sets[2].name, "simulationSet_2");
    }

    #[test]
    fn upper_limit_packs_by_particle_count() {
        let strategy: DistributionStrategy = "upperLimit:numberOfParticles:800".parse().unwrap();
        let sets = distribute(&pool(&[300, 400, 500, 200]), &strategy).unwrap();
        assert_eq!(indexes(&sets), vec![vec![0, 1], vec![2], vec![3]]);
    }

    #[test]
    fn upper_limit_isolates_oversized_entries() {
        let strategy = DistributionStrategy::UpperLimit {
            property: "numberOfParticles".into(),
            limit: 100.0,
        };
        let sets = distribute(&pool(&[50, 500, 30, 20]), &strategy).unwrap();
        assert_eq!(indexes(&sets), vec![vec![0], vec![1], vec![2, 3]]);
    }

    #[test]
    fn none_and_one_are_the_extremes() {
        let p = pool(&[1, 2, 3]);
        assert_eq!(
            indexes(&distribute(&p, &DistributionStrategy::None).unwrap()),
            vec![vec![0, 1, 2]]
        );
        assert_eq!(
            indexes(&distribute(&p, &DistributionStrategy::One).unwrap()),
            vec![vec![0], vec![1], vec![2]]
        );
    }

    #[test]
    fn property_groups_by_value_in_first_appearance_order() {
        let mut p = SimulationPool::new();
        for (i, t) in [2.0, 1.0, 2.0, 3.0, 1.0].into_iter().enumerate() {
            p.push(simulation(&format!("s{i}"), 1, t), PoolEntry::default())
                .unwrap();
        }
        let strategy: DistributionStrategy =
            "property:global.ensemble.data.0.1".parse().unwrap();
        let sets = distribute(&p, &strategy).unwrap();
        assert_eq!(indexes(&sets), vec![vec![0, 2], vec![1, 4], vec![3]]);
    }

    #[test]
    fn unresolvable_path_is_an_error() {
        let strategy = DistributionStrategy::Property {
            path: "global.missing".into(),
        };
        assert!(matches!(
            distribute(&pool(&[1]), &strategy),
            Err(DistributionError::UnresolvedPath { .. })
        ));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            distribute(&pool(&[1]), &DistributionStrategy::Size { size: 0 }),
            Err(DistributionError::ZeroSize)
        ));
        let strategy = DistributionStrategy::UpperLimit {
            property: "mass".into(),
            limit: 10.0,
        };
        assert!(matches!(
            distribute(&pool(&[1]), &strategy),
            Err(DistributionError::UnknownProperty(_))
        ));
        assert!("size:".parse::<DistributionStrategy>().is_err());
        assert!("chunks:3".parse::<DistributionStrategy>().is_err());
        assert!("size:2:3".parse::<DistributionStrategy>().is_err());
    }

    #[test]
    fn strategies_roundtrip_through_strings_and_tables() {
        for text in ["none", "one", "size:3", "upperLimit:numberOfParticles:800", "property:a.b.c"] {
            let strategy: DistributionStrategy = text.parse().unwrap();
            assert_eq!(strategy.to_string(), text);
        }
        let strategy: DistributionStrategy =
            toml::from_str("type = \"upperLimit\"\nproperty = \"numberOfParticles\"\nlimit = 800.0\n")
                .unwrap();
        assert_eq!(
            strategy,
            DistributionStrategy::UpperLimit {
                property: "numberOfParticles".into(),
                limit: 800.0
            }
        );
    }

    #[test]
    fn partition_check_catches_missing_and_repeated_members() {
        let p = pool(&[1, 1]);
        let missing = vec![SimulationSet {
            name: "simulationSet_0".into(),
            simulations: vec!["s0".into()],
        }];
        assert!(verify_partition(&p, &missing).is_err());
        let repeated = vec![SimulationSet {
            name: "simulationSet_0".into(),
            simulations: vec!["s0".into(), "s1".into(), "s0".into()],
        }];
        assert!(verify_partition(&p, &repeated).is_err());
    }
}
