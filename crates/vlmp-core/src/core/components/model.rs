use crate::core::ids::LocalId;
use crate::core::simulation::{Entry, Section, Simulation};
use nalgebra::Point3;
use serde_json::{Value, json};

pub const STATE_LABELS: [&str; 2] = ["id", "position"];
pub const STRUCTURE_LABELS: [&str; 5] = ["id", "type", "resId", "chainId", "modelId"];

/// Physical properties of one particle type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleType {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub charge: f64,
}

impl ParticleType {
    pub fn new(name: impl Into<String>, mass: f64, radius: f64, charge: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            charge,
        }
    }
}

/// One particle of a model, in the model's local id space.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: LocalId,
    pub type_name: String,
    pub position: Point3<f64>,
    pub res_id: i64,
    pub chain_id: i64,
    pub model_id: i64,
    /// Values of the model's extra state columns, in [`ModelData::extra_state_labels`] order.
    pub extra: Vec<Value>,
}

impl Particle {
    pub fn new(id: usize, type_name: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            id: LocalId(id),
            type_name: type_name.into(),
            position,
            res_id: 0,
            chain_id: 0,
            model_id: 0,
            extra: Vec::new(),
        }
    }
}

/// The particles and bonded terms owned by a model, all in local ids.
///
/// Particle `i` always carries `LocalId(i)`; [`ModelData::validate`] enforces it so
/// that local ids index straight into `particles`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub particles: Vec<Particle>,
    pub force_field: Section,
    /// State columns beyond `id` and `position` (e.g. `direction`), carried through unchanged.
    pub extra_state_labels: Vec<String>,
}

impl ModelData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_local_id(&self) -> Option<LocalId> {
        self.particles.iter().map(|p| p.id).max()
    }

    pub fn ids(&self) -> impl Iterator<Item = LocalId> + '_ {
        self.particles.iter().map(|p| p.id)
    }

    pub fn particle(&self, id: LocalId) -> Option<&Particle> {
        self.particles.get(id.0).filter(|p| p.id == id)
    }

    pub fn particle_mut(&mut self, id: LocalId) -> Option<&mut Particle> {
        self.particles.get_mut(id.0).filter(|p| p.id == id)
    }

    /// Checks the dense-id layout and that bonded terms only reference owned particles.
    pub fn validate(&self) -> Result<(), String> {
        for (index, particle) in self.particles.iter().enumerate() {
            if particle.id.0 != index {
                return Err(format!(
                    "particle at position {} has local id {}, ids must be dense and ordered",
                    index, particle.id
                ));
            }
        }
        let count = self.particles.len();
        for (name, entry) in &self.force_field {
            for row in &entry.data {
                if let Some(id) = entry.row_ids(row).into_iter().find(|&id| id >= count) {
                    return Err(format!(
                        "force field entry '{}' references id {} but the model holds {} particles",
                        name, id, count
                    ));
                }
            }
        }
        Ok(())
    }

    /// The model's fragment: `state`, `topology.structure` and its force field, in local ids.
    pub fn fragment(&self) -> Simulation {
        let mut sim = Simulation::new();
        if self.particles.is_empty() && self.force_field.is_empty() {
            return sim;
        }
        let state_labels: Vec<&str> = STATE_LABELS
            .iter()
            .copied()
            .chain(self.extra_state_labels.iter().map(String::as_str))
            .collect();
        sim.state = Entry::table(&state_labels);
        sim.topology.structure = Entry::table(&STRUCTURE_LABELS);
        for p in &self.particles {
            let mut row = vec![
                json!(p.id.0),
                json!([p.position.x, p.position.y, p.position.z]),
            ];
            row.extend(
                (0..self.extra_state_labels.len())
                    .map(|i| p.extra.get(i).cloned().unwrap_or(Value::Null)),
            );
            sim.state.push_row(row);
            sim.topology.structure.push_row(vec![
                json!(p.id.0),
                json!(p.type_name),
                json!(p.res_id),
                json!(p.chain_id),
                json!(p.model_id),
            ]);
        }
        sim.topology.force_field = self.force_field.clone();
        sim
    }

    /// Rebuilds model data from a fragment carrying `state` and `topology.structure`.
    pub fn from_fragment(fragment: &Simulation) -> Result<Self, String> {
        let state = &fragment.state;
        let structure = &fragment.topology.structure;
        let column = |entry: &Entry, table: &str, label: &str| {
            entry
                .column(label)
                .ok_or_else(|| format!("{table} has no '{label}' column"))
        };

        let mut particles = Vec::with_capacity(state.data.len());
        let mut extra_state_labels = Vec::new();
        if !state.data.is_empty() {
            let id_col = column(state, "state", "id")?;
            let pos_col = column(state, "state", "position")?;
            let extra_cols: Vec<usize> = (0..state.labels.len())
                .filter(|&c| c != id_col && c != pos_col)
                .collect();
            extra_state_labels = extra_cols.iter().map(|&c| state.labels[c].clone()).collect();
            for row in &state.data {
                let id = cell_usize(row, id_col).ok_or("state row has an invalid id")?;
                let position = row
                    .get(pos_col)
                    .and_then(crate::core::components::params::value_to_vec3)
                    .ok_or_else(|| format!("particle {id} has an invalid position"))?;
                let mut particle = Particle::new(id, "", Point3::from(position));
                particle.extra = extra_cols
                    .iter()
                    .map(|&c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect();
                particles.push(particle);
            }
            particles.sort_by_key(|p| p.id);
        }

        if !structure.data.is_empty() {
            let id_col = column(structure, "topology.structure", "id")?;
            let type_col = column(structure, "topology.structure", "type")?;
            let optional = |label: &str| structure.column(label);
            let (res_col, chain_col, model_col) =
                (optional("resId"), optional("chainId"), optional("modelId"));
            for row in &structure.data {
                let id = cell_usize(row, id_col).ok_or("structure row has an invalid id")?;
                let particle = particles
                    .iter_mut()
                    .find(|p| p.id.0 == id)
                    .ok_or_else(|| format!("structure references unknown particle {id}"))?;
                particle.type_name = row
                    .get(type_col)
                    .and_then(Value::as_str)
                    .ok_or_else(|| format!("particle {id} has an invalid type"))?
                    .to_string();
                let int_cell = |col: Option<usize>| {
                    col.and_then(|c| row.get(c)).and_then(Value::as_i64).unwrap_or(0)
                };
                particle.res_id = int_cell(res_col);
                particle.chain_id = int_cell(chain_col);
                particle.model_id = int_cell(model_col);
            }
        }

        if let Some(p) = particles.iter().find(|p| p.type_name.is_empty()) {
            return Err(format!("particle {} has no structure row", p.id));
        }

        let data = ModelData {
            particles,
            force_field: fragment.topology.force_field.clone(),
            extra_state_labels,
        };
        data.validate()?;
        Ok(data)
    }
}

fn cell_usize(row: &[Value], col: usize) -> Option<usize> {
    row.get(col).and_then(Value::as_u64).map(|v| v as usize)
}
