use super::traits::Model;
use crate::core::ids::{GlobalId, IdOffset, LocalId, ModelKey};
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelSetError {
    #[error("A model named '{0}' already exists in this simulation")]
    DuplicateName(String),
    #[error("Id offset overflow while placing model '{model}'")]
    OffsetOverflow { model: String },
    #[error("Model '{model}' is inconsistent: {reason}")]
    InvalidModel { model: String, reason: String },
}

/// A model together with the offset that maps its local ids into the simulation.
#[derive(Debug)]
pub struct ModelEntry {
    model: Box<dyn Model>,
    offset: IdOffset,
}

impl ModelEntry {
    pub fn name(&self) -> &str {
        &self.model.info().name
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn Model {
        self.model.as_mut()
    }

    pub fn offset(&self) -> IdOffset {
        self.offset
    }

    pub fn global_ids(&self) -> impl Iterator<Item = GlobalId> + '_ {
        let offset = self.offset;
        self.model.data().ids().map(move |id| id.to_global(offset))
    }

    /// The global id span `[offset, offset + max_local_id + 1)` this model occupies.
    pub fn span(&self) -> usize {
        self.model
            .data()
            .max_local_id()
            .map_or(0, |id| id.0 + 1)
    }
}

/// The instantiated models of one simulation, in declaration order.
#[derive(Debug, Default)]
pub struct ModelSet {
    models: SlotMap<ModelKey, ModelEntry>,
    order: Vec<ModelKey>,
    by_name: HashMap<String, ModelKey>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn insert(&mut self, model: Box<dyn Model>) -> Result<ModelKey, ModelSetError> {
        let name = model.info().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(ModelSetError::DuplicateName(name));
        }
        let key = self.models.insert(ModelEntry {
            model,
            offset: IdOffset::default(),
        });
        self.order.push(key);
        self.by_name.insert(name, key);
        Ok(key)
    }

    /// Assigns contiguous offsets in declaration order and returns the total id span.
    pub fn assign_offsets(&mut self) -> Result<usize, ModelSetError> {
        let mut running = IdOffset::default();
        for key in &self.order {
            let entry = &mut self.models[*key];
            entry
                .model
                .data()
                .validate()
                .map_err(|reason| ModelSetError::InvalidModel {
                    model: entry.name().to_string(),
                    reason,
                })?;
            entry.offset = running;
            running = running
                .advance(entry.span())
                .ok_or_else(|| ModelSetError::OffsetOverflow {
                    model: entry.name().to_string(),
                })?;
        }
        Ok(running.0)
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.by_name.get(name).map(|key| &self.models[*key])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModelEntry> {
        let key = *self.by_name.get(name)?;
        self.models.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.order.iter().map(move |key| &self.models[*key])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(ModelEntry::name)
    }

    pub fn all_global_ids(&self) -> Vec<GlobalId> {
        self.iter().flat_map(ModelEntry::global_ids).collect()
    }

    /// Finds the model owning a global id and the id's local value inside it.
    pub fn locate(&self, id: GlobalId) -> Option<(&ModelEntry, LocalId)> {
        self.iter().find_map(|entry| {
            let local = id.to_local(entry.offset)?;
            entry.model.data().particle(local).map(|_| (entry, local))
        })
    }

    pub fn position(&self, id: GlobalId) -> Option<Point3<f64>> {
        let (entry, local) = self.locate(id)?;
        entry.model.data().particle(local).map(|p| p.position)
    }

    /// Moves one particle; returns `false` when no model owns `id`.
    pub fn set_position(&mut self, id: GlobalId, position: Point3<f64>) -> bool {
        for key in &self.order {
            let entry = &mut self.models[*key];
            let Some(local) = id.to_local(entry.offset) else {
                continue;
            };
            if let Some(particle) = entry.model.data_mut().particle_mut(local) {
                particle.position = position;
                return true;
            }
        }
        false
    }

    /// The particle type name of a global id.
    pub fn type_of(&self, id: GlobalId) -> Option<&str> {
        let (entry, local) = self.locate(id)?;
        entry
            .model
            .data()
            .particle(local)
            .map(|p| p.type_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::category::Category;
    use crate::core::components::error::ComponentError;
    use crate::core::components::model::{ModelData, Particle};
    use crate::core::components::params::ComponentInfo;
    use crate::core::components::traits::Component;
    use crate::core::simulation::Simulation;

    #[derive(Debug)]
    struct Line {
        info: ComponentInfo,
        data: ModelData,
    }

    impl Line {
        fn boxed(name: &str, n: usize) -> Box<dyn Model> {
            let mut data = ModelData::new();
            for i in 0..n {
                data.particles
                    .push(Particle::new(i, "A", Point3::new(i as f64, 0.0, 0.0)));
            }
            Box::new(Line {
                info: ComponentInfo::new(Category::Models, name, "LINE"),
                data,
            })
        }
    }

    impl Component for Line {
        fn info(&self) -> &ComponentInfo {
            &self.info
        }

        fn fragment(&self) -> Result<Simulation, ComponentError> {
            Ok(self.data.fragment())
        }
    }

    impl Model for Line {
        fn data(&self) -> &ModelData {
            &self.data
        }

        fn data_mut(&mut self) -> &mut ModelData {
            &mut self.data
        }
    }

    fn set(sizes: &[(&str, usize)]) -> ModelSet {
        let mut models = ModelSet::new();
        for (name, n) in sizes {
            models.insert(Line::boxed(name, *n)).unwrap();
        }
        models
    }

    #[test]
    fn offsets_are_contiguous_in_declaration_order() {
        let mut models = set(&[("a", 3), ("empty", 0), ("b", 2)]);
        assert_eq!(models.assign_offsets().unwrap(), 5);
        assert_eq!(models.get("a").unwrap().offset(), IdOffset(0));
        assert_eq!(models.get("empty").unwrap().offset(), IdOffset(3));
        assert_eq!(models.get("b").unwrap().offset(), IdOffset(3));
        let ids: Vec<_> = models.all_global_ids().into_iter().map(|g| g.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn duplicate_model_names_are_rejected() {
        let mut models = set(&[("a", 1)]);
        assert_eq!(
            models.insert(Line::boxed("a", 1)).unwrap_err(),
            ModelSetError::DuplicateName("a".to_string())
        );
    }

    #[test]
    fn locate_maps_global_ids_to_owner() {
        let mut models = set(&[("a", 3), ("b", 2)]);
        models.assign_offsets().unwrap();
        let (entry, local) = models.locate(GlobalId(4)).unwrap();
        assert_eq!(entry.name(), "b");
        assert_eq!(local, LocalId(1));
        assert!(models.locate(GlobalId(5)).is_none());
    }

    #[test]
    fn set_position_updates_the_owning_model() {
        let mut models = set(&[("a", 2), ("b", 2)]);
        models.assign_offsets().unwrap();
        assert!(models.set_position(GlobalId(2), Point3::new(9.0, 9.0, 9.0)));
        assert_eq!(models.position(GlobalId(2)), Some(Point3::new(9.0, 9.0, 9.0)));
        assert_eq!(
            models.get("b").unwrap().model().data().particles[0].position,
            Point3::new(9.0, 9.0, 9.0)
        );
        assert!(!models.set_position(GlobalId(10), Point3::origin()));
    }

    #[test]
    fn invalid_model_data_is_reported_at_offset_assignment() {
        let mut models = set(&[("a", 2)]);
        models.get_mut("a").unwrap().model_mut().data_mut().particles[1].id = LocalId(7);
        assert!(matches!(
            models.assign_offsets(),
            Err(ModelSetError::InvalidModel { .. })
        ));
    }
}
