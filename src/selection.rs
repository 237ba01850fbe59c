//! The set of entities enabled for a deployment.

use std::path::{Path, PathBuf};

use crate::registry::EntityRef;
use crate::schema::Category;

/// Enabled entity keys, per category.
///
/// In JSON this is an object with a list of keys for each category, e.g.
/// `{ "binary_sensor": ["flame_on"], "setpoint": ["t_set"] }`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selection {
    #[serde(default, alias = "measurement")]
    pub sensor: Vec<String>,
    #[serde(default, alias = "flag")]
    pub binary_sensor: Vec<String>,
    #[serde(default)]
    pub switch: Vec<String>,
    #[serde(default, alias = "number", alias = "input")]
    pub setpoint: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not read the selection file at {1:?}")]
    ReadFile(#[source] std::io::Error, PathBuf),
    #[error("the selection file at {1:?} is not valid")]
    ParseFile(#[source] serde_json::Error, PathBuf),
    #[error("could not parse the selection")]
    Parse(#[source] serde_json::Error),
}

impl Selection {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::ReadFile(e, path.to_path_buf()))?;
        serde_json::from_str(&json).map_err(|e| Error::ParseFile(e, path.to_path_buf()))
    }

    fn keys_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Sensor => &mut self.sensor,
            Category::BinarySensor => &mut self.binary_sensor,
            Category::Switch => &mut self.switch,
            Category::Setpoint => &mut self.setpoint,
        }
    }

    pub fn keys(&self, category: Category) -> &[String] {
        match category {
            Category::Sensor => &self.sensor,
            Category::BinarySensor => &self.binary_sensor,
            Category::Switch => &self.switch,
            Category::Setpoint => &self.setpoint,
        }
    }

    pub fn insert(&mut self, entity: EntityRef) {
        let keys = self.keys_mut(entity.category);
        if !keys.contains(&entity.key) {
            keys.push(entity.key);
        }
    }

    pub fn entity_refs(&self) -> impl Iterator<Item = EntityRef> + '_ {
        Category::all().iter().flat_map(move |&category| {
            self.keys(category).iter().map(move |key| EntityRef::new(category, key.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        Category::all().iter().all(|&c| self.keys(c).is_empty())
    }
}

impl FromIterator<EntityRef> for Selection {
    fn from_iter<T: IntoIterator<Item = EntityRef>>(iter: T) -> Self {
        let mut selection = Self::default();
        for entity in iter {
            selection.insert(entity);
        }
        selection
    }
}
