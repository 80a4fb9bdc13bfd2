use std::path::Path;

use quarry_mongo::MongoConfig;
use quarry_transform::FieldRule;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Top-level YAML file: one data source and the entities read from it.
///
/// ```yaml
/// datasource:
///   database: shop
///   host: db1,db2
/// entities:
///   - name: orders
///     collection: orders
///     query: '{"status": "open"}'
///     limit: 100
///     fields:
///       - { column: id, mongoField: _id }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub datasource: MongoConfig,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub collection: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl ImportConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The entity called `name`, or the first one when no name is given.
    pub fn entity(&self, name: Option<&str>) -> Result<&EntityConfig, Error> {
        match name {
            Some(name) => self
                .entities
                .iter()
                .find(|e| e.name == name)
                .ok_or_else(|| Error::UnknownEntity(name.to_string())),
            None => self.entities.first().ok_or(Error::NoEntities),
        }
    }
}
