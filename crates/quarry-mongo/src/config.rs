use std::collections::HashMap;

use quarry_doc::FlattenMode;
use quarry_import::ImportError;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "27017";

/// Connection settings for a MongoDB data source.
///
/// `host` and `port` are comma-separated lists. Hosts and ports are paired
/// by position when the lists have the same length; otherwise every host
/// uses the first port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoConfig {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "port_list")]
    pub port: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_map_fields", alias = "map_mongo_fields")]
    pub map_mongo_fields: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_map_fields() -> bool {
    true
}

/// Accept `port: 27017` as well as `port: "27017,27018"`.
fn port_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ports {
        One(u16),
        Many(String),
    }
    Ok(match Ports::deserialize(deserializer)? {
        Ports::One(port) => port.to_string(),
        Ports::Many(ports) => ports,
    })
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            database: None,
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            map_mongo_fields: true,
        }
    }
}

impl MongoConfig {
    /// Read settings from flat string properties (`database`, `host`,
    /// `port`, `username`, `password`, `mapMongoFields`).
    ///
    /// Only the exact string `"true"` enables field mapping when
    /// `mapMongoFields` is present.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let get = |key: &str| props.get(key).cloned();
        Self {
            database: get("database"),
            host: get("host").unwrap_or_else(default_host),
            port: get("port").unwrap_or_else(default_port),
            username: get("username"),
            password: get("password"),
            map_mongo_fields: props.get("mapMongoFields").is_none_or(|v| v == "true"),
        }
    }

    pub fn flatten_mode(&self) -> FlattenMode {
        FlattenMode::from_flag(self.map_mongo_fields)
    }

    /// The target database; required.
    pub fn database(&self) -> Result<&str, ImportError> {
        match self.database.as_deref().map(str::trim) {
            Some(db) if !db.is_empty() => Ok(db),
            _ => Err(ImportError::severe("database must be supplied")),
        }
    }

    /// Resolve the seed list into `(host, port)` pairs.
    pub fn seeds(&self) -> Result<Vec<(String, u16)>, ImportError> {
        let hosts: Vec<&str> = self.host.split(',').map(str::trim).collect();
        let ports = self
            .port
            .split(',')
            .map(|p| {
                let p = p.trim();
                p.parse::<u16>()
                    .map_err(|e| ImportError::wrap(format!("invalid port: {p}"), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if hosts.iter().any(|h| h.is_empty()) {
            return Err(ImportError::severe(format!("invalid host list: {}", self.host)));
        }

        let paired = hosts.len() == ports.len();
        Ok(hosts
            .into_iter()
            .enumerate()
            .map(|(i, host)| {
                let port = if paired { ports[i] } else { ports[0] };
                (host.to_string(), port)
            })
            .collect())
    }

    /// Build the driver connection string.
    ///
    /// Reads go to secondaries when available. With credentials, the
    /// target database is the authentication source.
    pub fn connection_uri(&self) -> Result<String, ImportError> {
        let database = self.database()?;
        let hosts = self
            .seeds()?
            .iter()
            .map(|(host, port)| format!("{host}:{port}"))
            .collect::<Vec<_>>()
            .join(",");

        let mut uri = String::from("mongodb://");
        let mut options = vec!["readPreference=secondaryPreferred".to_string()];
        if let Some(username) = &self.username {
            let password = self.password.as_deref().ok_or_else(|| {
                ImportError::severe(format!("password must be supplied for user {username}"))
            })?;
            uri.push_str(&format!(
                "{}:{}@",
                urlencoding::encode(username),
                urlencoding::encode(password)
            ));
            options.push(format!("authSource={}", urlencoding::encode(database)));
        }
        uri.push_str(&hosts);
        uri.push_str("/?");
        uri.push_str(&options.join("&"));
        Ok(uri)
    }
}
