//! Runs one configured entity import and writes its rows as JSON lines.

mod config;
mod export;

use std::path::PathBuf;

use clap::Parser;
use quarry_import::ImportError;
use quarry_mongo::MongoDataSource;
use quarry_transform::{FieldTransformer, TransformError};
use tracing::info;

pub use config::{EntityConfig, ImportConfig};
pub use export::{ExportSummary, export};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no entity named {0}")]
    UnknownEntity(String),

    #[error("config declares no entities")]
    NoEntities,

    #[error("invalid field rules")]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to write row")]
    Output(#[source] std::io::Error),
}

/// Import documents from MongoDB as flat JSON rows
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML import configuration
    #[arg(long, env = "QUARRY_CONFIG")]
    pub config: PathBuf,

    /// Entity to run; defaults to the first one declared
    #[arg(long)]
    pub entity: Option<String>,

    /// Row cap, overriding the entity's own limit
    #[arg(long)]
    pub limit: Option<u64>,
}

pub fn run(cli: Cli) -> Result<ExportSummary, Error> {
    let config = ImportConfig::load(&cli.config)?;
    let entity = config.entity(cli.entity.as_deref())?;
    let transformer = FieldTransformer::new(&entity.fields)?;
    let limit = cli.limit.or(entity.limit);

    let mut source = MongoDataSource::connect(&config.datasource)?;
    let rows = source.get_data(&entity.query, &entity.collection, limit)?;

    let stdout = std::io::stdout();
    let summary = export(rows, &transformer, &mut stdout.lock());
    source.close();
    let summary = summary?;

    info!(
        entity = %entity.name,
        rows = summary.rows,
        date_warnings = summary.date_warnings,
        "import finished"
    );
    Ok(summary)
}
