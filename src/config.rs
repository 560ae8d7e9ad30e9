use std::{fs, io, path::Path, path::PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::config_map::ConfigMap;
use crate::options::{AppOptions, DestroyOptions, InitOptions};

pub const CONFIG_FILE_NAME: &str = "ckc.json";
pub const PROJECT_FILE_NAME: &str = "Pulumi.yaml";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("{0} does not exist")]
    Missing(String),

    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Malformed {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Invalid options: {0}")]
    Invalid(String),
}

/// Project configuration file, every section optional.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    #[validate]
    pub init: InitOptions,

    #[serde(default)]
    #[validate]
    pub app: AppOptions,

    #[serde(default)]
    #[validate]
    pub destroy: DestroyOptions,

    /// Extra entries set on every stack, overridable per stack.
    #[serde(default)]
    pub global_config: ConfigMap,

    /// Where per-stack configuration mirrors are written, relative to the
    /// project root.
    #[serde(default)]
    pub mirror_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    name: Option<String>,
}

enum Format {
    Json,
    Yaml,
}

fn load<T: DeserializeOwned>(path: &Path, format: Format) -> Result<T, Error> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => Error::Missing(display.clone()),
        _ => Error::Unreadable {
            path: display.clone(),
            reason: error.to_string(),
        },
    })?;

    let parsed = match format {
        Format::Json => serde_json::from_str(&contents).map_err(|error| error.to_string()),
        Format::Yaml => serde_yaml::from_str(&contents).map_err(|error| error.to_string()),
    };

    return parsed.map_err(|reason| Error::Malformed { path: display, reason });
}

pub fn parse(path: &Path) -> Result<ProjectConfig, Error> {
    let config: ProjectConfig = load(path, Format::Json)?;
    validate(&config)?;

    return Ok(config);
}

/// Runs the field validators, flattening failures into one error.
pub fn validate<T: Validate>(value: &T) -> Result<(), Error> {
    return value
        .validate()
        .map_err(|errors| Error::Invalid(errors.to_string()));
}

/// Reads the Pulumi project name from `Pulumi.yaml`.
pub fn project_name(path: &Path) -> Result<String, Error> {
    let project: ProjectFile = load(path, Format::Yaml)?;

    match project.name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(Error::Invalid(format!("{} has no project `name`", path.display()))),
    }
}
