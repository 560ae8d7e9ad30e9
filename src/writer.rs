use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::config_map::ConfigMap;

pub const KUBECONFIG_FILE_NAME: &str = "kubeconfig-devs.json";
pub const ENVRC_FILE_NAME: &str = ".envrc";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to write {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("Unable to remove {path}: {source}")]
    Remove { path: String, source: io::Error },

    #[error("Unable to serialize {0}")]
    Serialize(String),
}

#[derive(Serialize)]
struct Mirror<'a> {
    stack: &'a str,
    config: IndexMap<String, String>,
}

pub fn mirror_path(dir: &Path, stack_name: &str) -> PathBuf {
    return dir.join(format!("{}.yaml", stack_name));
}

/// Writes the stack's configuration for operators to inspect. Secrets are
/// masked.
pub fn write_mirror(
    dir: &Path,
    stack_name: &str,
    config_map: &ConfigMap,
) -> Result<PathBuf, Error> {
    let path = mirror_path(dir, stack_name);
    let mirror = Mirror {
        stack: stack_name,
        config: config_map.masked(),
    };

    let file_contents = match serde_yaml::to_string(&mirror) {
        Ok(contents) => contents,
        Err(error) => return Err(Error::Serialize(error.to_string())),
    };

    if let Err(source) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, file_contents)) {
        return Err(Error::Write {
            path: path.display().to_string(),
            source,
        });
    }

    return Ok(path);
}

/// Deleting a mirror that is already gone is not an error, so a destroy that
/// failed half-way can be re-run.
pub fn remove_mirror(dir: &Path, stack_name: &str) -> Result<bool, Error> {
    let path = mirror_path(dir, stack_name);

    match fs::remove_file(&path) {
        Ok(_) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(Error::Remove {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Exports the cluster kubeconfig as pretty JSON. The output may arrive as an
/// object or as an already encoded JSON string.
pub fn write_kubeconfig(dir: &Path, kubeconfig: &serde_json::Value) -> Result<PathBuf, Error> {
    let path = dir.join(KUBECONFIG_FILE_NAME);

    let value = match kubeconfig {
        serde_json::Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(_) => kubeconfig.clone(),
        },
        other => other.clone(),
    };

    let file_contents = match serde_json::to_string_pretty(&value) {
        Ok(contents) => contents,
        Err(error) => return Err(Error::Serialize(error.to_string())),
    };

    if let Err(source) = fs::write(&path, file_contents) {
        return Err(Error::Write {
            path: path.display().to_string(),
            source,
        });
    }

    return Ok(path);
}

pub fn write_envrc(dir: &Path, kubeconfig_path: &Path) -> Result<PathBuf, Error> {
    let path = dir.join(ENVRC_FILE_NAME);
    let file_contents = format!("export KUBECONFIG={}\n", kubeconfig_path.display());

    if let Err(source) = fs::write(&path, file_contents) {
        return Err(Error::Write {
            path: path.display().to_string(),
            source,
        });
    }

    return Ok(path);
}
