//! Lifecycle hooks run around each stack operation.

use std::path::PathBuf;

use crate::config_map::ConfigMap;
use crate::stack::StackOutputs;
use crate::store::Store;
use crate::writer;

/// Stack whose `kubeconfig` output is exported after it is applied.
pub const KUBECONFIG_STACK: &str = "cluster";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Writer(#[from] writer::Error),

    #[error("{0}")]
    Other(String),
}

pub struct HookContext<'a> {
    pub stack_name: &'a str,

    /// Merged configuration, present for `up`.
    pub config_map: Option<&'a ConfigMap>,

    /// Published outputs, present after a successful `up`.
    pub outputs: Option<&'a StackOutputs>,

    /// Whether the stack record is being removed, present for `destroy`.
    pub remove: Option<bool>,

    pub store: &'a Store,
}

/// All methods default to doing nothing. A failing hook fails the stack
/// operation it wraps.
pub trait Hooks: Send + Sync {
    fn before_run(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }

    fn after_run(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }

    fn before_up(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }

    fn after_up(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }

    fn before_destroy(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }

    fn after_destroy(&self, _ctx: &HookContext) -> Result<(), Error> {
        return Ok(());
    }
}

pub struct NoHooks;

impl Hooks for NoHooks {}

/// Mirrors each stack's configuration to `<mirror_dir>/<stack>.yaml` and
/// exports the cluster kubeconfig.
pub struct LocalFileHooks {
    pub project_root: PathBuf,
    pub mirror_dir: PathBuf,

    /// Skips mirroring, used when running from a development checkout.
    pub development: bool,

    pub use_direnv: bool,
}

impl Hooks for LocalFileHooks {
    fn after_up(&self, ctx: &HookContext) -> Result<(), Error> {
        if ctx.stack_name != KUBECONFIG_STACK {
            return Ok(());
        }

        let kubeconfig = match ctx.outputs.and_then(|outputs| outputs.get("kubeconfig")) {
            Some(kubeconfig) => kubeconfig,
            None => {
                tracing::warn!(stack = ctx.stack_name, "no kubeconfig output to export");
                return Ok(());
            }
        };

        let path = writer::write_kubeconfig(&self.project_root, kubeconfig)?;
        tracing::info!(path = %path.display(), "exported kubeconfig");

        if self.use_direnv {
            let envrc = writer::write_envrc(&self.project_root, &path)?;
            tracing::info!(path = %envrc.display(), "wrote direnv file");
        }

        return Ok(());
    }

    fn after_run(&self, ctx: &HookContext) -> Result<(), Error> {
        if self.development {
            return Ok(());
        }

        if let Some(config_map) = ctx.config_map {
            let path = writer::write_mirror(&self.mirror_dir, ctx.stack_name, config_map)?;
            tracing::debug!(
                stack = ctx.stack_name,
                path = %path.display(),
                "mirrored stack config"
            );
        }

        if ctx.remove == Some(true) {
            let removed = writer::remove_mirror(&self.mirror_dir, ctx.stack_name)?;
            tracing::debug!(stack = ctx.stack_name, removed, "removed stack config mirror");
        }

        return Ok(());
    }
}
