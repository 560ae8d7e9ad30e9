//! The infrastructure-as-code engine as seen by the orchestrator.
//!
//! Every call may suspend on the network. Implementations manage their own
//! state locking; the orchestrator never holds anything across calls.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config_map::ConfigMap;
use crate::stack::StackOutputs;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Stack {0} not found")]
    StackNotFound(String),

    #[error("Unable to parse engine output: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Receives human-readable progress lines while the engine works.
pub trait OutputSink: Send + Sync {
    fn line(&self, line: &str);

    /// Called once the streaming call has finished.
    fn clear(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Plugin {
    pub fn resource(name: impl Into<String>, version: impl Into<String>) -> Self {
        return Self {
            name: name.into(),
            version: version.into(),
            kind: None,
        };
    }

    pub fn kind(&self) -> &str {
        return self.kind.as_deref().unwrap_or("resource");
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{} {} v{}", self.kind(), self.name, self.version);
    }
}

/// Resource operation counts, e.g. `{"create": 12, "same": 3}`.
pub type ResourceChanges = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpResult {
    pub outputs: StackOutputs,
    pub resource_changes: ResourceChanges,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestroyResult {
    pub resource_changes: ResourceChanges,
}

/// Fully qualified stack selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackId {
    pub organization: Option<String>,
    pub project: String,
    pub stack: String,
}

impl StackId {
    pub fn new(
        organization: Option<String>,
        project: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        return Self {
            organization,
            project: project.into(),
            stack: stack.into(),
        };
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.organization {
            Some(organization) => write!(f, "{}/{}/{}", organization, self.project, self.stack),
            None => f.write_str(&self.stack),
        }
    }
}

#[async_trait]
pub trait Workspace: Send + Sync {
    async fn create_or_select_stack(&self, stack: &StackId) -> Result<(), Error>;

    /// Installing a plugin that is already present is a no-op.
    async fn install_plugin(&self, plugin: &Plugin) -> Result<(), Error>;

    /// Sets every entry as one unit before returning.
    async fn set_all_config(&self, stack: &StackId, config: &ConfigMap) -> Result<(), Error>;

    async fn refresh(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<(), Error>;

    async fn up(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<UpResult, Error>;

    async fn destroy(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<DestroyResult, Error>;

    /// Removing a stack that no longer exists succeeds.
    async fn remove_stack(&self, stack: &StackId) -> Result<(), Error>;

    /// Published outputs, `None` when the stack does not exist.
    async fn stack_outputs(&self, stack: &StackId) -> Result<Option<StackOutputs>, Error>;
}

#[cfg(test)]
mod tests {
    use super::{Plugin, StackId};

    #[test]
    fn qualified_names() {
        let bare = StackId::new(None, "proj", "cluster");
        assert_eq!("cluster", bare.to_string());

        let qualified = StackId::new(Some(String::from("acme")), "proj", "cluster");
        assert_eq!("acme/proj/cluster", qualified.to_string());
    }

    #[test]
    fn plugin_kind_defaults_to_resource() {
        let plugin = Plugin::resource("aws", "5.0.0");
        assert_eq!("resource", plugin.kind());
        assert_eq!("resource aws v5.0.0", plugin.to_string());
    }
}
