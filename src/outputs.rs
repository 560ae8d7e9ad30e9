use std::collections::HashMap;
use std::sync::Arc;

use crate::stack::{Ledger, LifecycleState, StackOutputs};
use crate::workspace::{self, StackId, Workspace};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Stack {0} not found")]
    StackNotFound(String),

    #[error("Output `{key}` not found on stack {stack}")]
    OutputNotFound { stack: String, key: String },

    #[error("Stack {stack} is {state}, its outputs are not readable")]
    StackNotApplied { stack: String, state: LifecycleState },

    #[error("Service error ocurred: {0}.")]
    ServiceError(#[from] workspace::Error),
}

/// Read-only view of another stack's published outputs.
#[derive(Debug)]
pub struct StackReference {
    pub id: StackId,

    outputs: StackOutputs,
}

impl StackReference {
    pub fn name(&self) -> &str {
        return &self.id.stack;
    }

    pub fn get_output(&self, key: &str) -> Result<&serde_json::Value, Error> {
        match self.outputs.get(key) {
            Some(value) => Ok(value),
            None => Err(Error::OutputNotFound {
                stack: self.id.to_string(),
                key: key.to_string(),
            }),
        }
    }

    pub fn outputs(&self) -> &StackOutputs {
        return &self.outputs;
    }
}

/// Resolves and caches stack references for one organization and project.
///
/// A reference is resolved eagerly: a missing stack fails at [`resolve`] time
/// rather than at the first output read. Stacks applied earlier in the same
/// run are served from the [`Ledger`] without asking the engine.
///
/// [`resolve`]: StackReferences::resolve
pub struct StackReferences {
    workspace: Arc<dyn Workspace>,
    organization: Option<String>,
    project: String,
    cache: HashMap<String, Arc<StackReference>>,
}

impl StackReferences {
    pub fn new(
        workspace: Arc<dyn Workspace>,
        organization: Option<String>,
        project: impl Into<String>,
    ) -> Self {
        return Self {
            workspace,
            organization,
            project: project.into(),
            cache: HashMap::new(),
        };
    }

    pub async fn resolve(
        &mut self,
        stack_name: &str,
        ledger: &Ledger,
    ) -> Result<Arc<StackReference>, Error> {
        if let Some(reference) = self.cache.get(stack_name) {
            return Ok(Arc::clone(reference));
        }

        let id = StackId::new(self.organization.clone(), self.project.clone(), stack_name);
        let outputs = match ledger.get(stack_name) {
            Some(stack) if stack.state() == LifecycleState::Applied => {
                tracing::debug!(stack = %id, "resolved from this run");
                stack.outputs().map(Clone::clone).map_err(|_| Error::StackNotApplied {
                    stack: id.to_string(),
                    state: stack.state(),
                })?
            }
            Some(stack) if stack.state() != LifecycleState::Unprovisioned => {
                return Err(Error::StackNotApplied {
                    stack: id.to_string(),
                    state: stack.state(),
                });
            }
            _ => {
                tracing::debug!(stack = %id, "resolving from the engine");
                match self.workspace.stack_outputs(&id).await? {
                    Some(outputs) => outputs,
                    None => return Err(Error::StackNotFound(id.to_string())),
                }
            }
        };

        let reference = Arc::new(StackReference { id, outputs });
        self.cache.insert(stack_name.to_string(), Arc::clone(&reference));

        return Ok(reference);
    }

    /// Like [`resolve`](Self::resolve), but a stack that does not exist yields
    /// `None`. Every other failure is still an error.
    pub async fn resolve_optional(
        &mut self,
        stack_name: &str,
        ledger: &Ledger,
    ) -> Result<Option<Arc<StackReference>>, Error> {
        match self.resolve(stack_name, ledger).await {
            Ok(reference) => Ok(Some(reference)),
            Err(Error::StackNotFound(stack)) => {
                tracing::info!(%stack, "optional stack reference is absent");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Drops a cached reference, e.g. after the stack was destroyed.
    pub fn forget(&mut self, stack_name: &str) {
        self.cache.remove(stack_name);
    }
}
