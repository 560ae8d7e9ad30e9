use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config_map::ConfigMap;

/// Outputs published by a stack after a successful `up`.
pub type StackOutputs = IndexMap<String, serde_json::Value>;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Stack '{stack}' cannot move from {from} to {to}")]
    InvalidTransition {
        stack: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Outputs of stack '{stack}' are not readable while it is {state}")]
    NotApplied {
        stack: String,
        state: LifecycleState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Unprovisioned,
    Applying,
    Applied,
    Destroying,
    Destroyed,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Unprovisioned => "unprovisioned",
            LifecycleState::Applying => "applying",
            LifecycleState::Applied => "applied",
            LifecycleState::Destroying => "destroying",
            LifecycleState::Destroyed => "destroyed",
            LifecycleState::Failed => "failed",
        }
    }

    /// A stack whose history in this process is unknown may still have been
    /// applied by a prior run, so `destroying` is reachable from
    /// `unprovisioned` too. Destroy is re-runnable, including on a stack whose
    /// `up` failed. There is no `failed -> applying` retry; a failed stack is
    /// only applied again by a fresh run.
    pub fn can_transition(&self, to: LifecycleState) -> bool {
        use LifecycleState::*;

        return matches!(
            (self, to),
            (Unprovisioned, Applying)
                | (Applied, Applying)
                | (Destroyed, Applying)
                | (Applying, Applied)
                | (Applying, Failed)
                | (Unprovisioned, Destroying)
                | (Applied, Destroying)
                | (Destroyed, Destroying)
                | (Failed, Destroying)
                | (Destroying, Destroyed)
                | (Destroying, Failed)
        );
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Up,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Up => f.write_str("up"),
            Operation::Destroy => f.write_str("destroy"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stack {
    pub name: String,
    pub config_map: ConfigMap,
    state: LifecycleState,
    outputs: StackOutputs,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        return Self {
            name: name.into(),
            config_map: ConfigMap::new(),
            state: LifecycleState::Unprovisioned,
            outputs: StackOutputs::new(),
        };
    }

    pub fn state(&self) -> LifecycleState {
        return self.state;
    }

    pub fn transition(&mut self, to: LifecycleState) -> Result<(), Error> {
        if !self.state.can_transition(to) {
            return Err(Error::InvalidTransition {
                stack: self.name.clone(),
                from: self.state,
                to,
            });
        }

        tracing::debug!(stack = %self.name, from = %self.state, to = %to, "lifecycle transition");
        self.state = to;
        if to != LifecycleState::Applied {
            self.outputs.clear();
        }

        return Ok(());
    }

    /// Marks an `applying` stack as `applied` and records its outputs.
    pub fn applied(&mut self, outputs: StackOutputs) -> Result<(), Error> {
        self.transition(LifecycleState::Applied)?;
        self.outputs = outputs;
        return Ok(());
    }

    pub fn outputs(&self) -> Result<&StackOutputs, Error> {
        if self.state != LifecycleState::Applied {
            return Err(Error::NotApplied {
                stack: self.name.clone(),
                state: self.state,
            });
        }

        return Ok(&self.outputs);
    }
}

/// Every stack the engine has touched in this process, in first-seen order.
#[derive(Debug, Default)]
pub struct Ledger {
    stacks: IndexMap<String, Stack>,
}

impl Ledger {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn get(&self, name: &str) -> Option<&Stack> {
        return self.stacks.get(name);
    }

    pub fn entry(&mut self, name: &str) -> &mut Stack {
        return self.stacks
            .entry(name.to_string())
            .or_insert_with(|| Stack::new(name));
    }

    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        return self.stacks.get(name).map(Stack::state);
    }

    pub fn in_state(&self, state: LifecycleState) -> Vec<&str> {
        return self.stacks
            .values()
            .filter(|stack| stack.state() == state)
            .map(|stack| stack.name.as_str())
            .collect();
    }
}
