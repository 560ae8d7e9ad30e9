//! Run-scoped key/value state.
//!
//! One [`Store`] belongs to one [`crate::automation::Automation`]; it is not
//! shared between runs and has no interior locking. Mutation needs `&mut`, so
//! two stack operations can never interleave writes to it.

use std::collections::HashMap;

use serde_json::{json, Value};

pub const CURRENT_STACK: &str = "currentStack";
pub const CLI_EXECUTION_CONTEXT: &str = "cliExecutionContext";
pub const CLI_OPTIONS: &str = "cliOptions";
pub const GLOBAL_CONFIG: &str = "globalPulumiConfigs";

#[derive(Debug, Default, Clone)]
pub struct Store {
    states: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn with_defaults() -> Self {
        let mut store = Store::new();
        store.set_default_states(vec![
            (CLI_EXECUTION_CONTEXT, json!("ckc")),
            (CURRENT_STACK, json!("")),
            (CLI_OPTIONS, json!({})),
            (GLOBAL_CONFIG, json!({})),
        ]);
        return store;
    }

    /// Replaces the whole state with `defaults`.
    pub fn set_default_states<K: Into<String>>(&mut self, defaults: Vec<(K, Value)>) {
        self.states = defaults
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.states.insert(key.into(), value);
    }

    /// `None` when the key was never set.
    pub fn get_state(&self, key: &str) -> Option<&Value> {
        return self.states.get(key);
    }

    pub fn current_stack(&self) -> Option<&str> {
        match self.get_state(CURRENT_STACK) {
            Some(Value::String(name)) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}
