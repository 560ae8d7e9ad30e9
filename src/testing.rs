//! In-memory [`Workspace`] used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config_map::ConfigMap;
use crate::progress::Progress;
use crate::stack::StackOutputs;
use crate::workspace::{
    DestroyResult, Error, OutputSink, Plugin, ResourceChanges, StackId, UpResult, Workspace,
};

pub fn outputs(pairs: &[(&str, serde_json::Value)]) -> StackOutputs {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    stacks: HashMap<String, StackOutputs>,
    published: HashMap<String, StackOutputs>,
    config: HashMap<String, ConfigMap>,
    plugins: HashSet<Plugin>,
    failures: HashSet<String>,
}

/// Records every call as `"<verb> <stack>"`, e.g. `"up cluster"`.
#[derive(Default)]
pub struct FakeWorkspace {
    state: Mutex<FakeState>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs the stack publishes when `up` runs.
    pub fn publishes(self, stack: &str, outputs: StackOutputs) -> Self {
        self.state
            .lock()
            .unwrap()
            .published
            .insert(stack.to_string(), outputs);
        self
    }

    /// A stack applied by an earlier run.
    pub fn existing(self, stack: &str, outputs: StackOutputs) -> Self {
        self.state
            .lock()
            .unwrap()
            .stacks
            .insert(stack.to_string(), outputs);
        self
    }

    /// Makes the call with this label fail.
    pub fn failing(self, call: &str) -> Self {
        self.state.lock().unwrap().failures.insert(call.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|recorded| recorded.as_str() == call).count()
    }

    pub fn config(&self, stack: &str) -> Option<ConfigMap> {
        self.state.lock().unwrap().config.get(stack).cloned()
    }

    pub fn exists(&self, stack: &str) -> bool {
        self.state.lock().unwrap().stacks.contains_key(stack)
    }

    fn record(&self, call: String) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let failed = state.failures.contains(&call);
        state.calls.push(call.clone());

        if failed {
            return Err(Error::CommandFailed {
                command: call,
                stderr: String::from("injected failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    async fn create_or_select_stack(&self, stack: &StackId) -> Result<(), Error> {
        self.record(format!("select {}", stack.stack))?;
        self.state
            .lock()
            .unwrap()
            .stacks
            .entry(stack.stack.clone())
            .or_default();
        Ok(())
    }

    async fn install_plugin(&self, plugin: &Plugin) -> Result<(), Error> {
        self.record(format!("plugin {} {}", plugin.name, plugin.version))?;
        self.state.lock().unwrap().plugins.insert(plugin.clone());
        Ok(())
    }

    async fn set_all_config(&self, stack: &StackId, config: &ConfigMap) -> Result<(), Error> {
        self.record(format!("config {}", stack.stack))?;
        self.state
            .lock()
            .unwrap()
            .config
            .insert(stack.stack.clone(), config.clone());
        Ok(())
    }

    async fn refresh(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<(), Error> {
        self.record(format!("refresh {}", stack.stack))?;
        sink.line(&format!("Refreshing ({})", stack.stack));
        sink.clear();
        Ok(())
    }

    async fn up(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<UpResult, Error> {
        self.record(format!("up {}", stack.stack))?;
        sink.line(&format!("Updating ({})", stack.stack));
        sink.clear();

        let mut state = self.state.lock().unwrap();
        let outputs = state.published.get(&stack.stack).cloned().unwrap_or_default();
        state.stacks.insert(stack.stack.clone(), outputs.clone());

        let mut resource_changes = ResourceChanges::new();
        resource_changes.insert(String::from("create"), outputs.len() as u64);
        Ok(UpResult {
            outputs,
            resource_changes,
        })
    }

    async fn destroy(
        &self,
        stack: &StackId,
        sink: &dyn OutputSink,
    ) -> Result<DestroyResult, Error> {
        self.record(format!("destroy {}", stack.stack))?;
        sink.line(&format!("Destroying ({})", stack.stack));
        sink.clear();

        let mut state = self.state.lock().unwrap();
        if let Some(outputs) = state.stacks.get_mut(&stack.stack) {
            outputs.clear();
        }
        Ok(DestroyResult::default())
    }

    async fn remove_stack(&self, stack: &StackId) -> Result<(), Error> {
        self.record(format!("rm {}", stack.stack))?;
        self.state.lock().unwrap().stacks.remove(&stack.stack);
        Ok(())
    }

    async fn stack_outputs(&self, stack: &StackId) -> Result<Option<StackOutputs>, Error> {
        self.record(format!("outputs {}", stack.stack))?;
        Ok(self.state.lock().unwrap().stacks.get(&stack.stack).cloned())
    }
}

/// Keeps every progress line and phase message it receives.
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingProgress {
    fn line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

impl Progress for RecordingProgress {
    fn as_sink(&self) -> &dyn OutputSink {
        self
    }

    fn fail(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}
