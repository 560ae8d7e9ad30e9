//! Orchestration engine: one `up` or `destroy` against one stack at a time.
//!
//! Every operation takes `&mut self`, so a second stack operation cannot start
//! until the current one has returned. The [`Ledger`] records where each stack
//! is in its lifecycle and is what stack references read when an upstream
//! stack was applied earlier in the same run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;

use crate::config_map::ConfigMap;
use crate::hooks::{self, HookContext, Hooks, NoHooks};
use crate::progress::{Progress, Quiet};
use crate::stack::{self, Ledger, LifecycleState, Operation};
use crate::store::{Store, CURRENT_STACK, GLOBAL_CONFIG};
use crate::workspace::{self, DestroyResult, Plugin, ResourceChanges, StackId, UpResult, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lifecycle,
    Hook,
    Initialize,
    Plugins,
    Config,
    Up,
    Refresh,
    Destroy,
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Phase::Lifecycle => "lifecycle check",
            Phase::Hook => "hook",
            Phase::Initialize => "initialize",
            Phase::Plugins => "plugin install",
            Phase::Config => "config",
            Phase::Up => "up",
            Phase::Refresh => "refresh",
            Phase::Destroy => "destroy",
            Phase::Remove => "remove",
        };
        return f.write_str(phase);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Cause {
    #[error(transparent)]
    Workspace(#[from] workspace::Error),

    #[error(transparent)]
    Hook(#[from] hooks::Error),

    #[error(transparent)]
    Lifecycle(#[from] stack::Error),

    #[error("Stack name must not be empty")]
    EmptyName,

    #[error("Stack '{0}' is still in progress")]
    Busy(String),
}

#[derive(thiserror::Error, Debug)]
#[error("Stack '{stack}' failed during {phase}: {source}")]
pub struct Error {
    pub stack: String,
    pub phase: Phase,
    pub source: Cause,
}

impl Error {
    fn new(stack: &str, phase: Phase, cause: impl Into<Cause>) -> Self {
        return Self {
            stack: stack.to_string(),
            phase,
            source: cause.into(),
        };
    }
}

/// What a provisioning program hands the engine for one stack.
#[derive(Debug, Clone, Default)]
pub struct ProgramArgs {
    pub plugins: Vec<Plugin>,
    pub config_map: ConfigMap,
}

#[derive(Debug, Clone, Default)]
pub struct StackUpOptions {
    /// Merged over the program's config, and over the global config.
    pub config_map: ConfigMap,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StackDestroyOptions {
    /// Delete the stack record and its local mirror after destroying.
    pub remove: bool,
}

pub struct AutomationOptions {
    pub global_config: ConfigMap,
    pub hooks: Arc<dyn Hooks>,
    pub progress: Arc<dyn Progress>,
}

impl Default for AutomationOptions {
    fn default() -> Self {
        return Self {
            global_config: ConfigMap::new(),
            hooks: Arc::new(NoHooks),
            progress: Arc::new(Quiet),
        };
    }
}

pub struct Automation {
    project: String,
    organization: Option<String>,
    workspace: Arc<dyn Workspace>,
    options: AutomationOptions,
    store: Store,
    ledger: Ledger,
    installed_plugins: HashSet<Plugin>,
}

impl Automation {
    pub fn new(
        project: impl Into<String>,
        organization: Option<String>,
        workspace: Arc<dyn Workspace>,
        options: AutomationOptions,
    ) -> Self {
        let mut store = Store::with_defaults();
        store.set_state(GLOBAL_CONFIG, masked(&options.global_config));

        return Self {
            project: project.into(),
            organization,
            workspace,
            options,
            store,
            ledger: Ledger::new(),
            installed_plugins: HashSet::new(),
        };
    }

    pub fn store(&self) -> &Store {
        return &self.store;
    }

    pub fn store_mut(&mut self) -> &mut Store {
        return &mut self.store;
    }

    pub fn ledger(&self) -> &Ledger {
        return &self.ledger;
    }

    pub fn workspace(&self) -> Arc<dyn Workspace> {
        return Arc::clone(&self.workspace);
    }

    pub fn stack_id(&self, stack_name: &str) -> StackId {
        return StackId::new(self.organization.clone(), self.project.clone(), stack_name);
    }

    /// Applies one stack and returns its outputs.
    ///
    /// Configuration is merged as global, then program, then `options`; later
    /// layers win on key conflicts. The whole map is set on the stack before
    /// `up` starts.
    pub async fn stack_up(
        &mut self,
        stack_name: &str,
        program: ProgramArgs,
        options: StackUpOptions,
    ) -> Result<UpResult, Error> {
        self.begin(stack_name, LifecycleState::Applying)?;

        let mut per_stack = program.config_map;
        per_stack.extend(&options.config_map);
        let config_map = ConfigMap::merge(&self.options.global_config, &per_stack);
        self.ledger.entry(stack_name).config_map = config_map.clone();
        tracing::debug!(stack = stack_name, config = ?config_map.masked(), "merged stack config");

        let id = self.stack_id(stack_name);
        let result = match self.apply(&id, &program.plugins, &config_map).await {
            Ok(result) => result,
            Err(error) => return Err(self.abort(error)),
        };

        if let Err(error) = self.ledger.entry(stack_name).applied(result.outputs.clone()) {
            return Err(self.abort(Error::new(stack_name, Phase::Lifecycle, error)));
        }
        self.options.progress.succeed(&format!("Stack '{}' is up", stack_name));
        log_changes(stack_name, Operation::Up, &result.resource_changes);
        tracing::info!(
            stack = stack_name,
            outputs = ?result.outputs.keys().collect::<Vec<_>>(),
            "stack applied"
        );

        // The stack stays applied if a closing hook fails; only the local
        // side effects are missing.
        let ctx = HookContext {
            stack_name,
            config_map: Some(&config_map),
            outputs: Some(&result.outputs),
            remove: None,
            store: &self.store,
        };
        let hooks = &self.options.hooks;
        hooks
            .after_up(&ctx)
            .and_then(|_| hooks.after_run(&ctx))
            .map_err(|error| Error::new(stack_name, Phase::Hook, error))?;

        return Ok(result);
    }

    /// Refreshes then destroys one stack. With `remove`, the stack record is
    /// deleted too; deleting a record that is already gone succeeds.
    pub async fn stack_destroy(
        &mut self,
        stack_name: &str,
        options: StackDestroyOptions,
    ) -> Result<DestroyResult, Error> {
        self.begin(stack_name, LifecycleState::Destroying)?;

        let id = self.stack_id(stack_name);
        let result = match self.teardown(&id, options.remove).await {
            Ok(result) => result,
            Err(error) => return Err(self.abort(error)),
        };

        if let Err(error) = self.ledger.entry(stack_name).transition(LifecycleState::Destroyed) {
            return Err(self.abort(Error::new(stack_name, Phase::Lifecycle, error)));
        }
        self.options.progress.succeed(&format!("Stack '{}' is destroyed", stack_name));
        log_changes(stack_name, Operation::Destroy, &result.resource_changes);

        let ctx = HookContext {
            stack_name,
            config_map: None,
            outputs: None,
            remove: Some(options.remove),
            store: &self.store,
        };
        let hooks = &self.options.hooks;
        hooks
            .after_destroy(&ctx)
            .and_then(|_| hooks.after_run(&ctx))
            .map_err(|error| Error::new(stack_name, Phase::Hook, error))?;

        return Ok(result);
    }

    fn begin(&mut self, stack_name: &str, to: LifecycleState) -> Result<(), Error> {
        if stack_name.trim().is_empty() {
            return Err(Error::new(stack_name, Phase::Lifecycle, Cause::EmptyName));
        }

        let mut in_progress = self.ledger.in_state(LifecycleState::Applying);
        in_progress.extend(self.ledger.in_state(LifecycleState::Destroying));
        if let Some(other) = in_progress.first() {
            return Err(Error::new(stack_name, Phase::Lifecycle, Cause::Busy(other.to_string())));
        }

        self.ledger
            .entry(stack_name)
            .transition(to)
            .map_err(|error| Error::new(stack_name, Phase::Lifecycle, error))?;
        self.store.set_state(CURRENT_STACK, Value::from(stack_name));

        return Ok(());
    }

    fn abort(&mut self, error: Error) -> Error {
        let stack = self.ledger.entry(&error.stack);
        if let Err(transition) = stack.transition(LifecycleState::Failed) {
            tracing::warn!(error = %transition, "could not mark stack as failed");
        }
        self.options.progress.fail(&error.to_string());
        tracing::error!(
            stack = %error.stack,
            phase = %error.phase,
            error = %error.source,
            "stack operation failed"
        );
        return error;
    }

    async fn apply(
        &mut self,
        id: &StackId,
        plugins: &[Plugin],
        config_map: &ConfigMap,
    ) -> Result<UpResult, Error> {
        let stack_name = id.stack.as_str();
        let fail =
            |phase: Phase| move |error: workspace::Error| Error::new(stack_name, phase, error);

        let ctx = HookContext {
            stack_name,
            config_map: Some(config_map),
            outputs: None,
            remove: None,
            store: &self.store,
        };
        self.options
            .hooks
            .before_run(&ctx)
            .and_then(|_| self.options.hooks.before_up(&ctx))
            .map_err(|error| Error::new(stack_name, Phase::Hook, error))?;

        let progress = Arc::clone(&self.options.progress);

        progress.start(&format!("Initializing stack '{}'", stack_name));
        self.workspace
            .create_or_select_stack(id)
            .await
            .map_err(fail(Phase::Initialize))?;

        self.install_plugins(plugins).await.map_err(fail(Phase::Plugins))?;

        progress.start(&format!("Setting {} config entries on '{}'", config_map.len(), stack_name));
        self.workspace
            .set_all_config(id, config_map)
            .await
            .map_err(fail(Phase::Config))?;

        progress.start(&format!("Updating stack '{}'", stack_name));
        let result = self
            .workspace
            .up(id, progress.as_sink())
            .await
            .map_err(fail(Phase::Up))?;

        return Ok(result);
    }

    async fn teardown(&mut self, id: &StackId, remove: bool) -> Result<DestroyResult, Error> {
        let stack_name = id.stack.as_str();
        let fail =
            |phase: Phase| move |error: workspace::Error| Error::new(stack_name, phase, error);

        let ctx = HookContext {
            stack_name,
            config_map: None,
            outputs: None,
            remove: Some(remove),
            store: &self.store,
        };
        self.options
            .hooks
            .before_run(&ctx)
            .and_then(|_| self.options.hooks.before_destroy(&ctx))
            .map_err(|error| Error::new(stack_name, Phase::Hook, error))?;

        let progress = Arc::clone(&self.options.progress);

        progress.start(&format!("Initializing stack '{}'", stack_name));
        self.workspace
            .create_or_select_stack(id)
            .await
            .map_err(fail(Phase::Initialize))?;

        progress.start(&format!("Refreshing stack '{}'", stack_name));
        self.workspace
            .refresh(id, progress.as_sink())
            .await
            .map_err(fail(Phase::Refresh))?;

        progress.start(&format!("Destroying stack '{}'", stack_name));
        let result = self
            .workspace
            .destroy(id, progress.as_sink())
            .await
            .map_err(fail(Phase::Destroy))?;

        if remove {
            progress.start(&format!("Removing stack '{}'", stack_name));
            self.workspace
                .remove_stack(id)
                .await
                .map_err(fail(Phase::Remove))?;
        }

        return Ok(result);
    }

    /// Installs the plugins this engine has not installed yet, concurrently.
    async fn install_plugins(&mut self, plugins: &[Plugin]) -> Result<(), workspace::Error> {
        let mut pending: Vec<&Plugin> = Vec::new();
        for plugin in plugins {
            if !self.installed_plugins.contains(plugin) && !pending.contains(&plugin) {
                pending.push(plugin);
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        self.options
            .progress
            .start(&format!("Installing {} plugin(s)", pending.len()));
        let workspace = &self.workspace;
        try_join_all(pending.iter().map(|plugin| {
            tracing::debug!(%plugin, "installing plugin");
            workspace.install_plugin(plugin)
        }))
        .await?;

        self.installed_plugins.extend(pending.into_iter().cloned());
        return Ok(());
    }
}

fn masked(config_map: &ConfigMap) -> Value {
    let entries = config_map
        .masked()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect::<serde_json::Map<String, Value>>();
    return Value::Object(entries);
}

fn log_changes(stack_name: &str, operation: Operation, changes: &ResourceChanges) {
    if changes.is_empty() {
        tracing::info!(stack = stack_name, %operation, "no resource changes reported");
        return;
    }

    let summary = changes
        .iter()
        .map(|(kind, count)| format!("{}: {}", kind, count))
        .collect::<Vec<_>>()
        .join(", ");
    tracing::info!(stack = stack_name, %operation, "update summary: {}", summary);
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::tempdir;

    use super::{
        Automation, AutomationOptions, Cause, Phase, ProgramArgs, StackDestroyOptions,
        StackUpOptions,
    };
    use crate::config_map::{ConfigMap, ConfigValue};
    use crate::hooks::{HookContext, Hooks, LocalFileHooks};
    use crate::stack::LifecycleState;
    use crate::store::{CURRENT_STACK, GLOBAL_CONFIG};
    use crate::testing::{outputs, FakeWorkspace, RecordingProgress};
    use crate::workspace::Plugin;
    use crate::writer::mirror_path;

    fn automation(workspace: Arc<FakeWorkspace>, options: AutomationOptions) -> Automation {
        Automation::new("proj", Some(String::from("acme")), workspace, options)
    }

    /// Records the current stack every time a run starts.
    #[derive(Default)]
    struct CurrentStackHooks {
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl Hooks for CurrentStackHooks {
        fn before_run(&self, ctx: &HookContext) -> Result<(), crate::hooks::Error> {
            let current = ctx.store.current_stack().unwrap_or_default().to_string();
            self.seen.lock().unwrap().push(current);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stacks_run_in_declared_order() {
        let workspace = Arc::new(FakeWorkspace::new());
        let hooks = Arc::new(CurrentStackHooks::default());
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                hooks: hooks.clone(),
                ..Default::default()
            },
        );

        for name in ["identity", "cluster", "karpenter"] {
            automation
                .stack_up(name, ProgramArgs::default(), StackUpOptions::default())
                .await
                .unwrap();
            assert_eq!(true, automation.ledger().in_state(LifecycleState::Applying).is_empty());
        }

        assert_eq!(vec!["identity", "cluster", "karpenter"], *hooks.seen.lock().unwrap());
        assert_eq!(Some("karpenter"), automation.store().current_stack());
        assert_eq!(
            vec![
                "select identity",
                "config identity",
                "up identity",
                "select cluster",
                "config cluster",
                "up cluster",
                "select karpenter",
                "config karpenter",
                "up karpenter",
            ],
            workspace.calls()
        );
    }

    #[tokio::test]
    async fn per_stack_config_wins_over_global() {
        let workspace = Arc::new(FakeWorkspace::new());
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                global_config: ConfigMap::new()
                    .with("region", ConfigValue::plain("us-west-1"))
                    .with("custom_domain", ConfigValue::plain("example.com")),
                ..Default::default()
            },
        );

        let program = ProgramArgs {
            plugins: vec![],
            config_map: ConfigMap::new().with("region", ConfigValue::plain("us-east-1")),
        };
        let options = StackUpOptions {
            config_map: ConfigMap::new().with("custom_domain", ConfigValue::plain("acme.io")),
        };
        automation.stack_up("dapr", program, options).await.unwrap();

        let config = workspace.config("dapr").unwrap();
        assert_eq!("us-east-1", config.get("region").unwrap().value);
        assert_eq!("acme.io", config.get("custom_domain").unwrap().value);
        assert_eq!(
            json!({"region": "us-west-1", "custom_domain": "example.com"}),
            *automation.store().get_state(GLOBAL_CONFIG).unwrap()
        );
    }

    #[tokio::test]
    async fn returns_published_outputs() {
        let workspace = Arc::new(
            FakeWorkspace::new().publishes(
                "cluster",
                outputs(&[("kubeconfig", json!("<data>")), ("clusterName", json!("proj-cluster"))]),
            ),
        );
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());

        let result = automation
            .stack_up("cluster", ProgramArgs::default(), StackUpOptions::default())
            .await
            .unwrap();

        assert_eq!(json!("proj-cluster"), result.outputs["clusterName"]);
        assert_eq!(
            json!("<data>"),
            automation.ledger().get("cluster").unwrap().outputs().unwrap()["kubeconfig"]
        );
    }

    #[tokio::test]
    async fn plugins_are_installed_once() {
        let workspace = Arc::new(FakeWorkspace::new());
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());
        let aws = Plugin::resource("aws", "5.0.0");
        let program = ProgramArgs {
            plugins: vec![aws.clone(), aws.clone(), Plugin::resource("kubernetes", "3.21.4")],
            config_map: ConfigMap::new(),
        };

        automation
            .stack_up("cluster", program.clone(), StackUpOptions::default())
            .await
            .unwrap();
        automation
            .stack_up("cluster", program, StackUpOptions::default())
            .await
            .unwrap();

        assert_eq!(1, workspace.count("plugin aws 5.0.0"));
        assert_eq!(1, workspace.count("plugin kubernetes 3.21.4"));
        assert_eq!(2, workspace.count("up cluster"));
    }

    #[tokio::test]
    async fn failed_up_marks_the_stack_failed() {
        let workspace = Arc::new(FakeWorkspace::new().failing("up cert-manager"));
        let progress = Arc::new(RecordingProgress::default());
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                progress: progress.clone(),
                ..Default::default()
            },
        );

        let result = automation
            .stack_up("cert-manager", ProgramArgs::default(), StackUpOptions::default())
            .await;
        assert_eq!(true, result.is_err());

        let error = result.err().unwrap();
        assert_eq!("cert-manager", error.stack);
        assert_eq!(Phase::Up, error.phase);
        assert_eq!(Some(LifecycleState::Failed), automation.ledger().state("cert-manager"));
        assert_eq!(1, progress.failures().len());

        // No automatic retry path: applying a failed stack again is refused.
        let retry = automation
            .stack_up("cert-manager", ProgramArgs::default(), StackUpOptions::default())
            .await;
        match retry.err().unwrap().source {
            Cause::Lifecycle(_) => {}
            _ => panic!("Expected `Lifecycle` error"),
        }
        assert_eq!(1, workspace.count("up cert-manager"));
    }

    #[tokio::test]
    async fn failed_plugin_install_stops_before_config() {
        let workspace = Arc::new(FakeWorkspace::new().failing("plugin aws 5.0.0"));
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());
        let program = ProgramArgs {
            plugins: vec![Plugin::resource("aws", "5.0.0")],
            config_map: ConfigMap::new(),
        };

        let error = automation
            .stack_up("identity", program, StackUpOptions::default())
            .await
            .err()
            .unwrap();

        assert_eq!(Phase::Plugins, error.phase);
        assert_eq!(0, workspace.count("config identity"));
        assert_eq!(0, workspace.count("up identity"));
    }

    #[tokio::test]
    async fn empty_stack_name_is_rejected() {
        let workspace = Arc::new(FakeWorkspace::new());
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());

        let error = automation
            .stack_up(" ", ProgramArgs::default(), StackUpOptions::default())
            .await
            .err()
            .unwrap();

        match error.source {
            Cause::EmptyName => {}
            _ => panic!("Expected `EmptyName` error"),
        }
        assert_eq!(true, workspace.calls().is_empty());
    }

    #[tokio::test]
    async fn destroy_refreshes_first() {
        let workspace = Arc::new(FakeWorkspace::new());
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());

        automation
            .stack_destroy("dapr", StackDestroyOptions { remove: false })
            .await
            .unwrap();

        assert_eq!(vec!["select dapr", "refresh dapr", "destroy dapr"], workspace.calls());
        assert_eq!(Some(LifecycleState::Destroyed), automation.ledger().state("dapr"));
        let current = automation.store().get_state(CURRENT_STACK);
        assert_eq!(Some("dapr"), current.and_then(|value| value.as_str()));
    }

    #[tokio::test]
    async fn destroy_and_remove_twice() {
        let dir = tempdir().unwrap();
        let mirror_dir = dir.path().join("stacks");
        fs::create_dir_all(&mirror_dir).unwrap();
        fs::write(mirror_path(&mirror_dir, "x"), "stack: x\n").unwrap();

        let workspace = Arc::new(FakeWorkspace::new().existing("x", outputs(&[])));
        let hooks = Arc::new(LocalFileHooks {
            project_root: dir.path().to_path_buf(),
            mirror_dir: mirror_dir.clone(),
            development: false,
            use_direnv: false,
        });
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                hooks,
                ..Default::default()
            },
        );

        automation
            .stack_destroy("x", StackDestroyOptions { remove: true })
            .await
            .unwrap();
        assert_eq!(false, mirror_path(&mirror_dir, "x").exists());
        assert_eq!(false, workspace.exists("x"));

        automation
            .stack_destroy("x", StackDestroyOptions { remove: true })
            .await
            .unwrap();
        assert_eq!(2, workspace.count("rm x"));
        assert_eq!(Some(LifecycleState::Destroyed), automation.ledger().state("x"));
    }

    #[tokio::test]
    async fn failed_destroy_can_be_rerun() {
        let workspace = Arc::new(FakeWorkspace::new().failing("refresh emissary"));
        let mut automation = automation(Arc::clone(&workspace), AutomationOptions::default());

        let error = automation
            .stack_destroy("emissary", StackDestroyOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(Phase::Refresh, error.phase);
        assert_eq!(0, workspace.count("destroy emissary"));
        assert_eq!(Some(LifecycleState::Failed), automation.ledger().state("emissary"));

        // Failed -> destroying is allowed; the injected failure still applies.
        let again = automation
            .stack_destroy("emissary", StackDestroyOptions::default())
            .await;
        assert_eq!(Phase::Refresh, again.err().unwrap().phase);
        assert_eq!(2, workspace.count("refresh emissary"));
    }

    #[tokio::test]
    async fn mirrors_config_after_up() {
        let dir = tempdir().unwrap();
        let mirror_dir = dir.path().join("stacks");
        let workspace = Arc::new(FakeWorkspace::new());
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                global_config: ConfigMap::new().with("aws:region", ConfigValue::plain("us-west-1")),
                hooks: Arc::new(LocalFileHooks {
                    project_root: dir.path().to_path_buf(),
                    mirror_dir: mirror_dir.clone(),
                    development: false,
                    use_direnv: false,
                }),
                ..Default::default()
            },
        );

        let program = ProgramArgs {
            plugins: vec![],
            config_map: ConfigMap::new()
                .with("grafana_password", ConfigValue::secret("hunter2hunter2")),
        };
        automation
            .stack_up("kube-prometheus-stack", program, StackUpOptions::default())
            .await
            .unwrap();

        let mirror = mirror_path(&mirror_dir, "kube-prometheus-stack");
        let contents = fs::read_to_string(mirror).unwrap();
        assert_eq!(true, contents.contains("us-west-1"));
        assert_eq!(false, contents.contains("hunter2"));
    }

    #[tokio::test]
    async fn engine_lines_reach_the_sink() {
        let workspace = Arc::new(FakeWorkspace::new());
        let progress = Arc::new(RecordingProgress::default());
        let mut automation = automation(
            Arc::clone(&workspace),
            AutomationOptions {
                progress: progress.clone(),
                ..Default::default()
            },
        );

        automation
            .stack_up("dapr", ProgramArgs::default(), StackUpOptions::default())
            .await
            .unwrap();

        assert_eq!(vec!["Updating (dapr)"], progress.lines());
    }
}
