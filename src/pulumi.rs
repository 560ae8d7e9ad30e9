//! [`Workspace`] backed by the `pulumi` CLI running against a local project
//! directory.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::config_map::ConfigMap;
use crate::stack::StackOutputs;
use crate::workspace::{
    DestroyResult, Error, OutputSink, Plugin, ResourceChanges, StackId, UpResult, Workspace,
};

const MISSING_STACK_MARKERS: [&str; 2] = ["no stack named", "stack not found"];

pub struct PulumiCli {
    binary: PathBuf,
    work_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl PulumiCli {
    pub fn new(work_dir: PathBuf) -> Self {
        return Self {
            binary: PathBuf::from("pulumi"),
            work_dir,
            env: vec![(String::from("PULUMI_SKIP_UPDATE_CHECKS"), String::from("true"))],
        };
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        return self;
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        return self;
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .arg("--non-interactive")
            .current_dir(&self.work_dir)
            .envs(self.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .kill_on_drop(true);
        return command;
    }

    async fn run(&self, args: &[String], command_line: &str) -> Result<String, Error> {
        tracing::debug!(command = %command_line, "running pulumi");

        let output = self.command(args).output().await?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: command_line.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    async fn run_streaming(&self, args: &[String], sink: &dyn OutputSink) -> Result<(), Error> {
        let command_line = format!("pulumi {}", args.join(" "));
        tracing::debug!(command = %command_line, "running pulumi");

        let mut child = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Parse(String::from("stdout was not captured")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Parse(String::from("stderr was not captured")))?;

        let forward = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                sink.line(&line);
            }
            Ok::<(), std::io::Error>(())
        };
        let collect = async {
            let mut buffer = String::new();
            stderr.read_to_string(&mut buffer).await?;
            Ok::<String, std::io::Error>(buffer)
        };

        let (forwarded, collected) = tokio::join!(forward, collect);
        let status = child.wait().await?;
        sink.clear();
        forwarded?;
        let stderr = collected?;

        if !status.success() {
            return Err(Error::CommandFailed {
                command: command_line,
                stderr: stderr.trim().to_string(),
            });
        }

        return Ok(());
    }

    async fn resource_changes(&self, stack: &StackId) -> ResourceChanges {
        let args = strings(&["stack", "history", "--json", "--page-size", "1", "--stack"], stack);
        let history = match self.run(&args, "pulumi stack history").await {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(stack = %stack, %error, "unable to read update summary");
                return ResourceChanges::new();
            }
        };

        match parse_resource_changes(&history) {
            Ok(changes) => changes,
            Err(error) => {
                tracing::warn!(stack = %stack, %error, "unable to parse update summary");
                ResourceChanges::new()
            }
        }
    }
}

#[async_trait]
impl Workspace for PulumiCli {
    async fn create_or_select_stack(&self, stack: &StackId) -> Result<(), Error> {
        let args = strings(&["stack", "select", "--create", "--stack"], stack);
        self.run(&args, &format!("pulumi stack select --create --stack {}", stack))
            .await?;
        return Ok(());
    }

    async fn install_plugin(&self, plugin: &Plugin) -> Result<(), Error> {
        let args = vec![
            String::from("plugin"),
            String::from("install"),
            plugin.kind().to_string(),
            plugin.name.clone(),
            plugin.version.clone(),
        ];
        self.run(&args, &format!("pulumi plugin install {}", plugin)).await?;
        return Ok(());
    }

    async fn set_all_config(&self, stack: &StackId, config: &ConfigMap) -> Result<(), Error> {
        if config.is_empty() {
            return Ok(());
        }

        let mut args = strings(&["config", "set-all", "--stack"], stack);
        args.extend(config_args(config));
        let command_line = format!(
            "pulumi config set-all --stack {} ({} entries)",
            stack,
            config.len()
        );
        self.run(&args, &command_line).await?;
        return Ok(());
    }

    async fn refresh(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<(), Error> {
        let args = strings(&["refresh", "--yes", "--skip-preview", "--stack"], stack);
        return self.run_streaming(&args, sink).await;
    }

    async fn up(&self, stack: &StackId, sink: &dyn OutputSink) -> Result<UpResult, Error> {
        let args = strings(&["up", "--yes", "--skip-preview", "--stack"], stack);
        self.run_streaming(&args, sink).await?;

        let outputs = self
            .stack_outputs(stack)
            .await?
            .ok_or_else(|| Error::StackNotFound(stack.to_string()))?;
        let resource_changes = self.resource_changes(stack).await;

        return Ok(UpResult {
            outputs,
            resource_changes,
        });
    }

    async fn destroy(
        &self,
        stack: &StackId,
        sink: &dyn OutputSink,
    ) -> Result<DestroyResult, Error> {
        let args = strings(&["destroy", "--yes", "--skip-preview", "--stack"], stack);
        self.run_streaming(&args, sink).await?;

        let resource_changes = self.resource_changes(stack).await;
        return Ok(DestroyResult { resource_changes });
    }

    async fn remove_stack(&self, stack: &StackId) -> Result<(), Error> {
        let args = strings(&["stack", "rm", "--yes", "--stack"], stack);
        match self.run(&args, &format!("pulumi stack rm --stack {}", stack)).await {
            Ok(_) => Ok(()),
            Err(Error::CommandFailed { stderr, .. }) if is_missing_stack(&stderr) => {
                tracing::debug!(stack = %stack, "stack record already removed");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn stack_outputs(&self, stack: &StackId) -> Result<Option<StackOutputs>, Error> {
        let args = strings(&["stack", "output", "--json", "--show-secrets", "--stack"], stack);
        let command_line = format!("pulumi stack output --json --stack {}", stack);

        let raw = match self.run(&args, &command_line).await {
            Ok(raw) => raw,
            Err(Error::CommandFailed { stderr, .. }) if is_missing_stack(&stderr) => {
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        return parse_outputs(&raw).map(Some);
    }
}

fn strings(args: &[&str], stack: &StackId) -> Vec<String> {
    let mut owned: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    owned.push(stack.to_string());
    return owned;
}

fn config_args(config: &ConfigMap) -> Vec<String> {
    return config
        .iter()
        .flat_map(|(key, value)| {
            let flag = if value.secret { "--secret" } else { "--plaintext" };
            [flag.to_string(), format!("{}={}", key, value.value)]
        })
        .collect();
}

fn is_missing_stack(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    return MISSING_STACK_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker));
}

fn parse_outputs(raw: &str) -> Result<StackOutputs, Error> {
    if raw.trim().is_empty() {
        return Ok(StackOutputs::new());
    }

    match serde_json::from_str(raw) {
        Ok(outputs) => Ok(outputs),
        Err(error) => Err(Error::Parse(error.to_string())),
    }
}

fn parse_resource_changes(raw: &str) -> Result<ResourceChanges, Error> {
    #[derive(serde::Deserialize)]
    struct Update {
        #[serde(default, rename = "resourceChanges")]
        resource_changes: ResourceChanges,
    }

    let updates: Vec<Update> = match serde_json::from_str(raw) {
        Ok(updates) => updates,
        Err(error) => return Err(Error::Parse(error.to_string())),
    };

    return Ok(updates
        .into_iter()
        .next()
        .map(|update| update.resource_changes)
        .unwrap_or_default());
}
