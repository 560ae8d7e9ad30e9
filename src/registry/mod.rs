//! Provisioning programs, keyed by stack name.
//!
//! A program receives the run [`Settings`] and the stack references it asks
//! for, and returns the plugins and configuration its stack is applied with.

pub mod catalogue;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::automation::ProgramArgs;
use crate::config_map::{ConfigMap, ConfigValue};
use crate::options::{Setting, Settings};
use crate::outputs::{self, StackReference, StackReferences};
use crate::stack::Ledger;
use crate::workspace::Plugin;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Stack '{stack}' requires {setting}")]
    MissingSetting { stack: String, setting: Setting },

    #[error("Stack '{stack}' could not resolve a reference: {source}")]
    Reference { stack: String, source: outputs::Error },

    #[error("No program registered for stacks: {0}")]
    UnknownStacks(String),
}

/// What a program may read while it runs.
pub struct ProgramContext<'a> {
    pub stack_name: &'a str,
    pub settings: &'a Settings,
    references: &'a mut StackReferences,
    ledger: &'a Ledger,
}

impl<'a> ProgramContext<'a> {
    pub fn new(
        stack_name: &'a str,
        settings: &'a Settings,
        references: &'a mut StackReferences,
        ledger: &'a Ledger,
    ) -> Self {
        return Self {
            stack_name,
            settings,
            references,
            ledger,
        };
    }

    pub fn setting(&self, setting: Setting) -> Result<&'a str, Error> {
        match self.settings.get(setting) {
            Some(value) => Ok(value),
            None => Err(Error::MissingSetting {
                stack: self.stack_name.to_string(),
                setting,
            }),
        }
    }

    /// A stack this one cannot be applied without.
    pub async fn reference(&mut self, stack_name: &str) -> Result<Arc<StackReference>, Error> {
        let ledger = self.ledger;
        return self.references
            .resolve(stack_name, ledger)
            .await
            .map_err(|source| Error::Reference {
                stack: self.stack_name.to_string(),
                source,
            });
    }

    /// A stack that may legitimately not exist, e.g. a database that was
    /// never requested.
    pub async fn optional_reference(
        &mut self,
        stack_name: &str,
    ) -> Result<Option<Arc<StackReference>>, Error> {
        let ledger = self.ledger;
        return self.references
            .resolve_optional(stack_name, ledger)
            .await
            .map_err(|source| Error::Reference {
                stack: self.stack_name.to_string(),
                source,
            });
    }
}

#[async_trait]
pub trait Program: Send + Sync {
    /// Settings checked for the whole run before the first stack starts.
    fn required_settings(&self) -> Vec<Setting> {
        return Vec::new();
    }

    fn plugins(&self) -> Vec<Plugin> {
        return Vec::new();
    }

    async fn configure(&self, ctx: &mut ProgramContext<'_>) -> Result<ConfigMap, Error>;
}

/// Copies one upstream output into a config entry.
#[derive(Debug, Clone)]
pub struct OutputBinding {
    pub output: String,
    pub config_key: String,
    pub secret: bool,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub stack: String,
    pub required: bool,
    pub outputs: Vec<OutputBinding>,

    /// Read only when this returns true for the run settings.
    pub condition: Option<fn(&Settings) -> bool>,
}

impl Dependency {
    pub fn required(stack: &str) -> Self {
        return Self {
            stack: stack.to_string(),
            required: true,
            outputs: Vec::new(),
            condition: None,
        };
    }

    pub fn optional(stack: &str) -> Self {
        return Self {
            required: false,
            ..Self::required(stack)
        };
    }

    pub fn output(mut self, output: &str, config_key: &str) -> Self {
        self.outputs.push(OutputBinding {
            output: output.to_string(),
            config_key: config_key.to_string(),
            secret: false,
        });
        return self;
    }

    pub fn only_if(mut self, condition: fn(&Settings) -> bool) -> Self {
        self.condition = Some(condition);
        return self;
    }

    pub fn secret_output(mut self, output: &str, config_key: &str) -> Self {
        self.outputs.push(OutputBinding {
            output: output.to_string(),
            config_key: config_key.to_string(),
            secret: true,
        });
        return self;
    }
}

/// Copies one run setting into a config entry.
#[derive(Debug, Clone)]
pub struct Input {
    pub config_key: String,
    pub setting: Setting,
    pub required: bool,
}

/// A program described by its plugins, inputs, dependencies and constants.
#[derive(Debug, Clone, Default)]
pub struct StackProgram {
    plugins: Vec<Plugin>,
    inputs: Vec<Input>,
    dependencies: Vec<Dependency>,
    constants: ConfigMap,
}

impl StackProgram {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        return self;
    }

    pub fn input(mut self, config_key: &str, setting: Setting) -> Self {
        self.inputs.push(Input {
            config_key: config_key.to_string(),
            setting,
            required: true,
        });
        return self;
    }

    pub fn optional_input(mut self, config_key: &str, setting: Setting) -> Self {
        self.inputs.push(Input {
            config_key: config_key.to_string(),
            setting,
            required: false,
        });
        return self;
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        return self;
    }

    pub fn constant(mut self, config_key: &str, value: &str) -> Self {
        self.constants.insert(config_key, ConfigValue::plain(value));
        return self;
    }
}

#[async_trait]
impl Program for StackProgram {
    fn required_settings(&self) -> Vec<Setting> {
        return self.inputs
            .iter()
            .filter(|input| input.required)
            .map(|input| input.setting)
            .collect();
    }

    fn plugins(&self) -> Vec<Plugin> {
        return self.plugins.clone();
    }

    async fn configure(&self, ctx: &mut ProgramContext<'_>) -> Result<ConfigMap, Error> {
        let mut config_map = self.constants.clone();

        for input in &self.inputs {
            let value = match ctx.settings.get(input.setting) {
                Some(value) => value,
                None if input.required => {
                    return Err(Error::MissingSetting {
                        stack: ctx.stack_name.to_string(),
                        setting: input.setting,
                    })
                }
                None => continue,
            };
            let value = match input.setting.is_secret() {
                true => ConfigValue::secret(value),
                false => ConfigValue::plain(value),
            };
            config_map.insert(input.config_key.as_str(), value);
        }

        for dependency in &self.dependencies {
            if let Some(condition) = dependency.condition {
                if !condition(ctx.settings) {
                    continue;
                }
            }

            let reference = match dependency.required {
                true => ctx.reference(&dependency.stack).await?,
                false => match ctx.optional_reference(&dependency.stack).await? {
                    // A stack record left behind by a destroy without
                    // `remove` has no outputs; it counts as absent.
                    Some(reference) if !reference.outputs().is_empty() => reference,
                    _ => {
                        tracing::debug!(
                            stack = ctx.stack_name,
                            dependency = %dependency.stack,
                            "optional dependency not applied, skipping its outputs"
                        );
                        continue;
                    }
                },
            };

            for binding in &dependency.outputs {
                let output = reference
                    .get_output(&binding.output)
                    .map_err(|source| Error::Reference {
                        stack: ctx.stack_name.to_string(),
                        source,
                    })?;
                config_map.insert(
                    binding.config_key.as_str(),
                    ConfigValue::from_output(output, binding.secret),
                );
            }
        }

        return Ok(config_map);
    }
}

/// Used for stack names nothing is registered for.
fn fallback(ctx: &ProgramContext<'_>) -> ConfigMap {
    return ConfigMap::new()
        .with("project", ConfigValue::plain(ctx.settings.project.as_str()))
        .with("stack", ConfigValue::plain(ctx.stack_name));
}

#[derive(Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, Arc<dyn Program>>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn register(&mut self, stack_name: &str, program: impl Program + 'static) {
        self.programs.insert(stack_name.to_string(), Arc::new(program));
    }

    pub fn get(&self, stack_name: &str) -> Option<Arc<dyn Program>> {
        return self.programs.get(stack_name).cloned();
    }

    /// Fails with every name in `stack_names` that has no program.
    pub fn validate<S: AsRef<str>>(&self, stack_names: &[S]) -> Result<(), Error> {
        let unknown: Vec<&str> = stack_names
            .iter()
            .map(|name| AsRef::<str>::as_ref(name))
            .filter(|name| !self.programs.contains_key(*name))
            .collect();

        if !unknown.is_empty() {
            return Err(Error::UnknownStacks(unknown.join(", ")));
        }

        return Ok(());
    }

    /// Runs the program registered for `ctx.stack_name`. An unregistered name
    /// yields the default `{project, stack}` config and no plugins.
    pub async fn dispatch(&self, ctx: &mut ProgramContext<'_>) -> Result<ProgramArgs, Error> {
        let program = match self.get(ctx.stack_name) {
            Some(program) => program,
            None => {
                tracing::debug!(stack = ctx.stack_name, "no program registered, using the default");
                return Ok(ProgramArgs {
                    plugins: Vec::new(),
                    config_map: fallback(ctx),
                });
            }
        };

        let config_map = program.configure(ctx).await?;
        return Ok(ProgramArgs {
            plugins: program.plugins(),
            config_map,
        });
    }
}
