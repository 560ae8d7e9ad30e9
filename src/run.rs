//! Run controller: executes a plan one stack at a time and stops at the first
//! failure.

use serde_json::json;

use crate::automation::{self, Automation, StackDestroyOptions, StackUpOptions};
use crate::options::Settings;
use crate::outputs::StackReferences;
use crate::plan::{RunPlan, Step};
use crate::registry::{self, ProgramContext, ProgramRegistry};
use crate::stack::Operation;
use crate::store::CLI_OPTIONS;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing settings: {0}")]
    MissingSettings(String),

    #[error(transparent)]
    Program(#[from] registry::Error),

    #[error(transparent)]
    Engine(#[from] automation::Error),
}

impl Error {
    /// The stack the run stopped at, when there is one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Error::MissingSettings(_) => None,
            Error::Program(registry::Error::MissingSetting { stack, .. }) => Some(stack.as_str()),
            Error::Program(registry::Error::Reference { stack, .. }) => Some(stack.as_str()),
            Error::Program(registry::Error::UnknownStacks(_)) => None,
            Error::Engine(error) => Some(error.stack.as_str()),
        }
    }
}

pub struct Runner {
    automation: Automation,
    registry: ProgramRegistry,
    references: StackReferences,
    settings: Settings,
}

impl Runner {
    pub fn new(automation: Automation, registry: ProgramRegistry, settings: Settings) -> Self {
        let references = StackReferences::new(
            automation.workspace(),
            settings.organization.clone(),
            settings.project.clone(),
        );

        return Self {
            automation,
            registry,
            references,
            settings,
        };
    }

    pub fn automation(&self) -> &Automation {
        return &self.automation;
    }

    /// Checks every stack of the plan has a program and every setting its
    /// program requires, before anything runs.
    pub fn preflight(&self, plan: &RunPlan) -> Result<(), Error> {
        self.registry.validate(&plan.stack_names())?;

        let mut missing = Vec::new();
        for step in plan.steps().iter().filter(|step| step.operation == Operation::Up) {
            let program = match self.registry.get(&step.stack) {
                Some(program) => program,
                None => continue,
            };

            for setting in program.required_settings() {
                if self.settings.get(setting).is_none() {
                    missing.push(format!("{} ({})", setting, step.stack));
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingSettings(missing.join(", ")));
        }

        return Ok(());
    }

    /// Returns the steps that completed, which is every step on success.
    pub async fn run(&mut self, plan: &RunPlan) -> Result<Vec<Step>, Error> {
        self.preflight(plan)?;
        self.automation.store_mut().set_state(
            CLI_OPTIONS,
            json!({
                "command": plan.command,
                "stacks": plan.stack_names(),
                "remove": plan.remove,
            }),
        );
        tracing::info!(command = %plan.command, stacks = plan.steps().len(), "starting run");

        let mut completed = Vec::new();
        for step in plan.steps() {
            match step.operation {
                Operation::Up => self.up(&step.stack).await?,
                Operation::Destroy => {
                    self.automation
                        .stack_destroy(&step.stack, StackDestroyOptions { remove: plan.remove })
                        .await?;
                }
            }

            // A cached reference would otherwise serve outputs from before
            // this step.
            self.references.forget(&step.stack);
            completed.push(step.clone());
        }

        tracing::info!(command = %plan.command, "run finished");
        return Ok(completed);
    }

    async fn up(&mut self, stack_name: &str) -> Result<(), Error> {
        let program = {
            let mut ctx = ProgramContext::new(
                stack_name,
                &self.settings,
                &mut self.references,
                self.automation.ledger(),
            );
            self.registry.dispatch(&mut ctx).await?
        };

        self.automation
            .stack_up(stack_name, program, StackUpOptions::default())
            .await?;

        return Ok(());
    }
}
