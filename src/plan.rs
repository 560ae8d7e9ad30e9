//! Ordered stack operations for one command.

use std::collections::HashSet;

use crate::registry::catalogue::{
    APP_BUILD, APP_NS, APP_PROD, APP_STAGING, CERT_MANAGER, CLUSTER, DAPR, DB_PROD, DB_STAGING,
    EMISSARY, GRAFANA_DASHBOARD, IDENTITY, KARPENTER, KUBE_PROMETHEUS_STACK,
};
use crate::stack::Operation;

/// Kept by `destroy --keep-cluster`.
pub const CLUSTER_STACKS: [&str; 3] = [IDENTITY, CLUSTER, KARPENTER];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Stack {0} appears more than once in the run")]
    DuplicateStack(String),

    #[error("Stack names must not be empty")]
    EmptyStackName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub stack: String,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub command: String,

    /// Destroy steps also remove the stack record and its mirror.
    pub remove: bool,

    steps: Vec<Step>,
}

impl RunPlan {
    /// Stacks are applied in the given order.
    pub fn up(command: &str, stacks: Vec<String>) -> Result<Self, Error> {
        return RunPlan::new(command, stacks, Operation::Up, false);
    }

    /// Stacks are destroyed in the given order, which callers take from
    /// [`destroy_stacks`].
    pub fn destroy(command: &str, stacks: Vec<String>, remove: bool) -> Result<Self, Error> {
        return RunPlan::new(command, stacks, Operation::Destroy, remove);
    }

    fn new(
        command: &str,
        stacks: Vec<String>,
        operation: Operation,
        remove: bool,
    ) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for stack in &stacks {
            if stack.trim().is_empty() {
                return Err(Error::EmptyStackName);
            }
            if !seen.insert(stack.as_str()) {
                return Err(Error::DuplicateStack(stack.clone()));
            }
        }

        let steps = stacks
            .into_iter()
            .map(|stack| Step { stack, operation })
            .collect();

        return Ok(RunPlan {
            command: command.to_string(),
            remove,
            steps,
        });
    }

    pub fn steps(&self) -> &[Step] {
        return &self.steps;
    }

    pub fn stack_names(&self) -> Vec<&str> {
        return self.steps.iter().map(|step| step.stack.as_str()).collect();
    }
}

fn owned(stacks: &[&str]) -> Vec<String> {
    return stacks.iter().map(|stack| stack.to_string()).collect();
}

pub fn init_stacks() -> Vec<String> {
    return owned(&[
        IDENTITY,
        CLUSTER,
        KARPENTER,
        CERT_MANAGER,
        EMISSARY,
        DAPR,
        KUBE_PROMETHEUS_STACK,
        GRAFANA_DASHBOARD,
    ]);
}

/// `app-build` only with `build`, the database stacks only with `create_db`.
pub fn app_stacks(build: bool, create_db: bool) -> Vec<String> {
    let mut stacks = Vec::new();
    if build {
        stacks.push(APP_BUILD);
    }
    stacks.push(APP_NS);
    if create_db {
        stacks.push(DB_STAGING);
    }
    stacks.push(APP_STAGING);
    if create_db {
        stacks.push(DB_PROD);
    }
    stacks.push(APP_PROD);

    return owned(&stacks);
}

/// The configured `init` list, or the default one when none is configured.
pub fn configured_init_stacks(configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        return init_stacks();
    }

    return configured.to_vec();
}

/// Everything `init` (as configured) and `app` can create, newest first.
pub fn destroy_stacks(init: Vec<String>, keep_cluster: bool) -> Vec<String> {
    let mut stacks = init;
    for stack in app_stacks(true, true) {
        if !stacks.contains(&stack) {
            stacks.push(stack);
        }
    }
    stacks.reverse();

    if keep_cluster {
        stacks.retain(|stack| !CLUSTER_STACKS.contains(&stack.as_str()));
    }

    return stacks;
}

#[cfg(test)]
mod tests {
    use super::{app_stacks, configured_init_stacks, destroy_stacks, init_stacks, Error, RunPlan};
    use crate::stack::Operation;

    fn position(stacks: &[String], name: &str) -> usize {
        stacks.iter().position(|stack| stack == name).unwrap()
    }

    #[test]
    fn init_order() {
        assert_eq!(
            vec![
                "identity",
                "cluster",
                "karpenter",
                "cert-manager",
                "emissary",
                "dapr",
                "kube-prometheus-stack",
                "grafana-dashboard"
            ],
            init_stacks()
        );
    }

    #[test]
    fn app_order_with_optional_stacks() {
        assert_eq!(vec!["app-ns", "app-staging", "app-prod"], app_stacks(false, false));
        assert_eq!(
            vec!["app-build", "app-ns", "db-staging", "app-staging", "db-prod", "app-prod"],
            app_stacks(true, true)
        );
    }

    #[test]
    fn destroy_reverses_dependency_order() {
        let stacks = destroy_stacks(init_stacks(), false);

        assert_eq!("app-prod", stacks[0]);
        assert_eq!("identity", stacks[stacks.len() - 1]);
        assert_eq!(true, position(&stacks, "db-prod") > position(&stacks, "app-prod"));
        assert_eq!(true, position(&stacks, "cluster") > position(&stacks, "cert-manager"));
    }

    #[test]
    fn keep_cluster_excludes_base_stacks() {
        let stacks = destroy_stacks(init_stacks(), true);

        for kept in ["cluster", "identity", "karpenter"] {
            assert_eq!(false, stacks.iter().any(|stack| stack == kept));
        }
        for destroyed in ["app-staging", "app-prod", "cert-manager", "dapr"] {
            assert_eq!(true, stacks.iter().any(|stack| stack == destroyed));
        }
        assert_eq!(true, position(&stacks, "app-staging") < position(&stacks, "cert-manager"));
        assert_eq!("cert-manager", stacks[stacks.len() - 1]);
    }

    #[test]
    fn destroy_covers_a_configured_init_list() {
        let init = configured_init_stacks(&[
            String::from("identity"),
            String::from("cluster"),
            String::from("cluster-autoscaler"),
        ]);

        let stacks = destroy_stacks(init, false);

        assert_eq!(true, stacks.iter().any(|stack| stack == "cluster-autoscaler"));
        assert_eq!(true, position(&stacks, "cluster-autoscaler") < position(&stacks, "cluster"));
        assert_eq!(false, stacks.iter().any(|stack| stack == "dapr"));
        assert_eq!("identity", stacks[stacks.len() - 1]);
    }

    #[test]
    fn configured_list_overlapping_app_stacks_has_no_duplicates() {
        let init = vec![String::from("cluster"), String::from("app-ns")];

        let stacks = destroy_stacks(init, false);

        assert_eq!(1, stacks.iter().filter(|stack| *stack == "app-ns").count());
        assert_eq!(true, RunPlan::destroy("destroy", stacks, false).is_ok());
    }

    #[test]
    fn empty_configured_list_means_the_default() {
        assert_eq!(init_stacks(), configured_init_stacks(&[]));
    }

    #[test]
    fn plan_rejects_duplicates() {
        let result = RunPlan::up("init", vec![String::from("dapr"), String::from("dapr")]);

        assert_eq!(Err(Error::DuplicateStack(String::from("dapr"))), result);
    }

    #[test]
    fn plan_rejects_empty_names() {
        let result = RunPlan::destroy("destroy", vec![String::new()], false);

        assert_eq!(Err(Error::EmptyStackName), result);
    }

    #[test]
    fn plan_steps_carry_the_operation() {
        let stacks = destroy_stacks(init_stacks(), true);
        let plan = RunPlan::destroy("destroy", stacks.clone(), true).unwrap();

        assert_eq!(true, plan.remove);
        assert_eq!(true, plan.steps().iter().all(|step| step.operation == Operation::Destroy));
        assert_eq!(stacks, plan.stack_names());
    }
}
