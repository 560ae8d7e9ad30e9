//! Provisions an EKS cluster and the stacks that run on it by driving Pulumi
//! stacks one after another.

pub mod automation;
pub mod aws;
pub mod config;
pub mod config_map;
pub mod hooks;
pub mod options;
pub mod outputs;
pub mod plan;
pub mod progress;
pub mod pulumi;
pub mod registry;
pub mod run;
pub mod stack;
pub mod store;
pub mod workspace;
pub mod writer;

#[cfg(test)]
mod testing;
