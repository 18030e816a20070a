//! Typed constructs for declaring the items service and synthesizing it into
//! a CloudFormation template.
//!
//! Constructs register their resources into a [`Stack`] at declaration time.
//! Cross-resource values such as a table's name are [`token::Token`]s that
//! CloudFormation resolves at deploy time.

pub mod apigateway;
pub mod assembly;
pub mod assets;
pub mod config;
pub mod construct;
pub mod dynamodb;
pub mod error;
pub mod iam;
pub mod items_stack;
pub mod lambda;
pub mod stack;
pub mod template;
pub mod token;

pub use error::{InfraError, Result};
pub use items_stack::ItemsStack;
pub use stack::{App, Environment, Stack, StackProps};
pub use template::RemovalPolicy;
