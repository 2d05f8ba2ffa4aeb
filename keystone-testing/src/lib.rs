//! Testing utilities for Keystone.
//!
//! Integration tests run against DynamoDB in LocalStack. This crate starts
//! the container, waits for it and provisions session tables.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keystone_testing::LocalStack;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), keystone_testing::DockerError> {
//! let stack = LocalStack::start().await?;
//! stack.create_session_table("Session").await?;
//! println!("DynamoDB at {}", stack.endpoint());
//! # Ok(())
//! # }
//! ```
//!
//! Set `LOCALSTACK_ENDPOINT` to reuse an instance that is already running
//! instead of starting a container.

pub mod docker;
pub mod localstack;

pub use docker::{ContainerConfig, DockerContainer, DockerError, LocalStackContainer, free_port};
pub use localstack::{
    LOCALSTACK_ENDPOINT_ENV, LocalStack, create_session_table, dynamodb_client, wait_until_ready,
};
