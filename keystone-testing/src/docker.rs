//! Docker Test Containers
//!
//! Runs throwaway containers through the Docker CLI and removes them when the
//! handle is dropped. Dropping only launches `docker stop` and returns; call
//! [`DockerContainer::stop`] to wait for the container to go away.

use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Docker test container errors
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("Docker not available: {0}")]
    NotAvailable(String),

    #[error("Container start failed: {0}")]
    StartFailed(String),

    #[error("Container stop failed: {0}")]
    StopFailed(String),

    #[error("Image pull failed: {0}")]
    PullFailed(String),

    #[error("Container not ready after {0} seconds")]
    NotReady(u64),

    #[error("Table provisioning failed: {0}")]
    Provision(String),

    #[error("AWS client configuration failed: {0}")]
    Client(String),
}

/// Docker container configuration
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Docker image
    pub image: String,

    /// Image tag
    pub tag: String,

    /// Container name
    pub name: Option<String>,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// Port mappings (host_port -> container_port)
    pub ports: HashMap<u16, u16>,

    /// How long to wait for the container to accept requests
    pub wait_timeout_secs: u64,
}

impl ContainerConfig {
    /// Create new container config
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_testing::docker::ContainerConfig;
    ///
    /// let config = ContainerConfig::new("localstack/localstack", "3");
    /// assert_eq!(config.image_name(), "localstack/localstack:3");
    /// ```
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
            name: None,
            env: HashMap::new(),
            ports: HashMap::new(),
            wait_timeout_secs: 30,
        }
    }

    /// Set container name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add port mapping
    pub fn with_port(mut self, host_port: u16, container_port: u16) -> Self {
        self.ports.insert(host_port, container_port);
        self
    }

    /// Set wait timeout
    pub fn with_wait_timeout(mut self, seconds: u64) -> Self {
        self.wait_timeout_secs = seconds;
        self
    }

    /// Get full image name
    pub fn image_name(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Host port mapped to `container_port`.
    pub fn host_port(&self, container_port: u16) -> Option<u16> {
        self.ports
            .iter()
            .find(|(_, c)| **c == container_port)
            .map(|(h, _)| *h)
    }

    /// `docker run` arguments for this configuration.
    fn run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string(), "--rm".to_string()];

        if let Some(name) = &self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }

        let mut env: Vec<_> = self.env.iter().collect();
        env.sort();
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        let mut ports: Vec<_> = self.ports.iter().collect();
        ports.sort();
        for (host_port, container_port) in ports {
            args.push("-p".to_string());
            args.push(format!("127.0.0.1:{}:{}", host_port, container_port));
        }

        args.push(self.image_name());
        args
    }
}

/// Docker test container
pub struct DockerContainer {
    config: ContainerConfig,
    container_id: Option<String>,
}

impl DockerContainer {
    /// Create new Docker container
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            container_id: None,
        }
    }

    /// Check if Docker is available
    pub fn is_docker_available() -> bool {
        Command::new("docker")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Start container
    pub fn start(&mut self) -> Result<(), DockerError> {
        if !Self::is_docker_available() {
            return Err(DockerError::NotAvailable(
                "Docker not found. Please install Docker.".to_string(),
            ));
        }

        self.pull_image()?;

        let output = Command::new("docker")
            .args(self.config.run_args())
            .output()
            .map_err(|e| DockerError::StartFailed(e.to_string()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(DockerError::StartFailed(error.to_string()));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        self.container_id = Some(container_id);

        Ok(())
    }

    /// Stop container and wait for `docker stop` to finish.
    ///
    /// This blocks the calling thread; from async code run it through
    /// `tokio::task::spawn_blocking`.
    pub fn stop(&mut self) -> Result<(), DockerError> {
        if let Some(ref container_id) = self.container_id {
            let output = stop_command(container_id)
                .output()
                .map_err(|e| DockerError::StopFailed(e.to_string()))?;

            if !output.status.success() {
                let error = String::from_utf8_lossy(&output.stderr);
                return Err(DockerError::StopFailed(error.to_string()));
            }

            self.container_id = None;
        }

        Ok(())
    }

    /// Pull Docker image
    fn pull_image(&self) -> Result<(), DockerError> {
        let output = Command::new("docker")
            .arg("pull")
            .arg(self.config.image_name())
            .output()
            .map_err(|e| DockerError::PullFailed(e.to_string()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(DockerError::PullFailed(error.to_string()));
        }

        Ok(())
    }

    /// Get container configuration
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Get container ID
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }
}

impl Drop for DockerContainer {
    fn drop(&mut self) {
        // Handles are often dropped on a runtime worker, so never wait here.
        // `--rm` removes the container once the detached stop completes.
        if let Some(container_id) = self.container_id.take() {
            let _ = stop_command(&container_id)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
        }
    }
}

fn stop_command(container_id: &str) -> Command {
    let mut command = Command::new("docker");
    command.arg("stop").arg(container_id);
    command
}

/// LocalStack test container helper
pub struct LocalStackContainer;

impl LocalStackContainer {
    /// Port of LocalStack's edge service inside the container.
    pub const EDGE_PORT: u16 = 4566;

    /// LocalStack configured for DynamoDB only, published on `host_port`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_testing::docker::LocalStackContainer;
    ///
    /// let config = LocalStackContainer::config(45660);
    /// assert_eq!(config.host_port(4566), Some(45660));
    /// ```
    pub fn config(host_port: u16) -> ContainerConfig {
        ContainerConfig::new("localstack/localstack", "latest")
            .with_name(format!("keystone-test-localstack-{}", uuid::Uuid::new_v4()))
            .with_env("SERVICES", "dynamodb")
            .with_port(host_port, Self::EDGE_PORT)
            .with_wait_timeout(60)
    }
}

/// Ask the OS for a currently unused local TCP port.
pub fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
