//! Container engine capability boundary
//!
//! Everything above this module talks to the runtime through [`Engine`]; the
//! only production implementation is [`docker::DockerEngine`].

pub mod docker;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::future::Future;
use std::time::Duration;

pub use docker::DockerEngine;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    #[error("no such resource: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{0}")]
    Api(String),
}

/// Raw container record as reported by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
}

/// Raw image record as reported by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSummary {
    pub id: String,
    pub repo_digests: Vec<String>,
    pub repo_tags: Vec<String>,
    pub created: i64,
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    pub running: bool,
}

/// One chunk of pull output. Only its arrival matters to callers.
#[derive(Debug, Clone, Default)]
pub struct PullProgress {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub space_reclaimed: i64,
}

pub type PullStream = BoxStream<'static, Result<PullProgress, EngineError>>;

#[async_trait]
pub trait Engine: Send + Sync {
    async fn ping(&self) -> Result<(), EngineError>;

    /// `ancestor` restricts the listing to containers created from that image
    async fn list_containers(
        &self,
        all: bool,
        ancestor: Option<&str>,
    ) -> Result<Vec<ContainerSummary>, EngineError>;

    async fn start(&self, id: &str) -> Result<(), EngineError>;

    /// `grace` is how long the engine waits before killing the container
    async fn stop(&self, id: &str, grace: Duration) -> Result<(), EngineError>;

    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError>;

    async fn inspect(&self, id: &str) -> Result<RunState, EngineError>;

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError>;

    /// Dropping the returned stream cancels the pull.
    fn pull(&self, name: &str) -> PullStream;

    async fn remove_image(&self, id: &str, prune_children: bool) -> Result<(), EngineError>;

    async fn prune_images(&self) -> Result<PruneReport, EngineError>;
}

/// Run an engine call with a hard upper bound.
pub async fn with_deadline<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout { operation, after }),
    }
}
