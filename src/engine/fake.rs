//! In-memory engine used by unit tests

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::{
    ContainerSummary, Engine, EngineError, ImageSummary, PruneReport, PullProgress, PullStream,
    RunState,
};

#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<String>>,
    containers: Mutex<Vec<ContainerSummary>>,
    images: Mutex<Vec<ImageSummary>>,
    /// image id -> containers created from it
    ancestors: Mutex<HashMap<String, Vec<ContainerSummary>>>,
    running: Mutex<HashSet<String>>,
    /// operation name -> error returned by that operation
    failures: Mutex<HashMap<&'static str, EngineError>>,
    /// operations that never complete
    hangs: Mutex<HashSet<&'static str>>,
    failing_lists: AtomicUsize,
    /// offsets from the first poll at which pull chunks arrive
    pull_chunks: Mutex<Vec<Duration>>,
    pull_error: Mutex<Option<EngineError>>,
    prune_report: Mutex<PruneReport>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, running: bool) -> Self {
        self.containers.lock().unwrap().push(ContainerSummary {
            id: id.to_string(),
            names: vec![format!("/{}", id)],
            image: "nginx:latest".to_string(),
            state: if running { "running" } else { "exited" }.to_string(),
            status: if running { "Up 2 minutes" } else { "Exited (0)" }.to_string(),
        });
        if running {
            self.running.lock().unwrap().insert(id.to_string());
        }
        self
    }

    pub fn with_image(self, id: &str, tags: &[&str]) -> Self {
        self.images.lock().unwrap().push(ImageSummary {
            id: id.to_string(),
            repo_tags: tags.iter().map(|t| t.to_string()).collect(),
            created: 1_700_000_000,
            size: 1024,
            ..Default::default()
        });
        self
    }

    pub fn with_ancestor(self, image_id: &str, container_id: &str) -> Self {
        self.ancestors
            .lock()
            .unwrap()
            .entry(image_id.to_string())
            .or_default()
            .push(ContainerSummary {
                id: container_id.to_string(),
                ..Default::default()
            });
        self
    }

    pub fn failing(self, operation: &'static str, error: EngineError) -> Self {
        self.failures.lock().unwrap().insert(operation, error);
        self
    }

    pub fn hanging(self, operation: &'static str) -> Self {
        self.hangs.lock().unwrap().insert(operation);
        self
    }

    pub fn with_pull_chunks(self, offsets_ms: &[u64]) -> Self {
        *self.pull_chunks.lock().unwrap() =
            offsets_ms.iter().map(|ms| Duration::from_millis(*ms)).collect();
        self
    }

    pub fn with_pull_error(self, error: EngineError) -> Self {
        *self.pull_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_prune_report(self, report: PruneReport) -> Self {
        *self.prune_report.lock().unwrap() = report;
        self
    }

    /// Make the next `count` container listings fail
    pub fn fail_next_lists(&self, count: usize) {
        self.failing_lists.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn outcome(&self, operation: &'static str) -> Result<(), EngineError> {
        let hangs = self.hangs.lock().unwrap().contains(operation);
        if hangs {
            futures::future::pending::<()>().await;
        }
        let failure = self.failures.lock().unwrap().get(operation).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.record("ping".to_string());
        self.outcome("ping").await
    }

    async fn list_containers(
        &self,
        all: bool,
        ancestor: Option<&str>,
    ) -> Result<Vec<ContainerSummary>, EngineError> {
        match ancestor {
            Some(image) => self.record(format!("list_containers:ancestor={}", image)),
            None => self.record(format!("list_containers:all={}", all)),
        }
        let pending_failures = self.failing_lists.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.failing_lists.store(pending_failures - 1, Ordering::SeqCst);
            return Err(EngineError::Unreachable("connection refused".to_string()));
        }
        self.outcome("list_containers").await?;

        Ok(match ancestor {
            Some(image) => self
                .ancestors
                .lock()
                .unwrap()
                .get(image)
                .cloned()
                .unwrap_or_default(),
            None => self.containers.lock().unwrap().clone(),
        })
    }

    async fn start(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("start:{}", id));
        self.outcome("start").await?;
        self.running.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<(), EngineError> {
        self.record(format!("stop:{}:{}", id, grace.as_secs()));
        self.outcome("stop").await?;
        self.running.lock().unwrap().remove(id);
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.record(format!("remove:{}:force={}", id, force));
        self.outcome("remove").await
    }

    async fn inspect(&self, id: &str) -> Result<RunState, EngineError> {
        self.record(format!("inspect:{}", id));
        self.outcome("inspect").await?;
        Ok(RunState {
            running: self.running.lock().unwrap().contains(id),
        })
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        self.record("list_images".to_string());
        self.outcome("list_images").await?;
        Ok(self.images.lock().unwrap().clone())
    }

    fn pull(&self, name: &str) -> PullStream {
        self.record(format!("pull:{}", name));
        let chunks = self.pull_chunks.lock().unwrap().clone();
        let error = self.pull_error.lock().unwrap().clone();

        futures::stream::unfold(
            (chunks.into_iter(), error, None::<Instant>),
            |(mut chunks, mut error, started)| async move {
                let started = started.unwrap_or_else(Instant::now);
                match chunks.next() {
                    Some(offset) => {
                        tokio::time::sleep_until(started + offset).await;
                        let progress = PullProgress {
                            status: Some("Downloading".to_string()),
                        };
                        Some((Ok(progress), (chunks, error, Some(started))))
                    }
                    None => error
                        .take()
                        .map(|err| (Err(err), (chunks, None, Some(started)))),
                }
            },
        )
        .boxed()
    }

    async fn remove_image(&self, id: &str, prune_children: bool) -> Result<(), EngineError> {
        self.record(format!("remove_image:{}:prune={}", id, prune_children));
        self.outcome("remove_image").await
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        self.record("prune_images".to_string());
        self.outcome("prune_images").await?;
        Ok(self.prune_report.lock().unwrap().clone())
    }
}
