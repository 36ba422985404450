use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{CreateImageOptions, ListImagesOptions, PruneImagesOptions, RemoveImageOptions};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

use super::{
    ContainerSummary, Engine, EngineError, ImageSummary, PruneReport, PullProgress, PullStream,
    RunState,
};

/// Seconds bollard waits on a single request before giving up
const CLIENT_TIMEOUT_SECS: u64 = 120;

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect to `socket_path`, or to bollard's local defaults when it is empty.
    /// Nothing is sent to the daemon until the first call.
    pub fn connect(socket_path: &str) -> Result<Self, EngineError> {
        let docker = if socket_path.is_empty() {
            Docker::connect_with_local_defaults()
        } else {
            Docker::connect_with_socket(
                socket_path,
                CLIENT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        }
        .map_err(|e| EngineError::Unreachable(e.to_string()))?;

        Ok(Self { docker })
    }
}

fn map_error(e: BollardError) -> EngineError {
    match e {
        BollardError::DockerResponseServerError { status_code, message } => match status_code {
            404 => EngineError::NotFound(message),
            409 => EngineError::Conflict(message),
            _ => EngineError::Api(message),
        },
        BollardError::IOError { err } => EngineError::Unreachable(err.to_string()),
        BollardError::SocketNotFoundError(path) => {
            EngineError::Unreachable(format!("socket not found: {}", path))
        }
        other => EngineError::Api(other.to_string()),
    }
}

/// Split `name` into repository and tag. An untagged reference means `latest`;
/// digest references are passed through whole with an empty tag.
fn split_reference(name: &str) -> (String, String) {
    if name.contains('@') {
        return (name.to_string(), String::new());
    }
    let last_segment = name.rsplit('/').next().unwrap_or(name);
    match last_segment.rfind(':') {
        Some(pos) => {
            let split_at = name.len() - last_segment.len() + pos;
            (name[..split_at].to_string(), name[split_at + 1..].to_string())
        }
        None => (name.to_string(), "latest".to_string()),
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker.ping().await.map_err(map_error)?;
        Ok(())
    }

    async fn list_containers(
        &self,
        all: bool,
        ancestor: Option<&str>,
    ) -> Result<Vec<ContainerSummary>, EngineError> {
        let mut filters = HashMap::new();
        if let Some(image) = ancestor {
            filters.insert("ancestor".to_string(), vec![image.to_string()]);
        }
        let options = ListContainersOptions::<String> {
            all,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_error)?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
            })
            .collect())
    }

    async fn start(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_error)
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<(), EngineError> {
        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: grace.as_secs() as i64,
                }),
            )
            .await
            .map_err(map_error)
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_error)
    }

    async fn inspect(&self, id: &str) -> Result<RunState, EngineError> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        let running = info
            .state
            .and_then(|state| state.running)
            .unwrap_or(false);

        Ok(RunState { running })
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        let options = ListImagesOptions::<String> {
            all: true,
            ..Default::default()
        };

        let images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(map_error)?;

        Ok(images
            .into_iter()
            .map(|img| ImageSummary {
                id: img.id,
                repo_digests: img.repo_digests,
                repo_tags: img.repo_tags,
                created: img.created,
                size: img.size,
            })
            .collect())
    }

    fn pull(&self, name: &str) -> PullStream {
        let (from_image, tag) = split_reference(name);
        let options = CreateImageOptions::<String> {
            from_image,
            tag,
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .map(|item| {
                item.map(|info| PullProgress { status: info.status })
                    .map_err(map_error)
            })
            .boxed()
    }

    async fn remove_image(&self, id: &str, prune_children: bool) -> Result<(), EngineError> {
        let options = RemoveImageOptions {
            force: false,
            noprune: !prune_children,
        };

        self.docker
            .remove_image(id, Some(options), None)
            .await
            .map_err(map_error)?;

        Ok(())
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        let report = self
            .docker
            .prune_images(Some(PruneImagesOptions::<String> {
                filters: HashMap::new(),
            }))
            .await
            .map_err(map_error)?;

        let deleted = report
            .images_deleted
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.deleted.or(item.untagged))
            .collect();

        Ok(PruneReport {
            deleted,
            space_reclaimed: report.space_reclaimed.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_map_by_status_code() {
        let not_found = map_error(BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".to_string(),
        });
        assert!(matches!(not_found, EngineError::NotFound(m) if m.contains("abc")));

        let conflict = map_error(BollardError::DockerResponseServerError {
            status_code: 409,
            message: "image is being used".to_string(),
        });
        assert!(matches!(conflict, EngineError::Conflict(_)));

        let other = map_error(BollardError::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_string(),
        });
        assert!(matches!(other, EngineError::Api(m) if m == "boom"));
    }

    #[test]
    fn references_default_to_latest() {
        assert_eq!(split_reference("nginx"), ("nginx".into(), "latest".into()));
        assert_eq!(split_reference("nginx:1.25"), ("nginx".into(), "1.25".into()));
        assert_eq!(
            split_reference("localhost:5000/team/app"),
            ("localhost:5000/team/app".into(), "latest".into())
        );
        assert_eq!(
            split_reference("localhost:5000/team/app:v2"),
            ("localhost:5000/team/app".into(), "v2".into())
        );
        assert_eq!(
            split_reference("alpine@sha256:abcd"),
            ("alpine@sha256:abcd".into(), String::new())
        );
    }
}
