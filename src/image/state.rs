use serde::Serialize;

use crate::container::state::SHORT_ID_LEN;
use crate::engine::ImageSummary;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: String,
    pub repo_digests: Vec<String>,
    pub repo_tags: Vec<String>,
    pub created: i64,
    pub size: i64,
    /// The engine no longer reports a separate virtual size; mirrors `size`
    pub virtual_size: i64,
    /// Containers (any state) created from this image
    pub containers: usize,
}

impl ImageView {
    pub fn new(summary: ImageSummary, containers: usize) -> Self {
        Self {
            id: short_image_id(&summary.id),
            repo_digests: summary.repo_digests,
            repo_tags: summary.repo_tags,
            created: summary.created,
            size: summary.size,
            virtual_size: summary.size,
            containers,
        }
    }
}

/// `sha256:<hex>` becomes the first 12 hex characters
pub fn short_image_id(id: &str) -> String {
    let digest = id.strip_prefix("sha256:").unwrap_or(id);
    digest.chars().take(SHORT_ID_LEN).collect()
}
