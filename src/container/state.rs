use serde::Serialize;

use crate::engine::ContainerSummary;

/// Short ids are the first 12 characters of the engine id
pub const SHORT_ID_LEN: usize = 12;

/// Container as shown to dashboard clients. Always derived fresh from the engine.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContainerView {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
}

impl From<ContainerSummary> for ContainerView {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: short_id(&summary.id),
            names: summary.names,
            image: summary.image,
            state: summary.state,
            status: summary.status,
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_truncates_the_engine_id() {
        let view = ContainerView::from(ContainerSummary {
            id: "abc123def456789000".to_string(),
            names: vec!["/web".to_string()],
            image: "nginx:latest".to_string(),
            state: "running".to_string(),
            status: "Up 3 hours".to_string(),
        });

        assert_eq!(view.id, "abc123def456");
        assert_eq!(view.names, vec!["/web"]);
    }

    #[test]
    fn short_ids_are_left_alone() {
        assert_eq!(short_id("abc123"), "abc123");
    }
}
