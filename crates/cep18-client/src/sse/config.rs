use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ListenerConfigError {
    #[error("missing SSE endpoint URL")]
    MissingEndpoint,
    #[error("invalid SSE endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Where to connect and, optionally, where to persist the id of the last event seen.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    endpoint: Url,
    resume_path: Option<PathBuf>,
}

impl ListenerConfig {
    pub fn builder() -> ListenerConfigBuilder {
        ListenerConfigBuilder::new()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// File holding the last event id. When it exists the stream resumes after that event.
    pub fn resume_path(&self) -> Option<&Path> {
        self.resume_path.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct ListenerConfigBuilder {
    endpoint: Option<String>,
    resume_path: Option<PathBuf>,
}

impl ListenerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_resume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ListenerConfig, ListenerConfigError> {
        let endpoint = self
            .endpoint
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ListenerConfigError::MissingEndpoint)?;

        Ok(ListenerConfig {
            endpoint: Url::parse(&endpoint)?,
            resume_path: self.resume_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_endpoint() {
        assert!(matches!(
            ListenerConfig::builder().build(),
            Err(ListenerConfigError::MissingEndpoint)
        ));
        assert!(matches!(
            ListenerConfig::builder().with_endpoint("  ").build(),
            Err(ListenerConfigError::MissingEndpoint)
        ));
        assert!(matches!(
            ListenerConfig::builder().with_endpoint("not a url").build(),
            Err(ListenerConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_builder_keeps_resume_path() {
        let config = ListenerConfig::builder()
            .with_endpoint("http://localhost:18101/events/main")
            .with_resume_path("/tmp/last-event-id")
            .build()
            .unwrap();
        assert_eq!(config.endpoint().path(), "/events/main");
        assert_eq!(config.resume_path(), Some(Path::new("/tmp/last-event-id")));
    }
}
