//! Explicit scenario context passed to every hook and test body.

use crate::client::HttpClient;
use crate::config::{HarnessConfig, LocatorMode};
use crate::error::TestError;
use crate::locator::{Locator, ResourceReference};
use crate::pending::Pending;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-suite mutable variables. Cleared before every suite.
#[derive(Debug, Default)]
pub struct ScenarioState {
    pending: BTreeMap<String, Pending>,
    values: BTreeMap<String, Value>,
    reference: Option<ResourceReference>,
    locator: Option<Locator>,
}

/// Everything a hook or test body may touch.
#[derive(Debug)]
pub struct Context {
    client: HttpClient,
    collection_url: String,
    locator_mode: LocatorMode,
    state: ScenarioState,
}

impl Context {
    pub fn new(client: HttpClient, collection_url: impl Into<String>, locator_mode: LocatorMode) -> Self {
        Self {
            client,
            collection_url: collection_url.into(),
            locator_mode,
            state: ScenarioState::default(),
        }
    }

    /// Build a context from loaded configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            HttpClient::new(),
            config.base_url.clone(),
            config.locator.clone(),
        )
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// URL of the resource collection under test.
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    /// Store a pending result under `key`. The orchestrator settles it before the next test runs.
    pub fn store(&mut self, key: &str, pending: Pending) {
        self.state.pending.insert(key.to_string(), pending);
    }

    /// A previously stored pending result.
    pub fn pending(&self, key: &str) -> Result<Pending, TestError> {
        self.state
            .pending
            .get(key)
            .cloned()
            .ok_or_else(|| TestError::MissingState(key.to_string()))
    }

    /// Store an arbitrary scenario variable.
    pub fn set_value(&mut self, key: &str, value: Value) {
        self.state.values.insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Result<&Value, TestError> {
        self.state
            .values
            .get(key)
            .ok_or_else(|| TestError::MissingState(key.to_string()))
    }

    /// The current resource reference, set by [`Context::locate`].
    pub fn reference(&self) -> Result<&ResourceReference, TestError> {
        self.state
            .reference
            .as_ref()
            .ok_or_else(|| TestError::MissingState("resource reference".to_string()))
    }

    /// Locate the resource created by `created` and make it the current reference.
    ///
    /// The strategy is chosen on the first call in a suite and reused afterwards.
    pub async fn locate(&mut self, created: &Pending) -> Result<ResourceReference, TestError> {
        let locator = match self.state.locator.clone() {
            Some(locator) => locator,
            None => {
                let locator = match &self.locator_mode {
                    LocatorMode::Fixed(locator) => locator.clone(),
                    LocatorMode::Detect { id_field } => {
                        let snapshot = created.settle().await?;
                        Locator::detect(&snapshot, id_field)
                    }
                };
                debug!(strategy = %locator, "Selected locator for suite");
                self.state.locator = Some(locator.clone());
                locator
            }
        };

        let reference = locator
            .locate(&self.client, created, &self.collection_url)
            .await?;
        self.state.reference = Some(reference.clone());
        Ok(reference)
    }

    /// Wait for every stored pending result to settle. Outcomes are left for tests to judge.
    pub(crate) async fn settle_stored(&self) {
        for (key, pending) in &self.state.pending {
            if let Err(failure) = pending.settle().await {
                debug!(key = %key, reason = %failure, "Stored request rejected");
            }
        }
    }

    /// Discard all scenario state.
    pub(crate) fn reset(&mut self) {
        self.state = ScenarioState::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::DEFAULT_ID_FIELD;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detect_mode() -> LocatorMode {
        LocatorMode::Detect {
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    #[test]
    fn test_missing_state_is_reported_by_key() {
        let ctx = Context::new(HttpClient::new(), "http://h/api", detect_mode());

        assert!(matches!(ctx.pending("created"), Err(TestError::MissingState(k)) if k == "created"));
        assert!(ctx.reference().is_err());
        assert!(ctx.value("before").is_err());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut ctx = Context::new(HttpClient::new(), "http://h/api", detect_mode());
        ctx.set_value("count", json!(1));
        let pending = ctx.client().read("http://h/api");
        ctx.store("created", pending);

        ctx.reset();

        assert!(ctx.value("count").is_err());
        assert!(ctx.pending("created").is_err());
    }

    #[tokio::test]
    async fn test_locate_pins_detected_strategy() {
        let mock_server = MockServer::start().await;
        let collection_url = format!("{}/api", mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "/api/first"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let mut ctx = Context::new(HttpClient::new(), &collection_url, detect_mode());

        let first = ctx.client().create(&collection_url, &json!({}));
        let reference = ctx.locate(&first).await.unwrap();
        assert_eq!(reference.as_str(), format!("{}/api/first", mock_server.uri()));
        assert_eq!(ctx.reference().unwrap(), &reference);

        // Pinned to the location-header strategy, so a response without one fails.
        let second = ctx.client().create(&collection_url, &json!({}));
        let err = ctx.locate(&second).await.unwrap_err();
        assert!(err.to_string().contains("no location header"));
    }

    #[tokio::test]
    async fn test_settle_stored_tolerates_rejections() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut ctx = Context::new(HttpClient::new(), mock_server.uri(), detect_mode());
        let pending = ctx.client().read(&format!("{}/api/x", mock_server.uri()));
        ctx.store("gone", pending.clone());

        ctx.settle_stored().await;
        assert!(pending.is_settled());
    }
}
