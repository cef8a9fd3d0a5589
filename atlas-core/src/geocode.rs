//! Reverse geocoding for geo-tagged knowledge items.
//!
//! Provides a `Geocoder` trait with a Nominatim implementation. Geocoding is
//! best-effort: callers treat errors and unresolvable coordinates as
//! non-fatal and keep whatever location text the client supplied.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::GeocodeSettings;

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Abstraction over reverse-geocoding providers.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve coordinates to a human-readable address. Returns `Ok(None)`
    /// when the provider has no address for the point (open water etc.).
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocodeError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Nominatim reverse-geocoding client (`GET /reverse?lat=..&lon=..`).
///
/// Nominatim's usage policy requires an identifying User-Agent, which is
/// taken from `[geocode] user_agent`.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    settings: GeocodeSettings,
    base_url: String,
}

impl NominatimClient {
    pub fn new(settings: GeocodeSettings) -> Result<Self, GeocodeError> {
        Self::with_base_url(settings, NOMINATIM_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        settings: GeocodeSettings,
        base_url: String,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            settings,
            base_url,
        })
    }

    async fn reverse_once(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.settings.user_agent)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "Nominatim API error");
            return Err(GeocodeError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: NominatimResponse = response.json().await?;

        if let Some(err) = body.error {
            // "Unable to geocode" — valid coordinates with no address
            tracing::debug!(lat = latitude, lon = longitude, error = %err, "No address for coordinates");
            return Ok(None);
        }

        Ok(body.display_name)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocodeError> {
        let attempts = self.settings.max_retries as usize;
        let retry_strategy = ExponentialBackoff::from_millis(500)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(attempts);

        Retry::spawn(retry_strategy, || self.reverse_once(latitude, longitude))
            .await
            .map_err(|e| {
                tracing::error!(attempts, error = %e, "All reverse-geocode retry attempts failed");
                GeocodeError::RetryExhausted { attempts }
            })
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings() -> GeocodeSettings {
        GeocodeSettings {
            user_agent: "atlas-test".to_string(),
            timeout_seconds: 5,
            max_retries: 2,
        }
    }

    fn test_client(mock_server: &MockServer) -> NominatimClient {
        NominatimClient::with_base_url(test_settings(), mock_server.uri())
            .expect("Failed to create test client")
    }

    #[tokio::test]
    async fn test_reverse_returns_display_name() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "-34.3568"))
            .and(query_param("lon", "18.4921"))
            .and(query_param("format", "jsonv2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "Cape Point, Cape Peninsula, South Africa"
            })))
            .mount(&mock_server)
            .await;

        let result = client.reverse(-34.3568, 18.4921).await.unwrap();
        assert_eq!(
            result.as_deref(),
            Some("Cape Point, Cape Peninsula, South Africa")
        );
    }

    #[tokio::test]
    async fn test_reverse_sends_user_agent() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);

        Mock::given(method("GET"))
            .and(wiremock::matchers::header("User-Agent", "atlas-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "Somewhere"
            })))
            .mount(&mock_server)
            .await;

        let result = client.reverse(1.0, 2.0).await;
        assert!(result.is_ok(), "User-Agent header must be sent: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_reverse_unresolvable_returns_none() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Unable to geocode"
            })))
            .mount(&mock_server)
            .await;

        let result = client.reverse(0.0, -160.0).await.unwrap();
        assert!(result.is_none(), "open-water coordinates resolve to None");
    }

    #[tokio::test]
    async fn test_reverse_retries_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "Recovered Address"
            })))
            .mount(&mock_server)
            .await;

        let result = client.reverse(48.8584, 2.2945).await.unwrap();
        assert_eq!(result.as_deref(), Some("Recovered Address"));
    }

    #[tokio::test]
    async fn test_reverse_exhausts_retries_on_persistent_failure() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let result = client.reverse(48.0, 2.0).await;
        match result {
            Err(GeocodeError::RetryExhausted { attempts }) => assert_eq!(attempts, 2),
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }
}
