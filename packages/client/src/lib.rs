#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote data client for the ParkenDD parking API.
//!
//! [`ParkingClient`] issues the three read operations the app needs:
//!
//! - **metadata** (`GET {base}/`): API version and supported cities
//! - **snapshot** (`GET {base}/{city}`): current lot occupancy
//! - **forecast** (`GET {base}/{region}/{lot}/timespan?from=..&to=..`)
//!
//! Every outcome is classified into a [`ClientError`]. Nothing is cached, retried or deduplicated. Once the
//! server reports an incompatible API version the client refuses all
//! further operations for its lifetime.

pub mod activity;
mod classify;
pub mod config;
pub mod error;
pub mod forecast;
pub mod transport;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parkendd_models::{
    ForecastSeries, KeyValueStore, Metadata, ParkingSnapshot, Selection, timestamp,
};
use serde::de::DeserializeOwned;

use crate::classify::{Endpoint, check_api_version, classify};
use crate::forecast::ForecastPayload;

pub use activity::{ActivityIndicator, NetworkActivity};
pub use config::{ApiEndpoint, ClientConfig, ConfigError};
pub use error::{ClientError, TransportError};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

/// Metadata and snapshot fetched together for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityUpdate {
    pub metadata: Metadata,
    pub snapshot: ParkingSnapshot,
}

/// Anything that can provide the service metadata.
///
/// The location tracker depends on this rather than on [`ParkingClient`]
/// so it can be driven by a fake in tests.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// # Errors
    ///
    /// Returns a classified [`ClientError`] if the metadata is unavailable.
    async fn fetch_metadata(&self) -> Result<Metadata, ClientError>;
}

/// Client for the parking API.
pub struct ParkingClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    activity: NetworkActivity,
    /// API version that made this session unusable, once seen.
    incompatible: OnceLock<String>,
}

impl std::fmt::Debug for ParkingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParkingClient")
            .field("config", &self.config)
            .field("activity", &self.activity)
            .field("incompatible", &self.incompatible.get())
            .finish_non_exhaustive()
    }
}

impl ParkingClient {
    /// Creates a client using `reqwest` with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, activity: NetworkActivity) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport), activity))
    }

    #[must_use]
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        activity: NetworkActivity,
    ) -> Self {
        Self {
            config,
            transport,
            activity,
            incompatible: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn activity(&self) -> &NetworkActivity {
        &self.activity
    }

    /// Fetches the API version and city catalog.
    ///
    /// # Errors
    ///
    /// [`ClientError::Request`], [`ClientError::Server`] or
    /// [`ClientError::IncompatibleApi`] when the server's `api_version` is
    /// not the supported one.
    pub async fn fetch_metadata(&self) -> Result<Metadata, ClientError> {
        self.ensure_compatible()?;
        let metadata: Metadata = self.get(Endpoint::Metadata, &[], &[]).await?;
        check_api_version(metadata, &self.config.supported_api_version).inspect_err(|e| {
            if let ClientError::IncompatibleApi { found, .. } = e {
                let _ = self.incompatible.set(found.clone());
            }
        })
    }

    /// Fetches the current lot snapshot for `city_id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] for unknown cities, otherwise the usual
    /// transport/status/shape classification.
    pub async fn fetch_snapshot(&self, city_id: &str) -> Result<ParkingSnapshot, ClientError> {
        self.ensure_compatible()?;
        self.get(Endpoint::Snapshot, &[city_id], &[]).await
    }

    /// Fetches the forecast for `lot_id` in the configured region.
    ///
    /// # Errors
    ///
    /// See [`fetch_forecast_in_region`](Self::fetch_forecast_in_region).
    pub async fn fetch_forecast(
        &self,
        lot_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<ForecastSeries, ClientError> {
        self.fetch_forecast_in_region(&self.config.forecast_region, lot_id, from, to)
            .await
    }

    /// Fetches the forecast for `lot_id` between `from` and `to`. Both
    /// times are sent verbatim as `yyyy-MM-ddTHH:mm:ss`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoData`] when the server returns an empty series,
    /// [`ClientError::NotFound`] for unknown lots, otherwise the usual
    /// classification.
    pub async fn fetch_forecast_in_region(
        &self,
        region: &str,
        lot_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<ForecastSeries, ClientError> {
        self.ensure_compatible()?;
        let query = [
            ("from", timestamp::format(&from)),
            ("to", timestamp::format(&to)),
        ];
        let payload: ForecastPayload = self
            .get(Endpoint::Forecast, &[region, lot_id, "timespan"], &query)
            .await?;
        payload.into_series(lot_id)
    }

    /// Forecast for the seven days starting at `from`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_forecast`](Self::fetch_forecast).
    pub async fn fetch_forecast_for_week_starting(
        &self,
        lot_id: &str,
        from: NaiveDateTime,
    ) -> Result<ForecastSeries, ClientError> {
        let (from, to) = forecast::week_window(from);
        self.fetch_forecast(lot_id, from, to).await
    }

    /// Forecast for the calendar day containing `reference`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_forecast`](Self::fetch_forecast).
    pub async fn fetch_forecast_for_day_containing(
        &self,
        lot_id: &str,
        reference: NaiveDateTime,
    ) -> Result<ForecastSeries, ClientError> {
        let (from, to) = forecast::day_window(reference);
        self.fetch_forecast(lot_id, from, to).await
    }

    /// Fetches metadata, then the snapshot for `city_id`.
    ///
    /// The snapshot request is only issued after the metadata request
    /// succeeded; the first failure is returned as-is.
    ///
    /// # Errors
    ///
    /// The error of whichever step failed first.
    pub async fn update_snapshot_for_selected_city(
        &self,
        city_id: &str,
    ) -> Result<CityUpdate, ClientError> {
        let metadata = self.fetch_metadata().await?;
        let snapshot = self.fetch_snapshot(city_id).await?;
        Ok(CityUpdate { metadata, snapshot })
    }

    /// Runs [`update_snapshot_for_selected_city`](Self::update_snapshot_for_selected_city)
    /// for the city persisted in `store`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unknown`] if no city has been selected yet, otherwise
    /// the error of whichever step failed first.
    pub async fn update_snapshot_for_saved_city(
        &self,
        store: &dyn KeyValueStore,
    ) -> Result<CityUpdate, ClientError> {
        let selection = Selection::load(store).ok_or_else(|| ClientError::Unknown {
            message: "No city has been selected".to_string(),
        })?;
        self.update_snapshot_for_selected_city(&selection.city_id)
            .await
    }

    fn ensure_compatible(&self) -> Result<(), ClientError> {
        match self.incompatible.get() {
            Some(found) => Err(ClientError::IncompatibleApi {
                found: found.clone(),
                supported: self.config.supported_api_version.clone(),
            }),
            None => Ok(()),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let base = self.config.base_url();
        let mut url = reqwest::Url::parse(base).map_err(|e| ClientError::Unknown {
            message: format!("Invalid base URL '{base}': {e}"),
        })?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Unknown {
                message: format!("Base URL '{base}' cannot take path segments"),
            });
        }
        if segments.is_empty() {
            // The metadata endpoint is `{base}/`, even under a path prefix.
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
        } else if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(segments)?;
        log::debug!("GET {url} {query:?}");

        let outcome = {
            let _busy = self.activity.begin();
            self.transport.get(&url, query).await
        };

        classify(endpoint, url.as_str(), outcome)
    }
}

#[async_trait]
impl MetadataSource for ParkingClient {
    async fn fetch_metadata(&self) -> Result<Metadata, ClientError> {
        Self::fetch_metadata(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use parkendd_models::{LotState, MemoryStore, selection::SELECTED_CITY};

    use super::*;

    /// A request as seen by [`ScriptedTransport`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Recorded {
        url: String,
        query: Vec<(String, String)>,
    }

    /// Replays queued outcomes in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<Recorded>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(
            &self,
            url: &reqwest::Url,
            query: &[(&str, String)],
        ) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(Recorded {
                url: url.to_string(),
                query: query
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            });
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::Unavailable {
                        message: "no scripted response".to_string(),
                    })
                })
        }
    }

    fn ok(body: serde_json::Value) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, body.to_string()))
    }

    fn status(code: u16) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(code, ""))
    }

    fn metadata_body(version: &str) -> serde_json::Value {
        serde_json::json!({
            "api_version": version,
            "cities": {
                "Dresden": {"name": "Dresden", "coords": {"lat": 51.05, "lng": 13.74}},
                "Ingolstadt": {"name": "Ingolstadt", "coords": {"lat": 48.77, "lng": 11.43}}
            }
        })
    }

    fn snapshot_body() -> serde_json::Value {
        serde_json::json!({
            "last_updated": "2024-01-01T10:00:00",
            "last_downloaded": "2024-01-01T10:01:00",
            "url": "https://www.dresden.de/parken",
            "lots": [{
                "id": "dresdenaltmarkt", "name": "Altmarkt", "total": 400, "free": 120,
                "state": "open", "coords": {"lat": 51.05, "lng": 13.737},
                "address": "Wilsdruffer Straße", "region": "Innere Altstadt",
                "lot_type": "Tiefgarage"
            }]
        })
    }

    fn client(transport: Arc<ScriptedTransport>) -> ParkingClient {
        let config = ClientConfig {
            base_url: Some("https://parking.test/".to_string()),
            ..ClientConfig::default()
        };
        ParkingClient::with_transport(config, transport, NetworkActivity::default())
    }

    fn jan_first() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn metadata_with_supported_version() {
        let transport = ScriptedTransport::new(vec![ok(metadata_body("1.0"))]);
        let client = client(transport.clone());

        let metadata = client.fetch_metadata().await.unwrap();
        assert_eq!(metadata.catalog().len(), 2);
        assert_eq!(transport.requests()[0].url, "https://parking.test/");
    }

    #[tokio::test]
    async fn metadata_version_mismatch_is_incompatible_even_when_well_formed() {
        let transport = ScriptedTransport::new(vec![ok(metadata_body("2.0"))]);
        let client = client(transport);

        let err = client.fetch_metadata().await.unwrap_err();
        assert_eq!(
            err,
            ClientError::IncompatibleApi {
                found: "2.0".to_string(),
                supported: "1.0".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn incompatible_api_blocks_the_rest_of_the_session() {
        let transport = ScriptedTransport::new(vec![
            ok(metadata_body("0.9")),
            ok(snapshot_body()),
        ]);
        let client = client(transport.clone());

        assert!(client.fetch_metadata().await.unwrap_err().is_fatal());
        let err = client.fetch_snapshot("Dresden").await.unwrap_err();
        assert!(err.is_fatal());
        let err = client
            .fetch_forecast_for_week_starting("dresdenaltmarkt", jan_first())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn metadata_404_is_server() {
        let client = client(ScriptedTransport::new(vec![status(404)]));
        assert!(matches!(
            client.fetch_metadata().await,
            Err(ClientError::Server { .. })
        ));
    }

    #[tokio::test]
    async fn snapshot_parses_lots() {
        let transport = ScriptedTransport::new(vec![ok(snapshot_body())]);
        let client = client(transport.clone());

        let snapshot = client.fetch_snapshot("Dresden").await.unwrap();
        assert_eq!(snapshot.lots().len(), 1);
        assert_eq!(snapshot.lots()[0].state, LotState::Open);
        assert_eq!(transport.requests()[0].url, "https://parking.test/Dresden");
    }

    #[tokio::test]
    async fn snapshot_404_is_not_found_and_500_is_server() {
        let client = client(ScriptedTransport::new(vec![status(404), status(500)]));

        assert_eq!(
            client.fetch_snapshot("Atlantis").await.unwrap_err(),
            ClientError::NotFound {
                url: "https://parking.test/Atlantis".to_string()
            }
        );
        assert!(matches!(
            client.fetch_snapshot("Dresden").await,
            Err(ClientError::Server { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_request() {
        let client = client(ScriptedTransport::new(vec![Err(
            TransportError::Unavailable {
                message: "connection reset".to_string(),
            },
        )]));
        let err = client.fetch_snapshot("Dresden").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn city_identifiers_are_escaped_into_one_segment() {
        let transport = ScriptedTransport::new(vec![ok(snapshot_body())]);
        let client = client(transport.clone());

        client.fetch_snapshot("Bad Homburg/x").await.unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "https://parking.test/Bad%20Homburg%2Fx"
        );
    }

    #[tokio::test]
    async fn week_forecast_passes_window_verbatim() {
        let transport = ScriptedTransport::new(vec![ok(serde_json::json!({
            "data": {"2024-01-01T00:00:00": 10, "2024-01-01T01:00:00": 12}
        }))]);
        let client = client(transport.clone());

        let series = client
            .fetch_forecast_for_week_starting("dresdenaltmarkt", jan_first())
            .await
            .unwrap();
        assert_eq!(series.len(), 2);

        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://parking.test/Dresden/dresdenaltmarkt/timespan"
        );
        assert_eq!(
            request.query,
            [
                ("from".to_string(), "2024-01-01T00:00:00".to_string()),
                ("to".to_string(), "2024-01-08T00:00:00".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn day_forecast_covers_the_calendar_day() {
        let transport = ScriptedTransport::new(vec![ok(serde_json::json!({
            "data": {"2024-03-05T12:00:00": 80}
        }))]);
        let client = client(transport.clone());

        let reference = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(15, 42, 7)
            .unwrap();
        client
            .fetch_forecast_for_day_containing("dresdenaltmarkt", reference)
            .await
            .unwrap();

        let query = &transport.requests()[0].query;
        assert_eq!(query[0].1, "2024-03-05T00:00:00");
        assert_eq!(query[1].1, "2024-03-06T00:00:00");
    }

    #[tokio::test]
    async fn empty_forecast_is_no_data() {
        let client = client(ScriptedTransport::new(vec![ok(serde_json::json!({"data": {}}))]));
        let err = client
            .fetch_forecast("dresdenaltmarkt", jan_first(), jan_first())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::NoData {
                lot_id: "dresdenaltmarkt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn forecast_in_explicit_region() {
        let transport = ScriptedTransport::new(vec![status(404)]);
        let client = client(transport.clone());
        let err = client
            .fetch_forecast_in_region("Ingolstadt", "ingolstadtreduit", jan_first(), jan_first())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(
            transport.requests()[0].url,
            "https://parking.test/Ingolstadt/ingolstadtreduit/timespan"
        );
    }

    #[tokio::test]
    async fn composite_skips_snapshot_when_metadata_fails() {
        let transport = ScriptedTransport::new(vec![status(503), ok(snapshot_body())]);
        let client = client(transport.clone());

        let err = client
            .update_snapshot_for_selected_city("Dresden")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server { .. }));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.requests()[0].url, "https://parking.test/");
    }

    #[tokio::test]
    async fn composite_returns_snapshot_failure() {
        let transport = ScriptedTransport::new(vec![ok(metadata_body("1.0")), status(404)]);
        let client = client(transport.clone());

        let err = client
            .update_snapshot_for_selected_city("Atlantis")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn composite_pairs_both_results_in_order() {
        let transport =
            ScriptedTransport::new(vec![ok(metadata_body("1.0")), ok(snapshot_body())]);
        let client = client(transport.clone());

        let update = client
            .update_snapshot_for_selected_city("Dresden")
            .await
            .unwrap();
        assert_eq!(update.metadata.display_name("Dresden"), Some("Dresden"));
        assert_eq!(update.snapshot.lots()[0].id, "dresdenaltmarkt");

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, ["https://parking.test/", "https://parking.test/Dresden"]);
    }

    #[tokio::test]
    async fn saved_city_requires_a_selection() {
        let idle = ScriptedTransport::new(vec![]);
        let store = MemoryStore::new();

        let err = client(idle.clone())
            .update_snapshot_for_saved_city(&store)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unknown { .. }));
        assert!(idle.requests().is_empty());

        store.set(SELECTED_CITY, "Dresden");
        let scripted =
            ScriptedTransport::new(vec![ok(metadata_body("1.0")), ok(snapshot_body())]);
        client(scripted.clone())
            .update_snapshot_for_saved_city(&store)
            .await
            .unwrap();
        assert_eq!(scripted.requests()[1].url, "https://parking.test/Dresden");
    }

    #[tokio::test]
    async fn activity_returns_to_idle_after_each_request() {
        let client = client(ScriptedTransport::new(vec![status(500)]));
        let _ = client.fetch_metadata().await;
        assert_eq!(client.activity().in_flight(), 0);
    }

    #[tokio::test]
    async fn base_url_with_path_prefix_keeps_trailing_slash() {
        for base in ["https://host.test/api/", "https://host.test/api"] {
            let config = ClientConfig {
                base_url: Some(base.to_string()),
                ..ClientConfig::default()
            };
            let transport =
                ScriptedTransport::new(vec![ok(metadata_body("1.0")), ok(snapshot_body())]);
            let client = ParkingClient::with_transport(
                config,
                transport.clone(),
                NetworkActivity::default(),
            );

            client
                .update_snapshot_for_selected_city("Dresden")
                .await
                .unwrap();
            let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
            assert_eq!(
                urls,
                ["https://host.test/api/", "https://host.test/api/Dresden"],
                "base {base}"
            );
        }
    }

    #[tokio::test]
    async fn invalid_base_url_is_unknown() {
        let config = ClientConfig {
            base_url: Some("not a url".to_string()),
            ..ClientConfig::default()
        };
        let transport = ScriptedTransport::new(vec![]);
        let client =
            ParkingClient::with_transport(config, transport.clone(), NetworkActivity::default());
        assert!(matches!(
            client.fetch_metadata().await,
            Err(ClientError::Unknown { .. })
        ));
        assert!(transport.requests().is_empty());
    }
}
