//! Sensor Platform REST Client
//!
//! Single request path for every component: joins the configured base URL,
//! attaches JSON and bearer headers, and turns non-2xx answers into typed
//! `ApiError`s.

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use super::dto::*;
use super::error::{ApiError, ApiResult};
use crate::config::ApiConfig;
use crate::sensors::SensorType;
use crate::session::SessionStore;

/// Parsed 2xx response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: T,
}

/// HTTP client for the sensor platform API
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client reading its bearer token from `session`
    pub fn new(config: &ApiConfig, session: SessionStore) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ApiError::from_transport)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Percent-encoded sensor name for use as a path segment
    fn segment(sensor: SensorType) -> String {
        urlencoding::encode(sensor.as_str()).into_owned()
    }

    /// Send a request and decode a 2xx JSON body
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "API request");

        let response = request.send().await.map_err(ApiError::from_transport)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;

        if !(200..300).contains(&status) {
            let err = ApiError::from_status(status, &bytes);
            tracing::debug!(%method, %url, status, error = %err, "API request failed");
            return Err(err);
        }

        let body = serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        Ok(self.send::<(), T>(Method::GET, path, None).await?.body)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Ok(self.send(Method::POST, path, Some(body)).await?.body)
    }

    // ============ Auth ============

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        self.post("auth/login", &LoginRequest { username, password })
            .await
    }

    /// `Ok` when the server accepts the stored token
    pub async fn verify(&self) -> ApiResult<()> {
        self.get::<serde_json::Value>("auth/verify").await.map(|_| ())
    }

    pub async fn profile(&self) -> ApiResult<serde_json::Value> {
        self.get("auth/profile").await
    }

    // ============ Sensors ============

    pub async fn sensor_types(&self) -> ApiResult<SensorTypesResponse> {
        self.get("sensors/types").await
    }

    pub async fn summary(&self) -> ApiResult<SensorSummary> {
        self.get("sensors/summary").await
    }

    /// Most recent readings, newest first
    pub async fn latest(&self, sensor: SensorType, limit: u32) -> ApiResult<LatestResponse> {
        self.get(&format!("sensors/{}/latest?limit={}", Self::segment(sensor), limit))
            .await
    }

    pub async fn statistics(
        &self,
        sensor: SensorType,
        hours: u32,
    ) -> ApiResult<StatisticsResponse> {
        self.get(&format!("sensors/{}/statistics?hours={}", Self::segment(sensor), hours))
            .await
    }

    // ============ Predictions ============

    pub async fn predict(
        &self,
        sensor: SensorType,
        request: &PredictRequest,
    ) -> ApiResult<PredictionResult> {
        self.post(&format!("predictions/{}/predict", Self::segment(sensor)), request)
            .await
    }

    /// Last forecast the server stored for a sensor
    pub async fn latest_prediction(&self, sensor: SensorType) -> ApiResult<PredictionResult> {
        self.get(&format!("predictions/{}/latest", Self::segment(sensor))).await
    }

    pub async fn train(&self, sensor: SensorType, days: u32) -> ApiResult<TrainingResponse> {
        self.post(&format!("predictions/{}/train", Self::segment(sensor)), &TrainRequest { days })
            .await
    }

    pub async fn train_all(&self, days: u32) -> ApiResult<TrainingResponse> {
        self.post("predictions/train/all", &TrainRequest { days })
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
