//! Client for the external greenness scoring service: it runs the
//! street-imagery model and returns a GVI value per submitted point. The
//! service is slow (model inference), so the request timeout is generous.

use std::{env, error, fmt, sync::Arc, time::Duration};

use model::Location;
use serde::{Deserialize, Serialize};

pub const GVI_SERVICE_URL: &str = "http://localhost:5001";

/// The scoring backend processes small batches only.
pub const MAX_POINTS_PER_CALL: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub enum ApiError {
    RequestError(Arc<reqwest::Error>),
    TooManyPoints(usize),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
    },
    ValueCountMismatch {
        sent: usize,
        received: usize,
    },
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            ApiError::TooManyPoints(count) => write!(
                f,
                "{count} points submitted, the scoring service accepts at most {MAX_POINTS_PER_CALL}"
            ),
            ApiError::InvalidResponse { status_code, url } => {
                write!(f, "Invalid Response ({}) {}", status_code, url)
            }
            ApiError::ValueCountMismatch { sent, received } => write!(
                f,
                "scoring service returned {received} values for {sent} points"
            ),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::RequestError(Arc::new(e))
    }
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    points: &'a [ScorePoint],
}

#[derive(Debug, Serialize)]
struct ScorePoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct GviServiceClient {
    base_url: String,
    http: reqwest::Client,
}

impl GviServiceClient {
    pub fn new() -> Self {
        Self::with_base_url(
            env::var("GVI_SERVICE_URL")
                .unwrap_or_else(|_| GVI_SERVICE_URL.to_owned()),
        )
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Scores a small batch of points, one greenness value per point in
    /// input order.
    pub async fn score_points(
        &self,
        points: &[Location],
    ) -> Result<Vec<f64>, ApiError> {
        if points.len() > MAX_POINTS_PER_CALL {
            return Err(ApiError::TooManyPoints(points.len()));
        }
        let payload: Vec<ScorePoint> = points
            .iter()
            .map(|point| ScorePoint {
                latitude: point.latitude,
                longitude: point.longitude,
            })
            .collect();

        let url = format!("{}/score", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&ScoreRequest { points: &payload })
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ApiError::InvalidResponse {
                status_code: response.status(),
                url,
            });
        }
        let parsed: ScoreResponse = response.json().await?;
        if parsed.values.len() != points.len() {
            return Err(ApiError::ValueCountMismatch {
                sent: points.len(),
                received: parsed.values.len(),
            });
        }
        Ok(parsed.values)
    }
}

impl Default for GviServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scores_points_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/score")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"values": [0.42, 0.17]}"#)
            .create_async()
            .await;

        let client = GviServiceClient::with_base_url(server.url());
        let values = client
            .score_points(&[
                Location::new(59.34, 18.05),
                Location::new(59.35, 18.06),
            ])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(values, vec![0.42, 0.17]);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_client_side() {
        let client = GviServiceClient::with_base_url("http://unused");
        let points = vec![Location::new(0.0, 0.0); MAX_POINTS_PER_CALL + 1];
        let result = client.score_points(&points).await;
        assert!(matches!(result, Err(ApiError::TooManyPoints(_))));
    }

    #[tokio::test]
    async fn mismatched_value_count_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/score")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"values": [0.42]}"#)
            .create_async()
            .await;

        let client = GviServiceClient::with_base_url(server.url());
        let result = client
            .score_points(&[
                Location::new(59.34, 18.05),
                Location::new(59.35, 18.06),
            ])
            .await;
        assert!(matches!(result, Err(ApiError::ValueCountMismatch { .. })));
    }
}
