use std::{env, time::Duration};

use async_trait::async_trait;
use model::Departure;
use planner::feed::DepartureFeed;

use crate::{model::DeparturesResponse, ApiError};

pub const SL_TRANSPORT_API_URL: &str = "https://transport.integration.sl.se/v1";

/// The upstream rejects forecast windows beyond 20 minutes.
const MAX_FORECAST: Duration = Duration::from_secs(1200);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SlTransportClient {
    base_url: String,
    http: reqwest::Client,
}

impl SlTransportClient {
    pub fn new() -> Self {
        Self::with_base_url(
            env::var("SL_TRANSPORT_API_URL")
                .unwrap_or_else(|_| SL_TRANSPORT_API_URL.to_owned()),
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

    /// Bus departures expected at `site_id` within the forecast window.
    /// Other transport modes in the response are filtered out.
    pub async fn get_departures(
        &self,
        site_id: i64,
        forecast: Duration,
    ) -> Result<Vec<Departure>, ApiError> {
        let forecast_s = forecast.min(MAX_FORECAST).as_secs();
        let url = format!(
            "{}/sites/{site_id}/departures?forecast={forecast_s}",
            self.base_url
        );
        let response = self.http.get(&url).send().await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let parsed: DeparturesResponse = response.json().await?;
                Ok(parsed
                    .departures
                    .into_iter()
                    .filter(|departure| departure.is_bus())
                    .map(|departure| departure.into_departure())
                    .collect())
            }
            other => match response.text().await {
                Ok(text) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: Some(text),
                }),
                Err(_) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: None,
                }),
            },
        }
    }
}

impl Default for SlTransportClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DepartureFeed for SlTransportClient {
    async fn departures(&self, site_id: i64, forecast: Duration) -> Vec<Departure> {
        match self.get_departures(site_id, forecast).await {
            Ok(departures) => departures,
            Err(why) => {
                log::warn!("departures for site {site_id} unavailable: {why}");
                vec![]
            }
        }
    }
}
