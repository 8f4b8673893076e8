use axum::{
    extract::{OriginalUri, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use planner::PlanError;
use serde::{Deserialize, Serialize};

pub type RouteResult<O> = Result<Json<O>, RouteErrorResponse>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    /// Stable error kind for clients.
    pub kind: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,
}

impl RouteErrorResponse {
    pub fn new<K, M>(status_code: StatusCode, kind: K, message: M) -> Self
    where
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            status_code,
            kind: kind.into(),
            message: message.into(),
            requested_uri: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn bad_request<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }
}

impl From<PlanError> for RouteErrorResponse {
    fn from(why: PlanError) -> Self {
        let (status, kind) = match &why {
            PlanError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            PlanError::NoDataForMonth(_) => {
                (StatusCode::NOT_FOUND, "no_data_for_month")
            }
            PlanError::TransientUpstream(_) => {
                (StatusCode::BAD_GATEWAY, "transient_upstream")
            }
            PlanError::ResourceExhausted(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "resource_exhausted")
            }
            PlanError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        Self::new(status, kind, why.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status_code;
        (status, Json(self)).into_response()
    }
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    _req: Request,
) -> RouteErrorResponse {
    RouteErrorResponse::new(StatusCode::NOT_FOUND, "not_found", "no such route")
        .with_uri(original_uri.path())
}
