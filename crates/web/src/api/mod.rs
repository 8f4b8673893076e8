use axum::Router;

use crate::WebState;

pub mod v1;

pub fn routes(state: WebState) -> Router {
    Router::new().nest("/v1", v1::routes(state))
}
