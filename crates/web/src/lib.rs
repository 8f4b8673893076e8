use std::sync::Arc;

use axum::Router;
use database::PgSpatialStore;
use gvi_service::GviServiceClient;
use planner::Planner;
use sl_transport::SlTransportClient;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

pub type RoutePlanner = Planner<PgSpatialStore, SlTransportClient>;

#[derive(Clone)]
pub struct WebState {
    pub planner: Arc<RoutePlanner>,
    pub store: Arc<PgSpatialStore>,
    pub greenness: Arc<GviServiceClient>,
}

pub async fn start_web_server(state: WebState) -> std::io::Result<()> {
    let routes = Router::new()
        .nest("/api", api::routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("0.0.0.0:8080").await?;
    log::info!("listening on 0.0.0.0:8080");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
