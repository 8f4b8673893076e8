use std::sync::Arc;

use database::{DatabaseConnectionInfo, PgSpatialStore};
use gvi_service::GviServiceClient;
use planner::{Planner, PlannerConfig};
use sl_transport::SlTransportClient;
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .expect("expected database connection info in env.");
    let store = Arc::new(
        PgSpatialStore::connect(database_connection_info)
            .await
            .expect("could not connect to database."),
    );

    // remote services
    let feed = Arc::new(SlTransportClient::new());
    let greenness = Arc::new(GviServiceClient::new());

    // planning engine
    let planner = Arc::new(Planner::new(
        store.clone(),
        feed,
        PlannerConfig::from_env(),
    ));

    // web server
    let web_future = start_web_server(WebState {
        planner,
        store,
        greenness,
    });

    let _ = web_future.await;
}
