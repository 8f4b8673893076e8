use std::{env, str::FromStr, time::Duration};

/// Tunables of the planning engine. Every knob has a production default;
/// `from_env` lets deployments override the operational ones.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Pedestrian speed in m/s, used for every walking duration.
    pub walking_speed: f64,
    /// Minimum slack between estimated arrival at a transfer stop and the
    /// connecting departure.
    pub transfer_margin: Duration,
    /// Longest acceptable walk to or from a bus site.
    pub max_walking_time: Duration,
    /// Pacing delay between successive departure-feed requests.
    pub api_delay: Duration,
    /// Longest acceptable single bus ride.
    pub bus_search_max_duration: Duration,
    /// Average inter-stop travel time used when the feed window cannot
    /// cover the ride.
    pub transfer_inter_stop_avg: Duration,
    /// Hops a query agent rides before giving up on a transfer.
    pub transfer_search_depth: u32,
    /// Hops searched on the second line for a destination site.
    pub destination_search_depth: u32,
    /// Bound on intermediate stops enumerated for display.
    pub stops_along_depth: u32,
    /// Forecast window requested from the departures feed (upstream caps
    /// this at 1200 s).
    pub departure_forecast: Duration,
    /// Outer deadline for one planning request.
    pub request_deadline: Duration,
    /// Slack required between "could be at the stop" and the departure.
    pub boarding_margin: Duration,
    /// Sites considered around each endpoint.
    pub nearby_site_limit: usize,
    /// Nearest sites always included regardless of radius.
    pub nearest_site_count: usize,
    /// Bus candidates kept (by earliest arrival) for DGVI scoring.
    pub bus_scoring_candidates: usize,
    /// Walking candidates kept after deduplication.
    pub walking_candidates: usize,
    /// Transfer itineraries emitted per query agent.
    pub max_routes_per_agent: usize,
    /// Transfer itineraries emitted per request.
    pub max_transfer_routes: usize,
    /// Road edges per DGVI rebuild batch.
    pub dgvi_batch_size: usize,
    /// Radius of the waiting-DGVI buffer around a stop.
    pub waiting_dgvi_radius_m: f64,
    /// Cap on points returned by the GVI point layer endpoint.
    pub gvi_points_limit: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            walking_speed: 1.4,
            transfer_margin: Duration::from_secs(60),
            max_walking_time: Duration::from_secs(1200),
            api_delay: Duration::from_millis(500),
            bus_search_max_duration: Duration::from_secs(3600),
            transfer_inter_stop_avg: Duration::from_secs(90),
            transfer_search_depth: 10,
            destination_search_depth: 20,
            stops_along_depth: 50,
            departure_forecast: Duration::from_secs(1200),
            request_deadline: Duration::from_secs(120),
            boarding_margin: Duration::from_secs(60),
            nearby_site_limit: 5,
            nearest_site_count: 3,
            bus_scoring_candidates: 5,
            walking_candidates: 2,
            max_routes_per_agent: 2,
            max_transfer_routes: 20,
            dgvi_batch_size: 100,
            waiting_dgvi_radius_m: 200.0,
            gvi_points_limit: 20_000,
        }
    }
}

impl PlannerConfig {
    /// Defaults overridden by environment variables where present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        read_env("WALKING_SPEED", &mut config.walking_speed);
        read_env_secs("TRANSFER_MARGIN", &mut config.transfer_margin);
        read_env_secs("MAX_WALKING_TIME", &mut config.max_walking_time);
        read_env_millis("API_DELAY", &mut config.api_delay);
        read_env_secs(
            "BUS_SEARCH_MAX_DURATION",
            &mut config.bus_search_max_duration,
        );
        read_env_secs(
            "TRANSFER_INTER_STOP_AVG",
            &mut config.transfer_inter_stop_avg,
        );
        read_env("TRANSFER_SEARCH_DEPTH", &mut config.transfer_search_depth);
        read_env(
            "DESTINATION_SEARCH_DEPTH",
            &mut config.destination_search_depth,
        );
        read_env("STOPS_ALONG_DEPTH", &mut config.stops_along_depth);
        read_env_secs("REQUEST_DEADLINE", &mut config.request_deadline);
        config
    }

    /// Straight-line search radius around an endpoint, in meters.
    pub fn max_walking_distance_m(&self) -> f64 {
        self.walking_speed * self.max_walking_time.as_secs_f64()
    }
}

fn read_env<T: FromStr>(name: &str, slot: &mut T) {
    if let Some(value) = env::var(name).ok().and_then(|raw| raw.parse().ok()) {
        *slot = value;
    }
}

fn read_env_secs(name: &str, slot: &mut Duration) {
    if let Some(value) = env::var(name).ok().and_then(|raw| raw.parse().ok()) {
        *slot = Duration::from_secs(value);
    }
}

fn read_env_millis(name: &str, slot: &mut Duration) {
    if let Some(value) = env::var(name).ok().and_then(|raw| raw.parse().ok()) {
        *slot = Duration::from_millis(value);
    }
}
