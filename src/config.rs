use serde::Deserialize;

/// Highest exhaustive service limit honoured (2^24 subsets per request)
pub const MAX_EXHAUSTIVE_SERVICE_LIMIT: usize = 24;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the streaming service catalog (JSON array of services)
    #[serde(default = "default_services_path")]
    pub services_path: String,

    /// Path to the league taxonomy (JSON array of categories)
    #[serde(default = "default_leagues_path")]
    pub leagues_path: String,

    /// Largest catalog the optimizer will scan exhaustively (2^n subsets).
    /// Bigger catalogs are solved as an integer program instead. Clamped to
    /// [`MAX_EXHAUSTIVE_SERVICE_LIMIT`].
    #[serde(default = "default_exhaustive_service_limit")]
    pub exhaustive_service_limit: usize,

    /// Whether surfaced bundles are reported to the telemetry sink
    #[serde(default = "default_telemetry_enabled")]
    pub telemetry_enabled: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_services_path() -> String {
    "data/streaming_services.json".to_string()
}

fn default_leagues_path() -> String {
    "data/leagues.json".to_string()
}

fn default_exhaustive_service_limit() -> usize {
    20
}

fn default_telemetry_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            services_path: default_services_path(),
            leagues_path: default_leagues_path(),
            exhaustive_service_limit: default_exhaustive_service_limit(),
            telemetry_enabled: default_telemetry_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        Ok(config.clamped())
    }

    /// Caps settings whose large values would stall request handling
    pub fn clamped(mut self) -> Self {
        if self.exhaustive_service_limit > MAX_EXHAUSTIVE_SERVICE_LIMIT {
            tracing::warn!(
                requested = self.exhaustive_service_limit,
                max = MAX_EXHAUSTIVE_SERVICE_LIMIT,
                "EXHAUSTIVE_SERVICE_LIMIT too large, clamping"
            );
            self.exhaustive_service_limit = MAX_EXHAUSTIVE_SERVICE_LIMIT;
        }
        self
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
