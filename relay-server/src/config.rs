use std::time::Duration;

/// Server configuration. Embedders override fields as needed.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace delay between the Media Engine worker dying and the controlled
    /// process exit. Engine state is unrecoverable at that point.
    pub engine_death_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            engine_death_grace: Duration::from_secs(2),
        }
    }
}
