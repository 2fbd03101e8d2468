/// Card API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret used to sign and verify session tokens.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration_secs: i64,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Optional MQTT broker for the chat message counter. When absent the
    /// counter bridge is disabled and chat runs without counter notices.
    pub broker: Option<BrokerConfig>,
}

/// Connection settings for the external MQTT broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Default token lifetime when `JWT_EXPIRATION` is unset (1 hour).
pub const DEFAULT_JWT_EXPIRATION_SECS: i64 = 3600;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            jwt_secret: required_var("JWT_SECRET"),
            jwt_expiration_secs: std::env::var("JWT_EXPIRATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            broker: std::env::var("MQTT_URL_BACKEND")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|url| BrokerConfig {
                    host: broker_host(&url),
                    port: broker_port(&url),
                    username: std::env::var("MQTT_LOGIN").ok().filter(|s| !s.is_empty()),
                    password: std::env::var("MQTT_PASSWORD").ok().filter(|s| !s.is_empty()),
                }),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

/// Strip the scheme from a broker URL (`mqtt://host:1883` → `host:1883`).
fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}

fn broker_host(url: &str) -> String {
    let rest = strip_scheme(url);
    rest.split(':').next().unwrap_or(rest).to_string()
}

fn broker_port(url: &str) -> u16 {
    strip_scheme(url)
        .split_once(':')
        .and_then(|(_, port)| port.parse().ok())
        .unwrap_or(1883)
}
