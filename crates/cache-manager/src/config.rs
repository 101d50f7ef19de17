/// Cache configuration (§6 Configuration options). Mirrors the teacher's
/// env-var-driven config pattern (`AgentConfig::from_env`) — see
/// `AppConfig` in the binary crate for the assembled, env-overridable form.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub ttl_seconds: u64,
    pub max_bars_per_key: usize,
    pub connect_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            ttl_seconds: 24 * 60 * 60,
            max_bars_per_key: 2000,
            connect_on_start: true,
        }
    }
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{}@{}:{}/{}", pw, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}
