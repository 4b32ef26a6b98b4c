use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firebase,
    File,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store backend `{other}` (expected firebase|file|memory)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    #[serde(default)]
    pub database_secret: Option<String>,
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_url: String::new(),
            credentials_path: default_credentials_path(),
            database_secret: None,
            data_file: default_data_file(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which request values count as "supplied" for create and update.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldPolicy {
    /// Empty strings and numeric zero are treated as absent.
    #[default]
    Truthy,
    /// Every value present in the body counts.
    Presence,
}

impl std::str::FromStr for FieldPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truthy" => Ok(Self::Truthy),
            "presence" => Ok(Self::Presence),
            other => Err(anyhow!("unknown field policy `{other}` (expected truthy|presence)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub field_policy: FieldPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { collection: default_collection(), field_policy: FieldPolicy::default() }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 5001 }
fn default_credentials_path() -> String { "serviceAccountKey.json".into() }
fn default_data_file() -> String { "data/coffee.json".into() }
fn default_request_timeout() -> u64 { 30 }
fn default_collection() -> String { "Coffee".into() }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

/// Read a TOML config file. A missing file yields the defaults;
/// unreadable or malformed files are errors.
pub fn load_optional(path: &str) -> Result<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).map_err(|e| anyhow!("invalid config file {path}: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(anyhow!("cannot read config file {path}: {e}")),
    }
}

impl AppConfig {
    /// Config file if present (defaults otherwise), then env overrides, then validation.
    pub fn load_and_validate() -> Result<Self> {
        Self::load_and_validate_with(&config_path(), |key| std::env::var(key).ok())
    }

    pub fn load_and_validate_with<F>(path: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = load_optional(path)?;
        cfg.apply_env_with(lookup)?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("PORT must be an integer in 1..=65535, got `{port}`"))?;
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(url) = lookup("FIREBASE_DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(path) = lookup("FIREBASE_CREDENTIALS") {
            self.store.credentials_path = path;
        }
        if let Some(secret) = lookup("FIREBASE_DATABASE_SECRET") {
            self.store.database_secret = Some(secret);
        }
        if let Some(file) = lookup("STORE_DATA_FILE") {
            self.store.data_file = file;
        }
        if let Some(policy) = lookup("CATALOG_FIELD_POLICY") {
            self.catalog.field_policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.validate()?;
        self.catalog.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            StoreBackend::Firebase => {
                let url = self.database_url.trim();
                if url.is_empty() {
                    return Err(anyhow!(
                        "store.database_url is empty; set it in config.toml or FIREBASE_DATABASE_URL"
                    ));
                }
                let lower = url.to_lowercase();
                if !(lower.starts_with("https://") || lower.starts_with("http://")) {
                    return Err(anyhow!("store.database_url must start with http:// or https://"));
                }
            }
            StoreBackend::File => {
                if self.data_file.trim().is_empty() {
                    return Err(anyhow!("store.data_file must not be empty for the file backend"));
                }
            }
            StoreBackend::Memory => {}
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("store.request_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl CatalogConfig {
    fn validate(&self) -> Result<()> {
        let c = self.collection.trim();
        if c.is_empty() || c.contains('/') || c.contains('.') {
            return Err(anyhow!("catalog.collection must be a single non-empty path segment"));
        }
        Ok(())
    }
}
