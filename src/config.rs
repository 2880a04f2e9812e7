use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Book catalog REST API with cover upload and per-user read tracking.
#[derive(Parser, Debug, Clone)]
#[command(name = "bookshelf-rs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "BOOKSHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long, env = "BOOKSHELF_BIND")]
        bind: Option<SocketAddr>,
    },

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Cover image storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        5000,
    )
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/catalog.db")
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign bearer tokens. Must be set before serving.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    24
}

/// Cover image storage configuration.
///
/// `backend = "local"` writes covers under `root` and builds URLs from
/// `public_url`; `backend = "s3"` uploads to an S3-compatible bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "local" or "s3".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory for locally stored covers.
    #[serde(default = "default_covers_root")]
    pub root: PathBuf,

    /// Base URL prepended to object keys when building public links.
    /// Optional for the s3 backend (defaults to `{endpoint}/{bucket}`).
    #[serde(default)]
    pub public_url: Option<String>,

    /// S3 endpoint, e.g. "https://s3.amazonaws.com" or "minio:9000".
    #[serde(default)]
    pub endpoint: String,

    /// S3 region.
    #[serde(default = "default_region")]
    pub region: String,

    /// S3 bucket name.
    #[serde(default)]
    pub bucket: String,

    /// S3 access key.
    #[serde(default)]
    pub access_key: String,

    /// S3 secret key.
    #[serde(default)]
    pub secret_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_covers_root(),
            public_url: None,
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_covers_root() -> PathBuf {
    PathBuf::from("data/covers")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("bookshelf-rs.toml"),
            PathBuf::from("/etc/bookshelf-rs/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Apply environment overrides.
    ///
    /// Called once at startup; the returned value is the immutable
    /// configuration handed to the services.
    pub fn apply_env(mut self) -> Self {
        if let Some(bind) = env_var("BOOKSHELF_BIND").and_then(|v| v.parse().ok()) {
            self.server.bind = bind;
        }
        if let Some(path) = env_var("BOOKSHELF_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(secret) = env_var("BOOKSHELF_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(hours) = env_var("BOOKSHELF_JWT_TTL_HOURS").and_then(|v| v.parse().ok()) {
            self.auth.token_ttl_hours = hours;
        }
        if let Some(backend) = env_var("BOOKSHELF_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
        if let Some(root) = env_var("BOOKSHELF_COVERS_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(url) = env_var("BOOKSHELF_COVERS_URL") {
            self.storage.public_url = Some(url);
        }
        if let Some(endpoint) = env_var("BOOKSHELF_S3_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Some(region) = env_var("BOOKSHELF_S3_REGION") {
            self.storage.region = region;
        }
        if let Some(bucket) = env_var("BOOKSHELF_S3_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(key) = env_var("BOOKSHELF_S3_ACCESS_KEY") {
            self.storage.access_key = key;
        }
        if let Some(key) = env_var("BOOKSHELF_S3_SECRET_KEY") {
            self.storage.secret_key = key;
        }

        self
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# bookshelf-rs configuration

[server]
bind = "0.0.0.0:5000"

[database]
# path = "/var/lib/bookshelf-rs/catalog.db"

[auth]
# Secret used to sign bearer tokens (required).
jwt_secret = ""
# Token lifetime in hours
token_ttl_hours = 24

[storage]
# Backend: "local" or "s3"
backend = "local"
# root = "/var/lib/bookshelf-rs/covers"
# public_url = "https://covers.example.com"

# S3 settings (backend = "s3")
# endpoint = "https://s3.amazonaws.com"
# region = "us-east-1"
# bucket = "bookshelf-covers"
# access_key = ""
# secret_key = ""
"#
        .to_string()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
