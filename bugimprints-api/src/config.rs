/// Server configuration loaded from the environment
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `MEDIA_ROOT`: directory for uploaded files (default: `./media`)
/// - `MAX_UPLOAD_BYTES`: request body limit for uploads (default: 10 MiB)
/// - `BOOTSTRAP_SUPERUSER_EMAIL` / `BOOTSTRAP_SUPERUSER_PASSWORD`: create a
///   superuser on startup when none exists (optional, both or neither)
///
/// A `.env` file in the working directory is read first if present.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub media: MediaConfig,

    /// Superuser created at startup if the database has none
    pub bootstrap: Option<BootstrapSuperuser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSuperuser {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Splits a comma-separated origin list, dropping blanks
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing, a number does not parse,
    /// the JWT secret is too short, or only half of the bootstrap pair is set.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let mut cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_default());
        if cors_origins.is_empty() {
            cors_origins.push("*".to_string());
        }

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let media_root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());
        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(value) => value.parse::<usize>()?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let bootstrap = match (
            env::var("BOOTSTRAP_SUPERUSER_EMAIL").ok(),
            env::var("BOOTSTRAP_SUPERUSER_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapSuperuser { email, password }),
            (None, None) => None,
            _ => anyhow::bail!(
                "BOOTSTRAP_SUPERUSER_EMAIL and BOOTSTRAP_SUPERUSER_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            media: MediaConfig {
                root: PathBuf::from(media_root),
                max_upload_bytes,
            },
            bootstrap,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}
