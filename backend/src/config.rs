use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL of this service.
    pub public_url: String,
    /// Origin allowed by CORS (the profile editor frontend).
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Shared secret the identity provider signs ID tokens with (HS256).
    pub jwt_secret: String,
    /// Expected `iss` claim. Not checked when unset.
    pub issuer: Option<String>,
    /// Expected `aud` claim. Not checked when unset.
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    /// Lifetime of tokens minted by `profilectl dev-token`.
    pub dev_token_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded objects are written to.
    pub dir: String,
    /// Base URL the stored objects are publicly served from.
    pub public_url: String,
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        url::Url::parse(&public_url)
            .map_err(|_| ConfigError::InvalidValue("PUBLIC_URL".to_string()))?;

        let storage_public_url = env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/files", public_url.trim_end_matches('/')));
        url::Url::parse(&storage_public_url)
            .map_err(|_| ConfigError::InvalidValue("STORAGE_PUBLIC_URL".to_string()))?;

        let jwt_secret = env::var("IDENTITY_JWT_SECRET")
            .map_err(|_| ConfigError::MissingEnv("IDENTITY_JWT_SECRET".to_string()))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue("IDENTITY_JWT_SECRET".to_string()));
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                public_url,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/profiles.db".to_string()),
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            identity: IdentityConfig {
                jwt_secret,
                issuer: non_empty("IDENTITY_ISSUER"),
                audience: non_empty("IDENTITY_AUDIENCE"),
                leeway_seconds: parse_or("IDENTITY_LEEWAY_SECONDS", 60),
                dev_token_hours: parse_or("IDENTITY_DEV_TOKEN_HOURS", 24),
            },
            storage: StorageConfig {
                dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "data/uploads".to_string()),
                public_url: storage_public_url,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/profiles.db".to_string(),
                max_connections: 5,
            },
            identity: IdentityConfig {
                jwt_secret: String::new(),
                issuer: None,
                audience: None,
                leeway_seconds: 60,
                dev_token_hours: 24,
            },
            storage: StorageConfig {
                dir: "data/uploads".to_string(),
                public_url: "http://localhost:8080/files".to_string(),
            },
        }
    }
}
