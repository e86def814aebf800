use std::env;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub storage_mode: StorageMode,
    pub cors_origins: Vec<String>,
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageMode {
    /// Process-local maps, lost on restart
    Memory,
    Postgres { database_url: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let storage_mode = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => StorageMode::Postgres { database_url: url },
            _ => StorageMode::Memory,
        };

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("⚠️ CONFIG: JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .unwrap_or_else(|_| "5001".to_string())
                .parse()
                .unwrap_or(5001),
            jwt_secret,
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            storage_mode,
            cors_origins,
            broadcast_capacity: env::var("BROADCAST_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(256),
        }
    }

    /// In-memory configuration used by tests and local runs
    pub fn for_memory(jwt_secret: &str) -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: jwt_secret.to_string(),
            token_ttl_secs: 3600,
            storage_mode: StorageMode::Memory,
            cors_origins: Vec::new(),
            broadcast_capacity: 64,
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
