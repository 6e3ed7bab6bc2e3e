//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
///
/// All settings come from environment variables (a `.env` file is loaded
/// first when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (e.g. `sqlite:lusac.db`)
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Storefront base URL (CORS origin and checkout redirect target)
    pub web_url: String,
    /// PayOS merchant client id
    pub payos_client_id: String,
    /// PayOS API key
    pub payos_api_key: String,
    /// PayOS checksum key (request signing + webhook verification)
    pub payos_checksum_key: String,
    /// PayOS API base URL (overridable for staging)
    pub payos_api_base: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development
    /// environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:lusac.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            web_url: std::env::var("WEB_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
            payos_client_id: Self::require_secret("PAYOS_CLIENT_ID", &environment)?,
            payos_api_key: Self::require_secret("PAYOS_API_KEY", &environment)?,
            payos_checksum_key: Self::require_secret("PAYOS_CHECKSUM_KEY", &environment)?,
            payos_api_base: std::env::var("PAYOS_API_BASE")
                .unwrap_or_else(|_| "https://api-merchant.payos.vn".into()),
        })
    }

    /// Is this a production deployment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
