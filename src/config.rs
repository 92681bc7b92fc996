use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub google_client_id: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub host: String,
    pub port: u16,
    /// Set the `Secure` cookie attribute (only meaningful behind TLS).
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            jwt_secret: required("JWT_SECRET")?,
            frontend_url: required("FRONTEND_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".into())
                .parse()?,
            secure_cookies: env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
