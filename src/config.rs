use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    /// Root directory for uploaded files, served under `/uploads`.
    pub upload_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let jwt = JwtConfig {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront-api".to_string()),
            audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "storefront-clients".to_string()),
            ttl_hours: env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
        };

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:4200".to_string()),
        );

        Ok(Self {
            port,
            database_url,
            host,
            jwt,
            upload_dir,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_origins;

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins("http://localhost:4200, https://shop.example.com ,,");
        assert_eq!(
            origins,
            vec![
                "http://localhost:4200".to_string(),
                "https://shop.example.com".to_string()
            ]
        );
    }
}
