use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Prefix used to turn stored phone numbers into E.164 form.
    pub country_code: String,
    /// `None` when Twilio credentials are not configured.
    pub sms: Option<SmsConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port: {v}"))?,
            Err(_) => 8080,
        };
        let database_url = std::env::var("DATABASE_URL")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let country_code = std::env::var("SMS_COUNTRY_CODE")
            .map(|v| v.trim_start_matches('+').to_string())
            .unwrap_or_else(|_| "55".into());

        let sms = match (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_FROM_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
                api_base: std::env::var("TWILIO_API_BASE")
                    .unwrap_or_else(|_| "https://api.twilio.com".into()),
                timeout_secs: std::env::var("SMS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(10),
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            country_code,
            sms,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
