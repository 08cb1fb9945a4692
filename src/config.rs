use std::env;

/// SMTP transport settings. Absent in local development, in which case
/// the email channel is disabled at startup.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub kafka_bootstrap: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub max_in_flight: usize,
    pub smtp: Option<SmtpConfig>,
    pub frontend_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub email_max_retries: u32,
    pub shutdown_timeout_secs: u64,
    pub canary_token: Option<String>,
}

impl Config {
    /// Resolves configuration from the environment. Missing required
    /// secrets are fatal here; the service refuses to start rather than
    /// run half-configured.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let kafka_bootstrap = env::var("KAFKA_BOOTSTRAP")?;
        let kafka_topic =
            env::var("KAFKA_TOPIC").unwrap_or_else(|_| "price-updates.v1".to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "alert-engine.v1".to_string());

        let max_in_flight = clamp_max_in_flight(
            env::var("MAX_IN_FLIGHT")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
        );

        let smtp = match (env::var("SMTP_HOST").ok(), env::var("SMTP_PASSWORD").ok()) {
            (Some(host), Some(password)) if !host.is_empty() && !password.is_empty() => {
                let from_email = env::var("SMTP_FROM_EMAIL")?;
                Some(SmtpConfig {
                    host,
                    port: env::var("SMTP_PORT")
                        .unwrap_or_else(|_| "587".to_string())
                        .parse()?,
                    username: env::var("SMTP_USERNAME").unwrap_or_else(|_| from_email.clone()),
                    password,
                    from_email,
                    from_name: env::var("SMTP_FROM_NAME")
                        .unwrap_or_else(|_| "Market Alerts".to_string()),
                })
            }
            _ => None,
        };

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let email_max_retries = env::var("EMAIL_MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()?;
        let shutdown_timeout_secs = env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        // Shared secret for the SMTP canary endpoint. Unset means the
        // endpoint denies every request.
        let canary_token = env::var("CANARY_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Config {
            database_url,
            kafka_bootstrap,
            kafka_topic,
            kafka_group_id,
            max_in_flight,
            smtp,
            frontend_url,
            server_host,
            server_port,
            email_max_retries,
            shutdown_timeout_secs,
            canary_token,
        })
    }
}

/// Batch concurrency is bounded to keep memory predictable and give the
/// queue backpressure.
fn clamp_max_in_flight(n: usize) -> usize {
    n.clamp(1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_in_flight_bounds() {
        assert_eq!(clamp_max_in_flight(0), 1);
        assert_eq!(clamp_max_in_flight(4), 4);
        assert_eq!(clamp_max_in_flight(64), 10);
    }
}
