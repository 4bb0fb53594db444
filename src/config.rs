use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub internal_token: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub worker: WorkerConfig,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub google: GoogleConfig,
    pub notion: NotionConfig,
    pub token_cache_ttl: Option<Duration>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub queue_batch_size: i64,
    pub poll_interval: Duration,
    /// How long a claimed workflow instance stays leased before another worker may resume it.
    pub lease: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub step_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// The integration is disabled once its failure count exceeds this value.
    pub threshold: u32,
    pub reset_on_success: bool,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub sheets_base_url: String,
}

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub base_url: String,
    pub api_version: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            step_timeout: Duration::from_secs(20 * 60),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 4,
            reset_on_success: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let redis_url = env_required("REDIS_URL")?;
        let internal_token = env_required("FORMRELAY_INTERNAL_TOKEN")?;

        let host: IpAddr = env_or("FORMRELAY_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FORMRELAY_HOST: {e}"))?;

        let port: u16 = env_parse("FORMRELAY_PORT", "3000")?;
        let log_level = env_or("FORMRELAY_LOG_LEVEL", "info");

        let worker = WorkerConfig {
            worker_count: env_parse("FORMRELAY_WORKER_COUNT", "4")?,
            queue_batch_size: env_parse("FORMRELAY_QUEUE_BATCH_SIZE", "10")?,
            poll_interval: Duration::from_millis(env_parse("FORMRELAY_POLL_INTERVAL_MS", "1000")?),
            lease: Duration::from_secs(env_parse("FORMRELAY_LEASE_SECS", "1500")?),
        };

        let retry = RetryConfig {
            max_attempts: env_parse("FORMRELAY_RETRY_MAX_ATTEMPTS", "5")?,
            initial_delay: Duration::from_millis(env_parse(
                "FORMRELAY_RETRY_INITIAL_DELAY_MS",
                "1000",
            )?),
            step_timeout: Duration::from_secs(env_parse("FORMRELAY_STEP_TIMEOUT_SECS", "1200")?),
        };
        if retry.max_attempts == 0 {
            return Err("FORMRELAY_RETRY_MAX_ATTEMPTS must be at least 1".to_string());
        }

        let breaker = BreakerConfig {
            threshold: env_parse("FORMRELAY_BREAKER_THRESHOLD", "4")?,
            reset_on_success: env_parse("FORMRELAY_BREAKER_RESET_ON_SUCCESS", "false")?,
        };

        let google = GoogleConfig {
            client_id: env_or("FORMRELAY_GOOGLE_CLIENT_ID", ""),
            client_secret: env_or("FORMRELAY_GOOGLE_CLIENT_SECRET", ""),
            token_url: env_or(
                "FORMRELAY_GOOGLE_TOKEN_URL",
                "https://oauth2.googleapis.com/token",
            ),
            sheets_base_url: env_or(
                "FORMRELAY_SHEETS_BASE_URL",
                "https://sheets.googleapis.com",
            ),
        };

        let notion = NotionConfig {
            base_url: env_or("FORMRELAY_NOTION_BASE_URL", "https://api.notion.com"),
            api_version: env_or("FORMRELAY_NOTION_VERSION", "2022-06-28"),
        };

        let token_cache_secs: u64 = env_parse("FORMRELAY_TOKEN_CACHE_SECS", "0")?;
        let token_cache_ttl = (token_cache_secs > 0).then(|| Duration::from_secs(token_cache_secs));

        let smtp = match (
            std::env::var("FORMRELAY_SMTP_HOST").ok(),
            std::env::var("FORMRELAY_SMTP_PORT").ok(),
            std::env::var("FORMRELAY_SMTP_USER").ok(),
            std::env::var("FORMRELAY_SMTP_PASS").ok(),
            std::env::var("FORMRELAY_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid FORMRELAY_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            redis_url,
            internal_token,
            host,
            port,
            log_level,
            worker,
            retry,
            breaker,
            google,
            notion,
            token_cache_ttl,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
