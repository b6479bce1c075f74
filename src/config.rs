use rand::distributions::Alphanumeric;
use rand::Rng;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Token, OTP and password settings
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub otp_length: usize,
    pub otp_expiry_minutes: i64,
    pub otp_webhook_url: Option<String>,
    pub password_min_length: usize,
    /// Lets `/auth/register` create admin accounts; meant for bootstrapping
    pub allow_admin_signup: bool,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub log_level: String,
    pub log_format: String,
    pub http_port: u16,
    pub environment: String,
    pub frontend_url: Option<String>,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub maintenance_interval_secs: u64,
    pub no_show_grace_minutes: i64,
    pub audit_log_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32);
        let acquire_timeout_secs = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64);
        let idle_timeout_secs = env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600u64); // 10 minutes
        let max_lifetime_secs = env_parse("DATABASE_MAX_LIFETIME_SECS", 1800u64); // 30 minutes
        let test_before_acquire = env_parse("DATABASE_TEST_BEFORE_ACQUIRE", true);

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/hospital".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl SecurityConfig {
    /// Create security config from environment variables.
    ///
    /// Outside production a missing `JWT_SECRET` is replaced by a random one,
    /// which invalidates every token on restart.
    pub fn from_env(environment: &str) -> Result<Self, String> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment == "production" => {
                return Err("JWT_SECRET is required in production".to_string());
            }
            Err(_) => random_secret(48),
        };

        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters".to_string());
        }

        let access_token_expire_minutes = env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 30i64);
        if !(5..=1440).contains(&access_token_expire_minutes) {
            return Err("ACCESS_TOKEN_EXPIRE_MINUTES must be between 5 and 1440".to_string());
        }

        let refresh_token_expire_days = env_parse("REFRESH_TOKEN_EXPIRE_DAYS", 7i64);
        if !(1..=30).contains(&refresh_token_expire_days) {
            return Err("REFRESH_TOKEN_EXPIRE_DAYS must be between 1 and 30".to_string());
        }

        let otp_length = env_parse("OTP_LENGTH", 6usize);
        if !(4..=10).contains(&otp_length) {
            return Err("OTP_LENGTH must be between 4 and 10".to_string());
        }

        let otp_expiry_minutes = env_parse("OTP_EXPIRY_MINUTES", 10i64);
        if otp_expiry_minutes <= 0 {
            return Err("OTP_EXPIRY_MINUTES must be greater than 0".to_string());
        }

        let password_min_length = env_parse("PASSWORD_MIN_LENGTH", 8usize);
        if !(6..=128).contains(&password_min_length) {
            return Err("PASSWORD_MIN_LENGTH must be between 6 and 128".to_string());
        }

        let otp_webhook_url = env::var("OTP_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let allow_admin_signup = env_parse("ALLOW_ADMIN_SIGNUP", false);

        Ok(Self {
            jwt_secret,
            access_token_expire_minutes,
            refresh_token_expire_days,
            otp_length,
            otp_expiry_minutes,
            otp_webhook_url,
            password_min_length,
            allow_admin_signup,
        })
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: random_secret(48),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            otp_length: 6,
            otp_expiry_minutes: 10,
            otp_webhook_url: None,
            password_min_length: 8,
            allow_admin_signup: false,
        }
    }
}

fn random_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
        let http_port = env_parse("HTTP_PORT", 8000u16);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production", "testing"];
        let environment = environment.to_lowercase();
        if !valid_environments.contains(&environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        let security = SecurityConfig::from_env(&environment)?;

        let frontend_url = env::var("FRONTEND_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let default_page_size = env_parse("DEFAULT_PAGE_SIZE", 20i64);
        let max_page_size = env_parse("MAX_PAGE_SIZE", 100i64);
        if !(1..=100).contains(&default_page_size) {
            return Err("DEFAULT_PAGE_SIZE must be between 1 and 100".to_string());
        }
        if max_page_size < default_page_size {
            return Err("MAX_PAGE_SIZE must not be smaller than DEFAULT_PAGE_SIZE".to_string());
        }

        let maintenance_interval_secs = env_parse("MAINTENANCE_INTERVAL_SECS", 60u64);
        if maintenance_interval_secs == 0 {
            return Err("MAINTENANCE_INTERVAL_SECS must be greater than 0".to_string());
        }

        let no_show_grace_minutes = env_parse("NO_SHOW_GRACE_MINUTES", 30i64);

        let audit_log_dir = env::var("AUDIT_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database,
            security,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            http_port,
            environment,
            frontend_url,
            default_page_size,
            max_page_size,
            maintenance_interval_secs,
            no_show_grace_minutes,
            audit_log_dir,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Origins allowed by CORS for the current environment
    pub fn cors_origins(&self) -> Vec<String> {
        if self.is_development() {
            vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ]
        } else {
            self.frontend_url.iter().cloned().collect()
        }
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            security: SecurityConfig::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            http_port: 8000,
            environment: "development".to_string(),
            frontend_url: None,
            default_page_size: 20,
            max_page_size: 100,
            maintenance_interval_secs: 60,
            no_show_grace_minutes: 30,
            audit_log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8000);
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.default_page_size, 20);
    }

    #[test]
    fn test_generated_secret_is_long_enough() {
        let security = SecurityConfig::default();
        assert!(security.jwt_secret.len() >= 32);
        assert_ne!(security.jwt_secret, SecurityConfig::default().jwt_secret);
        assert!(!security.allow_admin_signup);
    }

    #[test]
    fn test_cors_origins_follow_environment() {
        let mut config = AppConfig::default();
        assert_eq!(config.cors_origins().len(), 2);

        config.environment = "production".to_string();
        assert!(config.cors_origins().is_empty());

        config.frontend_url = Some("https://hospital.example".to_string());
        assert_eq!(config.cors_origins(), vec!["https://hospital.example".to_string()]);
    }
}
