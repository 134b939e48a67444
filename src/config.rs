use dotenvy::dotenv;
use std::env;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Session countdown window in minutes.
    pub timeout_minutes: u64,
    /// Warning lead time before the session expires, in minutes.
    pub warning_minutes: u64,
    /// Quiet window before an inactivity alert is raised, in minutes.
    pub inactivity_timeout_minutes: u64,
    pub track_page_views: bool,
    pub track_user_actions: bool,
    pub rate_limit_max_actions: u32,
    pub rate_limit_window_seconds: u64,
    pub audit_sink_url: String,
    pub access_log_url: String,
    pub approval_directory_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8080")?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            timeout_minutes: parse_var("SESSION_TIMEOUT_MINUTES", "30")?,
            warning_minutes: parse_var("SESSION_WARNING_MINUTES", "5")?,
            inactivity_timeout_minutes: parse_var("INACTIVITY_TIMEOUT_MINUTES", "60")?,
            track_page_views: parse_var("TRACK_PAGE_VIEWS", "true")?,
            track_user_actions: parse_var("TRACK_USER_ACTIONS", "true")?,
            rate_limit_max_actions: parse_var("RATE_LIMIT_MAX_ACTIONS", "10")?,
            rate_limit_window_seconds: parse_var("RATE_LIMIT_WINDOW_SECONDS", "60")?,
            audit_sink_url: required_var("AUDIT_SINK_URL")?,
            access_log_url: required_var("ACCESS_LOG_URL")?,
            approval_directory_url: required_var("APPROVAL_DIRECTORY_URL")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Window consistency checks. Rejecting here keeps the timer and the
    /// rate limiter from ever seeing a degenerate configuration.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timeout_minutes == 0 {
            return Err(AppError::configuration("SESSION_TIMEOUT_MINUTES must be greater than zero"));
        }
        if self.warning_minutes == 0 {
            return Err(AppError::configuration("SESSION_WARNING_MINUTES must be greater than zero"));
        }
        if self.warning_minutes >= self.timeout_minutes {
            return Err(AppError::configuration(
                "SESSION_WARNING_MINUTES must be smaller than SESSION_TIMEOUT_MINUTES",
            ));
        }
        if self.inactivity_timeout_minutes == 0 {
            return Err(AppError::configuration("INACTIVITY_TIMEOUT_MINUTES must be greater than zero"));
        }
        if self.rate_limit_max_actions == 0 {
            return Err(AppError::configuration("RATE_LIMIT_MAX_ACTIONS must be greater than zero"));
        }
        if self.rate_limit_window_seconds == 0 {
            return Err(AppError::configuration("RATE_LIMIT_WINDOW_SECONDS must be greater than zero"));
        }
        Ok(())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_minutes * 60
    }

    pub fn warning_seconds(&self) -> u64 {
        self.warning_minutes * 60
    }

    pub fn inactivity_timeout_seconds(&self) -> u64 {
        self.inactivity_timeout_minutes * 60
    }

    // Smart RUST_LOG construction for Axum and tracing
    pub fn rust_log(&self) -> String {
        match self.log_level.to_lowercase().as_str() {
            "trace" => "trace,axum=trace,tower=trace,hyper=trace,vigil=trace".to_string(),
            "debug" => "debug,axum=debug,tower=debug,hyper=debug,vigil=debug".to_string(),
            "info" => "info,axum=info,tower=info,hyper=info,vigil=info".to_string(),
            "warn" => "warn,axum=warn,tower=warn,hyper=warn,vigil=warn".to_string(),
            "error" => "error,axum=error,tower=error,hyper=error,vigil=error".to_string(),
            _ => "info,axum=info,tower=info,hyper=info,vigil=info".to_string(), // fallback
        }
    }
}

fn required_var(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::configuration(format!("{} must be set", name)))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, AppError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::configuration(format!("{} must be a valid value", name)))
}
