use crate::config::RoutePolicyConfig;
use crate::errors::{AppError, Result};
use chrono::Duration;

/// Admission policy bound to a route: at most `max_requests` per `window`.
///
/// Validated once on construction; never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    max_requests: u64,
    window: Duration,
    window_std: std::time::Duration,
}

impl Policy {
    /// Create a new policy, rejecting zero limits and zero or unrepresentable windows
    pub fn new(max_requests: u64, window: std::time::Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(AppError::Configuration(
                "Rate limit max_requests must be at least 1".to_string(),
            ));
        }

        if window.is_zero() {
            return Err(AppError::Configuration(
                "Rate limit window must be positive".to_string(),
            ));
        }

        let chrono_window = Duration::from_std(window).map_err(|e| {
            AppError::Configuration(format!("Rate limit window out of range: {}", e))
        })?;

        Ok(Self {
            max_requests,
            window: chrono_window,
            window_std: window,
        })
    }

    pub fn per_minute(max_requests: u64) -> Result<Self> {
        Self::new(max_requests, std::time::Duration::from_secs(60))
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_std(&self) -> std::time::Duration {
        self.window_std
    }

    /// Human readable window, e.g. `60s`
    pub fn window_label(&self) -> String {
        format!("{}s", self.window_std.as_secs())
    }
}

impl TryFrom<&RoutePolicyConfig> for Policy {
    type Error = AppError;

    fn try_from(config: &RoutePolicyConfig) -> Result<Self> {
        Policy::new(
            config.max_requests,
            std::time::Duration::from_secs(config.window_seconds),
        )
    }
}
