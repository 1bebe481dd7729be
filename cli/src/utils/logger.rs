use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging for the CLI
pub fn init_logger() -> anyhow::Result<()> {
    let timer = ChronoUtc::rfc_3339();

    let format_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(timer)
        .compact();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pricelens=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format_layer)
        .try_init()?;

    Ok(())
}

/// Logger carrying a fixed context prefix, e.g. `VOCABULARY` or `MARKET_DATA`
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
        }
    }

    pub fn info(&self, message: &str) {
        info!("{}: {}", self.context, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}: {}", self.context, message);
    }

    pub fn warn_with_error(&self, message: &str, error: &dyn std::error::Error) {
        warn!("{}: {}: {}", self.context, message, error);
    }

    pub fn debug(&self, message: &str) {
        debug!("{}: {}", self.context, message);
    }
}

/// Performance timing helper
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn log_elapsed(&self, context: &str) {
        debug!("{}: {} completed in {:.1}ms", context, self.name, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_elapsed_time() {
        let timer = Timer::start("sleep");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5.0);
    }

    #[test]
    fn test_init_logger_twice_is_an_error() {
        let _ = init_logger();
        assert!(init_logger().is_err());
    }
}
