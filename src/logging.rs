use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_JSON: &str = "RELAYNODE_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat { Pretty, Json }

impl LogFormat {
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var(ENV_LOG_JSON).ok().as_deref())
    }

    fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("1") | Some("true") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// `RUST_LOG` filter (default `info`), written to stderr.
pub fn init_logging() {
    init_logging_with(LogFormat::from_env());
}

pub fn init_logging_with(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = match format {
        LogFormat::Json => fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Pretty => fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
}
