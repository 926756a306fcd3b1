use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    Io(std::io::Error),
    Config(crate::config::ConfigError),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Io(e) => write!(f, "io error: {e}"),
            GatewayError::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(e)
    }
}

impl From<crate::config::ConfigError> for GatewayError {
    fn from(e: crate::config::ConfigError) -> Self {
        GatewayError::Config(e)
    }
}
