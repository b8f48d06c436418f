use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Json(serde_json::Error),
    Parse { field: &'static str, value: String },
    InvalidZone(u8),
    NoSystem,
    ZoneNotControllable(u8),
    Unconfirmed { command: &'static str, zone: Option<u8> },
    Config(String),
    Io(std::io::Error),
}

impl Error {
    /// Network failure, non-2xx status, timeout, or a body that could not be
    /// turned into a snapshot.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Json(_) | Error::Parse { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidZone(_) | Error::NoSystem | Error::ZoneNotControllable(_)
        )
    }

    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, Error::Unconfirmed { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Json(e) => write!(f, "malformed response: {e}"),
            Error::Parse { field, value } => write!(f, "unrecognized {field}: {value:?}"),
            Error::InvalidZone(index) => write!(f, "invalid zone: {index}"),
            Error::NoSystem => write!(f, "no system snapshot available"),
            Error::ZoneNotControllable(index) => {
                write!(f, "zone {index} is constant-pressure and cannot be controlled")
            }
            Error::Unconfirmed {
                command,
                zone: Some(zone),
            } => write!(f, "{command} for zone {zone} was not applied by the device"),
            Error::Unconfirmed { command, zone: None } => {
                write!(f, "{command} was not applied by the device")
            }
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
