mod client;
mod commands;
mod config;
mod diff;
mod error;
mod logger;
mod protocol;
mod refresh;
mod types;

pub use client::{IZoneClient, IZoneClientBuilder};
pub use commands::{Outcome, SetpointOutcome, ZoneDistribution};
pub use config::{ClientConfig, DEFAULT_REFRESH_MS, MessageLogConfig};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use types::*;
