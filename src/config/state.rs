// Application state module
// Read-only state shared by every connection

use super::types::Config;
use crate::archiver::Archiver;

/// Application state
pub struct AppState {
    pub config: Config,
    pub archiver: Archiver,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            archiver: Archiver::from_config(&config.archiver),
        }
    }

    /// State with a caller-supplied archiver
    #[cfg(test)]
    pub fn with_archiver(config: &Config, archiver: Archiver) -> Self {
        Self {
            config: config.clone(),
            archiver,
        }
    }
}
