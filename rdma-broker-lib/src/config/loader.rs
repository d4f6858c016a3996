use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{BrokerError, Result};

use super::validator::validate_config;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| BrokerError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| BrokerError::Config(format!("failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}
