use std::path::Path;

use crate::config::Config;
use crate::error::{BrokerError, Result};

pub fn validate_config(cfg: &Config) -> Result<()> {
    if !Path::new(&cfg.tls.cert_path).exists() {
        return Err(BrokerError::Config(format!(
            "certificate file not found: {}",
            cfg.tls.cert_path
        )));
    }
    if !Path::new(&cfg.tls.key_path).exists() {
        return Err(BrokerError::Config(format!("key file not found: {}", cfg.tls.key_path)));
    }

    let ceiling = cfg.capacity.mode.ceiling();
    if cfg.capacity.max_clients == 0 {
        return Err(BrokerError::Config("max_clients must be non-zero".to_string()));
    }
    if cfg.capacity.max_clients > ceiling {
        return Err(BrokerError::Config(format!(
            "max_clients ({}) exceeds the {:?} mode ceiling ({ceiling})",
            cfg.capacity.max_clients, cfg.capacity.mode
        )));
    }

    if cfg.cq_fanout == 0 {
        return Err(BrokerError::Config("cq_fanout must be non-zero".to_string()));
    }

    Ok(())
}
