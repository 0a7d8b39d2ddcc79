use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};
use shared::{
    errors::{MinerError, MinerResult},
    types::{AccountId, SecretPhrase},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MiningConfig {
    pub pool_mining: bool,

    // pool mode
    pub pool_server: Option<String>,
    pub wallet_server: Option<String>,
    pub numeric_account_id: Option<AccountId>,

    // solo mode
    pub solo_server: Option<String>,
    pub pass_phrase: Option<SecretPhrase>,

    pub plot_paths: Vec<String>,
    pub chunk_part_nonces: Option<u64>,

    pub target_deadline: u64,
    pub connection_timeout: u64,
    pub refresh_interval: u64,
    pub winner_retries_on_async: u32,
    pub winner_retry_interval: u64,
    pub recommit_deadlines: bool,
    pub trigger_server: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            pool_mining: true,
            pool_server: None,
            wallet_server: None,
            numeric_account_id: None,
            solo_server: None,
            pass_phrase: None,
            plot_paths: vec![],
            chunk_part_nonces: None,
            target_deadline: u64::MAX,
            connection_timeout: 18000,
            refresh_interval: 2000,
            winner_retries_on_async: 4,
            winner_retry_interval: 500,
            recommit_deadlines: true,
            trigger_server: true,
        }
    }
}

pub fn load_config_file<P: AsRef<Path>>(config_file: P) -> MinerResult<MiningConfig> {
    let path = config_file.as_ref();
    let file = File::open(path)
        .map_err(|err| MinerError::Config(format!("{} config file not found ({err})", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|err| MinerError::Config(format!("{} is not a valid config file ({err})", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: MiningConfig = serde_json::from_str(
            r#"{"pool_mining":false,"solo_server":"http://localhost:8125","pass_phrase":"secret"}"#,
        )
        .unwrap();
        assert!(!cfg.pool_mining);
        assert_eq!(cfg.solo_server.as_deref(), Some("http://localhost:8125"));
        assert_eq!(cfg.pass_phrase.as_ref().map(|p| p.as_str()), Some("secret"));
        assert_eq!(cfg.connection_timeout, 18000);
        assert_eq!(cfg.refresh_interval, 2000);
        assert_eq!(cfg.target_deadline, u64::MAX);
        assert!(cfg.recommit_deadlines);
    }

    #[test]
    fn pass_phrase_never_renders_in_debug_output() {
        let cfg: MiningConfig =
            serde_json::from_str(r#"{"pool_mining":false,"pass_phrase":"hunter2"}"#).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
