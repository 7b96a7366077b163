use std::path::Path;

use cookie_cell::MsgAddress;
use cookie_nft::FeeConfig;
use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// Contents of the `--config` TOML file.
///
/// ```toml
/// collection = "EQ..."
/// workchain = 0
///
/// [fees]
/// min_storage = 50000000
/// gas_per_item = 15000000
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Default collection address for collection messages.
    pub collection: Option<String>,
    #[serde(default)]
    pub workchain: i8,
    #[serde(default)]
    pub fees: FeeConfig,
}

impl Config {
    /// Collection address given on the command line, else the configured one.
    pub fn collection_address(&self, cli: Option<&str>) -> CliResult<Option<MsgAddress>> {
        cli.or(self.collection.as_deref())
            .map(|s| MsgAddress::from_string(s).map_err(CliError::from))
            .transpose()
    }
}

/// Load the config file; no path means defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;

    toml::from_str(&content).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
}
