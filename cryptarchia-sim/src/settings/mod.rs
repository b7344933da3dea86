pub mod logging;

use self::logging::{CliSettings, FileSettings, LogSettings};
use cryptarchia_consensus::{Config, ConfigError, Note, SecretKey};
use serde::{de::Error as _, Deserialize, Deserializer};
use std::{fs::File, path::PathBuf, time::Duration};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read the simulation configuration file {}", .path.to_string_lossy())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error while parsing the simulation configuration file")]
    Config(#[from] serde_yaml::Error),
    #[error("Invalid consensus parameters")]
    Consensus(#[from] ConfigError),
    #[error("The simulation needs at least one stake holder")]
    NoStakeHolder,
}

#[derive(Debug, StructOpt)]
#[structopt(name = "cryptarchia-sim")]
pub struct CommandLine {
    /// Set the simulation config (in YAML format)
    #[structopt(long = "config", parse(from_os_str))]
    pub config: PathBuf,

    /// Number of slots to run, overrides the configuration file
    #[structopt(long = "slots")]
    pub slots: Option<u64>,

    /// Seed of the block delivery order, overrides the configuration file
    #[structopt(long = "seed")]
    pub seed: Option<u64>,

    #[structopt(flatten)]
    pub log: CliSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakeHolder {
    pub value: u64,
    /// 32 bytes, hex encoded
    #[serde(deserialize_with = "deserialize_secret_key")]
    pub secret_key: SecretKey,
}

fn deserialize_secret_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretKey, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    let mut bytes = [0; 32];
    hex::decode_to_slice(encoded.trim(), &mut bytes).map_err(D::Error::custom)?;
    Ok(SecretKey::from_bytes(bytes))
}

/// The simulation configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    pub consensus: Config,
    pub stake_holders: Vec<StakeHolder>,
    pub slots: u64,
    #[serde(default)]
    pub seed: u64,
    /// seconds a node stays bootstrapping before going online
    #[serde(default)]
    pub bootstrap_period: u64,
    #[serde(default)]
    pub log: Option<FileSettings>,
}

/// Overall settings of the simulation
#[derive(Debug, Clone)]
pub struct Settings {
    pub consensus: Config,
    pub notes: Vec<Note>,
    pub slots: u64,
    pub seed: u64,
    pub bootstrap_period: Duration,
    pub log: LogSettings,
}

impl Settings {
    pub fn load(command_line: &CommandLine) -> Result<Self, Error> {
        let file = File::open(&command_line.config).map_err(|source| Error::ConfigIo {
            path: command_line.config.clone(),
            source,
        })?;
        let config: SimConfig = serde_yaml::from_reader(file)?;
        Self::new(command_line, config)
    }

    pub fn new(command_line: &CommandLine, config: SimConfig) -> Result<Self, Error> {
        config.consensus.validate()?;
        if config.stake_holders.is_empty() {
            return Err(Error::NoStakeHolder);
        }
        let notes = config
            .stake_holders
            .iter()
            .map(|holder| Note::new(holder.value, holder.secret_key))
            .collect();
        Ok(Settings {
            log: LogSettings::new(&command_line.log, config.log.as_ref()),
            consensus: config.consensus,
            notes,
            slots: command_line.slots.unwrap_or(config.slots),
            seed: command_line.seed.unwrap_or(config.seed),
            bootstrap_period: Duration::from_secs(config.bootstrap_period),
        })
    }
}
