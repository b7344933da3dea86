use chain_time::{Epoch, Slot, SlotDuration, TimeEra, TimeFrame, Timeline};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wall clock parameters of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    /// how long a slot lasts, in seconds
    pub slot_duration: SlotDuration,
    /// start of the first slot, unix timestamp in seconds
    pub chain_start_time: u64,
}

/// Protocol parameters of the consensus
///
/// The three epoch periods are expressed in base periods, see
/// [`Config::base_period_length`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// security parameter: depth after which a block is immutable
    pub k: u64,
    /// expected fraction of occupied slots (`f`)
    pub active_slot_coeff: f64,
    pub epoch_stake_distribution_stabilization: u64,
    pub epoch_period_nonce_buffer: u64,
    pub epoch_period_nonce_stabilization: u64,
    pub initial_total_active_stake: u64,
    pub total_active_stake_learning_rate: f64,
    pub time: TimeConfig,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("the security parameter k cannot be zero")]
    ZeroSecurityParameter,

    #[error("invalid active slot coefficient {0}, should be in range (0,1)")]
    ActiveSlotCoeffOutOfRange(f64),

    #[error("invalid total active stake learning rate {0}, should be in range (0,1]")]
    LearningRateOutOfRange(f64),

    #[error("k = {k} with f = {active_slot_coeff} gives an empty base period")]
    ZeroBasePeriod { k: u64, active_slot_coeff: f64 },

    #[error("the nonce snapshot cannot be taken at the very start of an epoch, stake stabilization and nonce buffer are both zero")]
    NonceSnapshotAtEpochStart,
}

impl Config {
    /// protocol parameters of cryptarchia v0.0.1
    pub fn cryptarchia_v0_0_1(initial_total_active_stake: u64) -> Self {
        Config {
            k: 2160,
            active_slot_coeff: 0.05,
            epoch_stake_distribution_stabilization: 3,
            epoch_period_nonce_buffer: 3,
            epoch_period_nonce_stabilization: 4,
            initial_total_active_stake,
            total_active_stake_learning_rate: 0.8,
            time: TimeConfig {
                slot_duration: SlotDuration::default(),
                chain_start_time: 0,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroSecurityParameter);
        }
        // written so that NaN is refused too
        if !(self.active_slot_coeff > 0.0 && self.active_slot_coeff < 1.0) {
            return Err(ConfigError::ActiveSlotCoeffOutOfRange(
                self.active_slot_coeff,
            ));
        }
        let rate = self.total_active_stake_learning_rate;
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(ConfigError::LearningRateOutOfRange(rate));
        }
        if self.base_period_length() == 0 {
            return Err(ConfigError::ZeroBasePeriod {
                k: self.k,
                active_slot_coeff: self.active_slot_coeff,
            });
        }
        if self.epoch_stake_distribution_stabilization + self.epoch_period_nonce_buffer == 0 {
            return Err(ConfigError::NonceSnapshotAtEpochStart);
        }
        Ok(())
    }

    /// `floor(k / f)`
    pub fn base_period_length(&self) -> u64 {
        (self.k as f64 / self.active_slot_coeff).floor() as u64
    }

    /// offset, from the start of an epoch, of the slot at which the nonce
    /// snapshot of the next epoch is taken
    pub fn epoch_relative_nonce_slot(&self) -> u64 {
        (self.epoch_stake_distribution_stabilization + self.epoch_period_nonce_buffer)
            * self.base_period_length()
    }

    pub fn epoch_length(&self) -> u64 {
        (self.epoch_stake_distribution_stabilization
            + self.epoch_period_nonce_buffer
            + self.epoch_period_nonce_stabilization)
            * self.base_period_length()
    }

    /// the window, in slots after a fork, over which chain density is measured
    pub fn s(&self) -> u64 {
        3 * self.base_period_length()
    }

    pub fn era(&self) -> TimeEra {
        TimeEra::new(self.epoch_length())
    }

    pub fn epoch(&self, slot: Slot) -> Epoch {
        slot.epoch(&self.era())
    }

    pub fn time_frame(&self) -> TimeFrame {
        TimeFrame::new(
            Timeline::from_unix_secs(self.time.chain_start_time),
            self.time.slot_duration,
        )
    }

    /// slot in progress at the given unix timestamp (in seconds)
    pub fn slot_at_timestamp(&self, timestamp_secs: u64) -> Option<Slot> {
        Slot::from_unix_timestamp(&self.time_frame(), timestamp_secs)
    }
}
