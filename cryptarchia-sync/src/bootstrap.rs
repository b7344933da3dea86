//! When a bootstrapping node switches to the online fork choice rule.

use cryptarchia_consensus::{Follower, Lifecycle};
use std::time::{Duration, SystemTime};
use tracing::info;

/// A node goes online once it has been bootstrapping for the configured
/// period and no download is in flight. There is no way back.
#[derive(Debug, Clone)]
pub struct BootstrapPolicy {
    period: Duration,
    started: SystemTime,
    downloads: usize,
}

impl BootstrapPolicy {
    pub fn new(period: Duration, started: SystemTime) -> Self {
        BootstrapPolicy {
            period,
            started,
            downloads: 0,
        }
    }

    pub fn download_started(&mut self) {
        self.downloads += 1;
    }

    pub fn download_finished(&mut self) {
        self.downloads = self.downloads.saturating_sub(1);
    }

    pub fn downloads_in_flight(&self) -> usize {
        self.downloads
    }

    pub fn ready(&self, now: SystemTime) -> bool {
        let elapsed = now
            .duration_since(self.started)
            .map(|elapsed| elapsed >= self.period)
            .unwrap_or(false);
        elapsed && self.downloads == 0
    }

    /// Switch `follower` online if the time has come. Returns true if the
    /// follower went online on this call.
    pub fn apply(&self, follower: &mut Follower, now: SystemTime) -> bool {
        if follower.lifecycle() == Lifecycle::Online || !self.ready(now) {
            return false;
        }
        match follower.to_online() {
            Ok(()) => {
                info!(lib = %follower.lib(), "bootstrap period over");
                true
            }
            Err(_) => false,
        }
    }
}
