// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::time::Duration;

use super::errors::{Error, Result};

/// Config contains the parameters to start a replication coordinator.
#[derive(Clone, Debug)]
pub struct Config {
    /// The identity of the local member, the one proposals are made on. It must name a
    /// voting, data bearing member of the initial configuration.
    pub id: u64,

    /// Refuse reconfigurations that add or remove more than one voting member at once.
    ///
    /// Disabling this only makes sense for bootstrap and tests; the commit rule relies on
    /// consecutive configurations sharing a majority.
    pub strict_reconfig: bool,

    /// How long administrative helpers wait for a proposal to commit before reporting it
    /// as pending.
    pub commit_timeout: Duration,

    /// How long administrative helpers wait for every voting member to install the
    /// committed configuration.
    pub replication_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: 0,
            strict_reconfig: true,
            commit_timeout: Duration::from_secs(10),
            replication_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Creates a new config.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Runs validations against the config.
    pub fn validate(&self) -> Result<()> {
        if self.commit_timeout == Duration::from_secs(0) {
            return Err(Error::ConfigInvalid(
                "commit timeout must be greater than 0".to_owned(),
            ));
        }

        if self.replication_timeout < self.commit_timeout {
            return Err(Error::ConfigInvalid(format!(
                "replication timeout {:?} must not be less than commit timeout {:?}",
                self.replication_timeout, self.commit_timeout
            )));
        }

        Ok(())
    }
}
