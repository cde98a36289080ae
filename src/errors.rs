// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::result;
use thiserror::Error;

/// The base error type for replica set administration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The proposed configuration does not have a higher version than the committed one.
    #[error("stale config: proposed version {proposed} is not newer than committed version {current}")]
    StaleConfig {
        /// Version carried by the rejected proposal.
        proposed: u64,
        /// Version of the currently committed configuration.
        current: u64,
    },
    /// Another reconfiguration is still waiting for a majority.
    #[error("conflicting reconfig: version {pending} has not committed yet")]
    ConflictingReconfig {
        /// Version of the proposal that is in flight.
        pending: u64,
    },
    /// The configuration is invalid.
    #[error("{0}")]
    ConfigInvalid(String),
    /// The write concern is malformed or not allowed in this position.
    #[error("invalid write concern: {0}")]
    InvalidWriteConcern(String),
    /// A response arrived from a node that is not part of any known configuration.
    #[error("cannot step as peer {0} is not found")]
    StepPeerNotFound(u64),
    /// The shard connection string could not be parsed.
    #[error("invalid connection string {0:?}")]
    InvalidConnectionString(String),
    /// No replica set is reachable under the given set name.
    #[error("replica set {0:?} is unreachable")]
    ShardUnreachable(String),
}

impl Error {
    /// A stable, machine readable name for the error kind.
    pub fn code_name(&self) -> &'static str {
        match self {
            Error::StaleConfig { .. } => "StaleConfig",
            Error::ConflictingReconfig { .. } => "ConflictingReconfig",
            Error::ConfigInvalid(_) => "InvalidReplicaSetConfig",
            Error::InvalidWriteConcern(_) => "InvalidWriteConcern",
            Error::StepPeerNotFound(_) => "StepPeerNotFound",
            Error::InvalidConnectionString(_) => "FailedToParse",
            Error::ShardUnreachable(_) => "ShardUnreachable",
        }
    }

    /// Whether retrying with fresh state may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StaleConfig { .. } | Error::ConflictingReconfig { .. }
        )
    }
}

/// A result type that wraps up the replica set errors.
pub type Result<T> = result::Result<T, Error>;
