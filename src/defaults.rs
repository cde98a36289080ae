// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use parking_lot::RwLock;
use slog::Logger;

use crate::errors::Result;
use crate::write_concern::WriteConcern;

/// The cluster-wide default write concern at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultsSnapshot {
    /// The default, `None` when unset.
    pub write_concern: Option<WriteConcern>,
    /// Bumped on every observable change. Readers holding an older epoch are stale.
    pub epoch: u64,
}

/// Holds the cluster-wide default write concern (CWWC).
///
/// One store exists per cluster; it is created at bootstrap and shared as an `Arc` with
/// every component that decides based on it. Writers are serialized by a single lock,
/// readers always see the last completed write.
pub struct DefaultWriteConcernStore {
    current: RwLock<DefaultsSnapshot>,
    logger: Logger,
}

impl DefaultWriteConcernStore {
    /// Creates an empty store.
    pub fn new(logger: &Logger) -> DefaultWriteConcernStore {
        DefaultWriteConcernStore {
            current: RwLock::new(DefaultsSnapshot::default()),
            logger: logger.new(o!("component" => "rw-concern-defaults")),
        }
    }

    /// Replaces the default. The write concern must be `"majority"` or a positive
    /// number of members. Setting the current value again changes nothing.
    pub fn set(&self, wc: WriteConcern) -> Result<()> {
        wc.validate_as_default()?;

        let mut current = self.current.write();
        if current.write_concern.as_ref() == Some(&wc) {
            return Ok(());
        }
        current.epoch += 1;
        info!(
            self.logger,
            "default write concern set";
            "write_concern" => %wc,
            "epoch" => current.epoch,
        );
        current.write_concern = Some(wc);
        Ok(())
    }

    /// Returns the default, if one is set.
    pub fn get(&self) -> Option<WriteConcern> {
        self.current.read().write_concern.clone()
    }

    /// Returns the default together with its epoch.
    pub fn snapshot(&self) -> DefaultsSnapshot {
        self.current.read().clone()
    }

    /// Unsets the default.
    pub fn clear(&self) {
        let mut current = self.current.write();
        if current.write_concern.take().is_some() {
            current.epoch += 1;
            info!(self.logger, "default write concern cleared"; "epoch" => current.epoch);
        }
    }
}
