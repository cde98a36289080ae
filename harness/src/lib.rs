// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

/*!

Testing harness utilities for `replset`.

A [`Network`] connects a primary's [`ReplicationCoordinator`](replset::ReplicationCoordinator)
to simulated secondaries and arbiters; [`ReplSetTest`] wraps both into a replica set fixture
with the helpers integration tests need.

*/

mod interface;
mod network;

pub use self::{interface::Interface, network::Network, replset_test::ReplSetTest};

/// A logger for tests, tagged with the current test case.
pub fn testing_logger() -> slog::Logger {
    replset::default_logger()
}
