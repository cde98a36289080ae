// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

/*!

## Replica set reconfiguration and shard admission

This crate holds the decision core a sharded cluster consults before it lets a
replica set join as a shard:

* [`ReplicaSetConfig`] describes the members of a replica set and how they vote.
* [`quorum::evaluate`] decides whether a [`WriteConcern`] can be satisfied by a
  configuration, and how many acknowledgments it needs.
* [`DefaultWriteConcernStore`] keeps the cluster-wide default write concern (CWWC).
* [`ReplicationCoordinator`] drives a versioned reconfiguration through a majority
  of the *new* configuration and lets callers wait for commitment and replication.
* [`ShardAdmissionGate`] admits or rejects a candidate shard.

Transport, persistence and process management are left to the embedding
application. The `harness` workspace member provides an in-memory network for
tests.

## Admitting a shard

```rust
use std::sync::Arc;
use replset::prelude::*;

let logger = replset::default_logger();
let store = Arc::new(DefaultWriteConcernStore::new(&logger));
let gate = ShardAdmissionGate::new(store.clone(), &logger);

// Two data bearing members and an arbiter.
let psa = ReplicaSetConfig::new(
    "shardServer",
    1,
    vec![
        Member::new(0, "shard-0:27017"),
        Member::new(1, "shard-1:27017"),
        Member::arbiter(2, "shard-2:27017"),
    ],
);
let descriptor = ShardDescriptor::new(
    ConnectionString::parse("shardServer/shard-0:27017").unwrap(),
    psa,
);

// Without a cluster-wide default the implicit default is unsafe for PSA sets.
assert_eq!(
    gate.admit(&descriptor),
    Admission::Rejected(RejectReason::ImplicitDefaultUnsafeForPSA),
);

// Setting one resolves it.
store.set(WriteConcern::majority()).unwrap();
assert!(gate.admit(&descriptor).is_admitted());
```

## Reconfiguring

A reconfiguration is proposed on the primary with a strictly higher version, and
commits once a majority of the voting members of the resulting configuration have
installed it:

```rust
use std::time::Duration;
use replset::prelude::*;

let logger = replset::default_logger();
let initial = ReplicaSetConfig::new(
    "rs0",
    1,
    vec![Member::new(1, "rs0-1:27017")],
);
let coordinator = ReplicationCoordinator::new(&Config::new(1), initial, &logger).unwrap();

let next = coordinator
    .committed_config()
    .with_member(Member::new(2, "rs0-2:27017"));
coordinator.propose(next).unwrap();

// The new member has not acknowledged yet, so the change is still pending.
assert!(!coordinator.is_config_committed());
let status = coordinator.await_committed(Duration::from_millis(10));
assert_eq!(status, CommitStatus::Pending { version: 2 });
```

*/

#![deny(clippy::all)]
#![warn(missing_docs)]

#[macro_use]
extern crate slog;

pub mod admin;
mod admission;
mod config;
mod coordinator;
mod defaults;
mod errors;
mod message;
pub mod quorum;
mod reconfig;
mod replset;
mod status;
mod write_concern;

pub use self::admission::{
    Admission, ConnectionString, RejectReason, ShardAdmissionGate, ShardDescriptor, ShardRecord,
};
pub use self::config::Config;
pub use self::coordinator::{CommitStatus, ReplicationCoordinator, ReplicationStatus, TopologySource};
pub use self::defaults::{DefaultWriteConcernStore, DefaultsSnapshot};
pub use self::errors::{Error, Result};
pub use self::message::{Message, MessageType};
pub use self::quorum::majority::Configuration as MajorityConfig;
pub use self::quorum::{Evaluation, MajorityRule, VoteResult};
pub use self::replset::{Member, ReplicaSetConfig};
pub use self::status::{MemberStatus, ProposalState, Status};
pub use self::write_concern::{RawW, RawWriteConcern, WriteConcern, W};

pub mod prelude {
    //! A "prelude" for crates using the `replset` crate.
    //!
    //! ```
    //! use replset::prelude::*;
    //! ```

    pub use crate::admin::{AdminCommand, AdminTarget, CommandReply, ReplyBody, Router};

    pub use crate::admission::{
        Admission, ConnectionString, RejectReason, ShardAdmissionGate, ShardDescriptor,
    };

    pub use crate::config::Config;

    pub use crate::coordinator::{
        CommitStatus, ReplicationCoordinator, ReplicationStatus, TopologySource,
    };

    pub use crate::defaults::DefaultWriteConcernStore;

    pub use crate::message::{Message, MessageType};

    pub use crate::replset::{Member, ReplicaSetConfig};

    pub use crate::status::Status;

    pub use crate::write_concern::{WriteConcern, W};
}

/// The default logger: a compact terminal drain filtered by `RUST_LOG`.
///
/// The root is built once; every call returns a child tagged with the current
/// thread name, which is the test case name under `cargo test`.
#[cfg(feature = "default-logger")]
pub fn default_logger() -> slog::Logger {
    use slog::Drain;
    use std::sync::{Mutex, OnceLock};

    static LOGGER: OnceLock<slog::Logger> = OnceLock::new();

    let logger = LOGGER.get_or_init(|| {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::CompactFormat::new(decorator).build();
        let drain = slog_envlogger::new(drain);
        slog::Logger::root(Mutex::new(drain).fuse(), o!())
    });
    if let Some(case) = std::thread::current()
        .name()
        .and_then(|v| v.split(':').last())
    {
        logger.new(o!("case" => case.to_string()))
    } else {
        logger.new(o!())
    }
}

type DefaultHashBuilder = std::hash::BuildHasherDefault<fxhash::FxHasher>;
type HashMap<K, V> = std::collections::HashMap<K, V, DefaultHashBuilder>;
type HashSet<K> = std::collections::HashSet<K, DefaultHashBuilder>;

/// Get the majority number of given nodes count.
#[inline]
pub fn majority(total: usize) -> usize {
    (total / 2) + 1
}
