// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use getset::{CopyGetters, Getters};
use parking_lot::Mutex;
use slog::Logger;

use crate::defaults::DefaultWriteConcernStore;
use crate::errors::{Error, Result};
use crate::quorum::{self, MajorityRule};
use crate::replset::{self, ReplicaSetConfig};
use crate::write_concern::WriteConcern;

/// A replica set connection string, `setName/host1:port,host2:port`.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct ConnectionString {
    /// The replica set name.
    #[get = "pub"]
    set_name: String,
    /// Seed hosts, in the order given.
    #[get = "pub"]
    hosts: Vec<String>,
}

impl ConnectionString {
    /// Parses a connection string. Shards must be replica sets, so the set name is
    /// required.
    pub fn parse(s: &str) -> Result<ConnectionString> {
        let invalid = || Error::InvalidConnectionString(s.to_owned());
        let (set_name, hosts) = s.split_once('/').ok_or_else(invalid)?;
        if set_name.is_empty() || hosts.is_empty() {
            return Err(invalid());
        }
        let hosts: Vec<String> = hosts.split(',').map(|h| h.trim().to_owned()).collect();
        if !hosts.iter().all(|h| replset::is_host_and_port(h)) {
            return Err(invalid());
        }
        Ok(ConnectionString {
            set_name: set_name.to_owned(),
            hosts,
        })
    }

    /// The connection string listing every member of `cfg`.
    pub fn for_config(cfg: &ReplicaSetConfig) -> ConnectionString {
        ConnectionString {
            set_name: cfg.name().clone(),
            hosts: cfg.members().iter().map(|m| m.host().clone()).collect(),
        }
    }
}

impl Display for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.set_name, self.hosts.join(","))
    }
}

/// A candidate shard: where it was reached and the topology it reported.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct ShardDescriptor {
    /// The shard name, the set name unless given explicitly.
    #[get = "pub"]
    name: String,
    /// The connection string the shard was added with.
    #[get = "pub"]
    connection: ConnectionString,
    /// The committed config reported by the candidate's primary.
    #[get = "pub"]
    topology: ReplicaSetConfig,
}

impl ShardDescriptor {
    /// Creates a descriptor named after the replica set.
    pub fn new(connection: ConnectionString, topology: ReplicaSetConfig) -> ShardDescriptor {
        ShardDescriptor {
            name: connection.set_name.clone(),
            connection,
            topology,
        }
    }

    /// Returns the descriptor with an explicit shard name.
    pub fn with_name(mut self, name: impl Into<String>) -> ShardDescriptor {
        self.name = name.into();
        self
    }
}

/// Why a shard was turned away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// No cluster-wide default write concern is set and the candidate is a PSA set, for
    /// which the implicit default would be `{w: 1}`.
    ImplicitDefaultUnsafeForPSA,
    /// The candidate cannot satisfy the cluster-wide default write concern.
    WriteConcernUnsatisfiable(WriteConcern),
    /// The connection string names a different replica set than the one that answered.
    SetNameMismatch {
        /// Set name from the connection string.
        expected: String,
        /// Set name reported by the candidate.
        found: String,
    },
    /// A seed host is not a member of the candidate set.
    HostNotInSet(String),
    /// The shard name already belongs to another replica set.
    ShardNameInUse(String),
    /// The replica set is already a shard under another name.
    ReplicaSetInUse {
        /// Name of the existing shard.
        shard: String,
    },
}

impl RejectReason {
    /// A stable, machine readable name for the reason.
    pub fn code_name(&self) -> &'static str {
        match self {
            RejectReason::ImplicitDefaultUnsafeForPSA => "ImplicitDefaultUnsafeForPSA",
            RejectReason::WriteConcernUnsatisfiable(_) => "UnsatisfiableWriteConcern",
            RejectReason::SetNameMismatch { .. } => "SetNameMismatch",
            RejectReason::HostNotInSet(_) => "HostNotInSet",
            RejectReason::ShardNameInUse(_) | RejectReason::ReplicaSetInUse { .. } => {
                "IllegalOperation"
            }
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ImplicitDefaultUnsafeForPSA => write!(
                f,
                "cannot add a Primary-Secondary-Arbiter shard while the implicit default \
                 write concern is {{w: 1}}; set a cluster-wide default write concern or \
                 add data bearing members first"
            ),
            RejectReason::WriteConcernUnsatisfiable(wc) => write!(
                f,
                "shard cannot satisfy the cluster-wide default write concern {}",
                wc
            ),
            RejectReason::SetNameMismatch { expected, found } => write!(
                f,
                "connection string names set {} but the shard reports {}",
                expected, found
            ),
            RejectReason::HostNotInSet(host) => {
                write!(f, "host {} is not a member of the shard's replica set", host)
            }
            RejectReason::ShardNameInUse(name) => {
                write!(f, "shard name {} is already in use", name)
            }
            RejectReason::ReplicaSetInUse { shard } => {
                write!(f, "replica set is already a member of shard {}", shard)
            }
        }
    }
}

/// The result of an admission attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The shard is part of the cluster under `name`.
    Admitted {
        /// The shard name.
        name: String,
    },
    /// The shard was turned away.
    Rejected(RejectReason),
}

impl Admission {
    /// Whether the shard was admitted.
    #[inline]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// A shard that was admitted.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct ShardRecord {
    /// The shard name.
    #[get = "pub"]
    name: String,
    /// The replica set backing the shard.
    #[get = "pub"]
    set_name: String,
    /// The connection string it was added with.
    #[get = "pub"]
    connection: ConnectionString,
    /// The config version the shard was admitted with.
    #[get_copy = "pub"]
    config_version: u64,
}

/// Decides whether a candidate replica set may join the cluster as a shard.
///
/// The gate only reads the cluster-wide default write concern; it records the shards it
/// admits.
pub struct ShardAdmissionGate {
    defaults: Arc<DefaultWriteConcernStore>,
    shards: Mutex<BTreeMap<String, ShardRecord>>,
    logger: Logger,
}

impl ShardAdmissionGate {
    /// Creates a gate that consults `defaults`.
    pub fn new(defaults: Arc<DefaultWriteConcernStore>, logger: &Logger) -> ShardAdmissionGate {
        ShardAdmissionGate {
            defaults,
            shards: Mutex::new(BTreeMap::new()),
            logger: logger.new(o!("component" => "shard-admission")),
        }
    }

    /// Admits or rejects `shard`.
    ///
    /// With a cluster-wide default write concern set, the candidate must be able to
    /// satisfy it. Without one, PSA candidates are rejected since their implicit default
    /// would not be a majority write concern. Re-adding an admitted shard under the same
    /// name is a no-op that admits again.
    pub fn admit(&self, shard: &ShardDescriptor) -> Admission {
        let topology = &shard.topology;
        if let Some(reason) = check_connection(shard) {
            return self.reject(shard, reason);
        }

        let mut shards = self.shards.lock();
        if let Some(existing) = shards.get(&shard.name) {
            if existing.set_name == *topology.name() {
                debug!(self.logger, "shard already admitted"; "shard" => &shard.name);
                return Admission::Admitted {
                    name: shard.name.clone(),
                };
            }
            return self.reject(shard, RejectReason::ShardNameInUse(shard.name.clone()));
        }
        if let Some(existing) = shards.values().find(|r| r.set_name == *topology.name()) {
            let reason = RejectReason::ReplicaSetInUse {
                shard: existing.name.clone(),
            };
            return self.reject(shard, reason);
        }

        match self.defaults.get() {
            Some(wc) => {
                let eval = quorum::evaluate(topology, &wc, MajorityRule::Literal);
                if !eval.satisfiable {
                    return self.reject(shard, RejectReason::WriteConcernUnsatisfiable(wc));
                }
            }
            None => {
                if topology.is_psa() {
                    return self.reject(shard, RejectReason::ImplicitDefaultUnsafeForPSA);
                }
            }
        }

        shards.insert(
            shard.name.clone(),
            ShardRecord {
                name: shard.name.clone(),
                set_name: topology.name().clone(),
                connection: shard.connection.clone(),
                config_version: topology.version(),
            },
        );
        info!(
            self.logger,
            "shard admitted";
            "shard" => &shard.name,
            "topology" => %topology,
        );
        Admission::Admitted {
            name: shard.name.clone(),
        }
    }

    /// The admitted shards, ordered by name.
    pub fn shards(&self) -> Vec<ShardRecord> {
        self.shards.lock().values().cloned().collect()
    }

    fn reject(&self, shard: &ShardDescriptor, reason: RejectReason) -> Admission {
        warn!(
            self.logger,
            "shard rejected";
            "shard" => &shard.name,
            "topology" => %shard.topology,
            "reason" => reason.code_name(),
        );
        Admission::Rejected(reason)
    }
}

fn check_connection(shard: &ShardDescriptor) -> Option<RejectReason> {
    let conn = &shard.connection;
    if conn.set_name != *shard.topology.name() {
        return Some(RejectReason::SetNameMismatch {
            expected: conn.set_name.clone(),
            found: shard.topology.name().clone(),
        });
    }
    conn.hosts
        .iter()
        .find(|h| shard.topology.member_by_host(h).is_none())
        .map(|h| RejectReason::HostNotInSet(h.clone()))
}
