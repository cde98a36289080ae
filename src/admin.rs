// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

//! Structured administrative commands and their replies.
//!
//! Failures never surface as Rust errors here; every reply carries `ok` and, when it is
//! false, a stable `code_name` plus a human readable `errmsg`.

use std::convert::TryFrom;
use std::sync::Arc;

use parking_lot::RwLock;
use slog::Logger;

use crate::admission::{
    Admission, ConnectionString, ShardAdmissionGate, ShardDescriptor, ShardRecord,
};
use crate::coordinator::{ReplicationCoordinator, TopologySource};
use crate::defaults::{DefaultWriteConcernStore, DefaultsSnapshot};
use crate::errors::Error;
use crate::replset::ReplicaSetConfig;
use crate::status::Status;
use crate::write_concern::{RawWriteConcern, WriteConcern};
use crate::HashMap;

/// An administrative command.
#[derive(Clone, Debug, PartialEq)]
pub enum AdminCommand {
    /// Adds a replica set as a shard.
    AddShard {
        /// `setName/host:port[,host:port...]`.
        connection_string: String,
        /// Shard name, the set name if absent.
        name: Option<String>,
    },
    /// Sets the cluster-wide default write concern, or clears it with `None`.
    SetDefaultRWConcern {
        /// The new default.
        default_write_concern: Option<RawWriteConcern>,
    },
    /// Reads the cluster-wide default write concern.
    GetDefaultRWConcern,
    /// Lists the admitted shards.
    ListShards,
    /// Proposes a new replica set config.
    ReplSetReconfig {
        /// The proposed config.
        config: ReplicaSetConfig,
    },
    /// Reads the committed replica set config.
    ReplSetGetConfig,
    /// Reads the reconfiguration status.
    ReplSetGetStatus,
}

impl AdminCommand {
    /// The command name as an operator would type it.
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::AddShard { .. } => "addShard",
            AdminCommand::SetDefaultRWConcern { .. } => "setDefaultRWConcern",
            AdminCommand::GetDefaultRWConcern => "getDefaultRWConcern",
            AdminCommand::ListShards => "listShards",
            AdminCommand::ReplSetReconfig { .. } => "replSetReconfig",
            AdminCommand::ReplSetGetConfig => "replSetGetConfig",
            AdminCommand::ReplSetGetStatus => "replSetGetStatus",
        }
    }
}

/// The payload of a successful reply.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyBody {
    /// Nothing to report.
    Empty,
    /// The shard that was added.
    ShardAdded {
        /// Its name.
        name: String,
    },
    /// The cluster-wide default write concern.
    DefaultRWConcern(DefaultsSnapshot),
    /// The admitted shards.
    Shards(Vec<ShardRecord>),
    /// The version a reconfig was proposed at.
    Reconfig {
        /// The proposed version.
        version: u64,
    },
    /// A replica set config.
    Config(ReplicaSetConfig),
    /// A reconfiguration status.
    Status(Status),
}

/// The reply to an [`AdminCommand`].
#[derive(Clone, Debug, PartialEq)]
pub struct CommandReply {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Machine readable failure reason.
    pub code_name: Option<&'static str>,
    /// Human readable failure reason.
    pub errmsg: Option<String>,
    /// The result, `ReplyBody::Empty` on failure.
    pub body: ReplyBody,
}

impl CommandReply {
    /// A successful reply.
    pub fn success(body: ReplyBody) -> CommandReply {
        CommandReply {
            ok: true,
            code_name: None,
            errmsg: None,
            body,
        }
    }

    /// A failed reply.
    pub fn failure(code_name: &'static str, errmsg: impl Into<String>) -> CommandReply {
        CommandReply {
            ok: false,
            code_name: Some(code_name),
            errmsg: Some(errmsg.into()),
            body: ReplyBody::Empty,
        }
    }

    fn not_found(cmd: &AdminCommand) -> CommandReply {
        CommandReply::failure(
            "CommandNotFound",
            format!("no such command: {}", cmd.name()),
        )
    }
}

impl From<Error> for CommandReply {
    fn from(e: Error) -> CommandReply {
        CommandReply::failure(e.code_name(), e.to_string())
    }
}

/// Something that answers administrative commands.
pub trait AdminTarget {
    /// Runs `cmd` to completion and replies. Never blocks on replication.
    fn run_command(&self, cmd: AdminCommand) -> CommandReply;
}

/// The cluster front end: owns the default write concern and the admitted shards, and
/// knows how to reach the replica sets that may become shards.
pub struct Router {
    defaults: Arc<DefaultWriteConcernStore>,
    gate: ShardAdmissionGate,
    replica_sets: RwLock<HashMap<String, Arc<dyn TopologySource>>>,
    logger: Logger,
}

impl Router {
    /// Creates a router with no default write concern and no shards.
    pub fn new(logger: &Logger) -> Router {
        let logger = logger.new(o!("component" => "router"));
        let defaults = Arc::new(DefaultWriteConcernStore::new(&logger));
        let gate = ShardAdmissionGate::new(defaults.clone(), &logger);
        Router {
            defaults,
            gate,
            replica_sets: RwLock::new(HashMap::default()),
            logger,
        }
    }

    /// Makes the replica set `name` reachable for `AddShard`.
    pub fn register_replica_set(&self, name: impl Into<String>, source: Arc<dyn TopologySource>) {
        let name = name.into();
        debug!(self.logger, "replica set registered"; "set" => &name);
        self.replica_sets.write().insert(name, source);
    }

    /// The cluster-wide default write concern store.
    pub fn store(&self) -> &Arc<DefaultWriteConcernStore> {
        &self.defaults
    }

    /// The shard admission gate.
    pub fn gate(&self) -> &ShardAdmissionGate {
        &self.gate
    }

    fn add_shard(&self, connection_string: &str, name: Option<String>) -> CommandReply {
        let conn = match ConnectionString::parse(connection_string) {
            Ok(conn) => conn,
            Err(e) => return e.into(),
        };
        let source = match self.replica_sets.read().get(conn.set_name()) {
            Some(source) => source.clone(),
            None => return Error::ShardUnreachable(conn.set_name().clone()).into(),
        };
        let mut shard = ShardDescriptor::new(conn, source.committed_config());
        if let Some(name) = name {
            shard = shard.with_name(name);
        }
        match self.gate.admit(&shard) {
            Admission::Admitted { name } => CommandReply::success(ReplyBody::ShardAdded { name }),
            Admission::Rejected(reason) => {
                CommandReply::failure(reason.code_name(), reason.to_string())
            }
        }
    }

    fn set_default_rw_concern(&self, raw: Option<RawWriteConcern>) -> CommandReply {
        let res = match raw {
            Some(raw) => WriteConcern::try_from(raw).and_then(|wc| self.defaults.set(wc)),
            None => {
                self.defaults.clear();
                Ok(())
            }
        };
        match res {
            Ok(()) => CommandReply::success(ReplyBody::DefaultRWConcern(self.defaults.snapshot())),
            Err(e) => e.into(),
        }
    }
}

impl AdminTarget for Router {
    fn run_command(&self, cmd: AdminCommand) -> CommandReply {
        match cmd {
            AdminCommand::AddShard {
                connection_string,
                name,
            } => self.add_shard(&connection_string, name),
            AdminCommand::SetDefaultRWConcern {
                default_write_concern,
            } => self.set_default_rw_concern(default_write_concern),
            AdminCommand::GetDefaultRWConcern => {
                CommandReply::success(ReplyBody::DefaultRWConcern(self.defaults.snapshot()))
            }
            AdminCommand::ListShards => CommandReply::success(ReplyBody::Shards(self.gate.shards())),
            cmd => CommandReply::not_found(&cmd),
        }
    }
}

impl AdminTarget for ReplicationCoordinator {
    fn run_command(&self, cmd: AdminCommand) -> CommandReply {
        match cmd {
            AdminCommand::ReplSetReconfig { config } => match self.propose(config) {
                Ok(version) => CommandReply::success(ReplyBody::Reconfig { version }),
                Err(e) => e.into(),
            },
            AdminCommand::ReplSetGetConfig => {
                CommandReply::success(ReplyBody::Config(self.committed_config()))
            }
            AdminCommand::ReplSetGetStatus => CommandReply::success(ReplyBody::Status(self.status())),
            cmd => CommandReply::not_found(&cmd),
        }
    }
}
