// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use harness::ReplSetTest;
use replset::admin::{AdminCommand, AdminTarget, CommandReply, Router};
use replset::{RawW, RawWriteConcern};
use slog::Logger;

/// Starts `shardServer` with two data bearing members, plus an arbiter when `psa`.
pub fn new_shard_server(psa: bool, l: &Logger) -> ReplSetTest {
    ReplSetTest::new("shardServer", 2, psa as u64, l)
}

/// Starts a router that can reach `rst`.
pub fn new_router(rst: &ReplSetTest, l: &Logger) -> Router {
    let router = Router::new(l);
    router.register_replica_set(rst.name(), rst.get_primary().clone());
    router
}

pub fn add_shard(url: String) -> AdminCommand {
    AdminCommand::AddShard {
        connection_string: url,
        name: None,
    }
}

/// `{w: "majority", wtimeout: 0}`.
pub fn set_cwwc_majority() -> AdminCommand {
    AdminCommand::SetDefaultRWConcern {
        default_write_concern: Some(RawWriteConcern {
            w: Some(RawW::Str("majority".to_owned())),
            wtimeout: 0,
        }),
    }
}

pub fn assert_command_worked(target: &impl AdminTarget, cmd: AdminCommand) -> CommandReply {
    let reply = target.run_command(cmd.clone());
    assert!(reply.ok, "{:?} failed: {:?}", cmd, reply);
    reply
}

pub fn assert_command_failed(target: &impl AdminTarget, cmd: AdminCommand) -> CommandReply {
    let reply = target.run_command(cmd.clone());
    assert!(!reply.ok, "{:?} should fail: {:?}", cmd, reply);
    reply
}
