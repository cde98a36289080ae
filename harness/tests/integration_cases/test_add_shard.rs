// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use harness::{testing_logger, ReplSetTest};
use replset::admin::{AdminCommand, ReplyBody};
use replset::{CommitStatus, ReplicationStatus};

use crate::test_util::*;

#[derive(Clone, Copy, Debug)]
enum Fix {
    SetCwwc,
    Reconfig,
}

fn add_non_arbiter_node(id: u64, rst: &mut ReplSetTest) {
    let (committed, replicated) = rst.add_data_member(id).unwrap();
    let version = rst.get_primary().committed_config().version();
    assert_eq!(committed, CommitStatus::Committed { version });
    assert!(rst.get_primary().is_config_committed());
    assert_eq!(replicated, ReplicationStatus::Replicated { version });
}

fn test_add_shard(cwwc_set: bool, is_psa: bool, fix: Option<Fix>) {
    let l = testing_logger();
    let mut rst = new_shard_server(is_psa, &l);
    let router = new_router(&rst, &l);

    if cwwc_set {
        assert_command_worked(&router, set_cwwc_majority());
    }

    if !cwwc_set && is_psa {
        let reply = assert_command_failed(&router, add_shard(rst.url()));
        assert_eq!(reply.code_name, Some("ImplicitDefaultUnsafeForPSA"));
        assert!(router.gate().shards().is_empty());

        match fix.expect("a PSA shard without a default needs a fix") {
            Fix::SetCwwc => {
                assert_command_worked(&router, set_cwwc_majority());
            }
            Fix::Reconfig => {
                add_non_arbiter_node(3, &mut rst);
                add_non_arbiter_node(4, &mut rst);
                assert!(!rst.get_primary().committed_config().is_psa());
            }
        }
    }

    let reply = assert_command_worked(&router, add_shard(rst.url()));
    assert_eq!(
        reply.body,
        ReplyBody::ShardAdded {
            name: "shardServer".to_owned()
        }
    );
    assert_eq!(router.gate().shards().len(), 1);
}

#[test]
fn test_add_shard_cwwc_set_non_psa() {
    test_add_shard(true, false, None);
}

#[test]
fn test_add_shard_cwwc_set_psa() {
    test_add_shard(true, true, None);
}

#[test]
fn test_add_shard_cwwc_unset_non_psa() {
    test_add_shard(false, false, None);
}

#[test]
fn test_add_shard_cwwc_unset_psa_fixed_by_setting_cwwc() {
    test_add_shard(false, true, Some(Fix::SetCwwc));
}

#[test]
fn test_add_shard_cwwc_unset_psa_fixed_by_reconfig() {
    test_add_shard(false, true, Some(Fix::Reconfig));
}

// Adding a single data bearing member already takes the set out of the PSA shape.
#[test]
fn test_add_shard_after_one_data_member() {
    let l = testing_logger();
    let mut rst = new_shard_server(true, &l);
    let router = new_router(&rst, &l);

    assert_command_failed(&router, add_shard(rst.url()));
    add_non_arbiter_node(3, &mut rst);
    assert_command_worked(&router, add_shard(rst.url()));
}

// A version bump that keeps the PSA shape does not help.
#[test]
fn test_add_shard_psa_after_version_bump() {
    let l = testing_logger();
    let mut rst = new_shard_server(true, &l);
    let router = new_router(&rst, &l);

    let next = rst.get_primary().committed_config().next();
    assert_eq!(
        rst.reconfig(next).unwrap(),
        CommitStatus::Committed { version: 2 }
    );
    let reply = assert_command_failed(&router, add_shard(rst.url()));
    assert_eq!(reply.code_name, Some("ImplicitDefaultUnsafeForPSA"));
}

// Admission only reads the default write concern, and follows its current value.
#[test]
fn test_add_shard_follows_current_default() {
    let l = testing_logger();
    let rst = new_shard_server(true, &l);
    let router = new_router(&rst, &l);

    assert_command_worked(&router, set_cwwc_majority());
    assert_command_worked(
        &router,
        AdminCommand::SetDefaultRWConcern {
            default_write_concern: None,
        },
    );
    assert_command_failed(&router, add_shard(rst.url()));
    assert_eq!(router.store().snapshot().epoch, 2);

    assert_command_worked(&router, set_cwwc_majority());
    assert_command_worked(&router, add_shard(rst.url()));
    // Re-adding is a no-op.
    assert_command_worked(&router, add_shard(rst.url()));
    assert_eq!(router.gate().shards().len(), 1);

    match assert_command_worked(&router, AdminCommand::GetDefaultRWConcern).body {
        ReplyBody::DefaultRWConcern(snap) => assert_eq!(snap.epoch, 3),
        body => panic!("unexpected body {:?}", body),
    }
}

#[test]
fn test_add_shard_unknown_set() {
    let l = testing_logger();
    let rst = new_shard_server(false, &l);
    let router = new_router(&rst, &l);

    let reply = assert_command_failed(&router, add_shard("other/other-0:27017".to_owned()));
    assert_eq!(reply.code_name, Some("ShardUnreachable"));

    let reply = assert_command_failed(
        &router,
        add_shard("shardServer/elsewhere:27017".to_owned()),
    );
    assert_eq!(reply.code_name, Some("HostNotInSet"));
}
