// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use harness::{testing_logger, Interface, ReplSetTest};
use replset::admin::{AdminCommand, AdminTarget, ReplyBody};
use replset::{CommitStatus, Error, Member, Message, ProposalState, ReplicationStatus};

use crate::test_util::*;

fn add_member_3(rst: &ReplSetTest) -> replset::ReplicaSetConfig {
    let current = rst.get_primary().committed_config();
    current.with_member(Member::new(3, "shardServer-3:27017"))
}

// A proposal that cannot reach a majority of the new config stays pending, and
// commits once the majority is reachable again.
#[test]
fn test_reconfig_isolated_majority() {
    let l = testing_logger();
    let mut rst = new_shard_server(true, &l);
    let next = add_member_3(&rst);

    rst.network().isolate(1);
    rst.network().isolate(3);
    let primary = rst.get_primary().clone();
    let reply = assert_command_worked(
        &*primary,
        AdminCommand::ReplSetReconfig {
            config: next.clone(),
        },
    );
    assert_eq!(reply.body, ReplyBody::Reconfig { version: 2 });
    rst.network().send();

    assert_eq!(
        primary.await_committed(Duration::from_millis(50)),
        CommitStatus::Pending { version: 2 }
    );
    assert!(!primary.is_config_committed());
    assert_eq!(primary.committed_config().version(), 1);

    // The pending proposal blocks others.
    let reply = assert_command_failed(
        &*primary,
        AdminCommand::ReplSetReconfig {
            config: next.with_version(3),
        },
    );
    assert_eq!(reply.code_name, Some("ConflictingReconfig"));

    match primary.run_command(AdminCommand::ReplSetGetStatus).body {
        ReplyBody::Status(status) => {
            assert_eq!(status.latest, (2, ProposalState::Proposed));
            assert_eq!(status.committed_version, 1);
        }
        body => panic!("unexpected body {:?}", body),
    }

    rst.network().recover();
    primary.broadcast();
    rst.network().send();
    assert_eq!(
        primary.await_committed(Duration::from_millis(50)),
        CommitStatus::Committed { version: 2 }
    );
    assert_eq!(primary.committed_config(), next);
    assert_eq!(
        rst.wait_for_config_replication(),
        ReplicationStatus::Replicated { version: 2 }
    );
}

#[test]
fn test_reconfig_rejected_by_majority() {
    let l = testing_logger();
    let mut rst = new_shard_server(true, &l);
    let next = add_member_3(&rst);

    rst.network().veto(1);
    rst.network().veto(3);
    assert_eq!(
        rst.reconfig(next.clone()),
        Ok(CommitStatus::Rejected { version: 2 })
    );
    assert_eq!(rst.get_primary().committed_config().version(), 1);
    assert!(rst.get_primary().is_config_committed());

    // A rejected version is burnt.
    assert_eq!(
        rst.reconfig(next.clone()),
        Err(Error::StaleConfig {
            proposed: 2,
            current: 2
        })
    );

    rst.network().recover();
    assert_eq!(
        rst.reconfig(next.with_version(3)),
        Ok(CommitStatus::Committed { version: 3 })
    );
}

#[test]
fn test_reconfig_stale_version() {
    let l = testing_logger();
    let rst = new_shard_server(false, &l);
    let primary = rst.get_primary().clone();

    let reply = assert_command_failed(
        &*primary,
        AdminCommand::ReplSetReconfig {
            config: primary.committed_config(),
        },
    );
    assert_eq!(reply.code_name, Some("StaleConfig"));
    assert_eq!(
        primary.run_command(AdminCommand::ReplSetGetConfig).body,
        ReplyBody::Config(primary.committed_config())
    );
}

#[test]
fn test_reconfig_remove_member() {
    let l = testing_logger();
    let mut rst = new_shard_server(false, &l);
    rst.add_data_member(3).unwrap();
    let url = rst.url();
    assert!(url.contains("shardServer-3:27017"), "{}", url);

    let next = rst.get_primary().committed_config().without_member(3);
    assert_eq!(
        rst.reconfig(next),
        Ok(CommitStatus::Committed { version: 3 })
    );
    assert_eq!(
        rst.wait_for_config_replication(),
        ReplicationStatus::Replicated { version: 3 }
    );
    assert_eq!(rst.url(), "shardServer/shardServer-0:27017,shardServer-1:27017");
    let status = rst.get_primary().status();
    assert_eq!(status.members.len(), 2);
    assert!(status.is_config_replicated());
}

#[test]
fn test_reconfig_waiter_on_other_thread() {
    let l = testing_logger();
    let mut rst = new_shard_server(true, &l);
    let next = add_member_3(&rst);
    rst.get_primary().propose(next).unwrap();

    let primary: Arc<_> = rst.get_primary().clone();
    let waiter = thread::spawn(move || primary.await_committed(Duration::from_secs(10)));
    rst.network().send();
    assert_eq!(waiter.join().unwrap(), CommitStatus::Committed { version: 2 });
}

// An isolated voter holds back replication but not the commit.
#[test]
fn test_reconfig_partial_replication() {
    let l = testing_logger();
    let mut rst = new_shard_server(false, &l);
    rst.network().isolate(3);
    let next = add_member_3(&rst);
    // Voters {0, 1, 3}: the primary and member 1 are a majority.
    assert_eq!(rst.reconfig(next), Ok(CommitStatus::Committed { version: 2 }));

    let primary = rst.get_primary().clone();
    assert_eq!(
        primary.await_replication(Duration::from_millis(50)),
        ReplicationStatus::Partial {
            version: 2,
            lagging: vec![3],
        }
    );
    assert!(!primary.status().is_config_replicated());

    rst.network().recover();
    assert_eq!(
        rst.wait_for_config_replication(),
        ReplicationStatus::Replicated { version: 2 }
    );
}

#[test]
fn test_simulated_member_answers_reconfigs() {
    let l = testing_logger();
    let rst = new_shard_server(false, &l);
    let v1 = rst.get_primary().committed_config();
    let v2 = v1.next();

    let mut member = Interface::with_config(1, v2.clone());
    // Responses are not for secondaries; nothing is sent back.
    member.step(Message::reconfig_response(0, 1, 2, false));
    assert!(member.read_messages().is_empty());

    // An older config is refused and the installed one kept.
    member.step(Message::reconfig(0, 1, v1));
    assert_eq!(
        member.read_messages(),
        vec![Message::reconfig_response(1, 0, 1, true)]
    );
    assert_eq!(member.installed_version(), 2);

    // The same config again is acknowledged.
    member.step(Message::reconfig(0, 1, v2));
    assert_eq!(
        member.read_messages(),
        vec![Message::reconfig_response(1, 0, 2, false)]
    );

    member.veto = true;
    let v3 = installed_next(&member);
    member.step(Message::reconfig(0, 1, v3));
    assert_eq!(
        member.read_messages(),
        vec![Message::reconfig_response(1, 0, 3, true)]
    );
    assert_eq!(member.installed_version(), 2);
}

fn installed_next(member: &Interface) -> replset::ReplicaSetConfig {
    member.installed.as_ref().unwrap().next()
}
