// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use super::new_config;
use crate::DEFAULT_REPLICA_SETS;
use criterion::Criterion;
use replset::{Config, Message, Member, ReplicationCoordinator};

pub fn bench_coordinator(c: &mut Criterion) {
    bench_coordinator_new(c);
    bench_coordinator_reconfig(c);
}

pub fn bench_coordinator_new(c: &mut Criterion) {
    DEFAULT_REPLICA_SETS.iter().for_each(|(data, arbiters)| {
        c.bench_function(
            &format!("ReplicationCoordinator::new ({}, {})", data, arbiters),
            move |b| {
                let logger = replset::default_logger();
                let cfg = new_config(*data, *arbiters);
                b.iter(|| ReplicationCoordinator::new(&Config::new(0), cfg.clone(), &logger))
            },
        );
    });
}

// Propose adding a member and ack it from every other member until it commits.
pub fn bench_coordinator_reconfig(c: &mut Criterion) {
    DEFAULT_REPLICA_SETS.iter().for_each(|(data, arbiters)| {
        c.bench_function(
            &format!("ReplicationCoordinator::reconfig ({}, {})", data, arbiters),
            move |b| {
                let logger = replset::default_logger();
                let cfg = new_config(*data, *arbiters);
                let new_id = data + arbiters;
                let next = cfg.with_member(Member::new(new_id, format!("rs-{}:27017", new_id)));
                b.iter(|| {
                    let coordinator =
                        ReplicationCoordinator::new(&Config::new(0), cfg.clone(), &logger)
                            .unwrap();
                    coordinator.propose(next.clone()).unwrap();
                    for m in coordinator.take_messages() {
                        let ack = Message::reconfig_response(m.to, m.from, m.version, false);
                        coordinator.step(ack).unwrap();
                    }
                    coordinator.is_config_committed()
                })
            },
        );
    });
}
