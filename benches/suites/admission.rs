// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;

use super::new_config;
use crate::DEFAULT_REPLICA_SETS;
use criterion::Criterion;
use replset::{ConnectionString, DefaultWriteConcernStore, ShardAdmissionGate, ShardDescriptor};

pub fn bench_admission(c: &mut Criterion) {
    DEFAULT_REPLICA_SETS.iter().for_each(|(data, arbiters)| {
        c.bench_function(
            &format!("ShardAdmissionGate::admit ({}, {})", data, arbiters),
            move |b| {
                let logger = replset::default_logger();
                let store = Arc::new(DefaultWriteConcernStore::new(&logger));
                let cfg = new_config(*data, *arbiters);
                let shard = ShardDescriptor::new(ConnectionString::for_config(&cfg), cfg);
                // A fresh gate per iteration so every admit runs the full check.
                b.iter(|| ShardAdmissionGate::new(store.clone(), &logger).admit(&shard))
            },
        );
    });
}
