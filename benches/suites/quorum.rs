// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use super::new_config;
use crate::DEFAULT_REPLICA_SETS;
use criterion::Criterion;
use replset::quorum::{self, MajorityRule};
use replset::WriteConcern;

pub fn bench_quorum(c: &mut Criterion) {
    bench_evaluate(c);
    bench_vote_result(c);
}

pub fn bench_evaluate(c: &mut Criterion) {
    let rules = [
        ("Literal", MajorityRule::Literal),
        ("ImplicitDefault", MajorityRule::ImplicitDefault),
    ];
    DEFAULT_REPLICA_SETS.iter().for_each(|(data, arbiters)| {
        for &(name, rule) in rules.iter() {
            c.bench_function(
                &format!("quorum::evaluate ({}, {}, {})", data, arbiters, name),
                move |b| {
                    let cfg = new_config(*data, *arbiters);
                    let wc = WriteConcern::majority();
                    b.iter(|| quorum::evaluate(&cfg, &wc, rule))
                },
            );
        }
    });
}

pub fn bench_vote_result(c: &mut Criterion) {
    DEFAULT_REPLICA_SETS.iter().for_each(|(data, arbiters)| {
        c.bench_function(
            &format!("Configuration::vote_result ({}, {})", data, arbiters),
            move |b| {
                let voters = new_config(*data, *arbiters).voters();
                // Every other member has voted yes.
                b.iter(|| voters.vote_result(|id| if id % 2 == 0 { Some(true) } else { None }))
            },
        );
    });
}
