// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use replset::{Member, ReplicaSetConfig};

mod quorum;
pub use self::quorum::*;
mod coordinator;
pub use self::coordinator::*;
mod admission;
pub use self::admission::*;

pub fn new_config(data: u64, arbiters: u64) -> ReplicaSetConfig {
    let mut members = vec![];
    for id in 0..data {
        members.push(Member::new(id, format!("rs-{}:27017", id)));
    }
    for id in data..data + arbiters {
        members.push(Member::arbiter(id, format!("rs-{}:27017", id)));
    }
    ReplicaSetConfig::new("rs", 1, members)
}
