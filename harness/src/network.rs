// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use replset::{Error, Message, ReplicationCoordinator};

use super::interface::Interface;

/// A simulated network between a primary and the rest of its replica set.
///
/// *Please note:* no actual network calls are made. Messages only move when
/// [`send`](Network::send) is called.
pub struct Network {
    /// The primary.
    pub primary: Arc<ReplicationCoordinator>,
    /// Every other member, by id.
    pub peers: HashMap<u64, Interface>,
    isolated: HashSet<u64>,
}

impl Network {
    /// Creates a network where every member of the primary's committed config already
    /// installed it.
    pub fn new(primary: Arc<ReplicationCoordinator>) -> Network {
        let config = primary.committed_config();
        let peers = config
            .members()
            .iter()
            .filter(|m| m.id() != primary.id())
            .map(|m| (m.id(), Interface::with_config(m.id(), config.clone())))
            .collect();
        Network {
            primary,
            peers,
            isolated: HashSet::new(),
        }
    }

    /// Moves messages between the primary and its peers until none are left. Members
    /// the primary talks to for the first time are started on the fly.
    ///
    /// Returns the number of messages delivered.
    pub fn send(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let msgs = self.filter(self.primary.take_messages());
            if msgs.is_empty() {
                return delivered;
            }
            let mut responses = vec![];
            for m in msgs {
                delivered += 1;
                let p = self
                    .peers
                    .entry(m.to)
                    .or_insert_with(|| Interface::new(m.to));
                p.step(m);
                responses.append(&mut p.read_messages());
            }
            for m in self.filter(responses) {
                delivered += 1;
                match self.primary.step(m) {
                    Ok(()) | Err(Error::StepPeerNotFound(_)) => {}
                    Err(e) => panic!("primary failed to step: {}", e),
                }
            }
        }
    }

    /// Filters out messages to or from isolated members.
    pub fn filter(&self, msgs: impl IntoIterator<Item = Message>) -> Vec<Message> {
        msgs.into_iter()
            .filter(|m| !self.isolated.contains(&m.from) && !self.isolated.contains(&m.to))
            .collect()
    }

    /// Cuts `id` off from the primary. Messages to and from it are dropped.
    pub fn isolate(&mut self, id: u64) {
        self.isolated.insert(id);
    }

    /// Makes `id` refuse every config it is sent.
    pub fn veto(&mut self, id: u64) {
        self.peers
            .entry(id)
            .or_insert_with(|| Interface::new(id))
            .veto = true;
    }

    /// Reconnects every member and lifts all vetoes.
    pub fn recover(&mut self) {
        self.isolated.clear();
        for p in self.peers.values_mut() {
            p.veto = false;
        }
    }
}
