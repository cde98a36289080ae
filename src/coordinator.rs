// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::VecDeque;
use std::mem;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use slog::Logger;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::message::{Message, MessageType};
use crate::quorum::VoteResult;
use crate::reconfig;
use crate::replset::ReplicaSetConfig;
use crate::status::{MemberStatus, ProposalState, Status};
use crate::HashMap;

/// The outcome of waiting for a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitStatus {
    /// The config at `version` is committed.
    Committed {
        /// The committed version.
        version: u64,
    },
    /// The proposal at `version` was refused by a majority; the committed config is
    /// unchanged.
    Rejected {
        /// The rejected version.
        version: u64,
    },
    /// The wait timed out. The proposal is still in flight and may commit later.
    Pending {
        /// The pending version.
        version: u64,
    },
}

/// The outcome of waiting for the committed config to reach every voting member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicationStatus {
    /// Every voting member installed the config at `version`.
    Replicated {
        /// The committed version.
        version: u64,
    },
    /// The wait timed out with some voting members still behind.
    Partial {
        /// The committed version.
        version: u64,
        /// Voting members that have not installed it, sorted.
        lagging: Vec<u64>,
    },
}

/// Anything that can report the committed configuration of a replica set.
pub trait TopologySource: Send + Sync {
    /// Returns the committed configuration.
    fn committed_config(&self) -> ReplicaSetConfig;
}

struct Proposal {
    config: ReplicaSetConfig,
    votes: HashMap<u64, bool>,
}

// Resolved proposals remembered for status queries. Outcomes with waiters are kept
// beyond this until every waiter has read them.
const MAX_OUTCOMES: usize = 16;

struct CoreState {
    committed: ReplicaSetConfig,
    pending: Option<Proposal>,
    /// Highest version ever proposed or committed. Versions are never reused, so a
    /// version names exactly one proposal.
    last_version: u64,
    /// Outcomes of recently resolved proposals, oldest first.
    outcomes: VecDeque<(u64, ProposalState)>,
    /// Versions with blocked `await_committed` callers, and how many.
    watched: HashMap<u64, usize>,
    /// Highest config version each member acknowledged.
    installed: HashMap<u64, u64>,
    msgs: Vec<Message>,
}

impl CoreState {
    fn last_outcome(&self) -> (u64, ProposalState) {
        self.outcomes
            .back()
            .cloned()
            .unwrap_or((self.committed.version(), ProposalState::Committed))
    }

    fn record(&mut self, version: u64, outcome: ProposalState) {
        self.outcomes.push_back((version, outcome));
        self.evict();
    }

    fn evict(&mut self) {
        while self.outcomes.len() > MAX_OUTCOMES {
            let watched = &self.watched;
            let oldest = self
                .outcomes
                .iter()
                .position(|(v, _)| !watched.contains_key(v));
            match oldest {
                Some(i) => {
                    self.outcomes.remove(i);
                }
                None => return,
            }
        }
    }

    fn watch(&mut self, version: u64) {
        *self.watched.entry(version).or_insert(0) += 1;
    }

    fn unwatch(&mut self, version: u64) {
        if let Some(n) = self.watched.get_mut(&version) {
            *n -= 1;
            if *n == 0 {
                self.watched.remove(&version);
                self.evict();
            }
        }
    }

    /// How the proposal at `version` ended, `None` while it is still pending.
    ///
    /// Outcomes of watched versions are never evicted, so a waiter always finds its own.
    fn resolution(&self, version: u64) -> Option<CommitStatus> {
        if let Some(&o) = self.outcomes.iter().find(|(v, _)| *v == version) {
            return Some(outcome_status(o));
        }
        match self.pending {
            Some(ref p) if p.config.version() == version => None,
            _ if self.committed.version() == version => {
                Some(CommitStatus::Committed { version })
            }
            _ => Some(CommitStatus::Rejected { version }),
        }
    }

    fn lagging_voters(&self) -> Vec<u64> {
        let version = self.committed.version();
        let mut lagging: Vec<u64> = self
            .committed
            .members()
            .iter()
            .filter(|m| m.is_voting())
            .filter(|m| self.installed.get(&m.id()).cloned().unwrap_or(0) < version)
            .map(|m| m.id())
            .collect();
        lagging.sort_unstable();
        lagging
    }
}

/// Drives configuration changes of one replica set, on its primary.
///
/// A proposal commits once a majority of the voting members of the *proposed* config
/// acknowledged it. Only one proposal may be in flight; a second one fails fast instead
/// of queueing.
///
/// Acknowledgments arrive through [`step`](ReplicationCoordinator::step) from whatever
/// transport connects the members; outgoing messages are collected with
/// [`take_messages`](ReplicationCoordinator::take_messages). All methods take `&self`,
/// so the coordinator can be shared across threads behind an `Arc`.
pub struct ReplicationCoordinator {
    id: u64,
    strict_reconfig: bool,
    state: Mutex<CoreState>,
    changed: Condvar,
    logger: Logger,
}

impl ReplicationCoordinator {
    /// Creates a coordinator for the member `c.id`, with `initial` as the committed config.
    pub fn new(
        c: &Config,
        initial: ReplicaSetConfig,
        logger: &Logger,
    ) -> Result<ReplicationCoordinator> {
        c.validate()?;
        initial.validate()?;
        match initial.member(c.id) {
            Some(m) if m.is_voting() && m.is_data_bearing() => {}
            _ => {
                return Err(Error::ConfigInvalid(format!(
                    "member {} is not a voting data bearing member of {}",
                    c.id, initial
                )))
            }
        }

        let logger = logger.new(o!("set" => initial.name().clone(), "member" => c.id));
        let mut installed = HashMap::default();
        installed.insert(c.id, initial.version());
        info!(
            logger,
            "replication coordinator started";
            "config" => %initial,
        );
        Ok(ReplicationCoordinator {
            id: c.id,
            strict_reconfig: c.strict_reconfig,
            state: Mutex::new(CoreState {
                last_version: initial.version(),
                committed: initial,
                pending: None,
                outcomes: VecDeque::with_capacity(MAX_OUTCOMES + 1),
                watched: HashMap::default(),
                installed,
                msgs: vec![],
            }),
            changed: Condvar::new(),
            logger,
        })
    }

    /// The id of the local member.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Proposes `next` to replace the committed config, returning its version.
    ///
    /// Fails with [`Error::StaleConfig`] if `next` is not newer than the committed config
    /// (or than an earlier rejected proposal), with [`Error::ConflictingReconfig`] if
    /// another proposal is in flight and with [`Error::ConfigInvalid`] if `next` is not an
    /// acceptable successor.
    pub fn propose(&self, next: ReplicaSetConfig) -> Result<u64> {
        let mut state = self.state.lock();
        if next.version() <= state.committed.version() {
            return Err(Error::StaleConfig {
                proposed: next.version(),
                current: state.committed.version(),
            });
        }
        if let Some(ref p) = state.pending {
            return Err(Error::ConflictingReconfig {
                pending: p.config.version(),
            });
        }
        if next.version() <= state.last_version {
            return Err(Error::StaleConfig {
                proposed: next.version(),
                current: state.last_version,
            });
        }
        reconfig::check_proposal(self.id, &state.committed, &next, self.strict_reconfig)?;

        let version = next.version();
        info!(
            self.logger,
            "proposing reconfig";
            "from" => state.committed.version(),
            "to" => %next,
        );

        // The primary installs the config it proposes.
        let mut votes = HashMap::default();
        votes.insert(self.id, true);
        let installed = state.installed.entry(self.id).or_insert(0);
        *installed = (*installed).max(version);

        for m in next.members() {
            if m.id() != self.id {
                state
                    .msgs
                    .push(Message::reconfig(self.id, m.id(), next.clone()));
            }
        }
        state.last_version = version;
        state.pending = Some(Proposal {
            config: next,
            votes,
        });
        self.maybe_resolve(&mut state);
        self.changed.notify_all();
        Ok(version)
    }

    /// Processes a message sent by another member.
    pub fn step(&self, m: Message) -> Result<()> {
        let mut state = self.state.lock();
        let known = state.committed.contains(m.from)
            || state
                .pending
                .as_ref()
                .map_or(false, |p| p.config.contains(m.from));
        if !known {
            debug!(
                self.logger,
                "dropping message from unknown member";
                "from" => m.from,
                "type" => ?m.msg_type,
            );
            return Err(Error::StepPeerNotFound(m.from));
        }

        match m.msg_type {
            MessageType::MsgReconfigResponse => {
                if !m.reject {
                    let installed = state.installed.entry(m.from).or_insert(0);
                    *installed = (*installed).max(m.version);
                }
                if let Some(ref mut p) = state.pending {
                    if p.config.version() == m.version {
                        p.votes.insert(m.from, !m.reject);
                    }
                }
                debug!(
                    self.logger,
                    "received reconfig response";
                    "from" => m.from,
                    "version" => m.version,
                    "reject" => m.reject,
                );
                self.maybe_resolve(&mut state);
            }
            MessageType::MsgReconfig => {
                warn!(
                    self.logger,
                    "ignoring reconfig sent to the primary";
                    "from" => m.from,
                    "version" => m.version,
                );
            }
        }
        self.changed.notify_all();
        Ok(())
    }

    /// Sends the newest config, pending or committed, to every member that has not
    /// acknowledged it.
    pub fn broadcast(&self) {
        let mut state = self.state.lock();
        let newest = match state.pending {
            Some(ref p) => p.config.clone(),
            None => state.committed.clone(),
        };
        for m in newest.members() {
            if m.id() == self.id {
                continue;
            }
            let installed = state.installed.get(&m.id()).cloned().unwrap_or(0);
            if installed < newest.version() {
                state
                    .msgs
                    .push(Message::reconfig(self.id, m.id(), newest.clone()));
            }
        }
    }

    /// Drains the messages waiting to be sent.
    pub fn take_messages(&self) -> Vec<Message> {
        mem::take(&mut self.state.lock().msgs)
    }

    /// Waits until the in-flight proposal is resolved or `timeout` elapses.
    ///
    /// With nothing in flight, the outcome of the last proposal is returned at once.
    /// Timing out does not cancel the proposal.
    pub fn await_committed(&self, timeout: Duration) -> CommitStatus {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let version = match state.pending {
            Some(ref p) => p.config.version(),
            None => return outcome_status(state.last_outcome()),
        };
        state.watch(version);
        let status = loop {
            if let Some(status) = state.resolution(version) {
                break status;
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break state
                    .resolution(version)
                    .unwrap_or(CommitStatus::Pending { version });
            }
        };
        state.unwatch(version);
        status
    }

    /// Waits until every voting member of the committed config installed it, or
    /// `timeout` elapses.
    pub fn await_replication(&self, timeout: Duration) -> ReplicationStatus {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let mut timed_out = false;
        loop {
            let version = state.committed.version();
            let lagging = state.lagging_voters();
            if lagging.is_empty() {
                return ReplicationStatus::Replicated { version };
            }
            if timed_out {
                debug!(
                    self.logger,
                    "config replication timed out";
                    "version" => version,
                    "lagging" => ?lagging,
                );
                return ReplicationStatus::Partial { version, lagging };
            }
            timed_out = self.changed.wait_until(&mut state, deadline).timed_out();
        }
    }

    /// Whether no proposal is waiting for a majority.
    pub fn is_config_committed(&self) -> bool {
        self.state.lock().pending.is_none()
    }

    /// A snapshot of the reconfiguration state.
    pub fn status(&self) -> Status {
        let state = self.state.lock();
        let latest = match state.pending {
            Some(ref p) => (p.config.version(), ProposalState::Proposed),
            None => state.last_outcome(),
        };
        let members = state
            .committed
            .members()
            .iter()
            .map(|m| MemberStatus {
                id: m.id(),
                host: m.host().clone(),
                voting: m.is_voting(),
                arbiter: m.is_arbiter(),
                installed_version: state.installed.get(&m.id()).cloned().unwrap_or(0),
            })
            .collect();
        Status {
            id: self.id,
            set_name: state.committed.name().clone(),
            committed_version: state.committed.version(),
            latest,
            members,
        }
    }

    /// The committed config, as of the call.
    pub fn committed_config(&self) -> ReplicaSetConfig {
        self.state.lock().committed.clone()
    }

    /// The config waiting for a majority, if any.
    pub fn pending_config(&self) -> Option<ReplicaSetConfig> {
        self.state.lock().pending.as_ref().map(|p| p.config.clone())
    }

    fn maybe_resolve(&self, state: &mut CoreState) {
        let p = match state.pending.take() {
            Some(p) => p,
            None => return,
        };
        let version = p.config.version();
        match p.config.voters().vote_result(|id| p.votes.get(&id).cloned()) {
            VoteResult::Pending => state.pending = Some(p),
            VoteResult::Won => {
                let retired = mem::replace(&mut state.committed, p.config);
                let committed = &state.committed;
                state.installed.retain(|id, _| committed.contains(*id));
                state.record(version, ProposalState::Committed);
                info!(
                    self.logger,
                    "reconfig committed";
                    "version" => version,
                    "retired" => retired.version(),
                );
            }
            VoteResult::Lost => {
                state.record(version, ProposalState::Rejected);
                warn!(
                    self.logger,
                    "reconfig rejected by a majority";
                    "version" => version,
                    "committed" => state.committed.version(),
                );
            }
        }
    }
}

impl TopologySource for ReplicationCoordinator {
    fn committed_config(&self) -> ReplicaSetConfig {
        ReplicationCoordinator::committed_config(self)
    }
}

fn outcome_status((version, state): (u64, ProposalState)) -> CommitStatus {
    match state {
        ProposalState::Committed => CommitStatus::Committed { version },
        ProposalState::Rejected => CommitStatus::Rejected { version },
        ProposalState::Proposed => CommitStatus::Pending { version },
    }
}
