// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

/// Where the most recent proposal stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalState {
    /// Waiting for a majority of the new config.
    Proposed,
    /// A majority of the new config installed it.
    Committed,
    /// A majority of the new config refused it.
    Rejected,
}

/// What one member is known to have installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberStatus {
    /// The member id.
    pub id: u64,
    /// The member host.
    pub host: String,
    /// Whether the member votes.
    pub voting: bool,
    /// Whether the member is an arbiter.
    pub arbiter: bool,
    /// Highest config version the member acknowledged, `0` if none.
    pub installed_version: u64,
}

/// Represents the current reconfiguration status of a replica set, as seen by its primary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    /// The ID of the local member.
    pub id: u64,
    /// The replica set name.
    pub set_name: String,
    /// Version of the committed config.
    pub committed_version: u64,
    /// Version of the most recent proposal and how it stands; the initial config counts as
    /// committed.
    pub latest: (u64, ProposalState),
    /// Members of the committed config.
    pub members: Vec<MemberStatus>,
}

impl Status {
    /// Whether no proposal is waiting for a majority.
    pub fn is_config_committed(&self) -> bool {
        self.latest.1 != ProposalState::Proposed
    }

    /// Whether every voting member installed the committed config.
    pub fn is_config_replicated(&self) -> bool {
        self.members
            .iter()
            .filter(|m| m.voting)
            .all(|m| m.installed_version >= self.committed_version)
    }
}
