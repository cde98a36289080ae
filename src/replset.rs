// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use getset::{CopyGetters, Getters};

use crate::errors::{Error, Result};
use crate::{HashSet, MajorityConfig};

/// A member of a replica set.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct Member {
    /// Unique id of the member within its set.
    #[get_copy = "pub"]
    id: u64,
    /// The `hostname:port` the member is reachable at.
    #[get = "pub"]
    host: String,
    arbiter: bool,
    voting: bool,
    /// Labels used by tag set write concerns.
    #[get = "pub"]
    tags: BTreeMap<String, String>,
}

impl Member {
    /// Creates a voting, data bearing member.
    pub fn new(id: u64, host: impl Into<String>) -> Member {
        Member {
            id,
            host: host.into(),
            arbiter: false,
            voting: true,
            tags: BTreeMap::new(),
        }
    }

    /// Creates an arbiter. Arbiters always vote and never hold data.
    pub fn arbiter(id: u64, host: impl Into<String>) -> Member {
        Member {
            arbiter: true,
            ..Member::new(id, host)
        }
    }

    /// Returns the member with its vote set or removed.
    pub fn with_voting(mut self, voting: bool) -> Member {
        self.voting = voting;
        self
    }

    /// Returns the member with an additional tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Member {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the member is an arbiter.
    #[inline]
    pub fn is_arbiter(&self) -> bool {
        self.arbiter
    }

    /// Whether the member takes part in elections and config commitment.
    #[inline]
    pub fn is_voting(&self) -> bool {
        self.voting
    }

    /// Whether the member stores data and can acknowledge writes.
    #[inline]
    pub fn is_data_bearing(&self) -> bool {
        !self.arbiter
    }
}

/// The membership of a replica set at one version.
///
/// A config is never changed in place; the `with_*` helpers return a new config with the
/// version bumped, ready to be proposed.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct ReplicaSetConfig {
    /// The replica set name.
    #[get = "pub"]
    name: String,
    /// The config version. Every committed change carries a strictly higher one.
    #[get_copy = "pub"]
    version: u64,
    /// Members in declaration order.
    #[get = "pub"]
    members: Vec<Member>,
}

impl ReplicaSetConfig {
    /// Creates a config.
    pub fn new(name: impl Into<String>, version: u64, members: Vec<Member>) -> ReplicaSetConfig {
        ReplicaSetConfig {
            name: name.into(),
            version,
            members,
        }
    }

    /// Returns the member with the given id.
    pub fn member(&self, id: u64) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Returns the member listening on `host`.
    pub fn member_by_host(&self, host: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.host == host)
    }

    /// Whether `id` is a member of this config.
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.member(id).is_some()
    }

    /// The ids of every voting member, arbiters included.
    pub fn voters(&self) -> MajorityConfig {
        MajorityConfig::new(
            self.members
                .iter()
                .filter(|m| m.voting)
                .map(|m| m.id)
                .collect::<HashSet<_>>(),
        )
    }

    /// Number of voting members, arbiters included.
    pub fn voting_count(&self) -> usize {
        self.members.iter().filter(|m| m.voting).count()
    }

    /// Number of voting members that hold data.
    pub fn voting_data_bearing_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.voting && m.is_data_bearing())
            .count()
    }

    /// Number of arbiters.
    pub fn arbiter_count(&self) -> usize {
        self.members.iter().filter(|m| m.arbiter).count()
    }

    /// The number of votes needed to win an election or commit a config.
    pub fn majority_vote_count(&self) -> usize {
        crate::majority(self.voting_count())
    }

    /// Whether this is a Primary-Secondary-Arbiter set: exactly three voting members,
    /// exactly one of them an arbiter.
    ///
    /// A PSA set is never majority capable for the implicit default write concern, even
    /// though two of three votes can be met by its data bearing members. Only the exact
    /// three member shape is classified; larger sets with arbiters are not.
    pub fn is_psa(&self) -> bool {
        let voting_arbiters = self
            .members
            .iter()
            .filter(|m| m.voting && m.arbiter)
            .count();
        self.voting_count() == 3 && voting_arbiters == 1
    }

    /// Whether a majority write concern may be used as the implicit default for this set.
    pub fn is_majority_capable(&self) -> bool {
        !self.is_psa() && self.voting_data_bearing_count() > 0
    }

    /// Returns a copy with the given version.
    pub fn with_version(&self, version: u64) -> ReplicaSetConfig {
        ReplicaSetConfig {
            version,
            ..self.clone()
        }
    }

    /// Returns a copy with the version bumped by one. The version saturates at
    /// `u64::MAX`, so a successor of the last version is stale.
    pub fn next(&self) -> ReplicaSetConfig {
        self.with_version(self.version.saturating_add(1))
    }

    /// Returns the next version with `member` appended.
    pub fn with_member(&self, member: Member) -> ReplicaSetConfig {
        let mut cfg = self.next();
        cfg.members.push(member);
        cfg
    }

    /// Returns the next version without the member `id`.
    pub fn without_member(&self, id: u64) -> ReplicaSetConfig {
        let mut cfg = self.next();
        cfg.members.retain(|m| m.id != id);
        cfg
    }

    /// Checks the config is well formed.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::ConfigInvalid("replica set name is empty".to_owned()));
        }
        if self.members.is_empty() {
            return Err(Error::ConfigInvalid(format!(
                "replica set {} has no members",
                self.name
            )));
        }

        let mut ids = HashSet::default();
        let mut hosts = HashSet::default();
        for m in &self.members {
            if !ids.insert(m.id) {
                return Err(Error::ConfigInvalid(format!(
                    "member id {} is used more than once",
                    m.id
                )));
            }
            if !hosts.insert(m.host.as_str()) {
                return Err(Error::ConfigInvalid(format!(
                    "host {} is used by more than one member",
                    m.host
                )));
            }
            if !is_host_and_port(&m.host) {
                return Err(Error::ConfigInvalid(format!(
                    "member {} has malformed host {:?}",
                    m.id, m.host
                )));
            }
            if m.arbiter && !m.voting {
                return Err(Error::ConfigInvalid(format!(
                    "arbiter {} must be a voting member",
                    m.id
                )));
            }
        }

        if self.voting_data_bearing_count() == 0 {
            return Err(Error::ConfigInvalid(format!(
                "replica set {} has no voting data bearing members",
                self.name
            )));
        }
        Ok(())
    }
}

impl Display for ReplicaSetConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{} [", self.name, self.version)?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", m.id)?;
            if m.arbiter {
                write!(f, "(a)")?;
            } else if !m.voting {
                write!(f, "(nv)")?;
            }
        }
        write!(f, "]")
    }
}

pub(crate) fn is_host_and_port(host: &str) -> bool {
    match host.rsplit_once(':') {
        Some((name, port)) => !name.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
