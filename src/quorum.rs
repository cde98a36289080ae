// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

//! Majority arithmetic over replica set configurations.
//!
//! Everything here is pure: the same inputs always give the same answer and nothing
//! can fail.

pub mod majority;

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display, Formatter};

use crate::replset::ReplicaSetConfig;
use crate::write_concern::{WriteConcern, W};

/// VoteResult indicates the outcome of a vote.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum VoteResult {
    /// Pending indicates that the decision of the vote depends on future
    /// votes, i.e. neither "yes" or "no" has reached quorum yet.
    Pending,
    /// Lost indicates that the quorum has voted "no".
    Lost,
    /// Won indicates that the quorum has voted "yes".
    Won,
}

impl Display for VoteResult {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VoteResult::Won => write!(f, "VoteWon"),
            VoteResult::Lost => write!(f, "VoteLost"),
            VoteResult::Pending => write!(f, "VotePending"),
        }
    }
}

impl Debug for VoteResult {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Which notion of "majority capable" an evaluation applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MajorityRule {
    /// Plain arithmetic over the voting, data bearing members. Used when the write
    /// concern was configured explicitly.
    Literal,
    /// Arithmetic plus the PSA policy: a Primary-Secondary-Arbiter set never satisfies
    /// a majority write concern. Used when falling back to the implicit default.
    ImplicitDefault,
}

/// The outcome of evaluating a write concern against a configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the configuration can ever acknowledge a write with this concern.
    pub satisfiable: bool,
    /// The minimum number of data bearing acknowledgments needed.
    pub required_acks: usize,
}

/// Evaluates `wc` against `cfg`.
///
/// * `w: n` is always satisfiable and needs `n` acknowledgments.
/// * `w: "majority"` needs `floor(d / 2) + 1` acknowledgments, `d` being the number of
///   voting, data bearing members. Under [`MajorityRule::ImplicitDefault`] a PSA set is
///   not satisfiable.
/// * A tag set needs, for each tag, members carrying that many distinct values of it.
///
/// # Examples
///
/// ```
/// use replset::quorum::{evaluate, MajorityRule};
/// use replset::{Member, ReplicaSetConfig, WriteConcern};
///
/// let psa = ReplicaSetConfig::new(
///     "rs",
///     1,
///     vec![
///         Member::new(0, "a:1"),
///         Member::new(1, "b:1"),
///         Member::arbiter(2, "c:1"),
///     ],
/// );
/// let literal = evaluate(&psa, &WriteConcern::majority(), MajorityRule::Literal);
/// assert!(literal.satisfiable);
/// assert_eq!(literal.required_acks, 2);
///
/// let implicit = evaluate(&psa, &WriteConcern::majority(), MajorityRule::ImplicitDefault);
/// assert!(!implicit.satisfiable);
/// ```
pub fn evaluate(cfg: &ReplicaSetConfig, wc: &WriteConcern, rule: MajorityRule) -> Evaluation {
    match wc.w {
        W::Nodes(n) => Evaluation {
            satisfiable: true,
            required_acks: n as usize,
        },
        W::Majority => {
            let data_bearing = cfg.voting_data_bearing_count();
            let required_acks = crate::majority(data_bearing);
            let mut satisfiable = data_bearing >= required_acks;
            if rule == MajorityRule::ImplicitDefault && cfg.is_psa() {
                satisfiable = false;
            }
            Evaluation {
                satisfiable,
                required_acks,
            }
        }
        W::Tags(ref tags) => {
            let mut satisfiable = true;
            let mut required_acks = 0;
            for (tag, &count) in tags {
                let distinct: BTreeSet<&str> = cfg
                    .members()
                    .iter()
                    .filter(|m| m.is_data_bearing())
                    .filter_map(|m| m.tags().get(tag).map(String::as_str))
                    .collect();
                if distinct.len() < count as usize {
                    satisfiable = false;
                }
                required_acks = required_acks.max(count as usize);
            }
            Evaluation {
                satisfiable,
                required_acks,
            }
        }
    }
}

/// The write concern a member falls back to when no cluster-wide default is set:
/// `{w: 1}` for PSA sets, `{w: "majority"}` otherwise.
pub fn implicit_default(cfg: &ReplicaSetConfig) -> WriteConcern {
    if cfg.is_psa() {
        WriteConcern::nodes(1)
    } else {
        WriteConcern::majority()
    }
}
