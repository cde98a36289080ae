// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::errors::{Error, Result};

/// The acknowledgment requirement of a write concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum W {
    /// A majority of the voting, data bearing members.
    Majority,
    /// A fixed number of members, `0` meaning unacknowledged.
    Nodes(u32),
    /// For every tag, members with that many distinct values of it.
    Tags(BTreeMap<String, u32>),
}

impl Display for W {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            W::Majority => write!(f, "\"majority\""),
            W::Nodes(n) => write!(f, "{}", n),
            W::Tags(tags) => {
                write!(f, "{{")?;
                for (i, (tag, count)) in tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", tag, count)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// How many members must acknowledge a write, and how long to wait for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteConcern {
    /// The acknowledgment requirement.
    pub w: W,
    /// How long a writer waits for acknowledgments. Zero waits forever.
    pub wtimeout: Duration,
}

impl WriteConcern {
    /// `{w: "majority", wtimeout: 0}`.
    pub fn majority() -> WriteConcern {
        WriteConcern {
            w: W::Majority,
            wtimeout: Duration::from_millis(0),
        }
    }

    /// `{w: n, wtimeout: 0}`.
    pub fn nodes(n: u32) -> WriteConcern {
        WriteConcern {
            w: W::Nodes(n),
            wtimeout: Duration::from_millis(0),
        }
    }

    /// Returns the write concern with the given timeout.
    pub fn with_wtimeout(mut self, wtimeout: Duration) -> WriteConcern {
        self.wtimeout = wtimeout;
        self
    }

    /// Checks the write concern may be used as a cluster-wide default: `w` must be
    /// `"majority"` or a positive number of members.
    pub fn validate_as_default(&self) -> Result<()> {
        match self.w {
            W::Majority => Ok(()),
            W::Nodes(0) => Err(Error::InvalidWriteConcern(
                "w:0 is not allowed as a default write concern".to_owned(),
            )),
            W::Nodes(_) => Ok(()),
            W::Tags(_) => Err(Error::InvalidWriteConcern(format!(
                "w:{} is not allowed as a default write concern",
                self.w
            ))),
        }
    }
}

impl Display for WriteConcern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{w: {}, wtimeout: {}}}",
            self.w,
            self.wtimeout.as_millis()
        )
    }
}

/// A `w` value as it arrives in an administrative command, before validation.
#[derive(Clone, Debug, PartialEq)]
pub enum RawW {
    /// A mode name, of which only `"majority"` is known.
    Str(String),
    /// A member count.
    Int(i64),
    /// A tag set.
    Tags(BTreeMap<String, i64>),
}

/// A write concern document as it arrives in an administrative command.
#[derive(Clone, Debug, PartialEq)]
pub struct RawWriteConcern {
    /// `w`; absent means `1`.
    pub w: Option<RawW>,
    /// `wtimeout` in milliseconds.
    pub wtimeout: i64,
}

impl RawWriteConcern {
    /// `{w: "majority", wtimeout: 0}`.
    pub fn majority() -> RawWriteConcern {
        RawWriteConcern {
            w: Some(RawW::Str("majority".to_owned())),
            wtimeout: 0,
        }
    }
}

impl TryFrom<RawWriteConcern> for WriteConcern {
    type Error = Error;

    fn try_from(raw: RawWriteConcern) -> Result<WriteConcern> {
        if raw.wtimeout < 0 {
            return Err(Error::InvalidWriteConcern(format!(
                "wtimeout must not be negative, got {}",
                raw.wtimeout
            )));
        }
        let w = match raw.w {
            None => W::Nodes(1),
            Some(RawW::Str(mode)) if mode == "majority" => W::Majority,
            Some(RawW::Str(mode)) => {
                return Err(Error::InvalidWriteConcern(format!(
                    "unknown write concern mode {:?}",
                    mode
                )))
            }
            Some(RawW::Int(n)) => W::Nodes(u32::try_from(n).map_err(|_| {
                Error::InvalidWriteConcern(format!("w must be a non-negative integer, got {}", n))
            })?),
            Some(RawW::Tags(tags)) => {
                if tags.is_empty() {
                    return Err(Error::InvalidWriteConcern("empty tag set".to_owned()));
                }
                let mut parsed = BTreeMap::new();
                for (tag, count) in tags {
                    let count = match u32::try_from(count) {
                        Ok(c) if c > 0 => c,
                        _ => {
                            return Err(Error::InvalidWriteConcern(format!(
                                "tag {} needs a positive count, got {}",
                                tag, count
                            )))
                        }
                    };
                    parsed.insert(tag, count);
                }
                W::Tags(parsed)
            }
        };
        Ok(WriteConcern {
            w,
            wtimeout: Duration::from_millis(raw.wtimeout as u64),
        })
    }
}
