// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use crate::replset::ReplicaSetConfig;

/// The kind of a message exchanged between the primary and the other members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// Primary to member: install the attached config.
    MsgReconfig,
    /// Member to primary: the config at `version` was installed, or refused if `reject`.
    MsgReconfigResponse,
}

/// A message between the primary and a member of the set.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// What the message is.
    pub msg_type: MessageType,
    /// Sending member.
    pub from: u64,
    /// Receiving member.
    pub to: u64,
    /// The config version the message is about.
    pub version: u64,
    /// The config itself, for `MsgReconfig`.
    pub config: Option<ReplicaSetConfig>,
    /// Whether the member refused the config.
    pub reject: bool,
}

impl Message {
    /// A config to be installed by `to`.
    pub fn reconfig(from: u64, to: u64, config: ReplicaSetConfig) -> Message {
        Message {
            msg_type: MessageType::MsgReconfig,
            from,
            to,
            version: config.version(),
            config: Some(config),
            reject: false,
        }
    }

    /// The answer of `from` to a `MsgReconfig`.
    pub fn reconfig_response(from: u64, to: u64, version: u64, reject: bool) -> Message {
        Message {
            msg_type: MessageType::MsgReconfigResponse,
            from,
            to,
            version,
            config: None,
            reject,
        }
    }
}
