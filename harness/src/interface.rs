// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use replset::{Message, MessageType, ReplicaSetConfig};

/// A simulated secondary or arbiter.
///
/// It installs every config newer than the one it holds and answers the primary. A
/// vetoing member refuses every config instead.
pub struct Interface {
    /// The member id.
    pub id: u64,
    /// The installed config, if any.
    pub installed: Option<ReplicaSetConfig>,
    /// Whether the member refuses new configs.
    pub veto: bool,
    msgs: Vec<Message>,
}

impl Interface {
    /// Creates a member that has not installed any config yet.
    pub fn new(id: u64) -> Interface {
        Interface {
            id,
            installed: None,
            veto: false,
            msgs: vec![],
        }
    }

    /// Creates a member that already installed `config`.
    pub fn with_config(id: u64, config: ReplicaSetConfig) -> Interface {
        Interface {
            installed: Some(config),
            ..Interface::new(id)
        }
    }

    /// Version of the installed config, `0` if none.
    pub fn installed_version(&self) -> u64 {
        self.installed.as_ref().map_or(0, |c| c.version())
    }

    /// Handles a message from the primary. Anything but `MsgReconfig` is ignored.
    pub fn step(&mut self, m: Message) {
        if m.msg_type != MessageType::MsgReconfig {
            return;
        }
        let accept = !self.veto && m.version >= self.installed_version();
        if accept && m.version > self.installed_version() {
            self.installed = m.config;
        }
        self.msgs
            .push(Message::reconfig_response(self.id, m.from, m.version, !accept));
    }

    /// Drains the messages this member sent.
    pub fn read_messages(&mut self) -> Vec<Message> {
        self.msgs.drain(..).collect()
    }
}
