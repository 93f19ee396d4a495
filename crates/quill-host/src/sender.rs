// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The issuer of a command, as scripts see it

use quill_engine::Value;
use quill_engine::interop::{HostArg, HostMember, HostObject, ParamKind};
use std::any::Any;
use std::cell::RefCell;

static SENDER_MEMBERS: &[HostMember] = &[
    HostMember::new("getName", &[]),
    HostMember::new("isOp", &[]),
    HostMember::new("sendMessage", &[ParamKind::Str]),
];

/// Who ran a command. Replies sent by the script are collected and handed
/// back to the host with [`take_messages`](Self::take_messages).
#[derive(Debug)]
pub struct CommandSender {
    name: String,
    op: bool,
    messages: RefCell<Vec<String>>,
}

impl CommandSender {
    /// A regular sender
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: false,
            messages: RefCell::default(),
        }
    }

    /// The host console, which has operator rights
    pub fn console() -> Self {
        Self {
            op: true,
            ..Self::new("CONSOLE")
        }
    }

    /// Sender name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a reply
    pub fn send(&self, message: impl Into<String>) {
        self.messages.borrow_mut().push(message.into());
    }

    /// Drain the queued replies
    pub fn take_messages(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }
}

impl HostObject for CommandSender {
    fn type_name(&self) -> &str {
        "CommandSender"
    }

    fn members(&self) -> &'static [HostMember] {
        SENDER_MEMBERS
    }

    fn invoke(&self, index: usize, args: Vec<HostArg>) -> Result<Value, String> {
        match (index, args.as_slice()) {
            (0, []) => Ok(Value::from(self.name.as_str())),
            (1, []) => Ok(Value::from(self.op)),
            (2, [HostArg::Str(message)]) => {
                self.send(message.as_str());
                Ok(Value::Undefined)
            }
            (2, [HostArg::Null]) => {
                self.send("null");
                Ok(Value::Undefined)
            }
            _ => Err(format!("unsupported call to member {index}")),
        }
    }

    fn display(&self) -> String {
        self.name.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_engine::{Engine, EngineConfig};
    use std::rc::Rc;

    #[test]
    fn test_script_sees_sender() {
        let mut engine = Engine::with_config(EngineConfig {
            console_echo: false,
            ..EngineConfig::default()
        });
        let sender = Rc::new(CommandSender::new("alice"));
        engine.define_host("sender", sender.clone());

        let result = engine
            .execute("sender.sendMessage('hi ' + sender.name); sender.op + ':' + sender")
            .unwrap();
        assert_eq!(result, Value::from("false:alice"));
        assert_eq!(sender.take_messages(), ["hi alice"]);
        assert!(sender.take_messages().is_empty());
    }

    #[test]
    fn test_console_is_op() {
        let console = CommandSender::console();
        assert_eq!(console.name(), "CONSOLE");
        assert_eq!(console.invoke(1, Vec::new()).unwrap(), Value::from(true));
    }
}
