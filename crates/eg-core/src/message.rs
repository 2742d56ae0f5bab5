//! Command envelope
//!
//! Messages between extension contexts travel as `{command, args}` JSON.
//! Inbound envelopes decode into a closed [`Command`] set; the only outbound
//! message is the picker's selector preview.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::StatePatch;
use crate::types::SelectorBundle;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
    #[error("{command}: invalid argument: {source}")]
    InvalidArgument {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Wire form shared by inbound and outbound messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(alias = "callee")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Inbound commands understood by the content script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetState(StatePatch),
    RefreshSelector(SelectorBundle),
    RefreshKeyword(Vec<String>),
    HideWithKeyword(Vec<String>),
    HideElementsShallow(String),
    HideElementsDeep(String),
    HideText(String),
    TogglePower(bool),
    EnableInteractiveMode,
    DisableInteractiveMode,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetState(_) => "setState",
            Command::RefreshSelector(_) => "refreshSelector",
            Command::RefreshKeyword(_) => "refreshKeyword",
            Command::HideWithKeyword(_) => "hideWithKeyword",
            Command::HideElementsShallow(_) => "hideElementsShallow",
            Command::HideElementsDeep(_) => "hideElementsDeep",
            Command::HideText(_) => "hideText",
            Command::TogglePower(_) => "togglePower",
            Command::EnableInteractiveMode => "enableInteractiveMode",
            Command::DisableInteractiveMode => "disableInteractiveMode",
        }
    }

    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        let envelope: Envelope = serde_json::from_str(json)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, MessageError> {
        let mut args = envelope.args.into_iter();
        let command = match envelope.command.as_str() {
            "setState" => Command::SetState(arg("setState", args.next())?),
            "refreshSelector" => Command::RefreshSelector(arg("refreshSelector", args.next())?),
            "refreshKeyword" => Command::RefreshKeyword(arg("refreshKeyword", args.next())?),
            "hideWithKeyword" => Command::HideWithKeyword(arg("hideWithKeyword", args.next())?),
            "hideElementsShallow" => {
                Command::HideElementsShallow(arg("hideElementsShallow", args.next())?)
            }
            "hideElementsDeep" => Command::HideElementsDeep(arg("hideElementsDeep", args.next())?),
            "hideText" => Command::HideText(arg("hideText", args.next())?),
            "togglePower" => Command::TogglePower(arg("togglePower", args.next())?),
            "enableInteractiveMode" => Command::EnableInteractiveMode,
            "disableInteractiveMode" => Command::DisableInteractiveMode,
            _ => return Err(MessageError::UnknownCommand(envelope.command)),
        };
        Ok(command)
    }

    pub fn to_envelope(&self) -> Envelope {
        let args = match self {
            Command::SetState(patch) => vec![to_value(patch)],
            Command::RefreshSelector(bundle) => vec![to_value(bundle)],
            Command::RefreshKeyword(keywords) | Command::HideWithKeyword(keywords) => {
                vec![to_value(keywords)]
            }
            Command::HideElementsShallow(selector)
            | Command::HideElementsDeep(selector)
            | Command::HideText(selector) => vec![Value::String(selector.clone())],
            Command::TogglePower(enabled) => vec![Value::Bool(*enabled)],
            Command::EnableInteractiveMode | Command::DisableInteractiveMode => Vec::new(),
        };
        Envelope {
            command: self.name().to_string(),
            args,
        }
    }
}

/// Messages the content script sends out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Selector of the element under the pointer while picking.
    SetSelector(String),
}

impl Outbound {
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Outbound::SetSelector(selector) => Envelope {
                command: "setSelector".to_string(),
                args: vec![Value::String(selector.clone())],
            },
        }
    }
}

fn arg<T: DeserializeOwned>(command: &'static str, value: Option<Value>) -> Result<T, MessageError> {
    let value = value.ok_or(MessageError::MissingArgument(command))?;
    serde_json::from_value(value).map_err(|source| MessageError::InvalidArgument { command, source })
}

fn to_value<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}
