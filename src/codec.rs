use crate::error::DecodeError;
use crate::tally::Tally;
use serde::{Deserialize, Serialize};

/// Inbound envelope, decoded once at the socket boundary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "vote")]
    Vote { option: String },
    #[serde(other)]
    Unknown,
}

/// Outbound envelope. Always carries the complete tally.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Votes { data: &'a Tally },
}

pub fn decode(text: &str) -> Result<ClientMessage, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<ClientMessage, DecodeError> {
    decode(std::str::from_utf8(bytes)?)
}

impl ClientMessage {
    /// The category named by a `vote` message.
    pub fn into_vote(self) -> Result<String, DecodeError> {
        match self {
            ClientMessage::Vote { option } => Ok(option),
            ClientMessage::Unknown => Err(DecodeError::UnexpectedType),
        }
    }
}

pub fn decode_vote(text: &str) -> Result<String, DecodeError> {
    decode(text)?.into_vote()
}

pub fn encode_snapshot(tally: &Tally) -> String {
    // A map of strings to integers cannot fail to serialize.
    serde_json::to_string(&ServerMessage::Votes { data: tally }).unwrap_or_default()
}
