//! Protocol message types and command definitions.
//!
//! Command tags travel as plain strings inside an [`Envelope`]. Parsing a
//! tag uses `TryFrom<&str>`, so unknown tags are a value the dispatcher
//! can branch on rather than a decode failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

// ── Envelope ─────────────────────────────────────────────────────

/// The wire unit in both directions: a command tag and an opaque string
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    pub command: String,
    pub payload: String,
}

impl Envelope {
    pub fn new(command: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: payload.into(),
        }
    }

    /// Build an outbound reply.
    pub fn reply(command: ReplyCommand, payload: impl Into<String>) -> Self {
        Self::new(command.as_str(), payload)
    }
}

// ── PullCommand ──────────────────────────────────────────────────

/// Commands the operator sends to request data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PullCommand {
    /// Capture the bound surface.
    Screenshots,
    /// Dequeue the oldest location record.
    Location,
    /// Dequeue the oldest history record.
    SearchHistory,
}

impl PullCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            PullCommand::Screenshots => "pull_screenshots",
            PullCommand::Location => "pull_location",
            PullCommand::SearchHistory => "pull_search_history",
        }
    }

    /// The reply tag that answers this command.
    pub const fn reply(self) -> ReplyCommand {
        match self {
            PullCommand::Screenshots => ReplyCommand::UpdateScreenshots,
            PullCommand::Location => ReplyCommand::UpdateLocation,
            PullCommand::SearchHistory => ReplyCommand::UpdateSearchHistory,
        }
    }
}

impl TryFrom<&str> for PullCommand {
    type Error = ChannelError;

    fn try_from(tag: &str) -> Result<Self, Self::Error> {
        match tag {
            "pull_screenshots" => Ok(PullCommand::Screenshots),
            "pull_location" => Ok(PullCommand::Location),
            "pull_search_history" => Ok(PullCommand::SearchHistory),
            other => Err(ChannelError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for PullCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ReplyCommand ─────────────────────────────────────────────────

/// Tags emitted by the client in reply to a [`PullCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyCommand {
    /// Payload is base64 PNG text.
    UpdateScreenshots,
    /// Payload is the dequeued location record.
    UpdateLocation,
    /// Payload is the dequeued history record.
    UpdateSearchHistory,
}

impl ReplyCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReplyCommand::UpdateScreenshots => "update_screenshots",
            ReplyCommand::UpdateLocation => "update_location",
            ReplyCommand::UpdateSearchHistory => "update_search_history",
        }
    }
}

impl fmt::Display for ReplyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
