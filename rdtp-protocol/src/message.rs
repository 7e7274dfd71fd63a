//! JSON message types carried in RDTP frames.

use crate::error::ProtocolError;
use crate::frame::FrameKind;
use serde::{Deserialize, Serialize};

/// Chat actions a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // Accounts
    CreateAccount,
    UsernameExists,
    DeleteAccount,

    // Sessions
    Login,
    Logout,

    // Groups
    CreateGroup,
    AddToGroup,
    GetUsersInGroup,
    GetGroups,

    // Presence and messaging
    UsersOnline,
    SendUser,
    SendGroup,
    Fetch,
}

impl Action {
    /// Returns whether this action requires a session token as its first
    /// argument.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Action::Logout
                | Action::DeleteAccount
                | Action::SendUser
                | Action::SendGroup
                | Action::Fetch
        )
    }
}

/// Response status codes.
///
/// Numeric on the wire: `0` success, `1` authentication/session failure,
/// `2` application failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    Ok,
    AuthFailure,
    AppFailure,
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Ok => 0,
            Status::AuthFailure => 1,
            Status::AppFailure => 2,
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::AuthFailure),
            2 => Ok(Status::AppFailure),
            other => Err(ProtocolError::InvalidStatus(other)),
        }
    }
}

/// A client-issued command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Action to perform.
    pub action: Action,

    /// Ordered argument list. Arguments may contain any characters;
    /// the binary framing imposes no delimiter constraint.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// A correlated reply to exactly one prior command.
///
/// Carries no request id: at most one request is in flight per connection,
/// so correlation is positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Outcome status.
    pub status: Status,

    /// Result payload (session token on login, user/group lists on queries).
    #[serde(default)]
    pub args: Vec<String>,
}

impl Response {
    pub fn new(status: Status, args: Vec<String>) -> Self {
        Self { status, args }
    }

    pub fn ok<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: Status::Ok,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn auth_failure() -> Self {
        Self::new(Status::AuthFailure, Vec::new())
    }

    pub fn app_failure() -> Self {
        Self::new(Status::AppFailure, Vec::new())
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// An unsolicited server-pushed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    /// Message text as the server rendered it.
    pub payload: String,
}

impl Push {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// A classified inbound or outbound message, tagged by frame kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Command(Command),
    Response(Response),
    Push(Push),
}

impl Message {
    /// Returns the frame kind this message travels under.
    pub fn kind(&self) -> FrameKind {
        match self {
            Message::Command(_) => FrameKind::Command,
            Message::Response(_) => FrameKind::Response,
            Message::Push(_) => FrameKind::Push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        let json = serde_json::to_string(&Action::CreateAccount).unwrap();
        assert_eq!(json, "\"create_account\"");

        let json = serde_json::to_string(&Action::GetUsersInGroup).unwrap();
        assert_eq!(json, "\"get_users_in_group\"");

        let parsed: Action = serde_json::from_str("\"send_group\"").unwrap();
        assert_eq!(parsed, Action::SendGroup);
    }

    #[test]
    fn test_action_requires_auth() {
        assert!(Action::SendUser.requires_auth());
        assert!(Action::Fetch.requires_auth());
        assert!(Action::Logout.requires_auth());
        assert!(!Action::Login.requires_auth());
        assert!(!Action::CreateAccount.requires_auth());
        assert!(!Action::UsersOnline.requires_auth());
    }

    #[test]
    fn test_status_numeric_on_wire() {
        let json = serde_json::to_string(&Status::Ok).unwrap();
        assert_eq!(json, "0");

        let parsed: Status = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Status::AuthFailure);

        let parsed: Status = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Status::AppFailure);

        let result: Result<Status, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_command_serialization() {
        let cmd = Command::new(Action::Login).with_args(["alice", "hunter2"]);
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""action":"login""#));
        assert!(json.contains(r#""args":["alice","hunter2"]"#));

        let parsed: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_args_may_contain_delimiters() {
        let cmd = Command::new(Action::SendUser).with_args(["tok", "bob", "a:b:c\nand more"]);
        let json = serde_json::to_string(&cmd).unwrap();
        let parsed: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.args[2], "a:b:c\nand more");
    }

    #[test]
    fn test_response_missing_args_defaults_empty() {
        let parsed: Response = serde_json::from_str(r#"{"status":0}"#).unwrap();
        assert!(parsed.is_ok());
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_message_kind() {
        assert_eq!(
            Message::Command(Command::new(Action::Fetch)).kind(),
            FrameKind::Command
        );
        assert_eq!(
            Message::Response(Response::ok(["tok"])).kind(),
            FrameKind::Response
        );
        assert_eq!(Message::Push(Push::new("hi")).kind(), FrameKind::Push);
    }
}
