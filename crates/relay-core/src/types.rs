use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Every automation the relay can drive against the messaging app.
///
/// Each kind is backed by exactly one script in the scripts folder, found by
/// file-name prefix (see [`ActionKind::script_name`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendMessage,
    SendGroupMessage,
    AddParticipant,
    RemoveParticipant,
    CreateGroup,
    LeaveGroup,
    RenameGroup,
    ContactSync,
    Setup,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::SendMessage,
            ActionKind::SendGroupMessage,
            ActionKind::AddParticipant,
            ActionKind::RemoveParticipant,
            ActionKind::CreateGroup,
            ActionKind::LeaveGroup,
            ActionKind::RenameGroup,
            ActionKind::ContactSync,
            ActionKind::Setup,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::SendMessage => "send_message",
            ActionKind::SendGroupMessage => "send_group_message",
            ActionKind::AddParticipant => "add_participant",
            ActionKind::RemoveParticipant => "remove_participant",
            ActionKind::CreateGroup => "create_group",
            ActionKind::LeaveGroup => "leave_group",
            ActionKind::RenameGroup => "rename_group",
            ActionKind::ContactSync => "contact_sync",
            ActionKind::Setup => "setup",
        }
    }

    /// File-name prefix of the script that performs this action.
    pub fn script_name(self) -> &'static str {
        match self {
            ActionKind::SendMessage => "SendMessage",
            ActionKind::SendGroupMessage => "SendGroupMessage",
            ActionKind::AddParticipant => "AddParticipant",
            ActionKind::RemoveParticipant => "RemoveParticipant",
            ActionKind::CreateGroup => "CreateGroup",
            ActionKind::LeaveGroup => "LeaveGroup",
            ActionKind::RenameGroup => "RenameGroup",
            ActionKind::ContactSync => "ContactSync",
            ActionKind::Setup => "Setup",
        }
    }

    /// Positional argument names, in the order the script expects them.
    pub fn argument_names(self) -> &'static [&'static str] {
        match self {
            ActionKind::SendMessage => &["handle", "attachment_path", "message_body"],
            ActionKind::SendGroupMessage => &[
                "group_row",
                "group_guid",
                "name_check",
                "no_name_flag",
                "attachment_path",
                "message_body",
            ],
            ActionKind::AddParticipant | ActionKind::RemoveParticipant => {
                &["group_row", "name_check", "no_name_flag", "account_handle"]
            }
            ActionKind::RenameGroup => &["group_row", "name_check", "no_name_flag", "new_title"],
            ActionKind::CreateGroup => &["group_name", "participants", "message_body"],
            ActionKind::LeaveGroup => &["group_row", "name_check", "no_name_flag"],
            ActionKind::ContactSync => &["sync_photos"],
            ActionKind::Setup => &["protocol_version"],
        }
    }

    pub fn arity(self) -> usize {
        self.argument_names().len()
    }

    /// Setup and ContactSync speak the bare-integer protocol and never
    /// trigger app supervision.
    pub fn is_utility(self) -> bool {
        matches!(self, ActionKind::ContactSync | ActionKind::Setup)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::error::RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::error::RelayError::InvalidActionKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// Status reported by a script on its final output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    ActionPerformed,
    UnknownError,
    VersionMismatch,
    UiError,
    InvalidNumber,
    NumberNotRegistered,
    GroupChatNotFound,
    NotSent,
    ServiceNotAvailable,
    FileNotFound,
    NullMessage,
    AssistiveAccessDisabled,
}

impl StatusCode {
    pub fn all() -> &'static [StatusCode] {
        &[
            StatusCode::ActionPerformed,
            StatusCode::UnknownError,
            StatusCode::VersionMismatch,
            StatusCode::UiError,
            StatusCode::InvalidNumber,
            StatusCode::NumberNotRegistered,
            StatusCode::GroupChatNotFound,
            StatusCode::NotSent,
            StatusCode::ServiceNotAvailable,
            StatusCode::FileNotFound,
            StatusCode::NullMessage,
            StatusCode::AssistiveAccessDisabled,
        ]
    }

    /// Integer written by the scripts for this status.
    pub fn code(self) -> i64 {
        match self {
            StatusCode::ActionPerformed => 0,
            StatusCode::UnknownError => 1,
            StatusCode::VersionMismatch => 2,
            StatusCode::UiError => 3,
            StatusCode::InvalidNumber => 4,
            StatusCode::NumberNotRegistered => 5,
            StatusCode::GroupChatNotFound => 6,
            StatusCode::NotSent => 7,
            StatusCode::ServiceNotAvailable => 8,
            StatusCode::FileNotFound => 9,
            StatusCode::NullMessage => 10,
            StatusCode::AssistiveAccessDisabled => 11,
        }
    }

    pub fn from_code(code: i64) -> Option<StatusCode> {
        StatusCode::all().iter().copied().find(|s| s.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::ActionPerformed => "action_performed",
            StatusCode::UnknownError => "unknown_error",
            StatusCode::VersionMismatch => "version_mismatch",
            StatusCode::UiError => "ui_error",
            StatusCode::InvalidNumber => "invalid_number",
            StatusCode::NumberNotRegistered => "number_not_registered",
            StatusCode::GroupChatNotFound => "group_chat_not_found",
            StatusCode::NotSent => "not_sent",
            StatusCode::ServiceNotAvailable => "service_not_available",
            StatusCode::FileNotFound => "file_not_found",
            StatusCode::NullMessage => "null_message",
            StatusCode::AssistiveAccessDisabled => "assistive_access_disabled",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
