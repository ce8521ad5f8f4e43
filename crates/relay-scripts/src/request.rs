use std::path::Path;

use relay_core::types::ActionKind;
use serde::{Deserialize, Serialize};

use crate::error::ActionError;

// ─── ChatMetadata ─────────────────────────────────────────────────────────

/// Identity of a group chat as the group scripts expect it.
///
/// Produced by the chat-metadata resolver from the message store; the
/// relay only renders it into positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub group_row: i64,
    pub guid: String,
    pub name_check: String,
    pub no_name_flag: bool,
}

impl ChatMetadata {
    /// `group_row, name_check, no_name_flag`: the prefix shared by every
    /// group script except SendGroupMessage.
    fn locator(&self) -> [String; 3] {
        [
            self.group_row.to_string(),
            self.name_check.clone(),
            self.no_name_flag.to_string(),
        ]
    }
}

// ─── ActionRequest ────────────────────────────────────────────────────────

/// One action and its positional script arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub arguments: Vec<String>,
}

impl ActionRequest {
    pub fn new<I, S>(kind: ActionKind, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn send_message(handle: &str, attachment: Option<&Path>, body: &str) -> Self {
        Self::new(
            ActionKind::SendMessage,
            [handle.to_string(), attachment_arg(attachment), body.to_string()],
        )
    }

    pub fn send_group_message(
        chat: &ChatMetadata,
        attachment: Option<&Path>,
        body: &str,
    ) -> Self {
        Self::new(
            ActionKind::SendGroupMessage,
            [
                chat.group_row.to_string(),
                chat.guid.clone(),
                chat.name_check.clone(),
                chat.no_name_flag.to_string(),
                attachment_arg(attachment),
                body.to_string(),
            ],
        )
    }

    pub fn add_participant(chat: &ChatMetadata, account: &str) -> Self {
        Self::with_locator(ActionKind::AddParticipant, chat, Some(account))
    }

    pub fn remove_participant(chat: &ChatMetadata, account: &str) -> Self {
        Self::with_locator(ActionKind::RemoveParticipant, chat, Some(account))
    }

    pub fn rename_group(chat: &ChatMetadata, new_title: &str) -> Self {
        Self::with_locator(ActionKind::RenameGroup, chat, Some(new_title))
    }

    pub fn leave_group(chat: &ChatMetadata) -> Self {
        Self::with_locator(ActionKind::LeaveGroup, chat, None)
    }

    pub fn create_group<S: AsRef<str>>(name: &str, participants: &[S], body: &str) -> Self {
        let joined = participants
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        Self::new(
            ActionKind::CreateGroup,
            [name.to_string(), joined, body.to_string()],
        )
    }

    pub fn contact_sync(sync_photos: bool) -> Self {
        Self::new(ActionKind::ContactSync, [sync_photos.to_string()])
    }

    pub fn setup(protocol_version: u32) -> Self {
        Self::new(ActionKind::Setup, [protocol_version.to_string()])
    }

    fn with_locator(kind: ActionKind, chat: &ChatMetadata, extra: Option<&str>) -> Self {
        let mut arguments = chat.locator().to_vec();
        arguments.extend(extra.map(str::to_string));
        Self { kind, arguments }
    }

    /// Reject requests whose shape does not match the script's contract.
    pub fn validate(&self) -> Result<(), ActionError> {
        let expected = self.kind.arity();
        if self.arguments.len() != expected {
            return Err(self.invalid(format!(
                "expected {expected} arguments ({}), got {}",
                self.kind.argument_names().join(", "),
                self.arguments.len()
            )));
        }

        match self.kind {
            ActionKind::ContactSync if self.arguments[0].parse::<bool>().is_err() => {
                Err(self.invalid(format!(
                    "sync_photos must be true or false, got '{}'",
                    self.arguments[0]
                )))
            }
            ActionKind::Setup if self.arguments[0].parse::<i64>().is_err() => {
                Err(self.invalid(format!(
                    "protocol_version must be an integer, got '{}'",
                    self.arguments[0]
                )))
            }
            _ => Ok(()),
        }
    }

    fn invalid(&self, reason: String) -> ActionError {
        ActionError::InvalidArguments {
            kind: self.kind,
            reason,
        }
    }
}

fn attachment_arg(attachment: Option<&Path>) -> String {
    attachment
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ─── Tests ────────────────────────────────────────────────────────────────
