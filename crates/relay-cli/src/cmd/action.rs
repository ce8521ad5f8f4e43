use crate::output::{print_json, print_pairs};
use anyhow::Context;
use clap::Args;
use relay_core::config::RelayConfig;
use relay_core::types::{ActionKind, StatusCode};
use relay_scripts::{ChatMetadata, ExecutionResult, ScriptExecutor, UtilityOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// How the group scripts locate a chat in the app.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Row of the chat in the conversation list
    #[arg(long)]
    pub row: i64,
    /// Chat GUID from the message store
    #[arg(long, default_value = "")]
    pub guid: String,
    /// Name shown for the chat, used to confirm the right row is selected
    #[arg(long)]
    pub name_check: String,
    /// The chat has no explicit name (its title is the participant list)
    #[arg(long)]
    pub no_name: bool,
}

impl From<ChatArgs> for ChatMetadata {
    fn from(args: ChatArgs) -> Self {
        ChatMetadata {
            group_row: args.row,
            guid: args.guid,
            name_check: args.name_check,
            no_name_flag: args.no_name,
        }
    }
}

pub enum Action {
    Send {
        handle: String,
        body: String,
        attachment: Option<PathBuf>,
    },
    SendGroup {
        chat: ChatArgs,
        body: String,
        attachment: Option<PathBuf>,
    },
    AddParticipant {
        chat: ChatArgs,
        account: String,
    },
    RemoveParticipant {
        chat: ChatArgs,
        account: String,
    },
    RenameGroup {
        chat: ChatArgs,
        title: String,
    },
    CreateGroup {
        name: String,
        participants: Vec<String>,
        body: String,
    },
    LeaveGroup {
        chat: ChatArgs,
    },
    ContactSync,
    Setup,
}

impl Action {
    fn kind(&self) -> ActionKind {
        match self {
            Action::Send { .. } => ActionKind::SendMessage,
            Action::SendGroup { .. } => ActionKind::SendGroupMessage,
            Action::AddParticipant { .. } => ActionKind::AddParticipant,
            Action::RemoveParticipant { .. } => ActionKind::RemoveParticipant,
            Action::RenameGroup { .. } => ActionKind::RenameGroup,
            Action::CreateGroup { .. } => ActionKind::CreateGroup,
            Action::LeaveGroup { .. } => ActionKind::LeaveGroup,
            Action::ContactSync => ActionKind::ContactSync,
            Action::Setup => ActionKind::Setup,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Action(ExecutionResult),
    Utility(UtilityOutcome),
}

impl Outcome {
    fn is_success(&self) -> bool {
        match self {
            Outcome::Action(r) => r.is_success(),
            Outcome::Utility(u) => u.is_success(),
        }
    }

    /// The app was force-quit and a relaunch is pending.
    fn relaunch_pending(&self) -> bool {
        match self {
            Outcome::Action(r) => r.is_unknown_error() || r.contains(StatusCode::UiError),
            Outcome::Utility(_) => false,
        }
    }

    fn summary(&self) -> String {
        match self {
            Outcome::Action(ExecutionResult::NoResult) => "no result".to_string(),
            Outcome::Action(r) => r
                .codes()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Outcome::Utility(UtilityOutcome::Performed) => "performed".to_string(),
            Outcome::Utility(UtilityOutcome::VersionMismatch) => "version_mismatch".to_string(),
            Outcome::Utility(UtilityOutcome::Failed(code)) => format!("failed (code {code})"),
        }
    }
}

#[derive(Serialize)]
struct Report {
    action: ActionKind,
    success: bool,
    result: Outcome,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, action: Action, json: bool) -> anyhow::Result<()> {
    let kind = action.kind();
    let config = RelayConfig::load_or_default(root).context("failed to load config")?;
    let executor =
        ScriptExecutor::new(root, config).context("failed to start script executor")?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let outcome = perform(&executor, action).await?;
        if outcome.relaunch_pending() {
            // Keep the runtime alive until the delayed relaunch has fired.
            let grace = executor.supervisor().respawn_delay() + Duration::from_millis(100);
            tokio::time::sleep(grace).await;
        }
        anyhow::Ok(outcome)
    });
    executor.shutdown();
    let outcome = outcome.with_context(|| format!("{kind} failed"))?;

    let report = Report {
        action: kind,
        success: outcome.is_success(),
        result: outcome,
    };

    if json {
        print_json(&report)?;
    } else {
        print_pairs(&[
            ("action", kind.to_string()),
            ("result", report.result.summary()),
        ]);
    }

    if !report.success {
        anyhow::bail!("{kind} did not succeed: {}", report.result.summary());
    }
    Ok(())
}

async fn perform(executor: &ScriptExecutor, action: Action) -> anyhow::Result<Outcome> {
    let outcome = match action {
        Action::Send {
            handle,
            body,
            attachment,
        } => {
            let staged = stage(executor, attachment.as_deref())?;
            Outcome::Action(
                executor
                    .send_message(&handle, staged.as_deref(), &body)
                    .await?,
            )
        }
        Action::SendGroup {
            chat,
            body,
            attachment,
        } => {
            let staged = stage(executor, attachment.as_deref())?;
            Outcome::Action(
                executor
                    .send_group_message(&ChatMetadata::from(chat), staged.as_deref(), &body)
                    .await?,
            )
        }
        Action::AddParticipant { chat, account } => Outcome::Action(
            executor
                .add_participant(&ChatMetadata::from(chat), &account)
                .await?,
        ),
        Action::RemoveParticipant { chat, account } => Outcome::Action(
            executor
                .remove_participant(&ChatMetadata::from(chat), &account)
                .await?,
        ),
        Action::RenameGroup { chat, title } => Outcome::Action(
            executor
                .rename_group(&ChatMetadata::from(chat), &title)
                .await?,
        ),
        Action::CreateGroup {
            name,
            participants,
            body,
        } => Outcome::Action(
            executor
                .create_group(&name, participants.as_slice(), &body)
                .await?,
        ),
        Action::LeaveGroup { chat } => {
            Outcome::Action(executor.leave_group(&ChatMetadata::from(chat)).await?)
        }
        Action::ContactSync => Outcome::Utility(executor.contact_sync().await?),
        Action::Setup => Outcome::Utility(executor.check_setup().await?),
    };
    Ok(outcome)
}

/// Copy an attachment into the executor's temp workspace so the script
/// reads a file the relay owns for the duration of the action.
fn stage(
    executor: &ScriptExecutor,
    attachment: Option<&Path>,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(path) = attachment else {
        return Ok(None);
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("attachment path has no file name: {}", path.display()))?;
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read attachment {}", path.display()))?;
    let staged = executor
        .stage_attachment(name, &data)
        .context("failed to stage attachment")?;
    Ok(Some(staged))
}
