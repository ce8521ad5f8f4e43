use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use relay_core::config::{RelayConfig, WarnLevel};
use relay_core::paths;
use relay_core::types::{ActionKind, StatusCode};
use relay_core::RelayError;
use tracing::{debug, error, info, warn};

use crate::decode::{decode, decode_bare, ExecutionResult, UtilityOutcome};
use crate::error::ActionError;
use crate::process::ScriptProcess;
use crate::queue::ExecutionQueue;
use crate::registry::ScriptRegistry;
use crate::request::{ActionRequest, ChatMetadata};
use crate::supervisor::AppSupervisor;
use crate::workspace::TempWorkspace;

// ─── ScriptExecutor ───────────────────────────────────────────────────────

/// Runs automation scripts against the messaging app, one at a time.
///
/// Every action waits its turn in a FIFO [`ExecutionQueue`], so concurrent
/// callers never drive the app simultaneously. Results that show the app
/// is wedged (no output, or a UI error) trigger a force-quit and relaunch.
///
/// Once admitted, an action runs to completion on its own task: dropping
/// the caller's future only stops the caller from seeing the result.
///
/// Share one executor per app instance behind an `Arc`.
pub struct ScriptExecutor {
    runner: Arc<Runner>,
    queue: ExecutionQueue,
    temp_dir: PathBuf,
    workspace: Mutex<Option<TempWorkspace>>,
}

/// Everything an admitted action needs, owned by its task.
struct Runner {
    config: RelayConfig,
    parent: PathBuf,
    registry: ScriptRegistry,
    supervisor: AppSupervisor,
}

impl ScriptExecutor {
    /// Build an executor rooted at `parent`, which must contain `scripts/`.
    ///
    /// A missing scripts folder, a config with error-level problems or an
    /// uncreatable temp workspace is fatal.
    pub fn new(parent: &Path, config: RelayConfig) -> Result<Self, RelayError> {
        let scripts_dir = paths::scripts_dir(parent);
        let scripts_dir = match std::fs::canonicalize(&scripts_dir) {
            Ok(dir) if dir.is_dir() => dir,
            _ => {
                error!(path = %scripts_dir.display(), "scripts folder could not be found");
                return Err(RelayError::ScriptsFolderMissing(scripts_dir));
            }
        };

        let mut problems = Vec::new();
        for w in config.validate() {
            match w.level {
                WarnLevel::Warning => warn!(warning = %w.message, "config"),
                WarnLevel::Error => problems.push(w.message),
            }
        }
        if !problems.is_empty() {
            let reason = problems.join("; ");
            error!(%reason, "invalid config");
            return Err(RelayError::InvalidConfig(reason));
        }

        let workspace = TempWorkspace::create().inspect_err(|e| {
            error!(error = %e, "could not create temp workspace");
        })?;

        let registry = ScriptRegistry::new(scripts_dir);
        let supervisor = AppSupervisor::new(
            registry.clone(),
            config.interpreter.clone(),
            config.respawn_delay(),
        );

        info!(
            scripts = %registry.dir().display(),
            interpreter = %config.interpreter,
            "script executor ready"
        );

        Ok(Self {
            runner: Arc::new(Runner {
                config,
                parent: parent.to_path_buf(),
                registry,
                supervisor,
            }),
            temp_dir: workspace.path().to_path_buf(),
            workspace: Mutex::new(Some(workspace)),
            queue: ExecutionQueue::new(),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.runner.config
    }

    pub fn scripts_dir(&self) -> &Path {
        self.runner.registry.dir()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn supervisor(&self) -> &AppSupervisor {
        &self.runner.supervisor
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    /// Copy attachment bytes into the temp workspace so a script can read
    /// them by path.
    pub fn stage_attachment(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, ActionError> {
        let guard = self.workspace.lock().unwrap_or_else(PoisonError::into_inner);
        let workspace = guard.as_ref().ok_or(ActionError::ShutDown)?;
        Ok(workspace.stage(file_name, data)?)
    }

    /// Remove the temp workspace. Safe to call more than once.
    pub fn shutdown(&self) {
        let workspace = self
            .workspace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(workspace) = workspace else {
            return;
        };
        match workspace.close() {
            Ok(()) => info!(path = %self.temp_dir.display(), "removed temp workspace"),
            Err(e) => error!(
                path = %self.temp_dir.display(),
                error = %e,
                "failed to delete temp workspace"
            ),
        }
    }

    // ── Typed entry points ───────────────────────────────────────────────

    pub async fn send_message(
        &self,
        handle: &str,
        attachment: Option<&Path>,
        body: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::send_message(handle, attachment, body))
            .await
    }

    pub async fn send_group_message(
        &self,
        chat: &ChatMetadata,
        attachment: Option<&Path>,
        body: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::send_group_message(chat, attachment, body))
            .await
    }

    pub async fn add_participant(
        &self,
        chat: &ChatMetadata,
        account: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::add_participant(chat, account)).await
    }

    pub async fn remove_participant(
        &self,
        chat: &ChatMetadata,
        account: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::remove_participant(chat, account))
            .await
    }

    pub async fn rename_group(
        &self,
        chat: &ChatMetadata,
        new_title: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::rename_group(chat, new_title)).await
    }

    pub async fn create_group<S: AsRef<str>>(
        &self,
        name: &str,
        participants: &[S],
        body: &str,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::create_group(name, participants, body))
            .await
    }

    pub async fn leave_group(&self, chat: &ChatMetadata) -> Result<ExecutionResult, ActionError> {
        self.run(ActionRequest::leave_group(chat)).await
    }

    /// Export contacts into `<parent>/contacts`.
    pub async fn contact_sync(&self) -> Result<UtilityOutcome, ActionError> {
        let sync_photos = self.runner.config.sync_contact_photos;
        self.run_utility(ActionRequest::contact_sync(sync_photos))
            .await
    }

    /// Ask the Setup script whether the machine is ready to automate the
    /// app (script version matches, assistive access granted).
    pub async fn check_setup(&self) -> Result<UtilityOutcome, ActionError> {
        let version = self.runner.config.protocol_version;
        self.run_utility(ActionRequest::setup(version)).await
    }

    // ── Generic entry point ──────────────────────────────────────────────

    /// Validate, queue and run one action.
    ///
    /// Setup and ContactSync are accepted too; their outcome is folded into
    /// a single status code.
    pub async fn run(&self, request: ActionRequest) -> Result<ExecutionResult, ActionError> {
        if request.kind.is_utility() {
            return self.run_utility(request).await.map(ExecutionResult::from);
        }
        request.validate()?;

        let ticket = self.queue.acquire().await?;
        debug!(
            action = %request.kind,
            ticket = %ticket.id(),
            waited_ms = ticket.waited().num_milliseconds(),
            "admitted"
        );

        let runner = Arc::clone(&self.runner);
        let task = tokio::spawn(async move {
            let result = runner.perform(&request).await;
            drop(ticket);
            result
        });
        task.await?
    }

    async fn run_utility(&self, request: ActionRequest) -> Result<UtilityOutcome, ActionError> {
        request.validate()?;

        let ticket = self.queue.acquire().await?;
        debug!(action = %request.kind, ticket = %ticket.id(), "admitted");

        let runner = Arc::clone(&self.runner);
        let task = tokio::spawn(async move {
            let outcome = runner.perform_utility(&request).await;
            drop(ticket);
            outcome
        });
        task.await?
    }
}

impl Drop for ScriptExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─── Runner ───────────────────────────────────────────────────────────────

impl Runner {
    async fn perform(&self, request: &ActionRequest) -> Result<ExecutionResult, ActionError> {
        let kind = request.kind;
        self.supervisor.start();

        let line = self.capture(kind, &request.arguments).await?;
        let result = decode(line.as_deref()).inspect_err(|e| {
            error!(action = %kind, error = %e, "could not decode script result");
        })?;

        if result.is_unknown_error() {
            error!(
                action = %kind,
                script = kind.script_name(),
                "an unknown error occurred while running script"
            );
            error!("force closing and relaunching the messaging app to prevent further errors");
            self.supervisor.kill(true);
            return Ok(result);
        }

        if result.contains(StatusCode::UiError) {
            error!(
                action = %kind,
                codes = ?result.codes(),
                "a UI error occurred within the messaging app"
            );
            error!("force closing and relaunching the messaging app to prevent further errors");
            self.supervisor.kill(true);
        }

        info!(action = %kind, codes = ?result.codes(), "action finished");
        Ok(result)
    }

    async fn perform_utility(
        &self,
        request: &ActionRequest,
    ) -> Result<UtilityOutcome, ActionError> {
        let kind = request.kind;

        if kind == ActionKind::ContactSync {
            let contacts = paths::contacts_dir(&self.parent);
            if let Err(e) = relay_core::io::ensure_dir(&contacts) {
                warn!(path = %contacts.display(), error = %e, "could not create contacts folder");
            }
        }

        let line = self.capture(kind, &request.arguments).await?;
        let outcome = decode_bare(line.as_deref()).inspect_err(|e| {
            error!(action = %kind, error = %e, "could not decode script result");
        })?;

        match (kind, outcome) {
            (_, UtilityOutcome::Performed) => info!(action = %kind, "action finished"),
            (ActionKind::Setup, UtilityOutcome::VersionMismatch) => {
                error!("the relay version and the scripts version do not match");
                error!("make sure you are using the scripts shipped with this relay version");
            }
            (ActionKind::Setup, UtilityOutcome::Failed(code)) => {
                error!(code, "the relay is not configured to run yet");
                error!("make sure that assistive access is enabled");
            }
            (_, outcome) => error!(
                action = %kind,
                ?outcome,
                "an error occurred while performing a contact sync"
            ),
        }
        Ok(outcome)
    }

    /// Resolve, spawn and drain the script for `kind`; returns its last
    /// stdout line. A timed-out or unreadable script yields `None`.
    async fn capture(
        &self,
        kind: ActionKind,
        args: &[String],
    ) -> Result<Option<String>, ActionError> {
        let script = self.registry.resolve(kind.script_name())?;

        let mut process = ScriptProcess::spawn(&self.config.interpreter, &script, args)
            .inspect_err(|e| {
                error!(action = %kind, error = %e, "an error occurred while running script");
            })?;

        let read = match self.config.script_timeout() {
            Some(limit) => {
                let bounded = tokio::time::timeout(limit, process.last_line()).await;
                match bounded {
                    Ok(read) => read,
                    Err(_) => {
                        warn!(
                            action = %kind,
                            limit_secs = limit.as_secs(),
                            "script timed out; killing it"
                        );
                        process.kill().await;
                        return Ok(None);
                    }
                }
            }
            None => process.last_line().await,
        };

        match read {
            Ok(line) => {
                process.finish().await;
                Ok(line)
            }
            Err(e) => {
                error!(action = %kind, error = %e, "failed to read script output");
                process.kill().await;
                Ok(None)
            }
        }
    }
}
