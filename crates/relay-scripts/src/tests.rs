//! End-to-end executor scenarios against fake `sh` scripts, plus the
//! fixtures shared with the module tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::config::RelayConfig;
use tempfile::TempDir;

use crate::executor::ScriptExecutor;

/// Appends its mode argument to `<root>/helpers.log`.
const HELPERS_SH: &str = "printf '%s\\n' \"$1\" >> \"$(dirname \"$0\")/../helpers.log\"\n";

/// Writes every argument, one per line, to `<root>/args.txt`, then succeeds.
pub(crate) const RECORD_ARGS_SH: &str =
    "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/../args.txt\"\necho 0\n";

pub(crate) struct Fixture {
    root: TempDir,
}

impl Fixture {
    /// A parent directory with `scripts/Helpers.sh` plus the given
    /// `(file name, body)` scripts.
    pub(crate) fn new(scripts: &[(&str, &str)]) -> Self {
        let fx = Self::without_helpers();
        fx.write_script("Helpers.sh", HELPERS_SH);
        for (name, body) in scripts {
            fx.write_script(name, body);
        }
        fx
    }

    pub(crate) fn without_helpers() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("scripts")).unwrap();
        Self { root }
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn scripts_dir(&self) -> PathBuf {
        self.root.path().join("scripts")
    }

    pub(crate) fn write_script(&self, name: &str, body: &str) {
        std::fs::write(self.scripts_dir().join(name), body).unwrap();
    }

    pub(crate) fn config() -> RelayConfig {
        RelayConfig {
            interpreter: "sh".into(),
            ..RelayConfig::default()
        }
    }

    pub(crate) fn executor(&self) -> ScriptExecutor {
        self.executor_with(Self::config())
    }

    pub(crate) fn executor_with(&self, config: RelayConfig) -> ScriptExecutor {
        ScriptExecutor::new(self.root(), config).unwrap()
    }

    pub(crate) fn recorded_args(&self) -> Vec<String> {
        read_lines(&self.root().join("args.txt"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Modes the Helpers script has been called with so far.
pub(crate) fn helper_calls(root: &Path) -> Vec<String> {
    read_lines(&root.join("helpers.log"))
}

/// Poll until at least `n` Helpers calls have landed (5s cap).
pub(crate) async fn wait_for_helper_calls(root: &Path, n: usize) -> Vec<String> {
    for _ in 0..500 {
        let calls = helper_calls(root);
        if calls.len() >= n {
            return calls;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} helper calls, got {:?}", helper_calls(root));
}

fn count(calls: &[String], mode: &str) -> usize {
    calls.iter().filter(|c| *c == mode).count()
}

mod scenarios {
    use super::*;
    use crate::decode::{ExecutionResult, UtilityOutcome};
    use crate::error::ActionError;
    use crate::request::{ActionRequest, ChatMetadata};
    use relay_core::types::{ActionKind, StatusCode};
    use relay_core::RelayError;
    use std::sync::Arc;

    /// Long enough for a relaunch (200ms default) to have shown up.
    const SETTLE: Duration = Duration::from_millis(400);

    fn chat() -> ChatMetadata {
        ChatMetadata {
            group_row: 3,
            guid: "chat-guid".into(),
            name_check: "Book Club".into(),
            no_name_flag: true,
        }
    }

    #[tokio::test]
    async fn successful_send_only_launches_app() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo 0\n")]);
        let exec = fx.executor();

        let result = exec
            .send_message("+15551234567", None, "Hello")
            .await
            .unwrap();
        assert_eq!(result, ExecutionResult::Single(StatusCode::ActionPerformed));

        wait_for_helper_calls(fx.root(), 1).await;
        tokio::time::sleep(SETTLE).await;
        assert_eq!(helper_calls(fx.root()), ["1"]);
    }

    #[tokio::test]
    async fn empty_output_kills_once_and_relaunches() {
        let fx = Fixture::new(&[("SendMessage.sh", "exit 0\n")]);
        let exec = fx.executor();

        let result = exec
            .send_message("+15551234567", None, "Hello")
            .await
            .unwrap();
        assert!(result.is_unknown_error());

        // ensure-running launch, the kill, then the delayed relaunch
        let calls = wait_for_helper_calls(fx.root(), 3).await;
        tokio::time::sleep(SETTLE).await;
        let calls_after = helper_calls(fx.root());
        assert_eq!(calls, calls_after, "no further supervisor activity expected");
        assert_eq!(count(&calls, "2"), 1);
        assert_eq!(count(&calls, "1"), 2);
        assert_eq!(calls.last().map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn ui_error_among_many_is_returned_intact() {
        let fx = Fixture::new(&[("SendGroupMessage.sh", "echo '0, 3, 3'\n")]);
        let exec = fx.executor();

        let result = exec
            .send_group_message(&chat(), None, "hi")
            .await
            .unwrap();
        assert_eq!(
            result,
            ExecutionResult::Multiple(vec![
                StatusCode::ActionPerformed,
                StatusCode::UiError,
                StatusCode::UiError,
            ])
        );

        let calls = wait_for_helper_calls(fx.root(), 3).await;
        tokio::time::sleep(SETTLE).await;
        assert_eq!(helper_calls(fx.root()).len(), calls.len());
        assert_eq!(count(&calls, "2"), 1, "only the first UI error reacts");
    }

    #[tokio::test]
    async fn single_ui_error_kills_and_is_returned() {
        let fx = Fixture::new(&[("LeaveGroup.sh", "echo 3\n")]);
        let exec = fx.executor();
        let result = exec.leave_group(&chat()).await.unwrap();
        assert_eq!(result, ExecutionResult::Single(StatusCode::UiError));
        let calls = wait_for_helper_calls(fx.root(), 3).await;
        assert_eq!(count(&calls, "2"), 1);
    }

    #[tokio::test]
    async fn failure_codes_other_than_ui_error_do_not_kill() {
        let fx = Fixture::new(&[("RenameGroup.sh", "echo 6\n")]);
        let exec = fx.executor();
        let result = exec.rename_group(&chat(), "Renamed").await.unwrap();
        assert_eq!(result, ExecutionResult::Single(StatusCode::GroupChatNotFound));
        wait_for_helper_calls(fx.root(), 1).await;
        tokio::time::sleep(SETTLE).await;
        assert_eq!(helper_calls(fx.root()), ["1"]);
    }

    #[tokio::test]
    async fn diagnostic_lines_are_discarded() {
        let fx = Fixture::new(&[(
            "AddParticipant.sh",
            "echo 'clicking row 3'\necho 7\necho 0\n",
        )]);
        let exec = fx.executor();
        let result = exec.add_participant(&chat(), "a@example.com").await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn arguments_reach_script_in_order() {
        let fx = Fixture::new(&[("RemoveParticipant.sh", RECORD_ARGS_SH)]);
        let exec = fx.executor();
        exec.remove_participant(&chat(), "bob@example.com")
            .await
            .unwrap();
        assert_eq!(fx.recorded_args(), ["3", "Book Club", "true", "bob@example.com"]);
    }

    #[tokio::test]
    async fn create_group_joins_participants() {
        let fx = Fixture::new(&[("CreateGroup.sh", RECORD_ARGS_SH)]);
        let exec = fx.executor();
        exec.create_group("Trip", &["+15550001", "amy@example.com"], "Welcome aboard")
            .await
            .unwrap();
        assert_eq!(
            fx.recorded_args(),
            ["Trip", "+15550001,amy@example.com", "Welcome aboard"]
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_queue_or_app() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo 0\n")]);
        let exec = fx.executor();

        let gate = exec.queue().acquire().await.unwrap();
        // Would block forever if it tried to queue behind `gate`.
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            exec.run(ActionRequest::new(ActionKind::SendMessage, ["+1555", "Hello"])),
        )
        .await
        .expect("validation must not wait for the queue")
        .unwrap_err();
        assert!(matches!(err, ActionError::InvalidArguments { kind: ActionKind::SendMessage, .. }));
        assert_eq!(exec.queue().waiting(), 0);
        drop(gate);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(helper_calls(fx.root()).is_empty());
    }

    #[tokio::test]
    async fn missing_script_fails_and_releases_queue() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo 0\n")]);
        let exec = fx.executor();

        let err = exec.leave_group(&chat()).await.unwrap_err();
        assert!(matches!(err, ActionError::ScriptNotFound(ref n) if n == "LeaveGroup"));
        assert!(!exec.queue().is_busy());

        let ok = exec.send_message("+1555", None, "still works").await.unwrap();
        assert!(ok.is_success());
    }

    #[tokio::test]
    async fn unmapped_status_is_an_error_without_kill() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo 99\n")]);
        let exec = fx.executor();
        let err = exec.send_message("+1555", None, "x").await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidStatusCode(ref t) if t == "99"));
        assert!(!exec.queue().is_busy());
        wait_for_helper_calls(fx.root(), 1).await;
        tokio::time::sleep(SETTLE).await;
        assert_eq!(helper_calls(fx.root()), ["1"]);
    }

    #[tokio::test]
    async fn separators_only_is_no_result() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo ', '\n")]);
        let exec = fx.executor();
        let result = exec.send_message("+1555", None, "x").await.unwrap();
        assert_eq!(result, ExecutionResult::NoResult);
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_and_releases_queue() {
        let fx = Fixture::new(&[("SendMessage.sh", "echo 0\n")]);
        let exec = fx.executor_with(RelayConfig {
            interpreter: "__nonexistent_interpreter_xyz__".into(),
            ..RelayConfig::default()
        });
        let err = exec.send_message("+1555", None, "x").await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::ProcessSpawn { ref script, .. } if script == "SendMessage.sh"
        ));
        assert!(!exec.queue().is_busy());
    }

    #[tokio::test]
    async fn hung_script_times_out_as_unknown_error() {
        let fx = Fixture::new(&[("SendMessage.sh", "sleep 5\necho 0\n")]);
        let exec = fx.executor_with(RelayConfig {
            script_timeout_secs: Some(1),
            ..Fixture::config()
        });

        let started = std::time::Instant::now();
        let result = exec.send_message("+1555", None, "x").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(result.is_unknown_error());
        assert!(!exec.queue().is_busy());

        let calls = wait_for_helper_calls(fx.root(), 3).await;
        assert_eq!(count(&calls, "2"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_actions_never_overlap() {
        let trace = "d=\"$(dirname \"$0\")/..\"\n\
                     echo \"start $3\" >> \"$d/trace.log\"\n\
                     sleep 0.05\n\
                     echo \"end $3\" >> \"$d/trace.log\"\n\
                     echo 0\n";
        let fx = Fixture::new(&[("SendMessage.sh", trace)]);
        let exec = Arc::new(fx.executor());

        let mut handles = Vec::new();
        for n in 0..5 {
            let exec = Arc::clone(&exec);
            handles.push(tokio::spawn(async move {
                exec.send_message("+1555", None, &format!("msg-{n}")).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap().is_success());
        }

        let lines = read_lines(&fx.root().join("trace.log"));
        assert_eq!(lines.len(), 10);
        for pair in lines.chunks(2) {
            let started = pair[0].strip_prefix("start ").expect("start marker");
            let ended = pair[1].strip_prefix("end ").expect("end marker");
            assert_eq!(started, ended, "actions overlapped: {lines:?}");
        }
    }

    #[tokio::test]
    async fn non_utf8_diagnostic_line_is_ignored() {
        let fx = Fixture::new(&[("SendMessage.sh", "printf 'caf\\351\\n'\necho 0\n")]);
        let exec = fx.executor();
        let result = exec.send_message("+1555", None, "x").await.unwrap();
        assert_eq!(result, ExecutionResult::Single(StatusCode::ActionPerformed));
    }

    #[tokio::test]
    async fn non_utf8_result_line_is_invalid_status() {
        let fx = Fixture::new(&[("SendMessage.sh", "printf '\\351\\n'\n")]);
        let exec = fx.executor();
        let err = exec.send_message("+1555", None, "x").await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidStatusCode(_)), "{err:?}");
        assert!(!exec.queue().is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn admitted_action_outlives_its_caller() {
        let script = "sleep 0.5\n\
                      touch \"$(dirname \"$0\")/../done\"\n\
                      echo 0\n";
        let fx = Fixture::new(&[("SendMessage.sh", script)]);
        let exec = Arc::new(fx.executor());

        let e = Arc::clone(&exec);
        let caller = tokio::spawn(async move { e.send_message("+1555", None, "x").await });
        for _ in 0..200 {
            if exec.queue().is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(exec.queue().is_busy(), "action was never admitted");

        tokio::time::sleep(Duration::from_millis(150)).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());
        assert!(exec.queue().is_busy(), "ticket released while the script still runs");
        assert!(!fx.root().join("done").exists());

        // The next caller is admitted only after the script has finished.
        let next = exec
            .queue()
            .acquire_timeout(Duration::from_secs(5))
            .await
            .unwrap();
        assert!(fx.root().join("done").exists());
        drop(next);
    }

    #[test]
    fn error_level_config_aborts_startup() {
        let fx = Fixture::new(&[]);
        let err = ScriptExecutor::new(
            fx.root(),
            RelayConfig {
                protocol_version: 0,
                ..Fixture::config()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, RelayError::InvalidConfig(ref m) if m.contains("protocol_version")));
    }

    #[tokio::test]
    async fn contact_sync_failure_never_kills() {
        let fx = Fixture::new(&[(
            "ContactSync.sh",
            "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/../args.txt\"\necho 1\n",
        )]);
        let exec = fx.executor();

        let outcome = exec.contact_sync().await.unwrap();
        assert_eq!(outcome, UtilityOutcome::Failed(1));
        assert!(!outcome.is_success());
        assert!(fx.root().join("contacts").is_dir());
        assert_eq!(fx.recorded_args(), ["true"]);

        tokio::time::sleep(SETTLE).await;
        assert!(helper_calls(fx.root()).is_empty());
    }

    #[tokio::test]
    async fn setup_reports_version_mismatch_without_kill() {
        let fx = Fixture::new(&[(
            "Setup.sh",
            "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/../args.txt\"\necho 2\n",
        )]);
        let exec = fx.executor_with(RelayConfig {
            protocol_version: 4,
            ..Fixture::config()
        });

        let outcome = exec.check_setup().await.unwrap();
        assert_eq!(outcome, UtilityOutcome::VersionMismatch);
        assert_eq!(fx.recorded_args(), ["4"]);
        tokio::time::sleep(SETTLE).await;
        assert!(helper_calls(fx.root()).is_empty());
    }

    #[tokio::test]
    async fn setup_success() {
        let fx = Fixture::new(&[("Setup.sh", "echo 0\n")]);
        let exec = fx.executor();
        assert!(exec.check_setup().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn generic_run_folds_utility_outcome() {
        let fx = Fixture::new(&[("Setup.sh", "echo 2\n")]);
        let exec = fx.executor();
        let result = exec.run(ActionRequest::setup(1)).await.unwrap();
        assert_eq!(result, ExecutionResult::Single(StatusCode::VersionMismatch));
    }

    #[tokio::test]
    async fn utility_actions_wait_their_turn() {
        let fx = Fixture::new(&[("ContactSync.sh", "echo 0\n")]);
        let exec = Arc::new(fx.executor());

        let gate = exec.queue().acquire().await.unwrap();
        let e = Arc::clone(&exec);
        let sync = tokio::spawn(async move { e.contact_sync().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sync.is_finished());
        assert_eq!(exec.queue().waiting(), 1);

        drop(gate);
        assert_eq!(sync.await.unwrap().unwrap(), UtilityOutcome::Performed);
    }

    #[test]
    fn missing_scripts_folder_aborts_startup() {
        let root = TempDir::new().unwrap();
        let err = ScriptExecutor::new(root.path(), Fixture::config())
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::ScriptsFolderMissing(_)));
    }

    #[test]
    fn executors_get_distinct_workspaces_removed_on_shutdown() {
        let fx = Fixture::new(&[]);
        let a = fx.executor();
        let b = fx.executor();
        assert_ne!(a.temp_dir(), b.temp_dir());

        let staged = a.stage_attachment("note.txt", b"hello").unwrap();
        assert!(staged.starts_with(a.temp_dir()));

        let dir = a.temp_dir().to_path_buf();
        a.shutdown();
        assert!(!dir.exists());
        a.shutdown();
        assert!(matches!(
            a.stage_attachment("late.txt", b"x"),
            Err(ActionError::ShutDown)
        ));

        let dir_b = b.temp_dir().to_path_buf();
        drop(b);
        assert!(!dir_b.exists());
    }
}
