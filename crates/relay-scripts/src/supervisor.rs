use std::sync::Arc;
use std::time::Duration;

use relay_core::paths::HELPERS_SCRIPT;
use tracing::{debug, error, info, warn};

use crate::process;
use crate::registry::ScriptRegistry;

/// Helpers-script mode that launches (or foregrounds) the messaging app.
const LAUNCH_MODE: &str = "1";
/// Helpers-script mode that force-quits the messaging app.
const QUIT_MODE: &str = "2";

/// Launches and force-quits the automated messaging app through the
/// `Helpers` script.
///
/// Every call is fire-and-forget and best effort: failures are logged and
/// never reach the caller. Launching an app that is already running is
/// harmless, so `start` may be called as often as needed.
#[derive(Clone)]
pub struct AppSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ScriptRegistry,
    interpreter: String,
    respawn_delay: Duration,
}

impl AppSupervisor {
    pub fn new(
        registry: ScriptRegistry,
        interpreter: impl Into<String>,
        respawn_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                interpreter: interpreter.into(),
                respawn_delay,
            }),
        }
    }

    pub fn respawn_delay(&self) -> Duration {
        self.inner.respawn_delay
    }

    pub fn start(&self) {
        self.invoke(LAUNCH_MODE, "launch");
    }

    /// Force-quit the app. With `respawn`, relaunch it once after the
    /// respawn delay on a detached task.
    pub fn kill(&self, respawn: bool) {
        self.invoke(QUIT_MODE, "quit");
        if !respawn {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let this = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep(this.inner.respawn_delay).await;
                    info!("relaunching messaging app");
                    this.start();
                });
            }
            Err(_) => warn!("no async runtime available; messaging app will not be relaunched"),
        }
    }

    fn invoke(&self, mode: &str, what: &str) {
        let script = match self.inner.registry.resolve(HELPERS_SCRIPT) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "cannot {what} messaging app");
                return;
            }
        };

        if tokio::runtime::Handle::try_current().is_err() {
            error!("cannot {what} messaging app outside an async runtime");
            return;
        }

        match process::spawn_detached(&self.inner.interpreter, &script, &[mode.to_string()]) {
            Ok(()) => debug!(mode, "helpers script spawned"),
            Err(e) => error!(
                error = %e,
                "an error occurred while trying to {what} the messaging app"
            ),
        }
    }
}
