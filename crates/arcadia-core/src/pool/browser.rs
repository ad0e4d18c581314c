//! Headless browser processes as pooled resources.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use arcadia_types::{PoolConfig, PoolError};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ResourceManager;

const HEADLESS_ARGS: [&str; 4] =
    ["--headless", "--no-sandbox", "--disable-setuid-sandbox", "--remote-debugging-port=0"];

/// User agent handed to every browsing session.
pub const SESSION_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// One running browser process.
#[derive(Debug, Clone)]
pub struct BrowserInstance {
    pub id: Uuid,
    pub pid: Option<u32>,
    child: Arc<Mutex<Child>>,
    profile: Arc<TempDir>,
}

impl BrowserInstance {
    pub fn profile_dir(&self) -> &Path {
        self.profile.path()
    }
}

/// Isolated browsing context derived from a [`BrowserInstance`].
#[derive(Debug, Clone)]
pub struct BrowserSession {
    pub id: Uuid,
    pub browser_id: Uuid,
    pub user_agent: String,
    dir: Arc<TempDir>,
}

impl BrowserSession {
    /// Scratch directory private to this session, removed when the last clone drops.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Launches browser processes with `tokio::process`.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    program: String,
    args: Vec<String>,
    /// Pass `--user-data-dir=<profile>` to each process.
    chromium_profile: bool,
}

impl BrowserManager {
    /// Headless Chromium-family browser from the pool config.
    pub fn new(config: &PoolConfig) -> Self {
        let mut args: Vec<String> = HEADLESS_ARGS.iter().map(|a| a.to_string()).collect();
        args.extend(config.extra_args.iter().cloned());
        Self { program: config.executable.clone(), args, chromium_profile: true }
    }

    /// Any long-running program, launched as-is.
    pub fn command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args, chromium_profile: false }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolve_program(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths).map(|dir| dir.join(program)).find(|p| p.is_file())
    }
}

#[async_trait]
impl ResourceManager for BrowserManager {
    type Resource = BrowserInstance;
    type Session = BrowserSession;

    async fn startup(&self) -> Result<(), PoolError> {
        match self.resolve_program() {
            Some(path) => {
                debug!(program = %path.display(), "Browser executable found");
                Ok(())
            },
            None => Err(PoolError::CreationFailed {
                message: format!("browser executable '{}' not found", self.program),
            }),
        }
    }

    async fn create(&self) -> Result<BrowserInstance, PoolError> {
        let profile = tempfile::Builder::new()
            .prefix("arcadia-browser-")
            .tempdir()
            .map_err(|e| PoolError::CreationFailed { message: format!("profile dir: {e}") })?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.chromium_profile {
            command.arg(format!("--user-data-dir={}", profile.path().display()));
        }
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PoolError::CreationFailed {
                message: format!("failed to launch {}: {}", self.program, e),
            })?;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(PoolError::CreationFailed {
                message: format!("{} exited immediately with {}", self.program, status),
            });
        }

        let instance = BrowserInstance {
            id: Uuid::new_v4(),
            pid: child.id(),
            child: Arc::new(Mutex::new(child)),
            profile: Arc::new(profile),
        };
        debug!(id = %instance.id, pid = ?instance.pid, "Launched browser process");
        Ok(instance)
    }

    fn is_alive(&self, browser: &BrowserInstance) -> bool {
        matches!(browser.child.lock().try_wait(), Ok(None))
    }

    async fn close(&self, browser: BrowserInstance) {
        let mut child = browser.child.lock();
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        if let Err(e) = child.start_kill() {
            warn!(id = %browser.id, error = %e, "Failed to kill browser process");
        } else {
            debug!(id = %browser.id, "Killed browser process");
        }
    }

    async fn new_session(&self, browser: &BrowserInstance) -> Result<BrowserSession, PoolError> {
        if !self.is_alive(browser) {
            return Err(PoolError::SessionFailed {
                message: format!("browser {} is not running", browser.id),
            });
        }

        let dir = tempfile::Builder::new()
            .prefix("arcadia-session-")
            .tempdir_in(browser.profile_dir())
            .map_err(|e| PoolError::SessionFailed { message: e.to_string() })?;

        Ok(BrowserSession {
            id: Uuid::new_v4(),
            browser_id: browser.id,
            user_agent: SESSION_USER_AGENT.to_string(),
            dir: Arc::new(dir),
        })
    }

    async fn close_session(&self, session: BrowserSession) {
        debug!(id = %session.id, browser = %session.browser_id, "Closed browser session");
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleeper() -> BrowserManager {
        BrowserManager::command("sleep", vec!["30".to_string()])
    }

    async fn wait_dead(manager: &BrowserManager, browser: &BrowserInstance) -> bool {
        for _ in 0..50 {
            if !manager.is_alive(browser) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_missing_executable_fails_startup() {
        let manager = BrowserManager::command("arcadia-no-such-browser", Vec::new());
        assert!(matches!(manager.startup().await, Err(PoolError::CreationFailed { .. })));
        assert!(matches!(manager.create().await, Err(PoolError::CreationFailed { .. })));
    }

    #[tokio::test]
    async fn test_process_lifecycle() {
        let manager = sleeper();
        manager.startup().await.unwrap();

        let browser = manager.create().await.unwrap();
        assert!(manager.is_alive(&browser));

        manager.close(browser.clone()).await;
        assert!(wait_dead(&manager, &browser).await);

        // Closing twice is harmless.
        manager.close(browser).await;
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let manager = sleeper();
        let browser = manager.create().await.unwrap();

        let a = manager.new_session(&browser).await.unwrap();
        let b = manager.new_session(&browser).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().starts_with(browser.profile_dir()));

        let dir = a.dir().to_path_buf();
        manager.close_session(a).await;
        assert!(!dir.exists());

        manager.close(browser).await;
    }

    #[tokio::test]
    async fn test_session_on_dead_browser_fails() {
        let manager = sleeper();
        let browser = manager.create().await.unwrap();
        manager.close(browser.clone()).await;
        assert!(wait_dead(&manager, &browser).await);

        let result = manager.new_session(&browser).await;
        assert!(matches!(result, Err(PoolError::SessionFailed { .. })));
    }

    #[test]
    fn test_chromium_flags() {
        let manager = BrowserManager::new(&PoolConfig::default());
        assert!(manager.args.iter().any(|a| a == "--headless"));
        assert!(manager.args.iter().any(|a| a == "--no-sandbox"));
        assert!(manager.chromium_profile);
    }
}
