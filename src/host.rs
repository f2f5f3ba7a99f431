//! Capability traits implemented by the host application.
//!
//! The plugin core never talks to the host framework directly. Everything it
//! needs from the outside world is injected at construction time through the
//! traits in this module:
//!
//! - [`SettingsStore`] - persistence for the plugin settings
//! - [`LoginWindow`] - the embedded browser window capturing the OAuth
//!   redirect
//! - [`UiDispatcher`] - the host's single-threaded UI scheduling context
//!
//! Two implementations ship with the crate: [`QueueDispatcher`], a
//! channel-backed dispatcher that runs jobs serially on a pump task, and
//! [`MemorySettingsStore`], an in-memory store used by tests and host
//! prototypes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Res, config::PluginSettings, warning};

/// Persistence for the plugin settings, backed by the host's settings file.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Res<PluginSettings>;
    fn save(&self, settings: &PluginSettings) -> Res<()>;
}

/// The host's embedded browser window used for the OAuth login flow.
#[async_trait]
pub trait LoginWindow: Send + Sync {
    /// Opens the authorization page and resolves once the redirect is
    /// intercepted, yielding the captured authorization code. Resolves to
    /// `None` when the window is closed without reaching the redirect.
    async fn open_and_await_code(&self, url: &str) -> Option<String>;
}

/// The host's single-threaded UI scheduling context.
///
/// Subscriber callbacks may touch UI state, so they are never invoked from
/// the polling task directly; they are handed to the dispatcher instead.
/// Implementations must run jobs serially, in submission order.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: Box<dyn FnOnce() + Send>);
}

type Job = Box<dyn FnOnce() + Send>;

/// Channel-backed [`UiDispatcher`] running jobs serially on a pump task.
pub struct QueueDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl QueueDispatcher {
    /// Creates the dispatcher and spawns its pump task on the current
    /// runtime. Jobs run one at a time in submission order.
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Arc::new(Self { tx })
    }
}

impl UiDispatcher for QueueDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warning!("dispatcher queue is gone, dropping job");
        }
    }
}

/// In-memory [`SettingsStore`] for tests and host prototyping.
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<PluginSettings>,
}

impl MemorySettingsStore {
    pub fn with_settings(settings: PluginSettings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Res<PluginSettings> {
        let guard = self.inner.lock().map_err(|_| "settings store poisoned")?;
        Ok(guard.clone())
    }

    fn save(&self, settings: &PluginSettings) -> Res<()> {
        let mut guard = self.inner.lock().map_err(|_| "settings store poisoned")?;
        *guard = settings.clone();
        Ok(())
    }
}
