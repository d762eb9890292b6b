//! File watching and debounced rebuilds.
//!
//! [`FileWatcher`] forwards changed paths from `notify`; [`RebuildScheduler`]
//! decides when they turn into a rebuild; [`watch_and_rebuild`] drives
//! both against a [`Builder`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use super::builder::{BuildError, Builder};
use super::pipeline::RenderStats;
use crate::log;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Rebuild scheduling
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Idle,
    Rendering,
    /// Changes arrived while rendering; another pass follows this one.
    ReQueued,
}

/// Debounce state machine for change-triggered rebuilds.
///
/// Changed paths collect in a pending set and every notification restarts
/// the debounce timer. When the timer expires while idle, the pending set
/// is drained into one rebuild. When it expires mid-render the timer is
/// simply restarted, so renders never overlap.
#[derive(Debug)]
pub struct RebuildScheduler {
    debounce: Duration,
    pending: BTreeSet<PathBuf>,
    deadline: Option<Instant>,
    state: RebuildState,
}

impl RebuildScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: BTreeSet::new(),
            deadline: None,
            state: RebuildState::Idle,
        }
    }

    pub fn state(&self) -> RebuildState {
        self.state
    }

    /// When the next [`poll`](Self::poll) may start a rebuild.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record a changed path and restart the timer.
    pub fn notify(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path);
        self.deadline = Some(now + self.debounce);
        if self.state == RebuildState::Rendering {
            self.state = RebuildState::ReQueued;
        }
    }

    /// Start a rebuild if the timer has expired and nothing is rendering.
    ///
    /// Returns the drained pending paths; the scheduler is then `Rendering`
    /// until [`finish`](Self::finish) is called.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        if self.state != RebuildState::Idle {
            self.deadline = Some(now + self.debounce);
            return None;
        }

        self.deadline = None;
        if self.pending.is_empty() {
            return None;
        }
        self.state = RebuildState::Rendering;
        Some(std::mem::take(&mut self.pending).into_iter().collect())
    }

    /// Mark the running rebuild as done. Changes that arrived meanwhile
    /// become due immediately.
    pub fn finish(&mut self, now: Instant) {
        self.state = RebuildState::Idle;
        if !self.pending.is_empty() {
            self.deadline = Some(now);
        }
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// Recursive watcher over a set of directories, yielding changed paths.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: UnboundedReceiver<PathBuf>,
}

impl FileWatcher {
    /// Watch every existing directory in `dirs` recursively.
    pub fn new(dirs: &[PathBuf]) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) if is_relevant_event(&event.kind) => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => log!("warn"; "watch error: {}", e),
            }
        })?;

        for dir in dirs {
            if dir.exists() {
                watcher.watch(dir, RecursiveMode::Recursive)?;
            }
        }

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// The next changed path; `None` once the watcher is gone.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

// =============================================================================
// Watch loop
// =============================================================================

type RenderTask = JoinHandle<(Builder, Result<RenderStats, BuildError>)>;

/// Rebuild whenever watched files change, until the watcher closes.
///
/// Each rebuild runs on its own task holding the builder; render errors
/// are logged and watching continues. `on_rebuilt` runs after every
/// successful pass.
pub async fn watch_and_rebuild<F>(builder: Builder, mut watcher: FileWatcher, on_rebuilt: F)
where
    F: Fn(&RenderStats),
{
    let debounce = Duration::from_millis(builder.config().watch.debounce_ms);
    let mut scheduler = RebuildScheduler::new(debounce);
    let mut idle_builder = Some(builder);
    let mut running: Option<RenderTask> = None;

    loop {
        let deadline = scheduler.deadline();
        tokio::select! {
            changed = watcher.recv() => match changed {
                Some(path) => scheduler.notify(path, Instant::now()),
                None => break,
            },
            _ = sleep_until(deadline) => {
                if let Some(paths) = scheduler.poll(Instant::now())
                    && let Some(mut builder) = idle_builder.take()
                {
                    log!("watch"; "{} change(s), rebuilding", paths.len());
                    running = Some(tokio::spawn(async move {
                        let result = builder.rebuild(&paths).await;
                        (builder, result)
                    }));
                }
            },
            joined = join_running(&mut running) => {
                running = None;
                scheduler.finish(Instant::now());
                match joined {
                    Ok((builder, result)) => {
                        match result {
                            Ok(stats) => on_rebuilt(&stats),
                            Err(e) => log!("error"; "{}", e),
                        }
                        idle_builder = Some(builder);
                    }
                    Err(e) => {
                        log!("error"; "rebuild task failed: {}", e);
                        break;
                    }
                }
            },
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn join_running(
    running: &mut Option<RenderTask>,
) -> Result<(Builder, Result<RenderStats, BuildError>), tokio::task::JoinError> {
    match running {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}
