// State management module
//
// This module provides the OptionsStore which owns the draft and committed
// generator configurations, debounces the free-text fields, and emits change
// events for the reactive pipeline.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::{
    Color, EccLevel, LogoError, LogoSource, QrOptions, StudioConfig, capacity, clamp_module_size,
};

/// Delay between the last edit of a debounced field and its commit.
pub const COMMIT_DELAY: Duration = Duration::from_millis(500);

/// Change events emitted when the committed configuration is modified
///
/// Draft edits are silent; only commits notify subscribers, so the encoder
/// and exporter never react per keystroke.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Debounced content has been committed
    ContentCommitted {
        content: String,
    },

    /// The active logo source changed (upload, committed URL, or removal)
    LogoChanged {
        source: LogoSource,
    },

    /// Foreground or background color changed
    StyleChanged,

    /// Module size changed (already snapped and clamped)
    ModuleSizeChanged {
        module_size: u32,
    },

    /// Error-correction level changed
    LevelChanged {
        level: EccLevel,
    },

    /// The capacity guard verdict flipped
    CapacityStateChanged {
        is_too_long: bool,
        length: usize,
        capacity: usize,
    },
}

/// Draft and committed configuration values.
///
/// `draft` tracks every edit synchronously; `committed` is what the encoder
/// and export pipeline consume. Content and the remote logo URL move from
/// draft to committed only after their debounce timers fire; every other
/// field commits synchronously.
#[derive(Debug, Clone, Default)]
pub struct GeneratorState {
    pub draft: QrOptions,
    pub committed: QrOptions,
}

/// The two independently debounced fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebouncedField {
    Content,
    LogoUrl,
}

/// A pending debounce timer.
///
/// The epoch guards against the abort race: a timer task that fires while
/// its replacement is being scheduled re-checks the epoch and gives up, so
/// only the timer that survived uninterrupted ever commits.
#[derive(Debug, Default)]
struct PendingCommit {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

/// Thread-safe configuration store with debounced commits and event emission
///
/// This is the central state component:
/// - Owns draft and committed [`QrOptions`] behind one `RwLock`
/// - Debounces content and logo-URL edits with cancellable timers
/// - Detects committed-state changes and emits [`StateChange`] events
/// - Enforces the logo mutual-exclusivity policy transactionally
///
/// # Usage
///
/// Mutate only through the setter operations; read through
/// [`snapshot()`](Self::snapshot) or [`committed()`](Self::committed).
/// Cloning the store shares the underlying state and channel.
pub struct OptionsStore {
    /// Draft and committed options behind one lock so readers never observe
    /// a torn pair
    state: Arc<RwLock<GeneratorState>>,

    /// Broadcast channel for committed-change events
    state_tx: broadcast::Sender<StateChange>,

    /// Runtime handle used to spawn debounce timers
    runtime: tokio::runtime::Handle,

    /// Debounce delay (fixed in production, shortened in tests)
    commit_delay: Duration,

    content_timer: Arc<Mutex<PendingCommit>>,
    logo_timer: Arc<Mutex<PendingCommit>>,
}

impl OptionsStore {
    /// Create a new store with default options and the standard 500 ms
    /// commit delay.
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self::with_commit_delay(runtime, COMMIT_DELAY)
    }

    /// Create a store with a custom commit delay.
    pub fn with_commit_delay(runtime: tokio::runtime::Handle, commit_delay: Duration) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(GeneratorState::default())),
            state_tx,
            runtime,
            commit_delay,
            content_timer: Arc::new(Mutex::new(PendingCommit::default())),
            logo_timer: Arc::new(Mutex::new(PendingCommit::default())),
        }
    }

    /// Get a snapshot of the full draft/committed pair.
    pub fn snapshot(&self) -> GeneratorState {
        self.state.read().unwrap().clone()
    }

    /// Get a snapshot of the committed configuration.
    pub fn committed(&self) -> QrOptions {
        self.state.read().unwrap().committed.clone()
    }

    /// Execute a function with read access to the state.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GeneratorState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Subscribe to committed-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// The capacity guard verdict for the committed configuration.
    pub fn is_too_long(&self) -> bool {
        self.read(|state| {
            capacity::is_too_long(&state.committed.content, state.committed.level)
        })
    }

    /// Apply a mutation, diff the committed state, and emit events.
    ///
    /// Returns the events that were emitted.
    fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut GeneratorState),
    {
        let mut state = self.state.write().unwrap();
        let old = state.committed.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old, &state.committed);
        drop(state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Diff two committed configurations into events.
    fn detect_changes(old: &QrOptions, new: &QrOptions) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.content != new.content {
            changes.push(StateChange::ContentCommitted { content: new.content.clone() });
        }

        if old.logo != new.logo {
            changes.push(StateChange::LogoChanged { source: new.logo.clone() });
        }

        if old.foreground != new.foreground || old.background != new.background {
            changes.push(StateChange::StyleChanged);
        }

        if old.module_size != new.module_size {
            changes.push(StateChange::ModuleSizeChanged { module_size: new.module_size });
        }

        if old.level != new.level {
            changes.push(StateChange::LevelChanged { level: new.level });
        }

        let was_too_long = capacity::is_too_long(&old.content, old.level);
        let is_too_long = capacity::is_too_long(&new.content, new.level);
        if was_too_long != is_too_long {
            changes.push(StateChange::CapacityStateChanged {
                is_too_long,
                length: capacity::content_length(&new.content),
                capacity: capacity::capacity_for(new.level),
            });
        }

        changes
    }

    // Setter operations

    /// Record a content edit and schedule its debounced commit.
    pub fn set_content(&self, content: &str) {
        {
            let mut state = self.state.write().unwrap();
            state.draft.content = content.to_string();
        }
        self.schedule_commit(DebouncedField::Content);
    }

    /// Set the module size (snapped to step, clamped to range). Commits
    /// synchronously.
    pub fn set_module_size(&self, requested: u32) -> Vec<StateChange> {
        let module_size = clamp_module_size(requested);
        self.update(|state| {
            state.draft.module_size = module_size;
            state.committed.module_size = module_size;
        })
    }

    /// Set the foreground color. Commits synchronously.
    pub fn set_foreground(&self, color: Color) -> Vec<StateChange> {
        self.update(|state| {
            state.draft.foreground = color;
            state.committed.foreground = color;
        })
    }

    /// Set the background color. Commits synchronously.
    pub fn set_background(&self, color: Color) -> Vec<StateChange> {
        self.update(|state| {
            state.draft.background = color;
            state.committed.background = color;
        })
    }

    /// Set the error-correction level. Commits synchronously.
    pub fn set_level(&self, level: EccLevel) -> Vec<StateChange> {
        self.update(|state| {
            state.draft.level = level;
            state.committed.level = level;
        })
    }

    /// Attach an uploaded logo file.
    ///
    /// Resolves the bytes into a data URI, replaces any remote URL (draft
    /// and committed), cancels a pending URL commit, and commits
    /// synchronously.
    pub fn set_uploaded_logo(&self, bytes: &[u8]) -> Result<Vec<StateChange>, LogoError> {
        let source = LogoSource::from_upload(bytes)?;
        self.cancel_pending(DebouncedField::LogoUrl);
        Ok(self.update(|state| {
            state.draft.logo = source.clone();
            state.committed.logo = source;
        }))
    }

    /// Record a logo URL edit and schedule its debounced commit.
    ///
    /// A non-empty URL immediately clears an uploaded logo (the two sources
    /// are mutually exclusive); the URL itself becomes the active source
    /// only once its timer fires.
    pub fn set_logo_url(&self, url: &str) {
        let source = LogoSource::from_url(url);
        {
            let mut state = self.state.write().unwrap();
            state.draft.logo = source.clone();
        }
        if source.is_active() {
            self.update(|state| {
                if matches!(state.committed.logo, LogoSource::Uploaded { .. }) {
                    state.committed.logo = LogoSource::None;
                }
            });
        }
        self.schedule_commit(DebouncedField::LogoUrl);
    }

    /// Remove the logo entirely: both sources and the draft URL field are
    /// reset, and any pending URL commit is cancelled.
    pub fn remove_logo(&self) -> Vec<StateChange> {
        self.cancel_pending(DebouncedField::LogoUrl);
        self.update(|state| {
            state.draft.logo = LogoSource::None;
            state.committed.logo = LogoSource::None;
        })
    }

    /// Load persisted settings directly into draft and committed state,
    /// bypassing the debounce (nothing is "in flight" at startup).
    pub fn load_from_config(&self, config: &StudioConfig) -> Result<Vec<StateChange>> {
        let settings = &config.settings;

        let foreground = Color::parse(&settings.foreground)
            .with_context(|| format!("invalid foreground color: {}", settings.foreground))?;
        let background = Color::parse(&settings.background)
            .with_context(|| format!("invalid background color: {}", settings.background))?;
        let level: EccLevel = settings
            .level
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .with_context(|| format!("invalid error-correction level: {}", settings.level))?;

        let options = QrOptions {
            content: settings.content.clone(),
            module_size: clamp_module_size(settings.module_size),
            foreground,
            background,
            level,
            logo: LogoSource::from_url(&settings.logo_url),
        };

        tracing::info!(
            "Loaded settings: {} chars, {}px, level {}, logo {}",
            capacity::content_length(&options.content),
            options.module_size,
            options.level,
            if options.logo.is_active() { "set" } else { "none" }
        );

        Ok(self.update(|state| {
            state.draft = options.clone();
            state.committed = options;
        }))
    }

    // Debounce plumbing

    fn timer_for(&self, field: DebouncedField) -> &Arc<Mutex<PendingCommit>> {
        match field {
            DebouncedField::Content => &self.content_timer,
            DebouncedField::LogoUrl => &self.logo_timer,
        }
    }

    /// Schedule a commit for a debounced field, cancelling any pending one.
    fn schedule_commit(&self, field: DebouncedField) {
        let mut pending = self.timer_for(field).lock().unwrap();
        pending.epoch += 1;
        let epoch = pending.epoch;

        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }

        let store = self.clone();
        let delay = self.commit_delay;
        pending.handle = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            store.fire_commit(field, epoch);
        }));
    }

    /// Cancel a pending commit without scheduling a replacement.
    fn cancel_pending(&self, field: DebouncedField) {
        let mut pending = self.timer_for(field).lock().unwrap();
        pending.epoch += 1;
        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }
    }

    /// Commit a debounced field if this timer is still the live one.
    fn fire_commit(&self, field: DebouncedField, epoch: u64) {
        {
            let pending = self.timer_for(field).lock().unwrap();
            if pending.epoch != epoch {
                // Superseded by a later edit.
                return;
            }
        }

        let changes = match field {
            DebouncedField::Content => self.update(|state| {
                state.committed.content = state.draft.content.clone();
            }),
            DebouncedField::LogoUrl => self.update(|state| {
                // Only a URL draft commits here; an upload that arrived after
                // this timer was scheduled has already advanced the epoch.
                state.committed.logo = match &state.draft.logo {
                    LogoSource::Remote { url } => LogoSource::from_url(url),
                    _ => LogoSource::None,
                };
            }),
        };

        if !changes.is_empty() {
            tracing::debug!("Debounce commit for {:?}: {} change(s)", field, changes.len());
        }
    }
}

impl Default for OptionsStore {
    fn default() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

// Clones share state, channel, and timers.
impl Clone for OptionsStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            runtime: self.runtime.clone(),
            commit_delay: self.commit_delay,
            content_timer: Arc::clone(&self.content_timer),
            logo_timer: Arc::clone(&self.logo_timer),
        }
    }
}

impl std::fmt::Debug for OptionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsStore")
            .field("state", &self.state)
            .field("commit_delay", &self.commit_delay)
            .finish_non_exhaustive()
    }
}
