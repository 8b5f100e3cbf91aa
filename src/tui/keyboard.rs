//! Keyboard pipeline
//!
//! An independent loop polls the input source without blocking, filters key
//! repeats, classifies each press and raises typed events. The pipeline never
//! touches components: the orchestrator subscribes and routes events to the
//! focused component.
//!
//! # Classification
//!
//! ```text
//! press ──▶ modifiers + exact binding? ──yes──▶ binding handler (handled)
//!                  │ no
//!                  ▼
//!          Char without Ctrl/Alt? ──yes──▶ CharacterTyped
//!                  │ no
//!                  ▼
//!          navigation / editing key? ──yes──▶ KeyPressed
//!                  │ no
//!                  ▼
//!          Ctrl/Alt held? ──yes──▶ KeyCombinationPressed
//!                  │ no
//!                  ▼
//!              KeyPressed
//! ```
//!
//! Subscribers of one event kind form a chain: once a subscriber marks the
//! event handled, the rest are skipped.

use crate::config::KeyboardConfig;
use crate::tui::input::RepeatFilter;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// Input sources
// ─────────────────────────────────────────────────────────────────────────────

/// Where raw terminal events come from
pub trait InputSource: Send {
    /// Non-blocking read: `Ok(None)` when nothing is available
    fn poll_event(&mut self) -> Result<Option<Event>>;
}

/// Reads from the real terminal via crossterm
#[derive(Debug, Default)]
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn poll_event(&mut self) -> Result<Option<Event>> {
        if !event::poll(Duration::ZERO).context("Failed to poll terminal input")? {
            return Ok(None);
        }
        let event = event::read().context("Failed to read terminal input")?;
        Ok(Some(event))
    }
}

/// Queue-backed source for headless runs and tests
///
/// Clones share the same queue, so a caller can keep feeding events after
/// the pipeline has taken its copy.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: Arc<Mutex<VecDeque<Result<Event, String>>>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.queue.lock().push_back(Ok(event));
    }

    pub fn push_key(&self, code: KeyCode, modifiers: KeyModifiers) {
        self.push(Event::Key(KeyEvent::new(code, modifiers)));
    }

    /// Queue every character of `text` as a plain key press
    pub fn type_text(&self, text: &str) {
        for ch in text.chars() {
            self.push_key(KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    /// Queue a read failure
    pub fn push_error(&self, message: impl Into<String>) {
        self.queue.lock().push_back(Err(message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll_event(&mut self) -> Result<Option<Event>> {
        match self.queue.lock().pop_front() {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Which chain an input was raised on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInputKind {
    /// Printable character without Ctrl/Alt
    Character(char),
    /// Navigation / editing key, or an unmodified special key
    Pressed,
    /// Modified key with no binding
    Combination,
}

/// One classified keystroke
///
/// Immutable apart from the handled flag, which stops propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub kind: KeyInputKind,
    handled: bool,
}

impl KeyInput {
    pub fn new(code: KeyCode, modifiers: KeyModifiers, kind: KeyInputKind) -> Self {
        Self {
            code,
            modifiers,
            kind,
            handled: false,
        }
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn mark_handled(&mut self) {
        self.handled = true;
    }
}

type KeyHandler = Arc<dyn Fn(&mut KeyInput) + Send + Sync>;
type BindingHandler = Arc<dyn Fn() + Send + Sync>;
type ResizeHandler = Arc<dyn Fn(u16, u16) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    character_typed: Vec<KeyHandler>,
    key_pressed: Vec<KeyHandler>,
    combination_pressed: Vec<KeyHandler>,
    resized: Vec<ResizeHandler>,
}

/// Counters since the pipeline was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyboardStatistics {
    pub total_events: u64,
    pub characters: u64,
    pub key_presses: u64,
    pub combinations: u64,
    pub bindings_triggered: u64,
    /// Presses dropped by the repeat filter
    pub filtered: u64,
    /// Events no subscriber marked handled
    pub unhandled: u64,
    pub errors: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

pub struct KeyboardPipeline {
    config: KeyboardConfig,
    bindings: RwLock<HashMap<(KeyCode, KeyModifiers), BindingHandler>>,
    subscribers: RwLock<Subscribers>,
    repeat_filter: Mutex<RepeatFilter>,
    stats: Mutex<KeyboardStatistics>,
    stop: Mutex<Option<CancellationToken>>,
    running: AtomicBool,
}

impl KeyboardPipeline {
    pub fn new(config: KeyboardConfig) -> Self {
        Self {
            config,
            bindings: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Subscribers::default()),
            repeat_filter: Mutex::new(RepeatFilter::for_chat_input()),
            stats: Mutex::new(KeyboardStatistics::default()),
            stop: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Bind a handler to an exact (key, modifiers) pair
    ///
    /// Only consulted when modifiers are present. Re-binding replaces.
    pub fn register_binding(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        handler: impl Fn() + Send + Sync + 'static,
    ) {
        self.bindings
            .write()
            .insert((code, modifiers), Arc::new(handler));
    }

    pub fn on_character_typed(&self, handler: impl Fn(&mut KeyInput) + Send + Sync + 'static) {
        self.subscribers
            .write()
            .character_typed
            .push(Arc::new(handler));
    }

    pub fn on_key_pressed(&self, handler: impl Fn(&mut KeyInput) + Send + Sync + 'static) {
        self.subscribers.write().key_pressed.push(Arc::new(handler));
    }

    pub fn on_combination_pressed(
        &self,
        handler: impl Fn(&mut KeyInput) + Send + Sync + 'static,
    ) {
        self.subscribers
            .write()
            .combination_pressed
            .push(Arc::new(handler));
    }

    pub fn on_resize(&self, handler: impl Fn(u16, u16) + Send + Sync + 'static) {
        self.subscribers.write().resized.push(Arc::new(handler));
    }

    pub fn statistics(&self) -> KeyboardStatistics {
        *self.stats.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the polling loop. It stops when `cancel` fires or on `stop()`.
    pub fn start(
        self: &Arc<Self>,
        source: Box<dyn InputSource>,
        cancel: &CancellationToken,
    ) -> JoinHandle<Result<()>> {
        let token = cancel.child_token();
        *self.stop.lock() = Some(token.clone());
        tokio::spawn(Arc::clone(self).run(source, token))
    }

    /// Stop the polling loop started with `start`. Idempotent.
    pub fn stop(&self) {
        if let Some(token) = self.stop.lock().take() {
            token.cancel();
        }
    }

    /// Poll until cancelled
    ///
    /// Read failures are logged and retried. More than
    /// `max_consecutive_errors` in a row ends the loop with an error.
    pub async fn run(self: Arc<Self>, mut source: Box<dyn InputSource>, cancel: CancellationToken) -> Result<()> {
        self.running.store(true, Ordering::Release);
        tracing::debug!("Keyboard pipeline started");

        let mut consecutive_errors: u32 = 0;
        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            match source.poll_event() {
                Ok(Some(event)) => {
                    consecutive_errors = 0;
                    self.handle_event(event);
                    // Drain whatever else is queued before sleeping
                    continue;
                }
                Ok(None) => consecutive_errors = 0,
                Err(e) => {
                    consecutive_errors += 1;
                    self.stats.lock().errors += 1;
                    tracing::warn!("Keyboard input error ({} in a row): {:#}", consecutive_errors, e);
                    if consecutive_errors > self.config.max_consecutive_errors {
                        break Err(e.context(format!(
                            "keyboard input failed {consecutive_errors} times in a row"
                        )));
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        };

        self.running.store(false, Ordering::Release);
        tracing::debug!("Keyboard pipeline stopped");
        result
    }

    /// Apply the repeat filter, then dispatch
    pub fn handle_event(&self, event: Event) {
        match event {
            Event::Key(key) => match key.kind {
                KeyEventKind::Release => self.repeat_filter.lock().release(key.code),
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    if self.repeat_filter.lock().accept_press(key.code) {
                        self.dispatch(key);
                    } else {
                        self.stats.lock().filtered += 1;
                    }
                }
            },
            Event::Resize(width, height) => {
                let handlers = self.subscribers.read().resized.clone();
                for handler in handlers {
                    handler(width, height);
                }
            }
            _ => {}
        }
    }

    /// Classify one key press and raise it. Returns whether it was handled.
    pub fn dispatch(&self, key: KeyEvent) -> bool {
        self.stats.lock().total_events += 1;
        let code = key.code;
        let modifiers = key.modifiers;

        if !modifiers.is_empty() {
            let binding = self.bindings.read().get(&(code, modifiers)).cloned();
            if let Some(handler) = binding {
                self.stats.lock().bindings_triggered += 1;
                tracing::trace!("Binding {:?}+{:?} triggered", modifiers, code);
                handler();
                return true;
            }
        }

        let control = modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
        let kind = match code {
            KeyCode::Char(ch) if !control => KeyInputKind::Character(ch),
            _ if is_navigation_or_editing(code) => KeyInputKind::Pressed,
            _ if control => KeyInputKind::Combination,
            _ => KeyInputKind::Pressed,
        };

        let mut input = KeyInput::new(code, modifiers, kind);
        let chain = {
            let subscribers = self.subscribers.read();
            let mut stats = self.stats.lock();
            match kind {
                KeyInputKind::Character(_) => {
                    stats.characters += 1;
                    subscribers.character_typed.clone()
                }
                KeyInputKind::Pressed => {
                    stats.key_presses += 1;
                    subscribers.key_pressed.clone()
                }
                KeyInputKind::Combination => {
                    stats.combinations += 1;
                    subscribers.combination_pressed.clone()
                }
            }
        };

        // Locks released: handlers may subscribe or bind
        for handler in chain {
            if input.is_handled() {
                break;
            }
            handler(&mut input);
        }

        if !input.is_handled() {
            self.stats.lock().unhandled += 1;
        }
        input.is_handled()
    }
}

fn is_navigation_or_editing(code: KeyCode) -> bool {
    matches!(
        code,
        KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Home
            | KeyCode::End
            | KeyCode::PageUp
            | KeyCode::PageDown
            | KeyCode::Enter
            | KeyCode::Backspace
            | KeyCode::Delete
            | KeyCode::Esc
            | KeyCode::Tab
            | KeyCode::BackTab
    )
}
