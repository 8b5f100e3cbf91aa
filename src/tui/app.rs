// Application orchestrator
//
// Wires the coordinator, layout calculator, renderer and keyboard pipeline
// together and owns the process lifetime.
//
// State machine:
//
//   [Created] ──run()──▶ [Initializing] ──mounted + first frame──▶ [Running]
//                                                                     │
//        cancel / Ctrl+C / unhandled error                            │
//                                                                     ▼
//   [Stopped] ◀──output cleared── [ShuttingDown] ◀────────────────────┘
//
// Three loops run while Running: the render loop, the keyboard loop and a
// statistics tick. All of them observe one cancellation token created from
// the caller's token when run() starts.

use crate::config::{KeyboardConfig, LayoutConfig, RenderConfig};
use crate::reactive::StateCoordinator;
use crate::tui::keyboard::{InputSource, KeyInput, KeyInputKind, KeyboardPipeline};
use crate::tui::layout::LayoutCalculator;
use crate::tui::renderer::Renderer;
use crate::tui::stats::{performing_well, AppStatistics, MemoryPressure};
use crate::tui::surface::RenderSurface;
use crate::tui::traits::{Component, ComponentId, Handled, Navigation, Zone};
use anyhow::{anyhow, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Awaited during shutdown, before components are disposed
type ShutdownHook = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle of an [`Application`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AppState {
    Created,
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("application is already running")]
    AlreadyRunning,

    #[error("application has stopped and cannot be run again")]
    Stopped,
}

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Started,
    Stopped { exit_code: i32 },
    UnhandledError(String),
}

/// Arguments for one run
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Submitted through the focused component once Running
    pub initial_prompt: Option<String>,
}

/// Settings the orchestrator needs from the loaded config
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub render: RenderConfig,
    pub keyboard: KeyboardConfig,
    pub layout: LayoutConfig,
}

pub struct Application {
    options: AppOptions,
    coordinator: Arc<StateCoordinator>,
    layout: Arc<LayoutCalculator>,
    renderer: Arc<Renderer>,
    keyboard: Arc<KeyboardPipeline>,
    input: Mutex<Option<Box<dyn InputSource>>>,
    focus: RwLock<Option<Arc<dyn Component>>>,
    state: Mutex<AppState>,
    run_token: Mutex<Option<CancellationToken>>,
    started_at: Mutex<Option<Instant>>,
    latest_stats: Mutex<Option<AppStatistics>>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
    events_tx: broadcast::Sender<AppEvent>,
    fatal_tx: mpsc::UnboundedSender<String>,
    fatal_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl Application {
    /// Build the runtime pieces. Must be called inside a Tokio runtime.
    pub fn new(
        options: AppOptions,
        surface: Box<dyn RenderSurface>,
        input: Box<dyn InputSource>,
    ) -> Arc<Self> {
        let coordinator = StateCoordinator::new(options.render.debounce);
        let layout = Arc::new(LayoutCalculator::new(options.layout.clone()));
        let renderer = Arc::new(Renderer::new(
            Arc::clone(&coordinator),
            Arc::clone(&layout),
            surface,
            options.render.tick,
        ));
        let keyboard = Arc::new(KeyboardPipeline::new(options.keyboard.clone()));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        let app = Arc::new(Self {
            options,
            coordinator,
            layout,
            renderer,
            keyboard,
            input: Mutex::new(Some(input)),
            focus: RwLock::new(None),
            state: Mutex::new(AppState::Created),
            run_token: Mutex::new(None),
            started_at: Mutex::new(None),
            latest_stats: Mutex::new(None),
            shutdown_hooks: Mutex::new(Vec::new()),
            events_tx,
            fatal_tx,
            fatal_rx: Mutex::new(Some(fatal_rx)),
        });
        app.wire_keyboard();
        app
    }

    /// Route keyboard events to the focused component
    fn wire_keyboard(self: &Arc<Self>) {
        self.keyboard.on_character_typed(router(Arc::downgrade(self)));
        self.keyboard.on_key_pressed(router(Arc::downgrade(self)));
        self.keyboard.on_combination_pressed(router(Arc::downgrade(self)));

        let app = Arc::downgrade(self);
        self.keyboard
            .register_binding(KeyCode::Char('c'), KeyModifiers::CONTROL, move || {
                if let Some(app) = app.upgrade() {
                    app.request_shutdown();
                }
            });

        // Redraw from the render loop; only it writes to the surface
        let coordinator = Arc::clone(&self.coordinator);
        self.keyboard.on_resize(move |width, height| {
            tracing::debug!("Terminal resized to {}x{}", width, height);
            coordinator.flush_pending();
        });
    }

    fn route_key(&self, input: &mut KeyInput) {
        let Some(component) = self.focus.read().clone() else {
            return;
        };
        let Some(target) = component.focus_target() else {
            return;
        };

        let handled = match input.kind {
            KeyInputKind::Character(ch) => {
                target.insert_char(ch);
                Handled::Yes
            }
            KeyInputKind::Pressed => match input.code {
                KeyCode::Enter => {
                    target.submit();
                    Handled::Yes
                }
                KeyCode::Backspace => {
                    target.delete_backward();
                    Handled::Yes
                }
                KeyCode::Delete => {
                    target.delete_forward();
                    Handled::Yes
                }
                KeyCode::Esc => target.clear(),
                code => match Navigation::from_key(code) {
                    Some(nav) => target.navigate(nav),
                    None => target.handle_key(code, input.modifiers),
                },
            },
            KeyInputKind::Combination => target.handle_key(input.code, input.modifiers),
        };

        if handled.was_handled() {
            input.mark_handled();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn coordinator(&self) -> &Arc<StateCoordinator> {
        &self.coordinator
    }

    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    pub fn keyboard(&self) -> &Arc<KeyboardPipeline> {
        &self.keyboard
    }

    pub fn layout(&self) -> &Arc<LayoutCalculator> {
        &self.layout
    }

    pub fn state(&self) -> AppState {
        *self.state.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events_tx.subscribe()
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.events_tx.send(event);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Components and focus
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a component in a zone
    ///
    /// Components registered after `run` took its mount snapshot are mounted
    /// immediately. Returns false once shutdown has started or if the
    /// component is already registered.
    pub fn register_component(&self, component: Arc<dyn Component>, zone: Zone) -> bool {
        let mount_now = {
            // Held across registration so `run` cannot snapshot in between
            let state = self.state.lock();
            if matches!(*state, AppState::ShuttingDown | AppState::Stopped) {
                return false;
            }
            if !self.renderer.register(Arc::clone(&component), zone) {
                return false;
            }
            matches!(*state, AppState::Initializing | AppState::Running)
        };
        if mount_now {
            mount_component(component.as_ref());
        }
        true
    }

    /// Remove, unmount and dispose a component
    pub fn unregister_component(&self, id: ComponentId) -> bool {
        if self.state() == AppState::Stopped {
            return false;
        }
        let Some(component) = self.renderer.unregister(id) else {
            return false;
        };

        {
            let mut focus = self.focus.write();
            if focus.as_ref().is_some_and(|c| c.id() == id) {
                *focus = None;
                self.renderer.set_focus(None);
            }
        }

        unmount_component(component.as_ref());
        component.dispose();
        true
    }

    /// Give logical focus to a component that exposes a focus target
    pub fn set_focus(&self, component: Arc<dyn Component>) -> bool {
        if component.focus_target().is_none() {
            tracing::warn!("{} cannot take focus", component.name());
            return false;
        }
        let id = component.id();
        *self.focus.write() = Some(component);
        self.renderer.set_focus(Some(id));
        self.coordinator.notify_changed(id);
        true
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focus.read().as_ref().map(|c| c.id())
    }

    /// Type `text` into the focused component and submit it
    pub fn submit_text(&self, text: &str) -> Option<String> {
        let component = self.focus.read().clone()?;
        let target = component.focus_target()?;
        for ch in text.chars() {
            target.insert_char(ch);
        }
        target.submit()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering and statistics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn force_render(&self) -> Result<()> {
        if self.state() == AppState::Stopped {
            return Ok(());
        }
        self.renderer.force_render()
    }

    pub fn get_statistics(&self) -> AppStatistics {
        let render = self.renderer.statistics();
        let component_count = self.renderer.component_count();
        let started_at = *self.started_at.lock();
        let uptime_secs = started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or_default();

        AppStatistics {
            state: self.state(),
            current_fps: render.current_fps,
            total_frames: render.total_frames,
            last_render_ms: render.last_render_ms,
            pending_changes: self.coordinator.pending_count(),
            component_count,
            performing_well: performing_well(render.current_fps, render.last_render_ms),
            memory_pressure: MemoryPressure::from_component_count(component_count),
            keyboard: self.keyboard.statistics(),
            uptime_secs,
        }
    }

    /// Snapshot refreshed by the statistics tick
    pub fn latest_statistics(&self) -> Option<AppStatistics> {
        self.latest_stats.lock().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Register work to finish during shutdown
    ///
    /// Hooks run after the loops are told to stop and before components are
    /// unmounted, bounded by the shutdown timeout. Long-running work started
    /// on behalf of the application (a streaming response) is cancelled and
    /// awaited here so nothing writes to components after `Stopped`.
    pub fn on_shutdown<F, Fut>(&self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shutdown_hooks.lock().push(Box::new(move || hook().boxed()));
    }

    /// Trigger a normal shutdown of the current run. Idempotent.
    pub fn request_shutdown(&self) {
        if let Some(token) = self.run_token.lock().as_ref() {
            if !token.is_cancelled() {
                tracing::info!("Shutdown requested");
                token.cancel();
            }
        }
    }

    /// Report a failure that compromises the control loop
    ///
    /// The run ends with `UnhandledError` and a non-zero exit code.
    pub fn report_fatal(&self, error: anyhow::Error) {
        let _ = self.fatal_tx.send(format!("{error:#}"));
    }

    /// Run until `cancel` fires, shutdown is requested or an unhandled error
    ///
    /// Returns the process exit code: 0 for a normal shutdown (including
    /// cancellation), 1 after an unhandled error.
    pub async fn run(self: &Arc<Self>, args: RunArgs, cancel: CancellationToken) -> Result<i32> {
        // Components registered from here on mount themselves
        let to_mount = {
            let mut state = self.state.lock();
            match *state {
                AppState::Created => *state = AppState::Initializing,
                AppState::Stopped => return Err(AppError::Stopped.into()),
                _ => return Err(AppError::AlreadyRunning.into()),
            }
            self.renderer.components()
        };
        tracing::info!("Initializing application");

        let run_token = cancel.child_token();
        *self.run_token.lock() = Some(run_token.clone());

        for component in to_mount {
            mount_component(component.as_ref());
        }
        if let Err(e) = self.renderer.force_render() {
            tracing::warn!("First frame failed: {:#}", e);
        }

        let input = self
            .input
            .lock()
            .take()
            .ok_or_else(|| anyhow!("input source already taken"))?;
        let mut fatal_rx = self
            .fatal_rx
            .lock()
            .take()
            .ok_or_else(|| anyhow!("error channel already taken"))?;

        let render_handle = tokio::spawn(Arc::clone(&self.renderer).run(run_token.clone()));
        let mut keyboard_handle = self.keyboard.start(input, &run_token);
        let stats_handle = tokio::spawn(statistics_loop(
            Arc::clone(self),
            run_token.clone(),
            self.options.render.statistics_interval,
        ));

        *self.started_at.lock() = Some(Instant::now());
        *self.state.lock() = AppState::Running;
        tracing::info!(
            "Application running with {} components",
            self.renderer.component_count()
        );
        self.emit(AppEvent::Started);

        if let Some(prompt) = args.initial_prompt.as_deref() {
            if self.submit_text(prompt).is_none() {
                tracing::warn!("Initial prompt was not accepted by the focused component");
            }
        }

        let mut exit_code = 0;
        let mut keyboard_done = false;
        loop {
            tokio::select! {
                _ = run_token.cancelled() => break,
                Some(message) = fatal_rx.recv() => {
                    self.report_unhandled(message);
                    exit_code = 1;
                    break;
                }
                joined = &mut keyboard_handle, if !keyboard_done => {
                    keyboard_done = true;
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            self.report_unhandled(format!("{e:#}"));
                            exit_code = 1;
                            break;
                        }
                        Err(e) => {
                            self.report_unhandled(format!("keyboard loop aborted: {e}"));
                            exit_code = 1;
                            break;
                        }
                    }
                }
            }
        }

        let loops = Loops {
            render: render_handle,
            stats: stats_handle,
            keyboard: (!keyboard_done).then_some(keyboard_handle),
        };
        self.shutdown(run_token, loops, exit_code).await;
        Ok(exit_code)
    }

    fn report_unhandled(&self, message: String) {
        tracing::error!("Unhandled error: {}", message);
        self.emit(AppEvent::UnhandledError(message));
    }

    async fn shutdown(&self, run_token: CancellationToken, loops: Loops, exit_code: i32) {
        *self.state.lock() = AppState::ShuttingDown;
        tracing::info!("Shutting down");

        run_token.cancel();
        self.keyboard.stop();

        let timeout = self.options.render.shutdown_timeout;
        let hooks: Vec<_> = self.shutdown_hooks.lock().iter().map(|hook| hook()).collect();
        if tokio::time::timeout(timeout, future::join_all(hooks)).await.is_err() {
            tracing::warn!("Shutdown hooks did not finish within {:?}", timeout);
        }

        join_or_abort("render loop", loops.render, timeout).await;
        join_or_abort("statistics tick", loops.stats, timeout).await;
        if let Some(keyboard) = loops.keyboard {
            if let Some(Err(e)) = join_or_abort("keyboard loop", keyboard, timeout).await {
                tracing::warn!("Keyboard loop ended with an error during shutdown: {:#}", e);
            }
        }

        let final_stats = self.get_statistics();
        match serde_json::to_string(&final_stats) {
            Ok(json) => tracing::info!("Final statistics: {}", json),
            Err(e) => tracing::debug!("Failed to serialize statistics: {}", e),
        }

        for component in self.renderer.components() {
            unmount_component(component.as_ref());
            component.dispose();
        }
        *self.focus.write() = None;

        self.coordinator.shutdown();
        self.renderer.dispose();
        *self.run_token.lock() = None;

        *self.state.lock() = AppState::Stopped;
        tracing::info!("Stopped with exit code {}", exit_code);
        self.emit(AppEvent::Stopped { exit_code });
    }
}

/// Loop tasks still attached to a run
struct Loops {
    render: JoinHandle<()>,
    stats: JoinHandle<()>,
    /// None once the keyboard loop has already been joined
    keyboard: Option<JoinHandle<Result<()>>>,
}

/// Wait for a loop task; abort it if it outlives `timeout`
async fn join_or_abort<T>(name: &str, mut handle: JoinHandle<T>, timeout: Duration) -> Option<T> {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!("{} ended abnormally: {}", name, e);
            None
        }
        Err(_) => {
            tracing::warn!("{} did not stop within {:?}, aborting", name, timeout);
            handle.abort();
            None
        }
    }
}

fn router(app: Weak<Application>) -> impl Fn(&mut KeyInput) + Send + Sync + 'static {
    move |input| {
        if let Some(app) = app.upgrade() {
            app.route_key(input);
        }
    }
}

fn mount_component(component: &dyn Component) {
    if let Err(e) = component.mount() {
        tracing::warn!("Failed to mount {} ({}): {:#}", component.name(), component.id(), e);
    }
}

fn unmount_component(component: &dyn Component) {
    if let Err(e) = component.unmount() {
        tracing::warn!("Failed to unmount {} ({}): {:#}", component.name(), component.id(), e);
    }
}

async fn statistics_loop(app: Arc<Application>, cancel: CancellationToken, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut was_healthy = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let stats = app.get_statistics();
        // Only warn on the transition, and only once frames are flowing
        let healthy = stats.performing_well || stats.total_frames < 2;
        if was_healthy && !healthy {
            tracing::debug!(
                "Rendering below target: {:.1} fps, last frame {:.1}ms",
                stats.current_fps,
                stats.last_render_ms
            );
        }
        was_healthy = healthy;
        *app.latest_stats.lock() = Some(stats);
    }
}
