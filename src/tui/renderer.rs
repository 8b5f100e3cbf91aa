//! Dual-zone renderer and render loop
//!
//! Components live in one of two registries. The static registry holds
//! content that rarely changes (the transcript), the dynamic registry holds
//! content that changes every tick (streaming output, input, status). Each
//! component's last output is cached; a pass re-renders only the components
//! that are dirty and recomposes both zones from the caches.
//!
//! # Render pass
//!
//! ```text
//! take_pending() ──▶ layout ──▶ re-render dirty ──▶ compose static
//!                                                         │
//!     RenderCompleted ◀── stats ◀── write_frame ◀── compose dynamic
//! ```
//!
//! A component is dirty when the pass is forced, when it has no cached
//! output yet, when the coordinator has a pending change for it, or when
//! its own `should_update()` says so.

use crate::reactive::StateCoordinator;
use crate::tui::layout::{LayoutCalculator, LayoutResult};
use crate::tui::stats::{FpsTracker, RenderStatistics};
use crate::tui::surface::RenderSurface;
use crate::tui::traits::{Component, ComponentId, RenderContext, Zone};
use crate::util::{contain_panic, panic_message};
use anyhow::Result;
use parking_lot::Mutex;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default periodic tick (spinners keep moving without state changes)
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

const COMPLETED_CHANNEL_CAPACITY: usize = 32;

/// One fully composed frame: static zone first, then dynamic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedFrame {
    pub frame: u64,
    pub static_text: Text<'static>,
    pub dynamic_text: Text<'static>,
}

impl ComposedFrame {
    /// Frame content without styling, one line per row
    pub fn plain_text(&self) -> String {
        self.static_text
            .lines
            .iter()
            .chain(self.dynamic_text.lines.iter())
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Entry {
    component: Arc<dyn Component>,
    cached: Option<Text<'static>>,
}

#[derive(Default)]
struct Registries {
    static_zone: Vec<Entry>,
    dynamic_zone: Vec<Entry>,
}

impl Registries {
    fn zone_of(&self, id: ComponentId) -> Option<Zone> {
        if self.static_zone.iter().any(|e| e.component.id() == id) {
            Some(Zone::Static)
        } else if self.dynamic_zone.iter().any(|e| e.component.id() == id) {
            Some(Zone::Dynamic)
        } else {
            None
        }
    }

    fn zone_mut(&mut self, zone: Zone) -> &mut Vec<Entry> {
        match zone {
            Zone::Static => &mut self.static_zone,
            Zone::Dynamic => &mut self.dynamic_zone,
        }
    }
}

/// Counts from re-rendering one zone
#[derive(Default)]
struct ZonePass {
    rerendered: usize,
    failed: usize,
}

pub struct Renderer {
    coordinator: Arc<StateCoordinator>,
    layout: Arc<LayoutCalculator>,
    /// Held for a whole pass; registration waits for an in-flight frame
    registries: Mutex<Registries>,
    surface: Mutex<Box<dyn RenderSurface>>,
    stats: Mutex<RenderStatistics>,
    fps: Mutex<FpsTracker>,
    focused: Mutex<Option<ComponentId>>,
    completed_tx: broadcast::Sender<RenderStatistics>,
    tick: Duration,
    disposed: AtomicBool,
}

impl Renderer {
    pub fn new(
        coordinator: Arc<StateCoordinator>,
        layout: Arc<LayoutCalculator>,
        surface: Box<dyn RenderSurface>,
        tick: Duration,
    ) -> Self {
        let (completed_tx, _) = broadcast::channel(COMPLETED_CHANNEL_CAPACITY);
        Self {
            coordinator,
            layout,
            registries: Mutex::new(Registries::default()),
            surface: Mutex::new(surface),
            stats: Mutex::new(RenderStatistics::default()),
            fps: Mutex::new(FpsTracker::default()),
            focused: Mutex::new(None),
            completed_tx,
            tick,
            disposed: AtomicBool::new(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_static(&self, component: Arc<dyn Component>) -> bool {
        self.register(component, Zone::Static)
    }

    pub fn register_dynamic(&self, component: Arc<dyn Component>) -> bool {
        self.register(component, Zone::Dynamic)
    }

    /// Add a component to a zone. Returns false (and changes nothing) if the
    /// renderer is disposed or the component is already registered anywhere.
    pub fn register(&self, component: Arc<dyn Component>, zone: Zone) -> bool {
        if self.is_disposed() {
            return false;
        }

        let id = component.id();
        let mut registries = self.registries.lock();
        if let Some(existing) = registries.zone_of(id) {
            tracing::warn!(
                "Component {} ({}) is already registered in the {} zone",
                component.name(),
                id,
                existing.name()
            );
            return false;
        }

        tracing::debug!(
            "Registered {} ({}) in the {} zone",
            component.name(),
            id,
            zone.name()
        );
        registries.zone_mut(zone).push(Entry {
            component,
            cached: None,
        });
        drop(registries);

        self.coordinator.notify_changed(id);
        true
    }

    /// Remove a component from whichever zone holds it
    pub fn unregister(&self, id: ComponentId) -> Option<Arc<dyn Component>> {
        if self.is_disposed() {
            return None;
        }

        let mut registries = self.registries.lock();
        let zone = registries.zone_of(id)?;
        let entries = registries.zone_mut(zone);
        let index = entries.iter().position(|e| e.component.id() == id)?;
        let entry = entries.remove(index);
        drop(registries);

        tracing::debug!("Unregistered {} ({})", entry.component.name(), id);
        // Recompose without it on the next pass
        self.coordinator.notify_changed(id);
        Some(entry.component)
    }

    pub fn zone_of(&self, id: ComponentId) -> Option<Zone> {
        self.registries.lock().zone_of(id)
    }

    /// All registered components, static zone first
    pub fn components(&self) -> Vec<Arc<dyn Component>> {
        let registries = self.registries.lock();
        registries
            .static_zone
            .iter()
            .chain(registries.dynamic_zone.iter())
            .map(|e| Arc::clone(&e.component))
            .collect()
    }

    pub fn component_count(&self) -> usize {
        let registries = self.registries.lock();
        registries.static_zone.len() + registries.dynamic_zone.len()
    }

    pub fn set_focus(&self, id: Option<ComponentId>) {
        *self.focused.lock() = id;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<RenderStatistics> {
        self.completed_tx.subscribe()
    }

    pub fn statistics(&self) -> RenderStatistics {
        *self.stats.lock()
    }

    pub fn current_fps(&self) -> f64 {
        self.stats.lock().current_fps
    }

    pub fn total_frames(&self) -> u64 {
        self.stats.lock().total_frames
    }

    pub fn last_render_time_ms(&self) -> f64 {
        self.stats.lock().last_render_ms
    }

    pub fn coordinator(&self) -> &Arc<StateCoordinator> {
        &self.coordinator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-render every component and write a frame now
    pub fn force_render(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.render_pass(true).map(|_| ())
    }

    /// One pass. Returns the published statistics, or `None` when disposed.
    pub fn render_pass(&self, force: bool) -> Result<Option<RenderStatistics>> {
        if self.is_disposed() {
            return Ok(None);
        }

        let started = Instant::now();
        let mut registries = self.registries.lock();
        let mut surface = self.surface.lock();
        let layout = self.layout.calculate(surface.size()?);

        // Read and clear in one step; later notifications re-arm the debounce
        let pending: HashSet<ComponentId> = self.coordinator.take_pending().into_iter().collect();
        let frame_no = self.stats.lock().total_frames + 1;
        let focused = *self.focused.lock();

        // Static before dynamic, both into one frame
        let static_ctx = RenderContext::new(
            Zone::Static,
            layout.static_zone.rect(),
            frame_no,
            focused,
        );
        let static_pass = render_zone(&mut registries.static_zone, &static_ctx, &pending, force);
        let dynamic_ctx = RenderContext::new(
            Zone::Dynamic,
            layout.dynamic_zone.rect(),
            frame_no,
            focused,
        );
        let dynamic_pass =
            render_zone(&mut registries.dynamic_zone, &dynamic_ctx, &pending, force);

        let frame = ComposedFrame {
            frame: frame_no,
            static_text: compose(&registries.static_zone),
            dynamic_text: compose(&registries.dynamic_zone),
        };
        surface.write_frame(&frame, &layout)?;
        drop(surface);

        let now = Instant::now();
        let current_fps = self.fps.lock().record(now);
        let snapshot = RenderStatistics {
            total_frames: frame_no,
            last_render_ms: now.saturating_duration_since(started).as_secs_f64() * 1000.0,
            current_fps,
            static_components: registries.static_zone.len(),
            dynamic_components: registries.dynamic_zone.len(),
            rerendered: static_pass.rerendered + dynamic_pass.rerendered,
            failed: static_pass.failed + dynamic_pass.failed,
        };
        drop(registries);

        *self.stats.lock() = snapshot;
        log_frame(&snapshot, &layout);
        // No subscribers is fine
        let _ = self.completed_tx.send(snapshot);

        Ok(Some(snapshot))
    }

    /// Render until `cancel` fires or the renderer is disposed
    ///
    /// Starts with a forced pass, then wakes on "changes ready" or the
    /// periodic tick.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut changes = self.coordinator.subscribe();
        let mut tick = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Err(e) = self.force_render() {
            tracing::warn!("Initial render failed: {:#}", e);
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                recv = changes.recv() => {
                    if let Err(broadcast::error::RecvError::Closed) = recv {
                        tracing::debug!("Change channel closed, render loop exiting");
                        break;
                    }
                    // Lagged just means several signals collapsed into this pass
                }
                _ = tick.tick() => {}
            }

            if self.is_disposed() {
                break;
            }
            if let Err(e) = self.render_pass(false) {
                tracing::warn!("Render pass failed: {:#}", e);
            }
        }

        tracing::debug!("Render loop stopped after {} frames", self.total_frames());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Disposal
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Drop all registrations and blank the surface. Idempotent; afterwards
    /// register, unregister and force_render do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut registries = self.registries.lock();
        registries.static_zone.clear();
        registries.dynamic_zone.clear();
        drop(registries);

        if let Err(e) = self.surface.lock().clear() {
            tracing::warn!("Failed to clear output surface: {:#}", e);
        }
        tracing::debug!("Renderer disposed");
    }
}

fn render_zone(
    entries: &mut [Entry],
    ctx: &RenderContext,
    pending: &HashSet<ComponentId>,
    force: bool,
) -> ZonePass {
    let mut pass = ZonePass::default();

    for entry in entries.iter_mut() {
        let component = &entry.component;
        let dirty = force
            || entry.cached.is_none()
            || pending.contains(&component.id())
            || component.should_update();
        if !dirty {
            continue;
        }

        pass.rerendered += 1;
        let text = match contain_panic(|| component.render(ctx)) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                pass.failed += 1;
                tracing::warn!("{} ({}) failed to render: {:#}", component.name(), component.id(), e);
                error_placeholder(component.name(), &format!("{e}"))
            }
            Err(payload) => {
                pass.failed += 1;
                let message = panic_message(payload.as_ref());
                tracing::error!("{} ({}) panicked while rendering: {}", component.name(), component.id(), message);
                error_placeholder(component.name(), &message)
            }
        };
        entry.cached = Some(text);
    }

    pass
}

fn compose(entries: &[Entry]) -> Text<'static> {
    let lines: Vec<Line<'static>> = entries
        .iter()
        .filter_map(|e| e.cached.as_ref())
        .flat_map(|text| text.lines.iter().cloned())
        .collect();
    Text::from(lines)
}

/// Inline stand-in for a component that failed this pass
fn error_placeholder(name: &str, message: &str) -> Text<'static> {
    let first_line = message.lines().next().unwrap_or_default();
    Text::from(Line::from(vec![
        Span::styled(
            format!("⚠ {name}: "),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled(first_line.to_string(), Style::default().fg(Color::Red)),
    ]))
}

fn log_frame(stats: &RenderStatistics, layout: &LayoutResult) {
    tracing::trace!(
        "Frame {} in {:.2}ms ({} re-rendered, {} failed, static {} rows, dynamic {} rows)",
        stats.total_frames,
        stats.last_render_ms,
        stats.rerendered,
        stats.failed,
        layout.static_zone.height,
        layout.dynamic_zone.height
    );
}
