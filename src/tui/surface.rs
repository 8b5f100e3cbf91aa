//! Output surfaces
//!
//! The render loop is the only writer. Each composed frame goes out in one
//! `write_frame` call, so the terminal never shows half a frame.

use crate::tui::layout::LayoutResult;
use crate::tui::renderer::ComposedFrame;
use crate::util::is_containing_panic;
use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{
    backend::Backend,
    layout::{Rect, Size},
    text::Text,
    widgets::{Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

/// Destination for composed frames
pub trait RenderSurface: Send {
    /// Current size of the surface
    fn size(&self) -> Result<Size>;

    /// Write one complete frame
    fn write_frame(&mut self, frame: &ComposedFrame, layout: &LayoutResult) -> Result<()>;

    /// Blank the surface
    fn clear(&mut self) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal surface
// ─────────────────────────────────────────────────────────────────────────────

/// Surface backed by a ratatui terminal
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
}

impl<B: Backend> TerminalSurface<B> {
    pub fn new(backend: B) -> Result<Self> {
        let terminal = Terminal::new(backend).context("Failed to create terminal")?;
        Ok(Self { terminal })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend + Send> RenderSurface for TerminalSurface<B> {
    fn size(&self) -> Result<Size> {
        self.terminal
            .size()
            .context("Failed to query terminal size")
    }

    fn write_frame(&mut self, frame: &ComposedFrame, layout: &LayoutResult) -> Result<()> {
        self.terminal
            .draw(|f| draw_frame(f, frame, layout))
            .context("Failed to draw terminal")?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.terminal.clear().context("Failed to clear terminal")
    }
}

/// Lay both zones out in one draw pass
fn draw_frame(f: &mut Frame, frame: &ComposedFrame, layout: &LayoutResult) {
    let area = f.area();
    draw_zone(f, &frame.static_text, layout.static_zone.rect().intersection(area));
    draw_zone(f, &frame.dynamic_text, layout.dynamic_zone.rect().intersection(area));
}

/// Render a zone, scrolled so its last line sits on the zone's last row
fn draw_zone(f: &mut Frame, text: &Text<'static>, rect: Rect) {
    if rect.is_empty() {
        return;
    }

    let paragraph = Paragraph::new(text.clone()).wrap(Wrap { trim: false });
    let lines = paragraph.line_count(rect.width);
    let overflow = lines.saturating_sub(rect.height as usize);
    let scroll = u16::try_from(overflow).unwrap_or(u16::MAX);

    f.render_widget(paragraph.scroll((scroll, 0)), rect);
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory surface (headless mode, tests)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    last: Option<ComposedFrame>,
    writes: u64,
    clears: u64,
}

/// Surface that keeps the last frame in memory
///
/// Cloning gives another handle on the same frames, so a test can keep one
/// handle while the renderer owns the other.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    size: Size,
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            size: Size::new(width, height),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    pub fn last_frame(&self) -> Option<ComposedFrame> {
        self.state.lock().last.clone()
    }

    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }

    pub fn clear_count(&self) -> u64 {
        self.state.lock().clears
    }
}

impl RenderSurface for MemorySurface {
    fn size(&self) -> Result<Size> {
        Ok(self.size)
    }

    fn write_frame(&mut self, frame: &ComposedFrame, _layout: &LayoutResult) -> Result<()> {
        let mut state = self.state.lock();
        state.last = Some(frame.clone());
        state.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.last = None;
        state.clears += 1;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal mode guard
// ─────────────────────────────────────────────────────────────────────────────

/// Raw mode + alternate screen for as long as the guard lives
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide).context("Failed to setup terminal")?;
        Ok(Self { active: true })
    }

    /// Leave raw mode and the alternate screen. Idempotent.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        restore_terminal().context("Failed to restore terminal")
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            eprintln!("{e:#}");
        }
    }
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)
}

/// Restore the terminal before the default panic report is printed
///
/// Panics caught by the renderer or an effect are left alone: the screen
/// stays up and the failure is logged instead.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if is_containing_panic() {
            return;
        }
        let _ = restore_terminal();
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::tui::layout::compute_layout;
    use ratatui::backend::TestBackend;
    use ratatui::text::Line;

    fn row_text(surface: &TerminalSurface<TestBackend>, y: u16) -> String {
        let buffer = surface.backend().buffer();
        let width = buffer.area.width;
        (0..width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn frame(static_lines: Vec<&'static str>, dynamic_lines: Vec<&'static str>) -> ComposedFrame {
        ComposedFrame {
            frame: 1,
            static_text: Text::from(static_lines.into_iter().map(Line::from).collect::<Vec<_>>()),
            dynamic_text: Text::from(dynamic_lines.into_iter().map(Line::from).collect::<Vec<_>>()),
        }
    }

    #[test]
    fn test_zones_land_in_their_rects() {
        let mut surface = TerminalSurface::new(TestBackend::new(60, 20)).unwrap();
        let layout = compute_layout(Size::new(60, 20), &LayoutConfig::default());

        surface
            .write_frame(&frame(vec!["HISTORY"], vec!["LIVE"]), &layout)
            .unwrap();

        assert_eq!(row_text(&surface, 0), "HISTORY");
        assert_eq!(row_text(&surface, layout.dynamic_zone.y), "LIVE");
    }

    #[test]
    fn test_overflowing_zone_shows_tail() {
        let mut surface = TerminalSurface::new(TestBackend::new(60, 20)).unwrap();
        let layout = compute_layout(Size::new(60, 20), &LayoutConfig::default());
        let height = layout.static_zone.height as usize;

        let lines = vec![
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p",
        ];
        assert!(lines.len() > height);

        surface.write_frame(&frame(lines, vec![]), &layout).unwrap();

        assert_eq!(row_text(&surface, layout.static_zone.height - 1), "p");
    }

    #[test]
    fn test_small_terminal_does_not_panic() {
        let mut surface = TerminalSurface::new(TestBackend::new(20, 6)).unwrap();
        let layout = compute_layout(Size::new(20, 6), &LayoutConfig::default());
        assert!(layout.clamped);

        surface
            .write_frame(&frame(vec!["HISTORY"], vec!["LIVE"]), &layout)
            .unwrap();
        assert_eq!(row_text(&surface, 0), "HISTORY");
    }

    #[test]
    fn test_memory_surface_shares_frames_between_handles() {
        let surface = MemorySurface::new(80, 24);
        let mut writer = surface.clone();
        let layout = compute_layout(Size::new(80, 24), &LayoutConfig::default());

        writer
            .write_frame(&frame(vec!["x"], vec!["y"]), &layout)
            .unwrap();
        assert_eq!(surface.write_count(), 1);
        assert!(surface.last_frame().is_some());

        writer.clear().unwrap();
        assert_eq!(surface.clear_count(), 1);
        assert!(surface.last_frame().is_none());
    }
}
