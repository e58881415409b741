//! Terminal backend: draws the segment display with `crossterm`.
//!
//! Each terminal cell stands for an 8×16 block of virtual pixels, so widget
//! positions computed in pixels land on the nearest cell. Font size does not
//! change glyph size in a terminal; auto-fit therefore grows until it reaches
//! the configured cap. All-off glyphs are skipped so the unlit template drawn
//! underneath stays visible, and all-on glyphs are drawn as full blocks.
//!
//! Raw mode and the alternate screen are entered on the first surface request
//! and always restored on shutdown or drop.

#![allow(missing_docs)]

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::core::errors::{Result, SegError};
use crate::display::backend::{
    DisplayEvent, Position, RenderBackend, Rgb, SurfaceOptions, SurfaceSize, TextMetrics, TextSize,
};
use crate::ticker::glyphs::{ALL_OFF, ALL_ON};

/// Virtual pixels per terminal column.
pub const CELL_WIDTH: u32 = 8;
/// Virtual pixels per terminal row.
pub const CELL_HEIGHT: u32 = 16;

const FULL_BLOCK: char = '█';

pub struct TerminalBackend {
    out: Stdout,
    cols: u16,
    rows: u16,
    background: Color,
    active: bool,
}

impl TerminalBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            cols: 0,
            rows: 0,
            background: Color::Black,
            active: false,
        }
    }

    fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode().map_err(|e| SegError::render("raw mode", &e))?;
        execute!(self.out, EnterAlternateScreen, Hide)
            .map_err(|e| SegError::render("alternate screen", &e))?;
        self.active = true;
        Ok(())
    }

    fn surface(&self) -> SurfaceSize {
        cells_to_pixels(self.cols, self.rows)
    }
}

impl Default for TerminalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMetrics for TerminalBackend {
    fn measure_text(&self, text: &str, _font_size: u32) -> Result<TextSize> {
        let cells = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        Ok(TextSize {
            width: cells.saturating_mul(CELL_WIDTH),
            height: CELL_HEIGHT,
        })
    }
}

impl RenderBackend for TerminalBackend {
    fn create_or_resize_surface(&mut self, _options: &SurfaceOptions) -> Result<SurfaceSize> {
        // The terminal decides its own size; the request is only a hint.
        if !self.active {
            self.enter()?;
        }
        let (cols, rows) = terminal::size().map_err(|e| SegError::render("terminal size", &e))?;
        self.cols = cols;
        self.rows = rows;
        Ok(self.surface())
    }

    fn fill(&mut self, color: Rgb) -> Result<()> {
        self.background = to_color(color);
        queue!(
            self.out,
            SetBackgroundColor(self.background),
            Clear(ClearType::All)
        )
        .map_err(|e| SegError::render("fill", &e))
    }

    fn draw_text(&mut self, text: &str, _font_size: u32, at: Position, color: Rgb) -> Result<()> {
        let Some(row) = to_cell(at.y, CELL_HEIGHT, self.rows) else {
            return Ok(());
        };
        let first_col = at.x.div_euclid(i64::from(CELL_WIDTH));
        queue!(
            self.out,
            SetForegroundColor(to_color(color)),
            SetBackgroundColor(self.background)
        )
        .map_err(|e| SegError::render("draw", &e))?;

        for (offset, glyph) in (0_i64..).zip(text.chars()) {
            if glyph == ALL_OFF {
                continue;
            }
            let col = first_col + offset;
            let Ok(col) = u16::try_from(col) else {
                continue;
            };
            if col >= self.cols {
                break;
            }
            let shown = if glyph == ALL_ON { FULL_BLOCK } else { glyph };
            queue!(self.out, MoveTo(col, row), Print(shown))
                .map_err(|e| SegError::render("draw", &e))?;
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        queue!(self.out, ResetColor).map_err(|e| SegError::render("present", &e))?;
        self.out
            .flush()
            .map_err(|e| SegError::render("present", &e))
    }

    fn poll_events(&mut self) -> Result<Vec<DisplayEvent>> {
        let mut events = Vec::new();
        while event::poll(Duration::ZERO).map_err(|e| SegError::render("poll", &e))? {
            match event::read().map_err(|e| SegError::render("read event", &e))? {
                Event::Key(key) if key.kind != KeyEventKind::Press => {}
                Event::Key(key) => match key.code {
                    KeyCode::Esc => events.push(DisplayEvent::Escape),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        events.push(DisplayEvent::Quit);
                    }
                    _ => {}
                },
                Event::Resize(cols, rows) => {
                    self.cols = cols;
                    self.rows = rows;
                    events.push(DisplayEvent::Resize(cells_to_pixels(cols, rows)));
                }
                _ => {}
            }
        }
        Ok(events)
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        // Always restore terminal state, even if one step fails.
        let screen = execute!(self.out, ResetColor, Show, LeaveAlternateScreen);
        let raw = terminal::disable_raw_mode();
        screen.map_err(|e| SegError::render("leave alternate screen", &e))?;
        raw.map_err(|e| SegError::render("raw mode", &e))
    }
}

impl Drop for TerminalBackend {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn cells_to_pixels(cols: u16, rows: u16) -> SurfaceSize {
    SurfaceSize::new(
        u32::from(cols) * CELL_WIDTH,
        u32::from(rows) * CELL_HEIGHT,
    )
}

/// Row or column index for a pixel coordinate, `None` when off-screen.
fn to_cell(pixel: i64, cell: u32, limit: u16) -> Option<u16> {
    let index = u16::try_from(pixel.div_euclid(i64::from(cell))).ok()?;
    (index < limit).then_some(index)
}

const fn to_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb { r, g, b }
}
