//! In-memory backend: records every draw and replays scripted events.
//!
//! Text metrics follow a plain monospace model: each glyph advances
//! `ceil(0.6 * size)` pixels and is `size` pixels tall. With an echo sink
//! attached, every presented frame is also written as one line listing the
//! lit texts, which is what headless runs print.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::io::Write;

use crate::core::errors::{Result, SegError};
use crate::display::backend::{
    DisplayEvent, Position, RenderBackend, Rgb, SurfaceOptions, SurfaceSize, TextMetrics, TextSize,
};

/// One text draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDraw {
    pub text: String,
    pub font_size: u32,
    pub at: Position,
    pub color: Rgb,
}

/// Everything drawn between two presents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub fill: Option<Rgb>,
    pub texts: Vec<TextDraw>,
}

impl Frame {
    /// Texts drawn in `color`, in draw order.
    #[must_use]
    pub fn texts_in(&self, color: Rgb) -> Vec<&str> {
        self.texts
            .iter()
            .filter(|t| t.color == color)
            .map(|t| t.text.as_str())
            .collect()
    }
}

pub struct RecordingBackend {
    size: SurfaceSize,
    surfaces: Vec<SurfaceOptions>,
    current: Frame,
    frames: Vec<Frame>,
    events: VecDeque<Vec<DisplayEvent>>,
    echo: Option<(Box<dyn Write + Send>, Rgb)>,
    history: Option<usize>,
    shut_down: bool,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: SurfaceSize::default(),
            surfaces: Vec::new(),
            current: Frame::default(),
            frames: Vec::new(),
            events: VecDeque::new(),
            echo: None,
            history: None,
            shut_down: false,
        }
    }

    /// Write a line per presented frame with the texts drawn in `lit`.
    #[must_use]
    pub fn with_echo(mut self, sink: Box<dyn Write + Send>, lit: Rgb) -> Self {
        self.echo = Some((sink, lit));
        self
    }

    /// Keep only the newest `frames` presented frames.
    #[must_use]
    pub fn with_history(mut self, frames: usize) -> Self {
        self.history = Some(frames.max(1));
        self
    }

    /// Events returned by the next `poll_events` call. Each call to this
    /// method queues one batch.
    pub fn queue_events(&mut self, events: impl IntoIterator<Item = DisplayEvent>) {
        self.events.push_back(events.into_iter().collect());
    }

    /// Presented frames so far.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Every surface request, in order.
    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceOptions] {
        &self.surfaces
    }

    #[must_use]
    pub const fn size(&self) -> SurfaceSize {
        self.size
    }

    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Monospace advance of one glyph at `font_size`.
    #[must_use]
    pub const fn advance(font_size: u32) -> u32 {
        font_size.saturating_mul(3).div_ceil(5)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBackend")
            .field("size", &self.size)
            .field("frames", &self.frames.len())
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

impl TextMetrics for RecordingBackend {
    fn measure_text(&self, text: &str, font_size: u32) -> Result<TextSize> {
        let cells = u32::try_from(text.chars().count()).map_err(|_| SegError::Render {
            context: "measure",
            details: "text too long".to_string(),
        })?;
        Ok(TextSize {
            width: cells.saturating_mul(Self::advance(font_size)),
            height: font_size,
        })
    }
}

impl RenderBackend for RecordingBackend {
    fn create_or_resize_surface(&mut self, options: &SurfaceOptions) -> Result<SurfaceSize> {
        self.surfaces.push(options.clone());
        self.size = options.size;
        self.shut_down = false;
        Ok(self.size)
    }

    fn fill(&mut self, color: Rgb) -> Result<()> {
        self.current.fill = Some(color);
        self.current.texts.clear();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, font_size: u32, at: Position, color: Rgb) -> Result<()> {
        self.current.texts.push(TextDraw {
            text: text.to_string(),
            font_size,
            at,
            color,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let frame = std::mem::take(&mut self.current);
        if let Some((sink, lit)) = self.echo.as_mut() {
            let line = frame.texts_in(*lit).join(" | ");
            writeln!(sink, "{line}")
                .and_then(|()| sink.flush())
                .map_err(|e| SegError::render("echo", &e))?;
        }
        self.frames.push(frame);
        if let Some(limit) = self.history
            && self.frames.len() > limit
        {
            let excess = self.frames.len() - limit;
            self.frames.drain(..excess);
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<DisplayEvent>> {
        Ok(self.events.pop_front().unwrap_or_default())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.shut_down = true;
        Ok(())
    }
}
