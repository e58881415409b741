//! Colours and fixed geometry shared by every widget.

#![allow(missing_docs)]

use crate::display::backend::Rgb;

/// Lit segments.
pub const RED: Rgb = Rgb(255, 0, 0);
/// Unlit segments, a faint warm grey.
pub const GRAY: Rgb = Rgb(20, 10, 10);
pub const BLACK: Rgb = Rgb(0, 0, 0);

/// Immutable rendering settings, passed explicitly to layout and composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub on: Rgb,
    pub off: Rgb,
    pub background: Rgb,
    /// Width of the ticker in glyph cells.
    pub ticker_cells: usize,
    /// Distance of the clock and stopwatch from the surface edges.
    pub corner_margin: i64,
    /// Horizontal slack the auto-fitted ticker must leave.
    pub fit_margin_x: i64,
    /// Vertical slack the auto-fitted ticker must leave.
    pub fit_margin_y: i64,
    pub min_font_size: u32,
    pub font_step: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            on: RED,
            off: GRAY,
            background: BLACK,
            ticker_cells: 9,
            corner_margin: 12,
            fit_margin_x: 20,
            fit_margin_y: 10,
            min_font_size: 8,
            font_step: 2,
        }
    }
}
