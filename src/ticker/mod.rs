//! Ticker text model: the segment glyph set and the raw-to-display decoder.

pub mod decoder;
pub mod glyphs;
