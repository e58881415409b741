//! Glyph repertoire of the 14-segment display font.
//!
//! The font renders printable ASCII with two special cells: `!` lights no
//! segment at all and `~` lights every segment. Square brackets have no glyph.

use std::fmt;

/// Glyph with every segment unlit. Doubles as the whitespace surrogate.
pub const ALL_OFF: char = '!';

/// Glyph with every segment lit. Used as the unlit-segment background template.
pub const ALL_ON: char = '~';

/// Text shown until the first ticker value arrives, and whenever the cabinet
/// cannot be reached.
pub const CONNECTING_TEXT: &str = "CONNECT.!.!.";

/// Whether `c` has a glyph in the display font.
#[must_use]
pub const fn is_renderable(c: char) -> bool {
    matches!(c, '!'..='~') && !matches!(c, '[' | ']')
}

/// Whether every character of `text` has a glyph.
#[must_use]
pub fn is_renderable_str(text: &str) -> bool {
    text.chars().all(is_renderable)
}

/// `count` all-on cells, the background template of a widget.
#[must_use]
pub fn all_on(count: usize) -> String {
    std::iter::repeat_n(ALL_ON, count).collect()
}

/// A string made only of renderable glyphs.
///
/// Constructed by the decoder or from the built-in constants; the inner
/// string never contains a character without a glyph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DisplayText(String);

impl DisplayText {
    /// The connection placeholder.
    #[must_use]
    pub fn connecting() -> Self {
        Self(CONNECTING_TEXT.to_string())
    }

    /// Wrap `text` if it is entirely renderable.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        is_renderable_str(&text).then_some(Self(text))
    }

    pub(crate) const fn from_decoded(text: String) -> Self {
        Self(text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DisplayText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
