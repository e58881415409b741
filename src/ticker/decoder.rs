//! Raw ticker text → segment glyphs.
//!
//! The cabinet sends its ticker in a private encoding tuned for its own
//! segment hardware. Substitutions, in order of application:
//!
//! | raw            | displayed            |
//! |----------------|----------------------|
//! | `\t`           | space                |
//! | `!`            | `./`                 |
//! | `m`            | `.` + all-off        |
//! | `q`, `u`       | `'`, `,`             |
//! | `S`            | `5`                  |
//! | `[`, `]`       | `(`, `)`             |
//! | `~`            | `-`                  |
//! | space          | all-off              |
//! | anything else without a glyph | all-off |
//!
//! No rule consumes the output of a later rule, and the only rule whose output
//! feeds another is tab → space → all-off, so the table is applied in a single
//! pass. The all-off cell emitted for `m` is final: only literal spaces are
//! turned into all-off cells, never the other way round.

use crate::ticker::glyphs::{ALL_OFF, DisplayText, is_renderable};

/// Decode raw ticker text into renderable glyphs. Total and pure.
#[must_use]
pub fn decode(raw: &str) -> DisplayText {
    let mut out = String::with_capacity(raw.len() + raw.len() / 4);
    for c in raw.chars() {
        match c {
            '\t' | ' ' => out.push(ALL_OFF),
            '!' => out.push_str("./"),
            'm' => {
                out.push('.');
                out.push(ALL_OFF);
            }
            'q' => out.push('\''),
            'u' => out.push(','),
            'S' => out.push('5'),
            '[' => out.push('('),
            ']' => out.push(')'),
            '~' => out.push('-'),
            other if is_renderable(other) => out.push(other),
            _ => out.push(ALL_OFF),
        }
    }
    DisplayText::from_decoded(out)
}
