//! Ticker, wall clock and stopwatch.
//!
//! Layout is recomputed only when the surface changes. Composing a frame is
//! a pure function of (layout, text, time) that yields draw commands; the
//! loop hands those to the backend.

#![allow(missing_docs)]

use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::display::backend::{Position, RenderBackend, Rgb, SurfaceSize, TextMetrics, TextSize};
use crate::display::theme::Theme;
use crate::ticker::glyphs::{DisplayText, all_on};

/// Clock background template.
pub const CLOCK_TEMPLATE: &str = "~~:~~";
/// Stopwatch background template.
pub const STOPWATCH_TEMPLATE: &str = "~:~~:~~";

/// Widget switches and sizes taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    /// 0 = auto-fit.
    pub ticker_font_size: u32,
    pub ticker_offset_y: i32,
    pub max_font_size: u32,
    pub clock: bool,
    pub stopwatch: bool,
    pub time_font_size: u32,
    pub blink_colon: bool,
}

impl WidgetSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ticker_font_size: config.ticker.font_size,
            ticker_offset_y: config.ticker.offset_y,
            max_font_size: config.ticker.max_font_size,
            clock: config.time.clock,
            stopwatch: config.time.stopwatch,
            time_font_size: config.time.font_size,
            blink_colon: config.time.blink_colon,
        }
    }
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Placement state for the current surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetLayout {
    pub surface: SurfaceSize,
    pub ticker_font_size: u32,
    pub ticker_offset_y: i64,
    /// Font size of the clock, if shown.
    pub clock: Option<u32>,
    /// Font size of the stopwatch, if shown.
    pub stopwatch: Option<u32>,
    pub blink_colon: bool,
}

impl WidgetLayout {
    /// Compute the layout for `surface`, auto-fitting the ticker if requested.
    pub fn compute(
        surface: SurfaceSize,
        settings: &WidgetSettings,
        theme: &Theme,
        metrics: &impl TextMetrics,
    ) -> Result<Self> {
        let ticker_font_size = if settings.ticker_font_size > 0 {
            settings.ticker_font_size
        } else {
            fit_ticker_font(surface, settings.max_font_size, theme, metrics)?
        };
        Ok(Self {
            surface,
            ticker_font_size,
            ticker_offset_y: i64::from(settings.ticker_offset_y),
            clock: settings.clock.then_some(settings.time_font_size),
            stopwatch: settings.stopwatch.then_some(settings.time_font_size),
            blink_colon: settings.blink_colon,
        })
    }
}

/// Largest font size whose 9-cell background still leaves the fit margins.
///
/// Starts at the minimum and grows in steps while the next step fits,
/// never beyond `max_font_size`.
pub fn fit_ticker_font(
    surface: SurfaceSize,
    max_font_size: u32,
    theme: &Theme,
    metrics: &impl TextMetrics,
) -> Result<u32> {
    let background = all_on(theme.ticker_cells);
    let room_x = i64::from(surface.width) - theme.fit_margin_x;
    let room_y = i64::from(surface.height) - theme.fit_margin_y;

    let mut size = theme.min_font_size;
    loop {
        let candidate = size + theme.font_step;
        if candidate > max_font_size {
            break;
        }
        let TextSize { width, height } = metrics.measure_text(&background, candidate)?;
        if i64::from(width) <= room_x && i64::from(height) <= room_y {
            size = candidate;
        } else {
            break;
        }
    }
    Ok(size)
}

// ──────────────────── text formatting ────────────────────

/// `HH:MM` on a 12-hour clock. With `blink`, the colon shows only during the
/// second half of each second.
#[must_use]
pub fn format_clock(time: NaiveTime, blink: bool) -> String {
    let separator = if blink && time.nanosecond() % 1_000_000_000 < 500_000_000 {
        ' '
    } else {
        ':'
    };
    let (_, hour) = time.hour12();
    format!("{hour:02}{separator}{:02}", time.minute())
}

/// `H:MM:SS`, hours modulo 10, whole days dropped.
#[must_use]
pub fn format_stopwatch(elapsed: Duration) -> String {
    let secs = elapsed.as_secs() % 86_400;
    let hours = (secs / 3600) % 10;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

// ──────────────────── composition ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Fill(Rgb),
    Text {
        text: String,
        font_size: u32,
        at: Position,
        color: Rgb,
    },
}

/// Time inputs of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    /// Local wall-clock time.
    pub wall: NaiveTime,
    /// Time since the display started.
    pub elapsed: Duration,
}

/// Build the draw commands for one frame: background, ticker, then the
/// optional clock and stopwatch. Each widget draws its all-on template in
/// the off colour and overlays its text in the on colour.
pub fn compose_frame(
    layout: &WidgetLayout,
    theme: &Theme,
    metrics: &impl TextMetrics,
    text: &DisplayText,
    clock: FrameClock,
) -> Result<Vec<DrawCommand>> {
    let mut commands = vec![DrawCommand::Fill(theme.background)];
    let surface = layout.surface;

    let ticker_background = all_on(theme.ticker_cells);
    for (content, color) in [
        (ticker_background.as_str(), theme.off),
        (text.as_str(), theme.on),
    ] {
        let size = metrics.measure_text(content, layout.ticker_font_size)?;
        let at = Position {
            x: half(surface.width) - half(size.width),
            y: half(surface.height) - half(size.height) + layout.ticker_offset_y,
        };
        commands.push(text_command(content, layout.ticker_font_size, at, color));
    }

    if let Some(font_size) = layout.clock {
        let now = format_clock(clock.wall, layout.blink_colon);
        for (content, color) in [(CLOCK_TEMPLATE, theme.off), (now.as_str(), theme.on)] {
            let size = metrics.measure_text(content, font_size)?;
            let at = Position {
                x: i64::from(surface.width) - i64::from(size.width) - theme.corner_margin,
                y: i64::from(surface.height) - i64::from(size.height) - theme.corner_margin,
            };
            commands.push(text_command(content, font_size, at, color));
        }
    }

    if let Some(font_size) = layout.stopwatch {
        let elapsed = format_stopwatch(clock.elapsed);
        for (content, color) in [(STOPWATCH_TEMPLATE, theme.off), (elapsed.as_str(), theme.on)] {
            let size = metrics.measure_text(content, font_size)?;
            let at = Position {
                x: theme.corner_margin,
                y: i64::from(surface.height) - i64::from(size.height) - theme.corner_margin,
            };
            commands.push(text_command(content, font_size, at, color));
        }
    }

    Ok(commands)
}

/// Send composed commands to a backend. Does not present.
pub fn apply(backend: &mut impl RenderBackend, commands: &[DrawCommand]) -> Result<()> {
    for command in commands {
        match command {
            DrawCommand::Fill(color) => backend.fill(*color)?,
            DrawCommand::Text {
                text,
                font_size,
                at,
                color,
            } => backend.draw_text(text, *font_size, *at, *color)?,
        }
    }
    Ok(())
}

fn text_command(text: &str, font_size: u32, at: Position, color: Rgb) -> DrawCommand {
    DrawCommand::Text {
        text: text.to_string(),
        font_size,
        at,
        color,
    }
}

fn half(v: u32) -> i64 {
    i64::from(v / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Result;
    use crate::display::theme::{GRAY, RED};

    /// Every glyph is `size / 2` wide and `size` tall.
    struct HalfWidth;

    impl TextMetrics for HalfWidth {
        fn measure_text(&self, text: &str, font_size: u32) -> Result<TextSize> {
            let cells = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
            Ok(TextSize {
                width: cells * (font_size / 2),
                height: font_size,
            })
        }
    }

    fn hms(h: u32, m: u32, s: u32, ms: u32) -> NaiveTime {
        NaiveTime::from_hms_milli_opt(h, m, s, ms).unwrap()
    }

    #[test]
    fn stopwatch_format() {
        assert_eq!(format_stopwatch(Duration::ZERO), "0:00:00");
        assert_eq!(format_stopwatch(Duration::from_secs(5)), "0:00:05");
        assert_eq!(format_stopwatch(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_stopwatch(Duration::from_millis(59_999)), "0:00:59");
    }

    #[test]
    fn stopwatch_hours_wrap_at_ten_and_days_are_dropped() {
        assert_eq!(format_stopwatch(Duration::from_secs(10 * 3600 + 1)), "0:00:01");
        assert_eq!(format_stopwatch(Duration::from_secs(86_400 + 61)), "0:01:01");
    }

    #[test]
    fn clock_is_twelve_hour_zero_padded() {
        assert_eq!(format_clock(hms(0, 5, 0, 0), false), "12:05");
        assert_eq!(format_clock(hms(9, 30, 0, 0), false), "09:30");
        assert_eq!(format_clock(hms(23, 59, 59, 999), false), "11:59");
    }

    #[test]
    fn clock_colon_is_steady_by_default() {
        assert_eq!(format_clock(hms(13, 0, 0, 100), false), "01:00");
        assert_eq!(format_clock(hms(13, 0, 0, 900), false), "01:00");
    }

    #[test]
    fn clock_blink_shows_colon_in_second_half() {
        assert_eq!(format_clock(hms(13, 0, 0, 100), true), "01 00");
        assert_eq!(format_clock(hms(13, 0, 0, 600), true), "01:00");
    }

    #[test]
    fn clock_text_changes_only_at_minute_boundaries() {
        let base = hms(10, 41, 0, 0);
        let first = format_clock(base, false);
        for s in 1..60 {
            let t = base + chrono::TimeDelta::seconds(s);
            assert_eq!(format_clock(t, false), first);
        }
        assert_ne!(format_clock(base + chrono::TimeDelta::seconds(60), false), first);
    }

    #[test]
    fn auto_fit_grows_until_the_margin_is_hit() {
        // 9 cells at size s are 9*(s/2) wide. 520 wide leaves 500: s=110 → 495.
        // 100 tall leaves 90: height caps at 90.
        let size = fit_ticker_font(SurfaceSize::new(520, 100), 512, &Theme::default(), &HalfWidth)
            .unwrap();
        assert_eq!(size, 90);
    }

    #[test]
    fn auto_fit_on_tiny_surface_stays_at_minimum() {
        let size =
            fit_ticker_font(SurfaceSize::new(10, 5), 512, &Theme::default(), &HalfWidth).unwrap();
        assert_eq!(size, 8);
    }

    #[test]
    fn auto_fit_respects_max_font_size() {
        let size = fit_ticker_font(
            SurfaceSize::new(10_000, 10_000),
            64,
            &Theme::default(),
            &HalfWidth,
        )
        .unwrap();
        assert_eq!(size, 64);
    }

    #[test]
    fn fixed_font_size_skips_fitting() {
        let settings = WidgetSettings {
            ticker_font_size: 40,
            ..WidgetSettings::default()
        };
        let layout = WidgetLayout::compute(
            SurfaceSize::new(520, 100),
            &settings,
            &Theme::default(),
            &HalfWidth,
        )
        .unwrap();
        assert_eq!(layout.ticker_font_size, 40);
        assert_eq!(layout.clock, None);
        assert_eq!(layout.stopwatch, None);
    }

    #[test]
    fn frame_draws_background_then_ticker_template_then_text() {
        let theme = Theme::default();
        let layout = WidgetLayout {
            surface: SurfaceSize::new(520, 100),
            ticker_font_size: 20,
            ticker_offset_y: 0,
            clock: None,
            stopwatch: None,
            blink_colon: false,
        };
        let text = DisplayText::new("HELLO").unwrap();
        let clock = FrameClock {
            wall: hms(12, 0, 0, 0),
            elapsed: Duration::ZERO,
        };
        let commands = compose_frame(&layout, &theme, &HalfWidth, &text, clock).unwrap();

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], DrawCommand::Fill(theme.background));
        // Template: 9*10 = 90 wide, 20 tall → (260-45, 50-10).
        assert_eq!(
            commands[1],
            DrawCommand::Text {
                text: "~~~~~~~~~".to_string(),
                font_size: 20,
                at: Position { x: 215, y: 40 },
                color: GRAY,
            }
        );
        // Text: 5*10 = 50 wide → x = 260-25.
        assert_eq!(
            commands[2],
            DrawCommand::Text {
                text: "HELLO".to_string(),
                font_size: 20,
                at: Position { x: 235, y: 40 },
                color: RED,
            }
        );
    }

    #[test]
    fn offset_shifts_ticker_vertically() {
        let theme = Theme::default();
        let layout = WidgetLayout {
            surface: SurfaceSize::new(520, 100),
            ticker_font_size: 20,
            ticker_offset_y: -15,
            clock: None,
            stopwatch: None,
            blink_colon: false,
        };
        let clock = FrameClock {
            wall: hms(12, 0, 0, 0),
            elapsed: Duration::ZERO,
        };
        let commands =
            compose_frame(&layout, &theme, &HalfWidth, &DisplayText::connecting(), clock).unwrap();
        let DrawCommand::Text { at, .. } = &commands[1] else {
            panic!("expected text");
        };
        assert_eq!(at.y, 25);
    }

    #[test]
    fn clock_and_stopwatch_sit_in_bottom_corners() {
        let theme = Theme::default();
        let layout = WidgetLayout {
            surface: SurfaceSize::new(520, 100),
            ticker_font_size: 20,
            ticker_offset_y: 0,
            clock: Some(24),
            stopwatch: Some(24),
            blink_colon: false,
        };
        let clock = FrameClock {
            wall: hms(15, 7, 0, 0),
            elapsed: Duration::from_secs(5),
        };
        let commands =
            compose_frame(&layout, &theme, &HalfWidth, &DisplayText::connecting(), clock).unwrap();
        assert_eq!(commands.len(), 7);

        // "03:07" is 5 cells of 12 px: x = 520-60-12, y = 100-24-12.
        assert_eq!(
            commands[4],
            DrawCommand::Text {
                text: "03:07".to_string(),
                font_size: 24,
                at: Position { x: 448, y: 64 },
                color: RED,
            }
        );
        assert_eq!(
            commands[6],
            DrawCommand::Text {
                text: "0:00:05".to_string(),
                font_size: 24,
                at: Position { x: 12, y: 64 },
                color: RED,
            }
        );
    }
}
