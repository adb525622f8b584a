//! Proportional (pie) chart: sector preparation, rasterization onto terminal
//! cells, and the legend that sits beside it.

use std::f64::consts::TAU;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::format::truncate_with_ellipsis;

/// Sectors beyond this count are folded into [`OTHERS_LABEL`].
pub const MAX_SECTORS: usize = 8;

/// Terminal cells are roughly this many times taller than wide.
pub const ASPECT_FIX: f64 = 2.4;

/// Tolerance on sector bounds so rounding never leaves a gap between wedges.
pub const ANGLE_EPSILON: f64 = 1e-10;

pub const OTHERS_LABEL: &str = "Others";

const LEGEND_PADDING: usize = 2;
const MARKER: &str = "█ ";
const PIXEL: &str = "█";

pub const PALETTE: [Color; 9] = [
    Color::Rgb(0xff, 0xbe, 0x0b),
    Color::Rgb(0xfb, 0x56, 0x07),
    Color::Rgb(0xff, 0x00, 0x6e),
    Color::Rgb(0x83, 0x38, 0xec),
    Color::Rgb(0x3a, 0x86, 0xff),
    Color::Rgb(0x00, 0xf5, 0xd4),
    Color::Rgb(0xfe, 0xf9, 0xef),
    Color::Rgb(0xff, 0x85, 0xa1),
    Color::Rgb(0xb5, 0x83, 0x8d),
];

/// Caller-supplied chart input.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSector {
    pub label: String,
    pub value: f64,
}

impl RawSector {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// A wedge ready to draw. Angles are radians; `end` is exclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub label: String,
    pub value: f64,
    pub usage: f64,
    pub color: Color,
    pub start: f64,
    pub end: f64,
}

// ---------------------------------------------------------------------------
// Sector preparation
// ---------------------------------------------------------------------------

/// Sort, bucket the tail into "Others", then lay the sectors out around the
/// circle starting at angle 0.
pub fn prepare_sectors(total: f64, mut raw: Vec<RawSector>) -> Vec<Sector> {
    raw.sort_by(|a, b| b.value.total_cmp(&a.value));

    let others_value: f64 = raw.iter().skip(MAX_SECTORS).map(|s| s.value).sum();
    raw.truncate(MAX_SECTORS);
    if others_value > 0.0 {
        raw.push(RawSector::new(OTHERS_LABEL, others_value));
    }

    raw.sort_by(|a, b| b.value.total_cmp(&a.value));

    let mut start = 0.0;
    raw.into_iter()
        .enumerate()
        .map(|(i, s)| {
            let usage = if total > 0.0 { s.value / total } else { 0.0 };
            let end = start + usage * TAU;
            let sector = Sector {
                label: s.label,
                value: s.value,
                usage,
                color: PALETTE[i % PALETTE.len()],
                start,
                end,
            };
            start = end;
            sector
        })
        .collect()
}

fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Whether `angle` falls inside `[start, end)`, tolerating ranges that wrap
/// past 2π back through 0.
pub fn angle_in_sector(angle: f64, start: f64, end: f64) -> bool {
    let span = end - start;
    if span <= 0.0 {
        return false;
    }
    if span >= TAU - ANGLE_EPSILON {
        return true;
    }

    let angle = normalize_angle(angle);
    let start = normalize_angle(start);
    let end = normalize_angle(end);

    if end > start {
        angle >= start - ANGLE_EPSILON && angle <= end + ANGLE_EPSILON
    } else {
        angle >= start - ANGLE_EPSILON || angle <= end + ANGLE_EPSILON
    }
}

// ---------------------------------------------------------------------------
// Rasterization
// ---------------------------------------------------------------------------

/// Map every cell of a `width`×`height` box to the index of the sector that
/// covers it, or `None` outside the circle.
pub fn rasterize(
    width: usize,
    height: usize,
    radius: f64,
    sectors: &[Sector],
) -> Vec<Vec<Option<usize>>> {
    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;

    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let dx = x as f64 - center_x;
                    let dy = (y as f64 - center_y) * ASPECT_FIX;
                    if (dx * dx + dy * dy).sqrt() > radius {
                        return None;
                    }
                    let angle = normalize_angle(dy.atan2(dx));
                    sectors
                        .iter()
                        .position(|s| angle_in_sector(angle, s.start, s.end))
                })
                .collect()
        })
        .collect()
}

/// Colored block rows for the pie itself.
pub fn pie_lines(
    width: usize,
    height: usize,
    radius: f64,
    sectors: &[Sector],
) -> Vec<Line<'static>> {
    rasterize(width, height, radius, sectors)
        .into_iter()
        .map(|row| {
            let spans: Vec<Span<'static>> = row
                .into_iter()
                .map(|cell| match cell {
                    Some(i) => Span::styled(PIXEL, Style::default().fg(sectors[i].color)),
                    None => Span::raw(" "),
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// Format a sector value with precision that shrinks as the value grows.
pub fn format_value(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.0} lines", value)
    } else if value >= 1.0 {
        format!("{:.1} lines", value)
    } else {
        format!("{:.2} lines", value)
    }
}

/// One row per sector (blank line between rows), values right-aligned to
/// `width`.
pub fn legend_lines(sectors: &[Sector], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(sectors.len() * 2);
    let marker_width = UnicodeWidthStr::width(MARKER);

    for (i, s) in sectors.iter().enumerate() {
        let label = truncate_with_ellipsis(&s.label, width / 2);
        let value = format_value(s.value);

        let used = LEGEND_PADDING * 2
            + marker_width
            + UnicodeWidthStr::width(label.as_str())
            + UnicodeWidthStr::width(value.as_str());
        let padding = width.saturating_sub(used);

        lines.push(Line::from(vec![
            Span::raw(" ".repeat(LEGEND_PADDING)),
            Span::styled(MARKER, Style::default().fg(s.color)),
            Span::raw(label),
            Span::raw(" ".repeat(padding)),
            Span::raw(value),
            Span::raw(" ".repeat(LEGEND_PADDING)),
        ]));

        if i + 1 < sectors.len() {
            lines.push(Line::default());
        }
    }

    lines
}

/// The pie on the left half of `width`, the legend on the right half,
/// vertically centered against each other.
pub fn chart_lines(
    width: usize,
    height: usize,
    radius: f64,
    total: f64,
    raw: Vec<RawSector>,
) -> Vec<Line<'static>> {
    let half = width / 2;
    let sectors = prepare_sectors(total, raw);
    let pie = pie_lines(half, height, radius, &sectors);
    let legend = legend_lines(&sectors, half);

    let rows = pie.len().max(legend.len());
    let pie_top = (rows - pie.len()) / 2;
    let legend_top = (rows - legend.len()) / 2;

    (0..rows)
        .map(|row| {
            let pie_row = row.checked_sub(pie_top).and_then(|r| pie.get(r));
            let mut spans: Vec<Span<'static>> = match pie_row {
                Some(line) => line.spans.clone(),
                None => vec![Span::raw(" ".repeat(half))],
            };
            if let Some(line) = row.checked_sub(legend_top).and_then(|r| legend.get(r)) {
                spans.extend(line.spans.iter().cloned());
            }
            Line::from(spans)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
