//! Waveform comparison plots
//!
//! Renders the mixed (noisy) and filtered signals as two stacked SVG panels
//! over a shared time axis. Long signals are reduced to a min/max envelope
//! per pixel column.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::engine::Waveform;
use crate::error::Result;

const WIDTH: f64 = 1000.0;
const PANEL_HEIGHT: f64 = 200.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const PANEL_GAP: f64 = 60.0;

/// Write the comparison plot to `path`
pub fn save_comparison_plot(path: &Path, mixed: &Waveform, filtered: &Waveform) -> Result<()> {
    fs::write(path, render_comparison_svg(mixed, filtered))?;
    Ok(())
}

/// Render the comparison plot as an SVG document
pub fn render_comparison_svg(mixed: &Waveform, filtered: &Waveform) -> String {
    let height = MARGIN_TOP + 2.0 * PANEL_HEIGHT + 2.0 * PANEL_GAP;
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    render_panel(&mut svg, mixed, "mixed signal", "black", MARGIN_TOP);
    render_panel(
        &mut svg,
        filtered,
        "filtered signal",
        "red",
        MARGIN_TOP + PANEL_HEIGHT + PANEL_GAP,
    );

    svg.push_str("</svg>\n");
    svg
}

fn render_panel(svg: &mut String, waveform: &Waveform, title: &str, title_color: &str, top: f64) {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let peak = waveform.peak().max(f64::MIN_POSITIVE);
    let mid = top + PANEL_HEIGHT / 2.0;
    let duration = waveform.duration_secs();

    let _ = writeln!(
        svg,
        r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="14" fill="{c}">{t}</text>"#,
        x = WIDTH / 2.0 - 50.0,
        y = top - 8.0,
        c = title_color,
        t = title
    );

    // grid: frame, zero line and five time ticks
    let _ = writeln!(
        svg,
        r##"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="#999"/>"##,
        x = MARGIN_LEFT,
        y = top,
        w = plot_width,
        h = PANEL_HEIGHT
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{x1}" y1="{y}" x2="{x2}" y2="{y}" stroke="#ddd"/>"##,
        x1 = MARGIN_LEFT,
        x2 = MARGIN_LEFT + plot_width,
        y = mid
    );
    for tick in 0..=5 {
        let frac = tick as f64 / 5.0;
        let x = MARGIN_LEFT + frac * plot_width;
        let _ = writeln!(
            svg,
            r##"<line x1="{x}" y1="{y1}" x2="{x}" y2="{y2}" stroke="#ddd"/>"##,
            x = x,
            y1 = top,
            y2 = top + PANEL_HEIGHT
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="10" text-anchor="middle">{t:.2}</text>"#,
            x = x,
            y = top + PANEL_HEIGHT + 14.0,
            t = frac * duration
        );
    }
    let _ = writeln!(
        svg,
        r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="11" text-anchor="middle">Time [s]</text>"#,
        x = MARGIN_LEFT + plot_width / 2.0,
        y = top + PANEL_HEIGHT + 30.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="14" y="{y}" font-family="sans-serif" font-size="11" transform="rotate(-90 14 {y})" text-anchor="middle">Amplitude</text>"#,
        y = mid
    );

    let points = envelope_points(waveform.samples(), plot_width as usize);
    let mut path = String::new();
    for (i, (x_frac, value)) in points.iter().enumerate() {
        let x = MARGIN_LEFT + x_frac * plot_width;
        let y = mid - (value / peak) * (PANEL_HEIGHT / 2.0);
        let _ = write!(path, "{}{:.1},{:.1}", if i == 0 { "" } else { " " }, x, y);
    }
    let _ = writeln!(
        svg,
        r#"<polyline fill="none" stroke="steelblue" stroke-width="0.8" points="{}"/>"#,
        path
    );
}

/// Reduce samples to at most two points (min then max) per column
///
/// Returns `(x fraction in 0..=1, value)` pairs.
fn envelope_points(samples: &[f64], columns: usize) -> Vec<(f64, f64)> {
    let n = samples.len();
    if n == 0 || columns == 0 {
        return Vec::new();
    }
    let last = (n - 1).max(1) as f64;

    if n <= columns * 2 {
        return samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as f64 / last, s))
            .collect();
    }

    let per_column = n as f64 / columns as f64;
    let mut points = Vec::with_capacity(columns * 2);
    for col in 0..columns {
        let start = (col as f64 * per_column) as usize;
        let end = (((col + 1) as f64 * per_column) as usize).min(n).max(start + 1);
        let chunk = &samples[start..end];
        let lo = chunk.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = chunk.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let x = start as f64 / last;
        points.push((x, lo));
        points.push((x, hi));
    }
    points
}
