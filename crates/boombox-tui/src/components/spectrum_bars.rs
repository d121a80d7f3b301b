//! Spectrum bars — draws a `SpectrumFrame` as 16 vertical bars.
//!
//! Height uses 1/8th block precision; opacity dims the bar toward the
//! background so quiet bars read as faded rather than invisible.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use boombox_core::{SpectrumFrame, BAR_COUNT};

use crate::theme::{lerp_color, with_opacity, C_BAR_HIGH, C_BAR_LOW, C_BG};

const EIGHTHS: [char; 7] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇'];
const FULL: char = '█';
const BAR_GAP: usize = 1;

fn bar_width(width: usize) -> usize {
    ((width + BAR_GAP) / BAR_COUNT).saturating_sub(BAR_GAP).max(1)
}

/// Character for the cell `level` rows above the bottom (0-based) of a bar
/// filled to `filled_eighths`.
fn cell_char(filled_eighths: usize, level: usize) -> char {
    let below = level * 8;
    match filled_eighths.saturating_sub(below) {
        0 => ' ',
        n if n >= 8 => FULL,
        n => EIGHTHS[n - 1],
    }
}

pub fn build_bar_lines(frame: &SpectrumFrame, width: usize, height: usize) -> Vec<Line<'static>> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let bw = bar_width(width);
    let filled: Vec<usize> = frame
        .bars
        .iter()
        .map(|b| ((b.height / 100.0).clamp(0.0, 1.0) * height as f32 * 8.0).round() as usize)
        .collect();

    (0..height)
        .map(|row| {
            let level = height - 1 - row;
            let tint = lerp_color(C_BAR_LOW, C_BAR_HIGH, level as f32 / height.max(2) as f32);
            let mut spans = Vec::with_capacity(BAR_COUNT * 2);
            for (bar, &eighths) in frame.bars.iter().zip(&filled) {
                let ch = cell_char(eighths, level);
                let color = with_opacity(tint, bar.opacity);
                spans.push(Span::styled(
                    ch.to_string().repeat(bw),
                    Style::default().fg(color).bg(C_BG),
                ));
                spans.push(Span::raw(" ".repeat(BAR_GAP)));
            }
            Line::from(spans)
        })
        .collect()
}

pub fn draw_spectrum(frame: &mut Frame, area: Rect, spectrum: &SpectrumFrame) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let lines = build_bar_lines(spectrum, area.width as usize, area.height as usize);
    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use boombox_core::spectrum::{BandScaling, BarState};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_resting_frame_shows_thin_floor() {
        let lines = build_bar_lines(&SpectrumFrame::resting(&BandScaling::default()), 32, 10);
        assert_eq!(lines.len(), 10);
        assert!(line_text(&lines[9]).contains('▂'));
        assert!(line_text(&lines[0]).trim().is_empty());
    }

    #[test]
    fn test_full_bars_fill_every_row() {
        let full = SpectrumFrame {
            bars: [BarState { height: 100.0, opacity: 1.0 }; BAR_COUNT],
        };
        let lines = build_bar_lines(&full, 32, 4);
        for line in &lines {
            assert_eq!(line_text(line).matches(FULL).count(), BAR_COUNT);
        }
    }

    #[test]
    fn test_bar_width_scales_with_area() {
        assert_eq!(bar_width(16), 1);
        assert_eq!(bar_width(64), 3);
        assert_eq!(bar_width(0), 1);
    }

    #[test]
    fn test_cell_char_partial() {
        assert_eq!(cell_char(12, 0), FULL);
        assert_eq!(cell_char(12, 1), '▄');
        assert_eq!(cell_char(12, 2), ' ');
    }
}
