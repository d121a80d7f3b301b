//! Header (track + transport) and footer (tone settings + keys) lines.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use boombox_core::ToneParameters;

use crate::theme::{
    style_accent, style_default, style_muted, style_secondary, C_ERROR, C_PAUSED, C_PLAYING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub track: Option<String>,
    pub track_index: usize,
    pub track_count: usize,
    pub transport: Transport,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub muted: bool,
    pub graph_available: bool,
    pub error: Option<String>,
}

pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn header_line(info: &StatusInfo) -> Line<'static> {
    let (badge, color) = match info.transport {
        Transport::Playing => ("▶ PLAY", C_PLAYING),
        Transport::Paused => ("‖ PAUSE", C_PAUSED),
        Transport::Stopped => ("■ STOP", C_PAUSED),
    };
    let mut spans = vec![
        Span::styled(format!(" {} ", badge), ratatui::style::Style::default().fg(color)),
        Span::styled(
            info.track.clone().unwrap_or_else(|| "no track".to_string()),
            style_accent(),
        ),
        Span::styled(
            format!("  [{}/{}]", info.track_index + 1, info.track_count.max(1)),
            style_muted(),
        ),
        Span::styled(
            format!(
                "  {} / {}",
                format_time(info.position_secs),
                info.duration_secs.map(format_time).unwrap_or_else(|| "--:--".into())
            ),
            style_secondary(),
        ),
    ];
    if info.muted {
        spans.push(Span::styled("  muted", style_muted()));
    }
    if !info.graph_available {
        spans.push(Span::styled("  tone off", style_muted()));
    }
    if let Some(err) = &info.error {
        spans.push(Span::styled(
            format!("  {}", err),
            ratatui::style::Style::default().fg(C_ERROR),
        ));
    }
    Line::from(spans)
}

pub fn tone_line(tone: &ToneParameters) -> Line<'static> {
    Line::from(vec![
        Span::styled(" bass ", style_muted()),
        Span::styled(format!("{:+.0}dB", tone.bass_gain_db), style_default()),
        Span::styled("  treble ", style_muted()),
        Span::styled(format!("{:+.0}dB", tone.treble_gain_db), style_default()),
        Span::styled("  bal ", style_muted()),
        Span::styled(format!("{:+.0}", tone.pan_position * 50.0), style_default()),
        Span::styled("  vol ", style_muted()),
        Span::styled(format!("{:.0}", tone.volume_level), style_default()),
    ])
}

pub fn keys_line() -> Line<'static> {
    Line::from(Span::styled(
        " space play/pause · s stop · n/p track · ←/→ seek · b/B bass · t/T treble · [/] balance · -/+ vol · m mute · 0 reset · q quit",
        style_muted(),
    ))
}

pub fn draw_header(frame: &mut Frame, area: Rect, info: &StatusInfo) {
    frame.render_widget(Paragraph::new(header_line(info)), area);
}

pub fn draw_footer(frame: &mut Frame, area: Rect, tone: &ToneParameters, show_keys: bool) {
    let mut lines = vec![tone_line(tone)];
    if show_keys {
        lines.push(keys_line());
    }
    frame.render_widget(Paragraph::new(lines), area);
}
