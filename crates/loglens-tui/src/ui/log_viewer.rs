use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use loglens_logs::DisplayBuffer;
use loglens_query::build_mask;
use loglens_types::ConnectionState;

use crate::app::AppState;
use crate::theme::Theme;
use crate::ui::highlight::highlight_line;
use crate::ui::status_bar::StatusBar;

/// The live log screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, buffer: &DisplayBuffer) {
        let area = frame.area();

        let show_filter_bar = state.input_active || !state.filter_raw.is_empty();

        let mut constraints = vec![Constraint::Length(3)]; // header
        if show_filter_bar {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1)); // logs
        constraints.push(Constraint::Length(1)); // status bar

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 0;
        Self::render_header(frame, chunks[idx], state);
        idx += 1;

        if show_filter_bar {
            Self::render_filter_bar(frame, chunks[idx], state);
            idx += 1;
        }

        Self::render_logs(frame, chunks[idx], state, buffer);
        idx += 1;

        Self::render_status_bar(frame, chunks[idx], state, buffer);

        if state.help_visible {
            Self::render_help(frame, area);
        }
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let (status_text, status_style) = match &state.connection {
            ConnectionState::Connected => ("live", Theme::text().fg(Theme::SUCCESS)),
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                ("connecting", Theme::text().fg(Theme::WARNING))
            }
            ConnectionState::Disconnected { .. } => ("disconnected", Theme::error()),
            ConnectionState::SessionInvalid | ConnectionState::AccessDenied => {
                ("auth", Theme::error())
            }
            ConnectionState::Idle | ConnectionState::Closed => ("idle", Theme::text_dim()),
        };

        let line = Line::from(vec![
            Span::styled("loglens", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.settings.base_url.clone(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(status_text, status_style),
        ]);

        let header = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );
        frame.render_widget(header, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let mut spans = Vec::new();

        if state.input_active {
            spans.push(Span::styled(state.filter_input.clone(), Theme::text()));
            spans.push(Span::styled("█", Theme::text()));
            spans.push(Span::styled(
                "  [Enter] Apply  [Esc] Cancel",
                Theme::text_dim(),
            ));
        } else {
            spans.push(Span::styled(
                state.filter_raw.clone(),
                Style::default()
                    .fg(Theme::HIGHLIGHT)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let border = if state.input_active {
            Theme::border_focused()
        } else {
            Theme::border()
        };

        let bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(" Filter ", Theme::title())),
        );
        frame.render_widget(bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, buffer: &DisplayBuffer) {
        state.filter_cache.refresh(
            buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );

        let total = state.filter_cache.entries.len();
        let inner_height = area.height.saturating_sub(2) as usize;
        let max_scroll = total.saturating_sub(inner_height);

        if state.auto_scroll {
            state.log_scroll = max_scroll;
        } else if state.log_scroll > max_scroll {
            state.log_scroll = max_scroll;
        }

        let filtering = !state.query.is_empty();
        let lines: Vec<Line> = state
            .filter_cache
            .entries
            .iter()
            .skip(state.log_scroll)
            .take(inner_height)
            .map(|entry| {
                let base = Theme::text().fg(state.settings.color_for(entry.record.level));
                let line = Line::from(Span::styled(entry.text.clone(), base));
                if filtering {
                    let mask = build_mask(&entry.text, &state.query);
                    if mask.iter().any(|&m| m) {
                        return highlight_line(&line, &mask, Theme::match_highlight());
                    }
                }
                line
            })
            .collect();

        let title = if filtering {
            format!(" Logs ({} matching) ", total)
        } else {
            format!(" Logs ({}) ", total)
        };

        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(widget, area);

        if total > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.log_scroll.min(max_scroll));
            frame.render_stateful_widget(
                scrollbar,
                area.inner(ratatui::layout::Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, buffer: &DisplayBuffer) {
        let counts = buffer.level_counts();

        let right = match state.status_text() {
            Some(status) => format!("{} │ {} entries", status, counts.total()),
            None => format!("{} entries", counts.total()),
        };

        let follow = if state.auto_scroll { "follow ✓" } else { "follow" };
        let bar = StatusBar::new()
            .hints(vec![
                ("/", "Filter"),
                ("f", follow),
                ("g/G", "Top/Bottom"),
                ("?", "Help"),
                ("q", "Quit"),
            ])
            .right(right);
        frame.render_widget(bar, area);
    }

    fn render_help(frame: &mut Frame, area: Rect) {
        let width = 52.min(area.width);
        let height = 14.min(area.height);
        let popup = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };

        let lines = vec![
            Line::from(Span::styled("Filter syntax", Theme::title())),
            Line::from("  word          case-insensitive match"),
            Line::from("  a b           both must match"),
            Line::from("  a|b           either matches"),
            Line::from("  -word         exclude matches"),
            Line::from("  \"a phrase\"    exact phrase"),
            Line::from("  /re(gex)?/im  regular expression"),
            Line::from("  \\x            escape any character"),
            Line::from(""),
            Line::from(Span::styled("Keys", Theme::title())),
            Line::from("  j/k scroll   f follow   / filter   n clear"),
            Line::from("  g/G top/bottom   ? help   q quit"),
        ];

        frame.render_widget(Clear, popup);
        let help = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border_focused())
                .title(Span::styled(" Help ", Theme::title())),
        );
        frame.render_widget(help, popup);
    }
}
