use crate::core::{EntryKind, RajifyCore, View};
use crate::model::RepeatMode;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE_WITH_VERSION: &str = concat!("Rajify v", env!("CARGO_PKG_VERSION"), "  ");
const NAV_VIEWS: [(View, &str); 5] = [
    (View::Home, "h"),
    (View::Search, "/"),
    (View::Playlist, "p"),
    (View::Library, "l"),
    (View::Queue, "u"),
];

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    playlist: Color,
    saved: Color,
    favorite: Color,
    selected_bg: Color,
    popup_bg: Color,
}

fn palette() -> Palette {
    Palette {
        bg: Color::Rgb(0, 0, 0),
        panel_bg: Color::Rgb(18, 18, 18),
        panel_alt_bg: Color::Rgb(24, 24, 24),
        border: Color::Rgb(64, 64, 64),
        text: Color::Rgb(240, 240, 240),
        muted: Color::Rgb(156, 163, 175),
        accent: Color::Rgb(34, 197, 94),
        alert: Color::Rgb(250, 204, 21),
        playlist: Color::Rgb(147, 197, 253),
        saved: Color::Rgb(216, 180, 254),
        favorite: Color::Rgb(239, 68, 68),
        selected_bg: Color::Rgb(38, 38, 38),
        popup_bg: Color::Rgb(31, 41, 55),
    }
}

pub fn draw(frame: &mut Frame, core: &RajifyCore, player_name: &str) {
    let colors = palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, core, player_name, &colors, vertical[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(20),
            Constraint::Min(30),
            Constraint::Percentage(30),
        ])
        .split(vertical[1]);

    draw_nav(frame, core, &colors, body[0]);
    draw_browser(frame, core, &colors, body[1]);
    draw_now_playing(frame, core, &colors, body[2]);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(core, 26, 10),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(timeline, vertical[2]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Enter open/play, a play all, Space pause, n/b next/prev, s shuffle, r repeat, e queue, f fav, w save, g lang, q quit",
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
    ]))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, vertical[3]);

    if let Some(input) = &core.search_input {
        draw_search_prompt(frame, input, &colors);
    }
}

fn draw_header(frame: &mut Frame, core: &RajifyCore, player_name: &str, colors: &Palette, area: Rect) {
    frame.render_widget(
        panel_block("Status", colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 0,
        horizontal: 1,
    });

    let mode = core.sequencer.mode();
    let repeat_style = if mode.repeat == RepeatMode::Off {
        Style::default().fg(colors.muted)
    } else {
        Style::default().fg(colors.accent)
    };
    let shuffle_style = if mode.shuffle {
        Style::default().fg(colors.accent)
    } else {
        Style::default().fg(colors.muted)
    };

    let mut spans = vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Language {}", core.language),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled("Shuffle", shuffle_style),
        Span::styled("  ", Style::default()),
        Span::styled(format!("Repeat {}", mode.repeat.label()), repeat_style),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Player {player_name}"),
            Style::default().fg(colors.muted),
        ),
    ];
    if core.loading {
        spans.push(Span::styled("  loading...", Style::default().fg(colors.alert)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn draw_nav(frame: &mut Frame, core: &RajifyCore, colors: &Palette, area: Rect) {
    let lines: Vec<Line> = NAV_VIEWS
        .iter()
        .map(|(view, key)| {
            let style = if *view == core.view {
                Style::default()
                    .fg(colors.accent)
                    .bg(colors.selected_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.muted)
            };
            Line::from(vec![
                Span::styled(format!(" {key} "), Style::default().fg(colors.alert)),
                Span::styled(view.label(), style),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(
            "Browse",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        )),
        area,
    );
}

fn draw_browser(frame: &mut Frame, core: &RajifyCore, colors: &Palette, area: Rect) {
    let entries = core.entries();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let marker = if entry.playing { "  > " } else { "    " };
            let kind_style = match entry.kind {
                EntryKind::Playlist | EntryKind::Recent => Style::default().fg(colors.playlist),
                EntryKind::Saved => Style::default().fg(colors.saved),
                EntryKind::Track => Style::default().fg(colors.text),
            };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(colors.accent)),
                Span::styled(entry.label.as_str(), kind_style),
            ];
            if entry.favorite {
                spans.push(Span::styled(" *", Style::default().fg(colors.favorite)));
            }
            if !entry.detail.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", entry.detail),
                    Style::default().fg(colors.muted),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!entries.is_empty()).then(|| core.selected.min(entries.len() - 1)));

    let title = match core.view {
        View::Playlist => format!(
            "{} / {} songs",
            core.playlist_title().unwrap_or("Playlist"),
            core.sequencer.active().len()
        ),
        View::Search if !core.last_search.is_empty() => format!("Search / {}", core.last_search),
        View::Home => format!("Popular {} playlists", core.language),
        view => view.label().to_string(),
    };

    let list = List::new(items)
        .block(panel_block(&title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_now_playing(frame: &mut Frame, core: &RajifyCore, colors: &Palette, area: Rect) {
    let current = core.sequencer.current();
    let title = current.map(|track| track.title.as_str()).unwrap_or("-");
    let channel = current.map(|track| track.channel.as_str()).unwrap_or("-");
    let favorite = current.is_some_and(|track| core.library.is_favorite(&track.id));
    let position = core
        .sequencer
        .position()
        .map(|idx| format!("{}/{}", idx + 1, core.sequencer.active().len()))
        .unwrap_or_else(|| format!("-/{}", core.sequencer.active().len()));
    let state = if core.sequencer.is_playing() {
        "Playing"
    } else if current.is_some() {
        "Paused"
    } else {
        "Stopped"
    };

    let mut text = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {title}"), Style::default().fg(colors.text)),
            Span::styled(
                if favorite { " *" } else { "" },
                Style::default().fg(colors.favorite),
            ),
        ]),
        Line::from(Span::styled(
            format!("Channel {channel}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("Track   {position}  {state}"),
            Style::default().fg(colors.alert),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Up next ({})", core.sequencer.queue().len()),
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    text.extend(core.sequencer.queue().iter().take(5).map(|track| {
        Line::from(Span::styled(
            format!("  {}", track.title),
            Style::default().fg(colors.muted),
        ))
    }));
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        format!(
            "Favorites {}  Saved {}  Recent {}",
            core.library.favorite_count(),
            core.library.saved().len(),
            core.library.recent().len()
        ),
        Style::default().fg(colors.muted),
    )));

    let block = Paragraph::new(text)
        .block(panel_block(
            "Now Playing",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(block, area);
}

fn draw_search_prompt(frame: &mut Frame, input: &str, colors: &Palette) {
    let popup = centered_rect(frame.area(), 50, 20);
    frame.render_widget(Clear, popup);
    let prompt = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{input}_"),
            Style::default().fg(colors.text),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter search, Esc cancel",
            Style::default().fg(colors.muted),
        )),
    ])
    .block(panel_block(
        "Search playlists",
        colors.popup_bg,
        colors.text,
        colors.accent,
    ));
    frame.render_widget(prompt, popup);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(core: &RajifyCore, timeline_bar_width: usize, volume_bar_width: usize) -> String {
    let (elapsed, total, ratio) = match &core.progress {
        Some(progress) => (
            progress.current.as_str(),
            progress.duration.as_str(),
            Some(progress.percent / 100.0),
        ),
        None => ("0:00", "--:--", None),
    };
    let volume = core.settings.volume.clamp(0.0, 1.0);

    format!(
        "{elapsed} / {total} {}  |  Vol {} {:>3}%  +/- adjust  </> seek",
        progress_bar(ratio, timeline_bar_width),
        progress_bar(Some(f64::from(volume)), volume_bar_width),
        (volume * 100.0).round() as u16
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(Some(0.5), 4), "[##--]");
        assert_eq!(progress_bar(None, 3), "[---]");
        assert_eq!(progress_bar(Some(7.0), 2), "[##]");
    }
}
