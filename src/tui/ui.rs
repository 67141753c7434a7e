use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use unicode_truncate::UnicodeTruncateStr;

use crate::doctor::CheckStatus;
use crate::view::ListEntry;

use super::app::{App, View};

/// Width of one card in a discovery row
const CARD_WIDTH: u16 = 24;

pub fn draw(frame: &mut Frame, app: &App) {
    match app.view {
        View::Discovery => draw_discovery(frame, app),
        View::Lookup => draw_lookup(frame, app),
        View::Streams => draw_streams(frame, app),
        View::Doctor => draw_doctor(frame, app),
    }

    if let Some(message) = app.active_notification() {
        draw_notification(frame, message);
    }
}

fn selected_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw_discovery(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Rows
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    let title = Paragraph::new("debrid-streams")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    if app.is_loading_discovery && app.discovery_rows.is_empty() {
        let loading = Paragraph::new("Loading catalogs...").style(Style::default().fg(Color::Yellow));
        frame.render_widget(loading, chunks[1]);
    } else if let Some(error) = &app.discovery_error {
        let text = vec![
            Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red))),
            Line::from(""),
            Line::from(Span::styled(
                "Press / to look up a title by IMDb ID",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(text), chunks[1]);
    } else {
        draw_rows(frame, app, chunks[1]);
    }

    let help = Paragraph::new(
        "↑/↓: row | ←/→: title | Enter: streams | m: more | /: IMDb lookup | r: reload | d: doctor | q: quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}

fn draw_rows(frame: &mut Frame, app: &App, area: Rect) {
    // Each row takes a title line plus a bordered card strip
    let row_height = 5u16;
    let visible = (area.height / row_height).max(1) as usize;
    let first = app.selected_row_index.saturating_sub(visible - 1);

    let constraints: Vec<Constraint> = (0..visible).map(|_| Constraint::Length(row_height)).collect();
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (slot, (row_index, row)) in slots
        .iter()
        .zip(app.discovery_rows.iter().enumerate().skip(first))
    {
        let is_selected_row = row_index == app.selected_row_index;
        let cards_per_screen = (slot.width / CARD_WIDTH).max(1) as usize;
        let selected_item = if is_selected_row { app.selected_item_index } else { 0 };
        let offset = selected_item.saturating_sub(cards_per_screen - 1);

        let mut spans = Vec::new();
        for (i, card) in row.cards.iter().enumerate().skip(offset).take(cards_per_screen) {
            let year = card.year.map(|y| format!(" {}", y)).unwrap_or_default();
            let label_width = (CARD_WIDTH as usize).saturating_sub(year.len() + 2);
            let (name, _) = card.title.unicode_truncate(label_width);
            let text = format!(" {}{} ", name, year);

            let style = if is_selected_row && i == app.selected_item_index {
                selected_style()
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!("{:<width$}", text, width = CARD_WIDTH as usize), style));
        }
        if row.is_loading_more {
            spans.push(Span::styled(" loading...", Style::default().fg(Color::Yellow)));
        }

        let border = if is_selected_row {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let strip = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("{} [{}]", row.row.title, row.cards.len())),
        );
        frame.render_widget(strip, *slot);
    }

    // Details of the focused card below the strips, when there is room
    if let Some(card) = app.selected_card()
        && let Some(overview) = &card.overview
        && area.height > row_height * visible as u16 + 2
    {
        let rest = Rect::new(
            area.x,
            area.y + row_height * visible as u16,
            area.width,
            area.height - row_height * visible as u16,
        );
        let rating = card.rating.map(|r| format!(" ★ {:.1}", r)).unwrap_or_default();
        let details = Paragraph::new(vec![
            Line::from(Span::styled(
                format!("{}{}", card.title, rating),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(overview.as_str()),
        ])
        .wrap(Wrap { trim: true });
        frame.render_widget(details, rest);
    }
}

fn draw_lookup(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Input
            Constraint::Length(2), // Kind
            Constraint::Min(0),    // Error
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    let title = Paragraph::new("Look up by IMDb ID")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default());
    frame.render_widget(title, chunks[0]);

    let input = Paragraph::new(app.lookup_input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("IMDb ID"));
    frame.render_widget(input, chunks[1]);

    let kind = if app.lookup_series { "Series" } else { "Movie" };
    let kind_line = Paragraph::new(Line::from(vec![
        Span::raw("Type: "),
        Span::styled(kind, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    ]));
    frame.render_widget(kind_line, chunks[2]);

    if let Some(error) = &app.lookup_error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, chunks[3]);
    }

    let help = Paragraph::new("Enter: find streams | Tab: movie/series | Esc: back")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);
}

fn draw_streams(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // List
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    let list = &app.list;

    // Header: title, source, position and chosen quality
    let title = app
        .current_meta
        .as_ref()
        .map(|m| match m.year {
            Some(year) => format!("{} ({})", m.display_title(), year),
            None => m.display_title().to_string(),
        })
        .unwrap_or_default();

    let mut header = vec![Span::styled(
        title,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(source) = list.sources().get(list.active_source()) {
        header.push(Span::styled(format!("  [{}]", source), Style::default().fg(Color::Yellow)));
    }
    if let Some(info) = list.filter_info() {
        header.push(Span::raw(format!("  {}", info)));
    }
    if list.filter_choice() > 0
        && let Some(quality) = list.chosen_label()
    {
        header.push(Span::styled(format!("  Quality: {}", quality), Style::default().fg(Color::Green)));
    }
    let header = Paragraph::new(Line::from(header)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if list.is_loading() {
        let loading = Paragraph::new("Loading streams...  (Esc to cancel)")
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(loading, chunks[1]);
    } else if let Some(message) = list.empty_message() {
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, chunks[1]);
    } else {
        draw_entries(frame, app, chunks[1]);
    }

    let help = if list.stream_count() > 0 {
        "↑/↓: navigate | Enter: play | i: details | →/f: filter | ←: menu | Esc: back"
    } else {
        "↑/↓: navigate | Enter: open | →/f: filter | ←: menu | Esc: back"
    };
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), chunks[2]);

    if list.panel().is_some() {
        draw_filter_panel(frame, app);
    }
    if list.details().is_some() {
        draw_details(frame, app);
    }
    if app.trakt_prompt.is_some() {
        draw_trakt_prompt(frame, app);
    }
}

fn draw_entries(frame: &mut Frame, app: &App, area: Rect) {
    let list = &app.list;
    // Two lines per entry plus the border
    let visible = (area.height.saturating_sub(2) / 2).max(1) as usize;
    let offset = list.focus().saturating_sub(visible - 1);

    let items: Vec<ListItem> = list
        .entries()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, entry)| {
            let style = if i == list.focus() {
                selected_style()
            } else {
                Style::default()
            };

            let title_style = match entry {
                ListEntry::Episode { watched: true, .. } => Style::default().fg(Color::DarkGray),
                _ => Style::default(),
            };

            let mut first = vec![Span::styled(entry.title().to_string(), title_style)];
            if let Some(stream) = entry.as_stream()
                && let Some(quality) = &stream.tag.quality
            {
                first.insert(
                    0,
                    Span::styled(format!("{:<6} ", quality), Style::default().fg(Color::Green)),
                );
            }

            let mut second = Vec::new();
            if !entry.info().is_empty() {
                second.push(Span::styled(entry.info().to_string(), Style::default().fg(Color::DarkGray)));
            }
            if let Some(stream) = entry.as_stream() {
                let summary = stream.tag.summary();
                if !summary.is_empty() {
                    second.push(Span::styled(format!("  {}", summary), Style::default().fg(Color::Yellow)));
                }
            }

            ListItem::new(vec![Line::from(first), Line::from(second)]).style(style)
        })
        .collect();

    let title = match list.stream_count() {
        0 => format!("{} items", list.entries().len()),
        n => format!("{} streams", n),
    };
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, area);
}

fn draw_filter_panel(frame: &mut Frame, app: &App) {
    let Some(panel) = app.list.panel() else {
        return;
    };

    let height = panel.rows.len() as u16 + 2;
    let area = centered(frame.area(), 44, height);
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = panel
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == panel.selected {
                selected_style()
            } else {
                Style::default()
            };
            ListItem::new(app.list.filter_row_label(*row)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Filter"),
    );
    frame.render_widget(list, area);
}

fn draw_details(frame: &mut Frame, app: &App) {
    let Some(menu) = app.list.details() else {
        return;
    };

    if menu.info_open {
        let area = centered(frame.area(), 70, 14);
        frame.render_widget(Clear, area);
        let info = Paragraph::new(menu.entry.tag.full.as_str())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title("Information"),
            );
        frame.render_widget(info, area);
        return;
    }

    let area = centered(frame.area(), 60, menu.items.len() as u16 * 2 + 2);
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = menu
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == menu.selected {
                selected_style()
            } else {
                Style::default()
            };
            let (subtitle, _) = menu.subtitle(*item).unicode_truncate(54);
            ListItem::new(vec![
                Line::from(Span::styled(item.label(), Style::default().add_modifier(Modifier::BOLD))),
                Line::from(Span::styled(subtitle.to_string(), Style::default().fg(Color::DarkGray))),
            ])
            .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(menu.entry.title.as_str()),
    );
    frame.render_widget(list, area);
}

fn draw_trakt_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = &app.trakt_prompt else {
        return;
    };

    let area = centered(frame.area(), 50, 7);
    frame.render_widget(Clear, area);

    let label = prompt
        .content
        .episode_label()
        .map(|e| format!("{} {}", prompt.meta.display_title(), e))
        .unwrap_or_else(|| prompt.meta.display_title().to_string());

    let option = |text: &'static str, index: usize| {
        if prompt.selected == index {
            Span::styled(format!(" {} ", text), selected_style())
        } else {
            Span::raw(format!(" {} ", text))
        }
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Mark {} as watched?", label),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![option("Yes", 0), Span::raw("   "), option("No", 1)]),
    ];

    let popup = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Trakt"),
    );
    frame.render_widget(popup, area);
}

fn draw_notification(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let width = (message.chars().count() as u16 + 4).min(area.width);
    let rect = Rect::new(
        area.x + area.width.saturating_sub(width),
        area.y,
        width,
        1.min(area.height),
    );
    frame.render_widget(Clear, rect);
    let note = Paragraph::new(format!(" {} ", message))
        .style(Style::default().fg(Color::Black).bg(Color::Yellow));
    frame.render_widget(note, rect);
}

fn draw_doctor(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Check results
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    let title = Paragraph::new("Addon Health Check")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default());
    frame.render_widget(title, chunks[0]);

    if app.is_checking {
        let checking = Paragraph::new("Running checks...").style(Style::default().fg(Color::Yellow));
        frame.render_widget(checking, chunks[1]);
    } else if app.doctor_results.is_empty() {
        let empty = Paragraph::new("Press 'r' to run checks").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .doctor_results
            .iter()
            .map(|r| {
                let color = match r.status {
                    CheckStatus::Ok => Color::Green,
                    CheckStatus::Warning => Color::Yellow,
                    CheckStatus::Error => Color::Red,
                };

                let line = Line::from(vec![
                    Span::styled(format!("{} ", r.icon()), Style::default().fg(color)),
                    Span::styled(format!("{:<10}", r.name), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(r.message.as_str()),
                ]);

                ListItem::new(line)
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Results"));
        frame.render_widget(list, chunks[1]);
    }

    let help = Paragraph::new("r: run checks | q/Esc: back").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}
