use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block as Panel, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use tfs_chat_core::render::{
    strip_markup, CriteriaView, Inline, StoryView, TextBlock, CRITERIA_COLUMNS,
    NO_CRITERIA_PLACEHOLDER,
};
use tfs_chat_core::{Block, Capability, ChatMessage, ChatRole, DisplayContent, QuickAction, Tone};
use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [chat_area, side_area] = Layout::horizontal([
        Constraint::Percentage(70),
        Constraint::Percentage(30),
    ])
    .areas(body_area);

    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_area);

    let [status_area, activity_area] = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(side_area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);
    render_activity(app, frame, activity_area);
    render_footer(frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.session.status();
    let availability = if status.is_empty() {
        String::new()
    } else {
        format!(" [{}/{} сервисов]", status.available_count(), status.services.len())
    };

    let title = Line::from(vec![
        Span::styled(" TFS-Confluence Automation ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(availability, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" clear ", label_style),
    ];
    for (i, action) in QuickAction::all().iter().enumerate() {
        hints.push(Span::styled(format!(" F{} ", i + 1), key_style));
        hints.push(Span::styled(format!(" {} ", action.label()), label_style));
    }
    hints.extend(vec![
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_area = Some(area);

    let block = Panel::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Чат: {} ", app.client.base_url()));

    let lines = if app.session.conversation().is_empty() && !app.is_processing() {
        vec![Line::from(Span::styled(
            "Опишите задачу: цепочка связанных тикетов, чек-лист БДК или User Stories по статье...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in app.session.conversation().messages() {
            lines.extend(message_lines(message));
            lines.push(Line::default());
        }

        if app.is_processing() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(role_line(ChatRole::Assistant));
            lines.push(Line::from(Span::styled(
                format!("Обрабатываю запрос{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    };

    // Wrapped here rather than by the paragraph, so the row count used for
    // scrolling is exactly what gets drawn
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let rows = wrap_lines(lines, usize::from(inner_width));
    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    app.update_transcript_metrics(total, inner_height);

    let transcript = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, area);

    if total > inner_height {
        let mut state = ScrollbarState::new(total.saturating_sub(inner_height) as usize)
            .position(app.transcript_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .flat_map(|line| wrap_line(line, width))
        .collect()
}

/// Word-wrap a styled line to `width` columns without breaking mid-word.
/// Words longer than a row are split; leading whitespace of the first row is
/// kept, whitespace at a break is dropped.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let style = line.style;
    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_len = 0;

    for span in &line.spans {
        for token in tokens(&span.content) {
            let token_len = token.chars().count();
            let is_space = token.chars().all(char::is_whitespace);

            if current_len + token_len <= width {
                if !(is_space && current_len == 0 && !rows.is_empty()) {
                    current.push(Span::styled(token.to_string(), span.style));
                    current_len += token_len;
                }
                continue;
            }

            if current_len > 0 {
                finish_row(&mut rows, &mut current, &mut current_len, style);
            }
            if is_space {
                continue;
            }

            // Hard-split words wider than a row
            let chars: Vec<char> = token.chars().collect();
            let mut chunks = chars.chunks(width).peekable();
            while let Some(chunk) = chunks.next() {
                current.push(Span::styled(chunk.iter().collect::<String>(), span.style));
                current_len = chunk.len();
                if chunks.peek().is_some() {
                    finish_row(&mut rows, &mut current, &mut current_len, style);
                }
            }
        }
    }

    if current_len > 0 || rows.is_empty() {
        finish_row(&mut rows, &mut current, &mut current_len, style);
    }
    rows
}

fn finish_row(
    rows: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    current_len: &mut usize,
    style: Style,
) {
    while current
        .last()
        .is_some_and(|span| span.content.chars().all(char::is_whitespace))
    {
        current.pop();
    }
    rows.push(Line::from(std::mem::take(current)).style(style));
    *current_len = 0;
}

/// Split text into alternating runs of whitespace and non-whitespace.
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_space: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if prev_space.is_some_and(|p| p != space) {
            out.push(&text[start..i]);
            start = i;
        }
        prev_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn role_line(role: ChatRole) -> Line<'static> {
    let (label, color) = match role {
        ChatRole::User => ("Вы:", Color::Cyan),
        ChatRole::Assistant => ("Бот:", Color::Yellow),
        ChatRole::Error => ("Ошибка:", Color::Red),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn message_lines(message: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = vec![role_line(message.role)];
    lines.extend(content_lines(&message.content));
    lines
}

/// Presentation of a rendered turn.
pub fn content_lines(content: &DisplayContent) -> Vec<Line<'static>> {
    let (text_style, heading_color) = match content.tone {
        Tone::Success => (Style::default(), Color::Green),
        Tone::Error => (Style::default().fg(Color::Red), Color::Red),
    };
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for block in &content.blocks {
        match block {
            Block::Heading(text) => lines.push(Line::from(Span::styled(
                text.clone(),
                Style::default().fg(heading_color).add_modifier(Modifier::BOLD),
            ))),
            Block::Text(text) => {
                lines.extend(text.lines().map(|l| Line::from(Span::styled(l.to_string(), text_style))))
            }
            Block::Field { label, value } => lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", label), dim),
                Span::styled(value.clone(), Style::default().fg(Color::Cyan)),
            ])),
            Block::Link { label, url } => lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}", label),
                    Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled(format!(" ({})", url), dim),
            ])),
            Block::WorkItem {
                role,
                id,
                url,
                title,
                parent,
            } => {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", role.label()), Style::default().bold()),
                    Span::styled(format!("#{}", id), Style::default().fg(Color::Cyan)),
                    Span::styled(format!(" {}", url), dim),
                ]));
                lines.push(Line::from(Span::styled(format!("  {}", title), dim)));
                if let Some(parent) = parent {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", tfs_chat_core::render::parent_note(parent)),
                        Style::default().fg(Color::Blue),
                    )));
                }
            }
            Block::Story(story) => lines.extend(story_lines(story)),
            Block::Preformatted(text) => lines.extend(
                text.split('\n')
                    .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::White)))),
            ),
            Block::Note(text) => lines.push(Line::from(Span::styled(
                text.clone(),
                dim.add_modifier(Modifier::ITALIC),
            ))),
        }
    }
    lines
}

fn story_lines(story: &StoryView) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            story.title.clone(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
    ];
    for block in &story.description {
        lines.extend(text_block_lines(block));
    }

    lines.push(Line::from(Span::styled("Критерии приёмки:", Style::default().bold())));
    match &story.criteria {
        CriteriaView::Markup(markup) => lines.extend(
            strip_markup(markup)
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| Line::from(format!("  {}", l.trim()))),
        ),
        CriteriaView::Table { given, when, then } => {
            let values = [given, when, then];
            for ((header, _), value) in CRITERIA_COLUMNS.iter().zip(values) {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}: ", header), Style::default().bold()),
                    Span::raw(value.clone()),
                ]));
            }
        }
        CriteriaView::Bullets(items) => {
            lines.extend(items.iter().map(|item| Line::from(format!("  • {}", item))))
        }
        CriteriaView::Unspecified => lines.push(Line::from(Span::styled(
            NO_CRITERIA_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

/// Lay out a formatted description block, breaking lines on embedded `\n`.
fn text_block_lines(block: &TextBlock) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for (i, inline) in block.spans.iter().enumerate() {
        let (text, style) = match inline {
            Inline::Plain(s) => (s.as_str(), Style::default()),
            Inline::Emphasis(s) => (s.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        };
        if i > 0 && !current.is_empty() {
            current.push(Span::raw(" "));
        }
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            if !first.is_empty() {
                current.push(Span::styled(first.to_string(), style));
            }
        }
        for piece in pieces {
            lines.push(Line::from(std::mem::take(&mut current)));
            if !piece.is_empty() {
                current.push(Span::styled(piece.to_string(), style));
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_processing() { Color::DarkGray } else { Color::Yellow };
    let title = match &app.notice {
        Some(notice) => format!(" {} ", notice),
        None => " Сообщение ".to_string(),
    };

    let input_block = Panel::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling to keep the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let block = Panel::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Статус сервисов ");

    let status = app.session.status();
    let lines: Vec<Line> = if status.is_empty() {
        vec![Line::from(Span::styled(
            "Проверка сервисов...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        status
            .services
            .values()
            .flat_map(|service| {
                let (mark, label, color) = if service.available {
                    ("●", "Доступен", Color::Green)
                } else {
                    ("●", "Недоступен", Color::Red)
                };
                [
                    Line::from(vec![
                        Span::styled(format!("{} ", mark), Style::default().fg(color)),
                        Span::styled(service.name.clone(), Style::default().bold()),
                        Span::styled(format!("  {}", label), Style::default().fg(color)),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}", service.description),
                        Style::default().fg(Color::DarkGray),
                    )),
                ]
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_activity(app: &App, frame: &mut Frame, area: Rect) {
    let block = Panel::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Недавние операции ");

    let summaries = app.session.history().summaries(Utc::now());
    let lines: Vec<Line> = if summaries.is_empty() {
        vec![Line::from(Span::styled(
            "Нет недавних операций",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        summaries
            .into_iter()
            .flat_map(|summary| {
                let (mark, color) = if summary.success {
                    ("✔", Color::Green)
                } else {
                    ("✘", Color::Red)
                };
                let kind = match summary.kind {
                    Capability::Checklist => "☑",
                    Capability::ChangeChain => "⛓",
                };
                [
                    Line::from(vec![
                        Span::styled(format!("{} ", mark), Style::default().fg(color)),
                        Span::raw(format!("{} {}", kind, summary.text)),
                    ]),
                    Line::from(Span::styled(
                        format!("  {} · {}", summary.kind.display_name(), summary.age),
                        Style::default().fg(Color::DarkGray),
                    )),
                ]
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
