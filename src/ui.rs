use crate::app::{App, LoginField, Mode, Screen};
use crate::delete_flow::DeleteTarget;
use crate::diary_entry::{DiaryEntry, DiaryImage};
use crate::image_placement::Gesture;
use crate::pagination::FlipDirection;
use crate::toast::ToastKind;
use color_eyre::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::Instant,
};
use unicode_width::UnicodeWidthChar;

/// Owns the terminal for the lifetime of the app and restores it on drop.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(Tui { terminal })
    }

    pub fn area(&self) -> Result<Rect> {
        let size = self.terminal.size()?;
        Ok(Rect::new(0, 0, size.width, size.height))
    }

    pub fn draw(&mut self, app: &App, now: Instant) -> Result<()> {
        self.terminal.draw(|f| render(f, app, now))?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::error!("Failed to leave raw mode: {}", e);
        }
        let _ = stdout().execute(DisableMouseCapture);
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn key_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn title_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Cuts `text` to at most `width` terminal columns, ending in an ellipsis
/// when anything was dropped.
fn truncate(text: &str, width: usize) -> String {
    let full: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if full <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// One control hint for the footer, greyed out when unavailable.
fn control(key: &str, label: &str, enabled: bool) -> Vec<Span<'static>> {
    let (k, l) = if enabled {
        (key_style(), Style::default())
    } else {
        (dim(), dim())
    };
    vec![
        Span::styled(key.to_string(), k),
        Span::styled(format!(" {}  ", label), l),
    ]
}

pub fn render(f: &mut Frame, app: &App, now: Instant) {
    match &app.screen {
        Screen::Loading => render_loading(f),
        Screen::Login(_) => render_login(f, app),
        Screen::Diary if !app.book_open => render_cover(f, app),
        Screen::Diary => render_spread(f, app, now),
    }

    if let Some(target) = app.deletion.pending() {
        render_confirm(f, target);
    }
    if app.gate.is_prompting() {
        render_password_prompt(f, app);
    }
    if let Mode::ImagePath { input, .. } = &app.mode {
        let area = centered_rect(60, 5, f.area());
        f.render_widget(Clear, area);
        let prompt = Paragraph::new(vec![
            Line::from(input.display(app.cursor_visible)),
            Line::from(Span::styled("Enter to upload, Esc to cancel", dim())),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Image file")
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(prompt, area);
    }
    render_toast(f, app);
}

fn render_loading(f: &mut Frame) {
    let area = centered_rect(40, 3, f.area());
    let text = Paragraph::new("Loading your diary...")
        .style(title_style())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(text, area);
}

fn render_login(f: &mut Frame, app: &App) {
    let Screen::Login(form) = &app.screen else {
        return;
    };
    let area = centered_rect(50, 12, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Memorable Moments")
        .title_style(title_style());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    let field = |label: &'static str, text: String, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(label)
                .border_style(style),
        )
    };
    let on_email = form.field == LoginField::Email;
    f.render_widget(
        field(
            "Email",
            form.email.display(on_email && app.cursor_visible),
            on_email,
        ),
        rows[0],
    );
    f.render_widget(
        field(
            "Password",
            form.password.display(!on_email && app.cursor_visible),
            !on_email,
        ),
        rows[1],
    );

    let hint = if form.busy {
        Line::from(Span::styled("Signing in...", dim()))
    } else {
        Line::from(vec![
            Span::styled("Tab", key_style()),
            Span::raw(" switch field  "),
            Span::styled("Enter", key_style()),
            Span::raw(" sign in  "),
            Span::styled("Esc", key_style()),
            Span::raw(" quit"),
        ])
    };
    f.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center),
        rows[2],
    );
}

fn render_cover(f: &mut Frame, app: &App) {
    let area = centered_rect(46, 14, f.area());
    let owner = app.user.as_ref().map(|u| u.email.as_str()).unwrap_or("");
    let cover = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("Memorable Moments", title_style())),
        Line::from(""),
        Line::from(Span::styled(
            "Your personal diary, unlocked.",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
        Line::from(Span::styled(owner.to_string(), dim())),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("Enter", key_style()),
            Span::raw(" to open"),
        ]),
        Line::from(vec![
            Span::styled("o", key_style()),
            Span::raw(" sign out  "),
            Span::styled("q", key_style()),
            Span::raw(" quit"),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(cover, area);
}

fn render_spread(f: &mut Frame, app: &App, now: Instant) {
    let layout = &app.layout;

    let total = app.pages.entries().len();
    let first = app.pages.current_index();
    let shown = app
        .pages
        .visible_pages()
        .iter()
        .filter(|p| p.is_some())
        .count();
    let position = match shown {
        0 => "no pages".to_string(),
        1 => format!("page {} of {}", first + 1, total),
        n => format!("pages {}-{} of {}", first + 1, first + n, total),
    };
    let status = if app.saving > 0 {
        Span::styled("  Saving...", dim())
    } else if app.is_saved_notice_visible() {
        Span::styled("  Saved!", Style::default().fg(Color::Green))
    } else {
        Span::raw("")
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("Memorable Moments", title_style()),
        Span::styled(format!("  {}", position), dim()),
        status,
    ]))
    .alignment(Alignment::Center);
    f.render_widget(header, layout.header);

    let visible = app.pages.visible_pages();
    for (slot, page) in visible.iter().enumerate() {
        render_page(f, app, slot, *page);
    }

    if let Some(progress) = app.pages.flip_progress(now) {
        render_flip(f, app, progress);
    }

    render_controls(f, app, layout.footer);
}

fn render_page(f: &mut Frame, app: &App, slot: usize, entry: Option<&DiaryEntry>) {
    let (Some(outer), Some(inner)) = (app.layout.pages.get(slot), app.layout.page_inner(slot))
    else {
        return;
    };
    let focused = slot == app.focus;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let Some(entry) = entry else {
        let text = if app.pages.entries().is_empty() && slot == 0 {
            "Your diary is empty. Press n to start a new page."
        } else {
            ""
        };
        let blank = Paragraph::new(Span::styled(text, dim()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(border));
        f.render_widget(blank, *outer);
        return;
    };

    let title = match &app.mode {
        Mode::EditTitle { entry: id, input } if *id == entry.id => {
            input.display(app.cursor_visible)
        }
        _ => entry.title.clone(),
    };
    let mut block_title = truncate(&title, inner.width.saturating_sub(2) as usize);
    if app.state.has_local_changes(&entry.id) {
        block_title.push_str(" *");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(block_title, title_style()));
    f.render_widget(block, *outer);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled(
            entry.timestamp.format("%A, %B %-d, %Y").to_string(),
            dim(),
        )),
        rows[0],
    );

    let content = match &app.mode {
        Mode::EditContent { entry: id, input } if *id == entry.id => {
            input.display(app.cursor_visible)
        }
        _ => entry.content.clone(),
    };
    f.render_widget(
        Paragraph::new(content).wrap(Wrap { trim: false }),
        rows[1],
    );

    let tags: Vec<Span> = entry
        .tags
        .iter()
        .map(|t| Span::styled(format!("#{} ", t), Style::default().fg(Color::Green)))
        .collect();
    f.render_widget(Paragraph::new(Line::from(tags)), rows[2]);

    if focused {
        let line = if app.suggestions.is_loading() {
            Line::from(Span::styled("Thinking of tags...", dim()))
        } else {
            let spans: Vec<Span> = app
                .suggestions
                .for_entry(&entry.id)
                .iter()
                .take(9)
                .enumerate()
                .flat_map(|(i, tag)| {
                    [
                        Span::styled(format!("{}", i + 1), key_style()),
                        Span::styled(format!(" +{}  ", tag), Style::default().fg(Color::Blue)),
                    ]
                })
                .collect();
            Line::from(spans)
        };
        f.render_widget(Paragraph::new(line), rows[3]);
    }

    for image in &entry.images {
        render_image(f, app, inner, image);
    }
}

fn render_image(f: &mut Frame, app: &App, page: Rect, image: &DiaryImage) {
    let cells = app.scale.image_cells(page, image);
    let Some(area) = cells.clip(page) else {
        return;
    };
    let active = app.placement.active_image() == Some(image.id);
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Magenta)
    };
    let name = image.src.rsplit('/').next().unwrap_or(&image.src);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(Span::styled(
            truncate(name, area.width.saturating_sub(2) as usize),
            dim(),
        ))
        .block(Block::default().borders(Borders::ALL).border_style(style)),
        area,
    );

    let handle = |f: &mut Frame, column: i32, row: i32, glyph: &'static str| {
        let inside = column >= area.x as i32
            && column < (area.x + area.width) as i32
            && row >= area.y as i32
            && row < (area.y + area.height) as i32;
        if inside {
            f.render_widget(
                Paragraph::new(Span::styled(glyph, style.add_modifier(Modifier::BOLD))),
                Rect::new(column as u16, row as u16, 1, 1),
            );
        }
    };
    handle(f, cells.right - 1, cells.top, "x");
    handle(f, cells.right - 1, cells.bottom - 1, "◢");
}

/// The turning page: a sheet edge sweeping across the spread.
fn render_flip(f: &mut Frame, app: &App, progress: f64) {
    let (Some(first), Some(last)) = (app.layout.pages.first(), app.layout.pages.last()) else {
        return;
    };
    let left = first.x;
    let width = (last.x + last.width).saturating_sub(left);
    if width == 0 {
        return;
    }
    let travelled = (progress.clamp(0.0, 1.0) * (width - 1) as f64) as u16;
    let column = match app.pages.flip_direction() {
        FlipDirection::Forward => left + width - 1 - travelled,
        FlipDirection::Backward => left + travelled,
    };
    let edge: Vec<Line> = (0..first.height).map(|_| Line::from("┃")).collect();
    f.render_widget(
        Paragraph::new(edge).style(Style::default().fg(Color::White)),
        Rect::new(column, first.y, 1, first.height),
    );
}

fn render_controls(f: &mut Frame, app: &App, area: Rect) {
    let has_page = app.focused_entry().is_some();
    let mut spans = Vec::new();
    match &app.mode {
        Mode::EditTitle { .. } | Mode::EditContent { .. } => {
            spans.extend(control("Esc", "done", true));
        }
        _ if !app.placement.is_idle() => {
            let label = match app.placement.gesture() {
                Gesture::Resizing { .. } => "release to set the size",
                _ => "release to place the image",
            };
            spans.extend(control("mouse", label, true));
        }
        _ => {
            spans.extend(control("←", "back", app.pages.can_flip_back()));
            spans.extend(control("→", "forward", app.pages.can_flip_forward()));
            spans.extend(control("n", "new page", true));
            spans.extend(control("Tab", "page", app.pages.stride().get() > 1));
            spans.extend(control("t/c", "edit", has_page));
            spans.extend(control("s", "save", has_page));
            spans.extend(control("i", "image", has_page));
            spans.extend(control(
                "g",
                "suggest tags",
                has_page && !app.suggestions.is_loading(),
            ));
            spans.extend(control("d", "tear out", has_page));
            spans.extend(control("x", "close", true));
            spans.extend(control("q", "quit", true));
        }
    }
    let controls = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(controls, area);
}

fn render_confirm(f: &mut Frame, target: &DeleteTarget) {
    let area = centered_rect(56, 9, f.area());
    f.render_widget(Clear, area);
    let body = match target {
        DeleteTarget::Entry(_) => {
            "This action cannot be undone. This will permanently tear the page from your diary."
        }
        DeleteTarget::Image { .. } => {
            "This action cannot be undone. The image will be removed from this page."
        }
    };
    let modal = Paragraph::new(vec![
        Line::from(body),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", key_style()),
            Span::styled(" Yes, delete it  ", Style::default().fg(Color::Red)),
            Span::styled("n", key_style()),
            Span::raw(" Cancel"),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Are you sure?")
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(modal, area);
}

fn render_password_prompt(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 7, f.area());
    f.render_widget(Clear, area);
    let modal = Paragraph::new(vec![
        Line::from("This action requires a password to proceed."),
        Line::from(""),
        Line::from(app.password_input.display(app.cursor_visible)),
        Line::from(Span::styled("Enter to confirm, Esc to cancel", dim())),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Enter Password")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(modal, area);
}

fn render_toast(f: &mut Frame, app: &App) {
    let Some(toast) = app.toasts.latest() else {
        return;
    };
    let screen = f.area();
    let width = 44.min(screen.width);
    let area = Rect::new(screen.x + screen.width - width, screen.y, width, 4.min(screen.height));
    let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Info => Color::Blue,
        ToastKind::Error => Color::Red,
    };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(toast.message.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(toast.title.as_str())
                    .border_style(Style::default().fg(color)),
            ),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_wide_characters() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "he…");
        assert_eq!(truncate("日本語", 4), "日…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn centered_rect_fits_small_screens() {
        let area = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_rect(50, 9, area), area);
        assert_eq!(centered_rect(10, 3, area), Rect::new(5, 1, 10, 3));
    }
}
