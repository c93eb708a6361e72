use learning_grid_core::{GridPosition, Resource, ResourceCategory, polyline::Rgba};
use ratatui::{prelude::*, widgets::*};

use crate::{App, InputMode};

/// Renders the user interface.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Map and side panel
            Constraint::Length(3), // Status / input
            Constraint::Length(2), // Help
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[0]);

    render_map(frame, body[0], app);
    render_panel(frame, body[1], app);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new(
        "arrows: cursor  enter: study/move  s: simulation  r: summary  p: next route  n: reflect  q: quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn category_glyph(category: ResourceCategory) -> (&'static str, Color) {
    match category {
        ResourceCategory::Book => ("B", Color::Cyan),
        ResourceCategory::Video => ("V", Color::Magenta),
        ResourceCategory::Quiz => ("Q", Color::Yellow),
        ResourceCategory::Assignment => ("A", Color::Green),
    }
}

fn to_color(rgba: Rgba) -> Color {
    Color::Rgb(rgba.r, rgba.g, rgba.b)
}

fn resource_span(resource: &Resource) -> Span<'static> {
    let (glyph, color) = category_glyph(resource.category);
    if resource.visited {
        Span::styled(glyph, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(glyph, Style::default().fg(color).bold())
    }
}

/// Renders the grid, resources, agent and active routes.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    let bounds = session.config().bounds();
    let agent_pos = session.agent().position();

    let mut lines: Vec<Line> = Vec::with_capacity(bounds.height);
    for y in 0..bounds.height {
        let mut spans: Vec<Span> = Vec::with_capacity(bounds.width * 2);
        for x in 0..bounds.width {
            let pos = GridPosition { x, y };

            let mut cell = if pos == agent_pos {
                Span::styled("@", Style::default().fg(Color::Red).bold())
            } else if let Some(resource) = session.resource_at(pos) {
                resource_span(resource)
            } else {
                Span::styled("·", Style::default().fg(Color::DarkGray))
            };

            if let Some(route) = session.routes().active_at(pos) {
                cell = cell.bg(to_color(route.color));
            }
            if pos == app.cursor {
                cell = cell.add_modifier(Modifier::REVERSED);
            }

            spans.push(cell);
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Learning Grid").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(map_paragraph, area);
}

/// Renders agent progress, the latest summary and the route list.
fn render_panel(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    let agent = session.agent();
    let summary = session.summary();

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Level ", Style::default().bold()),
            Span::raw(agent.level().to_string()),
            Span::styled("  Reward ", Style::default().bold()),
            Span::raw(agent.total_reward().to_string()),
            Span::styled("  At ", Style::default().bold()),
            Span::raw(agent.position().to_string()),
        ]),
        Line::from(match session.recommended_target() {
            Some(target) => format!("Next: {} {}", target.title, target.position),
            None => "Next: nothing left to study".to_string(),
        }),
    ];

    if let Some(resource) = session.resource_at(app.cursor) {
        lines.push(Line::from(format!(
            "Cursor: {} (difficulty {}, reward {})",
            resource.title, resource.difficulty, resource.reward
        )));
        if !resource.subtopics.is_empty() {
            lines.push(Line::from(format!("  {}", resource.subtopics.join(", "))));
        }
    }
    if session.routes().covers(app.cursor) {
        lines.push(Line::from(format!("Cursor {} lies on the shown route", app.cursor)));
    }

    lines.push(Line::default());
    let heading = if session.summary_pending() {
        "Summary (updating...)"
    } else {
        "Summary"
    };
    lines.push(Line::styled(heading, Style::default().bold()));
    lines.push(Line::from(format!(
        "Visited {}/{}  Level {}",
        summary.visited_resources, summary.total_resources, summary.current_level
    )));
    lines.extend(summary.strengths.iter().map(|s| Line::from(format!("+ {s}"))));
    lines.extend(
        summary
            .recommendations
            .iter()
            .map(|s| Line::from(format!("> {s}"))),
    );
    if let Some(next) = summary.next_optimal_resource {
        lines.push(Line::from(format!("Suggested cell: {next}")));
    }

    lines.push(Line::default());
    lines.push(Line::styled("Routes", Style::default().bold()));
    if session.routes().is_empty() {
        lines.push(Line::from("none yet"));
    }
    for route in session.routes().iter() {
        let marker = if route.is_active { "*" } else { " " };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker} ")),
            Span::styled("■", Style::default().fg(to_color(route.color))),
            Span::raw(format!(
                " {} ({:.0}%, {} cells)",
                route.name,
                route.confidence * 100.0,
                route.path.len()
            )),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::styled("Learning path", Style::default().bold()));
    for (i, title) in session.learning_path().iter().enumerate() {
        lines.push(Line::from(format!("{}. {title}", i + 1)));
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Progress").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let (title, text) = match &app.input {
        InputMode::Normal => {
            let mode = if app.simulation_running {
                "Status (simulating)"
            } else {
                "Status"
            };
            (mode, app.status.clone())
        }
        InputMode::Summary(summary) => ("What did you learn? (enter to continue)", summary.clone()),
        InputMode::Reflection { text, .. } => ("Reflection (enter to submit)", text.clone()),
    };
    let widget = Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, area);
}
