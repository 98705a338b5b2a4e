//! TUI rendering with ratatui
//!
//! Layout: status bar, device table, aggregate traffic sparkline, help bar.

use common::format::{format_bits_per_second, format_duration};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
};

use super::app::{App, DeviceRow};

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(8),    // Device table
            Constraint::Length(6), // Traffic sparkline
            Constraint::Length(3), // Help bar
        ])
        .split(frame.area());

    render_status_bar(frame, app, chunks[0]);
    render_device_table(frame, app, chunks[1]);
    render_traffic_graph(frame, app, chunks[2]);
    render_help_bar(frame, chunks[3]);
}

/// Render the status bar (top panel)
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = vec![
        Span::styled("Window: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}s", app.window_secs()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  |  "),
        Span::styled("Devices: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", app.rows().len()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  |  "),
        Span::styled("Uptime: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format_duration(app.uptime()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  |  "),
        Span::styled(app.notice().to_string(), Style::default().fg(Color::DarkGray)),
    ];

    let status = Paragraph::new(Line::from(status_text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" usbflow ")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(status, area);
}

/// Render the device table (center panel)
fn render_device_table(frame: &mut Frame, app: &App, area: Rect) {
    let header_cells = ["Location", "Device", "In", "Out", "Peak"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app.rows().iter().map(create_device_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(18), // Location
            Constraint::Min(24),    // Device
            Constraint::Length(12), // In
            Constraint::Length(12), // Out
            Constraint::Length(12), // Peak
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" USB Devices ({}) ", app.rows().len()))
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(table, area);
}

/// Create a table row for a device
fn create_device_row(row: &DeviceRow) -> Row<'static> {
    Row::new(vec![
        Cell::from(row.port_label.clone()).style(Style::default().fg(Color::Cyan)),
        Cell::from(row.name.clone()),
        Cell::from(format_bits_per_second(row.speed_in)),
        Cell::from(format_bits_per_second(row.speed_out)),
        Cell::from(format_bits_per_second(row.peak)).style(Style::default().fg(Color::DarkGray)),
    ])
}

/// Render the aggregate traffic sparkline (lower panel)
fn render_traffic_graph(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.history().last().copied().unwrap_or(0);

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " Traffic ({}) ",
                    format_bits_per_second(current as f64)
                ))
                .border_style(Style::default().fg(Color::Blue)),
        )
        .data(app.history())
        .style(Style::default().fg(Color::Cyan));

    frame.render_widget(sparkline, area);
}

/// Render the help bar (bottom panel)
fn render_help_bar(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit  "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(" clear  "),
        Span::styled("+/-", Style::default().fg(Color::Yellow)),
        Span::raw(" window"),
    ];

    let help = Paragraph::new(Line::from(help_text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(help, area);
}
