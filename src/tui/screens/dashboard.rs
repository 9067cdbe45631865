//! Dashboard screen - session status, storage, and recent recordings

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::recorder::{RecordingStatus, SessionStatus};
use crate::storage::{RecordingFile, StorageSnapshot};

/// Dashboard screen state
#[derive(Default)]
pub struct DashboardScreen {
    recordings: Vec<RecordingFile>,
    message: Option<String>,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_recordings(&mut self, recordings: Vec<RecordingFile>) {
        self.recordings = recordings;
    }

    /// Replace the message bar text; empty text clears it
    pub fn set_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.message = (!message.is_empty()).then_some(message);
    }

    pub fn draw(
        &self,
        frame: &mut Frame,
        area: Rect,
        status: &SessionStatus,
        storage: &StorageSnapshot,
        daemon_online: bool,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(7), // Session
                Constraint::Length(4), // Storage
                Constraint::Min(3),    // Recordings
                Constraint::Length(1), // Message
                Constraint::Length(1), // Key bar
            ])
            .split(area);

        let title = Paragraph::new("AudioTracer")
            .style(Style::default().fg(Color::Cyan).bold())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, chunks[0]);

        frame.render_widget(session_panel(status, daemon_online), chunks[1]);
        frame.render_widget(storage_panel(storage), chunks[2]);
        frame.render_widget(self.recordings_panel(), chunks[3]);

        if let Some(message) = &self.message {
            let line = Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow));
            frame.render_widget(line, chunks[4]);
        }

        let keys = Paragraph::new(Line::from(vec![
            key_span(" [s] "),
            Span::raw(" Start  "),
            key_span(" [p] "),
            Span::raw(" Pause/Resume  "),
            key_span(" [x] "),
            Span::raw(" Stop  "),
            key_span(" [?] "),
            Span::raw(" Help  "),
            key_span(" [q] "),
            Span::raw(" Quit"),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(keys, chunks[5]);
    }

    fn recordings_panel(&self) -> List<'_> {
        let items: Vec<ListItem> = if self.recordings.is_empty() {
            vec![ListItem::new(Span::styled(
                "No recordings yet",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.recordings
                .iter()
                .map(|r| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:<18}", r.file_name()),
                            Style::default().fg(Color::White),
                        ),
                        Span::styled(
                            format!("{:>12} bytes  ", r.size_bytes),
                            Style::default().fg(Color::Gray),
                        ),
                        Span::styled(
                            r.modified.format("%Y-%m-%d %H:%M").to_string(),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]))
                })
                .collect()
        };

        List::new(items).block(
            Block::default()
                .title(" Recordings ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
    }
}

fn session_panel(status: &SessionStatus, daemon_online: bool) -> Paragraph<'static> {
    let state = match status.status {
        RecordingStatus::Stopped => Span::styled("Stopped", Style::default().fg(Color::Gray)),
        RecordingStatus::Recording => {
            Span::styled("● Recording", Style::default().fg(Color::Red).bold())
        }
        RecordingStatus::Paused => {
            Span::styled("‖ Paused", Style::default().fg(Color::Yellow).bold())
        }
    };

    let file = status
        .file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(vec![Span::raw("Status:  "), state]),
        Line::from(vec![
            Span::raw("Elapsed: "),
            Span::styled(status.elapsed.clone(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("File:    "),
            Span::styled(file, Style::default().fg(Color::White)),
        ]),
    ];

    if !daemon_online {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Daemon offline; status guessed from disk",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Paragraph::new(lines).block(
        Block::default()
            .title(" Session ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    )
}

fn storage_panel(storage: &StorageSnapshot) -> Paragraph<'static> {
    let lines = vec![
        Line::from(vec![
            Span::raw("Free:      "),
            Span::styled(
                format!("{} bytes", storage.formatted_bytes()),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::raw("Time left: "),
            Span::styled(
                storage.time_remaining.clone(),
                Style::default().fg(Color::Green),
            ),
        ]),
    ];

    Paragraph::new(lines).block(
        Block::default()
            .title(" Storage ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
}

fn key_span(key: &'static str) -> Span<'static> {
    Span::styled(key, Style::default().fg(Color::Black).bg(Color::Cyan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_clears_the_bar() {
        let mut screen = DashboardScreen::new();
        screen.set_message("Recording (00:01)");
        assert_eq!(screen.message.as_deref(), Some("Recording (00:01)"));

        screen.set_message("");
        assert!(screen.message.is_none());
    }
}
