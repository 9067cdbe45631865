//! Help popup widget

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Help popup that shows keyboard shortcuts
pub struct HelpPopup;

impl HelpPopup {
    pub fn draw(frame: &mut Frame, area: Rect, supports_pause: bool) {
        // Centered, 60% width, 60% height
        let popup_width = (area.width as f32 * 0.6) as u16;
        let popup_height = (area.height as f32 * 0.6) as u16;

        let popup_area = Rect {
            x: (area.width - popup_width) / 2,
            y: (area.height - popup_height) / 2,
            width: popup_width,
            height: popup_height,
        };

        frame.render_widget(Clear, popup_area);

        let mut lines = vec![
            Line::from(Span::styled(
                "Shortcuts",
                Style::default().fg(Color::Cyan).bold(),
            )),
            Line::from(""),
        ];
        for (key, action) in shortcuts(supports_pause) {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<8}", key), Style::default().fg(Color::Yellow)),
                Span::raw(action),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )));

        let help = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .style(Style::default().bg(Color::Black)),
        );

        frame.render_widget(help, popup_area);
    }
}

fn shortcuts(supports_pause: bool) -> Vec<(&'static str, &'static str)> {
    let mut keys = vec![("s", "Start recording")];
    if supports_pause {
        keys.push(("p", "Pause or resume"));
    } else {
        keys.push(("p", "Pause (not supported on this platform)"));
    }
    keys.extend([("x", "Stop and save"), ("?", "Show this help"), ("q", "Quit")]);
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_dashboard_key() {
        let keys: Vec<&str> = shortcuts(true).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["s", "p", "x", "?", "q"]);
    }
}
