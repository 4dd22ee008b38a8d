//! The signup form pane.

use aftertrials_core::waitlist::Step;
use ratatui::{
  Frame,
  layout::{Constraint, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;

const WIDTH: u16 = 56;
const HEIGHT: u16 = 12;

/// Render the current step centred in `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let [column] = Layout::horizontal([Constraint::Length(WIDTH)])
    .flex(Flex::Center)
    .areas(area);
  let [card] = Layout::vertical([Constraint::Length(HEIGHT)])
    .flex(Flex::Center)
    .areas(column);

  let block = Block::default()
    .title(" Join the waitlist ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(card);
  f.render_widget(block, card);

  let lines = match app.form.step() {
    Step::Name => field("What's your name?", app.form.name()),
    Step::Role => roles(app),
    Step::Email => field("Where can we reach you?", app.form.email()),
    Step::Loading => vec![dim("Adding you to the list…")],
    Step::Success => vec![
      Line::from(Span::styled(
        "You're on the list.",
        Style::default()
          .fg(Color::Green)
          .add_modifier(Modifier::BOLD),
      )),
      Line::from(""),
      dim("Check your inbox for a sign-in link to confirm your email."),
    ],
    Step::Error => vec![
      Line::from(Span::styled(
        app.form.error_message().to_owned(),
        Style::default().fg(Color::Red),
      )),
    ],
  };

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn field<'a>(prompt: &'a str, value: &'a str) -> Vec<Line<'a>> {
  vec![
    Line::from(Span::styled(prompt, Style::default().add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(vec![
      Span::styled("> ", Style::default().fg(Color::Cyan)),
      Span::raw(value),
      Span::styled("_", Style::default().fg(Color::DarkGray)),
    ]),
  ]
}

fn roles(app: &App) -> Vec<Line<'static>> {
  let mut lines = vec![
    Line::from(Span::styled(
      "Which best describes you?",
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
  ];

  for (i, role) in App::roles().into_iter().enumerate() {
    let chosen = app.form.role() == Some(role);
    let marker = if chosen { "●" } else { "○" };
    let style = if chosen {
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
    } else if i == app.role_cursor {
      Style::default().add_modifier(Modifier::REVERSED)
    } else {
      Style::default()
    };
    lines.push(Line::from(Span::styled(format!(" {marker} {}. {role}", i + 1), style)));
  }
  lines
}

fn dim(text: &str) -> Line<'_> { Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))) }
