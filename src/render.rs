//! Turns a comparison result into cards for the terminal and into HTML
//!
//! Analyses are shown either as plain text (each newline starts a new line)
//! or parsed as markdown with pulldown-cmark.

use clap::ValueEnum;
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use serde::{Deserialize, Serialize};

use crate::model::ComparisonResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Plain,
    Markdown,
}

impl RenderMode {
    pub fn toggle(self) -> Self {
        match self {
            RenderMode::Plain => RenderMode::Markdown,
            RenderMode::Markdown => RenderMode::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Plain => "plain",
            RenderMode::Markdown => "markdown",
        }
    }
}

/// Language of the comparison heading and card titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Sv,
}

impl Language {
    pub fn heading(&self) -> &'static str {
        match self {
            Language::En => "Comparison of responses",
            Language::Sv => "Jämförelse av svaren",
        }
    }

    pub fn card_title(&self, model: &str) -> String {
        match self {
            Language::En => format!("{}'s Analysis", model),
            Language::Sv => format!("{}s analys", model),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Card {
    pub title: String,
    pub body: Vec<Line<'static>>,
}

#[derive(Debug, Clone)]
pub struct ComparisonView {
    pub heading: String,
    pub cards: Vec<Card>,
}

impl ComparisonView {
    /// Rows needed to show every card stacked: title line, body, spacer
    /// Saturates at `u16::MAX`. Lines are counted unwrapped.
    pub fn total_height(&self) -> u16 {
        let rows: usize = self
            .cards
            .iter()
            .map(|card| card.body.len().saturating_add(2))
            .fold(0, usize::saturating_add);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }
}

pub fn render_comparison(result: &ComparisonResult, mode: RenderMode, language: Language) -> ComparisonView {
    let cards = result
        .entries
        .iter()
        .map(|entry| Card {
            title: language.card_title(&entry.model),
            body: match mode {
                RenderMode::Plain => plain_lines(&entry.text),
                RenderMode::Markdown => markdown_lines(&entry.text),
            },
        })
        .collect();

    ComparisonView {
        heading: language.heading().to_string(),
        cards,
    }
}

/// One line per `\n`; empty lines are kept
pub fn plain_lines(text: &str) -> Vec<Line<'static>> {
    text.split('\n')
        .map(|line| Line::raw(line.trim_end_matches('\r').to_string()))
        .collect()
}

fn markdown_options() -> Options {
    Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl LineBuilder {
    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        self.spans.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style.fg(Color::Cyan),
        _ => style,
    }
}

pub fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let mut out = LineBuilder::default();

    for event in Parser::new_ext(text, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                out.blank();
                out.styles.push(heading_style(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                out.styles.pop();
                out.blank();
            }
            Event::End(TagEnd::Paragraph) => out.blank(),
            Event::Start(Tag::Emphasis) => out.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Event::Start(Tag::Strong) => out.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Strikethrough) => {
                out.styles.push(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Event::Start(Tag::Link { .. }) => out
                .styles
                .push(Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link) => {
                out.styles.pop();
            }
            Event::Start(Tag::List(start)) => {
                out.flush();
                out.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                out.lists.pop();
                if out.lists.is_empty() {
                    out.blank();
                }
            }
            Event::Start(Tag::Item) => {
                out.flush();
                let depth = out.lists.len().saturating_sub(1);
                let marker = match out.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                out.spans.push(Span::raw(format!("{}{}", "  ".repeat(depth), marker)));
            }
            Event::End(TagEnd::Item) => out.flush(),
            Event::Start(Tag::CodeBlock(_)) => {
                out.blank();
                out.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                out.in_code_block = false;
                out.blank();
            }
            Event::Text(text) if out.in_code_block => {
                let style = Style::default().fg(Color::Yellow);
                for line in text.lines() {
                    out.spans.push(Span::styled(format!("  {}", line), style));
                    out.flush();
                }
            }
            Event::Text(text) => out.push_text(&text),
            Event::Code(code) => out
                .spans
                .push(Span::styled(code.to_string(), Style::default().fg(Color::Yellow))),
            Event::Html(raw) | Event::InlineHtml(raw) => out.push_text(&raw),
            Event::SoftBreak | Event::HardBreak => out.flush(),
            Event::Rule => {
                out.flush();
                out.lines.push(Line::styled("────────", Style::default().fg(Color::DarkGray)));
                out.blank();
            }
            Event::TaskListMarker(done) => out.push_text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    out.finish()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn analysis_html(text: &str, mode: RenderMode) -> String {
    match mode {
        RenderMode::Plain => escape_html(text).replace('\n', "<br>"),
        RenderMode::Markdown => {
            let mut out = String::new();
            html::push_html(&mut out, Parser::new_ext(text, markdown_options()));
            out
        }
    }
}

/// The comparison section: a heading plus one card per analysis
pub fn comparison_html(result: &ComparisonResult, mode: RenderMode, language: Language) -> String {
    let mut out = format!(
        "<h2>{}</h2>\n<div class=\"responses-grid\">\n",
        escape_html(language.heading())
    );

    for entry in &result.entries {
        out.push_str(&format!(
            concat!(
                "  <div class=\"response-card\">\n",
                "    <div class=\"card-header\"><span class=\"model-name\">{}</span></div>\n",
                "    <div class=\"card-content\"><div class=\"response-text\">{}</div></div>\n",
                "  </div>\n",
            ),
            escape_html(&language.card_title(&entry.model)),
            analysis_html(&entry.text, mode),
        ));
    }

    out.push_str("</div>\n");
    out
}

pub fn comparison_document(result: &ComparisonResult, mode: RenderMode, language: Language) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(language.heading()),
        comparison_html(result, mode, language)
    )
}
