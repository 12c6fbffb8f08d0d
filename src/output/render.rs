//! Markdown to styled terminal text.
//!
//! Prose is word-wrapped at a fixed width. Code blocks and tables are
//! written as-is so they stay copyable.

use crossterm::style::{Attribute, Color, ContentStyle};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::borrow::Cow;
use std::fmt::{self, Write};
use textwrap::core::display_width;
use thiserror::Error;

/// Column at which prose is wrapped.
pub const WRAP_WIDTH: usize = 100;

/// Errors from rendering. Callers fall back to raw text on any of these.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("word wrap width must be greater than zero")]
    InvalidWidth,
    #[error("failed to format rendered output")]
    Format(#[from] fmt::Error),
}

/// Turns markdown into text ready for the terminal.
pub trait Render {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

/// Colors for a dark terminal background.
#[derive(Debug, Clone)]
struct Theme {
    heading: Color,
    code: Color,
    code_block: Color,
    link: Color,
    quote: Color,
    marker: Color,
}

impl Theme {
    fn dark() -> Self {
        Self {
            heading: Color::Cyan,
            code: Color::Yellow,
            code_block: Color::Green,
            link: Color::Blue,
            quote: Color::DarkGrey,
            marker: Color::Magenta,
        }
    }
}

/// [`Render`] implementation for CommonMark with GitHub tables,
/// strikethrough, and task lists.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    width: usize,
    theme: Theme,
}

impl MarkdownRenderer {
    /// Create a renderer wrapping at `width` columns, dark theme, emoji on.
    pub fn new(width: usize) -> Result<Self, RenderError> {
        if width == 0 {
            return Err(RenderError::InvalidWidth);
        }
        Ok(Self {
            width,
            theme: Theme::dark(),
        })
    }
}

impl Render for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut writer = Writer::new(self);
        for event in Parser::new_ext(markdown, options) {
            writer.event(event)?;
        }
        Ok(writer.finish()?)
    }
}

/// One level of indentation: what to print and how wide it is.
struct Prefix {
    styled: String,
    width: usize,
}

#[derive(Default)]
struct Inline {
    strong: usize,
    emphasis: usize,
    strike: usize,
    heading: bool,
    quote: usize,
}

struct Link {
    dest: String,
    text: String,
}

#[derive(Default)]
struct Table {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    header_rows: usize,
}

/// Rendering state for one document.
struct Writer<'a> {
    renderer: &'a MarkdownRenderer,
    out: String,
    line: String,
    col: usize,
    line_started: bool,
    pending_space: bool,
    needs_gap: bool,
    prefixes: Vec<Prefix>,
    marker: Option<Prefix>,
    lists: Vec<Option<u64>>,
    inline: Inline,
    links: Vec<Link>,
    code_block: bool,
    table: Option<Table>,
}

impl<'a> Writer<'a> {
    fn new(renderer: &'a MarkdownRenderer) -> Self {
        Self {
            renderer,
            out: String::new(),
            line: String::new(),
            col: 0,
            line_started: false,
            pending_space: false,
            needs_gap: false,
            prefixes: Vec::new(),
            marker: None,
            lists: Vec::new(),
            inline: Inline::default(),
            links: Vec::new(),
            code_block: false,
            table: None,
        }
    }

    fn theme(&self) -> &Theme {
        &self.renderer.theme
    }

    fn event(&mut self, event: Event<'_>) -> fmt::Result {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => {
                self.pending_space = true;
                Ok(())
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.begin_block()?;
                let rule = "─".repeat(self.renderer.width.min(40));
                let style = self.fg(self.theme().quote);
                self.raw(&rule, style)?;
                self.end_block()
            }
            Event::TaskListMarker(checked) => {
                let mark = if checked { "[x]" } else { "[ ]" };
                let style = self.fg(self.theme().marker);
                self.word(mark, style)
            }
            Event::FootnoteReference(label) => self.text(&format!("[^{label}]")),
            _ => Ok(()),
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> fmt::Result {
        match tag {
            Tag::Paragraph => self.begin_block(),
            Tag::Heading { level, .. } => {
                self.begin_block()?;
                self.inline.heading = true;
                let hashes = "#".repeat(level as usize);
                let style = self.current_style();
                self.word(&hashes, style)?;
                self.pending_space = true;
                Ok(())
            }
            Tag::BlockQuote { .. } => {
                self.begin_block()?;
                let styled = self.fg(self.theme().quote).apply("│ ").to_string();
                self.prefixes.push(Prefix { styled, width: 2 });
                self.inline.quote += 1;
                Ok(())
            }
            Tag::CodeBlock(kind) => {
                self.begin_block()?;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let style = self.fg(self.theme().quote);
                        self.raw(&format!("  {lang}"), style)?;
                        self.flush_line()?;
                    }
                }
                self.code_block = true;
                Ok(())
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.begin_block()?;
                } else {
                    self.flush_line()?;
                }
                self.lists.push(start);
                Ok(())
            }
            Tag::Item => {
                self.flush_line()?;
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let width = marker.chars().count();
                let styled = self.fg(self.theme().marker).apply(&marker).to_string();
                self.prefixes.push(Prefix {
                    styled: " ".repeat(width),
                    width,
                });
                self.marker = Some(Prefix { styled, width });
                Ok(())
            }
            Tag::Emphasis => {
                self.inline.emphasis += 1;
                Ok(())
            }
            Tag::Strong => {
                self.inline.strong += 1;
                Ok(())
            }
            Tag::Strikethrough => {
                self.inline.strike += 1;
                Ok(())
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push(Link {
                    dest: dest_url.to_string(),
                    text: String::new(),
                });
                Ok(())
            }
            Tag::Table(_) => {
                self.begin_block()?;
                self.table = Some(Table::default());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn end(&mut self, tag: TagEnd) -> fmt::Result {
        match tag {
            TagEnd::Paragraph => self.end_block(),
            TagEnd::Heading { .. } => {
                self.inline.heading = false;
                self.end_block()
            }
            TagEnd::BlockQuote { .. } => {
                self.flush_line()?;
                self.prefixes.pop();
                self.inline.quote = self.inline.quote.saturating_sub(1);
                self.needs_gap = true;
                Ok(())
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.end_block()
            }
            TagEnd::List { .. } => {
                self.flush_line()?;
                self.lists.pop();
                if self.lists.is_empty() {
                    self.needs_gap = true;
                }
                Ok(())
            }
            TagEnd::Item => {
                self.flush_line()?;
                self.prefixes.pop();
                self.marker = None;
                // Gaps inside a list come from loose items only.
                self.needs_gap = false;
                Ok(())
            }
            TagEnd::Emphasis => {
                self.inline.emphasis = self.inline.emphasis.saturating_sub(1);
                Ok(())
            }
            TagEnd::Strong => {
                self.inline.strong = self.inline.strong.saturating_sub(1);
                Ok(())
            }
            TagEnd::Strikethrough => {
                self.inline.strike = self.inline.strike.saturating_sub(1);
                Ok(())
            }
            TagEnd::Link | TagEnd::Image => match self.links.pop() {
                Some(link) if !link.dest.is_empty() && link.dest != link.text => {
                    let style = self.fg(self.theme().quote);
                    self.pending_space = true;
                    self.word(&format!("({})", link.dest), style)
                }
                _ => Ok(()),
            },
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
                Ok(())
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    if matches!(tag, TagEnd::TableHead) {
                        table.header_rows = table.rows.len();
                    }
                }
                Ok(())
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.write_table(&table)?;
                }
                self.end_block()
            }
            _ => Ok(()),
        }
    }

    fn text(&mut self, text: &str) -> fmt::Result {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return Ok(());
        }
        if self.code_block {
            return self.code_text(text);
        }

        let text = substitute_emoji(text);
        if let Some(link) = self.links.last_mut() {
            link.text.push_str(&text);
        }

        let style = self.current_style();
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            self.word(word, style)?;
            if words.peek().is_some() {
                self.pending_space = true;
            }
        }
        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
        Ok(())
    }

    fn inline_code(&mut self, code: &str) -> fmt::Result {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(code);
            return Ok(());
        }
        if let Some(link) = self.links.last_mut() {
            link.text.push_str(code);
        }
        let style = self.fg(self.theme().code);
        self.word(code, style)
    }

    /// Code block lines: indented, never wrapped, blank lines preserved.
    fn code_text(&mut self, text: &str) -> fmt::Result {
        let style = self.fg(self.theme().code_block);
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            if !line.is_empty() {
                self.raw(&format!("  {line}"), style)?;
            }
            if lines.peek().is_some() {
                self.start_line()?;
                self.flush_line()?;
            }
        }
        Ok(())
    }

    /// Place one word, wrapping first if it would overflow. Widths are
    /// terminal columns, so CJK and most emoji count double.
    fn word(&mut self, word: &str, style: ContentStyle) -> fmt::Result {
        let width = display_width(word);
        let indent = self.indent_width();
        let available = self.renderer.width.saturating_sub(indent).max(1);
        if width > available && word.chars().nth(1).is_some() {
            for piece in split_at_width(word, available) {
                self.word(piece, style)?;
            }
            return Ok(());
        }
        let mut space = usize::from(self.pending_space && self.line_started && self.col > indent);
        if self.line_started
            && self.col > indent
            && self.col + space + width > self.renderer.width
        {
            self.flush_line()?;
            space = 0;
        }
        self.start_line()?;
        if space == 1 {
            self.line.push(' ');
            self.col += 1;
        }
        write!(self.line, "{}", style.apply(word))?;
        self.col += width;
        self.pending_space = false;
        Ok(())
    }

    /// Append text to the current line without wrapping.
    fn raw(&mut self, text: &str, style: ContentStyle) -> fmt::Result {
        self.start_line()?;
        write!(self.line, "{}", style.apply(text))?;
        self.col += display_width(text);
        Ok(())
    }

    fn start_line(&mut self) -> fmt::Result {
        if self.line_started {
            return Ok(());
        }
        self.line_started = true;
        self.col = self.indent_width();

        let last = self.prefixes.len().saturating_sub(1);
        for (i, prefix) in self.prefixes.iter().enumerate() {
            match &self.marker {
                Some(marker) if i == last => self.line.push_str(&marker.styled),
                _ => self.line.push_str(&prefix.styled),
            }
        }
        self.marker = None;
        Ok(())
    }

    fn flush_line(&mut self) -> fmt::Result {
        if self.line_started {
            writeln!(self.out, "{}", self.line.trim_end_matches(' '))?;
            self.line.clear();
            self.line_started = false;
            self.col = 0;
        }
        self.pending_space = false;
        Ok(())
    }

    fn begin_block(&mut self) -> fmt::Result {
        self.flush_line()?;
        if self.needs_gap && !self.out.is_empty() {
            self.out.push('\n');
        }
        self.needs_gap = false;
        Ok(())
    }

    fn end_block(&mut self) -> fmt::Result {
        self.flush_line()?;
        self.needs_gap = true;
        Ok(())
    }

    fn write_table(&mut self, table: &Table) -> fmt::Result {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }

        let border = self.fg(self.theme().quote);
        for (r, row) in table.rows.iter().enumerate() {
            let mut cell_style = ContentStyle::new();
            if r < table.header_rows {
                cell_style.attributes.set(Attribute::Bold);
            }
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    self.raw(" │ ", border)?;
                }
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let padding = width - display_width(cell);
                self.raw(&format!("{cell}{}", " ".repeat(padding)), cell_style)?;
            }
            self.flush_line()?;

            if r + 1 == table.header_rows {
                let separator = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.raw(&separator, border)?;
                self.flush_line()?;
            }
        }
        Ok(())
    }

    fn indent_width(&self) -> usize {
        self.prefixes.iter().map(|p| p.width).sum()
    }

    fn fg(&self, color: Color) -> ContentStyle {
        ContentStyle {
            foreground_color: Some(color),
            ..ContentStyle::new()
        }
    }

    fn current_style(&self) -> ContentStyle {
        let theme = self.theme();
        let mut style = ContentStyle::new();
        if self.inline.heading {
            style.foreground_color = Some(theme.heading);
            style.attributes.set(Attribute::Bold);
        } else if !self.links.is_empty() {
            style.foreground_color = Some(theme.link);
            style.attributes.set(Attribute::Underlined);
        } else if self.inline.quote > 0 {
            style.foreground_color = Some(theme.quote);
        }
        if self.inline.strong > 0 {
            style.attributes.set(Attribute::Bold);
        }
        if self.inline.emphasis > 0 {
            style.attributes.set(Attribute::Italic);
        }
        if self.inline.strike > 0 {
            style.attributes.set(Attribute::CrossedOut);
        }
        style
    }

    fn finish(mut self) -> Result<String, fmt::Error> {
        self.flush_line()?;
        let len = self.out.trim_end_matches('\n').len();
        self.out.truncate(len);
        Ok(self.out)
    }
}

/// Split a word too wide for one line into pieces at most `max` columns
/// wide. Every piece holds at least one character.
fn split_at_width(word: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut width = 0;
    for (i, c) in word.char_indices() {
        let w = display_width(c.encode_utf8(&mut [0; 4]));
        if width + w > max && i > start {
            pieces.push(&word[start..i]);
            start = i;
            width = 0;
        }
        width += w;
    }
    pieces.push(&word[start..]);
    pieces
}

fn emoji_for(code: &str) -> Option<&'static str> {
    emojis::get_by_shortcode(code).map(|emoji| emoji.as_str())
}

/// Replace GitHub `:shortcode:` sequences; unknown ones are left alone.
fn substitute_emoji(text: &str) -> Cow<'_, str> {
    if !text.contains(':') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let shortcode = after
            .find(':')
            .and_then(|end| emoji_for(&after[..end]).map(|emoji| (end, emoji)));
        if let Some((end, emoji)) = shortcode {
            out.push_str(&rest[..start]);
            out.push_str(emoji);
            rest = &after[end + 1..];
        } else {
            out.push_str(&rest[..=start]);
            rest = after;
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
