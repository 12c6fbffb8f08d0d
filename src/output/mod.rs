//! Answer presentation.
//!
//! On a terminal the answer is rendered as styled markdown and a transient
//! "Thinking..." indicator covers the wait. Anywhere else the raw answer is
//! printed unchanged so it can be piped.

pub mod render;

use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use render::{Render, RenderError};
use std::io::{self, Write};
use tracing::warn;

const WAITING_TEXT: &str = "Thinking...";
const NO_RESPONSE_TEXT: &str = "No response";

/// Writes answers to `out`, styled or plain depending on where `out` goes.
pub struct Presenter<W: Write> {
    out: W,
    mode: Mode,
    waiting: bool,
}

enum Mode {
    Plain,
    Terminal {
        renderer: Result<Box<dyn Render>, RenderError>,
    },
}

impl<W: Write> Presenter<W> {
    /// Presenter for output that is not an interactive terminal.
    pub fn plain(out: W) -> Self {
        Self {
            out,
            mode: Mode::Plain,
            waiting: false,
        }
    }

    /// Presenter for an interactive terminal.
    ///
    /// `renderer` is whatever constructing the renderer produced; a failed
    /// construction only means answers are printed unstyled.
    pub fn terminal(out: W, renderer: Result<Box<dyn Render>, RenderError>) -> Self {
        Self {
            out,
            mode: Mode::Terminal { renderer },
            waiting: false,
        }
    }

    /// Terminal presenter that never styles answers but still shows progress.
    pub fn terminal_raw(out: W) -> Self {
        Self::terminal(out, Ok(Box::new(Verbatim)))
    }

    /// Show the waiting indicator. No-op unless writing to a terminal.
    pub fn announce_waiting(&mut self) -> io::Result<()> {
        if matches!(self.mode, Mode::Terminal { .. }) {
            execute!(self.out, Print(WAITING_TEXT))?;
            self.waiting = true;
        }
        Ok(())
    }

    /// Erase the waiting indicator, if it is showing.
    pub fn clear_waiting(&mut self) -> io::Result<()> {
        if self.waiting {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            self.out.flush()?;
            self.waiting = false;
        }
        Ok(())
    }

    /// Print an answer.
    pub fn present(&mut self, content: &str) -> io::Result<()> {
        self.clear_waiting()?;
        let rendered = match &self.mode {
            Mode::Plain => None,
            Mode::Terminal { renderer } => match renderer {
                Ok(renderer) => match renderer.render(content) {
                    Ok(rendered) => Some(rendered),
                    Err(e) => {
                        warn!("rendering failed, printing raw answer: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("renderer unavailable, printing raw answer: {}", e);
                    None
                }
            },
        };
        writeln!(self.out, "{}", rendered.as_deref().unwrap_or(content))?;
        self.out.flush()
    }

    /// Print the notice for an answer without any choices.
    pub fn no_content(&mut self) -> io::Result<()> {
        self.clear_waiting()?;
        writeln!(self.out, "{}", NO_RESPONSE_TEXT)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Renderer used for `--raw`: hands content back untouched.
struct Verbatim;

impl Render for Verbatim {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        Ok(markdown.to_string())
    }
}
