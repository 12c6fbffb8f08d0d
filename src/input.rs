//! Question composition from piped stdin and argument words.

use std::io::{self, IsTerminal, Read};
use thiserror::Error;

/// Usage text printed when no question was supplied.
pub const USAGE: &str = r#"Usage:
  ask "question"
  echo "question" | ask
  cat file | ask "question""#;

/// Errors raised while composing the question.
#[derive(Debug, Error)]
pub enum InputError {
    /// Neither arguments nor piped input were supplied.
    #[error("no question supplied")]
    Usage,
    /// Piped input could not be read.
    #[error("failed to read piped input: {0}")]
    Read(#[from] io::Error),
}

/// Which combination of piped input and argument text a run received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// `cat error.log | ask "what went wrong"`
    ArgsWithPipe,
    /// `echo "question" | ask`
    PipeOnly,
    /// `ask how to install uv`
    ArgsOnly,
    /// Nothing to ask.
    None,
}

impl InvocationMode {
    pub fn detect(has_pipe: bool, has_args: bool) -> Self {
        match (has_pipe, has_args) {
            (true, true) => Self::ArgsWithPipe,
            (true, false) => Self::PipeOnly,
            (false, true) => Self::ArgsOnly,
            (false, false) => Self::None,
        }
    }
}

/// Build the question text.
///
/// `pipe` is only read when `has_pipe` is set. Piped text is used verbatim,
/// trailing newline included.
pub fn compose<R: Read>(has_pipe: bool, args: &[String], pipe: R) -> Result<String, InputError> {
    let mode = InvocationMode::detect(has_pipe, !args.is_empty());
    tracing::debug!(?mode, "composing question");

    match mode {
        InvocationMode::ArgsWithPipe => {
            let header = args.join(" ");
            let piped = read_all(pipe)?;
            Ok(format!("{header}\n\n```\n{piped}```"))
        }
        InvocationMode::PipeOnly => Ok(read_all(pipe)?),
        InvocationMode::ArgsOnly => Ok(args.join(" ")),
        InvocationMode::None => Err(InputError::Usage),
    }
}

fn read_all<R: Read>(mut pipe: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    pipe.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Whether stdin carries piped data. Must be called once, before any read.
///
/// Any character device (a terminal, or `/dev/null`) counts as "no pipe".
pub fn stdin_has_pipe() -> bool {
    let stdin = io::stdin();

    #[cfg(unix)]
    {
        use std::fs::File;
        use std::os::fd::AsFd;
        use std::os::unix::fs::FileTypeExt;

        let file_type = stdin
            .as_fd()
            .try_clone_to_owned()
            .map(File::from)
            .and_then(|file| file.metadata())
            .map(|meta| meta.file_type());
        if let Ok(file_type) = file_type {
            return !file_type.is_char_device();
        }
    }

    !stdin.is_terminal()
}
