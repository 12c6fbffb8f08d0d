//! ask - put a question to a chat-completion endpoint from the shell.

use ask::app::{App, Invocation, Outcome};
use ask::chat::transport::HttpTransport;
use ask::chat::ChatError;
use ask::config::{self, Config};
use ask::context;
use ask::error::AskError;
use ask::input::{self, USAGE};
use ask::output::render::{MarkdownRenderer, Render, WRAP_WIDTH};
use ask::output::Presenter;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ask=warn";

#[derive(Parser)]
#[command(name = "ask")]
#[command(author, version, about = "Ask a chat model a question from the shell")]
#[command(long_about = "Ask a chat model a question from the shell.\n\n\
    The question is taken from the arguments, from piped stdin, or both:\n\
    \n  ask \"how to install uv\"\
    \n  echo \"question\" | ask\
    \n  cat error.log | ask \"what went wrong\"\n\n\
    Requires AI_ASK_BASE_URL, AI_ASK_API_KEY and AI_ASK_MODEL.")]
struct Cli {
    /// Question words, joined with single spaces
    #[arg(value_name = "QUESTION", trailing_var_arg = true)]
    question: Vec<String>,

    /// Override AI_ASK_MODEL for this run
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Print the answer without markdown styling, even on a terminal
    #[arg(long)]
    raw: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_broken_pipe() => ExitCode::SUCCESS,
        Err(e) if e.is_usage() => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout only ever carries the answer.
fn init_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<Outcome, AskError> {
    let config = Config::from_env(cli.model)?;
    let has_pipe = input::stdin_has_pipe();
    let environment = context::probe();
    let transport = HttpTransport::new().map_err(ChatError::from)?;
    let app = App::new(config, environment, transport);

    let stdout = io::stdout();
    let mut presenter = if !stdout.is_terminal() {
        Presenter::plain(stdout)
    } else if cli.raw {
        Presenter::terminal_raw(stdout)
    } else {
        let renderer = MarkdownRenderer::new(WRAP_WIDTH).map(|r| Box::new(r) as Box<dyn Render>);
        Presenter::terminal(stdout, renderer)
    };

    let invocation = Invocation {
        has_pipe,
        args: cli.question,
        stdin: io::stdin().lock(),
    };
    app.run(invocation, &mut presenter).await
}
