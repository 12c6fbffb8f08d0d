//! One `ask` run from question to printed answer.

use crate::chat::transport::Transport;
use crate::chat::{ChatClient, Reply};
use crate::config::Config;
use crate::context::EnvironmentInfo;
use crate::error::AskError;
use crate::output::Presenter;
use crate::{input, prompt};
use std::io::{Read, Write};
use tracing::debug;

/// Where the question comes from.
pub struct Invocation<R> {
    /// Decided once at startup, before stdin is touched.
    pub has_pipe: bool,
    pub args: Vec<String>,
    pub stdin: R,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    NoContent,
}

pub struct App<T> {
    environment: EnvironmentInfo,
    client: ChatClient<T>,
}

impl<T: Transport> App<T> {
    pub fn new(config: Config, environment: EnvironmentInfo, transport: T) -> Self {
        debug!(
            os = %environment.os,
            arch = %environment.arch,
            shell = %environment.shell,
            "probed environment"
        );
        let client = ChatClient::new(transport, config.base_url, config.api_key, config.model);
        Self {
            environment,
            client,
        }
    }

    /// Compose the question, ask it, and print the answer.
    ///
    /// Nothing is sent when no question can be composed.
    pub async fn run<R, W>(
        &self,
        invocation: Invocation<R>,
        presenter: &mut Presenter<W>,
    ) -> Result<Outcome, AskError>
    where
        R: Read,
        W: Write,
    {
        let question = input::compose(invocation.has_pipe, &invocation.args, invocation.stdin)?;
        let system_prompt = prompt::build(&self.environment);

        presenter.announce_waiting().map_err(AskError::Output)?;
        let reply = self.client.send(&system_prompt, &question).await;
        presenter.clear_waiting().map_err(AskError::Output)?;

        match reply? {
            Reply::Content(content) => {
                presenter.present(&content).map_err(AskError::Output)?;
                Ok(Outcome::Answered)
            }
            Reply::Empty => {
                presenter.no_content().map_err(AskError::Output)?;
                Ok(Outcome::NoContent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::FakeTransport;
    use crate::chat::ChatError;
    use crate::output::render::{Render, RenderError};
    use reqwest::StatusCode;

    struct Upper;

    impl Render for Upper {
        fn render(&self, markdown: &str) -> Result<String, RenderError> {
            Ok(markdown.to_uppercase())
        }
    }

    fn app(transport: FakeTransport) -> App<FakeTransport> {
        let config = Config {
            base_url: "http://llm.local/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
        };
        let environment = EnvironmentInfo {
            os: "Test OS 1.0".to_string(),
            arch: "x86_64".to_string(),
            shell: "bash".to_string(),
        };
        App::new(config, environment, transport)
    }

    fn invocation(has_pipe: bool, args: &[&str], stdin: &'static str) -> Invocation<&'static [u8]> {
        Invocation {
            has_pipe,
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: stdin.as_bytes(),
        }
    }

    fn answer(content: &str) -> FakeTransport {
        let body = serde_json::json!({"choices": [{"message": {"content": content}}]});
        FakeTransport::responding(StatusCode::OK, &body.to_string())
    }

    #[tokio::test]
    async fn test_no_input_makes_no_request() {
        let app = app(answer("unused"));
        let mut presenter = Presenter::terminal(Vec::new(), Ok(Box::new(Upper)));

        let err = app
            .run(invocation(false, &[], ""), &mut presenter)
            .await
            .unwrap_err();

        assert!(err.is_usage());
        assert_eq!(app.client.transport().call_count(), 0);
        assert!(presenter.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_piped_question_reaches_endpoint() {
        let app = app(answer("check the disk"));
        let mut presenter = Presenter::plain(Vec::new());

        let outcome = app
            .run(invocation(true, &["why", "failed?"], "No space left\n"), &mut presenter)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Answered);
        assert_eq!(
            String::from_utf8(presenter.into_inner()).unwrap(),
            "check the disk\n"
        );

        let calls = app.client.transport().calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0].body["messages"];
        assert!(messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("The user is on Test OS 1.0/x86_64 with bash."));
        assert_eq!(
            messages[1]["content"],
            "why failed?\n\n```\nNo space left\n```"
        );
        assert_eq!(calls[0].body["model"], "test-model");
    }

    #[tokio::test]
    async fn test_terminal_output_is_rendered() {
        let app = app(answer("use ls"));
        let mut presenter = Presenter::terminal(Vec::new(), Ok(Box::new(Upper)));

        app.run(invocation(false, &["list", "files"], ""), &mut presenter)
            .await
            .unwrap();

        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(out.starts_with("Thinking..."));
        assert!(out.ends_with("USE LS\n"));
    }

    #[tokio::test]
    async fn test_empty_choices_prints_no_response() {
        let app = app(FakeTransport::responding(StatusCode::OK, r#"{"choices":[]}"#));
        let mut presenter = Presenter::plain(Vec::new());

        let outcome = app
            .run(invocation(false, &["hello"], ""), &mut presenter)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoContent);
        assert_eq!(String::from_utf8(presenter.into_inner()).unwrap(), "No response\n");
    }

    #[tokio::test]
    async fn test_api_error_clears_indicator_and_fails() {
        let app = app(FakeTransport::responding(
            StatusCode::TOO_MANY_REQUESTS,
            "rate limited",
        ));
        let mut presenter = Presenter::terminal(Vec::new(), Ok(Box::new(Upper)));

        let err = app
            .run(invocation(false, &["hello"], ""), &mut presenter)
            .await
            .unwrap_err();

        assert!(matches!(err, AskError::Chat(ChatError::Api { .. })));
        let message = err.to_string();
        assert!(message.contains("429"), "unexpected message: {message}");
        assert!(message.contains("rate limited"), "unexpected message: {message}");

        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "Thinking...\x1b[1G\x1b[2K");
    }

    /// Writer whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_closed_stdout_is_broken_pipe() {
        let app = app(answer("ss -tlnp"));
        let mut presenter = Presenter::plain(ClosedPipe);

        let err = app
            .run(invocation(false, &["ports"], ""), &mut presenter)
            .await
            .unwrap_err();

        assert!(err.is_broken_pipe());
        assert!(!err.is_usage());
    }

    #[test]
    fn test_other_output_errors_are_not_broken_pipe() {
        let err = AskError::Output(std::io::Error::other("disk full"));
        assert!(!err.is_broken_pipe());
    }
}
