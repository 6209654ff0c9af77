pub mod agents;
pub mod conversation_state;
pub mod dispatcher;
pub mod guardrail;
pub mod prompt;
pub mod tools;

use std::io::Write;
use std::process::ExitCode;

use eyre::Result;
use tracing::info;

use self::agents::{AgentSet, RunConfig};
use self::conversation_state::{ConversationState, Message};
use self::dispatcher::{AgentDispatcher, TurnOutcome};
use self::prompt::generate_prompt;
use self::tools::OrderLookup;

use crate::gemini_client::GeminiClient;

const WELCOME_TEXT: &str = "
🤖 Welcome to Customer Support! How can I help you today?

Things to try
• Check the status of order 123.
• Ask a question about our products.
• Say \"escalate\" to reach a human agent.

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
Customer Support Chat

/clear        Clear the conversation history
/help         Show this help dialogue
/quit         Quit the application
";

/// Per-session state: the transcript, the agent pair, and the dispatcher.
/// Everything a turn touches lives here; nothing is ambient.
pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    conversation: ConversationState,
    dispatcher: Option<AgentDispatcher<GeminiClient>>,
    log_payloads: bool,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        log_payloads: bool,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            conversation: ConversationState::new(),
            dispatcher: None,
            log_payloads,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Missing API key is fatal at startup.
        let client = match GeminiClient::new() {
            Ok(client) => client,
            Err(e) => {
                writeln!(self.output, "Failed to initialize Gemini client: {}", e)?;
                return Ok(ExitCode::FAILURE);
            }
        };

        self.dispatcher = Some(AgentDispatcher::new(
            client,
            RunConfig::new(self.log_payloads),
            AgentSet::customer_support(),
            OrderLookup::support_desk(),
        ));

        if self.interactive {
            self.print_welcome()?;
        }

        // Non-interactive mode: a single turn.
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(None);
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        writeln!(self.output, "Error: {}", e)?;
                    }
                }
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match input.trim() {
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/clear" => {
                self.conversation.clear();
                writeln!(self.output, "Conversation cleared.")?;
            }
            _ => {
                self.handle_turn(input).await?;
            }
        }

        Ok(())
    }

    /// One inbound message: append it, dispatch, then commit or discard the
    /// transcript depending on how the turn ended.
    async fn handle_turn(&mut self, input: &str) -> Result<()> {
        let dispatcher = match &self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => eyre::bail!("dispatcher not initialized"),
        };

        let checkpoint = self.conversation.current().to_vec();
        self.conversation.append_user(input);

        info!("👤 User: {}", input);

        let outcome = dispatcher.dispatch(self.conversation.current(), input).await;
        let reply = commit_turn(&mut self.conversation, checkpoint, &outcome);

        info!("🤖 Assistant: {}", reply);
        writeln!(self.output, "{}", reply)?;

        Ok(())
    }
}

/// Applies a turn outcome to the stored transcript and returns the text to
/// render. A completed run's canonical history replaces the transcript
/// wholesale; blocked and failed turns restore the pre-turn checkpoint so the
/// caller may retry the same turn.
fn commit_turn<'a>(
    conversation: &mut ConversationState,
    checkpoint: Vec<Message>,
    outcome: &'a TurnOutcome,
) -> &'a str {
    match outcome {
        TurnOutcome::Completed { reply, history } => {
            conversation.replace_with(history.clone());
            reply
        }
        TurnOutcome::Blocked { notice } => {
            conversation.replace_with(checkpoint);
            notice
        }
        TurnOutcome::Failed { reply } => {
            conversation.replace_with(checkpoint);
            reply
        }
    }
}
