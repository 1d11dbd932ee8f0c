use anyhow::Context;
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sow_chat::cli::{Args, ReplCommand, save_reply};
use sow_chat::telemetry::init_tracing;
use sow_chat::{ChatConfig, Conversation, SowAssistant, TurnInputs};

const BANNER: &str = "\
Ask any supply chain, procurement, or SOW question, ask for a new SOW, or ask for a review of your input documents.
Commands: /save [path], /history, /quit";

/// Run one turn for `message` and print the reply or the error.
async fn turn(
    assistant: &SowAssistant,
    mut conversation: Conversation,
    inputs: &TurnInputs,
    message: String,
) -> Conversation {
    conversation.push_user(message);
    let outcome = assistant.handle_turn(conversation, inputs).await;
    match outcome.reply {
        Ok(Some(reply)) => println!("\n{reply}\n"),
        Ok(None) => {}
        Err(e) => eprintln!("error: {e}"),
    }
    outcome.conversation
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = ChatConfig::from_env();
    args.apply(&mut config)?;
    if !config.has_api_key() {
        eprintln!("warning: OPENAI_API_KEY is not set; every turn will fail until it is");
    }

    let inputs = args.load_inputs().context("failed to load documents")?;
    let assistant = SowAssistant::from_config(config)?;
    let mut conversation = Conversation::new();

    if let Some(question) = args.ask.clone() {
        conversation = turn(&assistant, conversation, &inputs, question).await;
        if conversation.last_assistant_reply().is_none() {
            anyhow::bail!("no reply generated");
        }
        return Ok(());
    }

    println!("{BANNER}");
    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("sow> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::History => {
                for message in conversation.messages() {
                    println!("[{}] {}", message.role, message.content);
                }
            }
            ReplCommand::Save(path) => {
                let path = path.unwrap_or_else(|| args.out.clone());
                match save_reply(&conversation, &path) {
                    Ok(true) => println!("saved last reply to {}", path.display()),
                    Ok(false) => println!("nothing to save yet"),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            ReplCommand::Unknown(name) => eprintln!("unknown command: /{name}"),
            ReplCommand::Message(message) => {
                conversation = turn(&assistant, conversation, &inputs, message).await;
            }
        }
    }

    Ok(())
}
