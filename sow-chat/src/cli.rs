//! Command-line arguments and REPL commands for the `sow-chat` binary.

use std::path::{Path, PathBuf};

use clap::Parser;
use sow_rag::Document;
use tracing::warn;

use crate::assistant::{ReferenceSet, TurnInputs};
use crate::config::ChatConfig;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::extract::load_document;

/// Chat with a supply-chain SOW advisor, grounded in your own SOW template
/// and previous SOWs.
#[derive(Debug, Parser)]
#[command(name = "sow-chat", version, about)]
pub struct Args {
    /// SOW template (.docx or .pdf)
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Previous SOW used for retrieval; repeat for more
    #[arg(long = "example", value_name = "FILE")]
    pub examples: Vec<PathBuf>,

    /// Draft SOW, requirements, or other input document; repeat for more
    #[arg(long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Template followed by previous SOWs, in one list
    #[arg(long, value_name = "FILE", num_args = 1.., conflicts_with_all = ["template", "examples"])]
    pub uploads: Vec<PathBuf>,

    /// Completion model (overrides SOW_CHAT_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Number of example chunks placed in the prompt
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Where /save writes the last reply
    #[arg(long, value_name = "FILE", default_value = "generated_sow.txt")]
    pub out: PathBuf,

    /// Ask one question, print the reply, and exit
    #[arg(long, value_name = "TEXT")]
    pub ask: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command-line overrides to `config` and validate the result.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<()> {
        if let Some(model) = &self.model {
            config.completion_model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.rag.top_k = top_k;
        }
        if let Some(size) = self.chunk_size {
            config.rag.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.rag.chunk_overlap = overlap;
        }
        config.validate()
    }

    /// Read and extract every file named on the command line.
    pub fn load_inputs(&self) -> Result<TurnInputs> {
        let references = if self.uploads.is_empty() {
            ReferenceSet {
                template: self.template.as_deref().map(load).transpose()?,
                examples: load_all(&self.examples)?,
            }
        } else {
            ReferenceSet::from_uploads(load_all(&self.uploads)?)
        };
        Ok(TurnInputs { references, input_documents: load_all(&self.inputs)? })
    }
}

fn load(path: &Path) -> Result<Document> {
    let document = load_document(path)?;
    if document.is_empty() {
        warn!(file = %path.display(), "no text extracted");
    }
    Ok(document)
}

fn load_all(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths.iter().map(|p| load(p)).collect()
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Blank line.
    Empty,
    /// A chat message.
    Message(String),
    /// Write the last reply to the given path, or the default one.
    Save(Option<PathBuf>),
    /// Print the conversation so far.
    History,
    /// Leave the REPL.
    Quit,
    /// An unrecognized `/command`.
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (command, None),
        };
        match name {
            "save" => Self::Save(arg.map(PathBuf::from)),
            "history" => Self::History,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

/// Write the last assistant reply to `path`.
///
/// Returns `false` without touching the file system when there is no reply yet.
pub fn save_reply(conversation: &Conversation, path: &Path) -> Result<bool> {
    let Some(reply) = conversation.last_assistant_reply() else {
        return Ok(false);
    };
    std::fs::write(path, reply)?;
    Ok(true)
}
