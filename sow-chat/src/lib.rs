//! # sow-chat
//!
//! A chat assistant for supply-chain statements of work (SOWs).
//!
//! Each turn optionally grounds the answer in previously uploaded example
//! SOWs: the examples are chunked, embedded and searched with
//! [`sow_rag`], the best chunks are placed in a labeled prompt next to the
//! SOW template and any draft under review, and the prompt goes to a hosted
//! completion model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sow_chat::{ChatConfig, Conversation, SowAssistant, TurnInputs};
//!
//! let assistant = SowAssistant::from_config(ChatConfig::from_env())?;
//! let mut conversation = Conversation::new();
//! conversation.push_user("What belongs in a SOW's acceptance criteria?");
//!
//! let outcome = assistant.handle_turn(conversation, &TurnInputs::default()).await;
//! println!("{}", outcome.reply?.unwrap_or_default());
//! ```

pub mod assistant;
pub mod cli;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod telemetry;

pub use assistant::{ReferenceSet, SowAssistant, TurnInputs, TurnOutcome};
pub use completion::{CompletionClient, CompletionRequest, OpenAICompletionClient};
pub use config::ChatConfig;
pub use conversation::{Conversation, Message, Role};
pub use error::{ChatError, Result};
pub use extract::{DocumentFormat, extract_text, load_document};
pub use prompt::PromptContext;
