//! Turn handling with injected embedding and completion fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sow_chat::prompt::{INPUT_LABEL, PREVIOUS_SOWS_LABEL, TEMPLATE_LABEL};
use sow_chat::{
    ChatConfig, ChatError, CompletionClient, CompletionRequest, Conversation, ReferenceSet, Role,
    SowAssistant, TurnInputs,
};
use sow_rag::{Document, EmbeddingProvider, RagConfig, RagError};

const WORDS: &[&str] = &["payment", "milestone", "acceptance", "criteria", "warranty", "fees"];

/// Bag-of-words embedder that remembers every query it embedded.
#[derive(Default)]
struct RecordingEmbedder {
    missing_key: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        WORDS.iter().map(|w| lower.matches(w).count() as f32).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    fn ensure_credentials(&self) -> sow_rag::Result<()> {
        if self.missing_key {
            return Err(RagError::ConfigError("API key is missing".into()));
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> sow_rag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(text.to_string());
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> sow_rag::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        WORDS.len()
    }
}

enum Behavior {
    Reply(&'static str),
    Fail,
    Hang,
}

struct FakeCompletion {
    behavior: Behavior,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { behavior, requests: Mutex::new(Vec::new()) })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &CompletionRequest) -> sow_chat::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::Fail => Err(ChatError::completion("fake", "429 rate limited")),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

fn config() -> ChatConfig {
    ChatConfig {
        rag: RagConfig::builder()
            .chunk_size(60)
            .chunk_overlap(10)
            .top_k(2)
            .embedding_timeout(None)
            .build()
            .unwrap(),
        completion_timeout: Some(Duration::from_secs(5)),
        ..ChatConfig::default()
    }
}

fn assistant(
    embedder: Arc<RecordingEmbedder>,
    completion: Arc<FakeCompletion>,
) -> SowAssistant {
    SowAssistant::new(config(), embedder, completion).unwrap()
}

fn asking(question: &str) -> Conversation {
    let mut conversation = Conversation::new();
    conversation.push_user(question);
    conversation
}

/// Body of the section that follows `label`, up to the next blank line.
fn section<'a>(prompt: &'a str, label: &str) -> &'a str {
    let start = prompt.find(label).unwrap() + label.len() + 1;
    let end = prompt[start..].find("\n\n").map_or(prompt.len(), |i| start + i);
    &prompt[start..end]
}

#[tokio::test]
async fn general_question_without_documents_still_gets_an_answer() {
    let embedder = Arc::new(RecordingEmbedder::default());
    let completion = FakeCompletion::new(Behavior::Reply("A SOW defines scope and deliverables."));
    let assistant = assistant(embedder.clone(), completion.clone());

    let outcome = assistant.handle_turn(asking("What is a SOW?"), &TurnInputs::default()).await;

    assert_eq!(outcome.reply.unwrap().as_deref(), Some("A SOW defines scope and deliverables."));
    assert_eq!(outcome.conversation.len(), 2);
    assert_eq!(outcome.conversation.messages()[1].role, Role::Assistant);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    let requests = completion.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, sow_chat::prompt::SYSTEM_INSTRUCTION);
    assert_eq!(requests[0].max_tokens, 2000);
    assert_eq!(requests[0].temperature, 0.2);
    assert_eq!(section(&requests[0].prompt, PREVIOUS_SOWS_LABEL), "");
    assert!(requests[0].prompt.contains("User request:\nWhat is a SOW?"));
}

#[tokio::test]
async fn examples_are_retrieved_and_placed_in_the_prompt() {
    let embedder = Arc::new(RecordingEmbedder::default());
    let completion = FakeCompletion::new(Behavior::Reply("Looks good."));
    let assistant = assistant(embedder.clone(), completion.clone());

    let inputs = TurnInputs {
        references: ReferenceSet {
            template: Some(Document::new("template.docx", "1. Scope\n2. Fees")),
            examples: vec![
                Document::new("a.docx", "Payment is due at each milestone after acceptance."),
                Document::new("b.docx", "The warranty lasts twelve months from delivery."),
            ],
        },
        input_documents: vec![Document::new("draft.docx", "Draft: fees are fixed.")],
    };

    let outcome = assistant.handle_turn(asking("Review my payment milestone"), &inputs).await;
    assert!(outcome.reply.is_ok());

    let queries = embedder.queries.lock().unwrap().clone();
    assert_eq!(queries, vec!["Review my payment milestone\nDraft: fees are fixed.".to_string()]);

    let prompt = &completion.requests()[0].prompt;
    assert_eq!(section(prompt, TEMPLATE_LABEL), "1. Scope\n2. Fees");
    assert_eq!(section(prompt, INPUT_LABEL), "Draft: fees are fixed.");
    let retrieved = section(prompt, PREVIOUS_SOWS_LABEL);
    let chunks: Vec<&str> = retrieved.split("\n---\n").collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], "Payment is due at each milestone after acceptance.");
}

#[tokio::test]
async fn missing_credential_fails_the_turn_without_calling_services() {
    let embedder = Arc::new(RecordingEmbedder { missing_key: true, ..Default::default() });
    let completion = FakeCompletion::new(Behavior::Reply("unused"));
    let assistant = assistant(embedder.clone(), completion.clone());

    let inputs = TurnInputs {
        references: ReferenceSet {
            template: None,
            examples: vec![Document::new("a.docx", "Payment terms.")],
        },
        input_documents: Vec::new(),
    };
    let outcome = assistant.handle_turn(asking("Draft a SOW"), &inputs).await;

    let err = outcome.reply.unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, ChatError::Rag(RagError::ConfigError(_))));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(completion.requests().is_empty());
    assert_eq!(outcome.conversation, asking("Draft a SOW"));
}

#[tokio::test]
async fn completion_failure_leaves_no_assistant_message() {
    let completion = FakeCompletion::new(Behavior::Fail);
    let assistant = assistant(Arc::new(RecordingEmbedder::default()), completion);

    let outcome = assistant.handle_turn(asking("Hello"), &TurnInputs::default()).await;

    assert!(matches!(outcome.reply, Err(ChatError::CompletionService { .. })));
    assert_eq!(outcome.conversation.len(), 1);
    assert!(outcome.conversation.needs_response());
}

#[tokio::test(start_paused = true)]
async fn stalled_completion_times_out() {
    let completion = FakeCompletion::new(Behavior::Hang);
    let assistant = assistant(Arc::new(RecordingEmbedder::default()), completion);

    let outcome = assistant.handle_turn(asking("Hello"), &TurnInputs::default()).await;

    match outcome.reply {
        Err(ChatError::CompletionService { provider, message }) => {
            assert_eq!(provider, "fake");
            assert!(message.contains("timed out"));
        }
        other => panic!("expected a completion timeout, got {other:?}"),
    }
    assert_eq!(outcome.conversation.len(), 1);
}

#[tokio::test]
async fn answered_conversation_is_left_alone() {
    let completion = FakeCompletion::new(Behavior::Reply("unused"));
    let assistant = assistant(Arc::new(RecordingEmbedder::default()), completion.clone());

    let mut conversation = asking("Hi");
    conversation.push_assistant("Hello!");
    let outcome = assistant.handle_turn(conversation.clone(), &TurnInputs::default()).await;

    assert!(matches!(outcome.reply, Ok(None)));
    assert_eq!(outcome.conversation, conversation);
    assert!(completion.requests().is_empty());
}

#[tokio::test]
async fn follow_up_questions_are_answered_too() {
    let completion = FakeCompletion::new(Behavior::Reply("ok"));
    let assistant = assistant(Arc::new(RecordingEmbedder::default()), completion.clone());

    let first = assistant.handle_turn(asking("One"), &TurnInputs::default()).await;
    let mut conversation = first.conversation;
    conversation.push_user("Two");
    let second = assistant.handle_turn(conversation, &TurnInputs::default()).await;

    assert_eq!(second.conversation.len(), 4);
    assert_eq!(completion.requests().len(), 2);
}

#[test]
fn uploads_split_into_template_and_examples() {
    let refs = ReferenceSet::from_uploads(vec![
        Document::new("template.docx", "T"),
        Document::new("one.pdf", "E1"),
        Document::new("two.pdf", "E2"),
    ]);
    assert_eq!(refs.template_text(), "T");
    assert_eq!(refs.example_texts(), vec!["E1", "E2"]);

    let empty = ReferenceSet::from_uploads(Vec::new());
    assert_eq!(empty.template_text(), "");
    assert!(empty.example_texts().is_empty());
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = ChatConfig { temperature: -1.0, ..ChatConfig::default() };
    let result = SowAssistant::new(
        config,
        Arc::new(RecordingEmbedder::default()),
        FakeCompletion::new(Behavior::Reply("unused")),
    );
    assert!(result.unwrap_err().is_config());
}
