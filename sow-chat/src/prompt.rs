//! Prompt assembly for the SOW advisor.
//!
//! Every prompt carries the same labeled sections in the same order. A
//! section with no content is rendered with an empty body rather than
//! dropped, so the model always sees the full layout.

/// System message sent with every completion request.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert SOW writer and supply chain advisor.";

/// Separator placed between retrieved chunks.
pub const RETRIEVAL_SEPARATOR: &str = "\n---\n";

/// Section label for the SOW template.
pub const TEMPLATE_LABEL: &str = "[TEMPLATE]";

/// Section label for chunks retrieved from previous SOWs.
pub const PREVIOUS_SOWS_LABEL: &str = "[PREVIOUS_SOWS]";

/// Section label for the draft or input documents.
pub const INPUT_LABEL: &str = "[INPUT_SOW_OR_DOC]";

const INSTRUCTIONS: &str = "\
Instructions:
- If the user asks for improvements, missing sections, or a review, carefully analyze [INPUT_SOW_OR_DOC] against the template and previous SOWs, and provide suggestions or highlight issues.
- If the user asks to generate a new SOW, draft it following the template and the style of the previous SOWs.
- If the user asks a general question about supply chain management, procurement, or SOW best practices, answer helpfully and concisely.
- If no files are uploaded, you can still answer general questions or provide advice as a supply chain SOW expert.
- For general questions or advice, act as a friendly, expert assistant.
";

/// The pieces of one turn's prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptContext<'a> {
    /// Text of the SOW template, or empty.
    pub template: &'a str,
    /// Retrieved chunks, most relevant first.
    pub retrieved: &'a [String],
    /// Text of the draft SOW or other input documents, or empty.
    pub input: &'a str,
    /// The user's chat message.
    pub request: &'a str,
}

impl PromptContext<'_> {
    /// Join the retrieved chunks with [`RETRIEVAL_SEPARATOR`].
    pub fn retrieved_block(&self) -> String {
        self.retrieved.join(RETRIEVAL_SEPARATOR)
    }

    /// Render the full user prompt.
    pub fn render(&self) -> String {
        format!(
            "You are an expert in supply chain management, SOW creation, and procurement best practices.

Here is the template for the SOW (if provided):
{TEMPLATE_LABEL}
{template}

Here are relevant sections from previous SOWs (if provided):
{PREVIOUS_SOWS_LABEL}
{retrieved}

Here is the draft SOW or input document (if provided):
{INPUT_LABEL}
{input}

User request:
{request}

{INSTRUCTIONS}",
            template = self.template,
            retrieved = self.retrieved_block(),
            input = self.input,
            request = self.request,
        )
    }
}
