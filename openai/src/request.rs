use ragbot_core::llm::Message;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessagePayload<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn new(model: &'a str, messages: &'a [Message], temperature: Option<f32>) -> Self {
        Self {
            model,
            messages: to_chat_messages(messages),
            stream: false,
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessagePayload<'a> {
    role: &'static str,
    content: &'a str,
}

pub fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessagePayload<'_>> {
    messages
        .iter()
        .map(|message| ChatMessagePayload {
            role: message.role().as_str(),
            content: message.content(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl<'a> EmbeddingRequest<'a> {
    pub const fn new(model: &'a str, input: &'a [String], dimensions: Option<usize>) -> Self {
        Self {
            model,
            input,
            dimensions,
        }
    }
}
