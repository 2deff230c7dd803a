use alloc::{format, string::String};

pub fn contextualize() -> &'static str {
    r"Given the chat history and the latest user question, which may refer to context in the chat history, formulate a standalone question that can be understood without the chat history.

Requirements:
- Do NOT answer the question
- Only rephrase it if needed, otherwise return it as is
- Reply with the question text only, no preamble or quotes"
}

pub fn multi_query(count: usize) -> String {
    format!(
        r"You are an AI language model assistant. Your task is to generate {count} different versions of the given user question to retrieve relevant documents from a vector database.

By generating multiple perspectives on the user question, your goal is to help the user overcome some of the limitations of distance-based similarity search.

Requirements:
- Provide exactly {count} alternative questions
- Put each question on its own line
- Do not number the questions or add any other text"
    )
}

pub fn answer(context: &str) -> String {
    format!(
        r"You are an assistant for question-answering tasks. Use the following pieces of retrieved context to answer the question. If you don't know the answer, say that you don't know. Keep the answer concise.

{context}"
    )
}
