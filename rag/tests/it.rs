//! End-to-end tests: knowledge base to persisted corpus to conversation.

use std::sync::{Arc, Mutex};

use ragbot_core::llm::Message;
use ragbot_core::{EmbeddingModel, LanguageModel};
use ragbot_rag::{
    Assistant, Corpus, Document, DocumentLoader, IndexBuilder, IndexKind, KnowledgeBase,
    RagConfig, RagError, Session, SharedCorpus, content_hash, ingestion_failure, load_documents,
    tokenize,
};

const DIM: usize = 256;

/// Hashed bag of words.
struct HashedWords {
    name: &'static str,
}

impl EmbeddingModel for HashedWords {
    fn dim(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn embed(&self, text: &str) -> ragbot_core::Result<Vec<f32>> {
        let mut vector = vec![0.0; DIM];
        for token in tokenize(text) {
            let bucket = usize::try_from(content_hash(&token) % DIM as u64).unwrap();
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

fn embedder() -> Arc<HashedWords> {
    Arc::new(HashedWords { name: "hashed-words" })
}

/// Follows the pipeline's instructions with canned behaviour and records answer contexts.
struct Scripted {
    rewrites: Vec<(&'static str, &'static str)>,
    answering: bool,
    contexts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(rewrites: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            rewrites,
            answering: true,
            contexts: Mutex::new(Vec::new()),
        }
    }
}

impl LanguageModel for Scripted {
    async fn respond(&self, messages: &[Message]) -> ragbot_core::Result {
        let system = messages[0].content();
        let last = messages.last().map(Message::content).unwrap_or_default();
        if system.contains("standalone question") {
            let rewritten = self
                .rewrites
                .iter()
                .find(|(from, _)| *from == last)
                .map_or(last, |(_, to)| *to);
            Ok(rewritten.to_string())
        } else if system.contains("different versions") {
            Ok(format!("1. {last}"))
        } else if self.answering {
            self.contexts.lock().unwrap().push(system.to_string());
            Ok("Answer from the retrieved context.".to_string())
        } else {
            Err(anyhow::anyhow!("503 Service Unavailable"))
        }
    }
}

struct InMemory(Vec<(&'static str, &'static str)>);

impl DocumentLoader for InMemory {
    async fn load(&self, location: &str) -> ragbot_rag::Result<Document> {
        self.0
            .iter()
            .find(|(name, _)| *name == location)
            .map(|(name, text)| Document::new(*name, *text))
            .ok_or_else(|| ingestion_failure(location, "connection refused"))
    }
}

fn library() -> InMemory {
    InMemory(vec![
        (
            "solar.pdf",
            "Solar panels received two billion roubles of funding in 2023.",
        ),
        (
            "wind.pdf",
            "Wind turbines received one billion roubles of funding in 2023.",
        ),
        (
            "hydro.pdf",
            "Hydro dams were inspected for safety across the northern region.",
        ),
    ])
}

async fn build_store(dir: &std::path::Path, config: &RagConfig) -> Corpus<HashedWords> {
    let kb = KnowledgeBase::new(dir.join("knowledge_base.txt"));
    for url in ["solar.pdf", "wind.pdf", "offline.pdf", "hydro.pdf", "wind.pdf"] {
        kb.append(url).unwrap();
    }
    let urls = kb.first(config.max_documents).unwrap();
    assert_eq!(urls, ["solar.pdf", "wind.pdf", "offline.pdf", "hydro.pdf"]);

    let documents = load_documents(&library(), &urls, config.max_documents, |_| {}).await;
    assert_eq!(documents.len(), 3);

    IndexBuilder::new(embedder(), config.clone())
        .build_and_save(documents, &dir.join("store"), |_| {})
        .await
        .unwrap()
}

#[tokio::test]
async fn persisted_store_answers_a_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig::default();
    let built = build_store(dir.path(), &config).await;

    let loaded = Corpus::load(&dir.path().join("store"), embedder()).unwrap();
    assert_eq!(loaded.len(), built.len());
    for question in ["solar funding", "wind turbines 2023", "hydro safety"] {
        assert_eq!(
            built.retriever(&config).query(question, 3).await.unwrap(),
            loaded.retriever(&config).query(question, 3).await.unwrap()
        );
    }

    let shared = SharedCorpus::new(config.clone());
    shared.publish(loaded);
    let model = Arc::new(Scripted::new(vec![(
        "and for wind?",
        "How much funding did wind turbines receive?",
    )]));
    let assistant = Assistant::new(Arc::clone(&model), shared, &config);
    let mut session = Session::with_greeting();

    let first = assistant
        .get_response(&mut session, "How much funding did solar panels receive?")
        .await
        .unwrap();
    assert_eq!(first.sources[0], "solar.pdf");
    assert!(first.render().ends_with(&format!("Sources: {}", first.sources.join(", "))));
    assert_eq!(session.len(), 3);

    let second = assistant
        .get_response(&mut session, "and for wind?")
        .await
        .unwrap();
    assert_eq!(second.sources[0], "wind.pdf");
    assert_eq!(session.len(), 5);
    assert_eq!(session.turns(), 2);
    assert_eq!(session.messages()[3], Message::user("and for wind?"));

    let contexts = model.contexts.lock().unwrap();
    assert!(contexts[1].contains("Wind turbines received one billion"));
}

#[tokio::test]
async fn composer_outage_keeps_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig::default();
    let corpus = build_store(dir.path(), &config).await;

    let shared = SharedCorpus::new(config.clone());
    shared.publish(corpus);
    let mut model = Scripted::new(Vec::new());
    model.answering = false;
    let assistant = Assistant::new(Arc::new(model), shared, &config);
    let mut session = Session::with_greeting();

    let error = assistant
        .get_response(&mut session, "What about hydro?")
        .await
        .unwrap_err();
    assert!(matches!(error, RagError::ExternalServiceUnavailable(_)));
    assert!(error.user_message().contains("try again"));
    assert_eq!(session, Session::with_greeting());
}

#[tokio::test]
async fn store_refuses_a_different_embedding_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig::builder().index_kind(IndexKind::Hnsw).build();
    build_store(dir.path(), &config).await;

    let other = Arc::new(HashedWords { name: "other-model" });
    assert!(matches!(
        Corpus::load(&dir.path().join("store"), other),
        Err(RagError::IncompatibleIndex { .. })
    ));
}

#[tokio::test]
async fn empty_corpus_still_answers() {
    let config = RagConfig::default();
    let corpus = IndexBuilder::new(embedder(), config.clone())
        .build(Vec::new(), |_| {})
        .await
        .unwrap();
    assert!(corpus.is_empty());

    let shared = SharedCorpus::new(config.clone());
    shared.publish(corpus);
    let assistant = Assistant::new(Arc::new(Scripted::new(Vec::new())), shared, &config);
    let mut session = Session::new();

    let answer = assistant.get_response(&mut session, "Anything?").await.unwrap();
    assert!(answer.sources.is_empty());
    assert_eq!(answer.render(), answer.text);
    assert_eq!(session.len(), 2);
}
