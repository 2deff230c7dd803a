use crate::{
    client::{OpenAI, infer_embedding_dim},
    error::OpenAIError,
    request::EmbeddingRequest,
    response::EmbeddingResponse,
};
use ragbot_core::{EmbeddingModel, Result as CoreResult};

impl OpenAI {
    /// `dimensions` is only sent when shortening a `text-embedding-3` model.
    fn requested_dimensions(&self) -> Option<usize> {
        let config = self.config();
        let native = infer_embedding_dim(&config.embedding_model);
        (config.embedding_model.starts_with("text-embedding-3")
            && native != Some(config.embedding_dimensions))
        .then_some(config.embedding_dimensions)
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OpenAIError> {
        let config = self.config();
        let request =
            EmbeddingRequest::new(&config.embedding_model, texts, self.requested_dimensions());
        let response: EmbeddingResponse = self.post("/embeddings", &request).await?;
        let vectors = response.into_vectors();

        if vectors.len() != texts.len() {
            return Err(OpenAIError::EmptyResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(vector) = vectors
            .iter()
            .find(|vector| vector.len() != config.embedding_dimensions)
        {
            return Err(OpenAIError::InvalidConfig(format!(
                "{} returned {} dimensions, expected {}",
                config.embedding_model,
                vector.len(),
                config.embedding_dimensions
            )));
        }
        tracing::debug!(
            model = %config.embedding_model,
            count = vectors.len(),
            "embedded batch"
        );
        Ok(vectors)
    }
}

impl EmbeddingModel for OpenAI {
    fn dim(&self) -> usize {
        self.config().embedding_dimensions
    }

    fn name(&self) -> &str {
        &self.config().embedding_model
    }

    async fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text.to_owned()]).await?;
        vectors
            .pop()
            .ok_or_else(|| OpenAIError::EmptyResponse("embedding response missing vector".into()).into())
    }

    async fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.embed_texts(texts).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::{client, serve};
    use crate::error::OpenAIError;
    use crate::{EMBEDDING_SMALL, OpenAI};
    use ragbot_core::EmbeddingModel;

    #[tokio::test]
    async fn batch_is_one_request_in_input_order() {
        let (url, server) = serve(vec![(
            200,
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#
                .into(),
        )])
        .await;
        let model = OpenAI::builder("sk-test")
            .base_url(url)
            .embedding_model("nomic-embed-text")
            .embedding_dimensions(2)
            .no_retry()
            .build()
            .unwrap();

        let vectors = model
            .embed_batch(&["solar".to_string(), "wind".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(model.name(), "nomic-embed-text");

        let bodies = server.await.unwrap();
        let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["input"], serde_json::json!(["solar", "wind"]));
        assert!(sent.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let model = client("http://127.0.0.1:9");
        assert!(model.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(model.dim(), 1536);
        assert_eq!(model.name(), EMBEDDING_SMALL);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let (url, _server) =
            serve(vec![(200, r#"{"data":[{"index":0,"embedding":[1.0]}]}"#.into())]).await;
        let err = client(&url).embed("solar").await.unwrap_err();
        assert!(matches!(
            err.downcast::<OpenAIError>().unwrap(),
            OpenAIError::InvalidConfig(_)
        ));
    }

    #[test]
    fn shortened_models_request_dimensions() {
        let model = OpenAI::builder("sk-test")
            .embedding_model("text-embedding-3-large")
            .embedding_dimensions(256)
            .build()
            .unwrap();
        assert_eq!(model.requested_dimensions(), Some(256));
        assert_eq!(client("http://localhost").requested_dimensions(), None);
    }
}
