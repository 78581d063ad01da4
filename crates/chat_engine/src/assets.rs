use bytes::Bytes;
use futures_util::future::try_join_all;
use url::Url;
use worker_logging::worker_info;

use crate::transport::{FetchOptions, Transport};
use crate::{FailureKind, FetchError};

/// Where the model's files live and which of them to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub base_url: String,
    pub model_id: String,
    pub revision: String,
    pub files: Vec<String>,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            base_url: "https://huggingface.co".to_string(),
            model_id: "HuggingFaceTB/SmolLM-360M-Instruct".to_string(),
            revision: "main".to_string(),
            files: vec![
                "config.json".to_string(),
                "generation_config.json".to_string(),
                "tokenizer.json".to_string(),
                "tokenizer_config.json".to_string(),
                "onnx/model_q4.onnx".to_string(),
            ],
        }
    }
}

impl ModelSource {
    /// `{base}/{model}/resolve/{revision}/{file}`
    pub fn asset_url(&self, file: &str) -> Result<String, FetchError> {
        let base = self.base_url.trim_end_matches('/');
        let raw = format!("{base}/{}/resolve/{}/{file}", self.model_id, self.revision);
        let url = Url::parse(&raw)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{raw}: {err}")))?;
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    pub file: String,
    pub url: String,
    pub bytes: Bytes,
}

/// Fetches every file of `source` concurrently. The first failure aborts the rest.
pub async fn fetch_assets(
    transport: &dyn Transport,
    source: &ModelSource,
) -> Result<Vec<ModelAsset>, FetchError> {
    worker_info!(
        "Fetching {} assets for {}@{}",
        source.files.len(),
        source.model_id,
        source.revision
    );
    let options = FetchOptions::default();
    let fetches = source.files.iter().map(|file| {
        let options = &options;
        async move {
            let url = source.asset_url(file)?;
            let response = transport.fetch(&url, options).await?;
            let bytes = response.bytes().await?;
            Ok::<_, FetchError>(ModelAsset {
                file: file.clone(),
                url,
                bytes,
            })
        }
    });
    try_join_all(fetches).await
}
