//! Reference Documents
//!
//! Market reports loaded from a local directory (PDF, text or markdown),
//! chunked, and searched by embedding similarity when an embedding model
//! is available, by term overlap otherwise. Retrieved chunks are "stuffed"
//! into a single prompt so the LLM can answer from them.

mod embedding;
mod retrieval;
mod splitter;

pub use embedding::EmbeddingIndex;
pub use retrieval::{ScoredChunk, TermIndex};
pub use splitter::TextSplitter;

use serde::Serialize;
use std::path::{Path, PathBuf};

use agent_core::{GenerationOptions, LlmProvider, Message};

use crate::error::{AdvisorError, Result};

/// Chunks handed to the model per question
pub const DEFAULT_TOP_K: usize = 2;

pub const NO_DOCUMENTS_ANSWER: &str = "No reference documents are available.";
pub const NO_MATCH_ANSWER: &str = "The reference documents do not cover this question.";

const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "md", "markdown"];

#[derive(Clone, Debug, Serialize)]
pub struct Chunk {
    /// File name the chunk came from
    pub source: String,
    pub index: usize,
    pub text: String,
}

/// Answer from the reports plus the files its excerpts came from
#[derive(Clone, Debug, Serialize)]
pub struct ReportAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

impl ReportAnswer {
    fn without_sources(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Loaded and chunked documents
#[derive(Debug, Default)]
pub struct DocumentStore {
    sources: Vec<String>,
    index: TermIndex,
    embeddings: Option<EmbeddingIndex>,
    top_k: usize,
}

impl DocumentStore {
    pub fn empty() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            ..Self::default()
        }
    }

    /// Build a store from `(source, text)` pairs
    pub fn from_texts<I, S, T>(texts: I, splitter: &TextSplitter) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut sources = Vec::new();
        let mut chunks = Vec::new();

        for (source, text) in texts {
            let source = source.into();
            chunks.extend(
                splitter
                    .split(text.as_ref())
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| Chunk {
                        source: source.clone(),
                        index,
                        text,
                    }),
            );
            sources.push(source);
        }

        Self {
            sources,
            index: TermIndex::new(chunks),
            embeddings: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Read every supported file directly inside `dir`.
    ///
    /// A missing directory gives an empty store; unreadable files
    /// (including PDFs without extractable text) are skipped with a
    /// warning.
    pub async fn load_dir(dir: impl AsRef<Path>, splitter: &TextSplitter) -> Result<Self> {
        let dir = dir.as_ref();

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %dir.display(), "Documents directory not found; search disabled");
                return Ok(Self::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let supported = extension(&path)
                .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
            if supported && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut texts = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match read_document(&path).await {
                Ok(text) => texts.push((name, text)),
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        let store = Self::from_texts(texts, splitter);
        tracing::info!(
            documents = store.document_count(),
            chunks = store.chunk_count(),
            "Loaded reference documents"
        );
        Ok(store)
    }

    /// Embed every chunk with `model` so searches rank by similarity.
    ///
    /// On failure the store is left as it was and keeps term search.
    pub async fn embed(&mut self, provider: &dyn LlmProvider, model: &str) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = self.index.chunks().iter().map(|c| c.text.clone()).collect();
        let index = EmbeddingIndex::build(provider, model, &texts).await?;

        tracing::info!(model, chunks = index.len(), "Embedded reference documents");
        self.embeddings = Some(index);
        Ok(())
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn document_count(&self) -> usize {
        self.sources.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embedding model in use, `None` when searching by terms
    pub fn embedding_model(&self) -> Option<&str> {
        self.embeddings.as_ref().map(EmbeddingIndex::model)
    }

    /// Best chunks for `query`.
    ///
    /// Uses the embedding index when present; a failed query embedding
    /// falls back to term overlap for this search.
    pub async fn retrieve<'a>(&'a self, query: &str, provider: &dyn LlmProvider) -> Vec<ScoredChunk<'a>> {
        if let Some(embeddings) = &self.embeddings {
            match embeddings.top_k(provider, query, self.top_k).await {
                Ok(ranked) => {
                    return ranked
                        .into_iter()
                        .filter(|(_, score)| *score > 0.0)
                        .filter_map(|(i, score)| {
                            self.index.chunks().get(i).map(|chunk| ScoredChunk { chunk, score })
                        })
                        .collect();
                }
                Err(e) => tracing::warn!(error = %e, "Query embedding failed; using term search"),
            }
        }

        self.index.top_k(query, self.top_k)
    }

    /// Answer `query` from the best matching chunks
    pub async fn search(
        &self,
        query: &str,
        provider: &dyn LlmProvider,
        options: &GenerationOptions,
    ) -> Result<ReportAnswer> {
        if self.is_empty() {
            return Ok(ReportAnswer::without_sources(NO_DOCUMENTS_ANSWER));
        }
        if query.trim().is_empty() {
            return Err(AdvisorError::Document("empty search query".into()));
        }

        let hits = self.retrieve(query, provider).await;
        if hits.is_empty() {
            tracing::debug!(query, "No chunk matches the query");
            return Ok(ReportAnswer::without_sources(NO_MATCH_ANSWER));
        }

        let mut sources: Vec<String> = Vec::new();
        for hit in &hits {
            if !sources.contains(&hit.chunk.source) {
                sources.push(hit.chunk.source.clone());
            }
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Use the following excerpts from market reports to answer the question at the end. \
             If the excerpts do not contain the answer, say that you don't know instead of \
             making one up.\n\n{context}\n\nQuestion: {query}\nAnswer:"
        );

        let completion = provider.complete(&[Message::user(prompt)], options).await?;
        Ok(ReportAnswer {
            answer: completion.content.trim().to_string(),
            sources,
        })
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

async fn read_document(path: &Path) -> Result<String> {
    if extension(path).as_deref() != Some("pdf") {
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let bytes = tokio::fs::read(path).await?;
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AdvisorError::Document(format!("PDF reader failed: {e}")))?
        .map_err(|e| AdvisorError::Document(format!("PDF text extraction failed: {e}")))?;

    if text.trim().is_empty() {
        return Err(AdvisorError::Document("PDF has no extractable text".into()));
    }
    Ok(text)
}
