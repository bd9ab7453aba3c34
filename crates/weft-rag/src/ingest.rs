//! A ready-made chunk, embed and upsert workflow.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use weft_schema::Schema;
use weft_step::{BoxError, Step, StepContext, typed};
use weft_workflow::{Workflow, WorkflowError};

use crate::document::{Chunk, Chunker, Document, Metadata};
use crate::embed::{EmbedOptions, Embedder, Embedding, embed_with_retries};
use crate::error::RagError;
use crate::store::VectorStore;

/// Where and how an ingest workflow stores its vectors.
#[derive(Debug, Clone)]
pub struct IngestConfig {
  pub index: String,
  pub embed: EmbedOptions,
  /// Create the index on first upsert, sized to the embeddings.
  pub create_index: bool,
}

impl IngestConfig {
  pub fn new(index: impl Into<String>) -> Self {
    Self {
      index: index.into(),
      embed: EmbedOptions::default(),
      create_index: true,
    }
  }

  pub fn with_embed_options(mut self, embed: EmbedOptions) -> Self {
    self.embed = embed;
    self
  }
}

/// The collaborators an ingest workflow runs against.
#[derive(Clone)]
pub struct IngestServices {
  pub chunker: Arc<dyn Chunker>,
  pub embedder: Arc<dyn Embedder>,
  pub store: Arc<dyn VectorStore>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Chunked {
  chunks: Vec<Chunk>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Embedded {
  chunks: Vec<Chunk>,
  embeddings: Vec<Embedding>,
}

/// Output of an ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingested {
  pub index: String,
  pub ids: Vec<String>,
}

fn metadata_schema() -> Schema {
  Schema::object().passthrough().into()
}

fn chunks_schema() -> Schema {
  Schema::array(
    Schema::object()
      .field("text", Schema::string())
      .optional("metadata", metadata_schema())
      .into(),
  )
}

fn embedded_schema() -> Schema {
  Schema::object()
    .field("chunks", chunks_schema())
    .field("embeddings", Schema::array(Schema::array(Schema::number())))
    .into()
}

fn document_schema() -> Schema {
  Schema::object()
    .field("text", Schema::string())
    .optional("metadata", metadata_schema())
    .into()
}

/// Build a workflow that takes `{text, metadata?}` and runs three steps:
///
/// 1. `chunk`: split the document with the chunker
/// 2. `embed`: embed every chunk, retrying per `config.embed`
/// 3. `upsert`: store the vectors with each chunk's text and metadata
///
/// The run's output is `{index, ids}`.
pub fn ingest_workflow(
  name: impl Into<String>,
  services: IngestServices,
  config: IngestConfig,
) -> Result<Workflow, WorkflowError> {
  let IngestServices {
    chunker,
    embedder,
    store,
  } = services;

  let chunk = Step::new(
    "chunk",
    document_schema(),
    Schema::object().field("chunks", chunks_schema()),
    typed(move |document: Document, _ctx: StepContext| {
      chunk_document(chunker.clone(), document)
    }),
  )
  .with_description("Split the document into chunks");

  let embed_options = config.embed.clone();
  let embed = Step::new(
    "embed",
    Schema::object().field("chunks", chunks_schema()),
    embedded_schema(),
    typed(move |input: Chunked, ctx: StepContext| {
      embed_chunks(embedder.clone(), embed_options.clone(), input, ctx)
    }),
  )
  .with_description("Embed each chunk");

  let index = config.index.clone();
  let create_index = config.create_index;
  let upsert = Step::new(
    "upsert",
    embedded_schema(),
    Schema::object()
      .field("index", Schema::string())
      .field("ids", Schema::array(Schema::string())),
    typed(move |input: Embedded, _ctx: StepContext| {
      upsert_chunks(store.clone(), index.clone(), create_index, input)
    }),
  )
  .with_description("Store the vectors");

  Workflow::new(name, document_schema()).then_all([chunk, embed, upsert])
}

async fn chunk_document(chunker: Arc<dyn Chunker>, document: Document) -> Result<Chunked, BoxError> {
  let chunks = chunker.chunk(&document).await?;
  Ok(Chunked { chunks })
}

async fn embed_chunks(
  embedder: Arc<dyn Embedder>,
  options: EmbedOptions,
  input: Chunked,
  ctx: StepContext,
) -> Result<Embedded, BoxError> {
  let texts: Vec<String> = input.chunks.iter().map(|c| c.text.clone()).collect();
  let embeddings = embed_with_retries(embedder.as_ref(), &texts, &options, &ctx.cancel).await?;
  Ok(Embedded {
    chunks: input.chunks,
    embeddings,
  })
}

async fn upsert_chunks(
  store: Arc<dyn VectorStore>,
  index: String,
  create_index: bool,
  input: Embedded,
) -> Result<Ingested, BoxError> {
  // Nothing to store, and no vector to size a new index from.
  if input.embeddings.is_empty() {
    return Ok(Ingested {
      index,
      ids: Vec::new(),
    });
  }

  if create_index {
    if let Some(first) = input.embeddings.first() {
      match store.create_index(&index, first.len()).await {
        Ok(()) | Err(RagError::IndexExists { .. }) => {}
        Err(e) => return Err(e.into()),
      }
    }
  }

  // Keep the chunk text next to its vector.
  let metadata: Vec<Metadata> = input
    .chunks
    .into_iter()
    .map(|chunk| {
      let mut metadata = chunk.metadata;
      metadata.insert("text".to_string(), chunk.text.into());
      metadata
    })
    .collect();
  let ids = store.upsert(&index, input.embeddings, metadata).await?;
  Ok(Ingested { index, ids })
}
