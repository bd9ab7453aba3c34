//! Weft RAG
//!
//! Collaborators for retrieval-augmented generation pipelines, and a
//! [`Workflow`](weft_workflow::Workflow) that wires them together:
//!
//! ```text
//! {text, metadata?} ──► chunk ──► embed (bounded retries) ──► upsert ──► {index, ids}
//!                        │           │                          │
//!                     Chunker     Embedder                 VectorStore
//! ```
//!
//! [`ParagraphChunker`] and [`MemoryVectorStore`] are in-process
//! implementations. Embedding providers are supplied by the caller.

mod document;
mod embed;
mod error;
mod ingest;
mod store;

pub use document::{Chunk, ChunkOptions, Chunker, Document, Metadata, ParagraphChunker};
pub use embed::{EmbedOptions, Embedder, Embedding, embed_with_retries};
pub use error::RagError;
pub use ingest::{IngestConfig, IngestServices, Ingested, ingest_workflow};
pub use store::{MemoryVectorStore, QueryResult, VectorStore};
