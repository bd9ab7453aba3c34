//! Documents and chunking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RagError;

/// Metadata attached to documents, chunks and stored vectors.
pub type Metadata = Map<String, Value>;

/// A source text to be chunked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub text: String,
  #[serde(default)]
  pub metadata: Metadata,
}

impl Document {
  pub fn from_text(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      metadata: Metadata::new(),
    }
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }
}

/// A piece of a document, small enough to embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
  pub text: String,
  #[serde(default)]
  pub metadata: Metadata,
}

/// Splits a document into chunks.
#[async_trait]
pub trait Chunker: Send + Sync {
  async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>, RagError>;
}

/// Options for [`ParagraphChunker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOptions {
  /// Upper bound on a chunk's length, in characters.
  pub max_chars: usize,
  /// Separator between paragraphs.
  pub separator: String,
}

impl Default for ChunkOptions {
  fn default() -> Self {
    Self {
      max_chars: 512,
      separator: "\n\n".to_string(),
    }
  }
}

/// Packs consecutive paragraphs into chunks of at most `max_chars`
/// characters. A paragraph longer than the limit is split on character
/// boundaries.
///
/// Every chunk carries the document's metadata plus its `chunk_index`.
#[derive(Debug, Clone, Default)]
pub struct ParagraphChunker {
  options: ChunkOptions,
}

impl ParagraphChunker {
  pub fn new(options: ChunkOptions) -> Self {
    Self { options }
  }

  /// Chunk texts without attaching metadata.
  pub fn split(&self, text: &str) -> Vec<String> {
    let max = self.options.max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let paragraphs = text
      .split(self.options.separator.as_str())
      .map(str::trim)
      .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
      let needed = if current.is_empty() {
        paragraph.chars().count()
      } else {
        current.chars().count() + self.options.separator.chars().count() + paragraph.chars().count()
      };

      if needed <= max {
        if !current.is_empty() {
          current.push_str(&self.options.separator);
        }
        current.push_str(paragraph);
        continue;
      }

      if !current.is_empty() {
        chunks.push(std::mem::take(&mut current));
      }

      let chars: Vec<char> = paragraph.chars().collect();
      let mut pieces = chars.chunks(max).map(|piece| piece.iter().collect::<String>());
      // Leave the last piece open so a following short paragraph can join it.
      let mut last = pieces.next().unwrap_or_default();
      for piece in pieces {
        chunks.push(std::mem::replace(&mut last, piece));
      }
      current = last;
    }

    if !current.is_empty() {
      chunks.push(current);
    }
    chunks
  }
}

#[async_trait]
impl Chunker for ParagraphChunker {
  async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>, RagError> {
    Ok(
      self
        .split(&document.text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
          let mut metadata = document.metadata.clone();
          metadata.insert("chunk_index".to_string(), Value::from(index));
          Chunk { text, metadata }
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn chunker(max_chars: usize) -> ParagraphChunker {
    ParagraphChunker::new(ChunkOptions {
      max_chars,
      ..ChunkOptions::default()
    })
  }

  #[test]
  fn test_short_text_is_one_chunk() {
    assert_eq!(chunker(100).split("Your text content..."), vec!["Your text content..."]);
  }

  #[test]
  fn test_paragraphs_are_packed() {
    let text = "aaaa\n\nbbbb\n\ncccc";
    // "aaaa\n\nbbbb" is 10 chars.
    assert_eq!(chunker(10).split(text), vec!["aaaa\n\nbbbb", "cccc"]);
  }

  #[test]
  fn test_long_paragraph_is_split() {
    let chunks = chunker(4).split("abcdefghij");
    assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
  }

  #[test]
  fn test_blank_text_has_no_chunks() {
    assert!(chunker(10).split("  \n\n \n\n").is_empty());
  }

  #[test]
  fn test_multibyte_split_on_char_boundary() {
    let chunks = chunker(2).split("ééé");
    assert_eq!(chunks, vec!["éé", "é"]);
  }

  #[tokio::test]
  async fn test_chunks_carry_metadata() {
    let document = Document::from_text("one\n\ntwo").with_metadata("source", json!("notes.txt"));
    let chunks = chunker(3).chunk(&document).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].text, "two");
    assert_eq!(chunks[1].metadata["source"], "notes.txt");
    assert_eq!(chunks[1].metadata["chunk_index"], 1);
  }
}
