//! This module splits long text into overlapping, fixed-size fragments for use
//! within a RAG (Retrieval Augmented Generation) pipeline.
//!
//! Downstream chat models have bounded context windows, so a document corpus is
//! cut into fragments small enough to be injected into a system prompt. Adjacent
//! fragments share `overlap` characters so that a sentence falling on a boundary
//! is still visible in one piece to at least one fragment.
//!
//! The module defines three items:
//! - [`Chunker`]: holds the validated `chunk_size` / `overlap` pair and performs
//!   the split.
//! - [`Fragment`]: an immutable slice of the source text with its ordinal and an
//!   optional originating document identifier.
//! - [`ChunkError`]: rejection of parameters that would never terminate.
//!
//! # Geometry
//!
//! Sizes are counted in characters (Unicode scalar values), never bytes, so a
//! fragment boundary can't split a multi-byte code point. Fragment `i` starts at
//! character `i * (chunk_size - overlap)`. Splitting stops at the first fragment
//! that reaches the end of the text; the last fragment may be shorter than
//! `chunk_size`.
//!
//! ```
//! use scout_ai_context::text::Chunker;
//!
//! let chunker = Chunker::new(4, 1).unwrap();
//! let fragments = chunker.chunk("ABCDEFGHIJ");
//!
//! let texts: Vec<&str> = fragments.iter().map(|f| f.text()).collect();
//! assert_eq!(texts, vec!["ABCD", "DEFG", "GHIJ"]);
//! assert_eq!(fragments[2].ordinal(), 2);
//! ```
//!
//! # Reconstruction
//!
//! Every fragment after the first repeats the previous fragment's last `overlap`
//! characters. Dropping those characters and concatenating yields the original
//! text exactly:
//!
//! ```
//! use scout_ai_context::text::Chunker;
//!
//! let chunker = Chunker::new(10, 3).unwrap();
//! let text = "Always be prepared: pack water, a map and a whistle.";
//! let fragments = chunker.chunk(text);
//!
//! let mut rebuilt = fragments[0].text().to_string();
//! for fragment in &fragments[1..] {
//!     rebuilt.extend(fragment.text().chars().skip(chunker.overlap()));
//! }
//! assert_eq!(rebuilt, text);
//! ```
use serde::{Deserialize, Serialize};

/// Default fragment length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default number of characters shared by adjacent fragments.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Errors raised when a [`Chunker`] is configured with unusable parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// A zero-length fragment can never advance through the text.
    #[error("chunk size must be positive")]
    ZeroChunkSize,

    /// The cursor step `chunk_size - overlap` would be zero or negative.
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// A bounded slice of source text produced by chunking.
///
/// Fragments are created once by a [`Chunker`] and never mutated afterwards;
/// fields are private and only exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    ordinal: usize,
}

impl Fragment {
    /// Creates a fragment. Used by the chunker and by loaders of persisted stores.
    pub fn new(text: impl Into<String>, document: Option<String>, ordinal: usize) -> Self {
        Self {
            text: text.into(),
            document,
            ordinal,
        }
    }

    /// The raw text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Identifier of the document this fragment was cut from, if known.
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Position of this fragment within the chunking call that produced it (0-indexed).
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits text into overlapping fixed-size [`Fragment`]s.
///
/// The parameters are validated once in [`Chunker::new`], so every call to
/// [`Chunker::chunk`] is guaranteed to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Creates a chunker, rejecting `chunk_size == 0` and `overlap >= chunk_size`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scout_ai_context::text::{ChunkError, Chunker};
    ///
    /// assert!(Chunker::new(512, 50).is_ok());
    /// assert_eq!(Chunker::new(0, 0), Err(ChunkError::ZeroChunkSize));
    /// assert_eq!(
    ///     Chunker::new(100, 100),
    ///     Err(ChunkError::OverlapTooLarge { chunk_size: 100, overlap: 100 })
    /// );
    /// ```
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in characters between the starts of two adjacent fragments.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of fragments [`Chunker::chunk`] produces for a text of `char_len` characters.
    ///
    /// This is `ceil((char_len - overlap) / step)` for texts longer than the
    /// overlap, one for any shorter non-empty text, and zero for empty text.
    pub fn fragment_count(&self, char_len: usize) -> usize {
        if char_len == 0 {
            return 0;
        }
        char_len
            .saturating_sub(self.overlap)
            .div_ceil(self.step())
            .max(1)
    }

    /// Splits `text` into fragments with no originating document.
    pub fn chunk(&self, text: &str) -> Vec<Fragment> {
        self.chunk_document(text, None)
    }

    /// Splits `text` into fragments tagged with `document`.
    ///
    /// Empty text yields no fragments. The result is a pure function of the
    /// inputs.
    pub fn chunk_document(&self, text: &str, document: Option<&str>) -> Vec<Fragment> {
        // Byte offset of every character start, followed by the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut fragments = Vec::with_capacity(self.fragment_count(char_len));
        let mut start = 0;
        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            fragments.push(Fragment::new(
                &text[boundaries[start]..boundaries[end]],
                document.map(str::to_owned),
                fragments.len(),
            ));
            if end == char_len {
                break;
            }
            start += self.step();
        }

        fragments
    }
}
