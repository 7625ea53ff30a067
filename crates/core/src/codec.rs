use std::path::Path;

use thiserror::Error;
use tokenizers::Tokenizer;

/// Text ↔ token-id conversion supplied by the model backend.
///
/// Implementations must round-trip exactly: `decode(encode(text)) == text`,
/// with leading spaces, Unicode, and control characters preserved verbatim.
/// The step pipeline relies on this to keep the rendered text and the
/// reconstructed trace bit-for-bit identical.
pub trait Codec: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError>;

    fn decode(&self, ids: &[u32]) -> Result<String, CodecError>;

    /// Exact decoded text of a single token. Used for concatenation; the
    /// presentation form is derived separately via
    /// [`crate::display::token_display`].
    fn token_text(&self, id: u32) -> Result<String, CodecError> {
        self.decode(&[id])
    }

    fn vocab_size(&self) -> usize;
}

#[derive(Debug, Error)]
#[error("codec: {0}")]
pub struct CodecError(pub String);

/// Codec backed by a HuggingFace `tokenizer.json`.
pub struct TokenizerCodec {
    inner: Tokenizer,
}

impl TokenizerCodec {
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| CodecError(format!("tokenizer load: {e}")))?;
        Ok(Self { inner })
    }
}

impl Codec for TokenizerCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError> {
        // No special tokens: the context is exactly what the user sees.
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| CodecError(format!("encode: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, CodecError> {
        // skip_special_tokens=false keeps the decoded bytes verbatim.
        self.inner
            .decode(ids, false)
            .map_err(|e| CodecError(format!("decode: {e}")))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}
