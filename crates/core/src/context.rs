//! The context manager: turns the rendered text into the id sequence the
//! scorer sees, enforcing the context cap with a recency bias.

use crate::codec::Codec;
use crate::error::CoreError;

/// The (possibly truncated) id sequence for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    pub ids: Vec<u32>,
    /// Id count after truncation.
    pub len: usize,
    /// True when the encoding exceeded the cap and only the tail was kept.
    pub truncated: bool,
}

/// Encode `text` and keep at most the **last** `cap` ids.
///
/// The earliest ids are the ones dropped: recent context matters more than
/// the beginning of the document. Empty text is a valid cold start and
/// yields an empty window, not an error.
pub fn prepare(text: &str, codec: &dyn Codec, cap: usize) -> Result<ContextWindow, CoreError> {
    let mut ids = codec.encode(text)?;
    let truncated = ids.len() > cap;
    if truncated {
        ids.drain(..ids.len() - cap);
    }
    let len = ids.len();
    Ok(ContextWindow {
        ids,
        len,
        truncated,
    })
}
