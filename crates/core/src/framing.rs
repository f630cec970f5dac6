//! Tagged frames for the session, transport, network and link layers.
//!
//! Each layer wraps its payload in a text tag followed by a delimiter:
//!
//! # Frame Format
//!
//! ```text
//! +--------------+-----+------------------+
//! | TAG          | '|' | payload          |
//! | (variable)   |     | (variable)       |
//! +--------------+-----+------------------+
//! ```
//!
//! | Layer     | Tag       |
//! |-----------|-----------|
//! | Session   | `SESSION` |
//! | Transport | `TCP`     |
//! | Network   | `IP`      |
//! | Link      | `MAC`     |
//!
//! No tag contains the delimiter, so splitting at the first `|` is
//! unambiguous for a well-formed frame. The payload may contain `|`.
//!
//! # Corruption
//!
//! `remove` never fails: if channel noise destroyed every delimiter, the
//! input is passed through unchanged and the corruption surfaces further up
//! the stack. `remove_strict` is the stop-on-corruption variant.

use crate::error::FramingError;

/// Byte separating the tag from the payload.
pub const DELIMITER: u8 = b'|';

/// Which layer a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    Session,
    Transport,
    Network,
    Link,
}

impl FrameTag {
    pub const ALL: [FrameTag; 4] = [
        FrameTag::Session,
        FrameTag::Transport,
        FrameTag::Network,
        FrameTag::Link,
    ];

    /// Wire text of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            FrameTag::Session => "SESSION",
            FrameTag::Transport => "TCP",
            FrameTag::Network => "IP",
            FrameTag::Link => "MAC",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl std::fmt::Display for FrameTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prepend `tag || DELIMITER` to `payload`.
pub fn add(tag: FrameTag, payload: &[u8]) -> Vec<u8> {
    let header = tag.as_bytes();
    let mut frame = Vec::with_capacity(header.len() + 1 + payload.len());
    frame.extend_from_slice(header);
    frame.push(DELIMITER);
    frame.extend_from_slice(payload);
    frame
}

/// Strip everything up to and including the first delimiter.
///
/// Returns the input unchanged when no delimiter is present. The bytes
/// before the delimiter are not compared against `tag`.
pub fn remove(tag: FrameTag, framed: &[u8]) -> Vec<u8> {
    match split_at_delimiter(framed) {
        Some((_, payload)) => payload.to_vec(),
        None => {
            tracing::warn!(
                tag = tag.as_str(),
                len = framed.len(),
                "no delimiter in frame, passing payload through unchanged"
            );
            framed.to_vec()
        }
    }
}

/// Strip the frame header, verifying both the delimiter and the tag.
///
/// # Errors
/// - `FramingError::MissingDelimiter` if the frame has no delimiter
/// - `FramingError::TagMismatch` if the header is not `tag`
pub fn remove_strict(tag: FrameTag, framed: &[u8]) -> Result<Vec<u8>, FramingError> {
    let (header, payload) =
        split_at_delimiter(framed).ok_or(FramingError::MissingDelimiter { tag: tag.as_str() })?;

    if header != tag.as_bytes() {
        return Err(FramingError::TagMismatch {
            expected: tag.as_str(),
            actual: header.to_vec(),
        });
    }

    Ok(payload.to_vec())
}

fn split_at_delimiter(framed: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = framed.iter().position(|&b| b == DELIMITER)?;
    Some((&framed[..pos], &framed[pos + 1..]))
}
