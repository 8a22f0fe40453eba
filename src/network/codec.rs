//! Binary codec for network message serialization.
//!
//! This module provides a centralized, optimized interface for encoding and decoding
//! network messages using bincode. It encapsulates the bincode configuration to ensure
//! consistent, deterministic serialization across the codebase.
//!
//! # Design Rationale
//!
//! - **Centralized Configuration**: The bincode config is defined once, avoiding
//!   repeated `bincode::config::standard().with_fixed_int_encoding()` calls.
//! - **Buffer Reuse**: Provides `encode_into` variants that write into existing
//!   buffers, reducing allocations in hot paths.
//! - **Clear Error Handling**: All functions return `Result` types with descriptive
//!   error variants.
//! - **Type Safety**: Generic over serde types, but specialized for our `Message` type.
//!
//! # Examples
//!
//! ```
//! use rollback_net::network::codec::{encode, decode, encode_into};
//!
//! // Encode any serializable type
//! let data: u32 = 42;
//! let bytes = encode(&data).expect("encoding should succeed");
//!
//! // Decode from bytes
//! let (decoded, _bytes_read): (u32, _) = decode(&bytes).expect("decoding should succeed");
//! assert_eq!(data, decoded);
//!
//! // Encode into a pre-allocated buffer (zero allocation)
//! let mut buffer = [0u8; 256];
//! let len = encode_into(&data, &mut buffer).expect("encoding should succeed");
//! let encoded_slice = &buffer[..len];
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

// The bincode configuration used throughout Fortress Rollback.
//
// We use `standard()` with `fixed_int_encoding()` for several reasons:
// - Fixed-size integers ensure deterministic message sizes (important for rollback)
// - Standard config is compatible with most platforms
// - No variable-length encoding overhead for small integers
//
// This is a zero-cost abstraction - the config is computed at compile time.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Errors that can occur during encoding or decoding.
#[derive(Debug)]
pub enum CodecError {
    /// The encoding operation failed.
    EncodeError(String),
    /// The decoding operation failed.
    DecodeError(String),
    /// The provided buffer was too small for encoding.
    BufferTooSmall {
        /// The required buffer size.
        required: usize,
        /// The actual buffer size provided.
        provided: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeError(msg) => write!(f, "encoding failed: {msg}"),
            Self::DecodeError(msg) => write!(f, "decoding failed: {msg}"),
            Self::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "buffer too small: needed {required} bytes, but only {provided} provided"
                )
            },
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value into a new `Vec<u8>`.
///
/// This is the simplest encoding function but allocates a new vector.
/// For hot paths where you have a reusable buffer, prefer [`encode_into`].
///
/// # Examples
///
/// ```
/// use rollback_net::network::codec::encode;
///
/// let data: u32 = 42;
/// let bytes = encode(&data).expect("encoding should succeed");
/// assert!(!bytes.is_empty());
/// ```
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config())
        .map_err(|e| CodecError::EncodeError(e.to_string()))
}

/// Encodes a value into an existing byte slice.
///
/// Returns the number of bytes written. This is more efficient than [`encode`]
/// when you have a pre-allocated buffer, as it avoids allocation.
///
/// # Errors
///
/// Returns [`CodecError::BufferTooSmall`] if the buffer is not large enough.
///
/// # Examples
///
/// ```
/// use rollback_net::network::codec::encode_into;
///
/// let data: u32 = 42;
/// let mut buffer = [0u8; 64];
/// let len = encode_into(&data, &mut buffer).expect("encoding should succeed");
/// assert!(len > 0);
/// assert!(len <= buffer.len());
/// ```
pub fn encode_into<T: Serialize>(value: &T, buffer: &mut [u8]) -> CodecResult<usize> {
    bincode::serde::encode_into_slice(value, buffer, config()).map_err(|e| {
        // Check if this is a buffer-too-small error
        let msg = e.to_string();
        if msg.contains("UnexpectedEnd") || msg.contains("not enough") {
            CodecError::BufferTooSmall {
                required: 0, // bincode doesn't tell us the required size
                provided: buffer.len(),
            }
        } else {
            CodecError::EncodeError(msg)
        }
    })
}

/// Encodes a value by appending to an existing `Vec<u8>`.
///
/// This is useful when building up a message incrementally. The vector
/// will be extended as needed.
///
/// # Examples
///
/// ```
/// use rollback_net::network::codec::encode_append;
///
/// let mut buffer = Vec::new();
/// encode_append(&42u32, &mut buffer).expect("encoding should succeed");
/// encode_append(&"hello", &mut buffer).expect("encoding should succeed");
/// assert!(!buffer.is_empty());
/// ```
pub fn encode_append<T: Serialize>(value: &T, buffer: &mut Vec<u8>) -> CodecResult<usize> {
    let start_len = buffer.len();
    bincode::serde::encode_into_std_write(value, buffer, config())
        .map(|_| buffer.len() - start_len)
        .map_err(|e| CodecError::EncodeError(e.to_string()))
}

/// Decodes a value from a byte slice.
///
/// Returns the decoded value and the number of bytes consumed.
///
/// # Examples
///
/// ```
/// use rollback_net::network::codec::{encode, decode};
///
/// let original: u32 = 42;
/// let bytes = encode(&original).expect("encoding should succeed");
/// let (decoded, bytes_read): (u32, _) = decode(&bytes).expect("decoding should succeed");
/// assert_eq!(original, decoded);
/// assert_eq!(bytes_read, bytes.len());
/// ```
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::DecodeError(e.to_string()))
}

/// Decodes a value from a byte slice, ignoring the bytes consumed.
///
/// This is a convenience function when you don't care about how many bytes were read.
///
/// # Examples
///
/// ```
/// use rollback_net::network::codec::{encode, decode_value};
///
/// let original: u32 = 42;
/// let bytes = encode(&original).expect("encoding should succeed");
/// let decoded: u32 = decode_value(&bytes).expect("decoding should succeed");
/// assert_eq!(original, decoded);
/// ```
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    decode(bytes).map(|(value, _)| value)
}
