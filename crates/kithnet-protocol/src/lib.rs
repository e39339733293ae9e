//! Wire protocol for the Kithnet social-graph service.
//!
//! Every message in either direction is one frame: a `u32` big-endian
//! ciphertext length followed by exactly that many ciphertext bytes.
//! The ciphertext decrypts to a UTF-8 JSON object — a [`Request`]
//! tagged on `action` or a [`Response`] tagged on `status`.
//!
//! # Modules
//!
//! - [`message`] — the closed request/response unions and per-action
//!   body types, decoded once at the protocol boundary
//! - [`framing`] — the async length-prefixed frame codec
//!
//! [`Request`]: message::Request
//! [`Response`]: message::Response

pub mod framing;
pub mod message;

pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use message::{decode_request, Request, Response, ResponseBody};
