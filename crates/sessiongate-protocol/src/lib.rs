//! Wire protocol for Sessiongate.
//!
//! This crate defines what a caller and the dispatch pipeline exchange:
//!
//! - **Types** ([`Request`], [`Response`], [`Status`], [`DetachedRequest`],
//!   [`ResponseBody`]): the envelopes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   text and back, plus [`render`], which decides between inline text and
//!   a file attachment.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding or
//!   encoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (raw bytes) → Protocol (Request / Response) → Dispatcher (sessions, handlers)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec, decode_request, decode_response, decode_text, encode_response, render};
pub use error::ProtocolError;
pub use types::{BinaryFile, DetachedRequest, Request, Response, ResponseBody, Status};
