//! Response decoder module
//!
//! Supports: JSON, JSONL
//!
//! # Overview
//!
//! The decode module turns raw response bodies into record sequences.
//! The JSON decoder can extract records from a nested location using a
//! configured record path.

mod decoders;
mod types;

pub(crate) use decoders::build_decoder;
pub use decoders::{JsonDecoder, JsonlDecoder};
pub use types::{DecoderConfig, DecoderFormat, RecordDecoder};
