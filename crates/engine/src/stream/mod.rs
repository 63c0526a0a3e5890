//! Byte stream to event record pipeline.

pub mod decoder;
pub mod ndjson;

pub use decoder::ChunkDecoder;
pub use ndjson::{LineOutcome, parse_event_line};
