pub mod decoder;

pub use decoder::{DecodeState, DecodedStream, StreamDecoder};
