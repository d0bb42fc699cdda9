//! Protocol module: envelope decoding, payload decoding and STOMP framing.

pub mod envelope;
pub mod payload;
pub mod stomp;

pub use envelope::{decode_envelope, DecodeError, Envelope};
pub use payload::{decode_markup, decode_structured, StructuredPayload};
pub use stomp::{decode_frame, encode_frame, StompCommand, StompError, StompFrame};
