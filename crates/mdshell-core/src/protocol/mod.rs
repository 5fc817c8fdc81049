//! Protocol module containing the bridge message types and the JSON codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_renderer_message, encode_shell_message, ProtocolError};
pub use messages::*;
pub use sequence::SequenceCounter;
