//! Wallet challenge-response login handshake.
//!
//! - [`context`]: challenge parsed from the login page URL
//! - [`message`]: canonical message and proof query encoding
//! - [`machine`]: the state machine driving one login attempt

pub mod context;
pub mod machine;
pub mod message;

pub use self::context::ChallengeContext;
pub use self::machine::{
    HandshakeOptions, HandshakeState, HandshakeStatus, LoginHandshake, TransitionEvent,
};
pub use self::message::{MessageFormat, SignedProof, build_message, encode_proof};
