#![deny(missing_docs)]
//! The textual protocol spoken between a synapse agent and a language model.
//!
//! Every model reply is a sequence of [`Operation`]s, each written as
//! `CODE: content<END>` where `CODE` is one of `THT`, `ACT`, `ANS`, `OBS`
//! or `ERR`. The model emits thoughts, actions and answers; the engine
//! replies with observations and errors.
//!
//! [`TextCodec`] implements the wire format behind the [`ProtocolCodec`]
//! trait so the engine never depends on a particular encoding.

pub mod codec;
pub mod operation;

pub use codec::{
    END_MARKER, INVALID_ACTION, INVALID_CODE, NO_MATCH, ProtocolCodec, TextCodec,
    UnparsedReplyPolicy,
};
pub use operation::{OpCode, Operation, parse_action};
