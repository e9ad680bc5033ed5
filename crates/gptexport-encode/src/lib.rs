//! Conversation model and document encoders.
//!
//! A [`Conversation`] is read from the page (ChatGPT's conversation JSON),
//! filtered by the requested message kinds, and rendered to bytes by the
//! [`Encoder`] selected for the requested [`ExportFormat`].

pub mod conversation;
pub mod encoder;
pub mod html;
pub mod json;
pub mod pdf;
pub mod text;

pub use conversation::{parse_conversation, suggested_filename, Conversation, Message, Role};
pub use encoder::{encoder_for, render, EncodeError, Encoder};
pub use gptexport_protocol::ExportFormat;
