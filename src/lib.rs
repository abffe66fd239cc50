//! Nexchat is a terminal chat client for the Gemini `generateContent` API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation model, session persistence, the AI client
//!   and the controller that ties them together.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`api`] defines provider and relay payloads plus the HTTP transport seam.
//! - [`cli`] parses arguments and dispatches into the chat loop or one-shot
//!   commands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
