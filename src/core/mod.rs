pub mod chat_stream;
pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod message;
pub mod session;
pub mod state;
pub mod store;
pub mod text_wrapping;
