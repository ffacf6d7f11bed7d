//! Kilnchat is a terminal chat client for a cement plant engineering
//! assistant backed by remote LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state, expertise-role handling, prompt
//!   construction, reply formatting, configuration, and API-key
//!   resolution.
//! - [`api`] defines the chat payloads and the swappable model-call
//!   boundary implemented by the HTTP client.
//! - [`auth`] keeps user accounts, the current-session pointer, and the
//!   one-time-code verifier used during sign-in.
//! - [`history`] persists per-user conversations as a bounded,
//!   most-recent-first collection.
//! - [`storage`] is the key-value persistence boundary with file-backed
//!   and in-memory bindings.
//! - [`cli`] parses arguments and runs the interactive chat loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod history;
pub mod storage;
pub mod utils;
