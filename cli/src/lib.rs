//! Command-line front end for ragbot.
//!
//! The `ragbot` binary maintains a knowledge base of PDF locations, builds a
//! persisted hybrid index from it and answers questions in a terminal chat.
//!
//! # Usage
//!
//! ```bash
//! RAGBOT_API_KEY=xxx cargo run -p ragbot-cli -- add https://example.org/report.pdf
//! RAGBOT_API_KEY=xxx cargo run -p ragbot-cli -- build
//! RAGBOT_API_KEY=xxx cargo run -p ragbot-cli -- chat
//! RAGBOT_API_KEY=xxx cargo run -p ragbot-cli -- ask-pdf ./paper.pdf
//! ```

mod remote;

pub use remote::{RemotePdfLoader, is_remote};
