//! # docrag
//!
//! A document-grounded retrieval backend for conversational assistants.
//!
//! docrag ingests user-uploaded documents (PDF, DOCX, plain text), splits
//! them into overlapping chunks, embeds each chunk, and retrieves the most
//! relevant chunks at chat time to augment the assistant's system prompt
//! (retrieval-augmented generation).
//!
//! ## Architecture
//!
//! ```text
//! upload ──▶ extract ──▶ chunk ──▶ embed ──▶ vector index
//!                                               │      ▲
//!                          catalog ◀── register ┘      │
//!                                                      │
//! chat ──▶ embed(query) ──▶ query ──▶ rank ──▶ compose ┘──▶ completion API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunker |
//! | [`extract`] | PDF/DOCX/plain-text extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index trait + SQLite / in-memory backends |
//! | [`catalog`] | In-memory document registry |
//! | [`retrieve`] | Retrieval planning |
//! | [`compose`] | Prompt-context assembly |
//! | [`engine`] | Pipeline orchestration |
//! | [`error`] | Pipeline error taxonomy |
//! | [`chat`] | Streaming completion client |
//! | [`server`] | HTTP API server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod chat;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod server;
