//! # AI Bridge
//!
//! Glue between an editor host process and an AI chat backend.
//!
//! The bridge has two independent pipelines:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ SQLite store │──▶│  Normalizer   │──▶ { success, providers, count }
//! └──────────────┘   └──────────────┘
//!
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ stdin channel│──▶│   Resolver    │──▶│ Block builder │──▶ { success, blocks, count }
//! └──────────────┘   └──────────────┘   └──────────────┘
//!                          ▲
//!               legacy attachments file
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overlay |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Records, descriptors, content blocks, envelopes |
//! | [`db`] | Read-only SQLite connection |
//! | [`store`] | Provider row store |
//! | [`providers`] | Provider settings normalization |
//! | [`channel`] | Time-boxed stdin channel read |
//! | [`attachments`] | Attachment resolution |
//! | [`content`] | Content block construction |

pub mod attachments;
pub mod channel;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod store;
