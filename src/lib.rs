//! # Content Index
//!
//! A rebuildable full-text index over a version-controlled content tree.
//!
//! Content files are discovered in a local checkout, built into content
//! items in parallel, upserted into a full-text engine under a stable
//! identity key, and published as an immutable in-memory snapshot that
//! queries read without locking.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Source gate│──▶│ Walk + build │──▶│ Index writer │──▶│  Engine   │
//! │ (git clone)│   │ (1 task/file)│   │ (keyed upsert│   │ SQLite FTS│
//! └────────────┘   └──────┬───────┘   └──────────────┘   └─────┬─────┘
//!                         │ atomic swap                        │
//!                         ▼                                    │
//!                  ┌──────────────┐      ┌──────────────┐      │
//!                  │   Snapshot   │◀─────│ Query service│◀─────┘
//!                  │  (ArcSwap)   │      │ date-sorted  │
//!                  └──────────────┘      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed pipeline errors |
//! | [`source`] | Content source gate and git fetch |
//! | [`builder`] | File → content item |
//! | [`identity`] | Identity keys for upserts |
//! | [`engine`] | Full-text engine trait and backends |
//! | [`writer`] | Engine document projection and batch upsert |
//! | [`scan`] | Eligible file discovery and served paths |
//! | [`events`] | Rebuild lifecycle notifications |
//! | [`service`] | Live snapshot owner |
//! | [`rebuild`] | Rebuild orchestration |
//! | [`search`] | Paginated queries |
//! | [`trigger`] | Coalescing rebuild triggers |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod builder;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod migrate;
pub mod models;
pub mod rebuild;
pub mod scan;
pub mod search;
pub mod service;
pub mod source;
pub mod trigger;
pub mod writer;

pub use service::IndexService;
