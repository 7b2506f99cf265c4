//! CADS: checksum algorithm discovery through exhaustive expression search.
//!
//! Given a small labeled corpus of `(packet bytes, expected checksum)`
//! examples, CADS searches the space of short symbolic expressions over
//! packet byte fields and a fixed operator library, and returns every
//! expression that reproduces the expected checksum for **every** example.
//!
//! The crate provides:
//! - The operator library (`ops`)
//! - The parallel search engine (`search`)
//! - Packet dataset loading (`dataset`)
//! - Search configuration and `.cads` files (`config`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use cads::config::SearchConfig;
//! use cads::dataset::{Dataset, Packet};
//! use cads::ops::Complexity;
//! use cads::search::run_search;
//!
//! let dataset = Dataset::new(vec![
//!     Packet::new(vec![0x9C, 0x30, 0x01], 0x31, 1, "CH1").unwrap(),
//!     Packet::new(vec![0x9C, 0x30, 0x05], 0x35, 1, "CH5").unwrap(),
//! ])
//! .unwrap();
//!
//! let config = SearchConfig {
//!     complexity: Complexity::Basic,
//!     max_fields: 2,
//!     max_constants: 4,
//!     ..SearchConfig::default()
//! };
//!
//! let outcome = run_search(&dataset, &config, None).unwrap();
//! assert!(outcome.solutions.iter().any(|s| s.field_indices == [1, 2]));
//! ```

pub mod config;
pub mod dataset;
pub mod ops;
pub mod search;

#[cfg(feature = "cli")]
pub mod cli;
