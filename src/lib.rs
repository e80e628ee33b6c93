// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # fabula
//!
//! A knowledge base of factoids (subject, predicate, object, location, time)
//! extracted from short tagged narratives, validated against a remote
//! lexical-semantic network, generalized into category terms, and used to
//! predict the missing lines of partial stories by analogy.
//!
//! ## Architecture
//!
//! - **Semantic network** (`network`): cached client over the network's HTTP API
//! - **Knowledge store** (`store`): stories, deduplicated factoids, allow-lists
//! - **Consistency checker** (`checker`): may a story enter the store?
//! - **Generalizer** (`generalize`): concrete subjects → `(category)` terms
//! - **Predictor** (`predict`): fill blanks from similar stored stories
//!
//! ## Library usage
//!
//! ```no_run
//! use fabula::checker::Policy;
//! use fabula::config::FabulaConfig;
//! use fabula::engine::Engine;
//! use fabula::paths::DataLayout;
//!
//! let mut engine = Engine::open(DataLayout::rooted_at("kb"), FabulaConfig::default()).unwrap();
//! engine
//!     .import_text(
//!         "Repas\n[sujet] chat [predicat] manger [objet] croquettes\n[sujet] chat [predicat] dormir",
//!         &mut Policy::Force,
//!     )
//!     .unwrap();
//! let filled = engine
//!     .predict_missing(&["[sujet] chat [predicat] manger [objet] croquettes", "?"], false)
//!     .unwrap();
//! println!("{}", filled[0].render("?"));
//! ```

pub mod batch;
pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod factoid;
pub mod generalize;
pub mod import;
pub mod network;
pub mod paths;
pub mod predict;
pub mod store;
pub mod tagger;
