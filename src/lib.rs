//! # Impact Rating
//!
//! Tracks training impact studies and scores them with an Impact Rating (IR)
//! built on the Kirkpatrick four-level evaluation model.
//!
//! ## Features
//!
//! - **Impact Rating**: weighted aggregation of 1-5 survey ratings per
//!   Kirkpatrick level onto a 1-10 score, with a narrative insight
//! - **Typed survey payloads**: questions and answers are decoded and
//!   validated once, at the boundary
//! - **Study workflow**: invitations, share tokens, response submission with
//!   best-effort recomputation of rating and completion
//! - **Portfolio summary**: average, median, and range of ratings across studies
//!
//! ## Architecture
//!
//! ```text
//! CLI → ImpactService → Storage (SQLite)
//!             ↓
//!       rating (pure)
//! ```
//!
//! ## Example
//!
//! ```
//! use impact_rating::rating::{classify_insight, compute_impact_rating};
//! use impact_rating::survey::{ResponseData, SurveyQuestion};
//!
//! let questions = vec![
//!     SurveyQuestion::new("Level 1: Reaction", "How satisfied were you?"),
//!     SurveyQuestion::new("Level 3: Behavior", "Do you apply what you learned?"),
//! ];
//! let responses = vec![ResponseData::from(["5 - Strongly Agree", "3"])];
//!
//! let score = compute_impact_rating(&responses, &questions);
//! assert_eq!(score, Some(7.3));
//! assert!(classify_insight(7.3).starts_with("Strong impact"));
//! ```

#![warn(missing_docs)]

/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Impact Rating computation and portfolio metrics.
pub mod rating;
/// Study workflows over a storage backend.
pub mod service;
/// SQLite storage layer for persistence.
pub mod storage;
/// Survey questions and response payloads.
pub mod survey;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use rating::{classify_insight, compute_impact_rating, ImpactRating};
pub use service::ImpactService;
