//! # dodona-annotations
//!
//! Annotation engine for Dodona code listings: linter findings, teacher
//! comments and student questions attached to lines of a submission, the
//! html they render to, and their reconciliation with the backend.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Annotation variants, identities and the factory building them from
/// server payloads
pub mod annotation;
/// Backend calls for user annotations, questions and saved annotations
pub mod client;
/// Environment-driven configuration and the shared HTTP client
pub mod config;
/// Error type of the library surface
pub mod error;
/// Inline create/edit form events and their handlers
pub mod form;
/// Localized strings
pub mod i18n;
/// Line-indexed annotation store
pub mod index;
/// The code listing aggregate
pub mod listing;
/// User-facing toasts and alerts
pub mod notice;
/// Wire formats exchanged with the backend
pub mod payload;
/// Html views of annotations
pub mod render;
/// Terminal overview tables
pub mod report;
/// Pluggable carrier of backend calls
pub mod transport;
/// Annotation types, groups, question states and line keys
pub mod types;

pub use annotation::{Annotation, AnnotationId, Counter, IdGenerator, SharedIds};
pub use client::{AnnotationClient, CreateMode, TransitionOutcome};
pub use error::{AnnotationError, Result};
pub use listing::{CodeListing, ListingOptions};
pub use transport::{HttpTransport, ScriptedTransport, Transport};
pub use types::{AnnotationType, Group, LineKey, QuestionState};
