#![warn(missing_docs)]
//! Compile Core - Streaming Build-Output Parser and Cross-Reference Cache
//!
//! # Overview
//!
//! `compile-core` recognizes references to source locations (`file:line:column` plus severity)
//! in the free-form output of compilers, linters and test runners, as that output streams in.
//! It keeps a canonical cache of the files and locations referenced, and lets a user step
//! through the messages and jump to the source they point to, even after the source has been
//! edited.
//!
//! The crate is headless: it never owns the output or source buffers. An embedder provides
//! them through the [`OutputBuffer`] and [`SourceFiles`] traits; [`OutputLog`] and
//! [`SourceBuffers`] are in-memory implementations.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  CompilationSession                         │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Navigator (step / goto)                    │  ← Navigation
//! ├─────────────────────────────────────────────┤
//! │  ParseDriver (cursor, flush, annotations)   │  ← Incremental parsing
//! ├─────────────────────────────────────────────┤
//! │  Matcher + DirectoryTracker                 │  ← Recognition
//! ├─────────────────────────────────────────────┤
//! │  RuleSet (builtin catalog, YAML rules)      │  ← Grammar data
//! ├─────────────────────────────────────────────┤
//! │  LocationCache (files, locs, markers)       │  ← Cross-reference cache
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use compile_core::{CompilationSession, OutputLog, RuleSet, Severity, SourceBuffers};
//!
//! let rules = Arc::new(RuleSet::builtin().unwrap());
//! let mut session =
//!     CompilationSession::new(rules, OutputLog::new(), SourceBuffers::new(), "/project");
//!
//! session.append_output("foo.c:10:5: warning: unused variable 'x'\n");
//! session.parse_all();
//!
//! let message = session.next_message(1).unwrap();
//! assert_eq!(message.severity, Severity::Warning);
//! assert_eq!(message.location.line, Some(10));
//! assert_eq!(message.location.column, Some(5));
//! ```
//!
//! # Offsets
//!
//! Offsets are char offsets (Unicode scalar values) and ranges are half-open. Lines and columns
//! of locations are 1-based.
//!
//! # Module Description
//!
//! - [`rules`], [`builtin`] - Rule table and builtin catalog
//! - [`directory`] - Directory stack tracker
//! - [`matcher`] - Matcher engine
//! - [`location`] - Location cache
//! - [`driver`] - Incremental parse driver
//! - [`navigator`] - Message navigation
//! - [`session`] - Compilation session
//! - [`config`] - Session configuration

pub mod annotations;
mod arena;
pub mod buffer;
pub mod builtin;
pub mod columns;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod location;
pub mod matcher;
pub mod message;
pub mod navigator;
pub mod output_log;
pub mod rules;
pub mod session;
pub mod source_buffers;
mod text;

pub use annotations::{AnnotatedSpan, AnnotationIndex};
pub use buffer::{Annotation, BufferHandle, MarkerId, OutputBuffer, SourceFiles};
pub use builtin::builtin_rule_names;
pub use config::{CompilationConfig, FileTransformSpec};
pub use directory::{DEFAULT_DIRECTORY_PATTERN, DirectoryEvent, DirectoryFrame, DirectoryTracker};
pub use driver::ParseDriver;
pub use error::{ConfigError, LocationError, NavigationError, NoMoreMessages, RuleError};
pub use location::{FileId, FileSpec, FileStruct, Loc, LocId, LocationCache, normalize_path};
pub use matcher::{FileTransform, Matcher};
pub use message::{Highlight, Message, MessageLocation, Severity, SeverityCounts};
pub use navigator::{Direction, JumpTarget, NavigationConfig, Navigator};
pub use output_log::OutputLog;
pub use rules::{ComputedRole, GroupRole, HighlightRule, Rule, RuleSet, RuleSpec, SeverityRole};
pub use session::CompilationSession;
pub use source_buffers::SourceBuffers;
