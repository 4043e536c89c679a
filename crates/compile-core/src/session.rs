//! One compilation session: an output buffer, its parse state and its navigation cursor.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::buffer::{OutputBuffer, SourceFiles};
use crate::config::CompilationConfig;
use crate::driver::ParseDriver;
use crate::error::{ConfigError, NavigationError};
use crate::location::{FileSpec, LocationCache};
use crate::message::{Message, SeverityCounts};
use crate::navigator::{JumpTarget, NavigationConfig, Navigator};
use crate::output_log::OutputLog;
use crate::rules::RuleSet;

/// Owns the [`LocationCache`], [`ParseDriver`] and [`Navigator`] of one output stream.
///
/// Rule tables are shared between sessions; caches never are.
#[derive(Debug)]
pub struct CompilationSession<B: OutputBuffer, S: SourceFiles> {
    output: B,
    sources: S,
    cache: LocationCache,
    driver: ParseDriver,
    navigator: Navigator,
}

impl<B: OutputBuffer, S: SourceFiles> CompilationSession<B, S> {
    /// A session with default settings resolving names against `working_dir`.
    pub fn new(
        rules: Arc<RuleSet>,
        output: B,
        sources: S,
        working_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        let mut cache = LocationCache::new(working_dir);
        let mut driver = ParseDriver::new(rules);
        driver.attach(&output, &mut cache);
        Self {
            output,
            sources,
            cache,
            driver,
            navigator: Navigator::new(NavigationConfig::default()),
        }
    }

    /// A session built from `config`, sharing `rules`.
    pub fn from_config(
        config: &CompilationConfig,
        rules: Arc<RuleSet>,
        output: B,
        sources: S,
    ) -> Result<Self, ConfigError> {
        let mut cache = config.location_cache();
        let mut driver = ParseDriver::new(rules)
            .with_directory_tracker(config.directory_tracker()?)
            .with_first_column(config.first_column)
            .with_file_transforms(config.file_transforms()?);
        driver.attach(&output, &mut cache);
        Ok(Self {
            output,
            sources,
            cache,
            driver,
            navigator: Navigator::new(config.navigation()),
        })
    }

    /// The output buffer.
    pub fn output(&self) -> &B {
        &self.output
    }

    /// The output buffer, for edits the caller reports through [`CompilationSession::on_edit`].
    pub fn output_mut(&mut self) -> &mut B {
        &mut self.output
    }

    /// The source collaborator.
    pub fn sources(&self) -> &S {
        &self.sources
    }

    /// The source collaborator, mutably.
    pub fn sources_mut(&mut self) -> &mut S {
        &mut self.sources
    }

    /// The location cache.
    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    /// The parse driver.
    pub fn driver(&self) -> &ParseDriver {
        &self.driver
    }

    /// The navigator.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// The navigator, mutably (to change its settings or current message).
    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    /// Parse the output up to `upto`; returns the number of new messages.
    pub fn ensure_parsed(&mut self, upto: usize) -> usize {
        self.driver
            .ensure_parsed(upto, &mut self.output, &mut self.cache)
    }

    /// Parse everything available.
    pub fn parse_all(&mut self) -> usize {
        let len = self.output.len_chars();
        self.ensure_parsed(len)
    }

    /// Tell the session whether the producing process has exited.
    pub fn set_process_finished(&mut self, finished: bool) {
        self.driver.set_process_finished(finished);
    }

    /// Report an edit of the output buffer at `offset`.
    pub fn on_edit(&mut self, offset: usize) {
        self.driver.flush_from(offset, &mut self.cache);
    }

    /// Messages parsed so far, in text order.
    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.driver.messages()
    }

    /// Error/warning/info totals of parsed messages.
    pub fn counts(&self) -> SeverityCounts {
        self.driver.counts()
    }

    /// Parse everything available, then step `n` messages.
    pub fn next_message(&mut self, n: isize) -> Result<&Message, NavigationError> {
        self.step(n, false)
    }

    /// Parse everything available, then step `n` times to a message in another file.
    pub fn next_file(&mut self, n: isize) -> Result<&Message, NavigationError> {
        self.step(n, true)
    }

    /// Parse everything available and make the first eligible message current.
    pub fn first_message(&mut self) -> Result<&Message, NavigationError> {
        self.parse_all();
        let start = self.navigator.first(&self.driver, &self.cache)?;
        self.driver
            .message(start)
            .ok_or(NavigationError::UnknownMessage(start))
    }

    fn step(&mut self, n: isize, require_new_file: bool) -> Result<&Message, NavigationError> {
        self.parse_all();
        let start = self
            .navigator
            .step(n, require_new_file, &self.driver, &self.cache)?;
        self.driver
            .message(start)
            .ok_or(NavigationError::UnknownMessage(start))
    }

    /// Jump to the message starting at `start`.
    pub fn goto(&mut self, start: usize) -> Result<JumpTarget, NavigationError> {
        self.navigator
            .goto(start, &mut self.driver, &mut self.cache, &mut self.sources)
    }

    /// Step `n` messages and jump to the one landed on.
    pub fn next_error(&mut self, n: isize) -> Result<JumpTarget, NavigationError> {
        let start = self.next_message(n)?.start();
        self.goto(start)
    }

    /// Drop the cached structure of a file the tool reports it rewrote.
    pub fn flush_file(&mut self, spec: &FileSpec) -> bool {
        self.cache.flush(spec)
    }

    /// Reclaim files no live message references.
    pub fn sweep(&mut self) -> usize {
        self.cache.sweep()
    }

    /// Resolved path of the file a message points into.
    pub fn file_path(&self, message: &Message) -> Option<&Path> {
        self.cache.file(message.file).map(|file| file.path())
    }
}

impl<S: SourceFiles> CompilationSession<OutputLog, S> {
    /// Append process output.
    pub fn append_output(&mut self, text: &str) -> usize {
        self.output.append(text)
    }

    /// Insert text anywhere; parse state before the insertion point is kept.
    pub fn insert_output(&mut self, offset: usize, text: &str) {
        self.on_edit(offset);
        self.output.insert(offset, text);
    }

    /// Delete a range; parse state before it is kept.
    pub fn delete_output(&mut self, range: Range<usize>) {
        self.on_edit(range.start);
        self.output.delete(range);
    }

    /// Remove the first `len` chars of output, keeping the messages after them.
    ///
    /// Files referenced only by removed messages are swept.
    pub fn trim_output(&mut self, len: usize) -> usize {
        let len = len.min(self.output.len_chars());
        self.driver.discard_before(len, &mut self.cache);
        self.output.clear_annotations(0..len);
        self.output.delete(0..len);
        self.driver.shift_back(len);
        if self
            .navigator
            .current()
            .is_some_and(|current| current < len)
        {
            self.navigator.reset();
        } else if let Some(current) = self.navigator.current() {
            self.navigator.set_current(Some(current - len));
        }
        self.cache.sweep()
    }
}
