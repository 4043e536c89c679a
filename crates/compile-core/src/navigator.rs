//! Navigator: stepping through messages and jumping to their source locations.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;

use tracing::debug;

use crate::buffer::{BufferHandle, SourceFiles};
use crate::directory::DirectoryFrame;
use crate::driver::ParseDriver;
use crate::error::{LocationError, NavigationError, NoMoreMessages};
use crate::location::{FileId, FileSpec, LocId, LocationCache};
use crate::message::{Message, Severity};

/// Direction of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards later output.
    Forward,
    /// Towards earlier output.
    Backward,
}

/// Which messages a step may land on, and how columns are counted on a jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationConfig {
    /// Messages below this severity are skipped.
    pub skip_threshold: Severity,
    /// Skip messages whose location was already visited.
    pub skip_visited: bool,
    /// Columns count display cells rather than chars.
    pub screen_columns: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            skip_threshold: Severity::Warning,
            skip_visited: false,
            screen_columns: true,
        }
    }
}

/// Where a jump lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTarget {
    /// Start offset of the message jumped to.
    pub message: usize,
    /// The source buffer.
    pub buffer: BufferHandle,
    /// Path the buffer visits.
    pub path: PathBuf,
    /// Char offset of the location in the buffer.
    pub position: usize,
    /// End of the location's range, for messages that carry one.
    pub range_end: Option<usize>,
}

/// The "current message" cursor of one session.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    config: NavigationConfig,
    current: Option<usize>,
}

impl Navigator {
    /// A navigator with no current message.
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// The step and jump settings.
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Change the step and jump settings.
    pub fn set_config(&mut self, config: NavigationConfig) {
        self.config = config;
    }

    /// Start offset of the current message.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Make the message starting at `start` current (for example after a click on it).
    pub fn set_current(&mut self, start: Option<usize>) {
        self.current = start;
    }

    /// Forget the current message.
    pub fn reset(&mut self) {
        self.current = None;
    }

    fn eligible(&self, message: &Message, cache: &LocationCache) -> bool {
        message.severity >= self.config.skip_threshold
            && !(self.config.skip_visited
                && cache.loc(message.loc).is_some_and(|loc| loc.visited()))
    }

    /// Move across `n` eligible messages (backwards if `n < 0`); returns the new current one.
    ///
    /// With `require_new_file`, every hop must land in a file other than the one it leaves.
    /// Without a current message a forward walk starts before the first message and a backward
    /// walk after the last. On failure the current message is unchanged.
    pub fn step(
        &mut self,
        n: isize,
        require_new_file: bool,
        driver: &ParseDriver,
        cache: &LocationCache,
    ) -> Result<usize, NavigationError> {
        let messages = driver.message_map();
        if !messages.values().any(|m| self.eligible(m, cache)) {
            return Err(NavigationError::NoMoreMessages(NoMoreMessages::NoneRecorded));
        }
        if n == 0 {
            return self
                .current
                .filter(|start| messages.contains_key(start))
                .ok_or(NavigationError::NoMoreMessages(NoMoreMessages::NoneRecorded));
        }

        let direction = if n > 0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let mut position = self.current;
        let mut last_file = position
            .and_then(|start| messages.get(&start))
            .map(|m| file_key(m, cache));
        for _ in 0..n.unsigned_abs() {
            let accept = |m: &&Message| {
                self.eligible(m, cache)
                    && !(require_new_file
                        && last_file.as_ref().is_some_and(|last| *last == file_key(m, cache)))
            };
            let found = match direction {
                Direction::Forward => following(messages, position).find(accept),
                Direction::Backward => preceding(messages, position).rev().find(accept),
            };
            let Some(message) = found else {
                return Err(NavigationError::NoMoreMessages(NoMoreMessages::NoFurther {
                    direction,
                }));
            };
            position = Some(message.start());
            last_file = Some(file_key(message, cache));
        }
        self.current = position;
        Ok(position.unwrap_or_default())
    }

    /// Forget the current message and step to the first eligible one.
    pub fn first(
        &mut self,
        driver: &ParseDriver,
        cache: &LocationCache,
    ) -> Result<usize, NavigationError> {
        let saved = self.current.take();
        self.step(1, false, driver, cache).inspect_err(|_| self.current = saved)
    }

    /// Resolve the message starting at `start` to a source position and make it current.
    ///
    /// The location is marked visited. A message whose file was flushed since parsing is
    /// interned again from its textual location first.
    pub fn goto<S: SourceFiles + ?Sized>(
        &mut self,
        start: usize,
        driver: &mut ParseDriver,
        cache: &mut LocationCache,
        sources: &mut S,
    ) -> Result<JumpTarget, NavigationError> {
        let message = driver
            .message(start)
            .ok_or(NavigationError::UnknownMessage(start))?;
        let (file, loc, end_loc) = if cache.loc(message.loc).is_some() {
            (message.file, message.loc, message.end_loc)
        } else {
            let relocated = reintern(message, driver, cache)?;
            driver.relocate(start, relocated.0, relocated.1, relocated.2);
            relocated
        };

        let screen_columns = self.config.screen_columns;
        let position = cache.materialize_marker(loc, sources, screen_columns)?;
        let range_end = end_loc.and_then(|end| {
            cache
                .materialize_marker(end, sources, screen_columns)
                .ok()
        });
        cache.mark_visited(loc)?;

        let file_struct = cache.file(file).ok_or(LocationError::StaleLocation)?;
        let buffer = file_struct.buffer().ok_or(LocationError::StaleLocation)?;
        let path = file_struct.path().to_path_buf();
        debug!(message = start, path = %path.display(), position, "jump to message");
        self.current = Some(start);
        Ok(JumpTarget {
            message: start,
            buffer,
            path,
            position,
            range_end,
        })
    }
}

fn following(
    messages: &BTreeMap<usize, Message>,
    after: Option<usize>,
) -> impl Iterator<Item = &Message> {
    let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
    messages.range((lower, Bound::Unbounded)).map(|(_, m)| m)
}

fn preceding(
    messages: &BTreeMap<usize, Message>,
    before: Option<usize>,
) -> impl DoubleEndedIterator<Item = &Message> {
    let upper = before.map_or(Bound::Unbounded, Bound::Excluded);
    messages.range((Bound::Unbounded, upper)).map(|(_, m)| m)
}

/// Path of the file a message points into; messages parsed before and after a flush of the same
/// file compare equal.
fn file_key(message: &Message, cache: &LocationCache) -> PathBuf {
    match cache.file(message.file) {
        Some(file) => file.path().to_path_buf(),
        None => cache.logical_path(&FileSpec::new(
            message.location.filename.clone(),
            message.location.directory.clone(),
        )),
    }
}

fn reintern(
    message: &Message,
    driver: &ParseDriver,
    cache: &mut LocationCache,
) -> Result<(FileId, LocId, Option<LocId>), LocationError> {
    let location = &message.location;
    let formats = message
        .rule
        .as_deref()
        .and_then(|name| driver.rules().lookup(name))
        .map(|rule| rule.formats().to_vec())
        .unwrap_or_default();
    let spec = FileSpec::new(location.filename.clone(), location.directory.clone());
    let file = cache.intern(&spec, &DirectoryFrame::root(), &formats);
    let loc = cache.get_or_create_loc(file, location.line, location.column)?;
    let end_loc = if location.end_line.is_some() || location.end_column.is_some() {
        Some(cache.get_or_create_loc(
            file,
            location.end_line.or(location.line),
            location.end_column,
        )?)
    } else {
        None
    };
    cache.retain(file);
    debug!(filename = %location.filename, "re-interned flushed location");
    Ok((file, loc, end_loc))
}
