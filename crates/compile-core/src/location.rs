//! Location Cache (file-structure tree).
//!
//! Every file referenced by the output gets one [`FileStruct`], however many spellings the
//! output uses for it. A file owns an ordered tree of [`Loc`]s (by line, then column, unknown
//! first), and each `Loc` lazily gets a marker in the source buffer the first time it is
//! navigated to.
//!
//! Files and locs live in generation-indexed slabs. Messages hold [`FileId`]/[`LocId`] handles
//! and retain their file; [`LocationCache::sweep`] reclaims files nothing refers to anymore.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::arena::{Arena, RawId};
use crate::buffer::{BufferHandle, MarkerId, SourceFiles};
use crate::directory::DirectoryFrame;
use crate::error::LocationError;

/// The filename format every rule implicitly uses.
pub const DEFAULT_FORMAT: &str = "%s";

/// Handle to a [`FileStruct`] in a [`LocationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(RawId);

/// Handle to a [`Loc`] in a [`LocationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocId(RawId);

/// A file name as written in the output, with the directory it is relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSpec {
    /// File name (absolute or relative).
    pub filename: String,
    /// Directory for a relative `filename`; `None` defers to the directory stack and search
    /// path.
    pub directory: Option<PathBuf>,
}

impl FileSpec {
    /// Create a file spec.
    pub fn new(filename: impl Into<String>, directory: Option<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            directory,
        }
    }

    /// A file spec without a directory.
    pub fn bare(filename: impl Into<String>) -> Self {
        Self::new(filename, None)
    }
}

type LocTree = BTreeMap<Option<usize>, BTreeMap<Option<usize>, LocId>>;

/// Everything known about one referenced file.
#[derive(Debug)]
pub struct FileStruct {
    spec: FileSpec,
    formats: Vec<String>,
    path: PathBuf,
    exists: bool,
    lines: LocTree,
    buffer: Option<BufferHandle>,
    refs: usize,
}

impl FileStruct {
    /// The spec this file was first interned with; its directory is absolute.
    pub fn spec(&self) -> &FileSpec {
        &self.spec
    }

    /// Alternate filename formats tried when searching.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Resolved path, or the best-effort logical path if no file was found.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` named an existing file when it was resolved.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The source buffer, once one was opened.
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Number of live messages referring to this file.
    pub fn refs(&self) -> usize {
        self.refs
    }

    /// Number of locs.
    pub fn loc_count(&self) -> usize {
        self.lines.values().map(BTreeMap::len).sum()
    }

    /// Locs in line order, then column order; unknown line/column first.
    pub fn locs(&self) -> impl Iterator<Item = LocId> + '_ {
        self.lines.values().flat_map(|columns| columns.values().copied())
    }

    /// The loc at exactly `(line, column)`.
    pub fn find_loc(&self, line: Option<usize>, column: Option<usize>) -> Option<LocId> {
        self.lines.get(&line)?.get(&column).copied()
    }

    /// The nearest known line at or before `line`.
    pub fn line_at_or_before(&self, line: usize) -> Option<usize> {
        self.lines.range(..=Some(line)).next_back().and_then(|(l, _)| *l)
    }
}

/// A position within a file, shared by every message that names it.
#[derive(Debug, Clone)]
pub struct Loc {
    file: FileId,
    line: Option<usize>,
    column: Option<usize>,
    marker: Option<MarkerId>,
    visited: bool,
}

impl Loc {
    /// Owning file.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// 1-based line.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// 1-based column.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Source-buffer marker, once materialized.
    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    /// Whether the loc was navigated to.
    pub fn visited(&self) -> bool {
        self.visited
    }
}

/// Canonical store of referenced files and their locations, one per compilation session.
#[derive(Debug)]
pub struct LocationCache {
    files: Arena<FileStruct>,
    locs: Arena<Loc>,
    by_spec: HashMap<(String, Option<PathBuf>), FileId>,
    by_path: HashMap<PathBuf, FileId>,
    search_path: Vec<Option<PathBuf>>,
    working_dir: PathBuf,
}

impl LocationCache {
    /// A cache resolving relative names against `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            files: Arena::default(),
            locs: Arena::default(),
            by_spec: HashMap::new(),
            by_path: HashMap::new(),
            search_path: vec![None],
            working_dir: working_dir.into(),
        }
    }

    /// Set the search path; `None` entries mean the working directory.
    pub fn with_search_path(mut self, search_path: Vec<Option<PathBuf>>) -> Self {
        self.search_path = search_path;
        self
    }

    /// The working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The search path.
    pub fn search_path(&self) -> &[Option<PathBuf>] {
        &self.search_path
    }

    /// Return the file for `spec`, creating it if no equivalent spec was seen before.
    ///
    /// A relative name resolves against the spec's directory, else the directory of `frame`,
    /// then each search path entry, trying `formats` in turn. The first existing file wins;
    /// if none exists, the name joined onto the first candidate directory is used as a logical
    /// path so later spellings of the same file still coalesce.
    pub fn intern(&mut self, spec: &FileSpec, frame: &DirectoryFrame, formats: &[String]) -> FileId {
        let directory = self.base_directory(spec, frame);
        let key = (spec.filename.clone(), directory.clone());
        if let Some(&id) = self.by_spec.get(&key)
            && self.files.contains(id.0)
        {
            return id;
        }

        let (path, exists) = self.resolve(&spec.filename, directory.as_deref(), formats);
        let existing = self
            .by_path
            .get(&path)
            .copied()
            .filter(|id| self.files.contains(id.0));
        let id = match existing {
            Some(id) => id,
            None => {
                let formats = if formats.is_empty() {
                    vec![DEFAULT_FORMAT.to_string()]
                } else {
                    formats.to_vec()
                };
                let id = FileId(self.files.insert(FileStruct {
                    spec: FileSpec::new(spec.filename.clone(), directory),
                    formats,
                    path: path.clone(),
                    exists,
                    lines: BTreeMap::new(),
                    buffer: None,
                    refs: 0,
                }));
                debug!(filename = %spec.filename, path = %path.display(), exists, "new file structure");
                self.by_path.insert(path, id);
                id
            }
        };
        self.by_spec.insert(key, id);
        id
    }

    /// The file `spec` would intern to, without creating one.
    pub fn lookup(&self, spec: &FileSpec, frame: &DirectoryFrame) -> Option<FileId> {
        let directory = self.base_directory(spec, frame);
        let key = (spec.filename.clone(), directory.clone());
        if let Some(&id) = self.by_spec.get(&key)
            && self.files.contains(id.0)
        {
            return Some(id);
        }
        let (path, _) = self.resolve(&spec.filename, directory.as_deref(), &[]);
        self.by_path
            .get(&path)
            .copied()
            .filter(|id| self.files.contains(id.0))
    }

    /// The path `spec` resolves to, as [`LocationCache::intern`] would find it, without caching
    /// anything. Used to compare messages whose file structure was flushed.
    pub fn logical_path(&self, spec: &FileSpec) -> PathBuf {
        let directory = self.base_directory(spec, &DirectoryFrame::root());
        self.resolve(&spec.filename, directory.as_deref(), &[]).0
    }

    /// Return the loc at `(line, column)` in `file`, creating it if absent.
    pub fn get_or_create_loc(
        &mut self,
        file: FileId,
        line: Option<usize>,
        column: Option<usize>,
    ) -> Result<LocId, LocationError> {
        let file_struct = self
            .files
            .get_mut(file.0)
            .ok_or(LocationError::StaleLocation)?;
        if let Some(id) = file_struct.find_loc(line, column) {
            return Ok(id);
        }
        let id = LocId(self.locs.insert(Loc {
            file,
            line,
            column,
            marker: None,
            visited: false,
        }));
        file_struct
            .lines
            .entry(line)
            .or_default()
            .insert(column, id);
        Ok(id)
    }

    /// A file, if it is still cached.
    pub fn file(&self, id: FileId) -> Option<&FileStruct> {
        self.files.get(id.0)
    }

    /// A loc, if its file is still cached.
    pub fn loc(&self, id: LocId) -> Option<&Loc> {
        self.locs.get(id.0)
    }

    /// Every cached file.
    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileStruct)> {
        self.files.iter().map(|(id, file)| (FileId(id), file))
    }

    /// Number of cached files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of cached locs.
    pub fn loc_count(&self) -> usize {
        self.locs.len()
    }

    /// Current source-buffer position of `loc`.
    ///
    /// The first time any loc of a file is needed, the file's buffer is opened and markers are
    /// placed for all of its locs in one pass in line order. A file that cannot be found is
    /// offered to [`SourceFiles::prompt_for_file`]; if that fails too the result is
    /// [`LocationError::LocationUnresolved`].
    pub fn materialize_marker<S: SourceFiles + ?Sized>(
        &mut self,
        loc: LocId,
        sources: &mut S,
        screen_columns: bool,
    ) -> Result<usize, LocationError> {
        let entry = self.locs.get(loc.0).ok_or(LocationError::StaleLocation)?;
        if let Some(marker) = entry.marker
            && let Some(position) = sources.marker_position(marker)
        {
            return Ok(position);
        }

        let file = entry.file;
        let buffer = self.open_buffer(file, sources)?;
        self.place_markers(file, buffer, sources, screen_columns);

        let entry = self.locs.get(loc.0).ok_or(LocationError::StaleLocation)?;
        match entry.marker.and_then(|marker| sources.marker_position(marker)) {
            Some(position) => Ok(position),
            None => Err(self.unresolved(file)),
        }
    }

    fn open_buffer<S: SourceFiles + ?Sized>(
        &mut self,
        file: FileId,
        sources: &mut S,
    ) -> Result<BufferHandle, LocationError> {
        let file_struct = self.files.get(file.0).ok_or(LocationError::StaleLocation)?;
        if let Some(buffer) = file_struct.buffer
            && sources.offset_of(buffer, 1, None, false).is_some()
        {
            return Ok(buffer);
        }

        let filename = file_struct.spec.filename.clone();
        let mut path = file_struct.path.clone();
        if !file_struct.exists {
            let (found, exists) = self.resolve(
                &filename,
                file_struct.spec.directory.as_deref(),
                &file_struct.formats,
            );
            if exists {
                path = found;
            }
        }

        let opened = match sources.open_or_find(&path) {
            Some(buffer) => Some((buffer, path.clone())),
            None => sources
                .prompt_for_file(&filename, &path)
                .map(|answer| self.absolutize(&answer))
                .and_then(|answer| sources.open_or_find(&answer).map(|buffer| (buffer, answer))),
        };
        let Some((buffer, opened_path)) = opened else {
            warn!(filename = %filename, searched = %path.display(), "cannot find file");
            return Err(LocationError::LocationUnresolved {
                filename,
                searched: path,
            });
        };

        let previous = self.files.get(file.0).map(|f| f.path.clone());
        if previous.as_ref() != Some(&opened_path) {
            if let Some(previous) = previous {
                self.by_path.remove(&previous);
            }
            self.by_path.insert(opened_path.clone(), file);
        }
        if let Some(file_struct) = self.files.get_mut(file.0) {
            file_struct.path = opened_path;
            file_struct.exists = true;
            file_struct.buffer = Some(buffer);
        }
        Ok(buffer)
    }

    fn place_markers<S: SourceFiles + ?Sized>(
        &mut self,
        file: FileId,
        buffer: BufferHandle,
        sources: &mut S,
        screen_columns: bool,
    ) {
        let Some(file_struct) = self.files.get(file.0) else {
            return;
        };
        let ids: Vec<LocId> = file_struct.locs().collect();
        let mut placed = 0usize;
        for id in ids {
            let Some(loc) = self.locs.get_mut(id.0) else {
                continue;
            };
            if loc
                .marker
                .is_some_and(|marker| sources.marker_position(marker).is_some())
            {
                continue;
            }
            let Some(offset) =
                sources.offset_of(buffer, loc.line.unwrap_or(1), loc.column, screen_columns)
            else {
                continue;
            };
            loc.marker = Some(sources.create_marker(buffer, offset));
            placed += 1;
        }
        debug!(?file, placed, "materialized markers");
    }

    fn unresolved(&self, file: FileId) -> LocationError {
        match self.files.get(file.0) {
            Some(file_struct) => LocationError::LocationUnresolved {
                filename: file_struct.spec.filename.clone(),
                searched: file_struct.path.clone(),
            },
            None => LocationError::StaleLocation,
        }
    }

    /// Mark `loc` as navigated to.
    pub fn mark_visited(&mut self, loc: LocId) -> Result<(), LocationError> {
        let entry = self
            .locs
            .get_mut(loc.0)
            .ok_or(LocationError::StaleLocation)?;
        entry.visited = true;
        Ok(())
    }

    /// Drop the file `spec` names, with all its locs; returns whether one was cached.
    ///
    /// Used when a tool reports that it rewrote a file, so cached line numbers are stale.
    pub fn flush(&mut self, spec: &FileSpec) -> bool {
        match self.lookup(spec, &DirectoryFrame::root()) {
            Some(id) => self.flush_file(id),
            None => false,
        }
    }

    /// Drop `file` with all its locs; returns whether it was cached.
    pub fn flush_file(&mut self, file: FileId) -> bool {
        let Some(file_struct) = self.files.remove(file.0) else {
            return false;
        };
        for loc in file_struct.locs() {
            self.locs.remove(loc.0);
        }
        self.by_spec.retain(|_, id| *id != file);
        self.by_path.retain(|_, id| *id != file);
        debug!(path = %file_struct.path.display(), locs = file_struct.loc_count(), "flushed file structure");
        true
    }

    /// Record one more live reference to `file`.
    pub fn retain(&mut self, file: FileId) {
        if let Some(file_struct) = self.files.get_mut(file.0) {
            file_struct.refs += 1;
        }
    }

    /// Drop one live reference to `file`.
    pub fn release(&mut self, file: FileId) {
        if let Some(file_struct) = self.files.get_mut(file.0) {
            file_struct.refs = file_struct.refs.saturating_sub(1);
        }
    }

    /// Reclaim every file without live references; returns how many were dropped.
    pub fn sweep(&mut self) -> usize {
        let unreferenced: Vec<FileId> = self
            .files
            .iter()
            .filter(|(_, file)| file.refs == 0)
            .map(|(id, _)| FileId(id))
            .collect();
        for &id in &unreferenced {
            self.flush_file(id);
        }
        if !unreferenced.is_empty() {
            debug!(swept = unreferenced.len(), "swept file structures");
        }
        unreferenced.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.files.clear();
        self.locs.clear();
        self.by_spec.clear();
        self.by_path.clear();
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        normalize_path(&self.working_dir.join(path))
    }

    fn base_directory(&self, spec: &FileSpec, frame: &DirectoryFrame) -> Option<PathBuf> {
        spec.directory
            .as_deref()
            .or_else(|| frame.directory())
            .map(|dir| self.absolutize(dir))
    }

    fn resolve(&self, filename: &str, directory: Option<&Path>, formats: &[String]) -> (PathBuf, bool) {
        let names: Vec<String> = if formats.is_empty() {
            vec![filename.to_string()]
        } else {
            formats
                .iter()
                .map(|format| format.replacen("%s", filename, 1))
                .collect()
        };

        let mut dirs: Vec<PathBuf> = directory.map(Path::to_path_buf).into_iter().collect();
        dirs.extend(self.search_path.iter().map(|entry| match entry {
            Some(dir) => self.absolutize(dir),
            None => self.working_dir.clone(),
        }));

        for dir in &dirs {
            for name in &names {
                let candidate = normalize_path(&dir.join(name));
                if candidate.is_file() {
                    return (candidate, true);
                }
            }
        }

        let base = dirs.first().unwrap_or(&self.working_dir);
        (normalize_path(&base.join(filename)), false)
    }
}

/// Lexically normalize `path`: drop `.` components and fold `..` into its parent.
///
/// The file system is not consulted, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> LocationCache {
        LocationCache::new("/nonexistent/work")
    }

    #[test]
    fn normalize_folds_dot_components() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn same_spec_interns_once() {
        let mut cache = cache();
        let root = DirectoryFrame::root();
        let a = cache.intern(&FileSpec::bare("foo.c"), &root, &[]);
        let b = cache.intern(&FileSpec::bare("foo.c"), &root, &[]);
        assert_eq!(a, b);
        assert_eq!(cache.file_count(), 1);
        assert_eq!(
            cache.file(a).unwrap().path(),
            Path::new("/nonexistent/work/foo.c")
        );
        assert!(!cache.file(a).unwrap().exists());
    }

    #[test]
    fn different_spellings_of_a_missing_file_coalesce() {
        let mut cache = cache();
        let sub = DirectoryFrame::root().push("sub");
        let a = cache.intern(&FileSpec::bare("a.c"), &sub, &[]);
        let b = cache.intern(&FileSpec::bare("sub/./a.c"), &DirectoryFrame::root(), &[]);
        let c = cache.intern(&FileSpec::bare("/nonexistent/work/sub/a.c"), &sub, &[]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn locs_are_unique_and_ordered_with_unknown_first() {
        let mut cache = cache();
        let file = cache.intern(&FileSpec::bare("x.c"), &DirectoryFrame::root(), &[]);
        let l10 = cache.get_or_create_loc(file, Some(10), Some(5)).unwrap();
        let l2 = cache.get_or_create_loc(file, Some(2), None).unwrap();
        let none = cache.get_or_create_loc(file, None, None).unwrap();
        let l10b = cache.get_or_create_loc(file, Some(10), None).unwrap();
        assert_eq!(cache.get_or_create_loc(file, Some(10), Some(5)).unwrap(), l10);

        let order: Vec<LocId> = cache.file(file).unwrap().locs().collect();
        assert_eq!(order, vec![none, l2, l10b, l10]);
        assert_eq!(cache.file(file).unwrap().line_at_or_before(9), Some(2));
        assert_eq!(cache.loc_count(), 4);
    }

    #[test]
    fn flush_makes_ids_stale() {
        let mut cache = cache();
        let spec = FileSpec::bare("y.c");
        let file = cache.intern(&spec, &DirectoryFrame::root(), &[]);
        let loc = cache.get_or_create_loc(file, Some(1), None).unwrap();
        assert!(cache.flush(&spec));
        assert!(cache.file(file).is_none());
        assert!(cache.loc(loc).is_none());
        assert_eq!(
            cache.get_or_create_loc(file, Some(1), None),
            Err(LocationError::StaleLocation)
        );
        assert!(!cache.flush(&spec));

        let again = cache.intern(&spec, &DirectoryFrame::root(), &[]);
        assert_ne!(again, file);
    }

    #[test]
    fn sweep_reclaims_unreferenced_files() {
        let mut cache = cache();
        let root = DirectoryFrame::root();
        let kept = cache.intern(&FileSpec::bare("kept.c"), &root, &[]);
        let dropped = cache.intern(&FileSpec::bare("dropped.c"), &root, &[]);
        cache.retain(kept);
        cache.retain(dropped);
        cache.release(dropped);
        assert_eq!(cache.sweep(), 1);
        assert!(cache.file(kept).is_some());
        assert!(cache.file(dropped).is_none());
    }
}
