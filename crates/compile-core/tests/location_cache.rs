use std::fs;
use std::path::PathBuf;

use compile_core::{
    DirectoryFrame, FileSpec, LocationCache, LocationError, SourceBuffers, SourceFiles,
};
use pretty_assertions::assert_eq;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::create_dir_all(dir.path().join("include")).unwrap();
    fs::write(dir.path().join("src/a.c"), "int a;\n\tint b;\nint c;\n").unwrap();
    fs::write(dir.path().join("include/defs.h"), "#define X 1\n").unwrap();
    fs::write(dir.path().join("main.c"), "int main;\n").unwrap();
    dir
}

#[test]
fn test_relative_spellings_of_one_file_coalesce() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path());
    let src = DirectoryFrame::root().push("src");

    let a = cache.intern(&FileSpec::bare("a.c"), &src, &[]);
    let b = cache.intern(&FileSpec::bare("./src/../src/a.c"), &DirectoryFrame::root(), &[]);
    let absolute = dir.path().join("src/a.c");
    let c = cache.intern(
        &FileSpec::bare(absolute.to_string_lossy().into_owned()),
        &DirectoryFrame::root(),
        &[],
    );
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert!(cache.file(a).unwrap().exists());

    cache.get_or_create_loc(a, Some(1), None).unwrap();
    cache.get_or_create_loc(b, Some(3), Some(2)).unwrap();
    assert_eq!(cache.file(a).unwrap().loc_count(), 2);
}

#[test]
fn test_search_path_and_formats() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path())
        .with_search_path(vec![None, Some(PathBuf::from("include"))]);
    let root = DirectoryFrame::root();

    let defs = cache.intern(&FileSpec::bare("defs.h"), &root, &[]);
    assert_eq!(
        cache.file(defs).unwrap().path(),
        dir.path().join("include/defs.h")
    );

    let main = cache.intern(
        &FileSpec::bare("main"),
        &root,
        &["%s".to_string(), "%s.c".to_string()],
    );
    assert_eq!(cache.file(main).unwrap().path(), dir.path().join("main.c"));
    assert!(cache.file(main).unwrap().exists());

    let missing = cache.intern(&FileSpec::bare("gone.c"), &root, &[]);
    assert!(!cache.file(missing).unwrap().exists());
    assert_eq!(cache.file(missing).unwrap().path(), dir.path().join("gone.c"));
}

#[test]
fn test_markers_are_placed_for_every_loc_of_the_file() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path());
    let mut sources = SourceBuffers::new();
    let file = cache.intern(&FileSpec::bare("src/a.c"), &DirectoryFrame::root(), &[]);
    let first = cache.get_or_create_loc(file, Some(1), Some(5)).unwrap();
    let tabbed = cache.get_or_create_loc(file, Some(2), Some(9)).unwrap();
    let past_end = cache.get_or_create_loc(file, Some(40), None).unwrap();

    assert_eq!(cache.materialize_marker(first, &mut sources, true), Ok(4));
    assert!(cache.loc(tabbed).unwrap().marker().is_some());
    assert!(cache.loc(past_end).unwrap().marker().is_some());
    assert_eq!(cache.materialize_marker(tabbed, &mut sources, true), Ok(8));
    assert_eq!(cache.materialize_marker(past_end, &mut sources, true), Ok(22));

    let buffer = cache.file(file).unwrap().buffer().unwrap();
    assert_eq!(sources.marker_position(cache.loc(first).unwrap().marker().unwrap()), Some(4));
    sources.kill(buffer);
    assert_eq!(cache.materialize_marker(first, &mut sources, true), Ok(4));
}

#[test]
fn test_file_created_after_interning_is_found_on_navigation() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path())
        .with_search_path(vec![None, Some(PathBuf::from("include"))]);
    let file = cache.intern(&FileSpec::bare("late.h"), &DirectoryFrame::root(), &[]);
    let loc = cache.get_or_create_loc(file, Some(1), None).unwrap();
    assert!(!cache.file(file).unwrap().exists());

    let mut sources = SourceBuffers::new();
    assert!(matches!(
        cache.materialize_marker(loc, &mut sources, true),
        Err(LocationError::LocationUnresolved { .. })
    ));

    fs::write(dir.path().join("include/late.h"), "x\n").unwrap();
    assert_eq!(cache.materialize_marker(loc, &mut sources, true), Ok(0));
    assert_eq!(
        cache.file(file).unwrap().path(),
        dir.path().join("include/late.h")
    );
}

#[test]
fn test_sweep_reclaims_unreferenced_files() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path());
    let root = DirectoryFrame::root();
    let kept = cache.intern(&FileSpec::bare("main.c"), &root, &[]);
    let dropped = cache.intern(&FileSpec::bare("src/a.c"), &root, &[]);
    let loc = cache.get_or_create_loc(dropped, Some(1), None).unwrap();
    cache.retain(kept);
    cache.retain(dropped);
    cache.release(dropped);

    assert_eq!(cache.sweep(), 1);
    assert!(cache.file(kept).is_some());
    assert!(cache.file(dropped).is_none());
    assert!(cache.loc(loc).is_none());
    assert_eq!(
        cache.get_or_create_loc(dropped, Some(1), None),
        Err(LocationError::StaleLocation)
    );

    let again = cache.intern(&FileSpec::bare("src/a.c"), &root, &[]);
    assert_ne!(again, dropped);
}

#[test]
fn test_flush_by_spec() {
    let dir = project();
    let mut cache = LocationCache::new(dir.path());
    let file = cache.intern(&FileSpec::bare("main.c"), &DirectoryFrame::root(), &[]);
    cache.get_or_create_loc(file, Some(1), None).unwrap();
    assert!(cache.flush(&FileSpec::bare("main.c")));
    assert!(!cache.flush(&FileSpec::bare("main.c")));
    assert_eq!(cache.loc_count(), 0);
}
