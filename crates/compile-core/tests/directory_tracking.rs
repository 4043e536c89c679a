use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compile_core::{
    CompilationConfig, CompilationSession, DirectoryTracker, LocationCache, OutputLog, ParseDriver,
    RuleSet, SourceBuffers,
};
use pretty_assertions::assert_eq;

fn resolved_paths(working_dir: &Path, text: &str) -> Vec<PathBuf> {
    let mut cache = LocationCache::new(working_dir);
    let mut log = OutputLog::from_text(text);
    let mut driver = ParseDriver::new(Arc::new(RuleSet::builtin().unwrap()));
    driver.ensure_parsed(text.chars().count(), &mut log, &mut cache);
    driver
        .messages()
        .map(|m| cache.file(m.file).unwrap().path().to_path_buf())
        .collect()
}

#[test]
fn test_entering_a_relative_directory() {
    let paths = resolved_paths(
        Path::new("/work"),
        "make: Entering directory 'sub'\na.c:3: error: bad\n",
    );
    assert_eq!(paths, vec![PathBuf::from("/work/sub/a.c")]);
}

#[test]
fn test_nested_directories_and_leaving() {
    let text = "make[1]: Entering directory '/src/lib'\n\
                x.c:1: error: in lib\n\
                make[2]: Entering directory 'util'\n\
                y.c:2: error: in util\n\
                make[2]: Leaving directory 'util'\n\
                z.c:3: error: back in lib\n\
                make[1]: Leaving directory '/src/lib'\n\
                w.c:4: error: top level\n";
    let paths = resolved_paths(Path::new("/work"), text);
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/src/lib/x.c"),
            PathBuf::from("/src/lib/util/y.c"),
            PathBuf::from("/src/lib/z.c"),
            PathBuf::from("/work/w.c"),
        ]
    );
}

#[test]
fn test_quote_styles() {
    let text = "make: Entering directory `/a'\n\
                p.c:1: error: x\n\
                make: Entering directory \u{2018}/b\u{2019}\n\
                q.c:1: error: y\n";
    let paths = resolved_paths(Path::new("/work"), text);
    assert_eq!(paths, vec![PathBuf::from("/a/p.c"), PathBuf::from("/b/q.c")]);
}

#[test]
fn test_existing_file_in_entered_directory_is_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/a.c"), "int x;\n").unwrap();

    let mut cache = LocationCache::new(dir.path());
    let mut log = OutputLog::from_text("make: Entering directory 'sub'\na.c:1: error: bad\n");
    let mut driver = ParseDriver::new(Arc::new(RuleSet::builtin().unwrap()));
    driver.ensure_parsed(log.text().len(), &mut log, &mut cache);

    let message = driver.messages().next().unwrap();
    let file = cache.file(message.file).unwrap();
    assert!(file.exists());
    assert_eq!(file.path(), dir.path().join("sub/a.c"));
    assert_eq!(message.location.directory, Some(PathBuf::from("sub")));
}

#[test]
fn test_directory_events_are_rewound_with_the_cursor() {
    let mut cache = LocationCache::new("/work");
    let mut log = OutputLog::from_text("make: Entering directory '/one'\na.c:1: error: x\n");
    let mut driver = ParseDriver::new(Arc::new(RuleSet::builtin().unwrap()));
    driver.ensure_parsed(log.text().len(), &mut log, &mut cache);
    assert_eq!(driver.tracker().event_count(), 1);

    log.delete(0..log.text().chars().count());
    log.append("make: Entering directory '/two'\na.c:1: error: x\n");
    driver.flush_from(0, &mut cache);
    driver.ensure_parsed(log.text().len(), &mut log, &mut cache);
    assert_eq!(driver.tracker().event_count(), 1);
    let message = driver.messages().next().unwrap();
    assert_eq!(
        cache.file(message.file).unwrap().path(),
        Path::new("/two/a.c")
    );
}

#[test]
fn test_custom_directory_pattern_from_config() {
    let config = CompilationConfig::from_yaml(
        "working_directory: /work\n\
         directory_pattern: '^(?:cd (?P<dir>\\S+)|(?P<leave>popd))$'\n",
    )
    .unwrap();
    let rules = Arc::new(config.rule_set().unwrap());
    let mut session = CompilationSession::from_config(
        &config,
        rules,
        OutputLog::from_text("cd lib\na.c:1: error: x\npopd\nb.c:2: error: y\n"),
        SourceBuffers::new(),
    )
    .unwrap();
    session.parse_all();
    let paths: Vec<PathBuf> = session
        .messages()
        .filter_map(|m| session.file_path(m).map(Path::to_path_buf))
        .collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("/work/lib/a.c"), PathBuf::from("/work/b.c")]
    );

    assert!(DirectoryTracker::with_pattern("(unclosed").is_err());
}
