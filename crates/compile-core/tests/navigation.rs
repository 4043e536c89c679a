use std::path::PathBuf;
use std::sync::Arc;

use compile_core::{
    CompilationSession, Direction, FileSpec, LocationError, NavigationConfig, NavigationError,
    NoMoreMessages, OutputLog, RuleSet, Severity, SourceBuffers,
};
use pretty_assertions::assert_eq;

const LOG: &str = "src/a.c:2:5: error: first\n\
                   src/a.c:3: note: context\n\
                   src/a.c:4:1: warning: second\n\
                   src/b.c:1: error: third\n\
                   src/b.c:2: note: more context\n\
                   src/c.c:9: error: missing file\n";

fn session() -> CompilationSession<OutputLog, SourceBuffers> {
    let mut sources = SourceBuffers::new();
    sources.open_with_text("/proj/src/a.c", "int a;\nint b = c;\nint d;\nint e;\n");
    sources.open_with_text("/proj/src/b.c", "one\ntwo\n");
    let mut session = CompilationSession::new(
        Arc::new(RuleSet::builtin().unwrap()),
        OutputLog::from_text(LOG),
        sources,
        "/proj",
    );
    session.parse_all();
    session
}

fn lines_visited(
    session: &mut CompilationSession<OutputLog, SourceBuffers>,
    require_new_file: bool,
) -> Vec<(String, Option<usize>)> {
    let mut seen = Vec::new();
    loop {
        let step = if require_new_file {
            session.next_file(1)
        } else {
            session.next_message(1)
        };
        match step {
            Ok(message) => seen.push((message.location.filename.clone(), message.location.line)),
            Err(_) => break,
        }
    }
    seen
}

#[test]
fn test_step_never_lands_below_the_threshold() {
    let mut session = session();
    let seen = lines_visited(&mut session, false);
    assert_eq!(
        seen,
        vec![
            ("src/a.c".to_string(), Some(2)),
            ("src/a.c".to_string(), Some(4)),
            ("src/b.c".to_string(), Some(1)),
            ("src/c.c".to_string(), Some(9)),
        ]
    );
    assert!(
        session
            .messages()
            .filter(|m| m.severity == Severity::Info)
            .count()
            > 0
    );
}

#[test]
fn test_info_threshold_includes_notes() {
    let mut session = session();
    session.navigator_mut().set_config(NavigationConfig {
        skip_threshold: Severity::Info,
        ..NavigationConfig::default()
    });
    assert_eq!(lines_visited(&mut session, false).len(), 6);
}

#[test]
fn test_require_new_file_lands_on_distinct_files() {
    let mut session = session();
    let seen = lines_visited(&mut session, true);
    let files: Vec<String> = seen.into_iter().map(|(file, _)| file).collect();
    assert_eq!(files, vec!["src/a.c", "src/b.c", "src/c.c"]);
}

#[test]
fn test_no_more_messages_distinguishes_empty_from_exhausted() {
    let mut empty = CompilationSession::new(
        Arc::new(RuleSet::builtin().unwrap()),
        OutputLog::from_text("all good\n"),
        SourceBuffers::new(),
        "/proj",
    );
    assert_eq!(
        empty.next_message(1).err(),
        Some(NavigationError::NoMoreMessages(NoMoreMessages::NoneRecorded))
    );

    let mut session = session();
    assert_eq!(
        session.next_message(-1).map(|m| m.location.line).ok(),
        Some(Some(9))
    );
    session.navigator_mut().reset();
    session.next_message(1).unwrap();
    assert_eq!(
        session.next_message(-1).err(),
        Some(NavigationError::NoMoreMessages(NoMoreMessages::NoFurther {
            direction: Direction::Backward
        }))
    );
    assert_eq!(
        session.next_message(10).err(),
        Some(NavigationError::NoMoreMessages(NoMoreMessages::NoFurther {
            direction: Direction::Forward
        }))
    );
    assert_eq!(
        session.next_message(0).map(|m| m.location.line).ok(),
        Some(Some(2))
    );
}

#[test]
fn test_goto_resolves_positions_and_marks_visited() {
    let mut session = session();
    let target = session.next_error(1).unwrap();
    assert_eq!(target.path, PathBuf::from("/proj/src/a.c"));
    assert_eq!(target.position, 11);
    assert_eq!(target.range_end, None);

    let message = session.driver().message(target.message).unwrap();
    let loc = session.cache().loc(message.loc).unwrap();
    assert!(loc.visited());
    assert_eq!(session.navigator().current(), Some(target.message));
}

#[test]
fn test_markers_follow_source_edits() {
    let mut session = session();
    let first = session.next_error(1).unwrap();
    let buffer = first.buffer;
    session.sources_mut().insert(buffer, 0, "// header\n");

    session.navigator_mut().reset();
    let again = session.next_error(1).unwrap();
    assert_eq!(again.position, first.position + 10);
}

#[test]
fn test_goto_missing_file_is_unresolved() {
    let mut session = session();
    let start = session
        .messages()
        .find(|m| m.location.filename == "src/c.c")
        .map(|m| m.start())
        .unwrap();
    assert_eq!(
        session.goto(start),
        Err(NavigationError::Location(LocationError::LocationUnresolved {
            filename: "src/c.c".to_string(),
            searched: PathBuf::from("/proj/src/c.c"),
        }))
    );
    assert_eq!(
        session.goto(start + 1),
        Err(NavigationError::UnknownMessage(start + 1))
    );
}

#[test]
fn test_prompt_supplies_a_missing_file() {
    let mut sources = SourceBuffers::new()
        .with_prompt(|filename, _searched| Some(PathBuf::from("/elsewhere").join(filename)));
    sources.open_with_text("/elsewhere/src/c.c", "x\ny\n");
    let mut session = CompilationSession::new(
        Arc::new(RuleSet::builtin().unwrap()),
        OutputLog::from_text("src/c.c:2: error: missing\n"),
        sources,
        "/proj",
    );
    let target = session.next_error(1).unwrap();
    assert_eq!(target.path, PathBuf::from("/elsewhere/src/c.c"));
    assert_eq!(target.position, 2);
}

#[test]
fn test_goto_after_flush_reinterns_the_file() {
    let mut session = session();
    assert!(session.flush_file(&FileSpec::bare("src/b.c")));
    let start = session
        .messages()
        .find(|m| m.location.filename == "src/b.c" && m.severity == Severity::Error)
        .map(|m| m.start())
        .unwrap();
    let target = session.goto(start).unwrap();
    assert_eq!(target.path, PathBuf::from("/proj/src/b.c"));
    assert_eq!(target.position, 0);
}

#[test]
fn test_skip_visited() {
    let mut session = session();
    session.navigator_mut().set_config(NavigationConfig {
        skip_visited: true,
        ..NavigationConfig::default()
    });
    let first = session.next_error(1).unwrap();
    session.navigator_mut().reset();
    let second = session.next_message(1).unwrap().start();
    assert!(second > first.message);
}
