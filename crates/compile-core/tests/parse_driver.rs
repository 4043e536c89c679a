use std::ops::Range;
use std::sync::Arc;

use compile_core::{
    GroupRole, LocationCache, OutputBuffer, OutputLog, ParseDriver, Rule, RuleSet, Severity,
    SeverityCounts,
};
use pretty_assertions::assert_eq;

const BUILD_LOG: &str = "gcc -c a.c\n\
                         a.c:3:1: error: expected ';' before '}' token\n\
                         a.c:7:9: warning: unused variable 'n'\n\
                         Foo.java:12: error: cannot find symbol\n    \
                         bar();\n    \
                         ^\n\
                         b.c:20: note: declared here\n\
                         make: *** [all] Error 1\n";

type Summary = (Range<usize>, Severity, String, Option<usize>, Option<usize>);

fn driver() -> ParseDriver {
    ParseDriver::new(Arc::new(RuleSet::builtin().unwrap()))
}

fn summary(driver: &ParseDriver) -> Vec<Summary> {
    driver
        .messages()
        .map(|m| {
            (
                m.range.clone(),
                m.severity,
                m.location.filename.clone(),
                m.location.line,
                m.location.column,
            )
        })
        .collect()
}

fn parse_fresh(text: &str) -> (ParseDriver, OutputLog) {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(text);
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    (driver, log)
}

#[test]
fn test_build_log_messages() {
    let (driver, _) = parse_fresh(BUILD_LOG);
    let found: Vec<(Severity, String, Option<usize>, Option<usize>)> = driver
        .messages()
        .map(|m| {
            (
                m.severity,
                m.location.filename.clone(),
                m.location.line,
                m.location.column,
            )
        })
        .collect();
    assert_eq!(
        found,
        vec![
            (Severity::Error, "a.c".to_string(), Some(3), Some(1)),
            (Severity::Warning, "a.c".to_string(), Some(7), Some(9)),
            (Severity::Error, "Foo.java".to_string(), Some(12), Some(5)),
            (Severity::Info, "b.c".to_string(), Some(20), None),
        ]
    );
    assert_eq!(
        driver.counts(),
        SeverityCounts {
            errors: 2,
            warnings: 1,
            infos: 1,
        }
    );
}

#[test]
fn test_partial_line_is_parsed_once_its_newline_arrives() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::new();
    let mut driver = driver();

    log.append("a.c:1: error: first\nb.c:2: err");
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 1);
    assert!(driver.cursor() <= 20);
    assert_eq!(driver.message_count(), 1);

    log.append("or: second\n");
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 1);
    let names: Vec<String> = driver
        .messages()
        .map(|m| m.location.filename.clone())
        .collect();
    assert_eq!(names, vec!["a.c".to_string(), "b.c".to_string()]);
    assert_eq!(driver.message_at(21).map(|m| m.location.line), Some(Some(2)));
}

#[test]
fn test_final_partial_line_after_process_exit() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("a.c:1: error: x\nb.c:2: error: y");
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    assert_eq!(driver.message_count(), 1);

    driver.set_process_finished(true);
    assert!(driver.process_finished());
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    assert_eq!(driver.message_count(), 2);
    assert_eq!(driver.cursor(), log.len_chars());
}

#[test]
fn test_ensure_parsed_is_idempotent() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(BUILD_LOG);
    let mut driver = driver();

    for upto in [30, 90, log.len_chars()] {
        driver.ensure_parsed(upto, &mut log, &mut cache);
        let annotations = log.annotations().spans().to_vec();
        let messages = summary(&driver);

        assert_eq!(driver.ensure_parsed(upto, &mut log, &mut cache), 0);
        assert_eq!(log.annotations().spans().to_vec(), annotations);
        assert_eq!(summary(&driver), messages);
    }
}

#[test]
fn test_cursor_never_moves_back_without_a_flush() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(BUILD_LOG);
    let mut driver = driver();

    let mut last = driver.cursor();
    for upto in [50, 10, 120, 0, 60, 200, 5, BUILD_LOG.len()] {
        driver.ensure_parsed(upto, &mut log, &mut cache);
        assert!(driver.cursor() >= last, "cursor moved back at upto={upto}");
        last = driver.cursor();
    }
}

#[test]
fn test_flush_then_reparse_matches_a_fresh_parse() {
    for edit_at in [0, 11, 40, 60, 100, 130] {
        let mut cache = LocationCache::new("/virtual");
        let mut log = OutputLog::from_text(BUILD_LOG);
        let mut driver = driver();
        driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);

        log.insert(edit_at, "x.c:99: warning: inserted\n");
        driver.flush_from(edit_at, &mut cache);
        driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);

        let (fresh, fresh_log) = parse_fresh(&log.text());
        assert_eq!(summary(&driver), summary(&fresh), "edit at {edit_at}");
        assert_eq!(
            log.annotations().spans().to_vec(),
            fresh_log.annotations().spans().to_vec(),
            "edit at {edit_at}"
        );
    }
}

#[test]
fn test_flush_inside_a_multiline_message_rewinds_to_its_start() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(BUILD_LOG);
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);

    let javac = driver
        .messages()
        .find(|m| m.rule.as_deref() == Some("javac"))
        .map(|m| m.range.clone())
        .unwrap();
    let caret_line = javac.end - 1;
    driver.flush_from(caret_line, &mut cache);
    assert_eq!(driver.cursor(), javac.start);
    assert!(driver.message(javac.start).is_none());

    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    assert_eq!(
        driver.message(javac.start).map(|m| m.range.clone()),
        Some(javac)
    );
}

#[test]
fn test_flush_releases_file_references() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("a.c:1: error: x\nb.c:2: error: y\n");
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    assert_eq!(cache.file_count(), 2);

    driver.flush_from(16, &mut cache);
    assert_eq!(cache.sweep(), 1);
    assert_eq!(cache.file_count(), 1);
}

#[test]
fn test_attach_resumes_after_an_annotated_prefix() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("a.c:1: error: x\nnoise\n");
    let mut first = driver();
    first.ensure_parsed(log.len_chars(), &mut log, &mut cache);

    log.append("b.c:2: error: y\n");
    let mut second = driver();
    second.attach(&log, &mut cache);
    assert_eq!(second.cursor(), 16);
    second.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    let names: Vec<String> = second
        .messages()
        .map(|m| m.location.filename.clone())
        .collect();
    assert_eq!(names, vec!["b.c".to_string()]);
}

#[test]
fn test_discard_before_drops_old_messages() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("a.c:1: error: x\nb.c:2: error: y\n");
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);

    assert_eq!(driver.discard_before(16, &mut cache), 1);
    assert_eq!(driver.message_count(), 1);
    assert_eq!(cache.sweep(), 1);
    assert!(driver.message(16).is_some());
}

#[test]
fn test_clear_forgets_everything() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(BUILD_LOG);
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    driver.clear(&mut cache);
    assert_eq!(driver.cursor(), 0);
    assert_eq!(driver.message_count(), 0);
    assert_eq!(cache.sweep(), 3);
}

#[test]
fn test_multiline_message_split_across_chunks() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::new();
    let mut driver = driver();

    log.append("error[E0425]: cannot find value `y`\n");
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 0);
    assert_eq!(driver.cursor(), 0);

    log.append(" --> src/a.rs:1:5\n  |\n");
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 1);
    let message = driver.messages().next().unwrap();
    assert_eq!(message.rule.as_deref(), Some("rust"));
    assert_eq!(message.location.filename, "src/a.rs");
    assert_eq!(
        (message.location.line, message.location.column),
        (Some(1), Some(5))
    );

    let (fresh, _) = parse_fresh(&log.text());
    assert_eq!(summary(&driver), summary(&fresh));
}

#[test]
fn test_streamed_lines_match_a_whole_parse() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::new();
    let mut driver = driver();
    for line in BUILD_LOG.split_inclusive('\n') {
        log.append(line);
        driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    }
    let (fresh, _) = parse_fresh(BUILD_LOG);
    assert_eq!(summary(&driver), summary(&fresh));
}

#[test]
fn test_deleting_a_newline_leaves_no_message_on_the_partial_line() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("a.c:1: error: x\nb.c:2: error: y\n");
    let mut driver = driver();
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    assert_eq!(driver.message_count(), 2);

    log.delete(29..32);
    driver.flush_from(29, &mut cache);
    driver.ensure_parsed(log.len_chars(), &mut log, &mut cache);
    let starts: Vec<usize> = driver.messages().map(|m| m.range.start).collect();
    assert_eq!(starts, vec![0]);
    assert_eq!(log.annotations().len(), 1);

    let (fresh, _) = parse_fresh(&log.text());
    assert_eq!(summary(&driver), summary(&fresh));
}

#[test]
fn test_flush_at_the_end_of_a_finished_log_reparses_the_whole_line() {
    let rule = Rule::new("at-line", r"^(\S+) line ([0-9]+)$")
        .unwrap()
        .with_file(GroupRole::Literal(1))
        .with_line(GroupRole::Literal(2));
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text("x\nt.pl line 4 ok");
    let mut driver = ParseDriver::new(Arc::new(RuleSet::new(vec![rule]).unwrap()));
    driver.set_process_finished(true);
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 0);
    assert_eq!(driver.cursor(), log.len_chars());

    log.delete(13..16);
    driver.flush_from(13, &mut cache);
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 1);
    let message = driver.messages().next().unwrap();
    assert_eq!(message.range.start, 2);
    assert_eq!(message.location.line, Some(4));
}

#[test]
fn test_running_output_keeps_its_last_lines_provisional() {
    let mut cache = LocationCache::new("/virtual");
    let mut log = OutputLog::from_text(
        "a.c:1: error: x\nb.c:1: error: x\nc.c:1: error: x\nd.c:1: error: x\ne.c:1: error: x\n",
    );
    let mut driver = driver();
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 5);
    assert_eq!(driver.cursor(), 32);
    assert_eq!(driver.message_count(), 5);

    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 0);
    assert_eq!(driver.message_count(), 5);
    assert_eq!(log.annotations().len(), 5);

    driver.set_process_finished(true);
    assert_eq!(driver.ensure_parsed(log.len_chars(), &mut log, &mut cache), 0);
    assert_eq!(driver.cursor(), log.len_chars());
    assert_eq!(cache.file_count(), 5);
}
