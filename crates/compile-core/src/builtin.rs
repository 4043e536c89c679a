//! Builtin catalog of tool message grammars.
//!
//! Rules are listed in priority order. Patterns are written for the `regex` crate, so grammars
//! that would need backreferences or lookaround are restructured.

use crate::error::RuleError;
use crate::message::Severity;
use crate::rules::{ComputedRole, GroupRole, Rule, RuleSet, SeverityRole};

fn g(group: usize) -> GroupRole {
    GroupRole::Literal(group)
}

fn span(start: usize, end: usize) -> GroupRole {
    GroupRole::Range(start, end)
}

fn groups(warning: Option<usize>, info: Option<usize>) -> SeverityRole {
    SeverityRole::Groups { warning, info }
}

const INFO: SeverityRole = SeverityRole::Fixed(Severity::Info);
const ERROR: SeverityRole = SeverityRole::Fixed(Severity::Error);

/// A `file:line` rule; the most common shape in the catalog.
fn file_line(name: &str, pattern: &str, file: usize, line: usize) -> Result<Rule, RuleError> {
    Ok(Rule::new(name, pattern)?
        .with_file(g(file))
        .with_line(g(line)))
}

impl RuleSet {
    /// The builtin catalog, in priority order.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::new(builtin_rules()?)
    }
}

/// Names of the builtin rules, in priority order.
pub fn builtin_rule_names() -> Vec<&'static str> {
    vec![
        "absoft",
        "ada",
        "aix",
        "ant",
        "bash",
        "borland",
        "python-tracebacks-and-caml",
        "cmake",
        "cmake-info",
        "comma",
        "cucumber",
        "msft",
        "edg-1",
        "edg-2",
        "epc",
        "ftnchek",
        "iar",
        "ibm",
        "irix",
        "java",
        "javac",
        "jikes-file",
        "maven",
        "jikes-line",
        "clang-include",
        "gcc-include",
        "ruby-Test::Unit",
        "gmake",
        "rust",
        "gnu",
        "lcc",
        "makepp",
        "mips-1",
        "mips-2",
        "omake",
        "oracle",
        "perl",
        "php",
        "rxp",
        "sparc-pascal-file",
        "sun",
        "sun-ada",
        "watcom",
        "4bsd",
        "gcov-file",
        "gcov-header",
        "gcov-nomark",
        "gcov-called-line",
        "gcov-never-called",
        "perl--Pod::Checker",
        "perl--Test",
        "perl--Test2",
        "perl--Test::Harness",
        "weblint",
        "guile-file",
        "guile-line",
        "typescript-tsc-plain",
        "typescript-tsc-pretty",
        "go-test",
    ]
}

fn builtin_rules() -> Result<Vec<Rule>, RuleError> {
    Ok(vec![
        Rule::new(
            "absoft",
            r#"^(?:[Ee]rror on |[Ww]arning on( ))?[Ll]ine[ \t]+([0-9]+)[ \t]+of[ \t]+"?([a-zA-Z]?:?[^":\n]+)"?:"#,
        )?
        .with_file(g(3))
        .with_line(g(2))
        .with_severity(groups(Some(1), None)),
        Rule::new("ada", r"(warning: .*)? at ([^ \n]+):([0-9]+)$")?
            .with_file(g(2))
            .with_line(g(3))
            .with_severity(groups(Some(1), None)),
        file_line(
            "aix",
            r" in line ([0-9]+) of file ([^ \n]+[^. \n])\.? ",
            2,
            1,
        )?,
        Rule::new(
            "ant",
            r"^[ \t]*(?:\[[^\] \n]+\][ \t]*){1,2}((?:[A-Za-z]:)?[^: \n]+):([0-9]+):(?:([0-9]+):([0-9]+):([0-9]+):)?( warning)?",
        )?
        .with_file(g(1))
        .with_line(span(2, 4))
        .with_column(span(3, 5))
        .with_severity(groups(Some(6), None)),
        file_line("bash", r"^([^: \n\t]+): line ([0-9]+):", 1, 2)?,
        Rule::new(
            "borland",
            r"^(?:Error|Warnin(g)) (?:[FEW][0-9]+ )?([a-zA-Z]?:?[^:( \t\n]+) ([0-9]+)(?:[) \t]|:[^0-9\n])",
        )?
        .with_file(g(2))
        .with_line(g(3))
        .with_severity(groups(Some(1), None)),
        Rule::new(
            "python-tracebacks-and-caml",
            r#"^[ \t]*File "?([^," \n\t<>]+)"?, lines? ([0-9]+)-?([0-9]+)?(?:$|,(?: characters? ([0-9]+)-?([0-9]+)?:)?([ \n]Warning(?: [0-9]+)?:)?)"#,
        )?
        .with_file(g(1))
        .with_line(span(2, 3))
        .with_column(span(4, 5))
        .with_severity(groups(Some(6), None))
        .with_lines(2),
        Rule::new(
            "cmake",
            r"^CMake (?:Error|(Warning)) at (.*):([1-9][0-9]*) \([^)]+\):$",
        )?
        .with_file(g(2))
        .with_line(g(3))
        .with_severity(groups(Some(1), None)),
        file_line("cmake-info", r"^  (?: \*)?(.*):([1-9][0-9]*) \([^)]+\)$", 1, 2)?
            .with_severity(INFO),
        Rule::new(
            "comma",
            r#"^"([^," \n\t]+)", line ([0-9]+)(?:[(. pos]+([0-9]+)\)?)?[:.,; (-]( warning:|[-0-9 ]*\(W\))?"#,
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(4), None)),
        file_line(
            "cucumber",
            r"(?:^cucumber(?: -p [^[:space:]]+)?|#) ([^(\n].*):([1-9][0-9]*)",
            1,
            2,
        )?,
        Rule::new(
            "msft",
            r"^ *([0-9]+>)?((?:[a-zA-Z]:)?[^ :(\t\n][^:(\t\n]*)\(([0-9]+)(?:,([0-9]+))?\) ?: (?:see declaration|(?:warnin(g)|[a-z ]+) C[0-9]+:)",
        )?
        .with_file(g(2))
        .with_line(g(3))
        .with_column(g(4))
        .with_severity(groups(Some(5), None)),
        Rule::new(
            "edg-1",
            r"^([^ \n]+)\(([0-9]+)\): (?:error|warnin(g)|remar(k))",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_severity(groups(Some(3), Some(4))),
        file_line("edg-2", r#"at line ([0-9]+) of "([^ \n]+)"$"#, 2, 1)?.with_severity(INFO),
        file_line("epc", r"^Error [0-9]+ at \(([0-9]+):([^)\n]+)\)", 2, 1)?,
        Rule::new(
            "ftnchek",
            r"(^Warning .*)? line[ \n]([0-9]+)[ \n](?:col ([0-9]+)[ \n])?file ([^ :;\n]+)",
        )?
        .with_file(g(4))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(1), None))
        .with_lines(4),
        Rule::new(
            "iar",
            r#"^"(.*)",([0-9]+)\s+(?:Error|Warnin(g))\[[0-9]+\]:"#,
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_severity(groups(Some(3), None)),
        Rule::new(
            "ibm",
            r"^([^( \n\t]+)\(([0-9]+):([0-9]+)\) : (?:warnin(g)|informationa(l))?",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(4), Some(5))),
        Rule::new(
            "irix",
            r#"^[-[:alnum:]_/ ]+: (?:(?:[sS]evere|[eE]rror|[wW]arnin(g)|[iI]nf(o))[0-9 ]*: )?([^," \n\t]+)(?:, line|:) ([0-9]+):"#,
        )?
        .with_file(g(3))
        .with_line(g(4))
        .with_severity(groups(Some(1), Some(2))),
        Rule::new(
            "java",
            r"^(?:[ \t]+at |==[0-9]+== +(?:at|b(y))).+\(([^()\n]+):([0-9]+)\)$",
        )?
        .with_file(g(2))
        .with_line(g(3))
        .with_severity(groups(Some(1), None)),
        Rule::new(
            "javac",
            r"^((?:[A-Za-z]:)?[^:\n]+\.java):([0-9]+): (?:(warning)|error): [^\n]*\n[^\n]*\n([ \t]*)\^",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(GroupRole::Computed(ComputedRole::GroupWidth(4)))
        .with_severity(groups(Some(3), None))
        .with_hyperlink(1)
        .with_lines(3),
        Rule::new("jikes-file", r#"^(?:Found|Issued) .* compiling "(.+)":$"#)?
            .with_file(g(1))
            .with_severity(INFO),
        Rule::new(
            "maven",
            r"^(?:\[(?:ERROR|(WARNING)|(INFO))\] )?([^\n \[](?:[^\n :]| [^\n/-]|:[^\n \[])*):\[([[:digit:]]+),([[:digit:]]+)\] ",
        )?
        .with_file(g(3))
        .with_line(g(4))
        .with_column(g(5))
        .with_severity(groups(Some(1), Some(2))),
        Rule::new(
            "jikes-line",
            r"^ *([0-9]+)\.[ \t]+.*\n +(<-*>\n\*\*\* (?:Error|Warnin(g)))",
        )?
        .with_line(g(1))
        .with_severity(groups(Some(3), None))
        .with_hyperlink(2)
        .with_lines(3),
        file_line(
            "clang-include",
            r"^In file included from ([^\n:]+):([0-9]+):$",
            1,
            2,
        )?
        .with_severity(INFO)
        .with_hyperlink(1),
        Rule::new(
            "gcc-include",
            r"^(?:In file included |                 |\t)from ([0-9]*[^0-9\n](?:[^\n :]| [^-/\n]|:[^ \n])*?):([0-9]+)(?::([0-9]+))?(?:(:)|(,|$))?",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(4), Some(5))),
        file_line(
            "ruby-Test::Unit",
            r"^    [\[ ]?([^ (].*):([1-9][0-9]*)(\])?:in ",
            1,
            2,
        )?,
        file_line("gmake", r": \*\*\* \[((.+?):([0-9]+): .+)\]", 2, 3)?
            .with_severity(INFO)
            .with_hyperlink(1),
        Rule::new(
            "rust",
            r"^(?:(error)|(warning))(?:\[[A-Z0-9]+\])?:[^\n]*\n[ \t]*--> ([^:\n]+):([[:digit:]]+):([[:digit:]]+)",
        )?
        .with_file(g(3))
        .with_line(g(4))
        .with_column(g(5))
        .with_severity(groups(Some(2), None))
        .with_hyperlink(3)
        .with_highlight(1, "error")
        .with_highlight(2, "warning")
        .with_lines(2),
        Rule::new(
            "gnu",
            r"^(?:[[:alpha:]][-[:alnum:].]+: ?|[ \t]+(?:in |from ))?([0-9]*[^0-9\n *\[](?:[^\n :]| [^-/\n]|:[^ \n])*?): ?([0-9]+)(?:[.:]([0-9]+)(?:-(?:([0-9]+)\.)?([0-9]+))?)?:(?: *(warning|[Ww]arning|W:)| *([Ii]nfo(?:rmation(?:al)?)?|I:|instantiated from|required from|[Nn]ote)| *[Ee]rror|[0-9]?(?:[^0-9\n]|$)|[0-9][0-9][0-9])",
        )?
        .with_file(g(1))
        .with_line(span(2, 4))
        .with_column(span(3, 5))
        .with_severity(groups(Some(6), Some(7))),
        Rule::new(
            "lcc",
            r"^(?:E|(W)), ([^(\n]+)\(([0-9]+),[ \t]*([0-9]+)",
        )?
        .with_file(g(2))
        .with_line(g(3))
        .with_column(g(4))
        .with_severity(groups(Some(1), None)),
        Rule::new(
            "makepp",
            r"^makepp(?:(?:: warning(:).*?|(: Scanning|: [LR]e?l?oading makefile|: Imported|log:.*?) |: .*?)`((\S+?)(?::([0-9]+))?)['(])",
        )?
        .with_file(g(4))
        .with_line(g(5))
        .with_severity(groups(Some(1), Some(2)))
        .with_hyperlink(3),
        file_line("mips-1", r" \(([0-9]+)\) in ([^ \n]+)", 2, 1)?,
        file_line("mips-2", r" in ([^()\n ]+)\(([0-9]+)\)$", 1, 2)?,
        Rule::new("omake", r"^\*\*\* omake: file (.*) changed")?
            .with_file(g(1))
            .with_severity(INFO)
            .with_flush(),
        Rule::new(
            "oracle",
            r"^(?:Semantic error|Error|PCC-[0-9]+:).* line ([0-9]+)(?:(?:,| at)? column ([0-9]+))?(?:,| in| of)? file (.*?):?$",
        )?
        .with_file(g(3))
        .with_line(g(1))
        .with_column(g(2)),
        file_line(
            "perl",
            r" at ([^ \n]+) line ([0-9]+)(?:[,.]|$| during global destruction\.$)",
            1,
            2,
        )?,
        file_line(
            "php",
            r"(?:Parse|Fatal) error: (.*) in (.*) on line ([0-9]+)",
            2,
            3,
        )?,
        Rule::new(
            "rxp",
            r"^(?:Error|Warnin(g)):.*\n.* line ([0-9]+) char ([0-9]+) of file://(.+)",
        )?
        .with_file(g(4))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(1), None))
        .with_lines(2),
        Rule::new(
            "sparc-pascal-file",
            r"^\w\w\w \w\w\w +[0-3]?[0-9] +[0-2][0-9]:[0-5][0-9]:[0-5][0-9] [12][09][0-9][0-9] +(.*):$",
        )?
        .with_file(g(1))
        .with_severity(INFO),
        Rule::new(
            "sun",
            r": (?:ERROR|WARNIN(G)|REMAR(K)) (?:[[:alnum:] ]+, )?File = (.+), Line = ([0-9]+)(?:, Column = ([0-9]+))?",
        )?
        .with_file(g(3))
        .with_line(g(4))
        .with_column(g(5))
        .with_severity(groups(Some(1), Some(2))),
        file_line(
            "sun-ada",
            r"^([^, \n\t]+), line ([0-9]+), char ([0-9]+)[:., (-]",
            1,
            2,
        )?
        .with_column(g(3)),
        Rule::new(
            "watcom",
            r"^[ \t]*((?:[a-zA-Z]:)?[^ :(\t\n][^:(\t\n]*)\(([0-9]+)\): ?(?:(Error! E[0-9]+)|(Warning! W[0-9]+)):",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_severity(groups(Some(4), None)),
        Rule::new(
            "4bsd",
            r"(?:^|::  |\S \( )(/[^ \n\t()]+)\(([0-9]+)\)(?:: (warning:)?|$| \),)",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_severity(groups(Some(3), None)),
        file_line("gcov-file", r"^ *-: *(0):Source:(.+)$", 2, 1)?.with_severity(INFO),
        Rule::new(
            "gcov-header",
            r"^ *-: *(0):(?:Object|Graph|Data|Runs|Programs):.+$",
        )?
        .with_line(g(1))
        .with_severity(INFO),
        Rule::new("gcov-nomark", r"^ *-: *([1-9]|[0-9]{2,}):.*$")?
            .with_line(g(1))
            .with_severity(INFO),
        Rule::new("gcov-called-line", r"^ *([0-9]+): *([0-9]+):.*$")?
            .with_line(g(2))
            .with_severity(INFO),
        Rule::new("gcov-never-called", r"^ *(#####): *([0-9]+):.*$")?
            .with_line(g(2))
            .with_severity(ERROR),
        Rule::new(
            "perl--Pod::Checker",
            r"^\*\*\* (?:ERROR|(WARNING)).* (?:at|on) line ([0-9]+) (?:.* )?in file ([^ \t\n]+)",
        )?
        .with_file(g(3))
        .with_line(g(2))
        .with_severity(groups(Some(1), None)),
        file_line(
            "perl--Test",
            r"^# Failed test [0-9]+ in ([^ \t\r\n]+) at line ([0-9]+)",
            1,
            2,
        )?,
        file_line(
            "perl--Test2",
            r"^(.*NOK.*)?# Test [0-9]+ got:.* \(([^ \t\r\n]+) at line ([0-9]+)\)",
            2,
            3,
        )?,
        file_line(
            "perl--Test::Harness",
            r"^.*NOK.* ([^ \t\r\n]+) at line ([0-9]+)",
            1,
            2,
        )?,
        file_line("weblint", r"^([^ \t\r\n(]+) \(([0-9]+):([0-9]+)\) ", 1, 2)?.with_column(g(3)),
        Rule::new("guile-file", r"^In (.+\..+):\n")?
            .with_file(g(1))
            .with_severity(INFO),
        Rule::new("guile-line", r"^ *([0-9]+): *([0-9]+)")?
            .with_line(g(1))
            .with_column(g(2)),
        Rule::new(
            "typescript-tsc-plain",
            r"^[[:blank:]]*([^(\r\n)]+)\(([0-9]+),([0-9]+)\):[[:blank:]]+(?:error|(warning)|(info))[[:blank:]]+TS[0-9]+:",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(4), Some(5))),
        Rule::new(
            "typescript-tsc-pretty",
            r"^([^:\n]+):([0-9]+):([0-9]+) - (?:error|(warning)|(info)) TS[0-9]+:",
        )?
        .with_file(g(1))
        .with_line(g(2))
        .with_column(g(3))
        .with_severity(groups(Some(4), Some(5))),
        file_line("go-test", r"^[ \t]+([^\n: ]+_test\.go):([0-9]+): ", 1, 2)?,
    ])
}
