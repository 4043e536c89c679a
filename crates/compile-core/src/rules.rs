//! Rule Table: data-driven message grammars.
//!
//! A [`Rule`] is a regular expression plus a map from message roles (file, line, column,
//! severity, hyperlink, highlights) to capture groups. A [`RuleSet`] is an ordered collection of
//! rules; order is match priority. Rule sets are built once, validated eagerly, and shared
//! read-only between sessions.
//!
//! Rules can also be loaded from YAML:
//!
//! ```yaml
//! - name: mytool
//!   pattern: '^ERR (\S+):(\d+)(?::(\d+))?'
//!   file: 1
//!   line: 2
//!   column: 3
//!   severity: warning
//! ```

use regex::{Captures, Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::Deserialize;

use crate::columns::{DEFAULT_TAB_WIDTH, str_width};
use crate::error::RuleError;
use crate::message::Severity;

/// A role value computed from a match rather than read from a single group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputedRole {
    /// One plus the screen width of the group's text.
    ///
    /// Used for caret lines (`    ^`), where the column is the caret position.
    GroupWidth(usize),
    /// The text of the first participating group in the list.
    FirstOf(Vec<usize>),
}

/// How a message role is obtained from a match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GroupRole {
    /// A single capture group.
    Literal(usize),
    /// A start group and an end group (e.g. line and end line).
    Range(usize, usize),
    /// A computed value.
    Computed(ComputedRole),
}

impl GroupRole {
    fn groups(&self) -> Vec<usize> {
        match self {
            Self::Literal(g) => vec![*g],
            Self::Range(start, end) => vec![*start, *end],
            Self::Computed(ComputedRole::GroupWidth(g)) => vec![*g],
            Self::Computed(ComputedRole::FirstOf(groups)) => groups.clone(),
        }
    }
}

/// How a message severity is obtained from a match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeverityRole {
    /// Every match has the same severity.
    Fixed(Severity),
    /// Warning if `warning` participated, else info if `info` participated, else error.
    Groups {
        /// Group whose participation marks a warning.
        #[serde(default)]
        warning: Option<usize>,
        /// Group whose participation marks an informational message.
        #[serde(default)]
        info: Option<usize>,
    },
}

impl Default for SeverityRole {
    fn default() -> Self {
        Self::Fixed(Severity::Error)
    }
}

impl SeverityRole {
    /// Resolve the severity of a match.
    pub fn resolve(&self, caps: &Captures<'_>) -> Severity {
        match self {
            Self::Fixed(severity) => *severity,
            Self::Groups { warning, info } => {
                if warning.is_some_and(|g| caps.get(g).is_some()) {
                    Severity::Warning
                } else if info.is_some_and(|g| caps.get(g).is_some()) {
                    Severity::Info
                } else {
                    Severity::Error
                }
            }
        }
    }
}

/// An extra highlight directive: highlight group `group` with `face`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HighlightRule {
    /// Capture group to highlight.
    pub group: usize,
    /// Host-defined face/role name.
    pub face: String,
}

/// The value a role resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleValue<'t> {
    /// Raw captured text, still in the tool's conventions.
    Text(&'t str),
    /// A computed number that is already 1-based.
    Number(usize),
}

impl<'t> RoleValue<'t> {
    pub(crate) fn as_text(self) -> Option<&'t str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Number(_) => None,
        }
    }
}

/// A single tool message grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    regex: Regex,
    file: Option<GroupRole>,
    line: Option<GroupRole>,
    column: Option<GroupRole>,
    severity: SeverityRole,
    hyperlink: Option<usize>,
    highlights: Vec<HighlightRule>,
    formats: Vec<String>,
    flush: bool,
    lines: usize,
}

impl Rule {
    /// Create a rule from a name and a pattern. `^`/`$` match at line boundaries.
    ///
    /// The rule has no roles yet; add them with the `with_*` methods.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, RuleError> {
        let name = name.into();
        let regex = compile_pattern(pattern).map_err(|source| RuleError::InvalidPattern {
            rule: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            regex,
            file: None,
            line: None,
            column: None,
            severity: SeverityRole::default(),
            hyperlink: None,
            highlights: Vec::new(),
            formats: Vec::new(),
            flush: false,
            lines: 1,
        })
    }

    /// Set the file role.
    pub fn with_file(mut self, role: GroupRole) -> Self {
        self.file = Some(role);
        self
    }

    /// Set the line role (`Range` gives line and end line).
    pub fn with_line(mut self, role: GroupRole) -> Self {
        self.line = Some(role);
        self
    }

    /// Set the column role (`Range` gives column and end column).
    pub fn with_column(mut self, role: GroupRole) -> Self {
        self.column = Some(role);
        self
    }

    /// Set the severity role.
    pub fn with_severity(mut self, role: SeverityRole) -> Self {
        self.severity = role;
        self
    }

    /// Make only `group` clickable instead of the whole match.
    pub fn with_hyperlink(mut self, group: usize) -> Self {
        self.hyperlink = Some(group);
        self
    }

    /// Add an extra highlight directive.
    pub fn with_highlight(mut self, group: usize, face: impl Into<String>) -> Self {
        self.highlights.push(HighlightRule {
            group,
            face: face.into(),
        });
        self
    }

    /// Set alternate filename formats (e.g. `"%s"`, `"%s.in"`), tried in order.
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the rule as a "file changed" notice: a match drops the cached structure of its file
    /// before the message is recorded.
    pub fn with_flush(mut self) -> Self {
        self.flush = true;
        self
    }

    /// Number of output lines one match can span. Streaming parses hold back that many trailing
    /// lines so a message is never seen half-written.
    pub fn with_lines(mut self, lines: usize) -> Self {
        self.lines = lines.max(1);
        self
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled pattern.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// File role.
    pub fn file(&self) -> Option<&GroupRole> {
        self.file.as_ref()
    }

    /// Line role.
    pub fn line(&self) -> Option<&GroupRole> {
        self.line.as_ref()
    }

    /// Column role.
    pub fn column(&self) -> Option<&GroupRole> {
        self.column.as_ref()
    }

    /// Severity role.
    pub fn severity(&self) -> &SeverityRole {
        &self.severity
    }

    /// Hyperlink group, if not the whole match.
    pub fn hyperlink(&self) -> Option<usize> {
        self.hyperlink
    }

    /// Extra highlight directives.
    pub fn highlights(&self) -> &[HighlightRule] {
        &self.highlights
    }

    /// Alternate filename formats; empty means `["%s"]`.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Whether a match flushes the cached structure of its file.
    pub fn flushes_file(&self) -> bool {
        self.flush
    }

    /// Number of output lines one match can span.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Check that every role references an existing capture group and every format has `%s`.
    pub fn validate(&self) -> Result<(), RuleError> {
        let available = self.regex.captures_len();
        let mut groups: Vec<usize> = [&self.file, &self.line, &self.column]
            .into_iter()
            .flatten()
            .flat_map(GroupRole::groups)
            .collect();
        if let SeverityRole::Groups { warning, info } = &self.severity {
            groups.extend(warning.iter().chain(info.iter()));
        }
        groups.extend(self.hyperlink);
        groups.extend(self.highlights.iter().map(|h| h.group));

        if let Some(group) = groups.into_iter().find(|g| *g >= available) {
            return Err(RuleError::MalformedRule {
                rule: self.name.clone(),
                group,
                available: available - 1,
            });
        }

        if let Some(format) = self.formats.iter().find(|f| !f.contains("%s")) {
            return Err(RuleError::InvalidFormat {
                rule: self.name.clone(),
                format: format.clone(),
            });
        }

        Ok(())
    }

    /// Resolve a role's primary value (file, line or column).
    pub(crate) fn primary<'t>(
        role: Option<&GroupRole>,
        caps: &Captures<'t>,
    ) -> Option<RoleValue<'t>> {
        match role? {
            GroupRole::Literal(g) | GroupRole::Range(g, _) => {
                caps.get(*g).map(|m| RoleValue::Text(m.as_str()))
            }
            GroupRole::Computed(computed) => evaluate(computed, caps),
        }
    }

    /// Resolve a role's end value (end line or end column); only `Range` roles have one.
    pub(crate) fn secondary<'t>(
        role: Option<&GroupRole>,
        caps: &Captures<'t>,
    ) -> Option<RoleValue<'t>> {
        match role? {
            GroupRole::Range(_, g) => caps.get(*g).map(|m| RoleValue::Text(m.as_str())),
            _ => None,
        }
    }
}

fn evaluate<'t>(role: &ComputedRole, caps: &Captures<'t>) -> Option<RoleValue<'t>> {
    match role {
        ComputedRole::GroupWidth(g) => caps
            .get(*g)
            .map(|m| RoleValue::Number(str_width(m.as_str(), DEFAULT_TAB_WIDTH) + 1)),
        ComputedRole::FirstOf(groups) => groups
            .iter()
            .find_map(|g| caps.get(*g))
            .map(|m| RoleValue::Text(m.as_str())),
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).multi_line(true).crlf(true).build()
}

/// A rule as written in a YAML rule document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Unique rule name.
    pub name: String,
    /// Regular expression.
    pub pattern: String,
    /// File role.
    #[serde(default)]
    pub file: Option<GroupRole>,
    /// Line role.
    #[serde(default)]
    pub line: Option<GroupRole>,
    /// Column role.
    #[serde(default)]
    pub column: Option<GroupRole>,
    /// Severity role (defaults to `error`).
    #[serde(default)]
    pub severity: SeverityRole,
    /// Hyperlink group.
    #[serde(default)]
    pub hyperlink: Option<usize>,
    /// Extra highlight directives.
    #[serde(default)]
    pub highlights: Vec<HighlightRule>,
    /// Alternate filename formats.
    #[serde(default)]
    pub formats: Vec<String>,
    /// Flush the file's cached structure on every match.
    #[serde(default)]
    pub flush: bool,
    /// Lines one match can span.
    #[serde(default = "one_line")]
    pub lines: usize,
}

fn one_line() -> usize {
    1
}

impl TryFrom<RuleSpec> for Rule {
    type Error = RuleError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let mut rule = Rule::new(spec.name, &spec.pattern)?.with_severity(spec.severity);
        rule.file = spec.file;
        rule.line = spec.line;
        rule.column = spec.column;
        rule.hyperlink = spec.hyperlink;
        rule.highlights = spec.highlights;
        rule.formats = spec.formats;
        rule.flush = spec.flush;
        rule.validate()?;
        Ok(rule.with_lines(spec.lines))
    }
}

/// An ordered, validated collection of rules. Earlier rules have priority.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    prefilter: RegexSet,
}

impl RuleSet {
    /// Build a rule set, validating every rule.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.name.as_str()) {
                return Err(RuleError::DuplicateRule(rule.name.clone()));
            }
        }
        let prefilter = build_prefilter(&rules)?;
        Ok(Self { rules, prefilter })
    }

    /// Build a rule set from a YAML sequence of [`RuleSpec`]s.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        let specs: Vec<RuleSpec> = serde_yaml::from_str(yaml)?;
        let rules = specs
            .into_iter()
            .map(Rule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    /// Look up a rule by name.
    pub fn lookup(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// All rules in priority order.
    pub fn all(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// A new set with only the named rules, in the given order.
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, RuleError> {
        let rules = names
            .iter()
            .map(|name| {
                self.lookup(name.as_ref())
                    .cloned()
                    .ok_or_else(|| RuleError::UnknownRule(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    /// A new set with `rules` appended after the existing ones (lowest priority).
    pub fn extended(&self, rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut all = self.rules.clone();
        all.extend(rules);
        Self::new(all)
    }

    /// Append the rules of a YAML document; returns how many were added.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<usize, RuleError> {
        let extra = Self::from_yaml(yaml)?;
        let added = extra.len();
        *self = self.extended(extra.rules)?;
        Ok(added)
    }

    /// Most lines any rule's match can span.
    pub fn max_lines(&self) -> usize {
        self.rules.iter().map(Rule::lines).max().unwrap_or(1)
    }

    /// Indices of rules that match somewhere in `text`, in priority order.
    pub(crate) fn candidates(&self, text: &str) -> Vec<usize> {
        self.prefilter.matches(text).into_iter().collect()
    }
}

fn build_prefilter(rules: &[Rule]) -> Result<RegexSet, RuleError> {
    RegexSetBuilder::new(rules.iter().map(|r| r.regex.as_str()))
        .multi_line(true)
        .crlf(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            rule: "<prefilter>".to_string(),
            source,
        })
}
