mod cli;

use std::collections::HashSet;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use compile_core::{
    CompilationConfig, CompilationSession, Message, NavigationError, OutputLog, RuleSet,
    SourceBuffers,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let rules = Arc::new(load_rules(&cli, &config)?);
    debug!(rules = rules.len(), "rule table ready");

    let text = read_log(&cli)?;
    let mut session = CompilationSession::from_config(
        &config,
        rules,
        OutputLog::from_text(&text),
        config.source_buffers(),
    )?;
    session.set_process_finished(true);
    session.parse_all();

    if cli.files {
        print_files(&mut session)?;
    } else {
        print_messages(&mut session)?;
    }

    let counts = session.counts();
    eprintln!(
        "{} errors, {} warnings, {} infos",
        counts.errors, counts.warnings, counts.infos
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<CompilationConfig> {
    let mut config = match &cli.config {
        Some(path) => CompilationConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CompilationConfig::default(),
    };
    if let Some(names) = &cli.only {
        config.rules = Some(names.clone());
    }
    if let Some(threshold) = cli.skip_threshold {
        config.skip_threshold = threshold;
    }
    if !cli.search_path.is_empty() {
        config.search_path = std::iter::once(None)
            .chain(cli.search_path.iter().cloned().map(Some))
            .collect();
    }
    if let Some(directory) = &cli.directory {
        config.working_directory = Some(directory.clone());
    }
    if let Some(first_column) = cli.first_column {
        config.first_column = first_column;
    }
    Ok(config)
}

fn load_rules(cli: &Cli, config: &CompilationConfig) -> Result<RuleSet> {
    let mut rules = config.rule_set()?;
    if let Some(path) = &cli.rules {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rules {}", path.display()))?;
        let added = rules
            .extend_from_yaml(&yaml)
            .with_context(|| format!("invalid rules in {}", path.display()))?;
        debug!(added, "loaded extra rules");
    }
    Ok(rules)
}

fn read_log(cli: &Cli) -> Result<String> {
    match &cli.log {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

type Session = CompilationSession<OutputLog, SourceBuffers>;

fn describe(session: &Session, message: &Message) -> String {
    let path = session
        .file_path(message)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| message.location.filename.clone());
    let mut out = format!("{} {path}", message.severity);
    if let Some(line) = message.location.line {
        out.push_str(&format!(":{line}"));
        if let Some(column) = message.location.column {
            out.push_str(&format!(":{column}"));
        }
    }
    if let Some(rule) = &message.rule {
        out.push_str(&format!(" [{rule}]"));
    }
    out
}

fn print_messages(session: &mut Session) -> Result<()> {
    loop {
        let start = match session.next_message(1) {
            Ok(message) => message.start(),
            Err(NavigationError::NoMoreMessages(_)) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if let Some(message) = session.driver().message(start) {
            println!("{}", describe(session, message));
        }
    }
}

fn print_files(session: &mut Session) -> Result<()> {
    let mut seen = HashSet::new();
    loop {
        let file = match session.next_file(1) {
            Ok(message) => message.file,
            Err(NavigationError::NoMoreMessages(_)) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if seen.insert(file)
            && let Some(path) = session.cache().file(file).map(|f| f.path())
        {
            println!("{}", path.display());
        }
    }
}
