use clap::Parser;
use compile_core::Severity;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "compile-log",
    about = "List the file/line references found in a captured build log"
)]
pub struct Cli {
    #[arg(help = "Build log to read (default: stdin)")]
    pub log: Option<PathBuf>,

    #[arg(long, short, help = "YAML session configuration")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "YAML file with extra rules, tried after the builtin ones")]
    pub rules: Option<PathBuf>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Only use these builtin rules, in this order (e.g. gnu,rust)"
    )]
    pub only: Option<Vec<String>>,

    #[arg(long, help = "Skip messages below this severity (info, warning, error)")]
    pub skip_threshold: Option<Severity>,

    #[arg(long = "search-path", help = "Directory searched for relative file names")]
    pub search_path: Vec<PathBuf>,

    #[arg(long, short = 'C', help = "Directory the build ran in (default: cwd)")]
    pub directory: Option<PathBuf>,

    #[arg(long, help = "Column number the tool counts from (0 or 1)")]
    pub first_column: Option<usize>,

    #[arg(long, help = "Print each referenced file once instead of every message")]
    pub files: bool,
}
