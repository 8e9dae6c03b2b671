use super::*;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Preserve user deleted repositories to a long term archive"
)]
pub(super) struct Cli {
    #[arg(
        short = 'r',
        long = "repo",
        value_enum,
        default_value_t = RepoSelection::Recent,
        help = "Process all repos or just recently deleted repos"
    )]
    pub(super) repo: RepoSelection,
    #[arg(long, help = "Path to the JSON config file")]
    pub(super) config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(super) enum RepoSelection {
    All,
    Recent,
}

impl From<RepoSelection> for QueryMode {
    fn from(value: RepoSelection) -> Self {
        match value {
            RepoSelection::All => QueryMode::All,
            RepoSelection::Recent => QueryMode::Recent,
        }
    }
}
