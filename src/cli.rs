use anyhow::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codequity")]
#[command(about = "Reports each contributor's share of a repository's code changes")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(short, long, help = "Username for a private repository")]
    pub username: Option<String>,

    #[arg(short, long, help = "Password or token for a private repository")]
    pub password: Option<String>,

    #[arg(long, help = "Count deleted lines as change volume too", default_value_t = false)]
    pub count_deletions: bool,

    #[arg(long, help = "Exclude merge commits from the totals", default_value_t = false)]
    pub skip_merges: bool,

    #[arg(long, help = "Only count commits at or after this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub since: Option<String>,

    #[arg(long, help = "Only count commits at or before this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub until: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Check the code contribution of all developers",
        long_about = None,
        after_help = "Examples:\n  codequity check                                  # local repository\n  codequity check user/repo                        # GitHub shorthand\n  codequity check https://gitlab.com/group/repo    # any clone URL"
    )]
    Check {
        #[arg(help = "Repository location: a path, owner/repo shorthand, or a clone URL")]
        location: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Check { location, json, ndjson } => {
                crate::equity::exec(self.common, location, json, ndjson)
            }
        }
    }
}
