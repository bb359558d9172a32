use crate::output::OutputFormat;
use clap::Parser;

/// Check Python package dependencies across GitLab projects
#[derive(Parser, Debug)]
#[command(name = "gitlab-depcheck")]
#[command(version, about, long_about = None)]
#[command(after_help = "\
Examples:
  # Search for pandas in all accessible projects
  gitlab-depcheck pandas

  # Search in a specific group
  gitlab-depcheck requests --group mycompany/backend

  # Filter projects by name
  gitlab-depcheck fastapi --search api

Configuration file (first match wins):
  1. .gitlab_depcheck.toml (current directory)
  2. ~/.gitlab_depcheck.toml (home directory)

  [gitlab]
  url = \"https://gitlab.com\"
  token = \"your-token-here\"

  [search]
  group = \"mycompany\"
  max_concurrent = 20
")]
pub struct Cli {
    /// Python package name to search for
    pub package: String,

    /// GitLab URL (default: https://gitlab.com or from config)
    #[arg(long)]
    pub url: Option<String>,

    /// GitLab personal access token (or use GITLAB_TOKEN env var or config)
    #[arg(long)]
    pub token: Option<String>,

    /// GitLab group path to scope the search (e.g. mycompany/backend)
    #[arg(long)]
    pub group: Option<String>,

    /// Filter projects by name
    #[arg(long)]
    pub search: Option<String>,

    /// Include archived projects
    #[arg(long)]
    pub archived: bool,

    /// Maximum concurrent project scans
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Output format: table, json, or csv
    #[arg(long, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}
