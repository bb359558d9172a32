use clap::Parser;
use gitlab_depcheck::cli::Cli;
use gitlab_depcheck::config::Config;
use gitlab_depcheck::gitlab::{GitLabClient, ProjectQuery};
use gitlab_depcheck::output;
use gitlab_depcheck::runner::{CancelFlag, DEFAULT_CONCURRENCY, ScanOptions, run_scan};

const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let url = cli
        .url
        .or(config.gitlab.url)
        .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string());
    let token = cli
        .token
        .or_else(|| std::env::var("GITLAB_TOKEN").ok())
        .or(config.gitlab.token)
        .ok_or("GitLab token required. Use --token, GITLAB_TOKEN env var, or a config file")?;

    let options = ScanOptions {
        package: cli.package.clone(),
        query: ProjectQuery {
            group: cli.group.or(config.search.group),
            search: cli.search,
            include_archived: cli.archived,
        },
        concurrency: cli
            .max_concurrent
            .or(config.search.max_concurrent)
            .unwrap_or(DEFAULT_CONCURRENCY),
    };

    let client = GitLabClient::new(&url, &token);
    let cancel = CancelFlag::new();

    eprintln!("Searching for package: {}", cli.package);
    let report = run_scan(&client, &options, &cancel, |progress| {
        eprint!("\rChecked {}/{} projects", progress.completed, progress.total);
        if progress.completed == progress.total {
            eprintln!();
        }
    })?;

    print!("{}", output::render(&report, cli.output));

    for error in &report.errors {
        eprintln!("Warning: {}: {}", error.project, error.reason);
    }

    Ok(())
}
