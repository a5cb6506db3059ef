use chrono::Utc;
use clap::{Parser, Subcommand};
use repo_search_core::stores::github::DEFAULT_ENDPOINT;
use repo_search_core::{
    AddressBar, Chip, GithubStore, OrchestratorConfig, PageEvent, SearchOrchestrator, SortEvent,
    SortField, SortOrder,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "repo-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// GitHub API base URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Location seeding the search state, as if pasted into the address bar.
    #[arg(long, default_value = "https://example.com/search")]
    location: String,
}

#[derive(Subcommand)]
enum Command {
    /// One-shot search: seed the parameters, wait for settlement, print.
    Search {
        /// Search query, e.g. "topic:angular"
        #[arg(long, default_value = "topic:rust")]
        query: String,
        /// Sort field: stars, forks, help-wanted-issues, updated
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc
        #[arg(long)]
        order: Option<String>,
        /// One-based result page
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Results per page
        #[arg(long, default_value_t = 5)]
        per_page: u32,
    },
    /// Interactive session: plain lines are typed input, `:` commands drive
    /// sort, pagination and chips.
    Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let address = AddressBar::parse(&cli.location)
        .map_err(|error| anyhow::anyhow!("invalid --location: {error}"))?;
    let backend = GithubStore::new(&cli.endpoint);
    let orchestrator =
        SearchOrchestrator::spawn(backend, address, OrchestratorConfig::default());

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        endpoint = %cli.endpoint,
        "repo-search boot"
    );

    match cli.command {
        Command::Search {
            query,
            sort,
            order,
            page,
            per_page,
        } => {
            orchestrator.set_search(query)?;
            if let (Some(sort), Some(order)) = (sort, order) {
                if SortField::parse(&sort).is_none() {
                    warn!(%sort, "unknown sort field, clearing sort");
                }
                orchestrator.set_sort(SortEvent {
                    active: sort,
                    direction: SortOrder::parse(&order),
                })?;
            }
            orchestrator.set_page(PageEvent {
                page_index: page.saturating_sub(1),
                page_size: per_page,
            })?;

            await_settlement(&orchestrator).await;
            render(&orchestrator);
        }
        Command::Session => {
            println!("type to search; :sort <field> <asc|desc|->  :page <n> <size>  :remove <chip#>  :url <location>  :quit");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            while let Some(line) = lines.next_line().await? {
                let line = line.trim().to_string();
                if let Some(command) = line.strip_prefix(':') {
                    if !handle_command(&orchestrator, command) {
                        break;
                    }
                } else {
                    orchestrator.type_text(line)?;
                }

                await_settlement(&orchestrator).await;
                render(&orchestrator);
            }
        }
    }

    orchestrator.shutdown();
    Ok(())
}

/// Session command dispatch. Returns false when the session should end.
fn handle_command(orchestrator: &SearchOrchestrator<GithubStore>, command: &str) -> bool {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    match tokens.as_slice() {
        ["quit"] | ["q"] => return false,
        ["sort", "-"] => {
            let _ = orchestrator.set_sort(SortEvent {
                active: String::new(),
                direction: None,
            });
        }
        ["sort", field, direction] => {
            if SortField::parse(field).is_none() {
                warn!(%field, "unknown sort field, clearing sort");
            }
            let _ = orchestrator.set_sort(SortEvent {
                active: (*field).to_string(),
                direction: SortOrder::parse(direction),
            });
        }
        ["page", index, size] => match (index.parse::<u32>(), size.parse::<u32>()) {
            (Ok(page_index), Ok(page_size)) if page_size >= 1 => {
                let _ = orchestrator.set_page(PageEvent {
                    page_index,
                    page_size,
                });
            }
            _ => println!("usage: :page <zero-based index> <size>"),
        },
        ["remove", index] => match index.parse::<usize>() {
            Ok(index) => {
                let chips = orchestrator.chips();
                match chips.get(index) {
                    Some(chip) => {
                        let _ = orchestrator.remove_chip(chip);
                    }
                    None => println!("no chip #{index}"),
                }
            }
            Err(_) => println!("usage: :remove <chip#>"),
        },
        ["url", raw] => match Url::parse(raw) {
            Ok(location) => orchestrator.address().navigate(location),
            Err(error) => println!("invalid location: {error}"),
        },
        _ => println!("commands: :sort :page :remove :url :quit"),
    }
    true
}

/// Waits for the current parameter change to settle: the loading span ends,
/// or a grace period passes for inputs that never engage the network.
async fn await_settlement(orchestrator: &SearchOrchestrator<GithubStore>) {
    let mut loading = orchestrator.subscribe_loading();

    let engaged = timeout(Duration::from_secs(2), async {
        while !*loading.borrow_and_update() {
            if loading.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .is_ok();

    if !engaged {
        return;
    }

    let _ = timeout(Duration::from_secs(30), async {
        while *loading.borrow_and_update() {
            if loading.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
}

fn render(orchestrator: &SearchOrchestrator<GithubStore>) {
    let chips = orchestrator.chips();
    if !chips.is_empty() {
        let labels: Vec<&str> = chips.iter().map(Chip::label).collect();
        println!("filters: [{}]", labels.join("] ["));
    }

    if let Some(error) = orchestrator.last_error() {
        println!("search failed: {error}");
    }

    let items = orchestrator.items();
    if orchestrator.is_empty() {
        println!("no repositories");
    } else {
        println!(
            "{} repositories (showing {})",
            orchestrator.count(),
            items.len()
        );
    }

    for repository in items {
        println!("  {}  ★ {}", repository.full_name, repository.stargazers_count);
        if let Some(description) = &repository.description {
            println!("    {description}");
        }
        if let Some(language) = &repository.language {
            println!("    language: {language}");
        }
        println!("    {}", repository.html_url);
    }

    println!("location: {}", orchestrator.address().location());
}
