//! arcgis-mcp: MCP server for read-only ArcGIS discovery and analysis.
//!
//! Usage:
//!   arcgis-mcp --mcp                          # Start MCP server on stdio
//!   arcgis-mcp layers <query>                 # Search feature services
//!   arcgis-mcp content <query> --type 'Web Map'
//!   arcgis-mcp table <layer-url> --limit 20   # Attribute table as CSV
//!   arcgis-mcp item <item-id>                 # Item definition JSON
//!   arcgis-mcp summarize <layer-url> <field>  # Field statistics

use anyhow::Context;
use arcgis_mcp::portal::SortOrder;
use arcgis_mcp::{config, fmt, tools, ArcGisClient, ArcGisServer, Config, Portal};
use clap::{CommandFactory, Parser, Subcommand};
use rmcp::ServiceExt;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[cfg_attr(test, derive(Debug))]
#[command(name = "arcgis-mcp")]
#[command(about = "MCP server for read-only ArcGIS content discovery and analysis")]
#[command(version)]
struct Cli {
    /// Run as MCP server (stdin/stdout JSON-RPC)
    #[arg(long)]
    mcp: bool,

    /// Portal root URL
    #[arg(long, env = "ARCGIS_PORTAL_URL", default_value = config::DEFAULT_PORTAL_URL)]
    portal_url: String,

    /// Token or API key sent with every request
    #[arg(long, env = "ARCGIS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Referer header for referer-bound tokens
    #[arg(long, env = "ARCGIS_REFERER")]
    referer: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "ARCGIS_TIMEOUT_SECS", default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Disable coloured CLI output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
#[cfg_attr(test, derive(Debug))]
enum Commands {
    /// Search for feature services
    Layers {
        /// Search terms
        #[arg(default_value = "")]
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// List each service's layer URLs
        #[arg(long)]
        layers: bool,
    },

    /// Search all portal content
    Content {
        /// Search terms
        #[arg(default_value = "")]
        query: String,

        /// Item type filter, e.g. "Web Map"
        #[arg(short = 't', long = "type")]
        item_type: Option<String>,

        /// Owner filter
        #[arg(short, long)]
        owner: Option<String>,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Sort field (title, created, modified, numviews)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Print a layer's attribute table as CSV
    Table {
        /// Layer URL (.../FeatureServer/<id>)
        url: String,

        /// SQL where clause
        #[arg(short, long = "where")]
        where_clause: Option<String>,

        /// Maximum rows
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Columns to include (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },

    /// Print an item's definition as JSON
    Item {
        /// 32-character item id
        id: String,

        /// Skip the item's data resource
        #[arg(long)]
        no_data: bool,
    },

    /// Summarize one field of a layer
    Summarize {
        /// Layer URL (.../FeatureServer/<id>)
        url: String,

        /// Field name
        field: String,

        /// SQL where clause
        #[arg(short, long = "where")]
        where_clause: Option<String>,

        /// Maximum features sampled
        #[arg(short, long, default_value = "2000")]
        limit: usize,

        /// Most frequent values shown for text fields
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before clap reads ARCGIS_* fallbacks
    let dotenv_path = std::env::var_os("ARCGIS_DOTENV").map(PathBuf::from);
    let dotenv_loaded = config::load_dotenv(dotenv_path.as_deref())?;

    let cli = Cli::parse();

    // CRITICAL: Log to stderr only (stdout is JSON-RPC for MCP)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arcgis_mcp=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &dotenv_loaded {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = Config::new(
        &cli.portal_url,
        cli.token.clone(),
        cli.referer.clone(),
        cli.timeout_secs,
    )?;
    tracing::debug!(?config, "configuration loaded");

    let client = ArcGisClient::new(config).context("failed to build HTTP client")?;

    if cli.mcp {
        run_mcp_server(Arc::new(client)).await
    } else if let Some(cmd) = cli.command {
        let color = !cli.no_color && std::io::stdout().is_terminal();
        run_cli(&client, cmd, color).await
    } else {
        // Default: show help
        eprintln!("Use --mcp to start MCP server, or a subcommand for CLI mode.");
        eprintln!("Run with --help for more information.");
        std::process::exit(1);
    }
}

async fn run_mcp_server(portal: Arc<dyn Portal>) -> anyhow::Result<()> {
    tracing::info!("Starting MCP server for portal: {}", portal.portal_url());

    let server = ArcGisServer::new(portal);

    // Run the MCP server on stdin/stdout
    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

async fn run_cli(portal: &dyn Portal, cmd: Commands, color: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    match cmd {
        Commands::Layers {
            query,
            limit,
            layers,
        } => {
            let input = tools::SearchLayersInput {
                query,
                max_results: limit,
                include_layers: layers,
            };
            let out = tools::execute_search_layers(portal, input).await?;
            fmt::fmt_search_layers(&mut stdout, &out, color)?;
        }

        Commands::Content {
            query,
            item_type,
            owner,
            limit,
            sort,
            desc,
        } => {
            let input = tools::SearchContentInput {
                query,
                item_type,
                owner,
                max_results: limit,
                sort_order: sort.is_some().then_some(if desc {
                    SortOrder::Desc
                } else {
                    SortOrder::Asc
                }),
                sort_field: sort,
            };
            let out = tools::execute_search_content(portal, input).await?;
            fmt::fmt_search_content(&mut stdout, &out, color)?;
        }

        Commands::Table {
            url,
            where_clause,
            limit,
            fields,
        } => {
            let input = tools::FeatureTableInput {
                service_url: url,
                where_clause,
                max_records: limit,
                out_fields: fields,
            };
            let out = tools::execute_feature_table(portal, input).await?;
            fmt::fmt_feature_table(&mut stdout, &out)?;
        }

        Commands::Item { id, no_data } => {
            let input = tools::ItemDefinitionInput {
                item_id: id,
                include_data: !no_data,
            };
            let out = tools::execute_item_definition(portal, input).await?;
            fmt::fmt_item_definition(&mut stdout, &out)?;
        }

        Commands::Summarize {
            url,
            field,
            where_clause,
            limit,
            top,
        } => {
            let input = tools::SummarizeFieldInput {
                service_url: url,
                field,
                where_clause,
                max_records: limit,
                top_n: top,
            };
            let out = tools::execute_summarize_field(portal, input).await?;
            fmt::fmt_field_summary(&mut stdout, &out, color)?;
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "arcgis-mcp", &mut stdout);
        }
    }

    stdout.flush()?;
    Ok(())
}
