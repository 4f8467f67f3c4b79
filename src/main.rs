use anyhow::Result;
use clap::Parser;
use kbc_storage::commands::{self, Config, ConnectionArgs};
use std::path::PathBuf;

/// kbc-storage - Keboola Storage API client
///
/// Talks to a Keboola Connection stack on behalf of one project token.
///
/// The token is read from --token or KBC_STORAGE_API_TOKEN. When KBC_RUNID is
/// set, requests are tagged with a run id nested under it.
///
/// Examples:
///   kbc-storage buckets list
///   kbc-storage files upload data.csv --tag export
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stack URL (also via KBC_STORAGE_API_URL; defaults to
    /// https://connection.keboola.com)
    #[arg(long, value_name = "URL", global = true)]
    url: Option<String>,

    /// Storage API token
    #[arg(long, value_name = "TOKEN", global = true)]
    token: Option<String>,

    /// Development branch id; branch-aware resources are addressed in it
    #[arg(long, value_name = "ID", global = true)]
    branch: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Inspect the current token
    #[command(subcommand)]
    Token(TokenCommand),

    /// Manage buckets
    #[command(subcommand)]
    Buckets(BucketsCommand),

    /// Inspect tables
    #[command(subcommand)]
    Tables(TablesCommand),

    /// Upload and inspect files
    #[command(subcommand)]
    Files(FilesCommand),

    /// Manage workspaces
    #[command(subcommand)]
    Workspaces(WorkspacesCommand),

    /// List components and their configurations
    #[command(subcommand)]
    Components(ComponentsCommand),

    /// List triggers
    #[command(subcommand)]
    Triggers(TriggersCommand),

    /// List project events
    #[command(subcommand)]
    Events(EventsCommand),

    /// Inspect asynchronous jobs
    #[command(subcommand)]
    Jobs(JobsCommand),
}

#[derive(clap::Subcommand, Debug)]
enum TokenCommand {
    /// Show the token's details and project
    Verify,
}

#[derive(clap::Subcommand, Debug)]
enum BucketsCommand {
    List {
        /// Extra data to include, e.g. "attributes,metadata"
        #[arg(long)]
        include: Option<String>,
    },
    Get {
        #[arg(value_name = "BUCKET_ID")]
        bucket_id: String,
    },
    Create {
        name: String,
        /// "in" or "out"
        #[arg(long, default_value = "in")]
        stage: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        backend: Option<String>,
    },
    Drop {
        #[arg(value_name = "BUCKET_ID")]
        bucket_id: String,
        /// Drop the bucket together with its tables
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum TablesCommand {
    List {
        /// Only tables of this bucket
        #[arg(long)]
        bucket: Option<String>,
    },
    Get {
        #[arg(value_name = "TABLE_ID")]
        table_id: String,
    },
    /// Print the first rows as CSV
    Preview {
        #[arg(value_name = "TABLE_ID")]
        table_id: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Export a table into a local file
    Export {
        #[arg(value_name = "TABLE_ID")]
        table_id: String,
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// "rfc" (default), "raw" or "escaped"
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        gzip: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum FilesCommand {
    /// Upload a file. Several paths are uploaded as slices of one sliced file.
    Upload {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        /// File name (required for sliced files)
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        permanent: bool,
    },
    List {
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Get {
        #[arg(value_name = "FILE_ID")]
        file_id: u64,
    },
}

#[derive(clap::Subcommand, Debug)]
enum WorkspacesCommand {
    List,
    Create {
        #[arg(long)]
        backend: Option<String>,
    },
    Delete {
        #[arg(value_name = "WORKSPACE_ID")]
        workspace_id: u64,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ComponentsCommand {
    List {
        /// e.g. "extractor", "writer", "transformation"
        #[arg(long = "type")]
        component_type: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum TriggersCommand {
    List {
        #[arg(long)]
        component: Option<String>,
        #[arg(long)]
        configuration: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum EventsCommand {
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        run_id: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum JobsCommand {
    Get {
        #[arg(value_name = "JOB_ID")]
        job_id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = kbc_storage::runtime::RealRuntime;

    let config = Config::new(
        &runtime,
        ConnectionArgs {
            url: cli.url,
            token: cli.token,
            branch: cli.branch,
        },
    )?;

    match cli.command {
        Commands::Token(TokenCommand::Verify) => commands::project::verify_token(&config).await?,
        Commands::Buckets(command) => match command {
            BucketsCommand::List { include } => {
                commands::buckets::list(&config, include.as_deref()).await?
            }
            BucketsCommand::Get { bucket_id } => commands::buckets::get(&config, &bucket_id).await?,
            BucketsCommand::Create {
                name,
                stage,
                description,
                backend,
            } => {
                commands::buckets::create(
                    &config,
                    &name,
                    &stage,
                    description.as_deref(),
                    backend.as_deref(),
                )
                .await?
            }
            BucketsCommand::Drop { bucket_id, force } => {
                commands::buckets::drop(&config, &bucket_id, force).await?
            }
        },
        Commands::Tables(command) => match command {
            TablesCommand::List { bucket } => {
                commands::tables::list(&config, bucket.as_deref()).await?
            }
            TablesCommand::Get { table_id } => commands::tables::get(&config, &table_id).await?,
            TablesCommand::Preview {
                table_id,
                limit,
                columns,
            } => commands::tables::preview(&config, &table_id, limit, columns).await?,
            TablesCommand::Export {
                table_id,
                path,
                format,
                gzip,
            } => commands::tables::export(&config, &table_id, &path, format, gzip).await?,
        },
        Commands::Files(command) => match command {
            FilesCommand::Upload {
                paths,
                name,
                tags,
                permanent,
            } => commands::files::upload(&config, &paths, name, tags, permanent).await?,
            FilesCommand::List { tags, limit } => {
                commands::files::list(&config, tags, limit).await?
            }
            FilesCommand::Get { file_id } => commands::files::get(&config, file_id).await?,
        },
        Commands::Workspaces(command) => match command {
            WorkspacesCommand::List => commands::workspaces::list(&config).await?,
            WorkspacesCommand::Create { backend } => {
                commands::workspaces::create(&config, backend).await?
            }
            WorkspacesCommand::Delete { workspace_id } => {
                commands::workspaces::delete(&config, workspace_id).await?
            }
        },
        Commands::Components(ComponentsCommand::List { component_type }) => {
            commands::project::list_components(&config, component_type).await?
        }
        Commands::Triggers(TriggersCommand::List {
            component,
            configuration,
        }) => {
            commands::project::list_triggers(&config, component.as_deref(), configuration.as_deref())
                .await?
        }
        Commands::Events(EventsCommand::List { limit, run_id }) => {
            commands::project::list_events(&config, limit, run_id).await?
        }
        Commands::Jobs(JobsCommand::Get { job_id }) => {
            commands::project::get_job(&config, job_id).await?
        }
    }
    Ok(())
}
