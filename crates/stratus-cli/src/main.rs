//! Stratus - deploy functions and assets to a serverless platform
//!
//! Usage:
//!   stratus deploy                 # Deploy the project in the current directory
//!   stratus promote --to prod ...  # Activate an existing build elsewhere
//!   stratus env set KEY=VALUE      # Manage environment variables
//!   stratus list [types]           # Inspect deployed resources

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stratus_core::api::{ApiConfig, HttpApi, MemoryApi, ServerlessApi};
use stratus_core::config::{StratusConfig, deploy_variables, resolve_credentials};
use stratus_core::context::AppContext;
use stratus_core::deploy::activate::find_environment;
use stratus_core::deploy::{
    BuildSource, DeployClient, DeployLocalProjectConfig, DeployProjectConfig, EnvVars,
    PromoteConfig, variables,
};
use stratus_core::fs::ListingOptions;
use stratus_core::list::{ListConfig, ListType, list_resources};

const DEFAULT_ENVIRONMENT: &str = "dev";

#[derive(Parser)]
#[command(name = "stratus", version)]
#[command(about = "Deploy functions and assets to a serverless platform", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, Default, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Human-readable output
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the project's functions and assets
    Deploy(Box<DeployArgs>),

    /// Activate an existing build on an environment
    #[command(alias = "activate")]
    Promote(PromoteArgs),

    /// Manage environment variables
    Env(EnvArgs),

    /// List deployed resources
    List(ListArgs),
}

#[derive(Args, Clone, Default)]
struct ConnectionArgs {
    /// Account sid (falls back to STRATUS_ACCOUNT_SID, then ACCOUNT_SID in .env)
    #[arg(long, global = true)]
    account_sid: Option<String>,

    /// Auth token (falls back to STRATUS_AUTH_TOKEN, then AUTH_TOKEN in .env)
    #[arg(long, global = true)]
    auth_token: Option<String>,

    /// Path to the .env file, relative to the project directory
    #[arg(long = "env", global = true)]
    env_file: Option<PathBuf>,

    /// Platform region
    #[arg(long, global = true, env = "STRATUS_REGION")]
    region: Option<String>,

    /// Platform edge location
    #[arg(long, global = true, env = "STRATUS_EDGE")]
    edge: Option<String>,
}

#[derive(Args)]
struct DeployArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Deploy into this service instead of the one recorded in stratus.toml
    #[arg(long)]
    service_sid: Option<String>,

    /// Unique name of the service (defaults to the package.json name)
    #[arg(long, short = 'n')]
    service_name: Option<String>,

    /// Domain suffix of the target environment
    #[arg(long, short = 'e')]
    environment: Option<String>,

    /// Folder holding the functions
    #[arg(long)]
    functions_folder: Option<String>,

    /// Folder holding the assets
    #[arg(long)]
    assets_folder: Option<String>,

    /// Skip deploying functions
    #[arg(long)]
    no_functions: bool,

    /// Skip deploying assets
    #[arg(long)]
    no_assets: bool,

    /// Run the deployment against an in-memory platform
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct PromoteArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Service containing the build
    #[arg(long)]
    service_sid: Option<String>,

    /// Build to activate
    #[arg(long, alias = "from-build", conflicts_with = "source_environment")]
    build_sid: Option<String>,

    /// Environment whose live build is promoted (sid or domain suffix)
    #[arg(long, alias = "from")]
    source_environment: Option<String>,

    /// Target environment (sid or domain suffix)
    #[arg(long, short = 'e', alias = "to")]
    environment: String,

    /// Create the target environment if it does not exist
    #[arg(long)]
    create_environment: bool,

    /// Variable to set on the target before activation
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    vars: Vec<(String, String)>,
}

#[derive(Args)]
struct EnvArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Service the environment belongs to
    #[arg(long, global = true)]
    service_sid: Option<String>,

    /// Environment (sid or domain suffix)
    #[arg(long, short = 'e', global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: EnvSubcommand,
}

#[derive(Subcommand)]
enum EnvSubcommand {
    /// Set one or more variables
    Set {
        #[arg(required = true, value_name = "KEY=VALUE", value_parser = parse_key_value)]
        pairs: Vec<(String, String)>,
    },
    /// Remove one or more variables
    Unset {
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },
    /// Show all variables
    List,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// What to list, comma separated
    #[arg(
        value_delimiter = ',',
        default_value = "services,environments,functions,assets"
    )]
    types: Vec<ListType>,

    /// Service sid or unique name
    #[arg(long)]
    service: Option<String>,

    /// Environment to read variables from
    #[arg(long, short = 'e')]
    environment: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "stratus=debug,stratus_core=debug,info"
    } else {
        "stratus=info,stratus_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let project_root = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let ctx = AppContext::new(project_root);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run_cli(ctx, cli.command, cli.format))
}

async fn run_cli(ctx: AppContext, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Deploy(args) => run_deploy(&ctx, *args, format).await,
        Commands::Promote(args) => run_promote(&ctx, args, format).await,
        Commands::Env(args) => run_env(&ctx, args, format).await,
        Commands::List(args) => run_list(&ctx, args, format).await,
    }
}

/// A connected platform and the account it belongs to.
struct Connection {
    api: Arc<dyn ServerlessApi>,
    account_sid: String,
    local_env: EnvVars,
}

fn connect(ctx: &AppContext, args: &ConnectionArgs, config: &StratusConfig) -> Result<Connection> {
    let local_env = ctx.read_env(args.env_file.as_deref())?;
    let credentials =
        resolve_credentials(args.account_sid.clone(), args.auth_token.clone(), &local_env)?;

    let region = args.region.as_deref().or(config.project.region.as_deref());
    let edge = args.edge.as_deref().or(config.project.edge.as_deref());
    let api_config = ApiConfig::new(&credentials.account_sid, &credentials.auth_token)
        .with_region(region, edge)?;
    let api = HttpApi::new(&api_config)?;
    tracing::debug!(
        account = %credentials.account_sid,
        base_url = %api_config.base_url,
        "connected"
    );

    Ok(Connection {
        api: Arc::new(api),
        account_sid: credentials.account_sid,
        local_env,
    })
}

async fn run_deploy(ctx: &AppContext, args: DeployArgs, format: OutputFormat) -> Result<()> {
    let config = ctx.load_config()?;
    let package = ctx.package_json()?;

    // Dry runs never touch the network nor record a service sid.
    let (api, local_env, account_sid): (Arc<dyn ServerlessApi>, EnvVars, Option<String>) =
        if args.dry_run {
            let local_env = ctx.read_env(args.connection.env_file.as_deref())?;
            (Arc::new(MemoryApi::new()), local_env, None)
        } else {
            let connection = connect(ctx, &args.connection, &config)?;
            (
                connection.api,
                connection.local_env,
                Some(connection.account_sid),
            )
        };

    let recorded_service = account_sid
        .as_deref()
        .and_then(|account| config.service_sid(account))
        .map(str::to_string);
    let service_sid = args.service_sid.or(recorded_service);
    let service_name = args
        .service_name
        .or(config.project.service_name.clone())
        .or(package.name.clone())
        .unwrap_or_default();
    if service_sid.is_none() && service_name.is_empty() {
        anyhow::bail!("Please pass --service-name or add a \"name\" field to your package.json");
    }

    let deploy_config = DeployLocalProjectConfig {
        root: ctx.project_root().to_path_buf(),
        listing: ListingOptions {
            functions_dir: args.functions_folder.or(config.project.functions_dir.clone()),
            assets_dir: args.assets_folder.or(config.project.assets_dir.clone()),
            no_functions: args.no_functions,
            no_assets: args.no_assets,
        },
        project: DeployProjectConfig {
            service_sid,
            service_name,
            environment: args
                .environment
                .or(config.project.environment.clone())
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            dependencies: package.dependencies(),
            env: deploy_variables(&local_env),
            ..Default::default()
        },
    };

    let client = DeployClient::new(api);
    let progress = render::spawn_progress(client.subscribe(), format);
    let outcome = client.deploy_local_project(deploy_config).await;
    drop(client);
    progress.await.context("Progress output failed")?;
    let result = outcome.context("Deployment failed")?;

    if let Some(account_sid) = account_sid {
        ctx.project_store()
            .remember_service(&account_sid, &result.service_sid)
            .context("Failed to record the service sid in stratus.toml")?;
    }

    render::print_deploy_result(&result, format)
}

async fn run_promote(ctx: &AppContext, args: PromoteArgs, format: OutputFormat) -> Result<()> {
    let config = ctx.load_config()?;
    let connection = connect(ctx, &args.connection, &config)?;
    let service_sid = recorded_service_sid(args.service_sid, &config, &connection.account_sid)?;

    let source = match (args.build_sid, args.source_environment) {
        (Some(build), _) => BuildSource::Build(build),
        (None, Some(env)) => BuildSource::Environment(env),
        (None, None) => anyhow::bail!("Pass either --build-sid or --source-environment"),
    };

    let client = DeployClient::new(connection.api);
    let progress = render::spawn_progress(client.subscribe(), format);
    let outcome = client
        .promote(PromoteConfig {
            service_sid,
            source,
            target_environment: args.environment,
            create_environment: args.create_environment,
            env: args.vars.into_iter().collect(),
        })
        .await;
    drop(client);
    progress.await.context("Progress output failed")?;
    let result = outcome.context("Promotion failed")?;

    render::print_promote_result(&result, format)
}

async fn run_env(ctx: &AppContext, args: EnvArgs, format: OutputFormat) -> Result<()> {
    let config = ctx.load_config()?;
    let connection = connect(ctx, &args.connection, &config)?;
    let service_sid = recorded_service_sid(args.service_sid, &config, &connection.account_sid)?;
    let api = connection.api.as_ref();

    let key = args
        .environment
        .or(config.project.environment.clone())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
    let environment = find_environment(api, &service_sid, &key).await?;

    match args.command {
        EnvSubcommand::Set { pairs } => {
            let vars: EnvVars = pairs.into_iter().collect();
            variables::set_all(api, &service_sid, &environment.sid, &vars).await?;
            println!("Set {} variable(s) on {}", vars.len(), environment.unique_name);
        }
        EnvSubcommand::Unset { keys } => {
            let removed = variables::unset(api, &service_sid, &environment.sid, &keys).await?;
            for key in keys.iter().filter(|k| !removed.contains(k)) {
                tracing::warn!(%key, "variable was not set");
            }
            println!(
                "Removed {} variable(s) from {}",
                removed.len(),
                environment.unique_name
            );
        }
        EnvSubcommand::List => {
            let vars = variables::list(api, &service_sid, &environment.sid).await?;
            render::print_variables(&vars, format)?;
        }
    }
    Ok(())
}

async fn run_list(ctx: &AppContext, args: ListArgs, format: OutputFormat) -> Result<()> {
    let config = ctx.load_config()?;
    let connection = connect(ctx, &args.connection, &config)?;

    let service = args
        .service
        .or_else(|| {
            config
                .service_sid(&connection.account_sid)
                .map(str::to_string)
        })
        .or(config.project.service_name.clone());
    let result = list_resources(
        connection.api.as_ref(),
        &ListConfig {
            service,
            environment: args.environment.or(config.project.environment.clone()),
            types: args.types,
        },
    )
    .await?;

    render::print_list(&result, format)
}

fn recorded_service_sid(
    flag: Option<String>,
    config: &StratusConfig,
    account_sid: &str,
) -> Result<String> {
    flag.or_else(|| config.service_sid(account_sid).map(str::to_string))
        .with_context(|| {
            format!(
                "No service sid for account {}: pass --service-sid or deploy first",
                account_sid
            )
        })
}

fn parse_key_value(input: &str) -> Result<(String, String)> {
    let (key, value) = input
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{}'", input))?;
    if key.trim().is_empty() {
        anyhow::bail!("Variable name cannot be empty in '{}'", input);
    }
    Ok((key.trim().to_string(), value.to_string()))
}
