//! OneFS Provisioner
//!
//! Prepares an access zone of a OneFS cluster for a Hadoop distribution.
//!
//! ```text
//! onefs-provisioner create-users       --zone hadoop --dist hdp isilon.example.com
//! onefs-provisioner create-directories --zone hadoop --dist hdp isilon.example.com
//! ```
//!
//! `create-users` also writes a shell script that creates the same users
//! and groups, with the same ids, on Linux hosts.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use onefs_provisioner::{
    Client, DirectoryProvisioner, Distribution, DryRun, Error, IdentityProvisioner, Settings,
    TracingSink, DRY_RUN_BANNER,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// OneFS Provisioner - Hadoop users, groups and directories on OneFS
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the users and groups a Hadoop distribution needs
    CreateUsers {
        #[command(flatten)]
        common: CommonArgs,

        /// First UID to try
        #[arg(long, env = "START_UID")]
        start_uid: Option<u32>,

        /// First GID to try
        #[arg(long, env = "START_GID")]
        start_gid: Option<u32>,
    },

    /// Create the HDFS directory tree a Hadoop distribution needs
    CreateDirectories {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Command {
    fn common(&self) -> &CommonArgs {
        match self {
            Command::CreateUsers { common, .. } | Command::CreateDirectories { common } => common,
        }
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Name or IP address of the OneFS cluster (a SmartConnect name works)
    #[arg(env = "ONEFS_ADDRESS")]
    onefs_address: Option<String>,

    /// Access zone to provision
    #[arg(long, short = 'z', env = "ONEFS_ZONE")]
    zone: Option<String>,

    /// OneFS user with ISI_PRIV_LOGIN_PAPI
    #[arg(long, env = "ONEFS_USER")]
    onefs_user: Option<String>,

    /// Password of the OneFS user
    #[arg(long, env = "ONEFS_PASSWORD", hide_env_values = true)]
    onefs_password: Option<String>,

    /// Do not verify the OneFS HTTPS certificate
    #[arg(long)]
    no_verify: bool,

    /// Hadoop distribution
    #[arg(long, value_enum)]
    dist: Option<Distribution>,

    /// Append a cluster name to every user and group name
    #[arg(long, value_name = "CLUSTER_NAME")]
    append_cluster_name: Option<String>,

    /// Log what would happen without changing anything
    #[arg(long)]
    dry: bool,

    /// YAML settings file; command line values take precedence
    #[arg(long, env = "ONEFS_PROVISIONER_CONFIG")]
    config: Option<PathBuf>,

    /// Give up after this many "temporarily unavailable" answers per call
    #[arg(long)]
    max_retries: Option<u32>,

    #[command(flatten)]
    logging: LogArgs,
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Do not log to the console
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.command.common().logging) {
        eprintln!("Cannot initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if let Some(hint) = e.downcast_ref::<Error>().and_then(Error::hint) {
                error!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    info!("{} {}", onefs_provisioner::NAME, onefs_provisioner::VERSION);
    match command {
        Command::CreateUsers {
            common,
            start_uid,
            start_gid,
        } => {
            let mut overrides = common_settings(&common);
            overrides.identities.start_uid = start_uid;
            overrides.identities.start_gid = start_gid;
            let settings = load_settings(&common, overrides).await?;
            create_users(&settings, common.dry).await
        }
        Command::CreateDirectories { common } => {
            let settings = load_settings(&common, common_settings(&common)).await?;
            create_directories(&settings, common.dry).await
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

fn common_settings(common: &CommonArgs) -> Settings {
    let mut settings = Settings::default();
    settings.onefs.address = common.onefs_address.clone();
    settings.onefs.user = common.onefs_user.clone();
    settings.onefs.password = common.onefs_password.clone();
    settings.onefs.zone = common.zone.clone();
    settings.onefs.verify_tls = common.no_verify.then_some(false);
    settings.onefs.max_retries = common.max_retries;
    settings.dist = common.dist;
    settings.cluster_name = common.append_cluster_name.clone();
    settings
}

async fn load_settings(common: &CommonArgs, overrides: Settings) -> anyhow::Result<Settings> {
    let file = match &common.config {
        Some(path) => Settings::load(path)
            .await
            .with_context(|| format!("Cannot load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    Ok(file.overlay(overrides))
}

async fn connect(settings: &Settings) -> anyhow::Result<Client> {
    let config = settings.client_config()?;
    info!("Connecting to {}...", config.address);
    let client = Client::for_hdfs(config).await?;
    info!(
        revision = %client.cluster_revision(),
        binding = %client.binding(),
        "Connected to OneFS at {}.",
        client.address()
    );
    Ok(client)
}

// =============================================================================
// Commands
// =============================================================================

async fn create_users(settings: &Settings, dry: bool) -> anyhow::Result<()> {
    let zone = settings.zone()?;
    let dist = settings.dist()?;
    let suffix = settings.identity_suffix().unwrap_or_default();
    let identities = dist.identities(zone).with_suffix(&suffix);
    let script_path = std::env::current_dir()?.join(format!(
        "{}-{}-{}{}.sh",
        chrono::Utc::now().timestamp(),
        zone,
        dist,
        suffix
    ));

    let client = connect(settings).await?;
    let events = TracingSink;

    if dry {
        info!("{}", DRY_RUN_BANNER);
        info!("The script would have been written to {}.", script_path.display());
        let store = DryRun::new(&client);
        IdentityProvisioner::new(&store, &events, settings.identity_config(None)?)
            .create_identities(&identities)
            .await?;
        return Ok(());
    }

    let config = settings.identity_config(Some(script_path.clone()))?;
    let report = IdentityProvisioner::new(&client, &events, config)
        .create_identities(&identities)
        .await?;
    info!(
        created = report.created(),
        groups = report.groups.len(),
        users = report.users.len(),
        proxy_users = report.proxy_users.len(),
        "The {} identities of the {} zone are in place.",
        dist,
        zone
    );
    info!(
        "Run {} on every Linux host of the cluster to create the same identities there.",
        script_path.display()
    );
    Ok(())
}

async fn create_directories(settings: &Settings, dry: bool) -> anyhow::Result<()> {
    let zone = settings.zone()?;
    let dist = settings.dist()?;
    let suffix = settings.identity_suffix();
    let directories = dist.directories(suffix.as_deref());

    let client = connect(settings).await?;
    let events = TracingSink;

    if dry {
        info!("{}", DRY_RUN_BANNER);
        let store = DryRun::new(&client);
        DirectoryProvisioner::new(&store, &events, zone)
            .create(&directories)
            .await?;
        return Ok(());
    }

    let report = DirectoryProvisioner::new(&client, &events, zone)
        .create(&directories)
        .await?;
    info!(
        created = report.created.len(),
        existing = report.existing.len(),
        "The {} directories of the {} zone are in place.",
        dist,
        zone
    );
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &LogArgs) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("rustls=warn".parse()?);

    let console = (!args.quiet).then(|| {
        if args.log_json {
            fmt::layer().json().boxed()
        } else {
            fmt::layer().with_target(false).boxed()
        }
    });

    let file = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}
