use clap::Parser;
use mongo_rs_init::config::{Config, ConfigLoader, LogFormat, LoggingConfig, Profile};
use mongo_rs_init::error::AppResult;
use mongo_rs_init::initializer::{InitSettings, Initializer, RunReport};
use mongo_rs_init::logging;
use mongo_rs_init::session::{redact_uri, MongoSession};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "rs-init",
    version,
    about = "Initialize a single-node MongoDB replica set and optionally create the root user.",
    long_about = "Runs once at container startup. Detects an existing replica set, otherwise \
                  submits a one-member configuration, waits for the member to become PRIMARY \
                  and creates the root user from MONGO_INITDB_ROOT_USERNAME / \
                  MONGO_INITDB_ROOT_PASSWORD. Exits 0 on every path unless --strict is given."
)]
struct Args {
    /// Configuration file (overrides the standard search locations).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Connection string of the member to bootstrap.
    #[arg(long, value_name = "URI")]
    uri: Option<String>,

    /// Bootstrap profile: `local` (startup hook) or `remote` (sibling container).
    #[arg(long)]
    profile: Option<Profile>,

    /// Replica set name.
    #[arg(long, value_name = "NAME")]
    set_name: Option<String>,

    /// Member host:port used in the initiate document.
    #[arg(long, value_name = "HOST:PORT")]
    host: Option<String>,

    /// Status queries made while waiting for PRIMARY.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Pause between status queries, in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Do not wait for the member to become PRIMARY.
    #[arg(long)]
    no_wait: bool,

    /// Never create the admin user.
    #[arg(long)]
    no_admin: bool,

    /// Print the initiate document and exit without contacting the database.
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 1 when the bootstrap fails.
    #[arg(long)]
    strict: bool,

    /// Log level or filter directive.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format: pretty, compact or json.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(ref uri) = self.uri {
            config.mongo.uri = uri.clone();
        }
        if let Some(profile) = self.profile {
            config.replica_set.profile = profile;
        }
        if let Some(ref name) = self.set_name {
            config.replica_set.name = name.clone();
        }
        if let Some(ref host) = self.host {
            config.replica_set.host = Some(host.clone());
        }
        if let Some(attempts) = self.max_attempts {
            config.bootstrap.max_attempts = attempts;
        }
        if let Some(interval) = self.interval_ms {
            config.bootstrap.interval_ms = interval;
        }
        if self.no_wait {
            config.bootstrap.wait_for_primary = Some(false);
        }
        if self.no_admin {
            config.bootstrap.provision_admin = Some(false);
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

fn load_config(args: &Args) -> AppResult<Config> {
    let loader = match args.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    args.apply(&mut config);
    Ok(config)
}

async fn run(args: &Args) -> AppResult<Option<RunReport>> {
    let config = load_config(args)?;
    logging::init_logging(&config.logging);
    config.validate()?;

    let settings = InitSettings::from_config(&config);

    if args.dry_run {
        let document = serde_json::json!({ "replSetInitiate": settings.replica_set_config() });
        info!(
            endpoint = %redact_uri(&config.mongo.uri),
            wait_for_primary = settings.wait_for_primary,
            provision_admin = settings.provision_admin,
            "Dry run, would submit: {}",
            document
        );
        return Ok(None);
    }

    let session = MongoSession::connect(&config.mongo).await?;
    let report = Initializer::new(session, settings).run().await;
    info!(state = ?report.state, admin = ?report.admin, "Bootstrap finished");

    Ok(Some(report))
}

/// Whether a run should count as failed for `--strict`.
fn run_failed(outcome: &AppResult<Option<RunReport>>) -> bool {
    match outcome {
        Ok(report) => report.as_ref().is_some_and(RunReport::is_failure),
        Err(_) => true,
    }
}

/// Exit status: success on every path unless `strict` and the run failed.
fn exit_code(failed: bool, strict: bool) -> ExitCode {
    if failed && strict {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let outcome = run(&args).await;
    if let Err(ref e) = outcome {
        // Logging may not be set up yet if the configuration was unusable.
        logging::init_logging(&LoggingConfig::default());
        error!("Init replica error: {e}");
    }

    exit_code(run_failed(&outcome), args.strict)
}
