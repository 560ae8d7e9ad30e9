use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ckc::automation::{Automation, AutomationOptions};
use ckc::aws::CloudIdentity;
use ckc::config::{self, CONFIG_FILE_NAME, PROJECT_FILE_NAME};
use ckc::config_map::{ConfigMap, ConfigValue};
use ckc::hooks::LocalFileHooks;
use ckc::options::{AppOptions, DestroyOptions, InitOptions, Settings};
use ckc::plan::{self, RunPlan};
use ckc::progress::ConsoleProgress;
use ckc::pulumi::PulumiCli;
use ckc::registry::catalogue;
use ckc::run::Runner;

const ENVIRONMENT_VAR: &str = "CKC_ENV";
const DEFAULT_MIRROR_DIR: &str = ".ckc/stacks";

#[derive(Parser)]
#[command(name = "ckc")]
#[command(
    about = "Provision an EKS cluster and its platform stacks with Pulumi",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print engine output verbatim and log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Project config file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cluster and the stacks running on it
    Init(InitOptions),

    /// Build and deploy the staging and prod app stacks
    App(AppOptions),

    /// Destroy the project's stacks, newest first
    Destroy(DestroyOptions),
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "ckc=debug" } else { "ckc=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug = cli.debug;
    init_tracing(debug);

    let project_root = env::current_dir().context("Unable to read the working directory")?;
    let file = config::parse(&project_root.join(&cli.config))
        .with_context(|| format!("Unable to load {}", cli.config.display()))?;
    let project = config::project_name(&project_root.join(PROJECT_FILE_NAME))
        .context("Unable to read the Pulumi project")?;

    let init = match &cli.command {
        Commands::Init(options) => options.clone().layered(&file.init),
        _ => file.init.clone(),
    };
    config::validate(&init).context("Invalid init options")?;

    let identity = CloudIdentity::resolve(init.aws_region.as_ref())
        .await
        .context("Unable to resolve the AWS identity")?;
    let mut settings = Settings::new(project.as_str(), project_root.clone())
        .with_identity(&identity)
        .with_init(&init);

    let plan = match cli.command {
        Commands::Init(_) => RunPlan::up("init", plan::configured_init_stacks(&init.stacks))?,
        Commands::App(options) => {
            let app = options.layered(&file.app);
            config::validate(&app).context("Invalid app options")?;
            settings = settings.with_app(&app);

            let stacks =
                plan::app_stacks(app.build.unwrap_or(false), app.create_db.unwrap_or(false));
            RunPlan::up("app", stacks)?
        }
        Commands::Destroy(options) => {
            let destroy = options.layered(&file.destroy);
            let stacks = plan::destroy_stacks(
                plan::configured_init_stacks(&init.stacks),
                destroy.keep_cluster.unwrap_or(false),
            );
            RunPlan::destroy("destroy", stacks, destroy.remove_stacks.unwrap_or(false))?
        }
    };

    let mut global_config = ConfigMap::new();
    if let Some(region) = &settings.aws_region {
        global_config.insert("aws:region", ConfigValue::plain(region.as_str()));
    }
    global_config.extend(&file.global_config);

    let mirror_dir = file
        .mirror_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MIRROR_DIR));
    let hooks = LocalFileHooks {
        project_root: project_root.clone(),
        mirror_dir: project_root.join(mirror_dir),
        development: env::var(ENVIRONMENT_VAR).map(|value| value == "development").unwrap_or(false),
        use_direnv: init.use_direnv.unwrap_or(false),
    };

    let automation = Automation::new(
        settings.project.clone(),
        settings.organization.clone(),
        Arc::new(PulumiCli::new(project_root.clone())),
        AutomationOptions {
            global_config,
            hooks: Arc::new(hooks),
            progress: Arc::new(ConsoleProgress::new(debug)),
        },
    );
    let mut runner = Runner::new(automation, catalogue::builtin(), settings);

    println!(
        "{}",
        format!("Running {} for project '{}'", plan.command, project).cyan().bold()
    );
    let completed = runner
        .run(&plan)
        .await
        .with_context(|| format!("{} stopped", plan.command))?;

    println!(
        "{} {}",
        "✔".green().bold(),
        format!("{} finished, {} stack(s) processed", plan.command, completed.len()).green()
    );

    return Ok(());
}
