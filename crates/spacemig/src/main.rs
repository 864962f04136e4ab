mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use spacemig_core::client::{ConfluenceSource, ConfluenceTarget};
use spacemig_core::commands::{
    CommandSurface, count_space_content, create_target_space, get_space_details, list_spaces,
    migrate_space,
};
use spacemig_core::contracts::{
    CreateSpacePayload, MigrateSpacePayload, accepted_method_names,
};
use spacemig_core::driver::MigrationOptions;
use spacemig_core::progress::{CancelToken, TracingProgress};
use spacemig_core::runtime::{
    ResolutionContext, ResolvedRuntime, RuntimeOverrides, resolve_runtime,
};
use tracing::{debug, warn};

#[derive(Debug, Parser)]
#[command(
    name = "spacemig",
    version,
    about = "Copy a content space, with its folder and page hierarchy, into a new space"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Log filter, e.g. `debug` or `spacemig_core=debug` (overrides RUST_LOG)"
    )]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Emit logs as JSON lines on stderr")]
    log_json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List spaces on the source instance")]
    Spaces,
    #[command(about = "Show one source space")]
    Space(SpaceArgs),
    #[command(about = "Count the folders, pages, attachments and comments a migration would copy")]
    Count(SpaceArgs),
    #[command(name = "create-space", about = "Create an empty space on the target instance")]
    CreateSpace(CreateSpaceArgs),
    #[command(about = "Migrate a source space into a newly created target space")]
    Migrate(MigrateArgs),
    #[command(about = "Invoke a command by RPC name with a JSON payload")]
    Rpc(RpcArgs),
}

#[derive(Debug, Args)]
struct SpaceArgs {
    key: String,
}

#[derive(Debug, Args)]
struct CreateSpaceArgs {
    #[arg(long)]
    key: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[arg(long, value_name = "KEY")]
    source_key: String,
    #[arg(long, value_name = "ID")]
    source_id: Option<String>,
    #[arg(long, value_name = "KEY")]
    target_key: String,
    #[arg(long, value_name = "NAME")]
    target_name: String,
    #[arg(long, value_name = "TEXT", default_value = "")]
    target_description: String,
}

#[derive(Debug, Args)]
struct RpcArgs {
    #[arg(value_parser = PossibleValuesParser::new(accepted_method_names()))]
    method: String,
    #[arg(long, value_name = "JSON", help = "Request payload as a JSON object")]
    payload: Option<String>,
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_tracing(cli.log_level.as_deref(), cli.log_json)?;

    let context = ResolutionContext::from_process()?;
    let runtime = resolve_runtime(
        &context,
        &RuntimeOverrides {
            config: cli.config.clone(),
        },
    )?;
    if cli.diagnostics {
        eprintln!("[diagnostics]\n{}", runtime.diagnostics());
    }

    match cli.command {
        Some(Commands::Spaces) => {
            let mut source = ConfluenceSource::from_config(&runtime.config)?;
            print_json(&list_spaces(&mut source)?)?;
        }
        Some(Commands::Space(SpaceArgs { key })) => {
            let mut source = ConfluenceSource::from_config(&runtime.config)?;
            print_json(&get_space_details(&mut source, key.trim())?)?;
        }
        Some(Commands::Count(SpaceArgs { key })) => {
            let mut source = ConfluenceSource::from_config(&runtime.config)?;
            print_json(&count_space_content(&mut source, key.trim())?)?;
        }
        Some(Commands::CreateSpace(args)) => run_create_space(&runtime, args)?,
        Some(Commands::Migrate(args)) => run_migrate(&runtime, args)?,
        Some(Commands::Rpc(args)) => return run_rpc(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_create_space(runtime: &ResolvedRuntime, args: CreateSpaceArgs) -> Result<()> {
    let payload = CreateSpacePayload {
        key: args.key,
        name: args.name,
        description: args.description,
    };
    payload.validate()?;

    let mut target = ConfluenceTarget::from_config(&runtime.config)?;
    let space = create_target_space(
        &mut target,
        payload.key.trim(),
        payload.name.trim(),
        &payload.description,
    )?;
    print_json(&space)
}

fn run_migrate(runtime: &ResolvedRuntime, args: MigrateArgs) -> Result<()> {
    let payload = MigrateSpacePayload {
        source_space_key: args.source_key,
        source_space_id: args.source_id,
        target_space_key: args.target_key,
        target_space_name: args.target_name,
        target_space_description: args.target_description,
    };
    payload.validate()?;
    let request = payload.into_request();

    let mut source = ConfluenceSource::from_config(&runtime.config)?;
    let mut target = ConfluenceTarget::from_config(&runtime.config)?;
    let cancel = install_cancel_handler()?;
    let options = MigrationOptions {
        title_prefix: runtime.config.title_prefix(),
    };

    let report = migrate_space(
        &mut source,
        &mut target,
        &request,
        options,
        &mut TracingProgress,
        cancel,
    )?;
    debug!(
        source_requests = report.source_requests,
        target_requests = report.target_requests,
        "migration requests issued"
    );
    print_json(&report)
}

fn run_rpc(runtime: &ResolvedRuntime, args: RpcArgs) -> Result<ExitCode> {
    let payload = match args.payload.as_deref() {
        Some(raw) => serde_json::from_str::<Value>(raw).context("--payload is not valid JSON")?,
        None => Value::Null,
    };

    let mut source = ConfluenceSource::from_config(&runtime.config)?;
    let mut target = ConfluenceTarget::from_config(&runtime.config)?;
    let cancel = install_cancel_handler()?;
    let options = MigrationOptions {
        title_prefix: runtime.config.title_prefix(),
    };

    let response = CommandSurface::new(&mut source, &mut target)
        .with_options(options)
        .with_cancel(cancel)
        .with_progress(TracingProgress)
        .dispatch(&args.method, payload);
    print_json(&response)?;

    if response["success"] == Value::Bool(true) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn install_cancel_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("interrupt received, stopping before the next item");
        handler_token.cancel();
    })
    .context("failed to install interrupt handler")?;
    Ok(cancel)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
