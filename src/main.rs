//! Stackplan CLI entrypoint.
//!
//! This is the main entrypoint for the stackplan command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stackplan::artifact::{ArtifactStore, ArtifactWriter, LocalArtifactStore};
use stackplan::cli::{ArtifactCommands, Cli, Commands, OutputFormatter};
use stackplan::config::{
    find_config_file, ConfigParser, ConfigValidator, PlanFormat, StackConfig,
};
use stackplan::error::{ConfigError, Result};
use stackplan::pipeline::Pipeline;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let formatter = OutputFormatter::new(cli.output);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, formatter),
        Commands::Plan { destroy, detailed } => {
            cmd_plan(cli.config.as_ref(), destroy, detailed, formatter)
        }
        Commands::Synth { out, format } => {
            cmd_synth(cli.config.as_ref(), out, format.map(PlanFormat::from), formatter).await
        }
        Commands::Graph => cmd_graph(cli.config.as_ref(), formatter),
        Commands::Artifacts { command } => {
            cmd_artifacts(cli.config.as_ref(), command, formatter).await
        }
    }
}

/// Initialize a new stack.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new stack in: {}", path.display());

    let config_path = path.join("stackplan.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Stack file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/stackplan.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    let gitignore_content = ".env\nstackplan.out/\n";
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".env") || !existing.contains("stackplan.out") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# stackplan")?;
            if !existing.contains(".env") {
                writeln!(file, ".env")?;
            }
            if !existing.contains("stackplan.out") {
                writeln!(file, "stackplan.out/")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, gitignore_content)?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nStack initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit stackplan.yaml with your resources");
    eprintln!("  2. Run 'stackplan validate' to check references and cycles");
    eprintln!("  3. Run 'stackplan plan' to see the apply order");
    eprintln!("  4. Run 'stackplan synth' to write the plan");

    Ok(())
}

/// Validate the stack file and its graph.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;

    let result = ConfigValidator::new().check(&config);
    if !result.is_valid() {
        eprintln!("{}", formatter.format_validation(&result, show_warnings, None));
        return Err(ConfigError::validation_general(format!(
            "{} error(s) found",
            result.error_count()
        ))
        .into());
    }

    // Stops before emitting: references, graph and order are all checked.
    let declarations = config.to_declarations()?;
    let planned = Pipeline::from_config(&config).check(&declarations)?;

    print_stdout(&formatter.format_validation(
        &result,
        show_warnings,
        Some((&config, &planned.order)),
    ))
}

/// Show the deployment plan.
fn cmd_plan(
    config_path: Option<&PathBuf>,
    destroy: bool,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_validated_config(config_path)?;
    let plan = Pipeline::from_config(&config).run_config(&config)?;

    let output = if destroy {
        formatter.format_destroy(&plan)
    } else {
        formatter.format_plan(&plan, detailed)
    };
    print_stdout(&output)
}

/// Write the plan to the output directory.
async fn cmd_synth(
    config_path: Option<&PathBuf>,
    out: Option<PathBuf>,
    format: Option<PlanFormat>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, parser) = load_validated_config(config_path)?;
    let plan = Pipeline::from_config(&config).run_config(&config)?;

    let out_dir = out.unwrap_or_else(|| parser.resolve_output_dir(&config));
    let format = format.unwrap_or(config.output.format);
    debug!("Synthesizing to {} as {:?}", out_dir.display(), format);

    let store = LocalArtifactStore::with_base_dir(out_dir);
    let outcome = ArtifactWriter::new(&store).synthesize(&plan, format).await?;

    print_stdout(&formatter.format_synth(&outcome))
}

/// Print the graph as DOT.
fn cmd_graph(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_validated_config(config_path)?;
    let declarations = config.to_declarations()?;
    let planned = Pipeline::from_config(&config).check(&declarations)?;

    print_stdout(&formatter.format_graph_dot(&planned.graph, &planned.order))
}

/// Manage synthesized artifacts.
async fn cmd_artifacts(
    config_path: Option<&PathBuf>,
    command: ArtifactCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, parser) = load_config(config_path)?;
    let store: Box<dyn ArtifactStore> =
        Box::new(LocalArtifactStore::with_base_dir(parser.resolve_output_dir(&config)));
    debug!("Using {} artifact store", store.backend_type());

    match command {
        ArtifactCommands::Show => {
            if let Some(manifest) = store.load_manifest().await? {
                let lock = store.get_lock_info().await?;
                print_stdout(&formatter.format_manifest(&manifest, lock.as_ref()))?;
            } else {
                eprintln!("No artifacts found.");
            }
        }
        ArtifactCommands::Unlock { lock_id, force } => {
            if force {
                if let Some(lock) = store.get_lock_info().await? {
                    store.release_lock(&lock.lock_id).await?;
                    eprintln!("Output forcefully unlocked.");
                } else {
                    eprintln!("Output is not locked.");
                }
            } else if let Some(id) = lock_id {
                store.release_lock(&id).await?;
                eprintln!("Output unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
        ArtifactCommands::Clean => {
            if store.is_locked().await? {
                eprintln!("Output is locked; unlock it before cleaning.");
            } else {
                store.delete().await?;
                eprintln!("Artifacts removed.");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the stack file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads the stack file and a parser rooted at its directory.
fn load_config(config_path: Option<&PathBuf>) -> Result<(StackConfig, ConfigParser)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading stack from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    Ok((config, parser))
}

/// Loads the stack file and fails on the first validation error.
fn load_validated_config(config_path: Option<&PathBuf>) -> Result<(StackConfig, ConfigParser)> {
    let (config, parser) = load_config(config_path)?;
    ConfigValidator::new().validate(&config)?;
    Ok((config, parser))
}

/// Writes command output to stdout; logs and messages go to stderr.
fn print_stdout(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
