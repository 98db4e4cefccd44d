mod display;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use log::{LevelFilter, debug, info};

use sonatypeiq_core::binding::{Bindings, unresolved_references};
use sonatypeiq_core::differ::create_plan;
use sonatypeiq_core::effect::Effect;
use sonatypeiq_core::interpreter::{EffectOutcome, Interpreter, InterpreterConfig};
use sonatypeiq_core::manifest::{self, Manifest};
use sonatypeiq_core::plan::{Plan, format_effect_brief};
use sonatypeiq_core::provider::{Provider, ResourceType};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State};
use sonatypeiq_core::schema::ResourceSchema;
use sonatypeiq_provider::{ProviderConfig, SonatypeIqProvider, data_sources, resources};
use sonatypeiq_state::{LockInfo, StateBackend, StateFile, open_backend};

const DEFAULT_MANIFEST: &str = "sonatypeiq.json";

#[derive(Parser)]
#[command(name = "sonatypeiq")]
#[command(about = "Manage Sonatype IQ Server configuration as code", long_about = None)]
struct Cli {
    /// Path to the JSON manifest
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST)]
    file: PathBuf,

    /// Path to the state file (default: sonatypeiq.tfstate.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest without contacting IQ Server
    Validate,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply {
        /// Keep going after a failed change
        #[arg(long)]
        continue_on_error: bool,
    },
    /// Destroy every object tracked in state
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing IQ Server object into state
    Import {
        /// Address to track the object under (type.name)
        address: String,
        /// Server-side identifier of the object
        id: String,
    },
    /// Re-read every tracked object and update state
    Refresh,
    /// Inspect or edit the state file
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Remove a stale state lock
    ForceUnlock {
        /// Lock ID shown in the lock error
        lock_id: String,
    },
    /// Show resource and data source schemas
    Schema {
        /// Type to describe; lists all types when omitted
        resource_type: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List tracked objects
    List,
    /// Show the stored attributes of one object
    Show { address: String },
    /// Stop tracking an object without deleting it
    Rm { address: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = cli.file;
    let state = cli.state;

    let result = match cli.command {
        Commands::Validate => run_validate(&file),
        Commands::Plan => run_plan(&file, state).await,
        Commands::Apply { continue_on_error } => run_apply(&file, state, continue_on_error).await,
        Commands::Destroy { auto_approve } => run_destroy(&file, state, auto_approve).await,
        Commands::Import { address, id } => run_import(&file, state, &address, &id).await,
        Commands::Refresh => run_refresh(&file, state).await,
        Commands::State { command } => run_state_command(command, state).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(state, &lock_id).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

// =============================================================================
// Manifest and schemas
// =============================================================================

fn resource_schemas() -> HashMap<String, ResourceSchema> {
    schemas_of(resources::resource_types())
}

fn data_source_schemas() -> HashMap<String, ResourceSchema> {
    schemas_of(data_sources::data_source_types())
}

fn schemas_of(types: Vec<Box<dyn ResourceType>>) -> HashMap<String, ResourceSchema> {
    types
        .into_iter()
        .map(|t| (t.name().to_string(), t.schema()))
        .collect()
}

fn load_manifest(file: &Path) -> Result<Manifest, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    manifest::parse(&content).map_err(|e| format!("{}: {}", file.display(), e))
}

/// Manifest for commands that only need provider settings; the environment
/// alone is enough when the file is absent
fn load_manifest_or_default(file: &Path) -> Result<Manifest, String> {
    if file.exists() {
        load_manifest(file)
    } else {
        debug!("{} not found, using environment settings", file.display());
        Ok(Manifest::default())
    }
}

fn validate_manifest(manifest: &Manifest) -> Result<(), String> {
    let resource_schemas = resource_schemas();
    let data_schemas = data_source_schemas();
    let mut errors = Vec::new();

    for resource in &manifest.resources {
        let (schemas, kind) = if resource.is_data_source() {
            (&data_schemas, "data source type")
        } else {
            (&resource_schemas, "resource type")
        };
        let Some(schema) = schemas.get(&resource.id.resource_type) else {
            errors.push(format!(
                "{}: Unknown {} '{}'",
                resource.binding(),
                kind,
                resource.id.resource_type
            ));
            continue;
        };

        let mut attributes = resource.attributes.clone();
        schema.apply_defaults(&mut attributes);
        if let Err(type_errors) = schema.validate(&attributes) {
            for e in type_errors {
                errors.push(format!("{}: {}", resource.binding(), e));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", errors.join("\n  ")))
    }
}

fn build_provider(manifest: &Manifest) -> Result<SonatypeIqProvider, String> {
    let config = ProviderConfig::from_values(&manifest.provider).map_err(|e| e.to_string())?;
    info!("Using IQ Server at {}", config.url);
    SonatypeIqProvider::new(&config).map_err(|e| e.to_string())
}

// =============================================================================
// State handling
// =============================================================================

async fn load_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    backend
        .read_state()
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("Failed to read state: {}", e))
}

async fn persist(backend: &dyn StateBackend, state_file: &mut StateFile) -> Result<(), String> {
    state_file.increment_serial();
    backend
        .write_state(state_file)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

async fn acquire(backend: &dyn StateBackend, operation: &str) -> Result<LockInfo, String> {
    backend.init().await.map_err(|e| e.to_string())?;
    let lock = backend
        .acquire_lock(operation)
        .await
        .map_err(|e| format!("Failed to acquire state lock: {}", e))?;
    debug!("Acquired state lock {} for {}", lock.id, operation);
    Ok(lock)
}

async fn release(backend: &dyn StateBackend, lock: &LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        eprintln!(
            "{} failed to release state lock {}: {}",
            "Warning:".yellow().bold(),
            lock.id,
            e
        );
    }
}

/// Reflect one applied effect in the state file
fn record_outcome(state_file: &mut StateFile, outcome: &EffectOutcome) {
    match outcome {
        EffectOutcome::Created { state }
        | EffectOutcome::Updated { state }
        | EffectOutcome::Replaced { state, .. } => state_file.record(state),
        EffectOutcome::Deleted { id, .. } => {
            state_file.remove_resource(id);
        }
        EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
    }
}

fn print_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        println!("    {} {}", "Warning:".yellow().bold(), diagnostic);
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Everything known before any change is made
struct Prepared {
    refreshed: Vec<State>,
    bindings: Bindings,
    plan: Plan,
}

async fn refresh_tracked(
    provider: &SonatypeIqProvider,
    state_file: &StateFile,
) -> Result<Vec<State>, String> {
    let mut refreshed = Vec::new();
    for tracked in state_file.states() {
        let state = provider
            .read(&tracked)
            .await
            .map_err(|e| format!("Failed to refresh {}: {}", tracked.id, e))?;
        refreshed.push(state);
    }
    Ok(refreshed)
}

async fn read_data_sources(
    provider: &SonatypeIqProvider,
    manifest: &Manifest,
    bindings: &mut Bindings,
) -> Result<(), String> {
    for source in manifest.data_sources() {
        let resolved = bindings.resolve(source);
        let unresolved = unresolved_references(&resolved);
        if !unresolved.is_empty() {
            return Err(format!(
                "{}: depends on values not known until apply: {}",
                source.binding(),
                unresolved.join(", ")
            ));
        }

        let state = provider
            .read_data_source(&resolved)
            .await
            .map_err(|e| format!("Failed to read {}: {}", source.binding(), e))?;
        bindings.insert(source.binding(), &state.attributes);
    }
    Ok(())
}

/// Diff the manifest against refreshed state
///
/// References to objects that already exist are resolved here; the rest stay
/// references until the interpreter reaches them.
fn plan_changes(
    manifest: &Manifest,
    refreshed: &[State],
    bindings: &Bindings,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let desired: Vec<Resource> = manifest
        .managed()
        .map(|resource| {
            let mut resolved = bindings.resolve(resource);
            if let Some(schema) = schemas.get(&resource.id.resource_type) {
                schema.apply_defaults(&mut resolved.attributes);
            }
            resolved
        })
        .collect();

    let current: HashMap<ResourceId, State> = refreshed
        .iter()
        .map(|state| (state.id.clone(), state.clone()))
        .collect();

    let orphans: Vec<State> = refreshed
        .iter()
        .filter(|state| !manifest.managed().any(|r| r.id == state.id))
        .cloned()
        .collect();

    create_plan(&desired, &current, schemas, &orphans)
}

async fn prepare(
    provider: &SonatypeIqProvider,
    manifest: &Manifest,
    state_file: &StateFile,
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<Prepared, String> {
    let refreshed = refresh_tracked(provider, state_file).await?;

    let mut bindings = Bindings::new();
    for state in refreshed.iter().filter(|s| s.exists) {
        bindings.insert(state.id.to_string(), &state.attributes);
    }
    read_data_sources(provider, manifest, &mut bindings).await?;

    let plan = plan_changes(manifest, &refreshed, &bindings, schemas);
    Ok(Prepared {
        refreshed,
        bindings,
        plan,
    })
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    let manifest = load_manifest(file)?;
    validate_manifest(&manifest)?;

    println!(
        "{}",
        format!(
            "✓ {} is valid ({} resources, {} data sources).",
            file.display(),
            manifest.managed().count(),
            manifest.data_sources().count()
        )
        .green()
    );
    Ok(())
}

async fn run_plan(file: &Path, state_path: Option<PathBuf>) -> Result<(), String> {
    let manifest = load_manifest(file)?;
    validate_manifest(&manifest)?;
    let provider = build_provider(&manifest)?;
    let backend = open_backend(state_path);
    let state_file = load_state(backend.as_ref()).await?;

    let schemas = resource_schemas();
    let prepared = prepare(&provider, &manifest, &state_file, &schemas).await?;
    display::print_plan(&prepared.plan, &schemas);
    Ok(())
}

async fn run_apply(
    file: &Path,
    state_path: Option<PathBuf>,
    continue_on_error: bool,
) -> Result<(), String> {
    let manifest = load_manifest(file)?;
    validate_manifest(&manifest)?;
    let provider = build_provider(&manifest)?;
    let backend = open_backend(state_path);

    let lock = acquire(backend.as_ref(), "apply").await?;
    let result = apply_locked(backend.as_ref(), provider, &manifest, continue_on_error).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn apply_locked(
    backend: &dyn StateBackend,
    provider: SonatypeIqProvider,
    manifest: &Manifest,
    continue_on_error: bool,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    let schemas = resource_schemas();
    let prepared = prepare(&provider, manifest, &state_file, &schemas).await?;

    let drifted = prepared.refreshed != state_file.states();
    for state in &prepared.refreshed {
        state_file.record(state);
    }

    if prepared.plan.is_empty() {
        if drifted {
            persist(backend, &mut state_file).await?;
        }
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    display::print_plan(&prepared.plan, &schemas);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let mut interpreter = Interpreter::new(provider)
        .with_config(InterpreterConfig {
            dry_run: false,
            continue_on_error,
        })
        .with_bindings(prepared.bindings);
    let result = interpreter.apply(&prepared.plan).await;

    for (effect, outcome) in prepared.plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                println!("  {} {}", "✓".green(), format_effect_brief(effect));
                print_diagnostics(outcome.diagnostics());
                record_outcome(&mut state_file, outcome);
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), format_effect_brief(effect), e),
        }
    }
    let not_attempted = prepared.plan.effects().len() - result.outcomes.len();

    persist(backend, &mut state_file).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", result.success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed, {} not attempted.",
            result.success_count, result.failure_count, not_attempted
        ))
    }
}

async fn run_destroy(
    file: &Path,
    state_path: Option<PathBuf>,
    auto_approve: bool,
) -> Result<(), String> {
    let manifest = load_manifest_or_default(file)?;
    let provider = build_provider(&manifest)?;
    let backend = open_backend(state_path);

    let lock = acquire(backend.as_ref(), "destroy").await?;
    let result = destroy_locked(backend.as_ref(), provider, auto_approve).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn destroy_locked(
    backend: &dyn StateBackend,
    provider: SonatypeIqProvider,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    if state_file.resources.is_empty() {
        println!("{}", "No resources tracked in state.".yellow());
        return Ok(());
    }

    // Dependents were tracked after their dependencies
    let mut plan = Plan::new();
    for state in state_file.states().into_iter().rev() {
        plan.add(Effect::Delete(state));
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!(
            "  {} {}",
            "-".red().bold(),
            effect.resource_id().to_string().cyan().bold()
        );
    }
    println!();
    println!(
        "Plan: {} to destroy.",
        plan.effects().len().to_string().red()
    );
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut interpreter = Interpreter::new(provider).with_config(InterpreterConfig {
        dry_run: false,
        continue_on_error: true,
    });
    let result = interpreter.apply(&plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                println!("  {} {}", "✓".green(), format_effect_brief(effect));
                print_diagnostics(outcome.diagnostics());
                record_outcome(&mut state_file, outcome);
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), format_effect_brief(effect), e),
        }
    }

    persist(backend, &mut state_file).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", result.success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

fn parse_address(address: &str) -> Result<ResourceId, String> {
    ResourceId::parse(address)
        .ok_or_else(|| format!("Invalid address '{}': expected type.name", address))
}

async fn run_import(
    file: &Path,
    state_path: Option<PathBuf>,
    address: &str,
    import_id: &str,
) -> Result<(), String> {
    let id = parse_address(address)?;
    if !resource_schemas().contains_key(&id.resource_type) {
        return Err(format!("Unknown resource type: {}", id.resource_type));
    }

    let manifest = load_manifest_or_default(file)?;
    let provider = build_provider(&manifest)?;
    let backend = open_backend(state_path);

    let lock = acquire(backend.as_ref(), "import").await?;
    let result = import_locked(backend.as_ref(), &provider, &id, import_id).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn import_locked(
    backend: &dyn StateBackend,
    provider: &SonatypeIqProvider,
    id: &ResourceId,
    import_id: &str,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    if state_file.find_resource(id).is_some() {
        return Err(format!(
            "{} is already tracked in state; remove it with `state rm` first",
            id
        ));
    }

    let state = provider
        .import(id, import_id)
        .await
        .map_err(|e| e.to_string())?;
    if !state.exists {
        return Err(format!(
            "Cannot import non-existent remote object '{}' as {}",
            import_id, id
        ));
    }
    print_diagnostics(&state.diagnostics);

    state_file.record(&state);
    persist(backend, &mut state_file).await?;

    println!(
        "{}",
        format!("Import complete! '{}' is now tracked as {}.", import_id, id)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_refresh(file: &Path, state_path: Option<PathBuf>) -> Result<(), String> {
    let manifest = load_manifest_or_default(file)?;
    let provider = build_provider(&manifest)?;
    let backend = open_backend(state_path);

    let lock = acquire(backend.as_ref(), "refresh").await?;
    let result = refresh_locked(backend.as_ref(), &provider).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn refresh_locked(
    backend: &dyn StateBackend,
    provider: &SonatypeIqProvider,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    let tracked = state_file.states();
    let refreshed = refresh_tracked(provider, &state_file).await?;

    for (before, after) in tracked.iter().zip(&refreshed) {
        if !after.exists {
            println!(
                "  {} {} (no longer exists)",
                "-".red().bold(),
                after.id
            );
        } else if before.attributes != after.attributes {
            println!("  {} {}", "~".yellow().bold(), after.id);
        }
        print_diagnostics(&after.diagnostics);
        state_file.record(after);
    }

    persist(backend, &mut state_file).await?;
    println!(
        "{}",
        format!(
            "Refresh complete! {} objects tracked.",
            state_file.resources.len()
        )
        .green()
        .bold()
    );
    Ok(())
}

async fn run_state_command(
    command: StateCommands,
    state_path: Option<PathBuf>,
) -> Result<(), String> {
    let backend = open_backend(state_path);

    match command {
        StateCommands::List => {
            let state_file = load_state(backend.as_ref()).await?;
            if state_file.resources.is_empty() {
                println!("{}", "No resources tracked in state.".yellow());
            }
            for address in state_file.addresses() {
                println!("{}", address);
            }
            Ok(())
        }
        StateCommands::Show { address } => {
            let id = parse_address(&address)?;
            let state_file = load_state(backend.as_ref()).await?;
            let entry = state_file
                .find_resource(&id)
                .ok_or_else(|| format!("{} is not tracked in state", id))?;
            let schemas = resource_schemas();
            display::print_state(&entry.to_state(), schemas.get(&id.resource_type));
            Ok(())
        }
        StateCommands::Rm { address } => {
            let id = parse_address(&address)?;
            let lock = acquire(backend.as_ref(), "state rm").await?;
            let result = remove_locked(backend.as_ref(), &id).await;
            release(backend.as_ref(), &lock).await;
            result
        }
    }
}

async fn remove_locked(backend: &dyn StateBackend, id: &ResourceId) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    if state_file.remove_resource(id).is_none() {
        return Err(format!("{} is not tracked in state", id));
    }
    persist(backend, &mut state_file).await?;
    println!("Removed {} from state. The server object was not deleted.", id);
    Ok(())
}

async fn run_force_unlock(state_path: Option<PathBuf>, lock_id: &str) -> Result<(), String> {
    let backend = open_backend(state_path);
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to unlock state: {}", e))?;
    println!("{}", format!("State lock {} released.", lock_id).green());
    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let resource_schemas = resource_schemas();
    let data_schemas = data_source_schemas();

    let Some(name) = resource_type else {
        for (kind, schemas) in [("Resources", &resource_schemas), ("Data sources", &data_schemas)] {
            println!("{}", kind.bold());
            let mut names: Vec<_> = schemas.keys().collect();
            names.sort();
            for name in names {
                let description = schemas[name].description.as_deref().unwrap_or("");
                println!("  {} {}", format!("{:<32}", name).cyan(), description);
            }
            println!();
        }
        return Ok(());
    };

    let mut found = false;
    if let Some(schema) = resource_schemas.get(name) {
        display::print_schema("resource", schema);
        found = true;
    }
    if let Some(schema) = data_schemas.get(name) {
        if found {
            println!();
        }
        display::print_schema("data source", schema);
        found = true;
    }

    if found {
        Ok(())
    } else {
        Err(format!("Unknown resource or data source type: {}", name))
    }
}
