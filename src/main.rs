mod api;
mod cli;
mod config;
mod curriculum;
mod progress;
mod storage;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands, ToggleTarget};
use crate::config::{Config, expand_home};
use crate::curriculum::Curriculum;
use crate::progress::summary::{format_last_activity, render_summary};
use crate::progress::{ProgressSnapshot, ProgressStore, StoreOptions, ToggleOutcome, save_export};
use crate::storage::SqliteStore;
use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Show => handle_show(),
        Commands::Toggle { target } => handle_toggle(target),
        Commands::Stats { json } => handle_stats(json),
        Commands::Clear { yes } => handle_clear(yes),
        Commands::Export { output } => handle_export(output),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_show() -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;
    let store = open_store(&config, &curriculum)?;
    let snapshot = store.snapshot();

    println!("{}", curriculum.title);
    if !curriculum.description.is_empty() {
        println!("{}", curriculum.description);
    }

    println!(
        "\nMain steps ({}/{})",
        snapshot.completed_steps, snapshot.total_steps
    );
    for step in &curriculum.steps {
        println!(
            "  {} {}. {} ({})",
            check_mark(store.is_step_completed(step.id)),
            step.id,
            step.title,
            step.difficulty
        );
        if !step.description.is_empty() {
            println!("        {}", step.description);
        }
        if let Some(url) = &step.url {
            println!("        resource: {url}");
        }
    }

    println!(
        "\nExtra topics ({}/{})",
        snapshot.completed_extras, snapshot.total_extras
    );
    for category in &curriculum.extra_categories {
        println!("  {}", category.category);
        for topic in &category.topics {
            println!(
                "    {} {} - {}",
                check_mark(store.is_extra_completed(&topic.id)),
                topic.id,
                topic.name
            );
        }
    }

    if !curriculum.channels.is_empty() {
        println!("\nRecommended channels");
        for channel in &curriculum.channels {
            println!("  - {}: {} ({})", channel.name, channel.description, channel.url);
        }
    }

    Ok(())
}

fn handle_toggle(target: ToggleTarget) -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;
    let mut store = open_store(&config, &curriculum)?;
    let before = store.snapshot();

    let (label, outcome) = match target {
        ToggleTarget::Step { id } => {
            curriculum.check_step(id, config.allow_unknown_ids)?;
            let title = curriculum
                .step(id)
                .map(|step| step.title.clone())
                .unwrap_or_else(|| format!("step {id}"));
            (title, store.toggle_step(id))
        }
        ToggleTarget::Extra { id } => {
            curriculum.check_extra(&id, config.allow_unknown_ids)?;
            let name = curriculum
                .topic(&id)
                .map(|topic| topic.name.clone())
                .unwrap_or_else(|| id.clone());
            (name, store.toggle_extra(&id))
        }
    };

    report_toggle(&label, outcome, &before, &store.snapshot());
    Ok(())
}

fn report_toggle(
    label: &str,
    outcome: ToggleOutcome,
    before: &ProgressSnapshot,
    after: &ProgressSnapshot,
) {
    let state = if outcome.completed {
        "completed"
    } else {
        "not completed"
    };
    println!("{label}: {state}");
    println!(
        "Level: {} ({}%)",
        after.level.title(),
        after.overall_rounded()
    );

    after
        .achievements
        .difference(&before.achievements)
        .for_each(|achievement| println!("Achievement unlocked: {}", achievement.title()));

    if !outcome.persistence.is_saved() {
        warn!("progress could not be saved and will be lost when this command exits");
    }
}

fn handle_stats(json: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;
    let store = open_store(&config, &curriculum)?;
    let snapshot = store.snapshot();

    if json {
        let content =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize progress stats")?;
        println!("{content}");
    } else {
        print!("{}", render_summary(&snapshot, store.last_activity()));
    }

    Ok(())
}

fn handle_clear(yes: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;

    let confirmed = yes
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Clear all roadmap progress?")
            .default(false)
            .interact()
            .context("Failed to read clear confirmation")?;

    if !confirmed {
        println!("Nothing cleared");
        return Ok(());
    }

    let mut store = open_store(&config, &curriculum)?;
    if store.clear().is_saved() {
        println!("Progress cleared");
    } else {
        warn!("progress cleared for this session only. stored entries could not be removed");
    }

    Ok(())
}

fn handle_export(output: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;
    let store = open_store(&config, &curriculum)?;

    let export_dir = output
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(|| config.export_dir.clone());
    let path = save_export(&store.export(), &export_dir, &config.key_prefix)?;

    println!("Progress exported: {}", path.display());
    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let curriculum = load_curriculum(&config)?;
    let store = open_store(&config, &curriculum)?;
    let snapshot = store.snapshot();

    println!("RoadmapTracker status");
    println!("- curriculum: {}", curriculum.title);
    println!("- db_path: {}", config.db_path.display());
    println!("- export_dir: {}", config.export_dir.display());
    println!(
        "- main_steps: {}/{}",
        snapshot.completed_steps, snapshot.total_steps
    );
    println!(
        "- extra_topics: {}/{}",
        snapshot.completed_extras, snapshot.total_extras
    );
    println!("- level: {}", snapshot.level.title());
    println!(
        "- last_activity: {}",
        format_last_activity(store.last_activity())
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = Config::load().unwrap_or_default();

    match SqliteStore::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    match load_curriculum(&config) {
        Ok(curriculum) => {
            let totals = curriculum.totals();
            println!(
                "[OK] curriculum valid: {} ({} steps, {} extra topics)",
                curriculum.title, totals.steps, totals.extras
            );
        }
        Err(error) => {
            println!("[WARN] curriculum invalid: {error:#}");
            issues.push("curriculum invalid".to_string());
        }
    }

    if config.export_dir.exists() {
        println!("[OK] export dir exists: {}", config.export_dir.display());
    } else {
        println!("[WARN] export dir missing: {}", config.export_dir.display());
        issues.push("export dir missing".to_string());
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = SqliteStore::open(&config.db_path)?;
    let curriculum = Arc::new(load_curriculum(&config)?);
    let shared_config = Arc::new(config);

    info!(
        port = shared_config.api_port,
        curriculum = %curriculum.title,
        "RoadmapTracker service started"
    );

    tokio::select! {
        api_result = api::run_server(shared_config, curriculum) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn open_store(config: &Config, curriculum: &Curriculum) -> Result<ProgressStore<SqliteStore>> {
    let storage = SqliteStore::open(&config.db_path)?;
    let mut store = ProgressStore::load(
        storage,
        curriculum.totals(),
        StoreOptions::from_config(config),
    );
    if !config.allow_unknown_ids {
        store.retain_known(curriculum);
    }

    Ok(store)
}

fn load_curriculum(config: &Config) -> Result<Curriculum> {
    Curriculum::resolve(config.curriculum_path.as_deref()).with_context(|| {
        format!(
            "Failed to load curriculum: {}",
            config
                .curriculum_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "embedded".to_string())
        )
    })
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn check_mark(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}
