use crate::config::{Config, DEFAULT_KEY_PREFIX, default_export_dir, expand_home};
use crate::curriculum::Curriculum;
use crate::storage::SqliteStore;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to RoadmapTracker onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let defaults = Config::default();

    println!("\n[1/4] Progress database");
    let db_input: String = Input::with_theme(&theme)
        .with_prompt("  SQLite file where progress is stored")
        .default(defaults.db_path.display().to_string())
        .interact_text()
        .context("Failed to read database path")?;
    let db_path = expand_home(&db_input);
    println!("  ✓ {}", db_path.display());

    println!("\n[2/4] Export directory");
    let export_input: String = Input::with_theme(&theme)
        .with_prompt("  Folder where progress exports will be saved")
        .default(default_export_dir().display().to_string())
        .interact_text()
        .context("Failed to read export directory")?;
    let export_dir = expand_home(&export_input);
    println!("  ✓ {}", export_dir.display());

    println!("\n[3/4] Curriculum");
    let curriculum_input: String = Input::with_theme(&theme)
        .with_prompt("  Custom curriculum JSON (leave empty for the bundled Java roadmap)")
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            Curriculum::load(&expand_home(input.trim()))
                .map(|_| ())
                .map_err(|error| format!("{error:#}"))
        })
        .interact_text()
        .context("Failed to read curriculum path")?;
    let curriculum_path =
        (!curriculum_input.trim().is_empty()).then(|| expand_home(curriculum_input.trim()));
    let key_prefix = match &curriculum_path {
        Some(_) => Input::with_theme(&theme)
            .with_prompt("  Storage key prefix for this curriculum")
            .default(DEFAULT_KEY_PREFIX.to_string())
            .interact_text()
            .context("Failed to read storage key prefix")?,
        None => DEFAULT_KEY_PREFIX.to_string(),
    };

    println!("\n[4/4] Clearing behaviour");
    let keep_last_activity = Confirm::with_theme(&theme)
        .with_prompt("  Keep the last activity date when progress is cleared?")
        .default(true)
        .interact()
        .context("Failed to read clear behaviour input")?;

    let config = Config {
        db_path,
        export_dir,
        curriculum_path,
        key_prefix,
        clear_resets_last_activity: !keep_last_activity,
        ..defaults
    };

    config.ensure_bootstrap_files()?;
    config.save()?;
    let _ = SqliteStore::open(&config.db_path)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run `roadmap show` to see the roadmap.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
