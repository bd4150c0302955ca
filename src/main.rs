use clap::Parser;
use color_eyre::Result;
use std::fs::OpenOptions;
use tmk::cli::{self, Cli, Commands};
use tmk::utils::{self, expand_path};
use tmk::{Config, Database, Profile};

/// Logs go to stderr, except in the TUI where they would corrupt the screen
/// and are appended to `tmk.log` in the data directory instead.
fn init_logging(profile: Profile, tui: bool) {
    let env = env_logger::Env::default().default_filter_or(if tui { "info" } else { "warn" });
    let mut builder = env_logger::Builder::from_env(env);
    if tui {
        let file = utils::get_data_dir(profile).and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("tmk.log"))
                .ok()
        });
        match file {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    let _ = builder.try_init();
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };
    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(profile, matches!(command, Commands::Tui));

    let config_path = match &cli.config {
        Some(path) => expand_path(path),
        None => Config::get_config_path(profile)?,
    };
    let mut config = match &cli.config {
        Some(_) => Config::load_from_path(&config_path)?,
        None => Config::load_with_profile(profile)?,
    };

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    log::debug!("using database {}", db_path.display());

    match command {
        Commands::Tui => {
            let user = cli::current_user(&config, &db)?;
            let app = tmk::tui::App::new(config, db, user)?;
            tmk::tui::run_event_loop(app)?;
        }
        other => cli::run(other, &mut config, &config_path, &db)?,
    }

    Ok(())
}
