//! NBA statistics pipeline CLI
//!
//! One subcommand per stage; each reads the previous stage's artifact.

use clap::{Parser, Subcommand};
use nbastats::{logging, Config, Result, Stage};
use std::path::Path;

#[derive(Parser)]
#[command(name = "nbastats")]
#[command(about = "NBA box-score scraping, dataset building and baseline modeling", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level: DEBUG, INFO, WARNING, ERROR
    #[arg(long)]
    log_level: Option<String>,

    /// Also write log records to this file
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,
    /// Scrape box scores into one file per season
    Scrape {
        /// Directory for the games index and boxscores/
        #[arg(long)]
        data_dir: Option<String>,
        #[arg(long)]
        start_year: Option<u16>,
        #[arg(long)]
        end_year: Option<u16>,
        /// Seconds between requests
        #[arg(long)]
        delay: Option<f64>,
        /// Cache directory for HTML files
        #[arg(long)]
        cache_dir: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
        /// Re-scrape seasons that already have a file
        #[arg(long)]
        overwrite: bool,
    },
    /// Scrape team abbreviations per season
    ScrapeTeams {
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        start_year: Option<u16>,
        #[arg(long)]
        end_year: Option<u16>,
        #[arg(long)]
        delay: Option<f64>,
    },
    /// Concatenate per-season box scores into one file
    CombineBoxscores {
        #[arg(long)]
        boxscores_dir: Option<String>,
        #[arg(long)]
        out: Option<String>,
    },
    /// Join box scores with player metadata, one master table per season
    BuildMaster {
        #[arg(long)]
        all_years: Option<String>,
        #[arg(long)]
        player_data: Option<String>,
        #[arg(long)]
        out_dir: Option<String>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Aggregate master tables into per-game team stats
    WeightedStats {
        #[arg(long)]
        master_dir: Option<String>,
        #[arg(long)]
        out_dir: Option<String>,
        #[arg(long)]
        start_year: Option<u16>,
        #[arg(long)]
        end_year: Option<u16>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Build the rolling-window training set
    MakeTraining {
        #[arg(long)]
        weighted_dir: Option<String>,
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        start_year: Option<u16>,
        #[arg(long)]
        end_year: Option<u16>,
        /// Trailing games averaged per team
        #[arg(long)]
        window: Option<usize>,
        /// Prior games both teams need before a game is used
        #[arg(long)]
        min_history: Option<usize>,
    },
    /// Fit and evaluate the logistic regression baseline
    TrainBaseline {
        #[arg(long)]
        training: Option<String>,
        #[arg(long)]
        out_dir: Option<String>,
        #[arg(long)]
        test_frac: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Commands {
    fn stage(&self) -> Option<Stage> {
        match self {
            Commands::Init => None,
            Commands::Scrape { .. } => Some(Stage::Scrape),
            Commands::ScrapeTeams { .. } => Some(Stage::ScrapeTeams),
            Commands::CombineBoxscores { .. } => Some(Stage::Combine),
            Commands::BuildMaster { .. } => Some(Stage::Master),
            Commands::WeightedStats { .. } => Some(Stage::WeightedStats),
            Commands::MakeTraining { .. } => Some(Stage::TrainingSet),
            Commands::TrainBaseline { .. } => Some(Stage::Model),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Load or create config
    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; command-line flags win over the config file
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
    if let Err(e) = logging::init(&level, log_file.as_deref().map(Path::new)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let stage = cli.command.stage();

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Scrape {
            data_dir,
            start_year,
            end_year,
            delay,
            cache_dir,
            offline,
            overwrite,
        } => commands::scrape(
            &config, data_dir, start_year, end_year, delay, cache_dir, offline, overwrite,
        ),
        Commands::ScrapeTeams {
            out,
            start_year,
            end_year,
            delay,
        } => commands::scrape_teams(&config, out, start_year, end_year, delay),
        Commands::CombineBoxscores { boxscores_dir, out } => {
            commands::combine_boxscores(&config, boxscores_dir, out)
        }
        Commands::BuildMaster {
            all_years,
            player_data,
            out_dir,
            overwrite,
        } => commands::build_master(&config, all_years, player_data, out_dir, overwrite),
        Commands::WeightedStats {
            master_dir,
            out_dir,
            start_year,
            end_year,
            overwrite,
        } => commands::weighted_stats(&config, master_dir, out_dir, start_year, end_year, overwrite),
        Commands::MakeTraining {
            weighted_dir,
            out,
            start_year,
            end_year,
            window,
            min_history,
        } => commands::make_training(
            &config,
            weighted_dir,
            out,
            start_year,
            end_year,
            window,
            min_history,
        ),
        Commands::TrainBaseline {
            training,
            out_dir,
            test_frac,
            seed,
        } => commands::train_baseline(&config, training, out_dir, test_frac, seed),
    };

    if let Err(e) = result {
        match stage {
            Some(stage) => log::error!("{} failed: {}", stage, e),
            None => log::error!("{}", e),
        }
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use nbastats::data::scrapers::{BasketballReference, HttpSource};
    use nbastats::StatsError;
    use std::time::Duration;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.paths.data_dir)?;
        std::fs::create_dir_all(&config.paths.output_dir)?;
        println!(
            "Created {}/ and {}/ directories",
            config.paths.data_dir, config.paths.output_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'nbastats scrape' to fetch box scores");
        println!("  3. Place player metadata at {}", config.paths.player_data);
        println!("  4. Run combine-boxscores, build-master, weighted-stats, make-training, train-baseline");

        Ok(())
    }

    fn http_source(
        config: &Config,
        delay: Option<f64>,
        cache_dir: Option<String>,
        offline: bool,
    ) -> Result<HttpSource> {
        let settings = &config.scrape;
        let mut source = HttpSource::new(
            &settings.user_agent,
            Duration::from_secs(settings.timeout_secs),
            delay.unwrap_or(settings.delay_secs),
        )?;

        let cache_dir = cache_dir.or_else(|| settings.cache_dir.clone());
        if let Some(dir) = &cache_dir {
            log::info!("Using cache directory: {}", dir);
            source = source.with_cache(dir);
        }

        if offline {
            if cache_dir.is_none() {
                return Err(StatsError::Config(
                    "offline mode needs a cache directory".to_string(),
                ));
            }
            log::info!("Offline mode: using cached files only");
            source = source.offline_only(true);
        }

        Ok(source)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn scrape(
        config: &Config,
        data_dir: Option<String>,
        start_year: Option<u16>,
        end_year: Option<u16>,
        delay: Option<f64>,
        cache_dir: Option<String>,
        offline: bool,
        overwrite: bool,
    ) -> Result<()> {
        let data_dir = data_dir.unwrap_or_else(|| config.paths.data_dir.clone());
        let start = start_year.unwrap_or(config.scrape.start_year);
        let end = end_year.unwrap_or(config.scrape.end_year);

        let source = http_source(config, delay, cache_dir, offline)?;
        let scraper = BasketballReference::new(source, config.scrape.months.clone());
        let report = scraper.scrape_boxscores(&data_dir, start, end, overwrite)?;

        println!(
            "Scraped {} games ({} failed) into {} season files; {} seasons skipped",
            report.games,
            report.failed,
            report.seasons_written.len(),
            report.seasons_skipped.len()
        );
        Ok(())
    }

    pub fn scrape_teams(
        config: &Config,
        out: Option<String>,
        start_year: Option<u16>,
        end_year: Option<u16>,
        delay: Option<f64>,
    ) -> Result<()> {
        let out = out.unwrap_or_else(|| config.paths.teams_index.clone());
        let start = start_year.unwrap_or(config.scrape.start_year);
        let end = end_year.unwrap_or(config.scrape.end_year);

        let source = http_source(config, delay, None, false)?;
        let scraper = BasketballReference::new(source, config.scrape.months.clone());
        let index = scraper.scrape_team_index(&out, start, end)?;

        println!("Wrote team abbreviations for {} seasons to {}", index.seasons.len(), out);
        Ok(())
    }

    pub fn combine_boxscores(
        config: &Config,
        boxscores_dir: Option<String>,
        out: Option<String>,
    ) -> Result<()> {
        let dir = boxscores_dir.unwrap_or_else(|| config.paths.boxscores_dir.clone());
        let out = out.unwrap_or_else(|| config.paths.all_years.clone());

        let report = nbastats::data::combine_boxscores(&dir, &out)?;
        println!("Combined {} files ({} games) into {}", report.files.len(), report.games, out);
        Ok(())
    }

    pub fn build_master(
        config: &Config,
        all_years: Option<String>,
        player_data: Option<String>,
        out_dir: Option<String>,
        overwrite: bool,
    ) -> Result<()> {
        let all_years = all_years.unwrap_or_else(|| config.paths.all_years.clone());
        let player_data = player_data.unwrap_or_else(|| config.paths.player_data.clone());
        let out_dir = out_dir.unwrap_or_else(|| config.paths.master_dir.clone());

        let report = nbastats::data::build_master_by_year(&all_years, &player_data, &out_dir, overwrite)?;
        println!(
            "Master tables: {} written, {} skipped ({} rows, {} unmatched players)",
            report.seasons_written.len(),
            report.seasons_skipped.len(),
            report.rows,
            report.unmatched
        );
        Ok(())
    }

    pub fn weighted_stats(
        config: &Config,
        master_dir: Option<String>,
        out_dir: Option<String>,
        start_year: Option<u16>,
        end_year: Option<u16>,
        overwrite: bool,
    ) -> Result<()> {
        let master_dir = master_dir.unwrap_or_else(|| config.paths.master_dir.clone());
        let out_dir = out_dir.unwrap_or_else(|| config.paths.weighted_dir.clone());
        let start = start_year.unwrap_or(config.weighted.start_year);
        let end = end_year.unwrap_or(config.weighted.end_year);

        let report = nbastats::features::build_weighted_stats_by_year(
            &master_dir,
            &out_dir,
            start,
            end,
            overwrite,
        )?;
        println!(
            "Weighted stats: {} written, {} skipped, {} missing ({} rows)",
            report.seasons_written.len(),
            report.seasons_skipped.len(),
            report.seasons_missing.len(),
            report.rows
        );
        Ok(())
    }

    pub fn make_training(
        config: &Config,
        weighted_dir: Option<String>,
        out: Option<String>,
        start_year: Option<u16>,
        end_year: Option<u16>,
        window: Option<usize>,
        min_history: Option<usize>,
    ) -> Result<()> {
        let settings = &config.training_set;
        let weighted_dir = weighted_dir.unwrap_or_else(|| config.paths.weighted_dir.clone());
        let out = out.unwrap_or_else(|| config.paths.training_data.clone());

        let set = nbastats::features::build_training_set(
            &weighted_dir,
            &out,
            start_year.unwrap_or(settings.start_year),
            end_year.unwrap_or(settings.end_year),
            window.unwrap_or(settings.window),
            min_history.unwrap_or(settings.min_history),
        )?;
        println!("Training set: {} rows, {} features -> {}", set.rows.len(), set.feature_names.len(), out);
        Ok(())
    }

    pub fn train_baseline(
        config: &Config,
        training: Option<String>,
        out_dir: Option<String>,
        test_frac: Option<f64>,
        seed: Option<u64>,
    ) -> Result<()> {
        let training = training.unwrap_or_else(|| config.paths.training_data.clone());
        let out_dir = out_dir.unwrap_or_else(|| config.paths.output_dir.clone());

        let mut settings = config.model.clone();
        if let Some(frac) = test_frac {
            settings.test_frac = frac;
        }
        if let Some(seed) = seed {
            settings.seed = seed;
        }

        let (path, metrics) = nbastats::training::train_baseline_classifier(&training, &out_dir, &settings)?;
        println!("{}", metrics);
        println!("Saved model to {}", path.display());
        Ok(())
    }
}
