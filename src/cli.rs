//! CLI interface for Uplink.
//!
//! One invocation runs one mission: pick an account, name the mission, and
//! every finished file dropped into the mission folders is uploaded until
//! Ctrl-C. Arguments replace interactive prompts so the tool can run
//! unattended from a launcher or a systemd unit.
//!
//! Setup problems come back as `Err(String)`; once watching starts, a bad
//! file is logged and skipped and never ends the run.

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use tracing::{error, info};

use crate::{
    config::{Config, resolve_prefix},
    model::{Mission, parse_start_time},
    pipeline::Pipeline,
    scaffold::create_scaffold,
    stability::{DEFAULT_SETTLE, ProcessedFiles, StabilityFilter},
    storage::Sink,
    watch::{DEFAULT_POLL_INTERVAL, WatchMode, Watcher},
};

/// Uplink: push mission products to storage as they land.
#[derive(Debug, Parser)]
#[command(name = "uplink", version, after_long_help = LAYOUT_HELP)]
pub struct Cli {
    /// Mission name. Anything other than letters, digits and `-` becomes `-`.
    #[arg(long, short)]
    pub mission: String,

    /// Mission start in local time, `YYYY-MM-DD HH:MM`. Defaults to now.
    #[arg(long, short)]
    pub time: Option<String>,

    /// Account name from the config file. Defaults to the first account.
    #[arg(long, short)]
    pub account: Option<String>,

    /// Config file (`.json` or TOML).
    /// Falls back to `$UPLINK_CONFIG`, `./config.json`, then `~/.uplink/config.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding `missions/` and, for local accounts, `uploads/`.
    /// Defaults to the working directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Key prefix. Overrides `$vendor` and the account's `path`.
    #[arg(long)]
    pub vendor: Option<String>,

    /// Poll the mission tree instead of using native file notifications.
    #[arg(long)]
    pub poll: bool,

    /// Interval between polling walks.
    #[arg(long, default_value_t = millis(DEFAULT_POLL_INTERVAL))]
    pub poll_interval_ms: u64,

    /// How long a file's size must hold still before it is uploaded.
    #[arg(long, default_value_t = millis(DEFAULT_SETTLE))]
    pub settle_ms: u64,

    /// Log at debug level. `RUST_LOG` takes precedence when set.
    #[arg(long, short)]
    pub verbose: bool,
}

const LAYOUT_HELP: &str = r"Mission layout (created at startup):
  missions/<YYYY-MM-DDTHHMM>_<mission>/
    images/EO  images/HS  images/IR
    tactical/Detection  tactical/HeatPerimeter  tactical/IntenseHeat
    tactical/IsolatedHeat  tactical/ScatteredHeat
    videos/

Keys:
  IMAGERY/<YYYYMMDD_HHMMSS>Z_<mission>_EOimage.tif
  TACTICAL/<YYYYMMDD_HHMMSS>Z_<mission>_Detection.kml
  VIDEO/<YYYYMMDD_HHMMSS>Z_<mission>_Video.ts
  MISSION/<mission>_<YYYYMMDD_HHMM>Z.txt";

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Run one mission, returning an error message on setup failure.
pub async fn run(cli: Cli) -> Result<(), String> {
    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir()
            .map_err(|e| format!("failed to determine working directory: {e}"))?,
    };

    let config_path = Config::resolve_path(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let config = Config::load(&config_path).map_err(|e| e.to_string())?;
    let account = config
        .select(cli.account.as_deref())
        .map_err(|e| e.to_string())?;
    let target = account.target().map_err(|e| e.to_string())?;
    let prefix = resolve_prefix(cli.vendor.as_deref(), account);
    info!(
        config = %config_path.display(),
        account = %account.name,
        prefix = prefix.as_deref().unwrap_or(""),
        "loaded account"
    );

    let start = parse_start_time(cli.time.as_deref()).map_err(|e| e.to_string())?;
    let mission = Mission::new(&cli.mission, start).map_err(|e| e.to_string())?;

    let sink = Sink::open(target, &root)
        .map_err(|e| format!("failed to prepare upload destination: {e}"))?;

    let mission_root = prepare_mission_dir(&root, &mission)?;
    info!(path = %mission_root.display(), "mission folders ready");

    let filter = StabilityFilter::new(
        ProcessedFiles::new(),
        Duration::from_millis(cli.settle_ms),
    );
    let pipeline = Arc::new(Pipeline::new(
        mission,
        mission_root.clone(),
        prefix,
        sink,
        filter,
    ));

    pipeline
        .announce()
        .await
        .map_err(|e| format!("failed to create mission: {e}"))?;

    let mode = if cli.poll {
        WatchMode::Polling
    } else {
        WatchMode::Auto
    };
    let watcher = Watcher::start(
        &mission_root,
        mode,
        Duration::from_millis(cli.poll_interval_ms),
    )
    .map_err(|e| e.to_string())?;

    info!("press Ctrl-C to stop");
    pipeline.run(watcher, interrupted()).await;
    Ok(())
}

/// Scaffolds the mission tree and returns its canonical path.
///
/// Watchers report absolute, symlink-resolved paths, so the mission root has
/// to be spelled the same way for classification to match.
fn prepare_mission_dir(root: &Path, mission: &Mission) -> Result<PathBuf, String> {
    create_scaffold(root, mission)
        .and_then(|dir| dir.canonicalize())
        .map_err(|e| {
            format!(
                "failed to create mission folders under {}: {e}",
                root.display()
            )
        })
}

/// Resolves on Ctrl-C. If the handler can't be installed, never resolves.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, finishing in-flight uploads"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["uplink", "--mission", "Crawl 1"]).unwrap();

        assert_eq!(cli.mission, "Crawl 1");
        assert!(cli.time.is_none());
        assert!(!cli.poll);
        assert_eq!(cli.poll_interval_ms, 2000);
        assert_eq!(cli.settle_ms, 500);
    }

    #[test]
    fn mission_is_required() {
        assert!(Cli::try_parse_from(["uplink"]).is_err());
    }

    #[test]
    fn mission_dir_is_canonical() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("launcher")).unwrap();
        let roundabout = dir.path().join("launcher/../field");
        let mission =
            Mission::new("Crawl", jiff::Timestamp::new(1_722_540_600, 0).unwrap()).unwrap();

        let mission_dir = prepare_mission_dir(&roundabout, &mission).unwrap();

        assert!(mission_dir.is_absolute());
        assert!(mission_dir.join("videos").is_dir());
        assert_eq!(
            mission_dir,
            dir.path()
                .canonicalize()
                .unwrap()
                .join("field/missions/2024-08-01T1930_Crawl")
        );
    }

    fn cli(dir: &TempDir, extra: &[&str]) -> Cli {
        let config = dir.path().join("config.json");
        let root = dir.path().join("field");
        let mut args = vec![
            "uplink".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--root".to_string(),
            root.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| (*s).to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn invalid_time_is_fatal_before_anything_is_created() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"accounts":[{"name":"bench","storageMode":"local"}]}"#,
        )
        .unwrap();

        let err = run(cli(&dir, &["--mission", "Crawl", "--time", "tomorrow"]))
            .await
            .unwrap_err();

        assert!(err.contains("tomorrow"), "{err}");
        assert!(!dir.path().join("field/missions").exists());
    }

    #[tokio::test]
    async fn missing_config_is_fatal() {
        let dir = TempDir::new().unwrap();

        let err = run(cli(&dir, &["--mission", "Crawl"])).await.unwrap_err();

        assert!(err.contains("config.json"), "{err}");
    }

    #[tokio::test]
    async fn incomplete_remote_account_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"accounts":[{"name":"ops","bucket":"drops"}]}"#,
        )
        .unwrap();

        let err = run(cli(&dir, &["--mission", "Crawl"])).await.unwrap_err();

        assert!(err.contains("ops"), "{err}");
    }

    #[tokio::test]
    async fn unknown_account_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"accounts":[{"name":"bench","storageMode":"local"}]}"#,
        )
        .unwrap();

        let err = run(cli(&dir, &["--mission", "Crawl", "--account", "field"]))
            .await
            .unwrap_err();

        assert!(err.contains("field"), "{err}");
    }
}
