use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing::{info, warn};

use tgx_core::{
    auth::{authenticate, StdinPrompter},
    config::{parse_date_bound, Config, DateBound},
    export::run_jobs,
    ports::HistorySource,
    throttled::ThrottledSource,
};
use tgx_telegram::{connect, GrammersAuth, TelegramSource};

/// Export Telegram channel history to Markdown files.
///
/// Credentials and defaults come from the environment (or `.env`); flags
/// override them for this run.
#[derive(Debug, Parser)]
#[command(name = "tgx", version)]
struct Cli {
    /// Channel references: @username, t.me links, invite links or numeric ids.
    /// Replaces TARGET_CHANNELS when given.
    channels: Vec<String>,

    /// Earliest message date (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    from: Option<String>,

    /// Latest message date, inclusive (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    to: Option<String>,

    /// Skip messages without text.
    #[arg(long)]
    only_text: bool,

    /// Truncate output files instead of appending.
    #[arg(long)]
    overwrite: bool,

    /// Append from the start of history, ignoring what the file already has.
    #[arg(long, conflicts_with = "overwrite")]
    full: bool,

    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    session_file: Option<PathBuf>,

    /// Log level for tgx crates (RUST_LOG takes precedence).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, cfg: &mut Config) -> Result<(), tgx_core::Error> {
        if !self.channels.is_empty() {
            cfg.target_channels = self.channels;
        }
        if let Some(from) = self.from {
            cfg.from_date = Some(parse_date_bound(&from, DateBound::Start)?);
        }
        if let Some(to) = self.to {
            cfg.to_date = Some(parse_date_bound(&to, DateBound::End)?);
        }
        if self.only_text {
            cfg.only_text = true;
        }
        if self.overwrite {
            cfg.append_mode = false;
        }
        if self.full {
            cfg.resume = false;
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(file) = self.session_file {
            cfg.session_file = file;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), tgx_core::Error> {
    let cli = Cli::parse();
    tgx_core::logging::init("tgx", cli.log_level.as_deref())?;

    let mut cfg = Config::load()?;
    cli.apply(&mut cfg)?;
    cfg.validate()?;

    let client = connect(&cfg).await?;
    let auth = GrammersAuth::new(client.clone(), &cfg.session_file);
    authenticate(&auth, &cfg.phone_number, &StdinPrompter).await?;
    auth.log_account().await?;

    let telegram: Arc<dyn HistorySource> = Arc::new(TelegramSource::new(client));
    let source = ThrottledSource::new(telegram, cfg.page_interval);

    let result = run_jobs(
        &source,
        &cfg.target_channels,
        &cfg.export_options(),
        &cfg.output_dir,
    )
    .await;

    if let Err(e) = auth.save_session() {
        warn!(error = %e, "failed to save session");
    }
    let report = result?;

    for failure in &report.failed {
        warn!(
            channel = %failure.reference,
            kind = failure.error.kind(),
            "not exported"
        );
    }
    info!(
        channels = cfg.target_channels.len(),
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        exported = report.total_exported(),
        output_dir = %cfg.output_dir.display(),
        "run complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_config() -> Config {
        let env: HashMap<&str, &str> = [
            ("API_ID", "12345"),
            ("API_HASH", "abc"),
            ("PHONE_NUMBER", "+15550000000"),
            ("TARGET_CHANNELS", "@from_env"),
        ]
        .into_iter()
        .collect();
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "tgx",
            "@alpha",
            "https://t.me/beta",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--only-text",
            "--overwrite",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let mut cfg = base_config();
        cli.apply(&mut cfg).unwrap();

        assert_eq!(cfg.target_channels, vec!["@alpha", "https://t.me/beta"]);
        assert!(cfg.only_text);
        assert!(!cfg.append_mode);
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert!(cfg.from_date.unwrap() < cfg.to_date.unwrap());
        cfg.validate().unwrap();
    }

    #[test]
    fn no_channels_keeps_env_list() {
        let cli = Cli::try_parse_from(["tgx", "--full"]).unwrap();
        let mut cfg = base_config();
        cli.apply(&mut cfg).unwrap();
        assert_eq!(cfg.target_channels, vec!["@from_env"]);
        assert!(!cfg.resume);
        assert!(cfg.append_mode);
    }

    #[test]
    fn bad_date_flag_is_config_error() {
        let cli = Cli::try_parse_from(["tgx", "--from", "yesterday"]).unwrap();
        let err = cli.apply(&mut base_config()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn full_conflicts_with_overwrite() {
        assert!(Cli::try_parse_from(["tgx", "--full", "--overwrite"]).is_err());
    }
}
