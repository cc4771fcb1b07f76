use std::{env, path::PathBuf, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};

use crate::{errors::Error, export::ExportOptions, Result};

/// Typed configuration for an export run.
///
/// Credentials come from the environment (a `.env` file is honoured); the
/// run parameters have env defaults that the CLI may override.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub api_id: i32,
    pub api_hash: String,
    pub phone_number: String,

    // Jobs
    pub target_channels: Vec<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub only_text: bool,
    pub append_mode: bool,
    pub resume: bool,

    // Files
    pub output_dir: PathBuf,
    pub session_file: PathBuf,

    // Pacing / reporting
    pub progress_interval: u64,
    pub page_size: u32,
    pub page_interval: Duration,
    pub flood_sleep_threshold: u32,
}

pub const MAX_PAGE_SIZE: u32 = 100;

impl Config {
    pub fn load() -> Result<Self> {
        // Never overrides variables that are already set.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required credentials
        let api_id_raw = get("API_ID").ok_or_else(|| missing("API_ID"))?;
        let api_id = api_id_raw
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Config(format!("API_ID must be a number, got {api_id_raw:?}")))?;
        let api_hash = get("API_HASH").ok_or_else(|| missing("API_HASH"))?;
        let phone_number = get("PHONE_NUMBER").ok_or_else(|| missing("PHONE_NUMBER"))?;

        let target_channels = parse_csv(get("TARGET_CHANNELS"));

        let from_date = get("FROM_DATE")
            .map(|s| parse_date_bound(&s, DateBound::Start))
            .transpose()?;
        let to_date = get("TO_DATE")
            .map(|s| parse_date_bound(&s, DateBound::End))
            .transpose()?;

        let only_text = get("ONLY_TEXT").map(|s| parse_bool(&s)).unwrap_or(false);
        let append_mode = get("APPEND_MODE").map(|s| parse_bool(&s)).unwrap_or(true);
        let resume = get("RESUME").map(|s| parse_bool(&s)).unwrap_or(true);

        let output_dir = PathBuf::from(get("OUTPUT_DIR").unwrap_or_else(|| "output".to_string()));
        let session_file = PathBuf::from(
            get("SESSION_FILE").unwrap_or_else(|| "telegram_scraper.session".to_string()),
        );

        let progress_interval = parse_num::<u64>(get("PROGRESS_INTERVAL"), "PROGRESS_INTERVAL")?
            .unwrap_or(100)
            .max(1);
        let page_size = parse_num::<u32>(get("PAGE_SIZE"), "PAGE_SIZE")?
            .unwrap_or(MAX_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page_interval = Duration::from_millis(
            parse_num::<u64>(get("PAGE_INTERVAL_MS"), "PAGE_INTERVAL_MS")?.unwrap_or(0),
        );
        let flood_sleep_threshold =
            parse_num::<u32>(get("FLOOD_SLEEP_THRESHOLD"), "FLOOD_SLEEP_THRESHOLD")?.unwrap_or(300);

        Ok(Self {
            api_id,
            api_hash,
            phone_number,
            target_channels,
            from_date,
            to_date,
            only_text,
            append_mode,
            resume,
            output_dir,
            session_file,
            progress_interval,
            page_size,
            page_interval,
            flood_sleep_threshold,
        })
    }

    /// Checks that hold only once CLI overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if self.target_channels.is_empty() {
            return Err(Error::Config(
                "no channels given: set TARGET_CHANNELS or pass channel references".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if from > to {
                return Err(Error::Config(format!(
                    "FROM_DATE ({from}) is after TO_DATE ({to})"
                )));
            }
        }
        Ok(())
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            from_date: self.from_date,
            to_date: self.to_date,
            only_text: self.only_text,
            append_mode: self.append_mode,
            resume: self.resume,
            page_size: self.page_size,
            progress_interval: self.progress_interval,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date.
///
/// A bare date is the first second of that day (UTC) for a start bound and the
/// last second of that day for an end bound, so both ends are inclusive.
pub fn parse_date_bound(raw: &str, bound: DateBound) -> Result<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        Error::Config(format!(
            "invalid date {s:?}: expected RFC 3339 (2024-01-01T00:00:00Z) or YYYY-MM-DD"
        ))
    })?;
    let (h, m, sec) = match bound {
        DateBound::Start => (0, 0, 0),
        DateBound::End => (23, 59, 59),
    };
    let naive = date
        .and_hms_opt(h, m, sec)
        .ok_or_else(|| Error::Config(format!("invalid date {s:?}")))?;
    Ok(naive.and_utc())
}

pub fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_num<T: std::str::FromStr>(v: Option<String>, key: &str) -> Result<Option<T>> {
    match v {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {s:?}"))),
    }
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn missing(key: &str) -> Error {
    Error::Config(format!(
        "{key} environment variable is required (get API credentials from my.telegram.org)"
    ))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
