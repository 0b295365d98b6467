use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    /// Fixed offset used to derive the attendance date of a scan.
    pub utc_offset: FixedOffset,
    pub identity_cache_capacity: u64,

    // Rate limiting
    pub rate_scan_per_min: u32,
    pub rate_register_per_min: u32,

    /// Read keyboard-wedge scanner input from stdin.
    pub scanner_stdin: bool,
    pub log_dir: String,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: var_or("DATABASE_URL", "sqlite://data/attendance.db"),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 8)?,
            utc_offset: parse_utc_offset(&var_or("ATTENDANCE_UTC_OFFSET", "+00:00"))
                .context("ATTENDANCE_UTC_OFFSET")?,
            identity_cache_capacity: parse_var("IDENTITY_CACHE_CAPACITY", 10_000)?,
            rate_scan_per_min: parse_var("RATE_SCAN_PER_MIN", 600)?,
            rate_register_per_min: parse_var("RATE_REGISTER_PER_MIN", 30)?,
            scanner_stdin: parse_var("SCANNER_STDIN", false)?,
            log_dir: var_or("LOG_DIR", "logs"),
            api_prefix: var_or("API_PREFIX", "/api/v1"),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Parses `[+-]HH:MM` (also accepts `Z`).
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(anyhow!("offset must start with + or -: {raw:?}")),
    };

    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("offset must look like +HH:MM: {raw:?}"))?;
    let hours: i32 = hours.parse().with_context(|| format!("bad hours in {raw:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("bad minutes in {raw:?}"))?;

    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(anyhow!("offset out of range: {raw:?}"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset out of range: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_offsets() {
        assert_eq!(parse_utc_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(
            parse_utc_offset("-05:30").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(parse_utc_offset("08:00").is_err());
        assert!(parse_utc_offset("+8").is_err());
        assert!(parse_utc_offset("+15:00").is_err());
        assert!(parse_utc_offset("+01:75").is_err());
    }
}
