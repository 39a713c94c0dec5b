//! Configuration loading for export jobs.
//!
//! A job is described by a YAML (or JSON) file whose values can be overridden
//! from the command line. `AppConfig::to_job_config` validates the merged
//! result and produces the immutable `ExportJobConfig` the runner consumes.

use crate::domain::errors::{ExportError, Result};
use crate::domain::export_models::{ConnectionDescriptor, ExportJobConfig, RowLimit};
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV_VAR: &str = "DB_PASSWORD";

pub const DEFAULT_SEPARATOR: &str = ",";
pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_RETRY_COUNT: u32 = 4;
pub const DEFAULT_RETRY_PERIOD_SECS: u64 = 60;
pub const DEFAULT_PREFETCH_ROWS: u32 = 5000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Identifier used in log messages and the final error; defaults to `dest_name`.
    #[serde(default)]
    pub job_id: Option<String>,
    pub database: DatabaseConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Driver identifier: `oracle` or `sqlite`.
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    pub password: Option<String>,
    pub prefetch_rows: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub dest_path: String,
    #[serde(default)]
    pub dest_name: String,
    /// Rows per output file; absent or `-1` writes a single file.
    pub file_record_num: Option<i64>,
    pub separator: Option<String>,
    pub charset: Option<String>,
    pub retry_count: Option<u32>,
    /// Seconds to wait between attempts.
    pub retry_period: Option<u64>,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub job_id: Option<String>,
    #[arg(long)]
    pub driver: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub sql: Option<String>,
    /// Output directory
    #[arg(short, long)]
    pub output: Option<String>,
    /// Output file name, e.g. orders.csv
    #[arg(long)]
    pub name: Option<String>,
    /// Rows per output file (-1 for a single file)
    #[arg(long, allow_hyphen_values = true)]
    pub file_record_num: Option<i64>,
    #[arg(long)]
    pub separator: Option<String>,
    #[arg(long)]
    pub retry_count: Option<u32>,
    /// Seconds to wait between attempts
    #[arg(long)]
    pub retry_period: Option<u64>,
    /// Write a JSON report of the run to this path
    #[arg(long)]
    pub report: Option<String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(j) = &args.job_id { self.job_id = Some(j.clone()); }
        if let Some(d) = &args.driver { self.database.driver = d.clone(); }
        if let Some(u) = &args.url { self.database.url = u.clone(); }
        if let Some(u) = &args.username { self.database.username = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(s) = &args.sql { self.export.sql = s.clone(); }
        if let Some(o) = &args.output { self.export.dest_path = o.clone(); }
        if let Some(n) = &args.name { self.export.dest_name = n.clone(); }
        if let Some(r) = args.file_record_num { self.export.file_record_num = Some(r); }
        if let Some(s) = &args.separator { self.export.separator = Some(s.clone()); }
        if let Some(r) = args.retry_count { self.export.retry_count = Some(r); }
        if let Some(r) = args.retry_period { self.export.retry_period = Some(r); }
    }

    /// Checks that every required setting is present and every optional one is usable.
    pub fn validate(&self) -> Result<()> {
        require(&self.database.driver, "Database driver is required.")?;
        require(&self.database.url, "Database url is required.")?;
        require(&self.export.sql, "Export sql is required.")?;
        require(&self.export.dest_path, "Dest path is required.")?;
        require(&self.export.dest_name, "Dest name is required.")?;

        self.row_limit()?;
        self.separator()?;
        self.charset()?;
        Ok(())
    }

    /// Validates and freezes the configuration into an `ExportJobConfig`.
    pub fn to_job_config(&self) -> Result<ExportJobConfig> {
        self.validate()?;

        let password = self
            .database
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
            .unwrap_or_default();
        let dest_name = self.export.dest_name.trim().to_string();

        Ok(ExportJobConfig {
            job_id: self
                .job_id
                .clone()
                .filter(|j| !j.trim().is_empty())
                .unwrap_or_else(|| dest_name.clone()),
            connection: ConnectionDescriptor {
                driver: self.database.driver.trim().to_string(),
                url: self.database.url.trim().to_string(),
                username: self.database.username.clone(),
                password,
            },
            sql: self.export.sql.clone(),
            dest_dir: PathBuf::from(self.export.dest_path.trim()),
            dest_name,
            row_limit: self.row_limit()?,
            separator: self.separator()?,
            encoding: self.charset()?,
            retry_count: self.export.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            retry_delay: Duration::from_secs(
                self.export.retry_period.unwrap_or(DEFAULT_RETRY_PERIOD_SECS),
            ),
            prefetch_rows: self.database.prefetch_rows.unwrap_or(DEFAULT_PREFETCH_ROWS),
        })
    }

    fn row_limit(&self) -> Result<RowLimit> {
        RowLimit::from_record_num(self.export.file_record_num).ok_or_else(|| {
            ExportError::ConfigError(format!(
                "file_record_num must be -1 or a positive number, got {}",
                self.export.file_record_num.unwrap_or_default()
            ))
        })
    }

    fn separator(&self) -> Result<u8> {
        let sep = self.export.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
        match sep.as_bytes() {
            [b] if b.is_ascii() && *b != b'\n' && *b != b'\r' => Ok(*b),
            _ => Err(ExportError::ConfigError(format!(
                "separator must be a single ASCII character other than a line break, got {:?}",
                sep
            ))),
        }
    }

    fn charset(&self) -> Result<String> {
        let charset = self.export.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
        match charset.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(DEFAULT_CHARSET.to_string()),
            _ => Err(ExportError::ConfigError(format!(
                "unsupported output charset '{}', only UTF-8 is produced",
                charset
            ))),
        }
    }
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExportError::ConfigError(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> AppConfig {
        AppConfig {
            job_id: None,
            database: DatabaseConfig {
                driver: "oracle".into(),
                url: "//localhost:1521/XE".into(),
                username: "scott".into(),
                password: Some("tiger".into()),
                prefetch_rows: None,
            },
            export: ExportConfig {
                sql: "SELECT * FROM EMP".into(),
                dest_path: "/tmp/out".into(),
                dest_name: "emp.csv".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_load_yaml_config() {
        let yaml = r#"
job_id: nightly_emp
database:
  driver: oracle
  url: "jdbc:oracle:thin:@//localhost:1521/ORCL"
  username: "test_user"
  password: "test_password"
export:
  sql: "SELECT * FROM EMP"
  dest_path: "./output"
  dest_name: "emp.txt"
  file_record_num: 1000
  separator: "|"
  retry_count: 2
  retry_period: 5
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "{}", yaml).unwrap();
        let path = file.path().to_str().unwrap();

        let config = AppConfig::from_file(path).expect("Failed to parse config");
        let job = config.to_job_config().unwrap();

        assert_eq!(job.job_id, "nightly_emp");
        assert_eq!(job.connection.username, "test_user");
        assert_eq!(job.separator, b'|');
        assert_eq!(job.retry_count, 2);
        assert_eq!(job.retry_delay, Duration::from_secs(5));
        assert!(matches!(job.row_limit, RowLimit::PerFile(n) if n.get() == 1000));
        assert_eq!(job.destination(), PathBuf::from("./output/emp.txt"));
    }

    #[test]
    fn test_load_json_config_with_defaults() {
        let json = r#"{
            "database": {"driver": "sqlite", "url": "sqlite:/tmp/a.db"},
            "export": {"sql": "SELECT 1", "dest_path": "/tmp", "dest_name": "one.csv"}
        }"#;
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", json).unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        let job = config.to_job_config().unwrap();

        assert_eq!(job.job_id, "one.csv");
        assert_eq!(job.row_limit, RowLimit::Unlimited);
        assert_eq!(job.separator, b',');
        assert_eq!(job.encoding, "UTF-8");
        assert_eq!(job.retry_count, DEFAULT_RETRY_COUNT);
        assert_eq!(job.retry_delay, Duration::from_secs(DEFAULT_RETRY_PERIOD_SECS));
        assert_eq!(job.prefetch_rows, DEFAULT_PREFETCH_ROWS);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "database: [unclosed").unwrap();
        let err = AppConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExportError::ConfigError(_)));
    }

    fn assert_config_error(config: &AppConfig, word: &str) {
        match config.validate() {
            Err(ExportError::ConfigError(msg)) => assert!(msg.contains(word), "{}", msg),
            other => panic!("expected config error for {}, got {:?}", word, other),
        }
    }

    #[test]
    fn test_required_settings() {
        assert!(minimal().validate().is_ok());

        let mut config = minimal();
        config.database.driver.clear();
        assert_config_error(&config, "driver");

        let mut config = minimal();
        config.database.url = "   ".into();
        assert_config_error(&config, "url");

        let mut config = minimal();
        config.export.sql.clear();
        assert_config_error(&config, "sql");

        let mut config = minimal();
        config.export.dest_path.clear();
        assert_config_error(&config, "path");

        let mut config = minimal();
        config.export.dest_name.clear();
        assert_config_error(&config, "name");
    }

    #[test]
    fn test_invalid_optional_settings() {
        let mut config = minimal();
        config.export.file_record_num = Some(0);
        assert!(config.validate().is_err());

        let mut config = minimal();
        config.export.separator = Some("||".into());
        assert!(config.validate().is_err());

        let mut config = minimal();
        config.export.separator = Some("\n".into());
        assert!(config.validate().is_err());

        let mut config = minimal();
        config.export.charset = Some("GBK".into());
        assert!(config.validate().is_err());

        let mut config = minimal();
        config.export.charset = Some("utf8".into());
        config.export.separator = Some("\t".into());
        config.export.file_record_num = Some(-1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_cli_overrides_file_values() {
        let mut config = minimal();
        let args = CliArgs::parse_from([
            "query-export",
            "--url",
            "//prod:1521/P1",
            "--output",
            "/data/exports",
            "--file-record-num",
            "-1",
            "--retry-count",
            "0",
        ]);
        config.merge_cli(&args);

        assert_eq!(config.database.url, "//prod:1521/P1");
        assert_eq!(config.export.dest_path, "/data/exports");
        assert_eq!(config.export.file_record_num, Some(-1));
        assert_eq!(config.export.retry_count, Some(0));
        assert_eq!(config.database.driver, "oracle");
    }
}
