pub mod credentials;

use chrono::NaiveTime;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

pub use credentials::Secret;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Whether the process generates one report and exits or waits for the weekday schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Scheduled,
}

impl RunMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "scheduled" => Ok(Self::Scheduled),
            _ => Err(ConfigError::InvalidRunMode(value.to_string())),
        }
    }
}

/// Top-level configuration, read once at process start and passed down by reference.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub api: ApiConfig,
    pub report: ReportConfig,
    pub email: EmailConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Lookup(&lookup);

        let environment = AppEnvironment::from_str(
            &vars.value("APP_ENV").unwrap_or_else(|| "development".to_string()),
        );

        let host = vars
            .value("APP_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = vars
            .value("APP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = vars
            .value("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_ascii_lowercase();
        let log_file = match lookup("LOG_FILE") {
            None => Some(PathBuf::from("report_generation.log")),
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(PathBuf::from(value.trim())),
        };

        let api = ApiConfig {
            host: vars
                .value("HOST")
                .unwrap_or_else(|| "tintasberger.solutechlabs.com".to_string()),
            access_token: vars.value("ACCESS_TOKEN").map(Secret::new),
            laravel_token: vars.value("LARAVEL_TOKEN").map(Secret::new),
            sat_session: vars.value("SAT_SESSION").map(Secret::new),
            xsrf_token: vars.value("XSRF_TOKEN").map(Secret::new),
            sat_user_id: vars.value("SAT_USER_ID").unwrap_or_else(|| "57".to_string()),
            country_id: vars.number("COUNTRY_ID", 149)?,
            timeout_secs: vars.number("API_TIMEOUT_SECS", 30)?,
            page_size: vars.number("API_PAGE_SIZE", 25)?,
        };

        let report = ReportConfig {
            output_file: PathBuf::from(
                vars.value("OUTPUT_FILE")
                    .unwrap_or_else(|| "Daily_CSFA_Report.xlsx".to_string()),
            ),
            summary_text_file: PathBuf::from(
                vars.value("SUMMARY_TEXT_FILE")
                    .unwrap_or_else(|| "summary_for_email.txt".to_string()),
            ),
            summary_sheet: vars
                .value("SUMMARY_SHEET")
                .unwrap_or_else(|| "Summary".to_string()),
            order_date: vars.value("ORDER_DATE"),
            order_date_range: vars.value("ORDER_DATE_RANGE"),
            detail_fetch_workers: vars.number::<usize>("DETAIL_FETCH_WORKERS", 4)?.max(1),
            currency: vars.value("CURRENCY").unwrap_or_else(|| "MZN".to_string()),
            html_preview_file: if vars.flag("SAVE_HTML_PREVIEW", false) {
                Some(PathBuf::from(
                    vars.value("HTML_PREVIEW_FILE")
                        .unwrap_or_else(|| "email_preview.html".to_string()),
                ))
            } else {
                None
            },
        };

        let email = EmailConfig {
            enabled: vars.flag("SEND_EMAIL", true),
            smtp_server: vars.value("SMTP_SERVER"),
            smtp_port: vars.number("SMTP_PORT", 587)?,
            sender_email: vars.value("SENDER_EMAIL"),
            password: vars.value("EMAIL_PASSWORD").map(Secret::new),
            to: vars.list("EMAIL_TO"),
            cc: vars.list("EMAIL_CC"),
            bcc: vars.list("EMAIL_BCC"),
            subject_template: vars
                .value("EMAIL_SUBJECT")
                .unwrap_or_else(|| "CSFA Report - {date}".to_string()),
            sender_name: vars
                .value("SENDER_NAME")
                .unwrap_or_else(|| "CSFA Reports".to_string()),
            recipient_name: vars
                .value("RECIPIENT_NAME")
                .unwrap_or_else(|| "Team".to_string()),
            timeout_secs: vars.number("SMTP_TIMEOUT", 30)?,
        };

        let run_mode = match vars.value("RUN_MODE") {
            Some(value) => RunMode::parse(&value)?,
            None => RunMode::Scheduled,
        };
        let report_time_raw = vars
            .value("REPORT_TIME")
            .unwrap_or_else(|| "19:00".to_string());
        let report_time = NaiveTime::parse_from_str(&report_time_raw, "%H:%M")
            .map_err(|_| ConfigError::InvalidReportTime(report_time_raw.clone()))?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_file,
            },
            api,
            report,
            email,
            schedule: ScheduleConfig {
                run_mode,
                report_time,
            },
        })
    }
}

struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn value(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn number<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.value(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.value(key) {
            Some(raw) => matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            None => default,
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.value(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// Upstream sales platform endpoint and session credentials.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub access_token: Option<Secret>,
    pub laravel_token: Option<Secret>,
    pub sat_session: Option<Secret>,
    pub xsrf_token: Option<Secret>,
    pub sat_user_id: String,
    pub country_id: u32,
    pub timeout_secs: u64,
    pub page_size: u32,
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }

    /// Fails with every missing credential at once so a misconfigured deploy is fixed in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("ACCESS_TOKEN", self.access_token.is_none()),
            ("LARAVEL_TOKEN", self.laravel_token.is_none()),
            ("SAT_SESSION", self.sat_session.is_none()),
            ("XSRF_TOKEN", self.xsrf_token.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables(missing))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_file: PathBuf,
    pub summary_text_file: PathBuf,
    pub summary_sheet: String,
    pub order_date: Option<String>,
    pub order_date_range: Option<String>,
    pub detail_fetch_workers: usize,
    pub currency: String,
    pub html_preview_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
    pub sender_email: Option<String>,
    pub password: Option<Secret>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject_template: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub timeout_secs: u64,
}

impl EmailConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("SMTP_SERVER", self.smtp_server.is_none()),
            ("SENDER_EMAIL", self.sender_email.is_none()),
            ("EMAIL_PASSWORD", self.password.is_none()),
            ("EMAIL_TO", self.to.is_empty()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables(missing))
        }
    }

    pub fn subject_for(&self, date: &str) -> String {
        self.subject_template.replace("{date}", date)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub run_mode: RunMode,
    pub report_time: NaiveTime,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidRunMode(String),
    InvalidReportTime(String),
    MissingVariables(Vec<&'static str>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative number, got '{value}'")
            }
            ConfigError::InvalidRunMode(value) => {
                write!(f, "RUN_MODE must be 'once' or 'scheduled', got '{value}'")
            }
            ConfigError::InvalidReportTime(value) => {
                write!(f, "REPORT_TIME must use HH:MM (24-hour), got '{value}'")
            }
            ConfigError::MissingVariables(keys) => write!(
                f,
                "missing required environment variables: {}",
                keys.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
