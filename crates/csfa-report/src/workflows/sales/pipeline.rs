use super::details::resolve_order_lines;
use super::gateway::{GatewayError, SalesDataGateway, SolutechClient};
use super::reconcile::OrderCoverage;
use super::report::email::{render_html, EmailContent, ReportEmail, ReportMailer, SmtpMailer};
use super::report::text::render_summary_table;
use super::report::workbook::write_workbook;
use super::report::SalesReport;
use super::summary::ReportTotals;
use crate::config::{AppConfig, ConfigError, EmailConfig, ReportConfig};
use chrono::NaiveDate;
use rust_xlsxwriter::XlsxError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The three date strings one run is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDates {
    /// Orders filter in the upstream `Mon+Jan+05+2026` form.
    pub order_date: String,
    /// Timesheet filter, `YYYY-MM-DD - YYYY-MM-DD`.
    pub date_range: String,
    /// `YYYY-MM-DD`, used in the subject line and email body.
    pub display_date: String,
}

impl ReportDates {
    pub fn for_day(day: NaiveDate) -> Self {
        let iso = day.format("%Y-%m-%d").to_string();
        Self {
            order_date: day.format("%a+%b+%d+%Y").to_string(),
            date_range: format!("{iso} - {iso}"),
            display_date: iso,
        }
    }

    /// Dates for `day`, with `ORDER_DATE` / `ORDER_DATE_RANGE` overrides applied.
    pub fn resolve(day: NaiveDate, report: &ReportConfig) -> Self {
        let mut dates = Self::for_day(day);
        if let Some(order_date) = &report.order_date {
            dates.order_date = order_date.clone();
        }
        if let Some(date_range) = &report.order_date_range {
            dates.date_range = date_range.clone();
        }
        dates
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("unable to write workbook: {0}")]
    Workbook(#[from] XlsxError),
    #[error("unable to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmailStatus {
    Disabled,
    Sent { recipients: usize },
    Failed { reason: String },
}

/// Summary of a finished run, returned to the CLI and the HTTP trigger.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub dates: ReportDates,
    pub visits: usize,
    pub orders: usize,
    pub salespersons: usize,
    pub totals: ReportTotals,
    pub coverage: OrderCoverage,
    pub order_details_requested: usize,
    pub order_details_resolved: usize,
    pub workbook: PathBuf,
    pub summary_text: PathBuf,
    pub html_preview: Option<PathBuf>,
    pub email: EmailStatus,
    pub duration_ms: u64,
}

/// Fetches, reconciles, writes and mails one day's report.
pub struct ReportPipeline {
    gateway: Arc<dyn SalesDataGateway>,
    mailer: Option<Arc<dyn ReportMailer>>,
    report: ReportConfig,
    email: EmailConfig,
}

impl ReportPipeline {
    pub fn new(gateway: Arc<dyn SalesDataGateway>, report: ReportConfig, email: EmailConfig) -> Self {
        Self {
            gateway,
            mailer: None,
            report,
            email,
        }
    }

    /// Uses `mailer` instead of an SMTP transport built from the email settings.
    pub fn with_mailer(mut self, mailer: Arc<dyn ReportMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Pipeline wired to the live sales platform. Fails when API credentials are missing
    /// or unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, ReportError> {
        config.api.validate()?;
        let gateway = SolutechClient::new(&config.api)?;
        Ok(Self::new(
            Arc::new(gateway),
            config.report.clone(),
            config.email.clone(),
        ))
    }

    pub fn run(&self, dates: &ReportDates) -> Result<ReportOutcome, ReportError> {
        let started = Instant::now();
        info!(date = %dates.display_date, "generating report");

        let orders_raw = self.gateway.fetch_orders(&dates.order_date)?;
        info!(orders = orders_raw.len(), "fetched orders");
        let visits_raw = self.gateway.fetch_visits(&dates.date_range)?;
        info!(visits = visits_raw.len(), "fetched visits");

        let report = SalesReport::build(&visits_raw, &orders_raw);
        let coverage = report.reconciliation.coverage.clone();
        if !coverage.is_exact() {
            warn!(
                double_counted = coverage.double_counted.len(),
                unaccounted = coverage.unaccounted.len(),
                repeated = coverage.repeated.len(),
                "orders are not counted exactly once between visits and calls"
            );
        }
        info!(
            salespersons = report.reps.len(),
            unified = report.reconciliation.unified.len(),
            called = report.reconciliation.called_only.len(),
            "reconciled visits against orders"
        );

        let requested = report.order_ids().collect::<BTreeSet<_>>().len();
        let lines = resolve_order_lines(
            self.gateway.as_ref(),
            report.order_ids(),
            self.report.detail_fetch_workers,
        );
        info!(requested, resolved = lines.len(), "resolved order lines");

        let workbook_path = self.report.output_file.clone();
        remove_stale(&workbook_path)?;
        write_workbook(
            &workbook_path,
            &self.report.summary_sheet,
            &report,
            &lines,
            &self.report.currency,
        )?;
        info!(path = %workbook_path.display(), "workbook saved");

        let summary_path = self.report.summary_text_file.clone();
        write_file(&summary_path, &render_summary_table(&report.summaries))?;

        let totals = report.totals();
        let html = render_html(&EmailContent {
            date: &dates.display_date,
            recipient_name: &self.email.recipient_name,
            sender_name: &self.email.sender_name,
            currency: &self.report.currency,
            summaries: &report.summaries,
            totals: &totals,
        });

        let html_preview = match &self.report.html_preview_file {
            Some(path) => {
                write_file(path, &html)?;
                info!(path = %path.display(), "html preview saved");
                Some(path.clone())
            }
            None => None,
        };

        let email = self.deliver(ReportEmail {
            subject: self.email.subject_for(&dates.display_date),
            html_body: html,
            attachments: vec![workbook_path.clone()],
        });

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(duration_ms, "report generation complete");

        Ok(ReportOutcome {
            dates: dates.clone(),
            visits: report.visits.len(),
            orders: report.orders.len(),
            salespersons: report.reps.len(),
            totals,
            coverage,
            order_details_requested: requested,
            order_details_resolved: lines.len(),
            workbook: workbook_path,
            summary_text: summary_path,
            html_preview,
            email,
            duration_ms,
        })
    }

    /// Sends the report email. Delivery problems are logged and reported, never raised.
    fn deliver(&self, email: ReportEmail) -> EmailStatus {
        if !self.email.enabled {
            info!("email sending disabled");
            return EmailStatus::Disabled;
        }

        let result = match &self.mailer {
            Some(mailer) => mailer.send(&email),
            None => SmtpMailer::new(self.email.clone()).and_then(|mailer| mailer.send(&email)),
        };

        match result {
            Ok(()) => EmailStatus::Sent {
                recipients: self.email.to.len() + self.email.cc.len() + self.email.bcc.len(),
            },
            Err(err) => {
                warn!(error = %err, "email sending failed, but the report was generated");
                EmailStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn remove_stale(path: &Path) -> Result<(), ReportError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed previous report");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ReportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
