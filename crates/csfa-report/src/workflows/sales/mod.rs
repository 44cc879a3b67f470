//! Daily sales activity report: visits reconciled against orders per salesperson.

pub mod activity;
pub mod details;
pub mod domain;
pub mod gateway;
pub mod normalizer;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod schedule;
pub mod summary;

pub use gateway::{GatewayError, SalesDataGateway, SolutechClient};
pub use pipeline::{EmailStatus, ReportDates, ReportError, ReportOutcome, ReportPipeline};
pub use report::email::{MailError, ReportEmail, ReportMailer, SmtpMailer};
pub use report::SalesReport;
