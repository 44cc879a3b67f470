use super::text::{format_amount, format_count, SUMMARY_HEADERS};
use crate::config::{ConfigError, EmailConfig};
use crate::workflows::sales::domain::SalespersonSummary;
use crate::workflows::sales::summary::ReportTotals;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const FONT_STACK: &str = "-apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif";

/// Inputs for the HTML body.
#[derive(Debug, Clone, Copy)]
pub struct EmailContent<'a> {
    pub date: &'a str,
    pub recipient_name: &'a str,
    pub sender_name: &'a str,
    pub currency: &'a str,
    pub summaries: &'a [SalespersonSummary],
    pub totals: &'a ReportTotals,
}

/// A rendered report email, ready for a [`ReportMailer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEmail {
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),
    #[error("unable to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

pub trait ReportMailer: Send + Sync {
    fn send(&self, email: &ReportEmail) -> Result<(), MailError>;
}

/// Delivers report emails over SMTP with STARTTLS and login credentials.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Result<Self, MailError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn build_message(&self, email: &ReportEmail) -> Result<Message, MailError> {
        let sender: Address = self.config.sender_email.as_deref().unwrap_or_default().parse()?;
        let mut builder = Message::builder()
            .from(Mailbox::new(Some(self.config.sender_name.clone()), sender))
            .subject(email.subject.as_str());

        for recipient in &self.config.to {
            builder = builder.to(recipient.parse()?);
        }
        for recipient in &self.config.cc {
            builder = builder.cc(recipient.parse()?);
        }
        for recipient in &self.config.bcc {
            builder = builder.bcc(recipient.parse()?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(email.html_body.clone()));
        for path in &email.attachments {
            body = body.singlepart(attachment(path)?);
        }

        Ok(builder.multipart(body)?)
    }
}

impl ReportMailer for SmtpMailer {
    fn send(&self, email: &ReportEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;
        let server = self.config.smtp_server.as_deref().unwrap_or_default();
        let credentials = Credentials::new(
            self.config.sender_email.clone().unwrap_or_default(),
            self.config
                .password
                .as_ref()
                .map(|secret| secret.expose().to_string())
                .unwrap_or_default(),
        );

        info!(server, port = self.config.smtp_port, "connecting to smtp relay");
        let transport = SmtpTransport::starttls_relay(server)?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build();

        transport.send(&message)?;
        info!(
            to = self.config.to.len(),
            cc = self.config.cc.len(),
            bcc = self.config.bcc.len(),
            "report email sent"
        );
        Ok(())
    }
}

fn attachment(path: &Path) -> Result<SinglePart, MailError> {
    let bytes = std::fs::read(path).map_err(|source| MailError::Attachment {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.xlsx".to_string());
    let content_type = if path.extension().is_some_and(|ext| ext == "xlsx") {
        ContentType::parse(XLSX_MIME)?
    } else {
        ContentType::parse("application/octet-stream")?
    };
    Ok(Attachment::new(filename).body(bytes, content_type))
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn metric_card(title: &str, value: &str, subtitle: &str, color: &str) -> String {
    format!(
        r#"<div style="display:inline-block;background:#ffffff;border-left:4px solid {color};padding:16px 20px;margin:10px 10px 10px 0;border-radius:6px;box-shadow:0 2px 4px rgba(0,0,0,0.08);min-width:180px;">
<div style="font-size:12px;opacity:0.7;font-weight:600;text-transform:uppercase;letter-spacing:0.5px;margin-bottom:8px;">{title}</div>
<div style="font-size:28px;font-weight:bold;color:{color};margin-bottom:4px;">{value}</div>
<div style="font-size:11px;opacity:0.6;">{subtitle}</div>
</div>"#,
        title = escape_html(title),
        value = escape_html(value),
        subtitle = escape_html(subtitle),
    )
}

fn metrics_section(totals: &ReportTotals, currency: &str) -> String {
    let cards = [
        metric_card(
            "Total Customers",
            &format_count(totals.total_customers()),
            &format!(
                "{} visited, {} called",
                totals.customers_visited, totals.customers_called
            ),
            "#4F81BD",
        ),
        metric_card(
            "Total Revenue",
            &format!("{} {currency}", format_amount(totals.total_revenue())),
            &format!("From {} salespersons", totals.salespersons),
            "#28a745",
        ),
        metric_card(
            "Avg. Customers/Rep",
            &format!("{:.1}", totals.customers_per_rep()),
            "Per salesperson",
            "#ff6b6b",
        ),
        metric_card(
            "Avg. Order Value",
            &format!("{} {currency}", format_amount(totals.value_per_customer())),
            "Per customer",
            "#ffa500",
        ),
    ];
    format!(r#"<div class="metrics-grid">{}</div>"#, cards.concat())
}

/// Summary table with alternating row shading; amounts right aligned.
pub fn summary_table_html(rows: &[SalespersonSummary]) -> String {
    if rows.is_empty() {
        return "<p style=\"font-style:italic;opacity:0.7;\">No data available</p>".to_string();
    }

    let header_style = format!(
        "background:#4F81BD;color:#ffffff;font-weight:bold;padding:14px 12px;\
         text-align:left;border:1px solid #2F5F8D;font-family:{FONT_STACK};font-size:13px;\
         text-transform:uppercase;"
    );
    let cell_style =
        format!("padding:12px;border:1px solid #e0e0e0;font-family:{FONT_STACK};font-size:13px;");

    let mut html = String::from(
        "<table style=\"border-collapse:collapse;width:100%;margin:25px 0;\"><thead><tr>",
    );
    for header in SUMMARY_HEADERS {
        let _ = write!(html, "<th style=\"{header_style}\">{header}</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for (index, row) in rows.iter().enumerate() {
        let shade = if index % 2 == 1 { "background-color:#f8f9fa;" } else { "" };
        let cells = [
            (escape_html(&row.rep), "left"),
            (format_count(row.customers_visited), "right"),
            (format_amount(row.order_value_from_visits), "right"),
            (format_count(row.customers_called), "right"),
            (format_amount(row.order_value_from_calls), "right"),
        ];
        let _ = write!(html, "<tr style=\"{shade}\">");
        for (value, align) in cells {
            let _ = write!(
                html,
                "<td style=\"{cell_style}text-align:{align};\">{value}</td>"
            );
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

pub fn render_html(content: &EmailContent<'_>) -> String {
    let date = escape_html(content.date);
    let recipient = escape_html(content.recipient_name);
    let sender = escape_html(content.sender_name);
    let metrics = metrics_section(content.totals, content.currency);
    let table = summary_table_html(content.summaries);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<style>
body {{ font-family: {FONT_STACK}; background: #f4f6f9; color: #333333; margin: 0; padding: 20px; }}
.container {{ max-width: 900px; margin: 0 auto; background: #ffffff; border-radius: 8px; overflow: hidden; }}
.header {{ background: #2F5F8D; color: #ffffff; padding: 30px; }}
.content {{ padding: 30px; }}
.section {{ margin-bottom: 30px; }}
.section-title {{ font-size: 18px; font-weight: bold; color: #2F5F8D; margin-bottom: 10px; }}
.info-box {{ background: #eef4fb; border-left: 4px solid #4F81BD; padding: 14px 18px; }}
.footer {{ padding: 20px 30px; background: #f8f9fa; font-size: 13px; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>CSFA Daily Report</h1>
<p>{date} | Customer Sales &amp; Field Activity</p>
</div>
<div class="content">
<div class="section">
<p>Dear {recipient},</p>
<p>Please find the daily Customer Sales and Field Activity (CSFA) report for <strong>{date}</strong>.</p>
</div>
<div class="section">
<div class="section-title">Key Performance Indicators</div>
{metrics}
</div>
<div class="section">
<div class="section-title">Detailed Performance by Salesperson</div>
{table}
</div>
<div class="info-box"><strong>Attachment:</strong> The complete detailed Excel report is attached.</div>
</div>
<div class="footer">
<p>Kind regards,<br><strong>{sender}</strong></p>
<p>This is an automated report. Please do not reply to this email.</p>
</div>
</div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn summaries() -> Vec<SalespersonSummary> {
        vec![
            SalespersonSummary {
                rep: "Ana <North>".into(),
                customers_visited: 3,
                order_value_from_visits: 1500.0,
                customers_called: 1,
                order_value_from_calls: 500.0,
            },
            SalespersonSummary {
                rep: "Bo".into(),
                customers_visited: 0,
                order_value_from_visits: 0.0,
                customers_called: 0,
                order_value_from_calls: 0.0,
            },
        ]
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_server: Some("smtp.example.test".into()),
            smtp_port: 587,
            sender_email: Some("reports@example.test".into()),
            password: Some(Secret::new("app-password")),
            to: vec!["sales@example.test".into()],
            cc: vec!["lead@example.test".into()],
            bcc: Vec::new(),
            subject_template: "CSFA Report - {date}".into(),
            sender_name: "CSFA Reports".into(),
            recipient_name: "Team".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn html_escapes_names_and_shows_kpis() {
        let rows = summaries();
        let totals = ReportTotals::from_summaries(&rows);
        let html = render_html(&EmailContent {
            date: "2026-01-05",
            recipient_name: "Team & Co",
            sender_name: "CSFA Reports",
            currency: "MZN",
            summaries: &rows,
            totals: &totals,
        });

        assert!(html.contains("Ana &lt;North&gt;"));
        assert!(!html.contains("Ana <North>"));
        assert!(html.contains("Dear Team &amp; Co,"));
        assert!(html.contains("2,000.00 MZN"));
        assert!(html.contains(">2.0<"));
        assert!(html.contains("500.00 MZN"));
        assert!(html.contains("4 visited, 1 called"));
        assert!(html.contains("1,500.00"));
    }

    #[test]
    fn empty_summary_renders_placeholder_and_zero_kpis() {
        let totals = ReportTotals::default();
        let html = render_html(&EmailContent {
            date: "2026-01-05",
            recipient_name: "Team",
            sender_name: "CSFA Reports",
            currency: "MZN",
            summaries: &[],
            totals: &totals,
        });
        assert!(html.contains("No data available"));
        assert!(html.contains("0.00 MZN"));
    }

    #[test]
    fn mailer_requires_complete_config() {
        let mut config = email_config();
        config.to.clear();
        config.password = None;
        match SmtpMailer::new(config) {
            Err(MailError::Config(ConfigError::MissingVariables(keys))) => {
                assert_eq!(keys, vec!["EMAIL_PASSWORD", "EMAIL_TO"]);
            }
            other => panic!("expected missing variables, got {other:?}"),
        }
    }

    #[test]
    fn message_carries_recipients_and_attachment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Daily_CSFA_Report.xlsx");
        std::fs::write(&path, b"PK fake workbook").expect("write attachment");

        let mailer = SmtpMailer::new(email_config()).expect("mailer");
        let message = mailer
            .build_message(&ReportEmail {
                subject: "CSFA Report - 2026-01-05".into(),
                html_body: "<p>hello</p>".into(),
                attachments: vec![path],
            })
            .expect("message");

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("To: sales@example.test"));
        assert!(raw.contains("Cc: lead@example.test"));
        assert!(raw.contains("Subject: CSFA Report - 2026-01-05"));
        assert!(raw.contains("Daily_CSFA_Report.xlsx"));
    }

    #[test]
    fn missing_attachment_is_reported() {
        let mailer = SmtpMailer::new(email_config()).expect("mailer");
        let result = mailer.build_message(&ReportEmail {
            subject: "s".into(),
            html_body: String::new(),
            attachments: vec![PathBuf::from("/nonexistent/report.xlsx")],
        });
        assert!(matches!(result, Err(MailError::Attachment { .. })));
    }
}
