//! Report delivery
//!
//! A finished report is a delimited text blob. Disk delivery writes it
//! under a target directory; email delivery sends it as an attachment,
//! one message per recipient.

use std::path::Path;

use anyhow::Context as _;
use chrono::DateTime;
use chrono_tz::Tz;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};

use netharvest_core::datasource::SmtpConfig;
use netharvest_core::datetime::format_datetime;
use netharvest_core::job::EmailDelivery;

use crate::error::Result;

/// Expand strftime patterns in a delivery filename against the run time.
/// A pattern chrono cannot format is kept verbatim.
pub fn render_filename(pattern: &str, run_time: &DateTime<Tz>) -> String {
    format_datetime(run_time, pattern).unwrap_or_else(|| pattern.to_string())
}

/// Write the report to `directory/filename`, creating the directory if
/// absent.
pub fn write_to_disk(report: &str, directory: &Path, filename: &str) -> Result<()> {
    let target = directory.join(filename);
    tracing::info!(path = %target.display(), "writing report to disk");
    std::fs::create_dir_all(directory)
        .with_context(|| format!("creating report directory {}", directory.display()))?;
    std::fs::write(&target, report)
        .with_context(|| format!("writing report to {}", target.display()))?;
    Ok(())
}

/// Mail the report as an octet-stream attachment, one message per
/// recipient.
pub async fn send_email(
    report: &str,
    smtp: &SmtpConfig,
    delivery: &EmailDelivery,
    filename: &str,
) -> Result<()> {
    let transport = build_transport(smtp)?;
    let attachment = attachment_part(report, filename)?;

    for recipient in &delivery.recipients {
        tracing::info!(recipient = %recipient, "sending report mail");
        let message = Message::builder()
            .from(
                smtp.from
                    .parse()
                    .with_context(|| format!("invalid sender address '{}'", smtp.from))?,
            )
            .to(recipient
                .parse()
                .with_context(|| format!("invalid recipient address '{}'", recipient))?)
            .subject(delivery.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(delivery.body.clone()))
                    .singlepart(attachment.clone()),
            )
            .context("assembling report mail")?;
        transport
            .send(message)
            .await
            .with_context(|| format!("sending report mail to {}", recipient))?;
    }
    Ok(())
}

/// The report as an octet-stream attachment part.
fn attachment_part(report: &str, filename: &str) -> Result<SinglePart> {
    let content_type =
        ContentType::parse("application/octet-stream").context("building attachment content type")?;
    Ok(Attachment::new(filename.to_string()).body(report.as_bytes().to_vec(), content_type))
}

fn build_transport(smtp: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = if smtp.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .with_context(|| format!("configuring STARTTLS relay {}", smtp.host))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
    };
    builder = builder.port(smtp.port);
    if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use chrono_tz::UTC;

    #[test]
    fn test_render_filename_expands_patterns() {
        let run_time = UTC.with_ymd_and_hms(2024, 3, 10, 15, 42, 0).unwrap();
        assert_eq!(
            render_filename("voip_%Y%m%d.csv", &run_time),
            "voip_20240310.csv"
        );
        assert_eq!(render_filename("plain.csv", &run_time), "plain.csv");
    }

    #[test]
    fn test_attachment_part_builds() {
        assert!(attachment_part("a\tb\r\n1\t2", "report_20240310.csv").is_ok());
    }

    #[test]
    fn test_write_to_disk_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join("reports").join("daily");
        write_to_disk("a\tb\r\n1\t2", &target_dir, "out.csv").unwrap();
        let written = std::fs::read_to_string(target_dir.join("out.csv")).unwrap();
        assert_eq!(written, "a\tb\r\n1\t2");
    }
}
