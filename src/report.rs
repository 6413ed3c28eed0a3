use std::slice;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::{Config, ReportConfig};
use crate::core::GenericResult;
use crate::csv;
use crate::error::ReportResult;
use crate::mail::{MailSender, SmtpMailer};
use crate::message::{self, Attachment, Message, MessageHeader, TextPart};
use crate::metrics::{MetricQuery, MetricsSource, VictoriaMetrics};
use crate::stat::Stat;
use crate::types::{self, ReportWindow, TIMESTAMP_FORMAT};

pub const FINISHED: &str = "Finished";

#[tokio::main(flavor = "current_thread")]
pub async fn generate(config: &Config) -> GenericResult<&'static str> {
    let metrics = VictoriaMetrics::new(&config.metrics_url)?;
    let mailer = SmtpMailer::new(&config.smtp_host, config.smtp_port)?;
    Ok(run(&config.report, &metrics, &mailer, Utc::now()).await?)
}

/// Queries the last day of the healthcheck metric and mails it as a CSV attachment. Any failure aborts the run.
pub async fn run<M, S>(config: &ReportConfig, metrics: &M, mailer: &S, now: DateTime<Utc>) -> ReportResult<&'static str>
    where M: MetricsSource, S: MailSender
{
    let target = &config.metric_dimension;
    let window = ReportWindow::last_day(now);
    info!("Generating {target} healthcheck report for {window}...");

    let points = metrics.query(&MetricQuery {
        name: &config.metric_name,
        namespace: &config.metric_namespace,
        dimension_value: target,
        window,
    }).await?;

    let samples = types::to_samples(points, target);
    info!("Got {} samples.", samples.len());

    if let Some(stat) = Stat::new(&samples).render() {
        info!("Status codes:\n{stat}");
    }

    let table = csv::encode(&samples)?;
    let filename = window.attachment_name();

    let source = config.email_source.to_string();
    let destination = config.email_target.to_string();
    let subject = format!("Healthcheck report for {target}");
    let body = format!("Report for {target} is attached to this message\nfrom {}\nto  {}\n",
        window.start.format(TIMESTAMP_FORMAT), window.end.format(TIMESTAMP_FORMAT));

    let envelope = message::build_envelope(&Message {
        header: MessageHeader {
            from: &source,
            to: &destination,
            subject: &subject,
        },
        text: TextPart {body: &body},
        attachment: Attachment {
            filename: &filename,
            table: &table,
        },
    })?;

    debug!("Sending {filename} ({} bytes message) to {destination}...", envelope.len());
    mailer.send_raw(&config.email_source, slice::from_ref(&config.email_target), envelope.as_bytes()).await?;
    info!("The report has been sent to {destination}.");

    Ok(FINISHED)
}
