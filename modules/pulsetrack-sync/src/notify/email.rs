use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::backend::{ReportBackend, RunReport};

const CSV_ATTACHMENT_NAME: &str = "failures.csv";

/// SMTP email delivery: HTML body, optional CSV attachment, threading via
/// Message-ID / In-Reply-To / References.
pub struct EmailReporter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl EmailReporter {
    pub fn new(
        smtp_host: &str,
        sender: &str,
        password: &str,
        recipient: &str,
    ) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();
        Ok(Self {
            transport,
            sender: sender.parse()?,
            recipient: recipient.parse()?,
        })
    }
}

#[async_trait]
impl ReportBackend for EmailReporter {
    async fn send(&self, report: &RunReport) -> anyhow::Result<Option<String>> {
        let message_id = format!("<{}@pulsetrack>", uuid::Uuid::new_v4());

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(report.subject.clone())
            .message_id(Some(message_id.clone()));
        if let Some(ref parent) = report.parent_id {
            builder = builder
                .in_reply_to(parent.clone())
                .references(parent.clone());
        }

        let mut body = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(report.html_body.clone()),
        );
        if let Some(ref csv) = report.csv {
            body = body.singlepart(
                Attachment::new(CSV_ATTACHMENT_NAME.to_string())
                    .body(csv.clone().into_bytes(), ContentType::parse("text/csv")?),
            );
        }

        let email = builder.multipart(body)?;
        self.transport.send(email).await?;
        info!(
            subject = report.subject.as_str(),
            threaded = report.parent_id.is_some(),
            "Report email sent"
        );
        Ok(Some(message_id))
    }
}
