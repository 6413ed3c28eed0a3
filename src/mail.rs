use lettre::address::Envelope;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use log::debug;

use crate::core::GenericResult;
use crate::error::{ReportError, ReportResult};

#[allow(async_fn_in_trait)]
pub trait MailSender {
    /// Delivers an already rendered message as is.
    async fn send_raw(&self, source: &Address, destinations: &[Address], message: &[u8]) -> ReportResult<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16) -> GenericResult<SmtpMailer> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| format!(
            "Invalid SMTP relay {host:?}: {e}"))?
            .port(port)
            .build();

        Ok(SmtpMailer {transport})
    }
}

impl MailSender for SmtpMailer {
    async fn send_raw(&self, source: &Address, destinations: &[Address], message: &[u8]) -> ReportResult<()> {
        let envelope = Envelope::new(Some(source.clone()), destinations.to_vec()).map_err(|e| ReportError::Send(
            e.to_string()))?;

        let response = self.transport.send_raw(&envelope, message).await.map_err(|e| ReportError::Send(
            e.to_string()))?;
        debug!("SMTP relay response: {}", response.code());

        Ok(())
    }
}
