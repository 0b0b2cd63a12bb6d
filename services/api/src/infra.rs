use chrono::Utc;
use exhibit_registry::config::MailConfig;
use exhibit_registry::registrations::notify::MailError;
use exhibit_registry::registrations::{MailTransport, OutgoingMail};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Records each notice in the service log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogMailTransport;

impl MailTransport for LogMailTransport {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(
            subject = %mail.subject,
            sender = %mail.sender,
            recipients = ?mail.recipients,
            "notice accepted by log transport"
        );
        Ok(())
    }
}

/// Drops one JSON file per notice into a directory picked up by a relay.
#[derive(Debug)]
pub(crate) struct SpoolMailTransport {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl SpoolMailTransport {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            sequence: AtomicU64::new(0),
        }
    }

    fn next_path(&self) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%d%H%M%S%6f");
        self.dir.join(format!("{stamp}-{sequence:04}.json"))
    }
}

impl MailTransport for SpoolMailTransport {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| MailError::Transport(format!("spool directory unavailable: {err}")))?;
        let payload = serde_json::to_vec_pretty(mail)
            .map_err(|err| MailError::Transport(format!("notice encoding failed: {err}")))?;
        let path = self.next_path();
        std::fs::write(&path, payload)
            .map_err(|err| MailError::Transport(format!("spool write failed: {err}")))?;
        info!(path = %path.display(), recipients = mail.recipients.len(), "notice spooled");
        Ok(())
    }
}

/// Transport chosen from the mail configuration at startup.
#[derive(Debug)]
pub(crate) enum Mailer {
    Log(LogMailTransport),
    Spool(SpoolMailTransport),
}

impl Mailer {
    pub(crate) fn from_config(mail: &MailConfig) -> Self {
        match &mail.spool_dir {
            Some(dir) => Mailer::Spool(SpoolMailTransport::new(dir.clone())),
            None => Mailer::Log(LogMailTransport),
        }
    }
}

impl MailTransport for Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        match self {
            Mailer::Log(transport) => transport.send(mail),
            Mailer::Spool(transport) => transport.send(mail),
        }
    }
}
