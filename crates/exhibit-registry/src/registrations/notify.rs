use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Appointments, ExhibitEntry, Federation, Participant};
use super::printout::{
    appointments_fields, escape_html, exhibit_fields, participant_fields, participation_fields,
    render_sections_html, Section,
};
use super::store::{RecordStore, StoreError};
use crate::config::{ExhibitionConfig, MailConfig};

pub const EXHIBIT_NOTICE_TITLE: &str = "Exhibit Registration";
pub const APPOINTMENTS_NOTICE_TITLE: &str = "Commissioner/Juror Registration";

/// Message handed to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub text_body: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub html_body: String,
}

/// Delivery seam; implementations report failures synchronously.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Error raised while resolving recipients or delivering a notice.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which link of the lookup chain produced the exhibit notice recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientSource {
    RegisteredCommissioner,
    FederationCommissioner,
    FederationEmailList,
    GlobalFallback,
}

/// Transport that keeps every message in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryOutbox {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryOutbox {
    pub fn messages(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl MailTransport for MemoryOutbox {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MailError::Transport("outbox mutex poisoned".to_string()))?;
        sent.push(mail.clone());
        Ok(())
    }
}

/// Composes and sends notices when appointments or exhibits are submitted.
pub struct NotificationDispatcher<S, M> {
    store: Arc<S>,
    transport: Arc<M>,
    exhibition: ExhibitionConfig,
    mail: MailConfig,
}

impl<S, M> NotificationDispatcher<S, M>
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(
        store: Arc<S>,
        transport: Arc<M>,
        exhibition: ExhibitionConfig,
        mail: MailConfig,
    ) -> Self {
        Self {
            store,
            transport,
            exhibition,
            mail,
        }
    }

    /// Walks the commissioner lookup chain for the exhibitor's country.
    pub fn exhibit_recipients(
        &self,
        participant: &Participant,
    ) -> Result<Option<(Vec<String>, RecipientSource)>, StoreError> {
        let country = &participant.details.country;

        if let Some((_, commissioner)) = self.store.commissioner_for_country(country)? {
            return Ok(Some((
                vec![commissioner.details.email],
                RecipientSource::RegisteredCommissioner,
            )));
        }
        debug!(%country, "no registered commissioner, trying federation contacts");

        if let Some(federation) = self.store.federation_by_country(country)? {
            if let Some(address) = federation
                .details
                .commissioner_email
                .as_ref()
                .filter(|address| !address.trim().is_empty())
            {
                return Ok(Some((
                    vec![address.trim().to_string()],
                    RecipientSource::FederationCommissioner,
                )));
            }
            let list = federation.details.email_list();
            if !list.is_empty() {
                return Ok(Some((list, RecipientSource::FederationEmailList)));
            }
        }

        match &self.mail.no_commissioner_email {
            Some(address) => {
                debug!(%country, "falling back to the global commissioner address");
                Ok(Some((vec![address.clone()], RecipientSource::GlobalFallback)))
            }
            None => Ok(None),
        }
    }

    /// Applies the configured additional recipients to a resolved list.
    pub fn final_recipients(&self, resolved: Vec<String>) -> Vec<String> {
        let mut recipients = if self.mail.only_additional_recipients {
            Vec::new()
        } else {
            resolved
        };
        recipients.extend(self.mail.additional_recipients.iter().cloned());
        recipients
    }

    pub fn notify_exhibit(
        &self,
        participant: &Participant,
        entry: &ExhibitEntry,
    ) -> Result<Option<OutgoingMail>, DispatchError> {
        let Some((resolved, source)) = self.exhibit_recipients(participant)? else {
            debug!(participant = %participant.id, "no commissioner contact resolved, skipping notice");
            return Ok(None);
        };

        let subsections = entry
            .participations
            .iter()
            .enumerate()
            .map(|(index, participation)| {
                Section::new(
                    format!("Previous participation #{}", index + 1),
                    participation_fields(&participation.details),
                )
            })
            .collect();
        let sections = vec![
            Section::new(
                "Personal",
                participant_fields(&participant.details, &self.exhibition.native_language),
            ),
            Section::new("Entry", exhibit_fields(&entry.exhibit.details))
                .with_subsections(subsections),
        ];

        let contact = self
            .exhibition
            .general_commissioner_email
            .as_deref()
            .map(|address| format!("email the General Commissioner at {}.", mailto(address)))
            .unwrap_or_else(|| format!("email us at {}.", mailto(&self.exhibition.email)));
        let message = format!(
            "Dear Commissioner,<br />This is the entry form data we received from the prospective exhibitor of your country.<br />(a) In case there are errors, please get in contact with the exhibitor and advise him/her to correct the errors and re-submit.<br />(b) If, however, you disapprove of the application, please {contact}"
        );

        let sent = self.deliver(EXHIBIT_NOTICE_TITLE, &message, &sections, resolved)?;
        if let Some(mail) = &sent {
            info!(
                exhibit = %entry.exhibit.id,
                ?source,
                recipients = mail.recipients.len(),
                "exhibit notice sent"
            );
        }
        Ok(sent)
    }

    /// Notifies the chosen federation, when it lists an address.
    pub fn notify_appointments(
        &self,
        participant: &Participant,
        appointments: &Appointments,
        federation: &Federation,
    ) -> Result<Option<OutgoingMail>, DispatchError> {
        let resolved = federation.details.email_list();
        if resolved.is_empty() {
            debug!(federation = %federation.id, "federation has no address, skipping notice");
            return Ok(None);
        }

        let sections = vec![
            Section::new(
                "Personal",
                participant_fields(&participant.details, &self.exhibition.native_language),
            ),
            Section::new(
                "Appointments",
                appointments_fields(&appointments.details, Some(federation)),
            ),
        ];
        let message = format!(
            "Dear Mr President of the Federation,<br />This is the registration data we received from the appointed Commissioner or proposed Juror from your Federation. Please email us at {} in case you find it inappropriate.",
            mailto(&self.exhibition.email)
        );

        let sent = self.deliver(APPOINTMENTS_NOTICE_TITLE, &message, &sections, resolved)?;
        if let Some(mail) = &sent {
            info!(
                federation = %federation.id,
                recipients = mail.recipients.len(),
                "appointments notice sent"
            );
        }
        Ok(sent)
    }

    fn deliver(
        &self,
        title: &str,
        message: &str,
        sections: &[Section],
        resolved: Vec<String>,
    ) -> Result<Option<OutgoingMail>, DispatchError> {
        let recipients = self.final_recipients(resolved);
        if recipients.is_empty() {
            return Ok(None);
        }
        let mail = OutgoingMail {
            subject: format!("{} - {}", self.exhibition.name, title),
            text_body: format!("{title} (in HTML format)"),
            sender: self.mail.sender.clone(),
            recipients,
            html_body: render_sections_html(title, Some(message), sections),
        };
        if let Err(err) = self.transport.send(&mail) {
            warn!(error = %err, subject = %mail.subject, "notice delivery failed");
            return Err(err.into());
        }
        Ok(Some(mail))
    }
}

fn mailto(address: &str) -> String {
    let address = escape_html(address);
    format!("<a href=\"mailto:{address}\">{address}</a>")
}
