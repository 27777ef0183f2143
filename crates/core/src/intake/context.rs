use std::sync::{Arc, Mutex};

use crate::domain::lead::LeadId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub partner_name: Option<String>,
    pub submitted_lead_id: Option<LeadId>,
}

/// Session-scoped store handed to an intake session by its host. The host keeps a clone
/// to render the partner name and the thank-you screen; dropping every clone ends it.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    inner: Arc<Mutex<SessionSnapshot>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self, partner_name: Option<&str>, lead_id: &LeadId) {
        self.update(|snapshot| {
            snapshot.partner_name = partner_name.map(str::to_owned);
            snapshot.submitted_lead_id = Some(lead_id.clone());
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match self.inner.lock() {
            Ok(snapshot) => snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn partner_name(&self) -> Option<String> {
        self.snapshot().partner_name
    }

    pub fn submitted_lead_id(&self) -> Option<LeadId> {
        self.snapshot().submitted_lead_id
    }

    fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        match self.inner.lock() {
            Ok(mut snapshot) => f(&mut snapshot),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
