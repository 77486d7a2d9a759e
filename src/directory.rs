use crate::models::{AppData, Horse, ScheduleOptions, TrimSession};

/// Read access to the client records a prediction needs.
pub trait ClientDirectory {
    fn trim_history(&self, client_id: &str) -> Option<&[TrimSession]>;

    fn roster(&self, client_id: &str) -> Option<&[Horse]>;

    fn schedule_options(&self) -> &ScheduleOptions;
}

impl ClientDirectory for AppData {
    fn trim_history(&self, client_id: &str) -> Option<&[TrimSession]> {
        self.clients
            .get(client_id)
            .map(|client| client.trim_history.as_slice())
    }

    fn roster(&self, client_id: &str) -> Option<&[Horse]> {
        self.clients.get(client_id).map(|client| client.horses.as_slice())
    }

    fn schedule_options(&self) -> &ScheduleOptions {
        &self.settings
    }
}
