use std::{error::Error, sync::Arc};

use crate::{
    backend::{SessionDirectory, SlotBackend},
    configuration::Configuration,
    configuration_handler::ConfigurationHandler,
    http::create_app,
    local_sessions::LocalSessions,
    local_slots::LocalSlots,
    resource::SlotResource,
};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod backend;
mod configuration;
mod configuration_handler;
mod error;
mod filters;
mod form;
mod http;
mod local_sessions;
mod local_slots;
mod resource;
mod table;
#[cfg(test)]
mod testutils;
mod types;

pub struct AppState<T: SlotBackend, D: SessionDirectory + 'static> {
    pub slot_backend: T,
    pub sessions: Arc<D>,
    pub resource: Arc<SlotResource>,
    pub timezone: Tz,
}

impl<T: SlotBackend, D: SessionDirectory + 'static> Clone for AppState<T, D> {
    fn clone(&self) -> Self {
        Self {
            slot_backend: self.slot_backend.clone(),
            sessions: self.sessions.clone(),
            resource: self.resource.clone(),
            timezone: self.timezone,
        }
    }
}

impl<T: SlotBackend, D: SessionDirectory + 'static> AppState<T, D> {
    /// Wall-clock time in the configured timezone.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let sessions = match configuration.sessions_file() {
        Some(path) => {
            let sessions = LocalSessions::from_file(&path)?;
            info!(path = %path.display(), "Loaded sessions");
            sessions
        }
        None if configuration.example_data() => LocalSessions::example(),
        None => LocalSessions::default(),
    };

    let backend = LocalSlots::default();
    if configuration.example_data() {
        let today = Utc::now()
            .with_timezone(&configuration.timezone())
            .date_naive();
        backend.insert_example_slots(&sessions.all(), today);
    }

    let address = format!("0.0.0.0:{}", configuration.port());
    info!("Accessible at {address}");
    let listener = tokio::net::TcpListener::bind(address).await?;

    let app = create_app(backend, Arc::new(sessions), configuration);
    axum::serve(listener, app).await?;
    Ok(())
}
