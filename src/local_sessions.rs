use crate::{
    backend::SessionDirectory,
    error::SessionsFileError,
    types::{Session, SessionMode, SessionType},
};
use std::{
    fs,
    path::Path,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct LocalSessions {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl LocalSessions {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    /// Loads sessions from a JSON array as exported by the session catalogue.
    pub fn from_file(path: &Path) -> Result<Self, SessionsFileError> {
        let contents = fs::read_to_string(path)?;
        let sessions: Vec<Session> = serde_json::from_str(&contents)?;
        Ok(Self::new(sessions))
    }

    pub fn example() -> Self {
        let session = |name: &str, active, session_type, session_mode| Session {
            id: Uuid::new_v4(),
            name: name.into(),
            active,
            session_type,
            session_mode,
        };
        Self::new(vec![
            session("Yoga Basics", true, SessionType::Group, SessionMode::Online),
            session("1:1 Coaching", true, SessionType::Individual, SessionMode::Offline),
            session("Evening Pilates", true, SessionType::Group, SessionMode::Offline),
            session("Career Mentoring", true, SessionType::Individual, SessionMode::Online),
            session("Retired Workshop", false, SessionType::Group, SessionMode::Online),
        ])
    }

    pub fn all(&self) -> Vec<Session> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionDirectory for LocalSessions {
    fn find(&self, id: Uuid) -> Option<Session> {
        self.read().iter().find(|session| session.id == id).cloned()
    }

    fn active(&self) -> Vec<Session> {
        self.read()
            .iter()
            .filter(|session| session.active)
            .cloned()
            .collect()
    }

    fn search_active(&self, term: &str, limit: usize) -> Vec<Session> {
        let term = term.to_lowercase();
        self.read()
            .iter()
            .filter(|session| session.active && session.name.to_lowercase().contains(&term))
            .take(limit)
            .cloned()
            .collect()
    }
}
