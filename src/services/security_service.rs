use std::sync::Arc;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::SecurityEvent,
        dto::request::RecordSecurityEventRequest,
    },
    repositories::{SecurityEventRepository, TestSessionRepository},
};

/// Sink for client-reported proctoring events. Events are recorded for
/// later review only; they do not feed back into session state, and a
/// storage hiccup must never interrupt a running test.
pub struct SecurityService {
    events: Arc<dyn SecurityEventRepository>,
    sessions: Arc<dyn TestSessionRepository>,
    clock: Arc<dyn Clock>,
}

impl SecurityService {
    pub fn new(
        events: Arc<dyn SecurityEventRepository>,
        sessions: Arc<dyn TestSessionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            sessions,
            clock,
        }
    }

    pub async fn record_event(
        &self,
        session_id: &str,
        request: RecordSecurityEventRequest,
    ) -> AppResult<()> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test session with id '{}' not found", session_id))
            })?;

        log::warn!(
            "Security event in test session {}: {:?} ({:?}) - {}",
            session_id,
            request.event_type,
            request.severity,
            request.description
        );

        let event = SecurityEvent::new(
            session_id,
            &session.student_id,
            request.event_type,
            request.severity,
            &request.description,
            self.clock.now(),
        );

        // Fire-and-forget: the client must not see a failure here.
        if let Err(err) = self.events.create(event).await {
            log::error!(
                "Failed to store security event for session {}: {}",
                session_id,
                err
            );
        }

        Ok(())
    }

    pub async fn events_for_session(&self, session_id: &str) -> AppResult<Vec<SecurityEvent>> {
        self.events.find_by_session(session_id).await
    }
}
