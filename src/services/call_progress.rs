//! Call-progress detection service
//!
//! Host-integration layer around the tone detection engine: a registry of
//! concurrent detection sessions keyed by UUID, with verdicts surfaced both
//! as `feed` return values and as an event stream. The engine itself is
//! single-threaded per session; the registry only provides per-entry
//! exclusive access, callers must still deliver any one session's frames in
//! order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::detector::{AudioFrame, FeedOutcome, ToneDetector, Verdict};
use crate::{Error, Result};

/// Detection lifecycle events
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    SessionAttached {
        session_id: Uuid,
    },
    VerdictReached {
        session_id: Uuid,
        verdict: Verdict,
        hangup: bool,
    },
    SessionDetached {
        session_id: Uuid,
        verdict: Verdict,
    },
}

/// Session registry and event fan-out for call-progress detection.
pub struct CallProgressService {
    config: DetectorConfig,
    sessions: Arc<DashMap<Uuid, ToneDetector>>,
    event_tx: mpsc::UnboundedSender<ProgressEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<ProgressEvent>>,
}

impl CallProgressService {
    pub fn new(config: DetectorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            config,
            sessions: Arc::new(DashMap::new()),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<ProgressEvent>> {
        self.event_rx.take()
    }

    /// Attach a new detection session using the service configuration.
    pub fn attach(&self) -> Result<Uuid> {
        self.attach_with_config(&self.config)
    }

    /// Attach a new detection session with per-session overrides. The
    /// configuration is validated here, before any frame is accepted.
    pub fn attach_with_config(&self, config: &DetectorConfig) -> Result<Uuid> {
        if self.sessions.len() >= self.config.general.max_sessions as usize {
            return Err(Error::session(format!(
                "Session limit reached ({})",
                self.config.general.max_sessions
            )));
        }

        let detector = ToneDetector::new(config)?;
        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, detector);

        info!(%session_id, "call progress detection attached");
        let _ = self.event_tx.send(ProgressEvent::SessionAttached { session_id });

        Ok(session_id)
    }

    /// Feed one frame to a session. An unknown, detached or already
    /// terminal session yields `Closed` rather than an error, so a frame
    /// racing host teardown is harmless.
    pub fn feed(&self, session_id: Uuid, frame: &AudioFrame) -> Result<FeedOutcome> {
        let Some(mut detector) = self.sessions.get_mut(&session_id) else {
            debug!(%session_id, "frame for unknown session ignored");
            return Ok(FeedOutcome::Closed);
        };

        let outcome = detector.feed(frame);

        if let FeedOutcome::Detected { verdict, hangup } = outcome {
            info!(%session_id, %verdict, hangup, "verdict reached");
            let _ = self.event_tx.send(ProgressEvent::VerdictReached {
                session_id,
                verdict,
                hangup,
            });
        }

        Ok(outcome)
    }

    /// Current best-known verdict for a session, if it exists.
    pub fn verdict(&self, session_id: Uuid) -> Option<Verdict> {
        self.sessions.get(&session_id).map(|s| s.verdict())
    }

    /// Whether a session exists and is still consuming frames.
    pub fn is_active(&self, session_id: Uuid) -> bool {
        self.sessions
            .get(&session_id)
            .map(|s| s.is_active())
            .unwrap_or(false)
    }

    /// Cooperatively stop a session without detaching it; subsequent
    /// frames become no-ops.
    pub fn cancel(&self, session_id: Uuid) {
        if let Some(mut detector) = self.sessions.get_mut(&session_id) {
            detector.cancel();
        } else {
            warn!(%session_id, "cancel for unknown session");
        }
    }

    /// Remove a session, reporting its final verdict.
    pub fn detach(&self, session_id: Uuid) -> Result<()> {
        let Some((_, detector)) = self.sessions.remove(&session_id) else {
            return Err(Error::session("No such detection session"));
        };

        let verdict = detector.verdict();
        info!(%session_id, %verdict, "call progress detection detached");
        let _ = self.event_tx.send(ProgressEvent::SessionDetached {
            session_id,
            verdict,
        });
        Ok(())
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}
