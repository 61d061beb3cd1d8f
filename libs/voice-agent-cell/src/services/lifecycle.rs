// libs/voice-agent-cell/src/services/lifecycle.rs
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use call_history_cell::models::AddCallHistoryRequest;
use session_registry_cell::{ClaimOutcome, SessionRegistry};
use shared_config::{AppConfig, ClinicProfile};
use shared_models::tool::ToolResponse;
use shared_utils::time::now_ist;

use crate::models::{
    CloseReason, EndOutcome, SessionDispatch, SessionSnapshot, SessionState, TranscriptLine, VoiceAgentError,
};
use crate::services::mcp_client::McpClient;
use crate::services::outcome::apply_tool_result;
use crate::services::prompts::{render_instructions, unknown_clinic_instructions, UNKNOWN_CLINIC_GREETING};
use crate::services::session::VoiceSession;
use crate::services::summary::summarize_session;
use crate::services::tools::{describe_call, prepare_arguments, today_date, AgentTool};

const CALL_STATUS_COMPLETED: &str = "completed";

/// A session plus the gate its backend calls hold. Close takes the gate
/// exclusively, so it only summarises once every in-flight call has landed.
struct SessionEntry {
    session: Mutex<VoiceSession>,
    in_flight: RwLock<()>,
}

impl SessionEntry {
    fn new(session: VoiceSession) -> Self {
        Self { session: Mutex::new(session), in_flight: RwLock::new(()) }
    }

    async fn lock(&self) -> MutexGuard<'_, VoiceSession> {
        self.session.lock().await
    }
}

type SharedSession = Arc<SessionEntry>;

/// The running heartbeat loop.
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Stop after the beat in progress, if any, has finished.
    pub async fn stop(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            warn!("Heartbeat task ended abnormally: {}", e);
        }
    }
}

/// Owns every voice session this worker has claimed and drives each one
/// through claim, resolve, active and close.
pub struct SessionManager {
    worker_id: String,
    lease: Duration,
    clinic: ClinicProfile,
    registry: Arc<dyn SessionRegistry>,
    mcp: McpClient,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionManager {
    pub fn new(config: &AppConfig, registry: Arc<dyn SessionRegistry>) -> Self {
        Self {
            worker_id: config.worker_id.clone(),
            lease: Duration::from_secs(config.session_lease_seconds),
            clinic: config.clinic.clone(),
            registry,
            mcp: McpClient::new(config),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.lease / 3
    }

    async fn session(&self, session_id: &str) -> Result<SharedSession, VoiceAgentError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| VoiceAgentError::SessionNotFound(session_id.to_string()))
    }

    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let sessions: Vec<SharedSession> = self.sessions.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(sessions.len());
        for session in sessions {
            snapshots.push(session.lock().await.snapshot());
        }
        snapshots.sort_by(|a, b| a.call.call_start.cmp(&b.call.call_start));
        snapshots
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, VoiceAgentError> {
        let session = self.session(session_id).await?;
        let snapshot = session.lock().await.snapshot();
        Ok(snapshot)
    }

    // ==========================================================================
    // CLAIM + RESOLVE
    // ==========================================================================

    /// Claim the call in the registry and prepare it for conversation.
    /// A call another worker already owns is declined.
    #[instrument(skip(self), fields(worker = %self.worker_id))]
    pub async fn start_session(&self, dispatch: SessionDispatch) -> Result<SessionSnapshot, VoiceAgentError> {
        if let Ok(existing) = self.snapshot(&dispatch.session_id).await {
            info!("Session {} already running here", dispatch.session_id);
            return Ok(existing);
        }

        match self.registry.claim(&dispatch.session_id, &self.worker_id, self.lease).await? {
            ClaimOutcome::Acquired => {}
            ClaimOutcome::HeldBy(owner) => {
                info!("Session {} declined, owned by {}", dispatch.session_id, owner);
                return Err(VoiceAgentError::OwnedElsewhere { session_id: dispatch.session_id, owner });
            }
        }

        let session = match self.sessions.write().await.entry(dispatch.session_id.clone()) {
            Entry::Occupied(existing) => Err(existing.get().clone()),
            Entry::Vacant(slot) => {
                let session = VoiceSession::claimed(&dispatch, &self.worker_id, &self.clinic.called_number);
                Ok(slot.insert(Arc::new(SessionEntry::new(session))).clone())
            }
        };
        let session = match session {
            Ok(session) => session,
            Err(existing) => {
                // A concurrent dispatch of the same call got here first.
                info!("Session {} already running here", dispatch.session_id);
                return Ok(existing.lock().await.snapshot());
            }
        };

        match self.resolve(&session).await {
            Ok(snapshot) => {
                info!(
                    "Session {} {} for clinic {:?}",
                    snapshot.session_id, snapshot.state, snapshot.user_id
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!("Resolving session {} failed: {}", dispatch.session_id, e);
                self.fail(&dispatch.session_id, &session, true).await;
                Err(e)
            }
        }
    }

    /// A close arriving mid-resolution waits for it, so the call is still
    /// recorded against its clinic.
    async fn resolve(&self, entry: &SharedSession) -> Result<SessionSnapshot, VoiceAgentError> {
        let _in_flight = entry.in_flight.read().await;

        let (call_id, called_number) = {
            let mut session = entry.lock().await;
            session.transition(SessionState::Resolving)?;
            (session.call.call_id.clone(), session.call.called_number.clone())
        };

        let today = today_date();
        let user_id = self.mcp.get_user_id_by_agent_phone(&called_number, &call_id).await?;

        let (doctors, instructions) = match &user_id {
            Some(user_id) => {
                let doctors: Vec<String> = self
                    .mcp
                    .get_doctor_details(user_id, &call_id)
                    .await?
                    .into_iter()
                    .map(|d| d.name)
                    .collect();
                let instructions = render_instructions(&self.clinic, &today, &doctors);
                (doctors, instructions)
            }
            None => {
                warn!("No clinic answers on {}; call {} continues without one", called_number, call_id);
                (Vec::new(), unknown_clinic_instructions(&self.clinic, &today))
            }
        };

        let mut session = entry.lock().await;
        session.user_id = user_id;
        session.doctors = doctors;
        session.instructions = instructions;
        if session.state == SessionState::Resolving {
            session.transition(SessionState::Active)?;
        }
        Ok(session.snapshot())
    }

    // ==========================================================================
    // ACTIVE
    // ==========================================================================

    pub async fn record_transcript(&self, session_id: &str, line: TranscriptLine) -> Result<usize, VoiceAgentError> {
        let session = self.session(session_id).await?;
        let mut session = session.lock().await;
        session.ensure_active()?;
        session.transcript.push(line);
        Ok(session.transcript.len())
    }

    /// Run a tool for the model. Identity always comes from the session.
    #[instrument(skip(self, args))]
    pub async fn invoke_tool(&self, session_id: &str, tool_name: &str, args: Value) -> Result<ToolResponse, VoiceAgentError> {
        let tool: AgentTool = tool_name.parse()?;
        let args = prepare_arguments(tool, args)?;

        let session = self.session(session_id).await?;
        // Held until the result is recorded; taken before the state check so
        // a close cannot slip in between.
        let _in_flight = session.in_flight.read().await;
        let (user_id, call_id) = {
            let session = session.lock().await;
            session.ensure_active()?;
            (session.user_id, session.call.call_id.clone())
        };

        if tool.is_local() {
            return Ok(ToolResponse::text(today_date()));
        }
        if tool.needs_clinic() && user_id.is_none() {
            return Ok(ToolResponse::text(UNKNOWN_CLINIC_GREETING));
        }

        let response = self
            .mcp
            .call(tool.name(), &Value::Object(args.clone()), user_id.as_ref(), &call_id)
            .await?;

        let mut session = session.lock().await;
        if let Some(entry) = describe_call(tool, &args) {
            session.tool_log.push(entry);
        }
        session.appointment_status = apply_tool_result(session.appointment_status, tool, &response.as_text());

        Ok(response)
    }

    // ==========================================================================
    // CLOSE
    // ==========================================================================

    /// End a call. A session owned by another worker gets a close request
    /// that its owner honours on its next heartbeat.
    #[instrument(skip(self), fields(worker = %self.worker_id))]
    pub async fn end_session(&self, session_id: &str, reason: CloseReason) -> Result<EndOutcome, VoiceAgentError> {
        let local = self.sessions.write().await.remove(session_id);

        let Some(session) = local else {
            return match self.registry.owner(session_id).await? {
                Some(owner) if owner != self.worker_id => {
                    self.registry.request_close(session_id).await?;
                    info!("Close of {} forwarded to {}", session_id, owner);
                    Ok(EndOutcome::Forwarded { session_id: session_id.to_string(), owner })
                }
                _ => Err(VoiceAgentError::SessionNotFound(session_id.to_string())),
            };
        };

        let snapshot = self.close(session, reason).await?;
        Ok(EndOutcome::Closed { session: snapshot })
    }

    async fn close(&self, entry: SharedSession, reason: CloseReason) -> Result<SessionSnapshot, VoiceAgentError> {
        entry.lock().await.transition(SessionState::Closing)?;

        let _drained = entry.in_flight.write().await;
        let mut session = entry.lock().await;

        let call_end = now_ist();
        let summary = summarize_session(
            &self.mcp,
            &session.call.call_id,
            &session.tool_log,
            &session.conversation_text(),
            session.appointment_status,
        )
        .await;
        session.call_summary = Some(summary.clone());

        match session.user_id {
            Some(user_id) => {
                let duration = (call_end - session.call.call_start).to_std().unwrap_or_default();
                let record = AddCallHistoryRequest {
                    caller_number: session.call.caller_number.clone(),
                    called_number: session.call.called_number.clone(),
                    call_start: session.call.call_start.to_rfc3339(),
                    call_end: call_end.to_rfc3339(),
                    call_duration: format_duration(duration),
                    call_status: CALL_STATUS_COMPLETED.to_string(),
                    appointment_status: session.appointment_status.to_string(),
                    call_summary: summary,
                };

                // Failure to record must not keep the claim alive.
                if let Err(e) = self.mcp.add_call_history(&user_id, &session.call.call_id, &record).await {
                    error!("Call history for {} not saved: {}", session.call.call_id, e);
                }
            }
            None => warn!("Call {} had no clinic; call history skipped", session.call.call_id),
        }

        if let Err(e) = self.registry.release(&session.id, &self.worker_id).await {
            warn!("Releasing {} failed, lease will lapse: {}", session.id, e);
        }

        session.transition(SessionState::Closed)?;
        info!(
            "Session {} closed ({:?}), appointment status {}",
            session.id, reason, session.appointment_status
        );
        Ok(session.snapshot())
    }

    /// Drop a session without recording the call. Only `entry` itself is
    /// evicted; a session already being closed is left to its close.
    async fn fail(&self, session_id: &str, entry: &SharedSession, release: bool) {
        {
            let mut sessions = self.sessions.write().await;
            if sessions.get(session_id).is_some_and(|current| Arc::ptr_eq(current, entry)) {
                sessions.remove(session_id);
            }
        }

        let mut session = entry.lock().await;
        if matches!(session.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        if let Err(e) = session.transition(SessionState::Failed) {
            warn!("{}", e);
        }
        if release {
            if let Err(e) = self.registry.release(session_id, &self.worker_id).await {
                warn!("Releasing {} failed, lease will lapse: {}", session_id, e);
            }
        }
    }

    // ==========================================================================
    // LEASES
    // ==========================================================================

    /// Renew every lease once and act on close requests. A session whose
    /// lease is gone is failed without touching the registry.
    pub async fn heartbeat(&self) {
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();

        for session_id in ids {
            match self.registry.renew(&session_id, &self.worker_id, self.lease).await {
                Ok(true) => {}
                Ok(false) => {
                    error!("Lease on {} lost; failing session", session_id);
                    if let Ok(entry) = self.session(&session_id).await {
                        self.fail(&session_id, &entry, false).await;
                    }
                    continue;
                }
                Err(e) => {
                    warn!("Renewing {} failed: {}", session_id, e);
                    continue;
                }
            }

            match self.registry.close_requested(&session_id).await {
                Ok(true) => {
                    if let Err(e) = self.end_session(&session_id, CloseReason::Requested).await {
                        warn!("Requested close of {} failed: {}", session_id, e);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("Checking close request for {} failed: {}", session_id, e),
            }
        }
    }

    pub fn spawn_heartbeat(self: &Arc<Self>) -> Heartbeat {
        let manager = Arc::clone(self);
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.heartbeat_interval());
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => manager.heartbeat().await,
                }
            }
        });

        Heartbeat { stop, task }
    }

    /// Close every local session, recording each call and releasing its
    /// claim.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        if !ids.is_empty() {
            info!("Closing {} session(s) before shutdown", ids.len());
        }

        for session_id in ids {
            if let Err(e) = self.end_session(&session_id, CloseReason::Shutdown).await {
                warn!("Closing {} on shutdown failed: {}", session_id, e);
            }
        }
    }
}

/// `H:MM:SS`, matching how the call history table has always stored
/// durations.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
