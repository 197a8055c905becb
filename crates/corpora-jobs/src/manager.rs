//! Job manager: submission, retry and push-driven live status.
//!
//! Jobs tied to one content record are shown either as a live progress
//! entry (queueing/running) or as a completed provenance entry. Push events
//! move jobs between the two. The authoritative completed entry always
//! comes from the parent content record's provenance, never from the event.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use corpora_core::{
    ContentUri, CorporaApi, Error, EventRelay, Job, JobEvent, JobProvenance, JobStatus,
    PushEvent, Result, Scholar,
};

use crate::form::JobForm;
use crate::permissions::{permitted_tasks, PermittedTask};

/// What [`JobManager::handle_event`] did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventOutcome {
    /// Unknown job: fetched and rendered.
    Fetched,
    /// The job's fetch is in flight; applied once it resolves.
    Buffered,
    /// Live progress entry updated.
    Updated,
    /// Job reached a terminal status and was moved to completed.
    Completed,
    /// Not a job shown by this manager, or already completed.
    Ignored,
}

#[derive(Default)]
struct ManagerState {
    /// Content record whose jobs are shown; `None` shows every job.
    content: Option<ContentUri>,
    /// Every job id seen, including those whose fetch is still in flight.
    registered: HashSet<String>,
    /// Events for jobs whose fetch is in flight, in arrival order.
    in_flight: HashMap<String, Vec<JobEvent>>,
    live: BTreeMap<String, Job>,
    completed: BTreeMap<String, JobProvenance>,
}

impl ManagerState {
    fn shows(&self, job: &Job) -> bool {
        self.content
            .as_ref()
            .map(|uri| &job.content_uri() == uri)
            .unwrap_or(true)
    }

    /// Apply an event to a live job. Returns the job when it just became
    /// terminal.
    fn apply(&mut self, event: &JobEvent) -> Option<Job> {
        let job = self.live.get_mut(&event.job_id)?;
        job.status = event.status;
        if event.stage.is_some() {
            job.stage = event.stage.clone();
        }
        if let Some(percent) = event.percent_complete {
            job.percent_complete = percent.min(100);
        }
        event.status.is_terminal().then(|| job.clone())
    }
}

/// Fallback completed entry when the parent record carries no provenance
/// for the job.
fn provenance_from_job(job: &Job) -> JobProvenance {
    JobProvenance {
        job_id: job.id.clone(),
        task_name: job.task_name.clone(),
        jobsite_name: job.jobsite_name.clone(),
        scholar_name: job.scholar_name.clone(),
        status: job.status,
        parameters: job.parameters.clone(),
        report: job.report.clone(),
        submitted: job.submitted_time,
        completed: None,
    }
}

/// Tracks one corpus's jobs for the current scholar.
pub struct JobManager<A> {
    api: Arc<A>,
    corpus_id: String,
    scholar: Scholar,
    state: Mutex<ManagerState>,
}

impl<A: CorporaApi + 'static> JobManager<A> {
    pub fn new(api: Arc<A>, corpus_id: impl Into<String>, scholar: Scholar) -> Self {
        Self {
            api,
            corpus_id: corpus_id.into(),
            scholar,
            state: Mutex::new(ManagerState::default()),
        }
    }

    pub fn corpus_id(&self) -> &str {
        &self.corpus_id
    }

    /// Tasks the scholar may run against `content_type`.
    pub async fn permitted_tasks(&self, content_type: &str) -> Result<Vec<PermittedTask>> {
        let jobsites = self.api.list_jobsites().await?;
        let tasks = self.api.list_tasks().await?;
        Ok(permitted_tasks(&self.scholar, &jobsites, &tasks, content_type))
    }

    /// Initial listing for one content record. Every listed job is
    /// registered; running jobs become live entries and completed ones come
    /// from the record's provenance. Returns the number of live jobs.
    #[instrument(skip(self, content), fields(subsystem = "jobs", uri = %content))]
    pub async fn load_jobs(&self, content: &ContentUri) -> Result<usize> {
        let jobs = self.api.list_content_jobs(content).await?;
        let record = self.api.get_content(content).await?;

        let mut state = self.state.lock().await;
        state.content = Some(content.clone());
        state.live.clear();
        state.completed.clear();
        for job in jobs {
            state.registered.insert(job.id.clone());
            if job.status.is_terminal() {
                let entry = record
                    .provenance
                    .iter()
                    .find(|p| p.job_id == job.id)
                    .cloned()
                    .unwrap_or_else(|| provenance_from_job(&job));
                state.completed.insert(job.id.clone(), entry);
            } else {
                state.live.insert(job.id.clone(), job);
            }
        }
        for entry in record.provenance {
            state.registered.insert(entry.job_id.clone());
            state.completed.entry(entry.job_id.clone()).or_insert(entry);
        }
        info!(
            live = state.live.len(),
            completed = state.completed.len(),
            "Loaded jobs"
        );
        Ok(state.live.len())
    }

    /// Submit a job and show it as live.
    pub async fn submit(&self, form: &JobForm, target: &ContentUri) -> Result<Job> {
        let permitted = self.scholar.may_run(&form.task().id);
        if !permitted {
            return Err(Error::Forbidden(format!(
                "{} may not run task {}",
                self.scholar.username,
                form.task().name
            )));
        }
        let submission = form.to_submission(target)?;
        let job = self.api.submit_job(&submission).await?;
        info!(job_id = %job.id, task = %job.task_name, uri = %target, "Submitted job");

        let mut state = self.state.lock().await;
        state.registered.insert(job.id.clone());
        if state.shows(&job) {
            state.live.insert(job.id.clone(), job.clone());
        }
        Ok(job)
    }

    /// Re-run a failed job; it moves from completed back to live.
    pub async fn retry(&self, job_id: &str) -> Result<Job> {
        let job = self.api.retry_job(job_id).await?;
        info!(job_id, "Retrying job");
        let mut state = self.state.lock().await;
        state.registered.insert(job.id.clone());
        state.completed.remove(job_id);
        if state.shows(&job) {
            state.live.insert(job.id.clone(), job.clone());
        }
        Ok(job)
    }

    /// Apply one push event.
    ///
    /// An event for an unregistered job registers it immediately and fetches
    /// it; further events for that job are buffered until the fetch
    /// resolves, so racing events trigger exactly one fetch.
    #[instrument(skip(self, event), fields(subsystem = "jobs", job_id = %event.job_id, status = %event.status))]
    pub async fn handle_event(&self, event: JobEvent) -> Result<EventOutcome> {
        let fetch = {
            let mut state = self.state.lock().await;
            if let Some(buffer) = state.in_flight.get_mut(&event.job_id) {
                buffer.push(event);
                debug!("Buffered event for job being fetched");
                return Ok(EventOutcome::Buffered);
            }
            if state.registered.insert(event.job_id.clone()) {
                state.in_flight.insert(event.job_id.clone(), Vec::new());
                true
            } else {
                false
            }
        };

        if fetch {
            return self.fetch_and_apply(event).await;
        }

        let finished = {
            let mut state = self.state.lock().await;
            if !state.live.contains_key(&event.job_id) {
                return Ok(EventOutcome::Ignored);
            }
            state.apply(&event)
        };
        match finished {
            Some(job) => {
                self.finalize(&job).await?;
                Ok(EventOutcome::Completed)
            }
            None => Ok(EventOutcome::Updated),
        }
    }

    async fn fetch_and_apply(&self, event: JobEvent) -> Result<EventOutcome> {
        let result = self.api.get_job(&event.job_id).await;

        let finished = {
            let mut state = self.state.lock().await;
            let buffered = state.in_flight.remove(&event.job_id).unwrap_or_default();
            let job = match result {
                Ok(job) => job,
                Err(e) => {
                    // A later event may try again.
                    state.registered.remove(&event.job_id);
                    warn!(error = %e, dropped = buffered.len() + 1, "Job fetch failed");
                    return Err(e);
                }
            };
            if !state.shows(&job) {
                debug!("Job belongs to other content");
                return Ok(EventOutcome::Ignored);
            }
            state.live.insert(job.id.clone(), job);
            let mut finished = None;
            for pending in std::iter::once(&event).chain(buffered.iter()) {
                if let Some(job) = state.apply(pending) {
                    finished = Some(job);
                    break;
                }
            }
            finished
        };

        match finished {
            Some(job) => {
                self.finalize(&job).await?;
                Ok(EventOutcome::Completed)
            }
            None => Ok(EventOutcome::Fetched),
        }
    }

    /// Replace a terminal job's live entry with the provenance entry from
    /// its parent record.
    async fn finalize(&self, job: &Job) -> Result<()> {
        let uri = job.content_uri();
        let record = self.api.get_content(&uri).await;
        let mut state = self.state.lock().await;
        state.live.remove(&job.id);
        let entry = match record {
            Ok(record) => record
                .provenance
                .into_iter()
                .find(|p| p.job_id == job.id)
                .unwrap_or_else(|| {
                    warn!(job_id = %job.id, "No provenance recorded for finished job");
                    provenance_from_job(job)
                }),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Provenance refetch failed");
                state
                    .completed
                    .insert(job.id.clone(), provenance_from_job(job));
                return Err(e);
            }
        };
        info!(job_id = %job.id, status = %entry.status, "Job finished");
        state.completed.insert(job.id.clone(), entry);
        Ok(())
    }

    /// Process job events from `relay` on a background task until the relay
    /// is dropped.
    pub fn attach(self: &Arc<Self>, relay: &EventRelay) -> JoinHandle<()> {
        if relay.corpus_id() != self.corpus_id {
            warn!(
                relay = relay.corpus_id(),
                corpus_id = %self.corpus_id,
                "Attaching job manager to another corpus's relay"
            );
        }
        let rx = relay.subscribe();
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_events(rx).await })
    }

    async fn run_events(&self, mut rx: broadcast::Receiver<PushEvent>) {
        loop {
            match rx.recv().await {
                Ok(PushEvent::Job(event)) => {
                    if let Err(e) = self.handle_event(event).await {
                        warn!(error = %e, "Job event not applied");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Job event stream lagged, reloading jobs");
                    let content = self.state.lock().await.content.clone();
                    if let Some(content) = content {
                        if let Err(e) = self.load_jobs(&content).await {
                            warn!(error = %e, "Job reload failed");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(corpus_id = %self.corpus_id, "Event relay closed");
                    break;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Live entries, ordered by job id.
    pub async fn live_jobs(&self) -> Vec<Job> {
        self.state.lock().await.live.values().cloned().collect()
    }

    pub async fn live_job(&self, job_id: &str) -> Option<Job> {
        self.state.lock().await.live.get(job_id).cloned()
    }

    /// Completed entries, ordered by job id.
    pub async fn completed(&self) -> Vec<JobProvenance> {
        self.state.lock().await.completed.values().cloned().collect()
    }

    pub async fn is_registered(&self, job_id: &str) -> bool {
        self.state.lock().await.registered.contains(job_id)
    }

    /// Whether a completed entry is shown with the failure treatment and a
    /// retry action.
    pub async fn can_retry(&self, job_id: &str) -> bool {
        self.state
            .lock()
            .await
            .completed
            .get(job_id)
            .map(|p| p.status == JobStatus::Error)
            .unwrap_or(false)
    }
}
