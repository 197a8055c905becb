//! Integration tests for the job manager against the in-memory API.

use std::sync::Arc;
use std::time::Duration;

use corpora_core::mock::MockCorporaApi;
use corpora_core::{
    ContentUri, Error, EventRelay, Job, JobEvent, JobStatus, Jobsite, Scholar, Task,
    TaskParameter,
};
use corpora_jobs::{EventOutcome, JobForm, JobManager};
use serde_json::Map;

fn job(id: &str, content_id: &str, status: JobStatus) -> Job {
    Job {
        id: id.to_string(),
        corpus_id: "42".to_string(),
        content_type: "Document".to_string(),
        content_id: content_id.to_string(),
        task_id: "ocr".to_string(),
        task_name: "OCR".to_string(),
        jobsite_name: "Local".to_string(),
        scholar_name: "ada".to_string(),
        status,
        stage: None,
        percent_complete: 0,
        parameters: Map::new(),
        report: None,
        submitted_time: None,
    }
}

fn ocr_task() -> Task {
    Task {
        id: "ocr".to_string(),
        name: "OCR".to_string(),
        content_type: "Document".to_string(),
        track_provenance: true,
        parameters: vec![TaskParameter {
            name: "lang".to_string(),
            type_tag: "text".to_string(),
            label: Some("Language".to_string()),
            required: true,
            default: None,
            choices: Vec::new(),
            content_type: None,
            note: None,
        }],
    }
}

fn api() -> MockCorporaApi {
    MockCorporaApi::new("42")
        .with_record("Document", "d1", "Letter")
        .with_record("Document", "d2", "Diary")
        .with_jobsite(Jobsite {
            id: "local".to_string(),
            name: "Local".to_string(),
            task_ids: vec!["ocr".to_string()],
        })
        .with_task(ocr_task())
}

fn admin() -> Scholar {
    Scholar {
        username: "ada".to_string(),
        is_admin: true,
        ..Scholar::default()
    }
}

fn event(job_id: &str, status: JobStatus, percent: u8) -> JobEvent {
    JobEvent {
        job_id: job_id.to_string(),
        status,
        stage: None,
        percent_complete: Some(percent),
    }
}

fn d1() -> ContentUri {
    ContentUri::new("42", "Document", "d1")
}

fn manager(api: &Arc<MockCorporaApi>) -> Arc<JobManager<MockCorporaApi>> {
    Arc::new(JobManager::new(api.clone(), "42", admin()))
}

#[tokio::test]
async fn test_load_jobs_splits_live_and_completed() {
    let api = api()
        .with_job(job("j1", "d1", JobStatus::Running))
        .with_job(job("j2", "d1", JobStatus::Running));
    api.finish_job("j2", JobStatus::Complete, "12 pages").unwrap();
    let api = Arc::new(api);
    let manager = manager(&api);

    assert_eq!(manager.load_jobs(&d1()).await.unwrap(), 1);
    assert!(manager.is_registered("j1").await);
    assert!(manager.is_registered("j2").await);

    let completed = manager.completed().await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].report.as_deref(), Some("12 pages"));
    assert!(completed[0].completed.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_racing_events_fetch_unknown_job_once() {
    let api = Arc::new(
        api()
            .with_job(job("j3", "d1", JobStatus::Queueing))
            .with_job_delay(Duration::from_secs(1)),
    );
    let manager = manager(&api);
    manager.load_jobs(&d1()).await.unwrap();
    let fetches_before = api.call_count("get_job");

    let (a, b, c) = tokio::join!(
        manager.handle_event(event("j9", JobStatus::Running, 10)),
        manager.handle_event(event("j9", JobStatus::Running, 50)),
        manager.handle_event(event("j9", JobStatus::Running, 70)),
    );
    // j9 is not on the server; only one fetch is attempted.
    assert!(matches!(a, Err(Error::NotFound(_))));
    assert_eq!(b.unwrap(), EventOutcome::Buffered);
    assert_eq!(c.unwrap(), EventOutcome::Buffered);
    assert_eq!(api.call_count("get_job"), fetches_before + 1);
    assert!(!manager.is_registered("j9").await);

    let (a, b, c) = tokio::join!(
        manager.handle_event(event("j3", JobStatus::Running, 10)),
        manager.handle_event(event("j3", JobStatus::Running, 50)),
        manager.handle_event(event("j3", JobStatus::Running, 70)),
    );
    assert_eq!(a.unwrap(), EventOutcome::Updated);
    assert_eq!(b.unwrap(), EventOutcome::Updated);
    assert_eq!(c.unwrap(), EventOutcome::Updated);
    assert_eq!(manager.live_job("j3").await.unwrap().percent_complete, 70);
    assert_eq!(api.call_count("get_job"), fetches_before + 1);
}

#[tokio::test(start_paused = true)]
async fn test_buffered_events_applied_after_fetch() {
    // j5 was submitted elsewhere; this manager has never listed it.
    let api = Arc::new(
        api()
            .with_job(job("j5", "d1", JobStatus::Queueing))
            .with_job_delay(Duration::from_secs(1)),
    );
    let manager = manager(&api);

    let (a, b, c) = tokio::join!(
        manager.handle_event(event("j5", JobStatus::Running, 20)),
        manager.handle_event(event("j5", JobStatus::Running, 40)),
        manager.handle_event(event("j5", JobStatus::Running, 60)),
    );
    assert_eq!(a.unwrap(), EventOutcome::Fetched);
    assert_eq!(b.unwrap(), EventOutcome::Buffered);
    assert_eq!(c.unwrap(), EventOutcome::Buffered);
    assert_eq!(api.call_count("get_job"), 1);

    let live = manager.live_job("j5").await.unwrap();
    assert_eq!(live.status, JobStatus::Running);
    assert_eq!(live.percent_complete, 60);
}

#[tokio::test]
async fn test_terminal_event_renders_record_provenance() {
    let api = Arc::new(api().with_job(job("j1", "d1", JobStatus::Running)));
    let manager = manager(&api);
    manager.load_jobs(&d1()).await.unwrap();

    let outcome = manager
        .handle_event(event("j1", JobStatus::Running, 40))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Updated);

    api.finish_job("j1", JobStatus::Complete, "42 pages").unwrap();
    let outcome = manager
        .handle_event(event("j1", JobStatus::Complete, 100))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Completed);
    assert!(manager.live_jobs().await.is_empty());

    let completed = manager.completed().await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].job_id, "j1");
    assert_eq!(completed[0].report.as_deref(), Some("42 pages"));
    assert!(completed[0].completed.is_some());

    // A duplicate terminal event changes nothing.
    let outcome = manager
        .handle_event(event("j1", JobStatus::Complete, 100))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Ignored);
}

#[tokio::test]
async fn test_unknown_job_already_finished() {
    let api = api().with_job(job("j6", "d1", JobStatus::Running));
    api.finish_job("j6", JobStatus::Error, "out of memory").unwrap();
    let api = Arc::new(api);
    let manager = manager(&api);

    let outcome = manager
        .handle_event(event("j6", JobStatus::Error, 100))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Completed);
    assert_eq!(api.call_count("get_job"), 1);
    assert!(manager.can_retry("j6").await);
}

#[tokio::test]
async fn test_jobs_for_other_content_ignored() {
    let api = Arc::new(api().with_job(job("j7", "d2", JobStatus::Running)));
    let manager = manager(&api);
    manager.load_jobs(&d1()).await.unwrap();

    let first = manager
        .handle_event(event("j7", JobStatus::Running, 10))
        .await
        .unwrap();
    let second = manager
        .handle_event(event("j7", JobStatus::Running, 20))
        .await
        .unwrap();
    assert_eq!(first, EventOutcome::Ignored);
    assert_eq!(second, EventOutcome::Ignored);
    assert_eq!(api.call_count("get_job"), 1);
    assert!(manager.live_jobs().await.is_empty());
}

#[tokio::test]
async fn test_submit_fail_and_retry() {
    let api = Arc::new(api());
    let manager = manager(&api);
    manager.load_jobs(&d1()).await.unwrap();

    let permitted = manager.permitted_tasks("Document").await.unwrap();
    assert_eq!(permitted.len(), 1);
    let mut form = JobForm::new(permitted[0].task.clone(), &permitted[0].jobsite_id).unwrap();
    assert!(manager.submit(&form, &d1()).await.is_err());
    form.set_value("lang", "eng").unwrap();

    let submitted = manager.submit(&form, &d1()).await.unwrap();
    assert_eq!(submitted.status, JobStatus::Queueing);
    assert!(manager.live_job(&submitted.id).await.is_some());

    api.finish_job(&submitted.id, JobStatus::Error, "boom").unwrap();
    manager
        .handle_event(event(&submitted.id, JobStatus::Error, 100))
        .await
        .unwrap();
    assert!(manager.can_retry(&submitted.id).await);

    let retried = manager.retry(&submitted.id).await.unwrap();
    assert_eq!(retried.status, JobStatus::Queueing);
    assert!(!manager.can_retry(&submitted.id).await);
    assert!(manager.live_job(&submitted.id).await.is_some());
}

#[tokio::test]
async fn test_submit_requires_permission() {
    let api = Arc::new(api());
    let scholar = Scholar {
        username: "bo".to_string(),
        ..Scholar::default()
    };
    let manager = JobManager::new(api.clone(), "42", scholar);
    assert!(manager.permitted_tasks("Document").await.unwrap().is_empty());

    let mut form = JobForm::new(ocr_task(), "local").unwrap();
    form.set_value("lang", "eng").unwrap();
    assert!(matches!(
        manager.submit(&form, &d1()).await,
        Err(Error::Forbidden(_))
    ));
    assert_eq!(api.call_count("submit_job"), 0);
}

#[tokio::test]
async fn test_attach_consumes_relay_until_closed() {
    let api = Arc::new(api().with_job(job("j1", "d1", JobStatus::Queueing)));
    let manager = manager(&api);
    manager.load_jobs(&d1()).await.unwrap();

    let relay = EventRelay::new("42", 16);
    let handle = manager.attach(&relay);
    relay
        .dispatch_json(r#"{"event_type":"alert","message":"maintenance at noon"}"#)
        .unwrap();
    relay
        .dispatch_json(
            r#"{"event_type":"job","job_id":"j1","status":"running","stage":"ocr","percent_complete":55}"#,
        )
        .unwrap();
    drop(relay);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("event loop did not stop")
        .unwrap();
    let live = manager.live_job("j1").await.unwrap();
    assert_eq!(live.status, JobStatus::Running);
    assert_eq!(live.stage.as_deref(), Some("ocr"));
    assert_eq!(live.percent_complete, 55);
}
