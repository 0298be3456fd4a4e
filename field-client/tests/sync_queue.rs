//! Sync queue end-to-end against a scripted delivery: ordering, retry and
//! dead-letter behavior, reentrancy, durability across restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use field_client::{
    ClientError, Delivery, DeliveryError, FlushReport, Outbox, OutboxEntry, SyncConfig, SyncQueue,
    SyncWorker,
};
use shared::outbox::OutboxAction;
use shared::request::SubmitIssueRequest;
use shared::types::IssueKind;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

enum Script {
    AlwaysOk,
    AlwaysTransient,
    AlwaysTerminal,
    SlowOk(Duration),
}

struct FakeDelivery {
    script: Script,
    attempts: AtomicU32,
    delivered: Mutex<Vec<String>>,
}

impl FakeDelivery {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            attempts: AtomicU32::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    async fn deliver(&self, action: &OutboxAction) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::AlwaysOk => {}
            Script::SlowOk(pause) => tokio::time::sleep(*pause).await,
            Script::AlwaysTransient => {
                return Err(DeliveryError::Transient("connection refused".into()));
            }
            Script::AlwaysTerminal => {
                return Err(DeliveryError::Terminal("E1001: Validation failed".into()));
            }
        }
        let key = match action {
            OutboxAction::Create(req) => req.idempotency_key.clone(),
            OutboxAction::Resolve { issue_id, .. } => format!("resolve-{issue_id}"),
            OutboxAction::Update { issue_id, .. } => format!("update-{issue_id}"),
        };
        self.delivered.lock().await.push(key);
        Ok(())
    }
}

fn create_action(key: &str) -> OutboxAction {
    OutboxAction::Create(SubmitIssueRequest {
        idempotency_key: key.to_string(),
        latitude: 22.3072,
        longitude: 73.1812,
        kind: IssueKind::Pothole,
        image_ref: format!("img/{key}.jpg"),
        reporter_id: "surveyor-3".to_string(),
        description: None,
    })
}

/// No backoff so every flush retries immediately
fn eager_config(retry_ceiling: u32) -> SyncConfig {
    SyncConfig {
        retry_ceiling,
        backoff_base: Duration::ZERO,
        backoff_cap: Duration::ZERO,
        flush_interval: Duration::from_secs(30),
    }
}

fn open_queue(dir: &tempfile::TempDir, delivery: Arc<FakeDelivery>, config: SyncConfig) -> SyncQueue {
    let outbox = Outbox::open(dir.path().join("outbox.redb")).unwrap();
    SyncQueue::new(outbox, delivery, config)
}

#[tokio::test]
async fn flush_delivers_captures_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::AlwaysOk);
    let queue = open_queue(&dir, delivery.clone(), SyncConfig::default());

    queue.enqueue(create_action("k-1")).unwrap();
    queue.enqueue(create_action("k-2")).unwrap();
    queue
        .enqueue(OutboxAction::Resolve {
            issue_id: 42,
            actor: "surveyor-3".into(),
            notes: "patched".into(),
            evidence_ref: "img/after.jpg".into(),
        })
        .unwrap();
    assert_eq!(queue.outbox().pending_count().unwrap(), 3);

    let report = queue.flush().await.unwrap();
    assert_eq!(
        report,
        FlushReport {
            synced: 3,
            failed: 0,
            dead_lettered: 0,
            remaining: 0,
        }
    );

    let delivered = delivery.delivered.lock().await.clone();
    assert_eq!(delivered, vec!["k-1", "k-2", "resolve-42"]);
}

#[tokio::test]
async fn transient_failures_retry_until_the_ceiling_then_dead_letter() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::AlwaysTransient);
    let queue = open_queue(&dir, delivery.clone(), eager_config(5));

    queue.enqueue(create_action("k-1")).unwrap();

    // Four flushes leave the entry queued with mounting retries
    for pass in 1..=4u32 {
        let report = queue.flush().await.unwrap();
        assert_eq!(report.failed, 1, "pass {pass}");
        assert_eq!(report.remaining, 1, "pass {pass}");
    }
    let entry = &queue.outbox().pending().unwrap()[0];
    assert_eq!(entry.retries, 4);
    assert!(entry.last_error.as_deref().unwrap().contains("connection refused"));

    // Fifth attempt hits the ceiling
    let report = queue.flush().await.unwrap();
    assert_eq!(report.dead_lettered, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(delivery.attempts(), 5);

    let letters = queue.outbox().dead_letters().unwrap();
    assert_eq!(letters.len(), 1);
    assert!(letters[0].reason.contains("Gave up after 5 attempts"));

    // Dead letters are never retried
    let report = queue.flush().await.unwrap();
    assert_eq!(report, FlushReport::default());
    assert_eq!(delivery.attempts(), 5);
}

#[tokio::test]
async fn terminal_failure_dead_letters_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::AlwaysTerminal);
    let queue = open_queue(&dir, delivery.clone(), eager_config(5));

    queue.enqueue(create_action("k-1")).unwrap();
    let report = queue.flush().await.unwrap();

    assert_eq!(report.dead_lettered, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(delivery.attempts(), 1, "no retries for terminal failures");

    let letters = queue.outbox().dead_letters().unwrap();
    assert_eq!(letters.len(), 1);
    assert!(letters[0].reason.contains("E1001"));
    assert_eq!(letters[0].entry.action.kind_str(), "create");
}

#[tokio::test]
async fn backed_off_entries_are_skipped_until_due() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::AlwaysTransient);
    // Long backoff: after the first failure the entry is not due again
    let config = SyncConfig {
        retry_ceiling: 5,
        backoff_base: Duration::from_secs(3600),
        backoff_cap: Duration::from_secs(3600),
        flush_interval: Duration::from_secs(30),
    };
    let queue = open_queue(&dir, delivery.clone(), config);

    queue.enqueue(create_action("k-1")).unwrap();
    let report = queue.flush().await.unwrap();
    assert_eq!(report.failed, 1);

    let report = queue.flush().await.unwrap();
    assert_eq!(report, FlushReport {
        synced: 0,
        failed: 0,
        dead_lettered: 0,
        remaining: 1,
    });
    assert_eq!(delivery.attempts(), 1, "backed-off entry not re-attempted");
}

#[tokio::test]
async fn concurrent_flushes_do_not_double_deliver() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::SlowOk(Duration::from_millis(50)));
    let queue = Arc::new(open_queue(&dir, delivery.clone(), SyncConfig::default()));

    queue.enqueue(create_action("k-1")).unwrap();

    let (first, second) = tokio::join!(queue.flush(), queue.flush());
    let reports = [first, second];
    assert_eq!(
        reports.iter().filter(|r| r.is_ok()).count(),
        1,
        "exactly one flush runs"
    );
    assert!(reports
        .iter()
        .any(|r| matches!(r, Err(ClientError::FlushInProgress))));
    assert_eq!(delivery.attempts(), 1);
}

#[test]
fn burst_captures_in_the_same_millisecond_keep_capture_order() {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Outbox::open(dir.path().join("outbox.redb")).unwrap();

    // Same timestamp, UUIDs picked to sort against the capture order
    let mut first = OutboxEntry::new(create_action("captured-first"));
    first.local_id = "ffffffff-0000-0000-0000-000000000000".into();
    let mut second = OutboxEntry::new(create_action("captured-second"));
    second.local_id = "00000000-0000-0000-0000-000000000000".into();
    second.enqueued_at = first.enqueued_at;

    let first = outbox.enqueue(&first).unwrap();
    let second = outbox.enqueue(&second).unwrap();
    assert!(first.seq < second.seq);

    let keys: Vec<String> = outbox
        .pending()
        .unwrap()
        .iter()
        .map(|e| match &e.action {
            OutboxAction::Create(req) => req.idempotency_key.clone(),
            other => panic!("unexpected action: {other:?}"),
        })
        .collect();
    assert_eq!(keys, vec!["captured-first", "captured-second"]);
}

#[test]
fn capture_sequence_survives_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.redb");

    let last_seq = {
        let outbox = Outbox::open(&path).unwrap();
        outbox
            .enqueue(&OutboxEntry::new(create_action("k-1")))
            .unwrap();
        outbox
            .enqueue(&OutboxEntry::new(create_action("k-2")))
            .unwrap()
            .seq
    };

    let outbox = Outbox::open(&path).unwrap();
    let next = outbox
        .enqueue(&OutboxEntry::new(create_action("k-3")))
        .unwrap();
    assert!(next.seq > last_seq, "counter does not restart after reopen");
}

#[tokio::test]
async fn outbox_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.redb");

    {
        let outbox = Outbox::open(&path).unwrap();
        let queue = SyncQueue::new(
            outbox,
            FakeDelivery::new(Script::AlwaysOk),
            SyncConfig::default(),
        );
        queue.enqueue(create_action("k-durable")).unwrap();
        // Simulated crash: queue dropped without a flush
    }

    let outbox = Outbox::open(&path).unwrap();
    let pending = outbox.pending().unwrap();
    assert_eq!(pending.len(), 1);
    match &pending[0].action {
        OutboxAction::Create(req) => assert_eq!(req.idempotency_key, "k-durable"),
        other => panic!("unexpected action: {other:?}"),
    }
    assert_eq!(pending[0].retries, 0);

    // Drain after the restart
    let delivery = FakeDelivery::new(Script::AlwaysOk);
    let queue = SyncQueue::new(outbox, delivery.clone(), SyncConfig::default());
    let report = queue.flush().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.remaining, 0);
}

#[tokio::test]
async fn worker_flushes_on_trigger_and_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = FakeDelivery::new(Script::AlwaysOk);
    // Interval far in the future: only the trigger and shutdown paths fire
    let queue = Arc::new(open_queue(&dir, delivery.clone(), SyncConfig::default()));
    let trigger = Arc::new(Notify::new());
    let shutdown = CancellationToken::new();
    let worker = SyncWorker::new(
        queue.clone(),
        trigger.clone(),
        shutdown.clone(),
        Duration::from_secs(3600),
    );
    let handle = tokio::spawn(worker.run());

    queue.enqueue(create_action("k-trigger")).unwrap();
    trigger.notify_one();
    for _ in 0..200 {
        if queue.outbox().pending_count().unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(queue.outbox().pending_count().unwrap(), 0);

    // An entry captured just before shutdown still goes out in the final flush
    queue.enqueue(create_action("k-last")).unwrap();
    shutdown.cancel();
    handle.await.unwrap();
    assert_eq!(queue.outbox().pending_count().unwrap(), 0);

    let delivered = delivery.delivered.lock().await.clone();
    assert_eq!(delivered, vec!["k-trigger", "k-last"]);
}
