use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use driver::{IdleConfig, ResourceIdleWatcher};
use quiesce_core::{
    AutomationError, ErrorCategory, InitiatorType, ResourceEntry, ResourceExpectation,
    ResourceTimeline,
};
use tokio_util::sync::CancellationToken;

/// Serves one scripted snapshot per poll, then repeats the final one.
struct ScriptedTimeline {
    frames: Mutex<VecDeque<Vec<ResourceEntry>>>,
    last: Mutex<Vec<ResourceEntry>>,
    reads: AtomicUsize,
}

impl ScriptedTimeline {
    fn new(frames: Vec<Vec<ResourceEntry>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
            last: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceTimeline for ScriptedTimeline {
    async fn resources(&self) -> Result<Vec<ResourceEntry>, AutomationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut frames = self.frames.lock().unwrap();
        match frames.pop_front() {
            Some(frame) => {
                *self.last.lock().unwrap() = frame.clone();
                Ok(frame)
            }
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

struct FailingTimeline;

#[async_trait]
impl ResourceTimeline for FailingTimeline {
    async fn resources(&self) -> Result<Vec<ResourceEntry>, AutomationError> {
        Err(AutomationError::script_error("performance API unavailable"))
    }
}

fn xhrs(names: &[&str]) -> Vec<ResourceEntry> {
    names.iter().map(|n| ResourceEntry::xhr(*n)).collect()
}

fn quick() -> IdleConfig {
    IdleConfig::default()
        .with_global_timeout(2_000)
        .with_poll_interval(10)
        .with_idle_threshold(3)
}

#[tokio::test]
async fn static_timeline_resolves_after_threshold_polls() {
    let timeline = ScriptedTimeline::new(vec![xhrs(&[
        "/api/session",
        "/api/profile",
        "/api/settings",
        "/api/feed",
        "/api/badges",
    ])]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher.wait_until_idle(&timeline).await.unwrap();

    // Immediate first poll starts the countdown, three stable polls finish it.
    assert_eq!(timeline.reads(), 4);
}

#[tokio::test]
async fn empty_timeline_is_already_idle() {
    let timeline = ScriptedTimeline::new(vec![Vec::new()]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher.wait_until_idle(&timeline).await.unwrap();

    assert_eq!(timeline.reads(), 4);
}

#[tokio::test]
async fn named_expectation_resolves_when_request_appears() {
    let timeline = ScriptedTimeline::new(vec![
        Vec::new(),
        Vec::new(),
        xhrs(&["/api/orders?page=1"]),
    ]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher
        .wait_for_resources(&timeline, &[ResourceExpectation::named("/api/orders")])
        .await
        .unwrap();

    // Two unsatisfied polls, then the match plus three stable polls.
    assert_eq!(timeline.reads(), 6);
}

#[tokio::test]
async fn unmet_expectation_times_out_with_diagnostics() {
    let timeline = ScriptedTimeline::new(vec![xhrs(&["/api/users"])]);
    let config = quick().with_global_timeout(100);
    let watcher = ResourceIdleWatcher::new(config);

    let err = watcher
        .wait_for_resources(&timeline, &[ResourceExpectation::named("/api/orders")])
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.context["unmet"][0], "/api/orders");
    assert_eq!(err.context["observed_async_requests"], 1);
    assert_eq!(err.context["phase"], "polling");
}

#[tokio::test]
async fn count_expectation_needs_enough_matches() {
    let short = quick().with_global_timeout(100);
    let expectation = ResourceExpectation::at_least("/api/search", 2);

    let one_match = ScriptedTimeline::new(vec![xhrs(&["/api/search?q=a"])]);
    let err = ResourceIdleWatcher::new(short.clone())
        .wait_for_resources(&one_match, &[expectation.clone()])
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let two_matches =
        ScriptedTimeline::new(vec![xhrs(&["/api/search?q=a", "/api/search?q=b"])]);
    ResourceIdleWatcher::new(quick())
        .wait_for_resources(&two_matches, &[expectation])
        .await
        .unwrap();
}

#[tokio::test]
async fn substring_matching_counts_every_occurrence() {
    let timeline = ScriptedTimeline::new(vec![xhrs(&[
        "https://app.example.com/api/items?page=1",
        "https://app.example.com/api/items?page=2",
        "https://app.example.com/api/items/42",
    ])]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher
        .wait_for_resources(&timeline, &[ResourceExpectation::at_least("/api/items", 3)])
        .await
        .unwrap();
}

#[tokio::test]
async fn growing_timeline_never_resolves() {
    let mut names: Vec<String> = Vec::new();
    let mut frames = Vec::new();
    for i in 0..60 {
        names.push(format!("/api/poll/{i}"));
        frames.push(
            names
                .iter()
                .map(|n| ResourceEntry::xhr(n.as_str()))
                .collect::<Vec<_>>(),
        );
    }
    let timeline = ScriptedTimeline::new(frames);
    let watcher = ResourceIdleWatcher::new(quick().with_global_timeout(150));

    let err = watcher.wait_until_idle(&timeline).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.context["phase"], "stabilizing");
}

#[tokio::test]
async fn count_change_restarts_the_countdown() {
    // Satisfied from the second poll on; the request count keeps moving
    // until the fifth, so the three stable polls only start there.
    let timeline = ScriptedTimeline::new(vec![
        Vec::new(),
        xhrs(&["/api/data?step=1"]),
        xhrs(&["/api/data?step=1", "/api/data?step=2"]),
        xhrs(&["/api/data?step=1", "/api/data?step=2", "/api/data?step=3"]),
        xhrs(&[
            "/api/data?step=1",
            "/api/data?step=2",
            "/api/data?step=3",
            "/api/data?step=4",
        ]),
    ]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher
        .wait_for_resources(&timeline, &[ResourceExpectation::named("/api/data")])
        .await
        .unwrap();

    assert_eq!(timeline.reads(), 8);
}

#[tokio::test]
async fn unsatisfied_poll_leaves_countdown_in_place() {
    // The timeline briefly loses the matching entry; the countdown neither
    // advances nor restarts on that poll.
    let timeline = ScriptedTimeline::new(vec![
        xhrs(&["/api/a"]),
        Vec::new(),
        xhrs(&["/api/a"]),
    ]);
    let watcher = ResourceIdleWatcher::new(quick());

    watcher
        .wait_for_resources(&timeline, &[ResourceExpectation::named("/api/a")])
        .await
        .unwrap();

    assert_eq!(timeline.reads(), 5);
}

#[tokio::test]
async fn zero_threshold_resolves_on_first_satisfied_poll() {
    let timeline = ScriptedTimeline::new(vec![xhrs(&["/api/ping"])]);
    let watcher = ResourceIdleWatcher::new(quick().with_idle_threshold(0));

    watcher.wait_until_idle(&timeline).await.unwrap();

    assert_eq!(timeline.reads(), 1);
}

#[tokio::test]
async fn non_async_traffic_is_invisible_to_the_watcher() {
    let mixed = vec![
        ResourceEntry::new("/static/app.js", InitiatorType::Script),
        ResourceEntry::new("/static/logo.png", InitiatorType::Img),
        ResourceEntry::new("/static/site.css", InitiatorType::Link),
    ];

    // Stability: non-async entries never count toward the request total.
    let timeline = ScriptedTimeline::new(vec![mixed.clone()]);
    ResourceIdleWatcher::new(quick())
        .wait_until_idle(&timeline)
        .await
        .unwrap();
    assert_eq!(timeline.reads(), 4);

    // Matching: a stylesheet fetch cannot satisfy an expectation either.
    let timeline = ScriptedTimeline::new(vec![mixed]);
    let err = ResourceIdleWatcher::new(quick().with_global_timeout(100))
        .wait_for_resources(&timeline, &[ResourceExpectation::named("/static/site.css")])
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.context["observed_async_requests"], 0);
}

#[tokio::test]
async fn deadline_wins_against_a_resolving_poll() {
    // The second poll at 60ms would finish the countdown, but the deadline
    // lands first.
    let timeline = ScriptedTimeline::new(vec![xhrs(&["/api/slow"])]);
    let config = IdleConfig::default()
        .with_global_timeout(25)
        .with_poll_interval(60)
        .with_idle_threshold(1);
    let watcher = ResourceIdleWatcher::new(config);

    let err = watcher.wait_until_idle(&timeline).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(timeline.reads(), 1);
}

#[tokio::test]
async fn cancellation_aborts_the_watch() {
    let timeline = ScriptedTimeline::new(vec![xhrs(&["/api/forever"])]);
    let config = quick()
        .with_global_timeout(5_000)
        .with_idle_threshold(10_000);
    let cancel = CancellationToken::new();
    let watcher = ResourceIdleWatcher::with_cancellation(config, cancel.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });

    let err = watcher.wait_until_idle(&timeline).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Cancelled);
    trigger.await.unwrap();
}

#[tokio::test]
async fn timeline_read_errors_propagate() {
    let watcher = ResourceIdleWatcher::new(quick());

    let err = watcher.wait_until_idle(&FailingTimeline).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ScriptExecution);
}
