//! Polling refresh of the displayed match list.
//!
//! A single loop task owns all state. Fetches run as their own tasks and
//! report back over a channel tagged with the criteria generation and cycle
//! token they were started under; the loop applies a completion only if it
//! belongs to the current generation and is newer than the last applied
//! cycle. Failed or timed-out fetches leave the published snapshot alone.
//!
//! Only sport, league, view mode and limit decide what gets fetched. A
//! change to search text or country alone re-filters the last fetched batch
//! in place and leaves the timer running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::catalog::Catalog;
use crate::models::{EventRecord, FilterCriteria, Match};
use crate::services::event_source::EventSource;
use crate::services::match_filter::{filter_matches, match_from_event};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    /// Shown as-is, without fetching, while no filter is active.
    pub initial: Option<Vec<Match>>,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            initial: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub matches: Vec<Match>,
    /// Token of the cycle that produced this list; 0 before the first one.
    pub cycle: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Handle to a running refresh loop. Dropping it stops the loop.
pub struct RefreshController {
    criteria_tx: watch::Sender<FilterCriteria>,
    snapshot_rx: watch::Receiver<FeedSnapshot>,
    task: JoinHandle<()>,
    stopped: AtomicBool,
}

impl RefreshController {
    pub fn spawn(
        source: Arc<dyn EventSource>,
        catalog: Arc<Catalog>,
        criteria: FilterCriteria,
        options: RefreshOptions,
    ) -> Self {
        let (criteria_tx, criteria_rx) = watch::channel(criteria);
        let (snapshot_tx, snapshot_rx) = watch::channel(FeedSnapshot::default());
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let refresh_loop = RefreshLoop {
            source,
            catalog,
            interval: options.interval,
            fetch_timeout: options.fetch_timeout,
            initial: options.initial,
            criteria: FilterCriteria::default(),
            batch: None,
            snapshot_tx,
            results_tx,
            generation: 0,
            next_cycle: 0,
            last_applied: 0,
        };
        let task = tokio::spawn(refresh_loop.run(criteria_rx, results_rx));

        Self {
            criteria_tx,
            snapshot_rx,
            task,
            stopped: AtomicBool::new(false),
        }
    }

    /// Replace the criteria. Returns false (and triggers nothing) when
    /// unchanged or after shutdown.
    pub fn set_criteria(&self, criteria: FilterCriteria) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        self.criteria_tx.send_if_modified(|current| {
            if *current == criteria {
                false
            } else {
                *current = criteria;
                true
            }
        })
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria_tx.borrow().clone()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop the loop. Fetches still in flight finish but are discarded.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
struct CycleToken {
    generation: u64,
    cycle: u64,
}

struct CycleResult {
    token: CycleToken,
    outcome: Result<Vec<EventRecord>>,
}

enum LoopEvent {
    CriteriaChanged,
    Tick,
    Completed(CycleResult),
    Closed,
}

struct RefreshLoop {
    source: Arc<dyn EventSource>,
    catalog: Arc<Catalog>,
    interval: Duration,
    fetch_timeout: Duration,
    initial: Option<Vec<Match>>,
    criteria: FilterCriteria,
    // Unfiltered matches behind the current snapshot
    batch: Option<Vec<Match>>,
    snapshot_tx: watch::Sender<FeedSnapshot>,
    results_tx: mpsc::UnboundedSender<CycleResult>,
    generation: u64,
    next_cycle: u64,
    last_applied: u64,
}

impl RefreshLoop {
    async fn run(
        mut self,
        mut criteria_rx: watch::Receiver<FilterCriteria>,
        mut results_rx: mpsc::UnboundedReceiver<CycleResult>,
    ) {
        let criteria = criteria_rx.borrow_and_update().clone();
        let mut deadline = self.start_generation(criteria);

        loop {
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let event = tokio::select! {
                changed = criteria_rx.changed() => match changed {
                    Ok(()) => LoopEvent::CriteriaChanged,
                    Err(_) => LoopEvent::Closed,
                },
                _ = timer => LoopEvent::Tick,
                Some(result) = results_rx.recv() => LoopEvent::Completed(result),
            };

            match event {
                LoopEvent::CriteriaChanged => {
                    let criteria = criteria_rx.borrow_and_update().clone();
                    if needs_fetch(&self.criteria, &criteria) {
                        deadline = self.start_generation(criteria);
                    } else {
                        self.refilter(criteria);
                    }
                }
                LoopEvent::Tick => {
                    self.start_cycle();
                    deadline = Some(Instant::now() + self.interval);
                }
                LoopEvent::Completed(result) => self.apply(result),
                LoopEvent::Closed => break,
            }
        }

        tracing::debug!("Refresh loop stopped");
    }

    /// New criteria: fetch immediately and re-arm the timer, unless the
    /// supplied initial data covers an unfiltered view.
    fn start_generation(&mut self, criteria: FilterCriteria) -> Option<Instant> {
        self.generation += 1;
        self.criteria = criteria;

        if self.criteria.is_unfiltered() {
            if let Some(initial) = &self.initial {
                tracing::debug!("Showing {} supplied matches without fetching", initial.len());
                let matches = initial.clone();
                self.next_cycle += 1;
                self.last_applied = self.next_cycle;
                self.batch = Some(matches.clone());
                self.publish(matches);
                return None;
            }
        }

        // The old batch belongs to another sport or league
        self.batch = None;
        self.start_cycle();
        Some(Instant::now() + self.interval)
    }

    fn start_cycle(&mut self) {
        self.next_cycle += 1;
        let token = CycleToken {
            generation: self.generation,
            cycle: self.next_cycle,
        };

        let source = self.source.clone();
        let sport = self.criteria.source_sport().map(str::to_owned);
        let fetch_timeout = self.fetch_timeout;
        let results_tx = self.results_tx.clone();

        tracing::debug!(
            "Refresh cycle {} (generation {}) fetching sport {}",
            token.cycle,
            token.generation,
            sport.as_deref().unwrap_or("all")
        );

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(fetch_timeout, source.get_events(sport.as_deref())).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("fetch timed out after {}s", fetch_timeout.as_secs())),
            };
            // Receiver is gone once the controller has shut down
            let _ = results_tx.send(CycleResult { token, outcome });
        });
    }

    fn apply(&mut self, result: CycleResult) {
        let CycleToken { generation, cycle } = result.token;

        if generation != self.generation || cycle <= self.last_applied {
            tracing::debug!(
                "Dropping stale refresh cycle {} (generation {}, current {}, last applied {})",
                cycle,
                generation,
                self.generation,
                self.last_applied
            );
            return;
        }

        match result.outcome {
            Ok(events) => {
                let matches: Vec<Match> = events
                    .into_iter()
                    .map(|e| match_from_event(e, &self.catalog))
                    .collect();
                let filtered = filter_matches(&matches, &self.criteria, &self.catalog);
                tracing::debug!(
                    "Refresh cycle {} kept {} of {} matches",
                    cycle,
                    filtered.len(),
                    matches.len()
                );
                self.last_applied = cycle;
                self.batch = Some(matches);
                self.publish(filtered);
            }
            Err(e) => {
                tracing::warn!("Refresh cycle {} failed, keeping previous list: {}", cycle, e);
            }
        }
    }

    /// Apply new search/country criteria to the batch already held.
    fn refilter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;

        match &self.batch {
            Some(batch) => {
                let filtered = filter_matches(batch, &self.criteria, &self.catalog);
                tracing::debug!("Re-filtered held batch, kept {} of {} matches", filtered.len(), batch.len());
                self.snapshot_tx.send_modify(|snapshot| snapshot.matches = filtered);
            }
            // The fetch in flight is filtered with these criteria when it lands
            None => tracing::debug!("No batch held yet, criteria apply to the next fetch"),
        }
    }

    fn publish(&self, matches: Vec<Match>) {
        self.snapshot_tx.send_replace(FeedSnapshot {
            matches,
            cycle: self.last_applied,
            refreshed_at: Some(Utc::now()),
        });
    }
}

/// True when the change alters what is fetched or how much of it is kept.
fn needs_fetch(current: &FilterCriteria, next: &FilterCriteria) -> bool {
    current.sport != next.sport
        || current.league != next.league
        || current.view_mode != next.view_mode
        || current.limit != next.limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(usize, Option<&str>) -> (Duration, Result<Vec<EventRecord>>) + Send + Sync>;

    /// Source whose answer (delay and result) is scripted per call number.
    struct ScriptedSource {
        calls: AtomicUsize,
        requested: Mutex<Vec<Option<String>>>,
        respond: Responder,
    }

    impl ScriptedSource {
        fn new(
            respond: impl Fn(usize, Option<&str>) -> (Duration, Result<Vec<EventRecord>>) + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn get_events(&self, sport: Option<&str>) -> Result<Vec<EventRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.requested.lock().unwrap().push(sport.map(str::to_owned));
            let (delay, result) = (self.respond)(call, sport);
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn event(id: &str, sport: &str, live: bool) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            sport: sport.to_string(),
            home_team: format!("{} home", id),
            away_team: format!("{} away", id),
            league: Some("Premier League".to_string()),
            league_id: None,
            country: Some("England".to_string()),
            time: "20:00".to_string(),
            date: "Today".to_string(),
            start_time: None,
            home_odds: 2.0,
            draw_odds: None,
            away_odds: 2.0,
            is_live: Some(live),
            featured: None,
        }
    }

    fn ids(snapshot: &FeedSnapshot) -> Vec<&str> {
        snapshot.matches.iter().map(|m| m.id.as_str()).collect()
    }

    fn spawn(source: &Arc<ScriptedSource>, criteria: FilterCriteria, options: RefreshOptions) -> RefreshController {
        let source: Arc<dyn EventSource> = source.clone();
        RefreshController::spawn(source, Arc::new(Catalog::builtin()), criteria, options)
    }

    async fn advance(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_on_start_then_every_interval() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![event("a", "football", false)])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());

        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(ids(&controller.snapshot()), vec!["a"]);

        advance(58.0).await; // t = 59
        assert_eq!(source.calls(), 1);

        advance(2.0).await; // t = 61
        assert_eq!(source.calls(), 2);

        advance(60.0).await; // t = 121
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_criteria_change_before_first_cycle_fetches_once() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());
        assert!(controller.set_criteria(FilterCriteria::for_sport("tennis")));

        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(*source.requested.lock().unwrap(), vec![Some("tennis".to_string())]);

        advance(59.5).await; // t = 60.5
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_criteria_change_restarts_timer() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());

        advance(30.0).await;
        assert_eq!(source.calls(), 1);

        assert!(controller.set_criteria(FilterCriteria::for_sport("basketball")));
        advance(1.0).await; // t = 31
        assert_eq!(source.calls(), 2);

        advance(58.0).await; // t = 89, old timer would have fired at 60
        assert_eq!(source.calls(), 2);

        advance(2.0).await; // t = 91
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_criteria_do_not_refetch() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());
        advance(1.0).await;

        assert!(!controller.set_criteria(FilterCriteria::for_sport("football")));
        advance(1.0).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_previous_list() {
        let source = ScriptedSource::new(|call, _| {
            if call == 1 {
                (Duration::ZERO, Ok(vec![event("a", "football", true), event("b", "football", false)]))
            } else {
                (Duration::ZERO, Err(anyhow!("backend unavailable")))
            }
        });
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());

        advance(1.0).await;
        let before = controller.snapshot();
        assert_eq!(ids(&before), vec!["a", "b"]);

        advance(60.0).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(controller.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let source = ScriptedSource::new(|_, _| (Duration::from_secs(30), Ok(vec![event("late", "football", false)])));
        let options = RefreshOptions {
            fetch_timeout: Duration::from_secs(10),
            ..RefreshOptions::default()
        };
        let controller = spawn(&source, FilterCriteria::for_sport("football"), options);

        advance(40.0).await;
        assert_eq!(controller.snapshot(), FeedSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_from_old_criteria_is_dropped() {
        let source = ScriptedSource::new(|_, sport| match sport {
            Some("football") => (Duration::from_secs(5), Ok(vec![event("fb", "football", false)])),
            _ => (Duration::from_secs(1), Ok(vec![event("bb", "basketball", false)])),
        });
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());

        advance(0.1).await;
        assert_eq!(source.calls(), 1);
        controller.set_criteria(FilterCriteria::for_sport("basketball"));

        advance(10.0).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(ids(&controller.snapshot()), vec!["bb"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_cycle_cannot_overwrite_newer() {
        let source = ScriptedSource::new(|call, _| {
            if call == 1 {
                (Duration::from_secs(90), Ok(vec![event("slow", "football", false)]))
            } else {
                (Duration::from_secs(1), Ok(vec![event("fast", "football", false)]))
            }
        });
        let options = RefreshOptions {
            fetch_timeout: Duration::from_secs(120),
            ..RefreshOptions::default()
        };
        let controller = spawn(&source, FilterCriteria::for_sport("football"), options);

        advance(62.0).await;
        assert_eq!(ids(&controller.snapshot()), vec!["fast"]);

        advance(30.0).await; // t = 92, first fetch has now resolved
        assert_eq!(ids(&controller.snapshot()), vec!["fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_are_filtered() {
        let source = ScriptedSource::new(|_, _| {
            (
                Duration::ZERO,
                Ok(vec![
                    event("a", "football", true),
                    event("b", "football", false),
                    event("c", "football", true),
                ]),
            )
        });
        let mut criteria = FilterCriteria::for_sport("football");
        criteria.view_mode = crate::models::ViewMode::Live;
        criteria.limit = Some(1);
        let controller = spawn(&source, criteria, RefreshOptions::default());

        advance(1.0).await;
        assert_eq!(ids(&controller.snapshot()), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_data_skips_fetching() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![event("fetched", "football", false)])));
        let initial: Vec<Match> = vec![Match::from(event("seeded", "football", false))];
        let options = RefreshOptions {
            initial: Some(initial.clone()),
            ..RefreshOptions::default()
        };
        let controller = spawn(&source, FilterCriteria::default(), options);

        advance(130.0).await;
        assert_eq!(source.calls(), 0);
        assert_eq!(controller.snapshot().matches, initial);

        controller.set_criteria(FilterCriteria::for_sport("football"));
        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(ids(&controller.snapshot()), vec!["fetched"]);

        controller.set_criteria(FilterCriteria::default());
        advance(1.0).await;
        assert_eq!(controller.snapshot().matches, initial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refreshing() {
        let source = ScriptedSource::new(|_, _| (Duration::from_secs(2), Ok(vec![event("a", "football", false)])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());
        let mut updates = controller.subscribe();

        advance(0.5).await;
        controller.shutdown();

        advance(200.0).await;
        assert_eq!(source.calls(), 1);
        // The in-flight fetch resolved after shutdown and was discarded
        assert_eq!(controller.snapshot(), FeedSnapshot::default());
        assert!(updates.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_change_refilters_without_fetching() {
        let source = ScriptedSource::new(|_, _| {
            (Duration::ZERO, Ok(vec![event("a", "football", false), event("b", "football", true)]))
        });
        let criteria = FilterCriteria::for_sport("football");
        let controller = spawn(&source, criteria.clone(), RefreshOptions::default());

        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        let fetched = controller.snapshot();

        let mut narrowed = criteria.clone();
        narrowed.search_text = "b home".to_string();
        assert!(controller.set_criteria(narrowed.clone()));
        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(ids(&controller.snapshot()), vec!["b"]);
        assert_eq!(controller.snapshot().cycle, fetched.cycle);

        // Every event sits in the Premier League, so Spain keeps nothing
        let mut elsewhere = narrowed.clone();
        elsewhere.country = Some("spain".to_string());
        assert!(controller.set_criteria(elsewhere));
        advance(1.0).await;
        assert_eq!(source.calls(), 1);
        assert!(controller.snapshot().matches.is_empty());

        // Timer was not reset by the local changes
        advance(58.0).await; // t = 61
        assert_eq!(source.calls(), 2);
        assert!(controller.snapshot().matches.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_change_before_first_result_applies_to_it() {
        let source = ScriptedSource::new(|_, _| {
            (Duration::from_secs(2), Ok(vec![event("a", "football", false), event("b", "football", false)]))
        });
        let mut criteria = FilterCriteria::for_sport("football");
        let controller = spawn(&source, criteria.clone(), RefreshOptions::default());

        advance(0.5).await;
        criteria.search_text = "a home".to_string();
        assert!(controller.set_criteria(criteria));

        advance(3.0).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(ids(&controller.snapshot()), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_mode_change_refetches() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![event("a", "football", true)])));
        let mut criteria = FilterCriteria::for_sport("football");
        let controller = spawn(&source, criteria.clone(), RefreshOptions::default());

        advance(1.0).await;
        criteria.view_mode = crate::models::ViewMode::Upcoming;
        assert!(controller.set_criteria(criteria));
        advance(1.0).await;
        assert_eq!(source.calls(), 2);
        assert!(controller.snapshot().matches.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_criteria_after_shutdown_is_refused() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(vec![])));
        let controller = spawn(&source, FilterCriteria::for_sport("football"), RefreshOptions::default());
        advance(1.0).await;

        controller.shutdown();
        assert!(!controller.set_criteria(FilterCriteria::for_sport("tennis")));
        assert_eq!(controller.criteria(), FilterCriteria::for_sport("football"));

        advance(1.0).await;
        assert_eq!(source.calls(), 1);
    }
}
