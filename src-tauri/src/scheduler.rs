use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};

use crate::error::UpdateResult;
use crate::summary::SummaryRequest;
use crate::AppMutex;

/// Auto-summary fires on this weekday...
pub const TRIGGER_WEEKDAY: Weekday = Weekday::Fri;
/// ...during this local hour...
pub const TRIGGER_HOUR: u32 = 9;
/// ...within the first this-many minutes.
pub const TRIGGER_WINDOW_MINUTES: u32 = 10;

/// How often the schedule is re-evaluated after the launch check.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn in_trigger_window<Tz: TimeZone>(now: &DateTime<Tz>) -> bool {
    now.weekday() == TRIGGER_WEEKDAY
        && now.hour() == TRIGGER_HOUR
        && now.minute() < TRIGGER_WINDOW_MINUTES
}

/// Friday, 09:00–09:09 local, auto-summary on, at least one note.
pub fn should_trigger<Tz: TimeZone>(now: &DateTime<Tz>, enabled: bool, note_count: usize) -> bool {
    in_trigger_window(now) && enabled && note_count > 0
}

/// True when an automatic summary already ran on `now`'s local date.
pub fn already_ran_today<Tz: TimeZone>(now: &DateTime<Tz>, last: Option<DateTime<Utc>>) -> bool {
    last.is_some_and(|last| last.with_timezone(&now.timezone()).date_naive() == now.date_naive())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoOutcome {
    /// Outside the window, disabled, or nothing to summarize.
    NotDue,
    /// Already produced one today; a restart or a second tick in the window.
    AlreadyRan,
    /// `marker_saved` is false when the summary came back but the day's
    /// marker could not be written; a later tick may generate again.
    Generated { summary: String, marker_saved: bool },
}

/// One scheduler evaluation: check the predicate against the shared state,
/// and if it holds, generate a summary outside the lock.
///
/// The day's marker is written only after a successful generation, so a
/// failed attempt can be retried by a later tick in the same window. A
/// failed marker write is logged and never discards the summary.
pub async fn check_and_generate<Tz>(state: &AppMutex, now: DateTime<Tz>) -> UpdateResult<AutoOutcome>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    check_and_generate_with(state, now, |_| {}).await
}

/// Same as [`check_and_generate`], calling `on_busy(true)` just before the
/// summary request goes out and `on_busy(false)` once it settles. Not called
/// at all when nothing is due.
pub async fn check_and_generate_with<Tz, F>(
    state: &AppMutex,
    now: DateTime<Tz>,
    mut on_busy: F,
) -> UpdateResult<AutoOutcome>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
    F: FnMut(bool) + Send,
{
    let (request, generator) = {
        let s = state.lock().await;
        let ws = &s.workspace;
        if !should_trigger(&now, ws.settings().auto_summary_enabled, ws.notes().len()) {
            return Ok(AutoOutcome::NotDue);
        }
        if already_ran_today(&now, ws.last_auto_summary()?) {
            tracing::debug!("Auto-summary already generated today");
            return Ok(AutoOutcome::AlreadyRan);
        }
        tracing::info!("Auto-generating weekly summary (Friday 9am)");
        (
            SummaryRequest::build(ws.notes(), ws.settings())?,
            s.generator.clone(),
        )
    }; // lock released before the network call

    on_busy(true);
    let result = generator.submit(request).await;
    on_busy(false);
    let summary = result?;

    let marker_saved = match state
        .lock()
        .await
        .workspace
        .record_auto_summary(now.with_timezone(&Utc))
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Auto-summary generated but {e}");
            false
        }
    };
    Ok(AutoOutcome::Generated {
        summary,
        marker_saved,
    })
}

/// Run `check` once right away, then once every `period`, forever.
pub async fn run_schedule<F, Fut>(period: Duration, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    check().await;

    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        check().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::testing::CountingBackend;
    use crate::summary::SummaryGenerator;
    use crate::settings::KEY_LAST_AUTO_SUMMARY;
    use crate::storage::{MemoryBackend, SettingsBackend};
    use crate::settings::Settings;
    use crate::{AppState, AppMutex};
    use chrono::{Duration as ChronoDuration, FixedOffset, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 2025-07-11 was a Friday.
    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(2025, 7, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        tz.from_local_datetime(&naive).single().unwrap()
    }

    #[test]
    fn predicate_holds_friday_nine_oh_five() {
        assert!(should_trigger(&at(11, 9, 5), true, 1));
    }

    #[test]
    fn predicate_fails_when_any_input_differs() {
        assert!(!should_trigger(&at(10, 9, 5), true, 1), "thursday");
        assert!(!should_trigger(&at(11, 8, 5), true, 1), "hour 8");
        assert!(!should_trigger(&at(11, 10, 5), true, 1), "hour 10");
        assert!(!should_trigger(&at(11, 9, 10), true, 1), "minute 10");
        assert!(!should_trigger(&at(11, 9, 5), false, 1), "disabled");
        assert!(!should_trigger(&at(11, 9, 5), true, 0), "no notes");
    }

    #[test]
    fn window_edges() {
        assert!(in_trigger_window(&at(11, 9, 0)));
        assert!(in_trigger_window(&at(11, 9, 9)));
        assert!(!in_trigger_window(&at(11, 8, 59)));
    }

    #[test]
    fn same_local_date_counts_as_already_ran() {
        let now = at(11, 9, 5);
        let earlier = (now - ChronoDuration::minutes(3)).with_timezone(&Utc);
        let last_week = (now - ChronoDuration::days(7)).with_timezone(&Utc);
        assert!(already_ran_today(&now, Some(earlier)));
        assert!(!already_ran_today(&now, Some(last_week)));
        assert!(!already_ran_today(&now, None));
    }

    fn state_with(notes: &[&str], settings: Settings) -> (AppMutex, Arc<CountingBackend>) {
        let backend = MemoryBackend::new();
        let counting = Arc::new(CountingBackend::default());
        let mut state = AppState::new(
            Box::new(backend.clone()),
            Box::new(backend),
            SummaryGenerator::new(counting.clone()),
        )
        .unwrap();
        state.workspace.settings_mut().save(settings).unwrap();
        for note in notes {
            state.workspace.add(note).unwrap();
        }
        (AppMutex::new(state), counting)
    }

    /// Settings backend that accepts everything but the auto-summary marker.
    #[derive(Clone, Default)]
    struct MarkerRejecting(MemoryBackend);

    impl SettingsBackend for MarkerRejecting {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.0.get(key)
        }

        fn set_many(&self, entries: &[(&str, String)]) -> anyhow::Result<()> {
            if entries.iter().any(|(key, _)| *key == KEY_LAST_AUTO_SUMMARY) {
                anyhow::bail!("disk full");
            }
            self.0.set_many(entries)
        }
    }

    fn keyed() -> Settings {
        Settings {
            api_key: "sk-test".into(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn fires_once_per_day_across_restarts_and_ticks() {
        let (state, calls) = state_with(&["shipped it"], keyed());

        let first = check_and_generate(&state, at(11, 9, 2)).await.unwrap();
        assert!(matches!(first, AutoOutcome::Generated { marker_saved: true, .. }));

        let second = check_and_generate(&state, at(11, 9, 8)).await.unwrap();
        assert_eq!(second, AutoOutcome::AlreadyRan);
        assert_eq!(calls.calls(), 1);

        let next_week = check_and_generate(&state, at(18, 9, 2)).await.unwrap();
        assert!(matches!(next_week, AutoOutcome::Generated { marker_saved: true, .. }));
        assert_eq!(calls.calls(), 2);
    }

    #[tokio::test]
    async fn outside_window_does_nothing() {
        let (state, calls) = state_with(&["shipped it"], keyed());
        let outcome = check_and_generate(&state, at(11, 10, 2)).await.unwrap();
        assert_eq!(outcome, AutoOutcome::NotDue);
        assert_eq!(calls.calls(), 0);
    }

    #[tokio::test]
    async fn missing_key_surfaces_and_leaves_no_marker() {
        let (state, calls) = state_with(&["shipped it"], Settings::default());
        let err = check_and_generate(&state, at(11, 9, 2)).await.unwrap_err();
        assert!(err.needs_settings());
        assert_eq!(calls.calls(), 0);
        assert_eq!(state.lock().await.workspace.last_auto_summary().unwrap(), None);
    }

    #[tokio::test]
    async fn marker_write_failure_keeps_the_summary() {
        let notes = MemoryBackend::new();
        let counting = Arc::new(CountingBackend::default());
        let mut app = AppState::new(
            Box::new(notes),
            Box::new(MarkerRejecting::default()),
            SummaryGenerator::new(counting.clone()),
        )
        .unwrap();
        app.workspace.save_settings(keyed()).unwrap();
        app.workspace.add("shipped it").unwrap();
        let state = AppMutex::new(app);

        let outcome = check_and_generate(&state, at(11, 9, 2)).await.unwrap();
        let AutoOutcome::Generated {
            summary,
            marker_saved,
        } = outcome
        else {
            panic!("expected a generated summary, got {outcome:?}");
        };
        assert!(!summary.is_empty());
        assert!(!marker_saved);
        assert_eq!(counting.calls(), 1);
    }

    #[tokio::test]
    async fn busy_hook_brackets_the_request_only() {
        let (state, _) = state_with(&["shipped it"], keyed());
        let mut seen = Vec::new();

        check_and_generate_with(&state, at(11, 10, 2), |busy| seen.push(busy))
            .await
            .unwrap();
        assert!(seen.is_empty());

        check_and_generate_with(&state, at(11, 9, 2), |busy| seen.push(busy))
            .await
            .unwrap();
        assert_eq!(seen, [true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_at_launch_then_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn({
            let count = count.clone();
            run_schedule(CHECK_INTERVAL, move || {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            })
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(CHECK_INTERVAL * 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.abort();
    }
}
