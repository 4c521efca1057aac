//! The event log (§4.2): paginated activity ingestion, high-water-mark tracking, and the
//! last-event-per-task derivation the diff engine consumes.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::config::Config;
use crate::entities::event::EventType;
use crate::entities::Event;
use crate::error::WaypointError;
use crate::remote::Client;

const PAGE_SIZE: u32 = 100;
const HWM_DEFAULT_WEEKS: i64 = 52;

/// Ordered activity-event ingestion for one process lifetime. There is one [`EventLog`] for the
/// whole workspace (events aren't partitioned by entity kind the way tasks/projects/etc. are).
pub struct EventLog {
    /// The maximum `event_date` persisted locally so far.
    hwm: NaiveDateTime,
    /// Every event fetched by the most recent [`EventLog::sync`].
    synced: Vec<Event>,
}

impl EventLog {
    /// `hwm` should come from `max(events.event_date)` in the DB, or [`EventLog::default_hwm`] on
    /// an empty DB (§8 "On first boot with empty DB, HWM defaults to now − 52 weeks").
    pub fn new(hwm: NaiveDateTime) -> Self {
        Self { hwm, synced: Vec::new() }
    }

    pub fn default_hwm(now: NaiveDateTime) -> NaiveDateTime {
        now - chrono::Duration::weeks(HWM_DEFAULT_WEEKS)
    }

    pub fn hwm(&self) -> NaiveDateTime {
        self.hwm
    }

    /// `⌈(now − HWM) / 7 days⌉`, bounded by [`Config::events_sync_full_sync_pages`] (§4.2, §8).
    pub fn page_budget(&self, now: NaiveDateTime, config: &Config) -> u32 {
        let days = (now - self.hwm).num_days().max(0);
        let weeks = ((days + 6) / 7) as u32;
        weeks.min(config.events_sync_full_sync_pages)
    }

    /// Walks activity pages newest to oldest until the page budget is exhausted or the oldest
    /// event on a page is at or before the HWM (§4.2). Within one page, steps `offset` forward by
    /// [`PAGE_SIZE`] until the remote returns a short page (§4.3).
    pub async fn sync(&mut self, remote: &Client, config: &Config, now: NaiveDateTime) -> Result<(), WaypointError> {
        let budget = self.page_budget(now, config);
        let mut collected = Vec::new();

        for page in 0..budget {
            let mut offset = 0u32;
            let mut page_events = Vec::new();
            loop {
                let (events, count) = remote.fetch_activity_page(page, PAGE_SIZE, offset, config).await?;
                let short_page = events.len() < PAGE_SIZE as usize;
                page_events.extend(events);
                if short_page || count < PAGE_SIZE {
                    break;
                }
                offset += PAGE_SIZE;
            }

            let oldest_on_page = page_events.iter().map(|e| e.event_date()).min();
            collected.extend(page_events);

            match oldest_on_page {
                Some(oldest) if oldest <= self.hwm => break,
                None => break,
                _ => {}
            }
        }

        self.synced = collected;
        Ok(())
    }

    /// `new` ≡ events with `event_date > HWM` (§4.2), drawn from `synced`.
    pub fn new_events(&self) -> Vec<&Event> {
        self.synced.iter().filter(|e| e.event_date() > self.hwm).collect()
    }

    /// For each task id touched in `new_events`, the most recent event (§4.2). Ties broken by
    /// event id for determinism — see DESIGN.md decision D1 for why this is plain
    /// last-`event_date`-wins with no `added`-beats-all override.
    pub fn new_last_event_for_task_by_date(&self) -> HashMap<String, Event> {
        let mut last: HashMap<String, Event> = HashMap::new();
        for event in self.new_events() {
            if event.object_type() != crate::entities::event::ObjectType::Item {
                continue;
            }
            match last.get(event.object_id()) {
                Some(existing) if existing.event_date() > event.event_date() => {}
                Some(existing) if existing.event_date() == event.event_date() && existing.id() >= event.id() => {}
                _ => {
                    last.insert(event.object_id().to_string(), event.clone());
                }
            }
        }
        last
    }

    /// Groups a last-event-per-task map by `event_type`, the shape the diff engine iterates over
    /// (§4.2 "group the resulting events by event_type").
    pub fn group_by_event_type(events: &HashMap<String, Event>) -> HashMap<EventType, Vec<(String, Event)>> {
        let mut grouped: HashMap<EventType, Vec<(String, Event)>> = HashMap::new();
        for (task_id, event) in events {
            grouped.entry(event.event_type()).or_default().push((task_id.clone(), event.clone()));
        }
        grouped
    }

    /// All events for one object id, any type, sorted ascending by `event_date` (§4.2). Used to
    /// fold a task's reconstructed state (§4.7).
    pub fn by_object_id(&self, id: &str) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.synced.iter().filter(|e| e.object_id() == id).collect();
        events.sort_by_key(|e| e.event_date());
        events
    }

    /// Advances the HWM to the maximum `event_date` observed this sync, if any (§8 "the
    /// high-water mark strictly increases across ticks that ingest any new event").
    pub fn advance_hwm(&mut self) {
        if let Some(max) = self.synced.iter().map(|e| e.event_date()).max() {
            if max > self.hwm {
                self.hwm = max;
            }
        }
    }

    pub fn synced(&self) -> &[Event] {
        &self.synced
    }
}
