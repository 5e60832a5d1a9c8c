//! Renders the scheduler journal as it grows, either as log lines or as
//! one JSON object per event on stdout.

use std::io::Write;

use quartzsim_scheduler::{EventType, SchedulerEvent};
use tracing::{info, warn};

pub struct Timeline {
    json: bool,
    cursor: u64,
}

impl Timeline {
    pub fn new(json: bool) -> Self {
        Self { json, cursor: 0 }
    }

    /// Id of the last event seen; pass it to `events_since`.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor past `events`. Returns how many ids were skipped
    /// because the journal evicted them before they were read.
    pub fn advance(&mut self, events: &[SchedulerEvent]) -> u64 {
        let Some(first) = events.first() else {
            return 0;
        };
        let missed = first.id.saturating_sub(self.cursor + 1);
        if let Some(last) = events.last() {
            self.cursor = last.id;
        }
        missed
    }

    pub fn render(&mut self, events: &[SchedulerEvent]) -> anyhow::Result<()> {
        let missed = self.advance(events);
        if missed > 0 {
            warn!(missed, "timeline fell behind the journal");
        }
        if self.json {
            let mut out = std::io::stdout().lock();
            for event in events {
                writeln!(out, "{}", serde_json::to_string(event)?)?;
            }
            out.flush()?;
            return Ok(());
        }
        for event in events {
            log_event(event);
        }
        Ok(())
    }
}

fn log_event(event: &SchedulerEvent) {
    let at = event.date.format("%H:%M:%S%.3f");
    let key = event.item_key.as_deref().unwrap_or("-");
    if event.faulted {
        let reason = event
            .errors
            .as_ref()
            .and_then(|e| e.first())
            .map(|e| e.text.as_str())
            .unwrap_or("unknown");
        warn!(id = event.id, %at, scope = ?event.scope, %key, %reason, "{} (faulted)", event.event_type);
        return;
    }
    match event.event_type {
        EventType::Fired | EventType::Completed => info!(
            id = event.id,
            %at,
            %key,
            fire_instance_id = event.fire_instance_id.unwrap_or_default(),
            "{}",
            event.event_type
        ),
        _ => info!(id = event.id, %at, scope = ?event.scope, %key, "{}", event.event_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use quartzsim_scheduler::EventScope;

    fn event(id: u64) -> SchedulerEvent {
        SchedulerEvent {
            id,
            date: DateTime::<Utc>::default(),
            scope: EventScope::Scheduler,
            event_type: EventType::Resumed,
            item_key: None,
            fire_instance_id: None,
            faulted: false,
            errors: None,
        }
    }

    #[test]
    fn cursor_follows_the_last_event() {
        let mut timeline = Timeline::new(false);
        assert_eq!(timeline.advance(&[event(1), event(2)]), 0);
        assert_eq!(timeline.cursor(), 2);
        assert_eq!(timeline.advance(&[]), 0);
        assert_eq!(timeline.cursor(), 2);
    }

    #[test]
    fn evicted_ids_are_reported_as_missed() {
        let mut timeline = Timeline::new(false);
        timeline.advance(&[event(1)]);
        assert_eq!(timeline.advance(&[event(42), event(43)]), 40);
        assert_eq!(timeline.cursor(), 43);
    }
}
