//! Calendar-time notification scheduler.
//!
//! One component owns every armed trigger: an in-memory priority queue of
//! `(fire_at, trigger)` entries drained by a single dispatching loop. A
//! trigger moves Armed -> Fired, or dies Superseded when a newer arm for
//! the same (event, kind) replaces it, or becomes a no-op when its event
//! was cancelled in the meantime — the cancellation re-check happens at
//! fire time against freshly read state. Armed triggers live in process
//! memory only and do not survive a restart.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};

use willbethere_shared::clock::Clock;
use willbethere_shared::mailer::Mailer;
use willbethere_shared::store::{EventStore, RsvpStore};

use crate::notify;

/// Sleep horizon while the queue is empty; any command wakes the loop
/// earlier.
const IDLE_POLL: StdDuration = StdDuration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    LocationRelease,
    Reminder,
    DetailChange,
    Cancellation,
}

pub const TRIGGER_KINDS: [TriggerKind; 4] = [
    TriggerKind::LocationRelease,
    TriggerKind::Reminder,
    TriggerKind::DetailChange,
    TriggerKind::Cancellation,
];

/// A scheduled future action tied to a calendar timestamp. The payload is
/// re-derived from event state at fire time, so the trigger itself only
/// carries identity and timing.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub event_id: String,
    pub kind: TriggerKind,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum SchedulerCommand {
    Arm(Trigger),
    Disarm {
        event_id: String,
        kind: TriggerKind,
    },
    DisarmEvent {
        event_id: String,
    },
    /// Observability: currently armed, non-superseded triggers.
    Snapshot(oneshot::Sender<Vec<Trigger>>),
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    fire_at: DateTime<Utc>,
    seq: u64,
    generation: u64,
    event_id: String,
    kind: TriggerKind,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle for arming and disarming triggers from the request path. Sends
/// never block on trigger execution; the request that arms a trigger is
/// done with it immediately.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub async fn arm(&self, trigger: Trigger) {
        if let Err(e) = self.command_tx.send(SchedulerCommand::Arm(trigger)).await {
            error!("Scheduler unavailable, dropping arm command: {}", e);
        }
    }

    pub async fn disarm(&self, event_id: &str, kind: TriggerKind) {
        let cmd = SchedulerCommand::Disarm {
            event_id: event_id.to_string(),
            kind,
        };
        if let Err(e) = self.command_tx.send(cmd).await {
            error!("Scheduler unavailable, dropping disarm command: {}", e);
        }
    }

    pub async fn disarm_event(&self, event_id: &str) {
        let cmd = SchedulerCommand::DisarmEvent {
            event_id: event_id.to_string(),
        };
        if let Err(e) = self.command_tx.send(cmd).await {
            error!("Scheduler unavailable, dropping disarm command: {}", e);
        }
    }

    /// Currently armed triggers, for inspection and diagnostics.
    pub async fn armed(&self) -> Vec<Trigger> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .command_tx
            .send(SchedulerCommand::Snapshot(reply_tx))
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub async fn stop(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Stop).await;
    }
}

pub struct Scheduler<ES, RS> {
    events: Arc<ES>,
    rsvps: Arc<RS>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
    queue: BinaryHeap<Reverse<QueueEntry>>,
    /// Current generation per (event, kind); queue entries from older
    /// generations are superseded and discarded when they surface.
    generations: HashMap<(String, TriggerKind), u64>,
    seq: u64,
}

impl<ES, RS> Scheduler<ES, RS>
where
    ES: EventStore + 'static,
    RS: RsvpStore + 'static,
{
    pub fn new(
        events: Arc<ES>,
        rsvps: Arc<RS>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        Self {
            events,
            rsvps,
            mailer,
            clock,
            command_tx,
            command_rx: Some(command_rx),
            queue: BinaryHeap::new(),
            generations: HashMap::new(),
            seq: 0,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Runs the dispatching loop until `Stop` or until every handle is
    /// dropped.
    pub async fn run(mut self) {
        let mut command_rx = self.command_rx.take().expect("run called twice");

        info!("Notification scheduler started");
        loop {
            self.fire_due();

            let delay = self.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::Arm(trigger)) => self.arm(trigger),
                        Some(SchedulerCommand::Disarm { event_id, kind }) => {
                            self.disarm(&event_id, kind);
                        }
                        Some(SchedulerCommand::DisarmEvent { event_id }) => {
                            for kind in TRIGGER_KINDS {
                                self.disarm(&event_id, kind);
                            }
                        }
                        Some(SchedulerCommand::Snapshot(reply)) => {
                            let _ = reply.send(self.armed());
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Notification scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn arm(&mut self, trigger: Trigger) {
        let key = (trigger.event_id.clone(), trigger.kind);
        let generation = self.generations.get(&key).copied().unwrap_or(0) + 1;
        self.generations.insert(key, generation);

        let now = self.clock.now();
        if trigger.fire_at <= now {
            // Past instants are never queued
            debug!(
                "{:?} trigger for event {} already due, dispatching now",
                trigger.kind, trigger.event_id
            );
            self.spawn_dispatch(trigger);
            return;
        }

        debug!(
            "Arming {:?} trigger for event {} at {}",
            trigger.kind, trigger.event_id, trigger.fire_at
        );
        self.seq += 1;
        self.queue.push(Reverse(QueueEntry {
            fire_at: trigger.fire_at,
            seq: self.seq,
            generation,
            event_id: trigger.event_id,
            kind: trigger.kind,
        }));
    }

    fn disarm(&mut self, event_id: &str, kind: TriggerKind) {
        let key = (event_id.to_string(), kind);
        if let Some(generation) = self.generations.get_mut(&key) {
            debug!("Disarming {:?} trigger for event {}", kind, event_id);
            *generation += 1;
        }
    }

    fn fire_due(&mut self) {
        let now = self.clock.now();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.fire_at > now {
                break;
            }
            let Reverse(entry) = self.queue.pop().expect("peeked entry");
            let key = (entry.event_id.clone(), entry.kind);
            if self.generations.get(&key).copied() != Some(entry.generation) {
                debug!(
                    "Skipping superseded {:?} trigger for event {}",
                    entry.kind, entry.event_id
                );
                continue;
            }
            self.generations.remove(&key);
            self.spawn_dispatch(Trigger {
                event_id: entry.event_id,
                kind: entry.kind,
                fire_at: entry.fire_at,
            });
        }
    }

    fn next_delay(&self) -> StdDuration {
        match self.queue.peek() {
            Some(Reverse(entry)) => (entry.fire_at - self.clock.now())
                .to_std()
                .unwrap_or(StdDuration::ZERO),
            None => IDLE_POLL,
        }
    }

    fn armed(&self) -> Vec<Trigger> {
        self.queue
            .iter()
            .filter(|Reverse(entry)| {
                let key = (entry.event_id.clone(), entry.kind);
                self.generations.get(&key).copied() == Some(entry.generation)
            })
            .map(|Reverse(entry)| Trigger {
                event_id: entry.event_id.clone(),
                kind: entry.kind,
                fire_at: entry.fire_at,
            })
            .collect()
    }

    /// Trigger execution is fire-and-forget: it runs on its own task and
    /// a failure is logged without blocking the loop or other triggers.
    fn spawn_dispatch(&self, trigger: Trigger) {
        let events = self.events.clone();
        let rsvps = self.rsvps.clone();
        let mailer = self.mailer.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            dispatch(events, rsvps, mailer, clock, trigger).await;
        });
    }
}

async fn dispatch<ES, RS>(
    events: Arc<ES>,
    rsvps: Arc<RS>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    trigger: Trigger,
) where
    ES: EventStore,
    RS: RsvpStore,
{
    // Re-fetch: the event may have been cancelled since arming
    let event = match events.get_event(&trigger.event_id).await {
        Ok(event) => event,
        Err(e) => {
            warn!(
                "{:?} trigger fired for unreadable event {}: {}",
                trigger.kind, trigger.event_id, e
            );
            return;
        }
    };
    if event.cancelled {
        info!(
            "Event {} was cancelled, discarding {:?} trigger",
            event.id, trigger.kind
        );
        return;
    }

    let rsvp_list = match rsvps.get_rsvps_by_event(&event.id).await {
        Ok(list) => list,
        Err(e) => {
            error!(
                "Failed to load RSVPs for event {} while firing {:?} trigger: {}",
                event.id, trigger.kind, e
            );
            return;
        }
    };
    let recipients = notify::attending_emails(&rsvp_list);

    let notice = match trigger.kind {
        TriggerKind::LocationRelease => notify::location_release_notice(&event),
        TriggerKind::Reminder => notify::reminder_notice(&event),
        TriggerKind::Cancellation => notify::cancellation_notice(&event),
        TriggerKind::DetailChange => {
            let released = event.location_released(clock.now());
            notify::detail_change_notice(&event, &event.name, released)
        }
    };

    info!(
        "Firing {:?} trigger for event {} ({} recipient(s))",
        trigger.kind,
        event.id,
        recipients.len()
    );
    notify::broadcast(mailer.as_ref(), &recipients, &notice).await;
}
