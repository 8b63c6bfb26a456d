//! Game events and the priority event broadcaster.
//!
//! Producers (health registry, battlefield, win checker) publish
//! [`GameEvent`]s through the [`EventSink`] trait. The
//! [`EventBroadcaster`] queues them with these policies:
//!
//! - **Deduplication**: an event with the same type and description as
//!   one seen less than `dedupe_window_ticks` ago is dropped.
//! - **Overflow**: when the queue is full the lowest-priority quartile
//!   (oldest first within a priority) is evicted before the new event is
//!   enqueued. Backpressure is lossy and never blocks a producer.
//! - **Processing**: each tick at most `max_per_tick` events are
//!   dispatched, highest priority first, FIFO within a priority.
//!
//! Dispatch translates events into cues for optional audio, visual and
//! UI sinks. Any sink may be absent; the broadcaster then runs headless.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{TeamId, UnitId};
use crate::config::BroadcasterConfig;
use crate::grid::GridCoordinate;

/// Event priority. Higher priorities are dispatched first and evicted last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum EventPriority {
    /// Cosmetic feedback.
    Low,
    /// Regular gameplay feedback.
    #[default]
    Normal,
    /// Important state changes.
    High,
    /// Match-deciding events.
    Critical,
}

/// Discriminator of an [`EventKind`], used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    /// See [`EventKind::UnitDamaged`].
    UnitDamaged,
    /// See [`EventKind::UnitHealed`].
    UnitHealed,
    /// See [`EventKind::UnitDied`].
    UnitDied,
    /// See [`EventKind::UnitRevived`].
    UnitRevived,
    /// See [`EventKind::UnitMoved`].
    UnitMoved,
    /// See [`EventKind::TurnStarted`].
    TurnStarted,
    /// See [`EventKind::LastUnitStanding`].
    LastUnitStanding,
    /// See [`EventKind::TeamEliminated`].
    TeamEliminated,
    /// See [`EventKind::MatchEnded`].
    MatchEnded,
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A unit lost health.
    UnitDamaged {
        /// Damaged unit.
        unit: UnitId,
        /// Attacking unit, if any.
        source: Option<UnitId>,
        /// Health actually removed.
        amount: u32,
        /// Health left afterwards.
        remaining: u32,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// A unit regained health.
    UnitHealed {
        /// Healed unit.
        unit: UnitId,
        /// Health actually restored.
        amount: u32,
        /// Health afterwards.
        current: u32,
    },
    /// A unit reached zero health.
    UnitDied {
        /// Dead unit.
        unit: UnitId,
        /// Unit that dealt the killing blow, if any.
        killer: Option<UnitId>,
    },
    /// A dead unit was brought back.
    UnitRevived {
        /// Revived unit.
        unit: UnitId,
        /// Health after revival.
        health: u32,
    },
    /// A unit changed cell.
    UnitMoved {
        /// Moving unit.
        unit: UnitId,
        /// Previous cell.
        from: GridCoordinate,
        /// New cell.
        to: GridCoordinate,
    },
    /// A new turn began.
    TurnStarted {
        /// Team whose turn it is.
        team: TeamId,
        /// Turn counter, starting at 1.
        turn: u32,
    },
    /// A team is down to its last unit.
    LastUnitStanding {
        /// Affected team.
        team: TeamId,
        /// The remaining unit.
        unit: UnitId,
    },
    /// A team has no living units left.
    TeamEliminated {
        /// Eliminated team.
        team: TeamId,
    },
    /// The match is decided.
    MatchEnded {
        /// Winning team, `None` for a draw.
        winner: Option<TeamId>,
    },
}

impl EventKind {
    /// Discriminator for deduplication.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::UnitDamaged { .. } => EventType::UnitDamaged,
            Self::UnitHealed { .. } => EventType::UnitHealed,
            Self::UnitDied { .. } => EventType::UnitDied,
            Self::UnitRevived { .. } => EventType::UnitRevived,
            Self::UnitMoved { .. } => EventType::UnitMoved,
            Self::TurnStarted { .. } => EventType::TurnStarted,
            Self::LastUnitStanding { .. } => EventType::LastUnitStanding,
            Self::TeamEliminated { .. } => EventType::TeamEliminated,
            Self::MatchEnded { .. } => EventType::MatchEnded,
        }
    }

    /// Priority assigned when no explicit priority is given.
    #[must_use]
    pub const fn default_priority(&self) -> EventPriority {
        match self {
            Self::UnitMoved { .. } | Self::UnitHealed { .. } => EventPriority::Low,
            Self::UnitDamaged { .. } | Self::TurnStarted { .. } => EventPriority::Normal,
            Self::UnitDied { .. } | Self::UnitRevived { .. } | Self::LastUnitStanding { .. } => {
                EventPriority::High
            }
            Self::TeamEliminated { .. } | Self::MatchEnded { .. } => EventPriority::Critical,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::UnitDamaged {
                unit,
                source,
                amount,
                remaining,
                critical,
            } => {
                let crit = if *critical { " critical" } else { "" };
                match source {
                    Some(src) => format!(
                        "unit {unit} took {amount}{crit} damage from unit {src} ({remaining} left)"
                    ),
                    None => format!("unit {unit} took {amount}{crit} damage ({remaining} left)"),
                }
            }
            Self::UnitHealed {
                unit,
                amount,
                current,
            } => format!("unit {unit} healed {amount} (now {current})"),
            Self::UnitDied { unit, killer } => match killer {
                Some(k) => format!("unit {unit} was killed by unit {k}"),
                None => format!("unit {unit} died"),
            },
            Self::UnitRevived { unit, health } => format!("unit {unit} revived with {health} health"),
            Self::UnitMoved { unit, from, to } => format!("unit {unit} moved {from} -> {to}"),
            Self::TurnStarted { team, turn } => format!("turn {turn} begins for {team}"),
            Self::LastUnitStanding { team, unit } => {
                format!("unit {unit} is the last one standing for {team}")
            }
            Self::TeamEliminated { team } => format!("{team} has been eliminated"),
            Self::MatchEnded { winner } => match winner {
                Some(team) => format!("{team} wins the match"),
                None => "the match ends in a draw".to_string(),
            },
        }
    }
}

/// A timestamped, prioritized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Payload.
    pub kind: EventKind,
    /// Dispatch priority.
    pub priority: EventPriority,
    /// Tick at which the event happened.
    pub tick: u64,
    /// Human-readable description; part of the deduplication key.
    pub description: String,
}

impl GameEvent {
    /// Create an event with the kind's default priority and description.
    #[must_use]
    pub fn new(kind: EventKind, tick: u64) -> Self {
        let priority = kind.default_priority();
        let description = kind.describe();
        Self {
            kind,
            priority,
            tick,
            description,
        }
    }

    /// Override the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Discriminator of the payload.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// Anything that accepts published events.
pub trait EventSink {
    /// Accept one event.
    fn publish(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn publish(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Sound to play for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Regular hit.
    Hit,
    /// Critical hit.
    CriticalHit,
    /// Unit death.
    Death,
    /// Healing.
    Heal,
    /// Movement.
    Footstep,
    /// Turn change.
    TurnChime,
    /// Match end.
    Fanfare,
}

/// Visual effect to spawn for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualCue {
    /// Floating damage number over a unit.
    DamageNumber {
        /// Unit hit.
        unit: UnitId,
        /// Damage shown.
        amount: u32,
        /// Use the critical style.
        critical: bool,
    },
    /// Floating heal number over a unit.
    HealNumber {
        /// Unit healed.
        unit: UnitId,
        /// Amount shown.
        amount: u32,
    },
    /// Death effect at a unit.
    DeathEffect {
        /// Unit that died.
        unit: UnitId,
    },
    /// Revival effect at a unit.
    ReviveEffect {
        /// Unit revived.
        unit: UnitId,
    },
    /// Full-screen banner.
    Banner {
        /// Banner text.
        text: String,
    },
}

/// Audio collaborator.
pub trait AudioSink {
    /// Play a sound.
    fn play(&mut self, cue: SoundCue);
}

/// Visual effects collaborator.
pub trait VisualSink {
    /// Spawn a visual effect.
    fn show(&mut self, cue: VisualCue);
}

/// UI collaborator.
pub trait UiSink {
    /// Present an event to the player (log line, toast, health bar update).
    fn notify(&mut self, event: &GameEvent);
}

/// Counters kept by the broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BroadcastStats {
    /// Events accepted into the queue.
    pub published: u64,
    /// Events dropped as duplicates.
    pub duplicates_dropped: u64,
    /// Events evicted by the overflow policy.
    pub evicted: u64,
    /// Events handed to sinks.
    pub dispatched: u64,
}

#[derive(Debug, Clone)]
struct QueuedEvent {
    seq: u64,
    event: GameEvent,
}

/// Bounded, deduplicating, priority-ordered event queue.
pub struct EventBroadcaster {
    config: BroadcasterConfig,
    queue: Vec<QueuedEvent>,
    next_seq: u64,
    recent: HashMap<(EventType, String), u64>,
    stats: BroadcastStats,
    audio: Option<Box<dyn AudioSink + Send>>,
    visual: Option<Box<dyn VisualSink + Send>>,
    ui: Option<Box<dyn UiSink + Send>>,
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("config", &self.config)
            .field("queued", &self.queue.len())
            .field("stats", &self.stats)
            .field("audio", &self.audio.is_some())
            .field("visual", &self.visual.is_some())
            .field("ui", &self.ui.is_some())
            .finish()
    }
}

impl EventBroadcaster {
    /// Create a headless broadcaster.
    #[must_use]
    pub fn new(config: BroadcasterConfig) -> Self {
        Self {
            config,
            queue: Vec::new(),
            next_seq: 0,
            recent: HashMap::new(),
            stats: BroadcastStats::default(),
            audio: None,
            visual: None,
            ui: None,
        }
    }

    /// Attach an audio collaborator.
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink + Send>) {
        self.audio = Some(sink);
    }

    /// Attach a visual collaborator.
    pub fn set_visual_sink(&mut self, sink: Box<dyn VisualSink + Send>) {
        self.visual = Some(sink);
    }

    /// Attach a UI collaborator.
    pub fn set_ui_sink(&mut self, sink: Box<dyn UiSink + Send>) {
        self.ui = Some(sink);
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> BroadcastStats {
        self.stats
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue an event. Returns false if it was dropped as a duplicate.
    pub fn enqueue(&mut self, event: GameEvent) -> bool {
        let key = (event.event_type(), event.description.clone());
        if self.config.dedupe_window_ticks > 0 {
            if let Some(&last) = self.recent.get(&key) {
                if event.tick.saturating_sub(last) < self.config.dedupe_window_ticks {
                    self.stats.duplicates_dropped += 1;
                    tracing::trace!(description = %event.description, "Dropped duplicate event");
                    return false;
                }
            }
            self.recent.insert(key, event.tick);
        }

        if self.queue.len() >= self.config.max_queue {
            self.evict_lowest_quartile();
        }

        self.queue.push(QueuedEvent {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
        self.stats.published += 1;
        true
    }

    fn evict_lowest_quartile(&mut self) {
        let count = self.queue.len().div_ceil(4).max(1);
        let mut order: Vec<(EventPriority, u64)> =
            self.queue.iter().map(|q| (q.event.priority, q.seq)).collect();
        order.sort_unstable();
        let victims: Vec<u64> = order.iter().take(count).map(|(_, seq)| *seq).collect();

        self.queue.retain(|q| !victims.contains(&q.seq));
        self.stats.evicted += victims.len() as u64;
        tracing::debug!(evicted = victims.len(), "Event queue overflow");
    }

    /// Dispatch up to `max_per_tick` events, highest priority first.
    ///
    /// Returns the dispatched events in dispatch order.
    pub fn process(&mut self, tick: u64) -> Vec<GameEvent> {
        let window = self.config.dedupe_window_ticks;
        self.recent
            .retain(|_, seen| tick.saturating_sub(*seen) < window);

        if self.queue.is_empty() {
            return Vec::new();
        }

        self.queue
            .sort_by(|a, b| b.event.priority.cmp(&a.event.priority).then(a.seq.cmp(&b.seq)));
        let take = self.config.max_per_tick.min(self.queue.len());
        let batch: Vec<GameEvent> = self.queue.drain(..take).map(|q| q.event).collect();

        for event in &batch {
            self.dispatch(event);
        }
        self.stats.dispatched += batch.len() as u64;
        batch
    }

    /// Dispatch everything queued regardless of the per-tick budget.
    pub fn flush(&mut self, tick: u64) -> Vec<GameEvent> {
        let mut all = Vec::new();
        while !self.queue.is_empty() {
            all.extend(self.process(tick));
        }
        all
    }

    fn dispatch(&mut self, event: &GameEvent) {
        tracing::debug!(
            tick = event.tick,
            priority = ?event.priority,
            "{}",
            event.description
        );

        if let Some(audio) = self.audio.as_mut() {
            if let Some(cue) = sound_for(&event.kind) {
                audio.play(cue);
            }
        }
        if let Some(visual) = self.visual.as_mut() {
            if let Some(cue) = visual_for(event) {
                visual.show(cue);
            }
        }
        if let Some(ui) = self.ui.as_mut() {
            ui.notify(event);
        }
    }
}

impl EventSink for EventBroadcaster {
    fn publish(&mut self, event: GameEvent) {
        self.enqueue(event);
    }
}

fn sound_for(kind: &EventKind) -> Option<SoundCue> {
    match kind {
        EventKind::UnitDamaged { critical: true, .. } => Some(SoundCue::CriticalHit),
        EventKind::UnitDamaged { .. } => Some(SoundCue::Hit),
        EventKind::UnitHealed { .. } | EventKind::UnitRevived { .. } => Some(SoundCue::Heal),
        EventKind::UnitDied { .. } => Some(SoundCue::Death),
        EventKind::UnitMoved { .. } => Some(SoundCue::Footstep),
        EventKind::TurnStarted { .. } => Some(SoundCue::TurnChime),
        EventKind::MatchEnded { .. } => Some(SoundCue::Fanfare),
        EventKind::LastUnitStanding { .. } | EventKind::TeamEliminated { .. } => None,
    }
}

fn visual_for(event: &GameEvent) -> Option<VisualCue> {
    match &event.kind {
        EventKind::UnitDamaged {
            unit,
            amount,
            critical,
            ..
        } => Some(VisualCue::DamageNumber {
            unit: *unit,
            amount: *amount,
            critical: *critical,
        }),
        EventKind::UnitHealed { unit, amount, .. } => Some(VisualCue::HealNumber {
            unit: *unit,
            amount: *amount,
        }),
        EventKind::UnitDied { unit, .. } => Some(VisualCue::DeathEffect { unit: *unit }),
        EventKind::UnitRevived { unit, .. } => Some(VisualCue::ReviveEffect { unit: *unit }),
        EventKind::TeamEliminated { .. } | EventKind::MatchEnded { .. } => {
            Some(VisualCue::Banner {
                text: event.description.clone(),
            })
        }
        EventKind::UnitMoved { .. }
        | EventKind::TurnStarted { .. }
        | EventKind::LastUnitStanding { .. } => None,
    }
}
