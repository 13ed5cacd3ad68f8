//! Interactive session: owns the current PlayerState version and gates
//! re-entry while an adventure is in flight.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rand::RngCore;

use super::apply::{apply_reputation_choice, StandardStats};
use super::harvest::{plant_herb, HarvestPoller};
use super::logic::{AdventureEngine, AdventureReport, AdventureRequest, PACING_STEPS};
use super::sect::BattleResolver;
use super::state::{LogEntry, LogSink, Notice, PlayerState, Tone};
use super::templates::{EventCategory, ReputationEvent};
use crate::error::CoreError;
use crate::time::PollClock;

/// Player-visible log length.
pub const MAX_LOG: usize = 30;

/// Gap between automatic adventures.
pub const AUTO_INTERVAL_MS: u64 = 3_000;

pub const RECOVERED_TEXT: &str = "Something went wrong, but you returned safely.";

/// An outcome waiting for its pacing lines to play out.
struct Reveal {
    report: AdventureReport,
    step: usize,
    next_at_ms: u64,
}

pub struct AdventureSession {
    engine: AdventureEngine,
    state: PlayerState,
    log: Vec<LogEntry>,
    notices: Vec<Notice>,
    loading: bool,
    auto: Option<EventCategory>,
    auto_clock: PollClock,
    pending_boss: Option<String>,
    pending_choice: Option<ReputationEvent>,
    pacing: bool,
    reveal: Option<Reveal>,
    harvest: HarvestPoller,
}

impl AdventureSession {
    pub fn new(engine: AdventureEngine, state: PlayerState) -> Self {
        let config = engine.config();
        let harvest = HarvestPoller::new(config.harvest_interval_ms, config.harvest_debounce_ms);
        Self {
            engine,
            state,
            log: Vec::new(),
            notices: Vec::new(),
            loading: false,
            auto: None,
            auto_clock: PollClock::new(AUTO_INTERVAL_MS, 0),
            pending_boss: None,
            pending_choice: None,
            pacing: false,
            reveal: None,
            harvest,
        }
    }

    /// Stagger outcomes behind `PACING_STEPS`. Off by default.
    pub fn with_pacing(mut self, on: bool) -> Self {
        self.pacing = on;
        self
    }

    pub fn engine(&self) -> &AdventureEngine {
        &self.engine
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn auto_category(&self) -> Option<EventCategory> {
        self.auto
    }

    /// Auto-adventure is on but held back by a pending boss.
    pub fn is_auto_paused(&self) -> bool {
        self.auto.is_some() && self.pending_boss.is_some()
    }

    pub fn pending_boss(&self) -> Option<&str> {
        self.pending_boss.as_deref()
    }

    pub fn pending_choice(&self) -> Option<&ReputationEvent> {
        self.pending_choice.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn add_log(&mut self, text: &str, tone: Tone) {
        self.log.add_log(text, tone);
        self.trim_log();
    }

    fn trim_log(&mut self) {
        if self.log.len() > MAX_LOG {
            let excess = self.log.len() - MAX_LOG;
            self.log.drain(..excess);
        }
    }

    /// New adventures wait for the in-flight one and for any prompt.
    fn can_start(&self) -> bool {
        !self.loading && self.pending_boss.is_none() && self.pending_choice.is_none()
    }

    // ── Adventures ─────────────────────────────────────────────

    /// Start one adventure. Returns false when the session is busy.
    pub fn adventure(
        &mut self,
        request: AdventureRequest,
        battle: &mut dyn BattleResolver,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> bool {
        if !self.can_start() {
            return false;
        }
        self.loading = true;
        self.guarded(now_ms, |engine, state| {
            engine.run(state, request, battle, rng, now_ms)
        });
        true
    }

    /// Answer the boss prompt. Either way auto-adventure resumes.
    pub fn confirm_boss(
        &mut self,
        accept: bool,
        battle: &mut dyn BattleResolver,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> bool {
        if self.loading {
            return false;
        }
        let Some(boss_id) = self.pending_boss.take() else {
            return false;
        };
        if !accept {
            self.add_log("You slip away before it notices you.", Tone::Normal);
            return true;
        }
        self.loading = true;
        self.guarded(now_ms, |engine, state| {
            engine.challenge_boss(state, &boss_id, battle, rng, now_ms)
        });
        true
    }

    /// Apply the option the player picked for the pending reputation event.
    pub fn choose_reputation(&mut self, index: usize) -> Result<(), CoreError> {
        let event = self
            .pending_choice
            .as_ref()
            .ok_or_else(|| CoreError::invalid_argument("no reputation choice is pending"))?;
        let stats = StandardStats {
            catalog: self.engine.catalog(),
        };
        let (state, log) = apply_reputation_choice(&self.state, event, index, &stats)?;
        self.state = state;
        self.pending_choice = None;
        for entry in log {
            self.add_log(&entry.text, entry.tone);
        }
        Ok(())
    }

    /// Run `f` behind the panic boundary, then reveal or queue its report.
    /// The boundary only catches on unwinding targets. Panics abort on
    /// wasm32, where the host has just `console_error_panic_hook`.
    fn guarded<F>(&mut self, now_ms: u64, f: F)
    where
        F: FnOnce(&AdventureEngine, &PlayerState) -> AdventureReport,
    {
        let engine = &self.engine;
        let state = &self.state;
        match catch_unwind(AssertUnwindSafe(|| f(engine, state))) {
            Ok(report) if self.pacing => {
                let first = PACING_STEPS[0];
                self.add_log(first.text, Tone::Normal);
                self.reveal = Some(Reveal {
                    report,
                    step: 0,
                    next_at_ms: now_ms + first.delay_ms,
                });
            }
            Ok(report) => self.finish(report),
            Err(_) => {
                tracing::error!("adventure aborted by a panic; state left unchanged");
                self.reveal = None;
                self.add_log(RECOVERED_TEXT, Tone::Danger);
                self.loading = false;
            }
        }
    }

    fn finish(&mut self, report: AdventureReport) {
        self.state = report.state;
        self.log.extend(report.log);
        self.trim_log();
        self.notices.extend(report.notices);
        if report.pending_choice.is_some() {
            self.pending_choice = report.pending_choice;
        }
        if let Some(boss) = report.pending_boss {
            if self.auto.is_some() {
                tracing::debug!(boss = %boss, "auto-adventure paused for boss");
            }
            self.pending_boss = Some(boss);
        }
        self.loading = false;
    }

    /// Advance queued pacing lines. Call every frame.
    pub fn tick(&mut self, now_ms: u64) {
        loop {
            let line = {
                let Some(reveal) = self.reveal.as_mut() else {
                    return;
                };
                if now_ms < reveal.next_at_ms {
                    return;
                }
                reveal.step += 1;
                PACING_STEPS.get(reveal.step).map(|step| {
                    reveal.next_at_ms += step.delay_ms;
                    step.text
                })
            };
            match line {
                Some(text) => self.add_log(text, Tone::Normal),
                None => {
                    if let Some(reveal) = self.reveal.take() {
                        self.finish(reveal.report);
                    }
                }
            }
        }
    }

    // ── Auto-adventure ─────────────────────────────────────────

    pub fn set_auto(&mut self, category: Option<EventCategory>) {
        self.auto = category;
        match category {
            Some(c) => self.add_log(&format!("Auto-adventure: {}.", category_label(c)), Tone::Normal),
            None => self.add_log("Auto-adventure stopped.", Tone::Normal),
        }
    }

    /// Scheduled auto-adventure. Returns true when one was started.
    pub fn poll_auto(
        &mut self,
        battle: &mut dyn BattleResolver,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> bool {
        if !self.auto_clock.update(now_ms as f64) {
            return false;
        }
        match self.auto {
            Some(category) if self.can_start() => {
                self.adventure(AdventureRequest::new(category), battle, rng, now_ms)
            }
            _ => false,
        }
    }

    // ── Planting ───────────────────────────────────────────────

    // State edits below wait for the in-flight adventure: its report was
    // computed from the state at launch and replaces it on reveal.

    pub fn plant(&mut self, herb_name: &str, now_ms: u64) -> bool {
        if self.loading {
            return false;
        }
        let (state, log) = plant_herb(&self.state, herb_name, now_ms);
        self.state = state;
        for entry in log {
            self.add_log(&entry.text, entry.tone);
        }
        true
    }

    pub fn toggle_auto_harvest(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.state.auto_harvest = !self.state.auto_harvest;
        let text = if self.state.auto_harvest {
            "Auto-harvest enabled."
        } else {
            "Auto-harvest disabled."
        };
        self.add_log(text, Tone::Normal);
        true
    }

    /// Scheduled harvest. Skipped while an adventure is in flight so its
    /// result is not applied over a stale state.
    pub fn poll_harvest(&mut self, now_ms: u64) -> bool {
        if self.loading {
            return false;
        }
        let collected = self.harvest.poll(&self.state, now_ms, self.engine.catalog());
        self.absorb_harvest(collected)
    }

    pub fn harvest_now(&mut self, now_ms: u64) -> bool {
        if self.loading {
            return false;
        }
        let collected = self.harvest.request(&self.state, now_ms, self.engine.catalog());
        self.absorb_harvest(collected)
    }

    fn absorb_harvest(&mut self, collected: Option<(PlayerState, Vec<LogEntry>)>) -> bool {
        let Some((state, log)) = collected else {
            return false;
        };
        self.state = state;
        for entry in log {
            self.add_log(&entry.text, entry.tone);
        }
        true
    }
}

pub fn category_label(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Normal => "Wander",
        EventCategory::Lucky => "Fortune",
        EventCategory::SecretRealm => "Secret Realm",
        EventCategory::SectChallenge => "Sect Mission",
    }
}
