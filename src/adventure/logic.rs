//! Adventure handler. Decides what kind of adventure happens and runs it
//! through selection, conversion and application.
//!
//! Pure with respect to PlayerState: every entry point takes the previous
//! version and returns a report carrying the next one.

use rand::{Rng, RngCore};

use super::apply::{apply, ApplyContext, Applied, DerivedStats, StandardStats};
use super::content::ContentCatalog;
use super::convert::{convert, AdventureResult, PlayerSnapshot};
use super::sect::{settle_battle, BattleResolver, HuntTransition};
use super::selector::{pick_risk, select_template};
use super::state::{progress, LogEntry, LogSink, Notice, PlayerState, Tone};
use super::templates::{EventCategory, EventTemplate, ReputationEvent, RiskLevel, TemplatePool};
use crate::config::EngineConfig;
use crate::error::CoreError;

/// One narrative beat shown before the outcome, and how long it lingers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingStep {
    pub text: &'static str,
    pub delay_ms: u64,
}

/// Set out → explore → reveal.
pub const PACING_STEPS: [PacingStep; 3] = [
    PacingStep { text: "You set out from your cave abode...", delay_ms: 600 },
    PacingStep { text: "You explore deeper into the wilds...", delay_ms: 900 },
    PacingStep { text: "Something happens!", delay_ms: 500 },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdventureRequest {
    pub category: EventCategory,
    /// Secret-realm only. Drawn from progression when absent.
    pub risk: Option<RiskLevel>,
}

impl AdventureRequest {
    pub fn new(category: EventCategory) -> Self {
        Self { category, risk: None }
    }

    pub fn secret_realm(risk: RiskLevel) -> Self {
        Self {
            category: EventCategory::SecretRealm,
            risk: Some(risk),
        }
    }
}

/// Everything one adventure action produced.
#[derive(Debug)]
pub struct AdventureReport {
    pub state: PlayerState,
    pub log: Vec<LogEntry>,
    pub notices: Vec<Notice>,
    pub pending_choice: Option<ReputationEvent>,
    pub pending_boss: Option<String>,
    pub hunt: HuntTransition,
}

impl AdventureReport {
    fn quiet(state: PlayerState, log: Vec<LogEntry>) -> Self {
        Self {
            state,
            log,
            notices: Vec::new(),
            pending_choice: None,
            pending_boss: None,
            hunt: HuntTransition::None,
        }
    }

    fn absorb(&mut self, applied: Applied) {
        self.state = applied.state;
        self.log.extend(applied.log);
        self.notices.extend(applied.notices);
        self.pending_choice = self.pending_choice.take().or(applied.pending_choice);
        self.pending_boss = self.pending_boss.take().or(applied.pending_boss);
    }
}

pub struct AdventureEngine {
    catalog: ContentCatalog,
    config: EngineConfig,
    pool: TemplatePool,
}

impl AdventureEngine {
    pub fn new(catalog: ContentCatalog, config: EngineConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let catalog = catalog.with_diagnostics(config.diagnostics);
        let mut pool = TemplatePool::new();
        pool.ensure_generated(&catalog, &config.template_counts);
        Ok(Self { catalog, config, pool })
    }

    /// Engine over the bundled content with default tunables.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::new(ContentCatalog::builtin()?, EngineConfig::default())
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn templates(&self) -> &[EventTemplate] {
        self.pool.templates()
    }

    pub fn actual_max_hp(&self, state: &PlayerState) -> i64 {
        StandardStats { catalog: &self.catalog }.actual_max_hp(state)
    }

    fn battle_chance(&self, category: EventCategory) -> f64 {
        let chances = &self.config.battle_chances;
        match category {
            EventCategory::Normal => chances.normal,
            EventCategory::Lucky => chances.lucky,
            EventCategory::SecretRealm => chances.secret_realm,
            EventCategory::SectChallenge => chances.sect_challenge,
        }
    }

    fn apply_result(&self, prev: &PlayerState, result: &AdventureResult, rng: &mut dyn RngCore) -> Applied {
        let stats = StandardStats { catalog: &self.catalog };
        let ctx = ApplyContext {
            catalog: &self.catalog,
            config: &self.config,
            stats: &stats,
        };
        apply(prev, result, &ctx, rng)
    }

    fn snapshot(&self, state: &PlayerState) -> PlayerSnapshot {
        PlayerSnapshot {
            realm: state.realm,
            realm_level: state.realm_level,
            actual_max_hp: self.actual_max_hp(state),
        }
    }

    /// Select, convert and apply one template. None when nothing matched.
    fn run_template(
        &self,
        prev: &PlayerState,
        category: EventCategory,
        risk: Option<RiskLevel>,
        rng: &mut dyn RngCore,
    ) -> Option<Applied> {
        let template = select_template(
            self.pool.templates(),
            category,
            risk,
            prev.realm,
            prev.realm_level,
            rng,
        )?;
        tracing::debug!(id = template.id, kind = ?template.kind, "template selected");
        let result = convert(template, &self.snapshot(prev), &self.catalog, rng);
        Some(self.apply_result(prev, &result, rng))
    }

    /// Run one adventure action.
    pub fn run(
        &self,
        prev: &PlayerState,
        request: AdventureRequest,
        battle: &mut dyn BattleResolver,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> AdventureReport {
        let mut log = Vec::new();
        let mut category = request.category;
        if category == EventCategory::SectChallenge && prev.sect.is_none() {
            log.add_log("You belong to no sect, so you wander the wilds instead.", Tone::Normal);
            category = EventCategory::Normal;
        }
        let risk = match category {
            EventCategory::SecretRealm => Some(
                request
                    .risk
                    .unwrap_or_else(|| pick_risk(progress(prev.realm, prev.realm_level), rng)),
            ),
            _ => None,
        };
        let mut report = AdventureReport::quiet(prev.clone(), log);

        if rng.gen::<f64>() < self.battle_chance(category) {
            let outcome = battle.resolve(prev, category, risk, None);
            let mut applied = self.apply_result(prev, &outcome.clone().into_result(category, risk), rng);
            let hunt = settle_battle(&mut applied.state, &outcome, now_ms);
            report.absorb(applied);
            self.log_hunt(&mut report, hunt);
            return report;
        }

        let Some(applied) = self.run_template(prev, category, risk, rng) else {
            report
                .log
                .add_log("The journey was uneventful.", Tone::Normal);
            return report;
        };
        let chain = applied.chain_secret_realm;
        report.absorb(applied);

        if chain {
            report
                .log
                .add_log("A hidden path opens into a secret realm!", Tone::Special);
            let state = report.state.clone();
            if let Some(mut follow) = self.run_template(&state, EventCategory::SecretRealm, None, rng) {
                follow.chain_secret_realm = false;
                report.absorb(follow);
            }
        }
        report
    }

    /// Fight a boss the player agreed to face.
    pub fn challenge_boss(
        &self,
        prev: &PlayerState,
        boss_id: &str,
        battle: &mut dyn BattleResolver,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> AdventureReport {
        let name = self
            .catalog
            .boss(boss_id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| boss_id.to_string());
        let mut log = Vec::new();
        log.add_log(&format!("You face the {}!", name), Tone::Danger);
        let mut report = AdventureReport::quiet(prev.clone(), log);

        let outcome = battle.resolve(prev, EventCategory::Normal, None, Some(boss_id));
        let victory = outcome.victory;
        let mut applied = self.apply_result(prev, &outcome.clone().into_result(EventCategory::Normal, None), rng);
        let hunt = settle_battle(&mut applied.state, &outcome, now_ms);
        report.absorb(applied);
        if victory {
            report
                .log
                .add_log(&format!("The {} has fallen by your hand!", name), Tone::Special);
        } else {
            report
                .log
                .add_log(&format!("The {} drove you back.", name), Tone::Danger);
        }
        self.log_hunt(&mut report, hunt);
        report
    }

    fn log_hunt(&self, report: &mut AdventureReport, hunt: HuntTransition) {
        if let Some((text, tone)) = hunt.describe(&self.catalog) {
            report.log.add_log(&text, tone);
        }
        report.hunt = hunt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::sect::BattleOutcome;
    use crate::adventure::state::{Membership, Realm, SectRank};
    use crate::config::BattleChances;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct AlwaysWin;

    impl BattleResolver for AlwaysWin {
        fn resolve(
            &mut self,
            _player: &PlayerState,
            _category: EventCategory,
            _risk: Option<RiskLevel>,
            _boss_id: Option<&str>,
        ) -> BattleOutcome {
            BattleOutcome {
                victory: true,
                hp_loss: 5,
                exp_change: 10,
                summary: "You won the fight.".into(),
                opponent_sect: Some("sect-blood-demon".into()),
                ..BattleOutcome::default()
            }
        }
    }

    fn engine(battle_chances: BattleChances) -> AdventureEngine {
        let config = EngineConfig {
            battle_chances,
            ..EngineConfig::default()
        };
        AdventureEngine::new(ContentCatalog::builtin().unwrap(), config).unwrap()
    }

    fn never() -> BattleChances {
        BattleChances {
            normal: 0.0,
            lucky: 0.0,
            secret_realm: 0.0,
            sect_challenge: 0.0,
        }
    }

    #[test]
    fn pool_is_generated_once_at_construction() {
        let e = engine(never());
        assert_eq!(e.templates().len(), e.config().template_counts.total());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_rules: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            AdventureEngine::new(ContentCatalog::builtin().unwrap(), config),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sect_challenge_without_sect_falls_back() {
        let e = engine(never());
        let mut rng = StdRng::seed_from_u64(2);
        let report = e.run(
            &PlayerState::new("Lin"),
            AdventureRequest::new(EventCategory::SectChallenge),
            &mut AlwaysWin,
            &mut rng,
            0,
        );
        assert!(report.log[0].text.contains("no sect"));
        assert_eq!(report.state.stats.adventures, 1);
    }

    #[test]
    fn sect_challenge_adds_contribution() {
        let e = engine(never());
        let mut rng = StdRng::seed_from_u64(2);
        let mut prev = PlayerState::new("Lin");
        prev.sect = Some(Membership {
            sect_id: "sect-azure-cloud".into(),
            rank: SectRank::Outer,
            contribution: 0,
        });
        let report = e.run(&prev, AdventureRequest::new(EventCategory::SectChallenge), &mut AlwaysWin, &mut rng, 0);
        assert!(report.state.sect.unwrap().contribution > 0);
    }

    #[test]
    fn battles_drive_the_hunt() {
        let e = engine(BattleChances {
            normal: 1.0,
            ..never()
        });
        let mut rng = StdRng::seed_from_u64(4);
        let report = e.run(&PlayerState::new("Lin"), AdventureRequest::new(EventCategory::Normal), &mut AlwaysWin, &mut rng, 0);
        assert!(matches!(report.hunt, HuntTransition::Started { .. }));
        assert_eq!(report.state.stats.battles_won, 1);
        assert!(report.log.iter().any(|l| l.text.contains("price on your head")));
    }

    #[test]
    fn boss_challenge_logs_outcome() {
        let e = engine(never());
        let mut rng = StdRng::seed_from_u64(4);
        let mut prev = PlayerState::new("Lin");
        prev.realm = Realm::NascentSoul;
        let report = e.challenge_boss(&prev, "boss-flood-dragon", &mut AlwaysWin, &mut rng, 0);
        assert!(report.log.iter().any(|l| l.text.contains("Ancient Flood Dragon has fallen")));
    }

    #[test]
    fn every_category_produces_a_report() {
        let e = engine(never());
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = PlayerState::new("Lin");
        for category in [EventCategory::Normal, EventCategory::Lucky, EventCategory::SecretRealm] {
            for _ in 0..20 {
                let report = e.run(&s, AdventureRequest::new(category), &mut AlwaysWin, &mut rng, 0);
                assert!(!report.log.is_empty());
                s = report.state;
                s.hp = e.actual_max_hp(&s);
            }
        }
        assert!(s.stats.adventures >= 60);
    }
}
