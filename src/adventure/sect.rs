//! Battle outcomes and the sect hunt state machine.
//!
//! Battles are resolved elsewhere; this module only turns an outcome into
//! an `AdventureResult` and advances the hunt.

use std::collections::BTreeMap;

use super::content::ContentCatalog;
use super::convert::AdventureResult;
use super::state::{
    HuntState, Item, Membership, PlayerState, SectRank, Tone, HUNT_DURATION_MS, MAX_HUNT_LEVEL,
};
use super::templates::{Deltas, EventCategory, EventKind, EventPayload, RiskLevel};

/// Resolves a fight. Turn-by-turn arithmetic lives behind this seam.
pub trait BattleResolver {
    fn resolve(
        &mut self,
        player: &PlayerState,
        category: EventCategory,
        risk: Option<RiskLevel>,
        boss_id: Option<&str>,
    ) -> BattleOutcome;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BattleOutcome {
    pub victory: bool,
    pub hp_loss: i64,
    pub exp_change: i64,
    pub spirit_stones_change: i64,
    pub items: Vec<Item>,
    /// Skill id → cooldown turns left on the active pet.
    pub pet_cooldowns: BTreeMap<String, u32>,
    pub summary: String,
    /// Sect the opponent belonged to, if any.
    pub opponent_sect: Option<String>,
}

impl BattleOutcome {
    pub fn into_result(self, category: EventCategory, risk: Option<RiskLevel>) -> AdventureResult {
        let tone = if self.victory { Tone::Gain } else { Tone::Danger };
        let payload = if self.items.is_empty() {
            EventPayload::None
        } else {
            EventPayload::Loot(self.items)
        };
        AdventureResult {
            template_id: None,
            category,
            kind: EventKind::BattleResolved,
            risk_level: risk,
            story: self.summary,
            tone,
            deltas: Deltas {
                hp: -self.hp_loss.abs(),
                exp: self.exp_change,
                spirit_stones: self.spirit_stones_change,
                ..Deltas::default()
            },
            payload,
            bonus: None,
            pet_cooldowns: self.pet_cooldowns,
        }
    }
}

/// What one battle did to the hunt. Exactly one per battle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HuntTransition {
    None,
    /// Killing a sect member started a hunt.
    Started { sect_id: String },
    /// Killing an assassin raised the hunt level.
    Escalated { sect_id: String, level: u8 },
    /// Surviving the last hunt level handed the player the sect.
    LeadershipClaimed { sect_id: String },
    /// The hunt ran out.
    Lifted { sect_id: String },
}

impl HuntTransition {
    pub fn describe(&self, catalog: &ContentCatalog) -> Option<(String, Tone)> {
        let name = |id: &str| {
            catalog
                .sect(id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        match self {
            HuntTransition::None => None,
            HuntTransition::Started { sect_id } => Some((
                format!("The {} has put a price on your head!", name(sect_id)),
                Tone::Danger,
            )),
            HuntTransition::Escalated { sect_id, level } => Some((
                format!("The {} sends stronger assassins (hunt level {}).", name(sect_id), level),
                Tone::Danger,
            )),
            HuntTransition::LeadershipClaimed { sect_id } => Some((
                format!("With its last champion dead, the {} bows to you as leader.", name(sect_id)),
                Tone::Special,
            )),
            HuntTransition::Lifted { sect_id } => Some((
                format!("The {} has given up the hunt.", name(sect_id)),
                Tone::Normal,
            )),
        }
    }
}

/// Record the battle on `state` and advance the hunt.
pub fn settle_battle(state: &mut PlayerState, outcome: &BattleOutcome, now_ms: u64) -> HuntTransition {
    if outcome.victory {
        state.stats.battles_won += 1;
    } else {
        state.stats.battles_lost += 1;
    }

    let expired = match &state.hunt {
        Some(h) if !h.is_active(now_ms) => Some(h.sect_id.clone()),
        _ => None,
    };
    if expired.is_some() {
        state.hunt = None;
    }

    let slain = match (&outcome.opponent_sect, outcome.victory) {
        (Some(sect), true) if state.sect_id() != Some(sect.as_str()) => Some(sect.clone()),
        _ => None,
    };
    let Some(sect_id) = slain else {
        return match expired {
            Some(sect_id) => HuntTransition::Lifted { sect_id },
            None => HuntTransition::None,
        };
    };
    state.stats.sect_members_slain += 1;

    let current = state
        .hunt
        .as_ref()
        .filter(|h| h.sect_id == sect_id)
        .map(|h| h.level);
    let escalates = matches!(current, Some(level) if level < MAX_HUNT_LEVEL);
    let claims = matches!(current, Some(level) if level >= MAX_HUNT_LEVEL);
    debug_assert!(!(escalates && claims), "hunt cannot escalate and end in the same battle");

    if claims {
        state.hunt = None;
        state.sect = Some(Membership {
            sect_id: sect_id.clone(),
            rank: SectRank::Leader,
            contribution: 0,
        });
        return HuntTransition::LeadershipClaimed { sect_id };
    }

    let level = if escalates { current.unwrap_or(0) + 1 } else { 1 };
    state.hunt = Some(HuntState {
        sect_id: sect_id.clone(),
        level,
        until_ms: now_ms + HUNT_DURATION_MS,
    });
    if escalates {
        HuntTransition::Escalated { sect_id, level }
    } else {
        HuntTransition::Started { sect_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(sect: &str) -> BattleOutcome {
        BattleOutcome {
            victory: true,
            summary: "You won.".into(),
            opponent_sect: Some(sect.into()),
            ..BattleOutcome::default()
        }
    }

    #[test]
    fn first_kill_starts_a_hunt() {
        let mut s = PlayerState::new("Lin");
        let t = settle_battle(&mut s, &kill("sect-blood-demon"), 0);
        assert_eq!(t, HuntTransition::Started { sect_id: "sect-blood-demon".into() });
        assert_eq!(s.hunt.as_ref().unwrap().level, 1);
        assert_eq!(s.stats.sect_members_slain, 1);
    }

    #[test]
    fn hunt_escalates_then_hands_over_the_sect() {
        let mut s = PlayerState::new("Lin");
        let mut now = 0;
        settle_battle(&mut s, &kill("sect-blood-demon"), now);
        for expected in 2..=MAX_HUNT_LEVEL {
            now += 1000;
            let t = settle_battle(&mut s, &kill("sect-blood-demon"), now);
            assert_eq!(t, HuntTransition::Escalated { sect_id: "sect-blood-demon".into(), level: expected });
        }
        let t = settle_battle(&mut s, &kill("sect-blood-demon"), now + 1000);
        assert_eq!(t, HuntTransition::LeadershipClaimed { sect_id: "sect-blood-demon".into() });
        assert!(s.hunt.is_none());
        assert_eq!(s.sect.as_ref().unwrap().rank, SectRank::Leader);
    }

    #[test]
    fn expired_hunt_lifts() {
        let mut s = PlayerState::new("Lin");
        settle_battle(&mut s, &kill("sect-blood-demon"), 0);
        let t = settle_battle(&mut s, &BattleOutcome::default(), HUNT_DURATION_MS + 1);
        assert_eq!(t, HuntTransition::Lifted { sect_id: "sect-blood-demon".into() });
        assert!(s.hunt.is_none());
        assert_eq!(s.stats.battles_lost, 1);
    }

    #[test]
    fn own_sect_and_defeats_do_nothing() {
        let mut s = PlayerState::new("Lin");
        s.sect = Some(Membership {
            sect_id: "sect-azure-cloud".into(),
            rank: SectRank::Outer,
            contribution: 0,
        });
        assert_eq!(settle_battle(&mut s, &kill("sect-azure-cloud"), 0), HuntTransition::None);
        let mut lost = kill("sect-blood-demon");
        lost.victory = false;
        assert_eq!(settle_battle(&mut s, &lost, 0), HuntTransition::None);
        assert!(s.hunt.is_none());
    }

    #[test]
    fn outcome_becomes_result() {
        let outcome = BattleOutcome {
            victory: false,
            hp_loss: 30,
            exp_change: 5,
            summary: "The wolf bit deep.".into(),
            ..BattleOutcome::default()
        };
        let r = outcome.into_result(EventCategory::Normal, None);
        assert_eq!(r.deltas.hp, -30);
        assert_eq!(r.tone, Tone::Danger);
        assert_eq!(r.kind, EventKind::BattleResolved);
        assert_eq!(r.payload, EventPayload::None);
    }
}
