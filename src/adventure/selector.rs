//! Template selection: category filter, realm gates, progression weights.
//!
//! Weights are relative, never cutoffs. The only hard exclusions are the
//! realm gates carried on each template.

use rand::{Rng, RngCore};

use super::state::{progress, Rarity, Realm};
use super::templates::{EventCategory, EventPayload, EventTemplate, RiskLevel, ALL_RISKS};

const MIN_TEMPLATE_WEIGHT: f64 = 0.05;

/// Relative weight of each risk tier for a player at progress `p`.
pub fn risk_weights(p: f64) -> [f64; 4] {
    let p = p.clamp(0.0, 1.0);
    [
        (0.45 - 0.35 * p).clamp(0.05, 0.45),
        0.30,
        0.20 + 0.15 * p,
        0.05 + 0.25 * p,
    ]
}

/// Index picked by `roll` in [0, 1) over `weights`. None when every
/// weight is zero or the slice is empty.
pub fn weighted_index(weights: &[f64], roll: f64) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let mut target = roll.clamp(0.0, 1.0) * total;
    let mut last = None;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if target < *w {
            return Some(i);
        }
        target -= w;
        last = Some(i);
    }
    last
}

pub fn pick_risk(p: f64, rng: &mut dyn RngCore) -> RiskLevel {
    let roll: f64 = rng.gen();
    weighted_index(&risk_weights(p), roll)
        .map(|i| ALL_RISKS[i])
        .unwrap_or(RiskLevel::Low)
}

fn rarity_factor(rarity: Rarity, p: f64) -> f64 {
    match rarity {
        Rarity::Common => 1.5 - p,
        Rarity::Rare => 1.0,
        Rarity::Legendary => 0.5 + 1.5 * p,
        Rarity::Mythic => 0.2 + 2.0 * p,
    }
}

/// Progression-steered weight for one normal template.
pub fn template_weight(template: &EventTemplate, p: f64) -> f64 {
    let mut weight = 1.0;

    if let Some(rarity) = template.payload.items().iter().map(|i| i.rarity).max() {
        weight *= rarity_factor(rarity, p);
    }

    let magnitude = (template.deltas.exp + template.deltas.spirit_stones).abs() as f64;
    if magnitude > 100.0 {
        weight *= 1.0 + p * (magnitude / 100.0).min(3.0);
    }

    if matches!(template.payload, EventPayload::Pet { .. }) {
        weight *= 1.0 + p;
    }

    weight.max(MIN_TEMPLATE_WEIGHT)
}

fn uniform<'a>(candidates: &[&'a EventTemplate], rng: &mut dyn RngCore) -> Option<&'a EventTemplate> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

/// Pick one template for `category`, steered by the player's progression.
///
/// `risk` only applies to secret-realm adventures; when absent there, a
/// tier is drawn from [`risk_weights`] first.
pub fn select_template<'a>(
    pool: &'a [EventTemplate],
    category: EventCategory,
    risk: Option<RiskLevel>,
    realm: Realm,
    realm_level: u32,
    rng: &mut dyn RngCore,
) -> Option<&'a EventTemplate> {
    let p = progress(realm, realm_level);
    let gated: Vec<&EventTemplate> = pool.iter().filter(|t| t.gate.contains(realm)).collect();

    let mut candidates: Vec<&EventTemplate> = gated
        .iter()
        .copied()
        .filter(|t| t.category == category)
        .collect();

    if category == EventCategory::SecretRealm {
        let tier = risk.unwrap_or_else(|| pick_risk(p, rng));
        let at_tier: Vec<&EventTemplate> = candidates
            .iter()
            .copied()
            .filter(|t| t.risk_level == Some(tier))
            .collect();
        if !at_tier.is_empty() {
            candidates = at_tier;
        }
    }

    if category == EventCategory::Normal && !candidates.is_empty() {
        let weights: Vec<f64> = candidates.iter().map(|t| template_weight(t, p)).collect();
        let roll: f64 = rng.gen();
        if let Some(i) = weighted_index(&weights, roll) {
            tracing::debug!(template = candidates[i].id, "weighted normal pick");
            return Some(candidates[i]);
        }
    }

    uniform(&candidates, rng).or_else(|| {
        tracing::debug!(?category, "no candidates in category, using whole pool");
        uniform(&gated, rng)
    })
}
