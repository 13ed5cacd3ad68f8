//! Result application: (previous state, result) → new state.
//!
//! Steps run in a fixed order; later steps read what earlier ones wrote.
//! The previous state is never touched. Nothing here returns an error to
//! the caller: single-item failures are logged and recovered.

use rand::{Rng, RngCore};

use super::content::{infer_kind, AdvancedItem, ContentCatalog};
use super::convert::AdventureResult;
use super::rng::{blend, hash_unit};
use super::state::{
    Affinities, Effect, EquipSlot, Item, ItemType, LogEntry, LogSink, Notice, NoticeKind, Pet,
    PlayerState, Rarity, Tone, AFFINITY_MAX, MAX_EVOLUTION_STAGE, MAX_PET_LEVEL, MAX_REALM_LEVEL,
};
use super::templates::{
    AttributeReduction, EventCategory, EventPayload, LuckyBonus, PetGrowth, PetGrowthKind,
    ReputationEvent, ADVANCED_TIER_REALMS,
};
use crate::config::EngineConfig;
use crate::error::CoreError;

/// Story fragments that guarantee a technique unlock.
const TECHNIQUE_KEYWORDS: [&str; 5] = [
    "technique manual",
    "secret technique",
    "cultivation technique",
    "learned a technique",
    "found a technique",
];

/// Hazards may take at most this share of the six-stat total.
const TOTAL_REDUCTION_CAP: f64 = 0.15;
/// ...and at most this share of any single stat.
const FIELD_REDUCTION_CAP: f64 = 0.10;
/// Max HP never drops below this share of its pre-hazard actual value.
const MAX_HP_FLOOR: f64 = 0.5;

const CONSOLATION_EXP: i64 = 30;
const CONSOLATION_STONES: i64 = 15;
const LARGE_REWARD: i64 = 100;

const MAX_LEVELS_PER_EVENT: u32 = 5;
const PET_BASE_MAX_EXP: u64 = 100;

/// Lettered suffixes tried after "#2".."#9".
const COLLISION_LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

// ── Derived stats ──────────────────────────────────────────────

/// Max HP including everything outside the base stat.
pub trait DerivedStats {
    fn actual_max_hp(&self, state: &PlayerState) -> i64;
}

/// Base max HP plus worn item bonuses plus learned technique bonuses.
pub struct StandardStats<'a> {
    pub catalog: &'a ContentCatalog,
}

impl<'a> DerivedStats for StandardStats<'a> {
    fn actual_max_hp(&self, state: &PlayerState) -> i64 {
        let worn: i64 = state
            .equipped
            .values()
            .filter_map(|id| state.inventory.iter().find(|i| &i.id == id))
            .filter_map(|i| i.effect.as_ref())
            .map(|e| e.hp + e.max_hp)
            .sum();
        let arts: i64 = state
            .learned_arts
            .iter()
            .filter_map(|id| self.catalog.technique(id))
            .map(|t| t.bonus.max_hp)
            .sum();
        (state.max_hp + worn + arts).max(1)
    }
}

// ── Context & output ───────────────────────────────────────────

pub struct ApplyContext<'a> {
    pub catalog: &'a ContentCatalog,
    pub config: &'a EngineConfig,
    pub stats: &'a dyn DerivedStats,
}

pub struct Applied {
    pub state: PlayerState,
    pub log: Vec<LogEntry>,
    pub notices: Vec<Notice>,
    /// Reputation event waiting for the player's answer.
    pub pending_choice: Option<ReputationEvent>,
    /// Boss id waiting for confirmation.
    pub pending_boss: Option<String>,
    /// Run one secret-realm adventure right after this one.
    pub chain_secret_realm: bool,
}

impl Applied {
    fn new(state: PlayerState) -> Self {
        Self {
            state,
            log: Vec::new(),
            notices: Vec::new(),
            pending_choice: None,
            pending_boss: None,
            chain_secret_realm: false,
        }
    }

    fn notify(&mut self, kind: NoticeKind, text: String) {
        self.notices.push(Notice { kind, text });
    }
}

// ── HP ─────────────────────────────────────────────────────────

/// Carry current HP across a max-HP change: keep the same fraction of the
/// new max, then apply `delta`, then clamp to [0, new max].
pub fn reconcile_hp(old_hp: i64, old_max_hp: i64, new_max_hp: i64, delta: i64) -> i64 {
    let new_max = new_max_hp.max(0);
    let rescaled = if old_max_hp == new_max {
        old_hp
    } else if old_max_hp <= 0 {
        new_max
    } else {
        let ratio = (old_hp as f64 / old_max_hp as f64).clamp(0.0, 1.0);
        (ratio * new_max as f64).round() as i64
    };
    (rescaled + delta).clamp(0, new_max)
}

// ── Step 1: inventory ──────────────────────────────────────────

fn default_slot(item_type: ItemType) -> Option<EquipSlot> {
    match item_type {
        ItemType::Weapon => Some(EquipSlot::Weapon),
        ItemType::Armor => Some(EquipSlot::Chest),
        ItemType::Accessory => Some(EquipSlot::Ring),
        ItemType::Artifact => Some(EquipSlot::Artifact),
        _ => None,
    }
}

fn fold_permanent(effect: Option<Effect>, permanent: Effect) -> Effect {
    let base = effect.unwrap_or_default();
    Effect {
        hp: base.hp + permanent.hp + permanent.max_hp,
        exp: base.exp + permanent.exp,
        attack: base.attack + permanent.attack,
        defense: base.defense + permanent.defense,
        spirit: base.spirit + permanent.spirit,
        physique: base.physique + permanent.physique,
        speed: base.speed + permanent.speed,
        max_hp: base.max_hp,
        lifespan: base.lifespan + permanent.lifespan,
    }
}

/// Canonical type, slot and rarity for a granted item.
fn resolve_item(item: &Item, ctx: &ApplyContext) -> Result<Item, CoreError> {
    if item.name.trim().is_empty() {
        return Err(CoreError::ItemNormalization("granted item has no name".into()));
    }
    let mut out = item.clone();
    out.quantity = out.quantity.max(1);
    let inferred = infer_kind(&item.name, &item.description);

    if let Some(template) = ctx.catalog.template_by_name(&item.name) {
        let known = ctx.catalog.normalize(template);
        out.item_type = known.item_type;
        out.equip_slot = known.equip_slot;
        out.rarity = out.rarity.max(known.rarity);
        if let Some((kind, Some(slot))) = inferred {
            if kind.is_equippable() && out.item_type.is_equippable() && out.equip_slot != Some(slot) {
                if ctx.config.diagnostics {
                    tracing::warn!(
                        item = %item.name,
                        declared = ?out.equip_slot,
                        inferred = ?slot,
                        "equip slot corrected from item name"
                    );
                }
                out.item_type = kind;
                out.equip_slot = Some(slot);
            }
        }
    } else if out.item_type.is_equippable() && out.equip_slot.is_none() {
        out.equip_slot = inferred
            .and_then(|(_, slot)| slot)
            .or_else(|| default_slot(out.item_type));
    }

    if out.item_type.is_equippable() {
        let fits = out.equip_slot.map(|s| s.item_type()) == Some(out.item_type);
        if !fits {
            if ctx.config.diagnostics {
                tracing::warn!(item = %out.name, slot = ?out.equip_slot, "slot does not fit item type, using default");
            }
            out.equip_slot = default_slot(out.item_type);
        }
        if out.equip_slot.is_none() {
            return Err(CoreError::ItemNormalization(format!("{} has no equip slot", out.name)));
        }
        if let Some(permanent) = out.permanent_effect.take() {
            out.effect = Some(fold_permanent(out.effect.take(), permanent));
        }
    } else {
        out.equip_slot = None;
    }
    Ok(out)
}

/// Best-effort stand-in when an item cannot be normalized.
fn salvage(item: &Item) -> Item {
    let name = if item.name.trim().is_empty() {
        "Unidentified Material".to_string()
    } else {
        item.name.clone()
    };
    Item {
        id: String::new(),
        name,
        item_type: ItemType::Material,
        rarity: item.rarity,
        quantity: item.quantity.max(1),
        description: item.description.clone(),
        equip_slot: None,
        effect: None,
        permanent_effect: None,
        advanced_id: None,
    }
}

fn free_name(inventory: &[Item], base: &str) -> Option<String> {
    let taken = |n: &str| inventory.iter().any(|i| i.name == n);
    if !taken(base) {
        return Some(base.to_string());
    }
    (2..=9)
        .map(|n| format!("{} #{}", base, n))
        .chain(COLLISION_LETTERS.iter().map(|c| format!("{} ({})", base, c)))
        .find(|n| !taken(n))
}

/// Insert one resolved item. Returns false when it had to be dropped.
fn insert_item(state: &mut PlayerState, mut item: Item) -> bool {
    if item.is_stackable() {
        if let Some(stack) = state
            .inventory
            .iter_mut()
            .find(|i| i.name == item.name && i.is_stackable())
        {
            stack.quantity += item.quantity;
            return true;
        }
        if item.id.is_empty() {
            item.id = state.next_item_id("item");
        }
        state.inventory.push(item);
        return true;
    }

    if item.is_equippable() {
        match free_name(&state.inventory, &item.name) {
            Some(name) => item.name = name,
            None => {
                tracing::debug!(item = %item.name, "no free name for duplicate equipment, dropping");
                return false;
            }
        }
        item.quantity = 1;
    }
    item.id = state.next_item_id("equip");
    state.inventory.push(item);
    true
}

fn grant_items(out: &mut Applied, items: &[Item], ctx: &ApplyContext) {
    for raw in items {
        let item = match resolve_item(raw, ctx) {
            Ok(item) => item,
            Err(e) => {
                tracing::error!(error = %e, "recovering granted item with safe defaults");
                salvage(raw)
            }
        };
        let label = format!("{} x{} ({})", item.name, item.quantity, item.rarity.name());
        if insert_item(&mut out.state, item) {
            out.log.add_log(&format!("Obtained {}.", label), Tone::Gain);
            out.notify(NoticeKind::ItemObtained, label);
        }
    }
}

// ── Step 2: techniques ─────────────────────────────────────────

fn mentions_technique(story: &str) -> bool {
    let story = story.to_lowercase();
    TECHNIQUE_KEYWORDS.iter().any(|k| story.contains(k))
}

fn unlock_technique(out: &mut Applied, story: &str, ctx: &ApplyContext, rng: &mut dyn RngCore) {
    let weight = ctx.config.deterministic_blend;
    let chance = if mentions_technique(story) {
        1.0
    } else {
        ctx.config.art_base_chance
    };
    if rng.gen::<f64>() >= chance {
        return;
    }
    let s = &out.state;

    let eligible: Vec<_> = ctx
        .catalog
        .techniques()
        .iter()
        .filter(|t| !s.learned_arts.contains(&t.id) && !s.unlocked_arts.contains(&t.id))
        .filter(|t| t.realm <= s.realm)
        .filter(|t| t.sect.as_deref().map_or(true, |sect| Some(sect) == s.sect_id()))
        .collect();
    if eligible.is_empty() {
        out.log
            .add_log("The insight fades; there is nothing new for you to learn.", Tone::Normal);
        return;
    }
    let roll = blend(hash_unit(story), rng.gen::<f64>(), weight);
    let pick = ((roll * eligible.len() as f64) as usize).min(eligible.len() - 1);
    let technique = eligible[pick];
    let (id, name) = (technique.id.clone(), technique.name.clone());
    out.state.unlocked_arts.push(id);
    out.log
        .add_log(&format!("You comprehended a new technique: {}!", name), Tone::Special);
    out.notify(NoticeKind::ArtUnlocked, name);
}

// ── Steps 3–4: pets ────────────────────────────────────────────

fn obtain_pet(out: &mut Applied, template_id: &str, ctx: &ApplyContext) {
    let Some(template) = ctx.catalog.pet_template(template_id) else {
        tracing::warn!(template_id, "unknown pet template");
        return;
    };
    if out.state.pets.iter().any(|p| p.species == template.species) {
        out.log.add_log(
            &format!("A {} approached, but you already keep one of its kind.", template.species),
            Tone::Normal,
        );
        return;
    }
    let id = out.state.next_item_id("pet");
    let stats = &template.base_stats;
    out.state.pets.push(Pet {
        id: id.clone(),
        template_id: template.id.clone(),
        name: template.name.clone(),
        species: template.species.clone(),
        rarity: template.rarity,
        level: 1,
        exp: 0,
        max_exp: PET_BASE_MAX_EXP,
        evolution_stage: 0,
        attack: stats.attack,
        defense: stats.defense,
        hp: stats.hp,
        max_hp: stats.hp,
        speed: stats.speed,
        skills: template.skills.clone(),
        skill_cooldowns: Default::default(),
    });
    if out.state.active_pet_id.is_none() {
        out.state.active_pet_id = Some(id);
    }
    out.log
        .add_log(&format!("{} has chosen to follow you!", template.name), Tone::Special);
    out.notify(NoticeKind::PetObtained, template.name.clone());
}

fn grow(v: i64, factor: f64) -> i64 {
    (v as f64 * factor).round() as i64
}

fn pet_level_up(pet: &mut Pet) {
    pet.level += 1;
    pet.attack = grow(pet.attack, 1.1);
    pet.defense = grow(pet.defense, 1.1);
    pet.max_hp = grow(pet.max_hp, 1.1);
    pet.hp = pet.max_hp;
    pet.speed = grow(pet.speed, 1.05);
    pet.max_exp = (pet.max_exp as f64 * 1.5).floor() as u64;
}

fn target_pet(state: &PlayerState, explicit: Option<&str>) -> Option<usize> {
    let by_id = |id: &str| state.pets.iter().position(|p| p.id == id);
    match explicit {
        Some(id) => by_id(id),
        None => state
            .active_pet_id
            .as_deref()
            .and_then(by_id)
            .or(if state.pets.is_empty() { None } else { Some(0) }),
    }
}

fn grow_pet(out: &mut Applied, growth: &PetGrowth) {
    let Some(index) = target_pet(&out.state, growth.pet_id.as_deref()) else {
        out.log
            .add_log("The chance passes; you have no companion to benefit.", Tone::Normal);
        return;
    };
    let pet = &mut out.state.pets[index];
    let line = match &growth.kind {
        PetGrowthKind::Evolution => {
            if pet.evolution_stage >= MAX_EVOLUTION_STAGE {
                format!("{} is already fully evolved.", pet.name)
            } else {
                pet.evolution_stage += 1;
                pet.attack = grow(pet.attack, 3.0);
                pet.defense = grow(pet.defense, 3.0);
                pet.max_hp = grow(pet.max_hp, 3.0);
                pet.hp = pet.max_hp;
                pet.speed = grow(pet.speed, 1.5);
                let text = format!("{} evolved to stage {}!", pet.name, pet.evolution_stage);
                out.notices.push(Notice {
                    kind: NoticeKind::PetEvolved,
                    text: pet.name.clone(),
                });
                text
            }
        }
        PetGrowthKind::Levels(n) => {
            let before = pet.level;
            for _ in 0..(*n).min(MAX_LEVELS_PER_EVENT) {
                if pet.level >= MAX_PET_LEVEL {
                    break;
                }
                pet_level_up(pet);
            }
            format!("{} grew from level {} to {}.", pet.name, before, pet.level)
        }
        PetGrowthKind::Stats(boost) => {
            pet.attack += boost.attack;
            pet.defense += boost.defense;
            pet.max_hp += boost.hp;
            pet.hp += boost.hp;
            pet.speed += boost.speed;
            format!("{} grew stronger.", pet.name)
        }
        PetGrowthKind::Exp(amount) => {
            pet.exp += amount;
            while pet.exp >= pet.max_exp && pet.level < MAX_PET_LEVEL {
                pet.exp -= pet.max_exp;
                pet_level_up(pet);
            }
            if pet.level >= MAX_PET_LEVEL {
                pet.exp = pet.exp.min(pet.max_exp);
            }
            format!("{} gained {} experience (level {}).", pet.name, amount, pet.level)
        }
    };
    out.log.add_log(&line, Tone::Special);
}

// ── Step 5: attribute reduction ────────────────────────────────

/// Apply a hazard. Returns the total actually removed.
fn reduce_attributes(out: &mut Applied, request: &AttributeReduction, actual_max_hp: i64) -> i64 {
    let s = &mut out.state;
    let current = [s.attack, s.defense, s.spirit, s.physique, s.speed, actual_max_hp];
    let asked = [
        request.attack,
        request.defense,
        request.spirit,
        request.physique,
        request.speed,
        request.max_hp,
    ]
    .map(|v| v.max(0));

    let stat_sum: i64 = current.iter().map(|v| (*v).max(0)).sum();
    let asked_total: i64 = asked.iter().sum();
    if asked_total == 0 {
        return 0;
    }
    let total_cap = (stat_sum as f64 * TOTAL_REDUCTION_CAP).floor();
    let scale = if asked_total as f64 > total_cap {
        total_cap / asked_total as f64
    } else {
        1.0
    };

    let mut taken = [0i64; 6];
    for i in 0..6 {
        let field_cap = (current[i].max(0) as f64 * FIELD_REDUCTION_CAP).floor() as i64;
        taken[i] = ((asked[i] as f64 * scale).floor() as i64).min(field_cap).max(0);
    }
    let hp_floor = (actual_max_hp as f64 * MAX_HP_FLOOR).ceil() as i64;
    taken[5] = taken[5].min((actual_max_hp - hp_floor).max(0));

    s.attack -= taken[0];
    s.defense -= taken[1];
    s.spirit -= taken[2];
    s.physique -= taken[3];
    s.speed -= taken[4];
    s.max_hp = (s.max_hp - taken[5]).max(1);
    s.hp = s.hp.min(actual_max_hp - taken[5]);

    let total: i64 = taken.iter().sum();
    if total > 0 {
        out.log.add_log(
            &format!(
                "Your foundation was damaged: attack -{}, defense -{}, spirit -{}, physique -{}, speed -{}, max HP -{}.",
                taken[0], taken[1], taken[2], taken[3], taken[4], taken[5]
            ),
            Tone::Danger,
        );
        out.notify(NoticeKind::Danger, "Attributes reduced".into());
    }
    total
}

// ── Steps 6–8: grants ──────────────────────────────────────────

fn advanced_rarity(tier: u8) -> Rarity {
    match tier {
        0 | 1 => Rarity::Rare,
        2 | 3 => Rarity::Legendary,
        _ => Rarity::Mythic,
    }
}

fn grant_advanced(out: &mut Applied, item: &AdvancedItem) {
    let id = out.state.next_item_id("adv");
    out.state.inventory.push(Item {
        id,
        name: item.name.clone(),
        item_type: ItemType::AdvancedItem,
        rarity: advanced_rarity(item.tier),
        quantity: 1,
        description: item.description.clone(),
        equip_slot: None,
        effect: if item.effect.is_empty() {
            None
        } else {
            Some(item.effect.clone())
        },
        permanent_effect: None,
        advanced_id: Some(item.id.clone()),
    });
    out.log.add_log(
        &format!("Obtained tier {} material: {}!", item.tier, item.name),
        Tone::Special,
    );
    out.notify(NoticeKind::ItemObtained, item.name.clone());
}

fn roll_advanced_drops(out: &mut Applied, ctx: &ApplyContext, rng: &mut dyn RngCore) {
    for (i, gate) in ADVANCED_TIER_REALMS.iter().enumerate() {
        if !gate.contains(out.state.realm) {
            continue;
        }
        if rng.gen::<f64>() >= ctx.config.advanced_drop_chances[i] {
            continue;
        }
        let candidates = ctx.catalog.advanced_items_of_tier(i as u8 + 1);
        if candidates.is_empty() {
            continue;
        }
        let item = candidates[rng.gen_range(0..candidates.len())];
        grant_advanced(out, item);
    }
}

fn unlock_rule(out: &mut Applied, rule_id: &str, ctx: &ApplyContext) {
    let Some(rule) = ctx.catalog.rule(rule_id) else {
        tracing::warn!(rule_id, "unknown rule");
        return;
    };
    if out.state.unlocked_rules.iter().any(|r| r == rule_id) {
        out.log
            .add_log(&format!("You already grasp the {}.", rule.name), Tone::Normal);
    } else if out.state.unlocked_rules.len() >= ctx.config.max_rules {
        out.log.add_log(
            &format!("The {} slips away; your Dao can hold no more rules.", rule.name),
            Tone::Normal,
        );
    } else {
        out.state.unlocked_rules.push(rule.id.clone());
        out.log
            .add_log(&format!("You comprehended the {}!", rule.name), Tone::Special);
        out.notify(NoticeKind::RuleUnlocked, rule.name.clone());
    }
}

fn raise_inheritance(out: &mut Applied, ctx: &ApplyContext) {
    let max = ctx.config.max_inheritance_level;
    if out.state.inheritance_level >= max {
        out.log
            .add_log("The inheritance has nothing more to teach you.", Tone::Normal);
    } else {
        out.state.inheritance_level += 1;
        out.log.add_log(
            &format!("Inheritance level rose to {}.", out.state.inheritance_level),
            Tone::Special,
        );
    }
}

// ── Steps 9–11 ─────────────────────────────────────────────────

/// Lifespan spent by one adventure of `category`.
pub fn lifespan_decay(category: EventCategory) -> f64 {
    match category {
        EventCategory::SecretRealm => 1.0,
        EventCategory::SectChallenge => 0.8,
        EventCategory::Normal => 0.5,
        EventCategory::Lucky => 0.3,
    }
}

fn add_affinities(current: &mut Affinities, delta: &Affinities) {
    let clamp = |v: i32| v.clamp(0, AFFINITY_MAX);
    current.metal = clamp(current.metal + delta.metal);
    current.wood = clamp(current.wood + delta.wood);
    current.water = clamp(current.water + delta.water);
    current.fire = clamp(current.fire + delta.fire);
    current.earth = clamp(current.earth + delta.earth);
}

/// Dedup both technique lists and make sure every learned id is unlocked.
pub fn sync_art_sets(state: &mut PlayerState) {
    fn dedup(v: &mut Vec<String>) {
        let mut seen = std::collections::HashSet::new();
        v.retain(|id| seen.insert(id.clone()));
    }
    dedup(&mut state.unlocked_arts);
    dedup(&mut state.learned_arts);
    for id in &state.learned_arts {
        if !state.unlocked_arts.contains(id) {
            state.unlocked_arts.push(id.clone());
        }
    }
}

// ── Entry points ───────────────────────────────────────────────

pub fn apply(
    prev: &PlayerState,
    result: &AdventureResult,
    ctx: &ApplyContext,
    rng: &mut dyn RngCore,
) -> Applied {
    let old_hp = prev.hp;
    let old_max = ctx.stats.actual_max_hp(prev);
    let mut out = Applied::new(prev.clone());
    out.log.add_log(&result.story, result.tone);

    grant_items(&mut out, result.items(), ctx);
    unlock_technique(&mut out, &result.story, ctx, rng);

    let mut bonus_exp = 0;
    let mut bonus_stones = 0;
    match &result.payload {
        EventPayload::None | EventPayload::Loot(_) | EventPayload::RareMaterial(_) => {}
        EventPayload::Combat { victory, .. } => {
            if *victory {
                out.state.stats.battles_won += 1;
            } else {
                out.state.stats.battles_lost += 1;
            }
        }
        EventPayload::Pet { template_id } => obtain_pet(&mut out, template_id, ctx),
        EventPayload::PetGrowth(growth) => grow_pet(&mut out, growth),
        EventPayload::Hazard(request) => {
            let removed = reduce_attributes(&mut out, request, old_max);
            let reward = result.deltas.exp + result.deltas.spirit_stones;
            if removed > 0
                && result.category == EventCategory::SecretRealm
                && result.items().is_empty()
                && reward < LARGE_REWARD
            {
                bonus_exp = CONSOLATION_EXP;
                bonus_stones = CONSOLATION_STONES;
                out.log.add_log(
                    "You salvaged a little insight and a few stones from the ordeal.",
                    Tone::Gain,
                );
            }
        }
        EventPayload::ReputationChoice(event) => {
            if ctx.config.skip_reputation_events {
                out.log
                    .add_log(&format!("You passed by: {}.", event.title), Tone::Normal);
            } else {
                out.pending_choice = Some(event.clone());
            }
        }
        EventPayload::AdvancedMaterial { advanced_id, .. } => {
            match ctx.catalog.advanced_item(advanced_id) {
                Some(item) => grant_advanced(&mut out, item),
                None => tracing::warn!(advanced_id = %advanced_id, "unknown advanced item"),
            }
        }
        EventPayload::BossEncounter { boss_id } => {
            let name = ctx
                .catalog
                .boss(boss_id)
                .map(|b| b.name.as_str())
                .unwrap_or("A great enemy");
            out.log
                .add_log(&format!("{} bars your way. Will you fight?", name), Tone::Danger);
            out.pending_boss = Some(boss_id.clone());
        }
        EventPayload::RuleUnlock { rule_id } => unlock_rule(&mut out, rule_id, ctx),
        EventPayload::Lottery { tickets } => {
            out.state.lottery_tickets += tickets;
            out.log
                .add_log(&format!("Received {} lottery tickets.", tickets), Tone::Gain);
        }
        EventPayload::Inheritance => raise_inheritance(&mut out, ctx),
    }

    roll_advanced_drops(&mut out, ctx, rng);

    match result.bonus {
        Some(LuckyBonus::RealmLevelUp) if out.state.realm_level < MAX_REALM_LEVEL => {
            out.state.realm_level += 1;
            let text = format!("{} level {}", out.state.realm.name(), out.state.realm_level);
            out.log
                .add_log(&format!("Heaven's favour lifts you to {}!", text), Tone::Special);
            out.notify(NoticeKind::RealmLevelUp, text);
        }
        Some(LuckyBonus::ChainSecretRealm) => out.chain_secret_realm = true,
        _ => {}
    }

    if !result.pet_cooldowns.is_empty() {
        if let Some(index) = target_pet(&out.state, None) {
            let pet = &mut out.state.pets[index];
            for (skill, turns) in &result.pet_cooldowns {
                pet.skill_cooldowns.insert(skill.clone(), *turns);
            }
        }
    }

    let s = &mut out.state;
    s.lifespan = (s.lifespan - lifespan_decay(result.category) + result.deltas.lifespan)
        .clamp(0.0, s.max_lifespan);
    if !result.deltas.affinity.is_zero() {
        add_affinities(&mut s.affinities, &result.deltas.affinity);
    }

    s.exp = (s.exp + result.deltas.exp + bonus_exp).max(0);
    s.spirit_stones = (s.spirit_stones + result.deltas.spirit_stones + bonus_stones).max(0);
    s.reputation = (s.reputation + result.deltas.reputation).max(0);
    if result.category == EventCategory::SectChallenge {
        if let Some(m) = s.sect.as_mut() {
            m.contribution += result.deltas.reputation.max(0);
        }
    }

    s.stats.adventures += 1;
    if result.category == EventCategory::SecretRealm {
        s.stats.secret_realms += 1;
    }

    sync_art_sets(s);
    let new_max = ctx.stats.actual_max_hp(s);
    s.hp = reconcile_hp(old_hp, old_max, new_max, result.deltas.hp);

    let summary = summarize(result.deltas.exp, result.deltas.spirit_stones, result.deltas.hp);
    if !summary.is_empty() {
        out.log.add_log(&summary, Tone::Normal);
    }
    out
}

fn summarize(exp: i64, stones: i64, hp: i64) -> String {
    let mut parts = Vec::new();
    if exp != 0 {
        parts.push(format!("exp {:+}", exp));
    }
    if stones != 0 {
        parts.push(format!("spirit stones {:+}", stones));
    }
    if hp != 0 {
        parts.push(format!("HP {:+}", hp));
    }
    parts.join(", ")
}

/// Apply the option the player picked for a pending reputation event.
pub fn apply_reputation_choice(
    prev: &PlayerState,
    event: &ReputationEvent,
    index: usize,
    stats: &dyn DerivedStats,
) -> Result<(PlayerState, Vec<LogEntry>), CoreError> {
    let option = event.choices.get(index).ok_or(CoreError::UnknownChoice {
        index,
        len: event.choices.len(),
    })?;
    let mut s = prev.clone();
    let mut log = Vec::new();
    s.reputation = (s.reputation + option.reputation).max(0);
    s.exp = (s.exp + option.exp).max(0);
    s.spirit_stones = (s.spirit_stones + option.spirit_stones).max(0);
    s.hp = (s.hp + option.hp).clamp(0, stats.actual_max_hp(&s));
    log.add_log(&format!("{}: {}.", event.title, option.text), Tone::Normal);
    if option.reputation != 0 {
        let tone = if option.reputation > 0 { Tone::Gain } else { Tone::Danger };
        log.add_log(&format!("Reputation {:+}.", option.reputation), tone);
    }
    Ok((s, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::templates::{Deltas, EventKind, ReputationOption};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn catalog() -> ContentCatalog {
        ContentCatalog::builtin().unwrap().with_diagnostics(false)
    }

    fn result(category: EventCategory, payload: EventPayload) -> AdventureResult {
        AdventureResult {
            template_id: None,
            category,
            kind: EventKind::Stash,
            risk_level: None,
            story: "You walked the mountain road.".into(),
            tone: Tone::Normal,
            deltas: Deltas::default(),
            payload,
            bonus: None,
            pet_cooldowns: BTreeMap::new(),
        }
    }

    fn run(prev: &PlayerState, r: &AdventureResult) -> Applied {
        let catalog = catalog();
        let config = EngineConfig {
            art_base_chance: 0.0,
            advanced_drop_chances: [0.0; 4],
            ..EngineConfig::default()
        };
        let stats = StandardStats { catalog: &catalog };
        let ctx = ApplyContext {
            catalog: &catalog,
            config: &config,
            stats: &stats,
        };
        apply(prev, r, &ctx, &mut StdRng::seed_from_u64(7))
    }

    fn sword(name: &str) -> Item {
        Item {
            id: String::new(),
            name: name.into(),
            item_type: ItemType::Weapon,
            rarity: Rarity::Common,
            quantity: 1,
            description: String::new(),
            equip_slot: Some(EquipSlot::Weapon),
            effect: Some(Effect { attack: 5, ..Effect::default() }),
            permanent_effect: Some(Effect { max_hp: 10, attack: 2, ..Effect::default() }),
            advanced_id: None,
        }
    }

    #[test]
    fn reconcile_hp_rescales_then_applies_delta() {
        assert_eq!(reconcile_hp(50, 100, 200, 0), 100);
        assert_eq!(reconcile_hp(50, 100, 200, -10), 90);
        assert_eq!(reconcile_hp(100, 100, 100, 20), 100);
        assert_eq!(reconcile_hp(10, 100, 100, -50), 0);
        assert_eq!(reconcile_hp(80, 100, 100, -10), 70);
    }

    #[test]
    fn prev_state_is_untouched() {
        let prev = PlayerState::new("Lin");
        let mut r = result(EventCategory::Normal, EventPayload::None);
        r.deltas.exp = 40;
        let out = run(&prev, &r);
        assert_eq!(prev.exp, 0);
        assert_eq!(out.state.exp, 40);
    }

    #[test]
    fn stackables_merge_by_name() {
        let catalog = catalog();
        let herb = catalog.item_by_name("Healing Herb").unwrap();
        let r = result(EventCategory::Normal, EventPayload::Loot(vec![herb.clone(), herb]));
        let out = run(&PlayerState::new("Lin"), &r);
        let stacks: Vec<_> = out.state.inventory.iter().filter(|i| i.name == "Healing Herb").collect();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].quantity, 2);
    }

    #[test]
    fn duplicate_equipment_gets_suffix_and_loses_permanent_effect() {
        let r = result(
            EventCategory::Normal,
            EventPayload::Loot(vec![sword("Rusty Saber"), sword("Rusty Saber")]),
        );
        let out = run(&PlayerState::new("Lin"), &r);
        let names: Vec<_> = out.state.inventory.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Rusty Saber", "Rusty Saber #2"]);
        for item in &out.state.inventory {
            assert!(item.permanent_effect.is_none());
            let e = item.effect.as_ref().unwrap();
            assert_eq!(e.attack, 7);
            assert_eq!(e.hp, 10);
        }
    }

    #[test]
    fn collision_suffixes_exhaust_then_drop() {
        let mut prev = PlayerState::new("Lin");
        let r = result(EventCategory::Normal, EventPayload::Loot(vec![sword("Rusty Saber")]));
        for _ in 0..20 {
            prev = run(&prev, &r).state;
        }
        // base + #2..#9 + (A)..(F)
        assert_eq!(prev.inventory.len(), 1 + 8 + 6);
        assert!(prev.inventory.iter().any(|i| i.name == "Rusty Saber (F)"));
    }

    #[test]
    fn unnamed_item_is_salvaged_as_material() {
        let mut broken = sword("");
        broken.name = "  ".into();
        let r = result(EventCategory::Normal, EventPayload::Loot(vec![broken]));
        let out = run(&PlayerState::new("Lin"), &r);
        assert_eq!(out.state.inventory.len(), 1);
        assert_eq!(out.state.inventory[0].item_type, ItemType::Material);
        assert!(out.state.inventory[0].effect.is_none());
    }

    #[test]
    fn slot_conflict_prefers_name() {
        let catalog = ContentCatalog::from_json(
            r#"{ "itemTemplates": [ { "name": "Jade Ring", "type": "armor", "equipSlot": "boots", "rarity": "rare" } ] }"#,
        )
        .unwrap();
        let config = EngineConfig::default();
        let stats = StandardStats { catalog: &catalog };
        let ctx = ApplyContext { catalog: &catalog, config: &config, stats: &stats };
        let resolved = resolve_item(&catalog.item_by_name("Jade Ring").unwrap(), &ctx).unwrap();
        assert_eq!(resolved.equip_slot, Some(EquipSlot::Ring));
        assert_eq!(resolved.item_type, ItemType::Accessory);
    }

    #[test]
    fn duplicate_species_is_rejected() {
        let prev = run(
            &PlayerState::new("Lin"),
            &result(EventCategory::Normal, EventPayload::Pet { template_id: "pet-golden-beetle".into() }),
        )
        .state;
        assert_eq!(prev.pets.len(), 1);
        assert_eq!(prev.pets[0].species, "Insect");

        let out = run(
            &prev,
            &result(EventCategory::Normal, EventPayload::Pet { template_id: "pet-silk-moth".into() }),
        );
        assert_eq!(out.state.pets.len(), 1);
        assert!(out.log.iter().any(|l| l.text.contains("already keep")));
        assert!(out.notices.iter().all(|n| n.kind != NoticeKind::PetObtained));
    }

    #[test]
    fn evolution_caps_at_stage_two() {
        let mut s = run(
            &PlayerState::new("Lin"),
            &result(EventCategory::Normal, EventPayload::Pet { template_id: "pet-golden-beetle".into() }),
        )
        .state;
        let evolve = result(
            EventCategory::Normal,
            EventPayload::PetGrowth(PetGrowth { pet_id: None, kind: PetGrowthKind::Evolution }),
        );
        for _ in 0..4 {
            s = run(&s, &evolve).state;
        }
        assert_eq!(s.pets[0].evolution_stage, MAX_EVOLUTION_STAGE);
    }

    #[test]
    fn pet_exp_cascades_and_caps() {
        let mut pet_state = run(
            &PlayerState::new("Lin"),
            &result(EventCategory::Normal, EventPayload::Pet { template_id: "pet-golden-beetle".into() }),
        )
        .state;
        let feed = result(
            EventCategory::Normal,
            EventPayload::PetGrowth(PetGrowth { pet_id: None, kind: PetGrowthKind::Exp(250) }),
        );
        pet_state = run(&pet_state, &feed).state;
        // 100 to reach 2, 150 to reach 3
        assert_eq!(pet_state.pets[0].level, 3);
        assert_eq!(pet_state.pets[0].exp, 0);

        pet_state.pets[0].level = MAX_PET_LEVEL;
        let huge = result(
            EventCategory::Normal,
            EventPayload::PetGrowth(PetGrowth { pet_id: None, kind: PetGrowthKind::Exp(u32::MAX as u64) }),
        );
        let capped = run(&pet_state, &huge).state;
        assert_eq!(capped.pets[0].level, MAX_PET_LEVEL);
        assert!(capped.pets[0].exp <= capped.pets[0].max_exp);
    }

    #[test]
    fn per_field_cap_wins_on_attack() {
        let mut prev = PlayerState::new("Lin");
        prev.attack = 100;
        prev.defense = 100;
        prev.spirit = 100;
        prev.physique = 100;
        prev.speed = 50;
        prev.max_hp = 50;
        prev.hp = 50;
        let r = result(
            EventCategory::Normal,
            EventPayload::Hazard(AttributeReduction { attack: 50, ..Default::default() }),
        );
        let out = run(&prev, &r);
        assert_eq!(out.state.attack, 90);
        assert_eq!(out.state.defense, 100);
    }

    #[test]
    fn total_cap_scales_every_field() {
        let prev = PlayerState::new("Lin");
        // attack 10, defense 5, spirit 10, physique 10, speed 10, max hp 100 → sum 145, cap 21
        let r = result(
            EventCategory::Normal,
            EventPayload::Hazard(AttributeReduction {
                attack: 100,
                defense: 100,
                spirit: 100,
                physique: 100,
                speed: 100,
                max_hp: 100,
            }),
        );
        let out = run(&prev, &r);
        let removed = (prev.attack - out.state.attack)
            + (prev.defense - out.state.defense)
            + (prev.spirit - out.state.spirit)
            + (prev.physique - out.state.physique)
            + (prev.speed - out.state.speed)
            + (prev.max_hp - out.state.max_hp);
        assert!(removed <= 21);
        assert!(removed > 0);
        // 21/600 of each request, then the 10% field caps
        assert_eq!(prev.attack - out.state.attack, 1);
        assert_eq!(prev.defense - out.state.defense, 0);
        assert_eq!(prev.max_hp - out.state.max_hp, 3);
    }

    #[test]
    fn secret_realm_hazard_consoles() {
        let r = result(
            EventCategory::SecretRealm,
            EventPayload::Hazard(AttributeReduction { max_hp: 10, ..Default::default() }),
        );
        let out = run(&PlayerState::new("Lin"), &r);
        assert_eq!(out.state.exp, CONSOLATION_EXP);
        assert_eq!(out.state.spirit_stones, 50 + CONSOLATION_STONES);
    }

    #[test]
    fn rules_are_capped_and_unique() {
        let mut s = PlayerState::new("Lin");
        for id in ["rule-time", "rule-time", "rule-space", "rule-life", "rule-death"] {
            s = run(&s, &result(EventCategory::Normal, EventPayload::RuleUnlock { rule_id: id.into() })).state;
        }
        assert_eq!(s.unlocked_rules, vec!["rule-time", "rule-space", "rule-life"]);
    }

    #[test]
    fn inheritance_steps_by_one_to_cap() {
        let mut s = PlayerState::new("Lin");
        for _ in 0..6 {
            s = run(&s, &result(EventCategory::Normal, EventPayload::Inheritance)).state;
        }
        assert_eq!(s.inheritance_level, 4);
    }

    #[test]
    fn technique_keyword_always_unlocks() {
        let mut r = result(EventCategory::Normal, EventPayload::None);
        r.story = "Inside a hollow tree you found a technique manual.".into();
        let out = run(&PlayerState::new("Lin"), &r);
        assert_eq!(out.state.unlocked_arts.len(), 1);
        assert!(out.state.learned_arts.is_empty());
    }

    #[test]
    fn technique_base_chance_matches_config() {
        let catalog = catalog();
        let config = EngineConfig {
            art_base_chance: 0.06,
            ..EngineConfig::default()
        };
        let stats = StandardStats { catalog: &catalog };
        let ctx = ApplyContext {
            catalog: &catalog,
            config: &config,
            stats: &stats,
        };
        let mut rng = StdRng::seed_from_u64(21);
        let trials = 20_000;
        let mut unlocked = 0;
        for i in 0..trials {
            let mut s = PlayerState::new("Lin");
            s.stats.adventures = i;
            let mut out = Applied::new(s);
            unlock_technique(&mut out, "You walked the mountain road.", &ctx, &mut rng);
            if !out.state.unlocked_arts.is_empty() {
                unlocked += 1;
            }
        }
        let rate = unlocked as f64 / trials as f64;
        assert!((0.045..0.075).contains(&rate), "unlock rate {}", rate);
    }

    #[test]
    fn sect_arts_need_membership() {
        let mut r = result(EventCategory::Normal, EventPayload::None);
        r.story = "A secret technique was carved here.".into();
        let mut s = PlayerState::new("Lin");
        s.realm = crate::adventure::state::Realm::Immortal;
        for _ in 0..30 {
            s = run(&s, &r).state;
        }
        let catalog = catalog();
        for id in &s.unlocked_arts {
            assert!(catalog.technique(id).unwrap().sect.is_none(), "{} is sect-only", id);
        }
    }

    #[test]
    fn lifespan_decays_every_action() {
        let out = run(&PlayerState::new("Lin"), &result(EventCategory::SecretRealm, EventPayload::None));
        assert_eq!(out.state.lifespan, 99.0);
        let out = run(&PlayerState::new("Lin"), &result(EventCategory::Lucky, EventPayload::None));
        assert!((out.state.lifespan - 99.7).abs() < 1e-9);
    }

    #[test]
    fn affinities_clamp() {
        let mut r = result(EventCategory::Normal, EventPayload::None);
        r.deltas.affinity = Affinities { metal: 500, wood: -500, ..Default::default() };
        let out = run(&PlayerState::new("Lin"), &r);
        assert_eq!(out.state.affinities.metal, AFFINITY_MAX);
        assert_eq!(out.state.affinities.wood, 0);
    }

    #[test]
    fn currency_floors_at_zero() {
        let mut r = result(EventCategory::Normal, EventPayload::None);
        r.deltas.spirit_stones = -10_000;
        r.deltas.exp = -10;
        let out = run(&PlayerState::new("Lin"), &r);
        assert_eq!(out.state.spirit_stones, 0);
        assert_eq!(out.state.exp, 0);
    }

    #[test]
    fn boss_and_choice_are_left_pending() {
        let out = run(
            &PlayerState::new("Lin"),
            &result(EventCategory::Normal, EventPayload::BossEncounter { boss_id: "boss-flood-dragon".into() }),
        );
        assert_eq!(out.pending_boss.as_deref(), Some("boss-flood-dragon"));

        let event = ReputationEvent {
            title: "A choice".into(),
            description: String::new(),
            choices: vec![ReputationOption::default(), ReputationOption::default()],
        };
        let out = run(
            &PlayerState::new("Lin"),
            &result(EventCategory::Normal, EventPayload::ReputationChoice(event.clone())),
        );
        assert_eq!(out.pending_choice, Some(event));
    }

    #[test]
    fn reputation_choice_applies_and_rejects_bad_index() {
        let catalog = catalog();
        let stats = StandardStats { catalog: &catalog };
        let event = ReputationEvent {
            title: "A wounded disciple".into(),
            description: String::new(),
            choices: vec![
                ReputationOption { text: "Help".into(), reputation: 10, hp: -200, exp: 5, spirit_stones: 0 },
                ReputationOption { text: "Rob".into(), reputation: -10, hp: 0, exp: 0, spirit_stones: 40 },
            ],
        };
        let prev = PlayerState::new("Lin");
        let (s, log) = apply_reputation_choice(&prev, &event, 0, &stats).unwrap();
        assert_eq!(s.reputation, 10);
        assert_eq!(s.hp, 0);
        assert!(!log.is_empty());
        let (s, _) = apply_reputation_choice(&prev, &event, 1, &stats).unwrap();
        assert_eq!(s.reputation, 0);
        assert_eq!(s.spirit_stones, 90);
        assert!(matches!(
            apply_reputation_choice(&prev, &event, 2, &stats),
            Err(CoreError::UnknownChoice { index: 2, len: 2 })
        ));
    }

    #[test]
    fn realm_level_bonus_caps() {
        let mut r = result(EventCategory::Lucky, EventPayload::None);
        r.bonus = Some(LuckyBonus::RealmLevelUp);
        let mut s = PlayerState::new("Lin");
        s.realm_level = 8;
        s = run(&s, &r).state;
        assert_eq!(s.realm_level, 9);
        s = run(&s, &r).state;
        assert_eq!(s.realm_level, 9);
    }

    #[test]
    fn learned_art_is_always_unlocked() {
        let mut prev = PlayerState::new("Lin");
        prev.learned_arts = vec!["art-breathing".into(), "art-breathing".into()];
        let out = run(&prev, &result(EventCategory::Normal, EventPayload::None));
        assert_eq!(out.state.learned_arts, vec!["art-breathing"]);
        assert!(out.state.unlocked_arts.contains(&"art-breathing".to_string()));
    }

    #[test]
    fn learned_max_hp_bonus_rescales_hp() {
        let catalog = catalog();
        let stats = StandardStats { catalog: &catalog };
        let mut s = PlayerState::new("Lin");
        s.learned_arts.push("art-breathing".into());
        assert_eq!(stats.actual_max_hp(&s), 120);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::adventure::templates::{Deltas, EventKind};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn arb_reduction() -> impl Strategy<Value = AttributeReduction> {
        (0i64..500, 0i64..500, 0i64..500, 0i64..500, 0i64..500, 0i64..2000).prop_map(
            |(attack, defense, spirit, physique, speed, max_hp)| AttributeReduction {
                attack,
                defense,
                spirit,
                physique,
                speed,
                max_hp,
            },
        )
    }

    fn arb_player() -> impl Strategy<Value = PlayerState> {
        (1i64..1000, 1i64..1000, 1i64..1000, 1i64..1000, 1i64..1000, 10i64..5000).prop_map(
            |(attack, defense, spirit, physique, speed, max_hp)| {
                let mut s = PlayerState::new("Prop");
                s.attack = attack;
                s.defense = defense;
                s.spirit = spirit;
                s.physique = physique;
                s.speed = speed;
                s.max_hp = max_hp;
                s.hp = max_hp;
                s
            },
        )
    }

    proptest! {
        #[test]
        fn prop_reconcile_hp_in_bounds(
            old_hp in 0i64..10_000,
            old_max in 1i64..10_000,
            new_max in 0i64..10_000,
            delta in -20_000i64..20_000,
        ) {
            let hp = reconcile_hp(old_hp.min(old_max), old_max, new_max, delta);
            prop_assert!(hp >= 0 && hp <= new_max);
        }

        #[test]
        fn prop_reduction_caps_hold(prev in arb_player(), request in arb_reduction()) {
            let catalog = ContentCatalog::builtin().unwrap().with_diagnostics(false);
            let config = EngineConfig { art_base_chance: 0.0, advanced_drop_chances: [0.0; 4], ..EngineConfig::default() };
            let stats = StandardStats { catalog: &catalog };
            let ctx = ApplyContext { catalog: &catalog, config: &config, stats: &stats };
            let r = AdventureResult {
                template_id: None,
                category: EventCategory::Normal,
                kind: EventKind::Hazard,
                risk_level: None,
                story: String::new(),
                tone: Tone::Danger,
                deltas: Deltas::default(),
                payload: EventPayload::Hazard(request),
                bonus: None,
                pet_cooldowns: BTreeMap::new(),
            };
            let out = apply(&prev, &r, &ctx, &mut StdRng::seed_from_u64(0));
            let before = [prev.attack, prev.defense, prev.spirit, prev.physique, prev.speed, prev.max_hp];
            let after = [out.state.attack, out.state.defense, out.state.spirit, out.state.physique, out.state.speed, out.state.max_hp];
            let sum: i64 = before.iter().sum();
            let mut removed = 0;
            for i in 0..6 {
                let d = before[i] - after[i];
                prop_assert!(d >= 0);
                prop_assert!(d as f64 <= before[i] as f64 * 0.10);
                removed += d;
            }
            prop_assert!(removed as f64 <= sum as f64 * 0.15);
        }

        #[test]
        fn prop_inventory_invariants(names in proptest::collection::vec(0usize..6, 1..12)) {
            let catalog = ContentCatalog::builtin().unwrap().with_diagnostics(false);
            let config = EngineConfig::default();
            let stats = StandardStats { catalog: &catalog };
            let ctx = ApplyContext { catalog: &catalog, config: &config, stats: &stats };
            let pool = catalog.all_items();
            let items: Vec<Item> = names.iter().map(|&i| catalog.normalize(&pool[i * 3 % pool.len()])).collect();
            let r = AdventureResult {
                template_id: None,
                category: EventCategory::Normal,
                kind: EventKind::MiniDungeon,
                risk_level: None,
                story: String::new(),
                tone: Tone::Gain,
                deltas: Deltas::default(),
                payload: EventPayload::Loot(items),
                bonus: None,
                pet_cooldowns: BTreeMap::new(),
            };
            let mut s = PlayerState::new("Prop");
            let mut rng = StdRng::seed_from_u64(3);
            for _ in 0..3 {
                s = apply(&s, &r, &ctx, &mut rng).state;
            }
            for item in &s.inventory {
                if item.is_stackable() {
                    prop_assert_eq!(s.inventory.iter().filter(|i| i.name == item.name).count(), 1);
                }
                if item.is_equippable() {
                    prop_assert!(item.permanent_effect.is_none());
                }
            }
            let mut unlocked = s.unlocked_arts.clone();
            unlocked.sort();
            unlocked.dedup();
            prop_assert_eq!(unlocked.len(), s.unlocked_arts.len());
            prop_assert!(s.learned_arts.iter().all(|a| s.unlocked_arts.contains(a)));
        }
    }
}
