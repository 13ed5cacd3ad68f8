//! Event templates: the pre-generated pool of possible encounter outcomes.
//!
//! Generation is table driven. Each sub-type registers a small pure
//! generator `fn(&GenContext) -> EventTemplate`; the normal-category
//! dispatcher is a single weighted lookup over that table. All draws here
//! are seeded by the template index, so regenerating yields the same pool.

use serde::{Deserialize, Serialize};

use super::content::{ContentCatalog, ItemTemplate, PetStats};
use super::rng::{
    deterministic_random, random_chance, random_float, random_int, rotate, select_from_array,
};
use super::state::{Affinities, Element, Item, ItemType, Rarity, Realm, Tone};
use crate::config::TemplateCounts;

// ── Categories & tags ──────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Normal,
    Lucky,
    SecretRealm,
    SectChallenge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

pub const ALL_RISKS: [RiskLevel; 4] = [
    RiskLevel::Low,
    RiskLevel::Medium,
    RiskLevel::High,
    RiskLevel::Extreme,
];

impl RiskLevel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        }
    }

    /// Reward magnitude multiplier. Strictly increasing with risk.
    pub fn reward_scale(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 1.8,
            RiskLevel::High => 3.0,
            RiskLevel::Extreme => 5.0,
        }
    }

    /// HP cost multiplier. Strictly increasing with risk.
    pub fn hp_cost_scale(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.5,
            RiskLevel::Extreme => 6.0,
        }
    }

    /// Lowest rarity a secret-realm item of this risk may have.
    pub fn rarity_floor(self) -> Rarity {
        match self {
            RiskLevel::Low | RiskLevel::Medium => Rarity::Rare,
            RiskLevel::High | RiskLevel::Extreme => Rarity::Legendary,
        }
    }
}

/// Sub-type tag of a template or result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Battle,
    HerbLoot,
    Merchant,
    MiniDungeon,
    Insight,
    TechniqueScroll,
    Hazard,
    Stash,
    Rescue,
    SpiritSpring,
    PetEncounter,
    PetGrowth,
    Trap,
    HostileCultivator,
    ReputationChoice,
    RareMaterial,
    AdvancedMaterial(u8),
    BossEncounter,
    RuleUnlock,
    Lottery,
    Inheritance,
    LuckyFind,
    SecretRealm,
    SectChallenge,
    /// Produced from a battle resolver outcome, never generated.
    BattleResolved,
}

/// Inclusive realm range a template is offered in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmGate {
    pub min: Realm,
    pub max: Realm,
}

impl RealmGate {
    pub const ANY: RealmGate = RealmGate {
        min: Realm::QiRefining,
        max: Realm::MAX,
    };

    pub const fn between(min: Realm, max: Realm) -> RealmGate {
        RealmGate { min, max }
    }

    pub fn contains(&self, realm: Realm) -> bool {
        realm >= self.min && realm <= self.max
    }
}

/// Boss encounters never appear below this realm.
pub const BOSS_MIN_REALM: Realm = Realm::NascentSoul;

/// Realm windows for advanced-material tiers 1..=4.
pub const ADVANCED_TIER_REALMS: [RealmGate; 4] = [
    RealmGate::between(Realm::QiRefining, Realm::GoldenCore),
    RealmGate::between(Realm::Foundation, Realm::NascentSoul),
    RealmGate::between(Realm::GoldenCore, Realm::SpiritSevering),
    RealmGate::between(Realm::SpiritSevering, Realm::DaoSeeking),
];

// ── Payloads ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetGrowthKind {
    Evolution,
    Levels(u32),
    Stats(PetStats),
    Exp(u64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PetGrowth {
    /// Explicit target; otherwise the active pet, otherwise the first pet.
    pub pet_id: Option<String>,
    pub kind: PetGrowthKind,
}

/// Requested (pre-cap) stat losses. Positive numbers mean "lose this much".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeReduction {
    pub attack: i64,
    pub defense: i64,
    pub spirit: i64,
    pub physique: i64,
    pub speed: i64,
    pub max_hp: i64,
}

impl AttributeReduction {
    pub fn total(&self) -> i64 {
        self.attack + self.defense + self.spirit + self.physique + self.speed + self.max_hp
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationOption {
    pub text: String,
    pub reputation: i64,
    pub hp: i64,
    pub exp: i64,
    pub spirit_stones: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReputationEvent {
    pub title: String,
    pub description: String,
    /// Two to four options.
    pub choices: Vec<ReputationOption>,
}

/// What a template grants besides its flat deltas. At most one per event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    #[default]
    None,
    Combat { opponent: String, victory: bool },
    Loot(Vec<Item>),
    Pet { template_id: String },
    PetGrowth(PetGrowth),
    Hazard(AttributeReduction),
    ReputationChoice(ReputationEvent),
    RareMaterial(Item),
    AdvancedMaterial { advanced_id: String, tier: u8 },
    BossEncounter { boss_id: String },
    RuleUnlock { rule_id: String },
    Lottery { tickets: u32 },
    Inheritance,
}

impl EventPayload {
    /// Items granted directly by this payload.
    pub fn items(&self) -> &[Item] {
        match self {
            EventPayload::Loot(items) => items,
            EventPayload::RareMaterial(item) => std::slice::from_ref(item),
            _ => &[],
        }
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        match self {
            EventPayload::Loot(items) => items,
            EventPayload::RareMaterial(item) => std::slice::from_mut(item),
            _ => &mut [],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckyBonus {
    /// Raise the sub-level by one.
    RealmLevelUp,
    /// Immediately run one secret-realm adventure.
    ChainSecretRealm,
}

/// Flat numeric effects of an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deltas {
    pub hp: i64,
    pub exp: i64,
    pub spirit_stones: i64,
    pub reputation: i64,
    pub lifespan: f64,
    pub affinity: Affinities,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: usize,
    pub category: EventCategory,
    pub kind: EventKind,
    /// Only set on secret-realm templates.
    pub risk_level: Option<RiskLevel>,
    pub gate: RealmGate,
    pub story: String,
    pub tone: Tone,
    pub deltas: Deltas,
    pub payload: EventPayload,
    pub bonus: Option<LuckyBonus>,
}

// ── Generation context ─────────────────────────────────────────

pub struct GenContext<'a> {
    pub index: usize,
    pub catalog: &'a ContentCatalog,
}

impl<'a> GenContext<'a> {
    fn int(&self, min: i64, max: i64, offset: u64) -> i64 {
        random_int(self.index, min, max, offset)
    }

    fn float(&self, min: f64, max: f64, offset: u64) -> f64 {
        random_float(self.index, min, max, offset)
    }

    fn chance(&self, p: f64, offset: u64) -> bool {
        random_chance(self.index, p, offset)
    }

    fn story(&self, set: &[&str]) -> String {
        rotate(set, self.index / 7)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    fn element(&self, offset: u64) -> Element {
        const ELEMENTS: [Element; 5] = [
            Element::Metal,
            Element::Wood,
            Element::Water,
            Element::Fire,
            Element::Earth,
        ];
        ELEMENTS[self.int(0, 4, offset) as usize]
    }

    /// Roll a rarity from cumulative weights (common, rare, legendary, mythic).
    fn rarity(&self, weights: [f64; 4], offset: u64) -> Rarity {
        let total: f64 = weights.iter().sum();
        let mut roll = deterministic_random(self.index, offset) * total;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return Rarity::from_index(i);
            }
            roll -= w;
        }
        Rarity::Common
    }

    fn item(&self, rarity: Rarity) -> Option<Item> {
        self.catalog.seeded_item_of_rarity(rarity, self.index)
    }

    fn item_of_type(&self, rarity: Rarity, item_type: ItemType) -> Option<Item> {
        self.catalog
            .seeded_item_matching(rarity, self.index, |t: &ItemTemplate| t.item_type == Some(item_type))
    }

    fn loot(&self, item: Option<Item>) -> EventPayload {
        match item {
            Some(i) => EventPayload::Loot(vec![i]),
            None => EventPayload::None,
        }
    }

    fn base(&self, category: EventCategory, kind: EventKind, story: String, tone: Tone) -> EventTemplate {
        EventTemplate {
            id: self.index,
            category,
            kind,
            risk_level: None,
            gate: RealmGate::ANY,
            story,
            tone,
            deltas: Deltas::default(),
            payload: EventPayload::None,
            bonus: None,
        }
    }

    fn normal(&self, kind: EventKind, set: &[&str], tone: Tone) -> EventTemplate {
        self.base(EventCategory::Normal, kind, self.story(set), tone)
    }
}

pub type GeneratorFn = fn(&GenContext) -> EventTemplate;

/// One registered normal sub-type.
pub struct NormalGenerator {
    pub kind: EventKind,
    pub weight: f64,
    pub generate: GeneratorFn,
}

// ── Normal sub-type generators ─────────────────────────────────

fn gen_battle(ctx: &GenContext) -> EventTemplate {
    const OPPONENTS: [&str; 4] = ["a rogue cultivator", "a starving wolf pack", "a corpse puppet", "a mountain bandit chief"];
    let opponent = select_from_array(&OPPONENTS, ctx.index)
        .map(|s| s.to_string())
        .unwrap_or_default();
    let victory = ctx.chance(0.7, 2);
    let mut t = if victory {
        let mut t = ctx.base(EventCategory::Normal, EventKind::Battle, format!("You were ambushed by {} and cut your way out.", opponent), Tone::Gain);
        t.deltas.hp = -ctx.int(5, 20, 3);
        t.deltas.exp = ctx.int(20, 60, 4);
        t.deltas.spirit_stones = ctx.int(10, 40, 5);
        t
    } else {
        let mut t = ctx.base(EventCategory::Normal, EventKind::Battle, format!("You were ambushed by {} and barely escaped.", opponent), Tone::Danger);
        t.deltas.hp = -ctx.int(15, 40, 3);
        t.deltas.exp = ctx.int(5, 10, 4);
        t
    };
    t.payload = EventPayload::Combat { opponent, victory };
    t
}

fn gen_herb_loot(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::HerbLoot,
        &[
            "Deep in a misty valley you found a patch of spirit herbs.",
            "A faint fragrance led you to herbs growing on a cliff face.",
            "Beside a dead beast's den, herbs grew thick on the blood-fed soil.",
        ],
        Tone::Gain,
    );
    let rarity = ctx.rarity([70.0, 25.0, 5.0, 0.0], 2);
    t.payload = ctx.loot(ctx.item_of_type(rarity, ItemType::Herb));
    t.deltas.exp = ctx.int(5, 15, 3);
    t
}

fn gen_merchant(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Merchant,
        &[
            "A travelling pill merchant sold you one of his wares.",
            "An old peddler insisted you buy something before he would let you pass.",
        ],
        Tone::Normal,
    );
    let rarity = ctx.rarity([60.0, 35.0, 5.0, 0.0], 2);
    t.payload = ctx.loot(ctx.item_of_type(rarity, ItemType::Pill));
    t.deltas.spirit_stones = -ctx.int(10, 30, 3);
    t.deltas.exp = ctx.int(5, 15, 4);
    t
}

fn gen_mini_dungeon(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::MiniDungeon,
        &[
            "You cleared a small abandoned cave dwelling of its guardians.",
            "A collapsed tomb held a few traps and a few treasures.",
            "You explored the ruins of a minor sect's outpost.",
        ],
        Tone::Gain,
    );
    t.deltas.hp = -ctx.int(10, 30, 2);
    t.deltas.exp = ctx.int(30, 80, 3);
    t.deltas.spirit_stones = ctx.int(20, 60, 4);
    let rarity = ctx.rarity([55.0, 35.0, 9.0, 1.0], 5);
    t.payload = ctx.loot(ctx.item(rarity));
    t
}

fn gen_insight(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Insight,
        &[
            "Watching a waterfall, you were struck by sudden insight.",
            "A falling leaf revealed a truth about the flow of qi.",
            "Meditating beneath the stars, your mind cleared.",
        ],
        Tone::Special,
    );
    t.deltas.exp = ctx.int(40, 120, 2);
    t.deltas.affinity = Affinities::single(ctx.element(3), ctx.int(1, 3, 4) as i32);
    t
}

fn gen_technique_scroll(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::TechniqueScroll,
        &[
            "Inside a hollow tree you found a technique manual wrapped in oilcloth.",
            "A dying elder pressed a jade slip into your hand: a secret technique.",
            "Carvings on a cave wall described a forgotten cultivation technique.",
        ],
        Tone::Special,
    );
    t.deltas.exp = ctx.int(10, 30, 2);
    t
}

fn gen_hazard(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Hazard,
        &[
            "Poisonous miasma seeped into your meridians.",
            "A backlash of chaotic qi tore through your body.",
            "You stumbled into a withering formation.",
        ],
        Tone::Danger,
    );
    t.deltas.hp = -ctx.int(10, 25, 2);
    t.payload = EventPayload::Hazard(AttributeReduction {
        attack: ctx.int(0, 6, 3),
        defense: ctx.int(0, 6, 4),
        spirit: ctx.int(0, 4, 5),
        physique: ctx.int(0, 4, 6),
        speed: ctx.int(0, 3, 7),
        max_hp: ctx.int(0, 15, 8),
    });
    t
}

fn gen_stash(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Stash,
        &[
            "Under a loose stone you found a pouch of spirit stones.",
            "A fallen cultivator's storage bag still held some spirit stones.",
        ],
        Tone::Gain,
    );
    t.deltas.spirit_stones = ctx.int(30, 120, 2);
    t
}

fn gen_rescue(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Rescue,
        &[
            "You drove off beasts attacking a merchant caravan.",
            "You pulled a young disciple out of a collapsed mine.",
        ],
        Tone::Gain,
    );
    t.deltas.hp = -ctx.int(5, 15, 2);
    t.deltas.exp = ctx.int(10, 30, 3);
    t.deltas.reputation = ctx.int(5, 15, 4);
    t
}

fn gen_spirit_spring(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::SpiritSpring,
        &[
            "You bathed in a spring of pure spiritual water.",
            "A hidden spring soothed your wounds and lengthened your breath.",
        ],
        Tone::Gain,
    );
    t.deltas.hp = ctx.int(20, 50, 2);
    t.deltas.lifespan = (ctx.float(0.5, 2.0, 3) * 10.0).round() / 10.0;
    t.deltas.affinity = Affinities::single(Element::Water, ctx.int(2, 5, 4) as i32);
    t
}

fn gen_pet_encounter(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::PetEncounter,
        &[
            "A small spirit beast followed you out of the forest and would not leave.",
            "You found an egg, still warm, in an abandoned nest.",
        ],
        Tone::Special,
    );
    if let Ok(pet) = rotate(ctx.catalog.pet_templates(), ctx.int(0, 1000, 2) as usize) {
        t.payload = EventPayload::Pet {
            template_id: pet.id.clone(),
        };
    }
    t
}

fn gen_pet_growth(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::PetGrowth,
        &[
            "Your companion devoured a spirit fruit and glowed brightly.",
            "Your companion sparred with a wild beast and grew stronger.",
        ],
        Tone::Special,
    );
    let roll = deterministic_random(ctx.index, 2);
    let kind = if roll < 0.1 {
        PetGrowthKind::Evolution
    } else if roll < 0.4 {
        PetGrowthKind::Levels(ctx.int(1, 3, 3) as u32)
    } else if roll < 0.6 {
        PetGrowthKind::Stats(PetStats {
            attack: ctx.int(1, 5, 4),
            defense: ctx.int(1, 5, 5),
            hp: ctx.int(5, 20, 6),
            speed: ctx.int(0, 3, 7),
        })
    } else {
        PetGrowthKind::Exp(ctx.int(50, 200, 8) as u64)
    };
    t.payload = EventPayload::PetGrowth(PetGrowth { pet_id: None, kind });
    t
}

fn gen_trap(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Trap,
        &[
            "A hidden formation flared and burned you.",
            "The ground gave way into a pit of iron spikes.",
            "A poisoned needle shot from an old chest.",
        ],
        Tone::Danger,
    );
    t.deltas.hp = -ctx.int(20, 50, 2);
    t
}

fn gen_hostile(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::HostileCultivator,
        &[
            "A demonic cultivator robbed you on the road.",
            "Sect bullies demanded a toll and took it by force.",
        ],
        Tone::Danger,
    );
    t.deltas.hp = -ctx.int(15, 35, 2);
    t.deltas.spirit_stones = -ctx.int(10, 40, 3);
    t.deltas.exp = ctx.int(10, 20, 4);
    t
}

const REPUTATION_EVENTS: [(&str, &str, [(&str, i64, i64, i64, i64); 3]); 3] = [
    (
        "A wounded disciple",
        "A disciple of a rival sect lies bleeding by the road.",
        [
            ("Tend his wounds", 12, -10, 10, 0),
            ("Take his storage bag", -15, 0, 0, 60),
            ("Walk on", 0, 0, 0, 0),
        ],
    ),
    (
        "A village in fear",
        "Villagers beg you to slay a beast that has been taking their children.",
        [
            ("Hunt the beast", 20, -30, 40, 0),
            ("Demand payment first", -5, -30, 40, 40),
            ("Refuse", -5, 0, 0, 0),
        ],
    ),
    (
        "A disputed treasure",
        "Two cultivators fight over a spirit herb and ask you to judge.",
        [
            ("Judge fairly", 10, 0, 15, 0),
            ("Take the herb yourself", -20, -10, 0, 50),
            ("Leave them to it", 0, 0, 0, 0),
        ],
    ),
];

fn gen_reputation_choice(ctx: &GenContext) -> EventTemplate {
    let (title, description, options) = REPUTATION_EVENTS[ctx.index % REPUTATION_EVENTS.len()];
    let mut t = ctx.base(EventCategory::Normal, EventKind::ReputationChoice, description.to_string(), Tone::Special);
    t.payload = EventPayload::ReputationChoice(ReputationEvent {
        title: title.to_string(),
        description: description.to_string(),
        choices: options
            .iter()
            .map(|&(text, reputation, hp, exp, spirit_stones)| ReputationOption {
                text: text.to_string(),
                reputation,
                hp,
                exp,
                spirit_stones,
            })
            .collect(),
    });
    t
}

fn gen_rare_material(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::RareMaterial,
        &[
            "Lightning struck nearby, leaving behind something precious.",
            "A beast's lair held a rare crafting material.",
        ],
        Tone::Special,
    );
    if let Ok(template) = rotate(ctx.catalog.rare_materials(), ctx.int(0, 1000, 2) as usize) {
        let mut item = ctx.catalog.normalize(template);
        item.quantity = ctx.int(1, 2, 3) as u32;
        t.payload = EventPayload::RareMaterial(item);
    }
    t
}

fn advanced_material(ctx: &GenContext, tier: u8) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::AdvancedMaterial(tier),
        &[
            "You dug a glowing fragment out of an old battlefield.",
            "A collapsed vein exposed a seam of rare material.",
        ],
        Tone::Special,
    );
    t.gate = ADVANCED_TIER_REALMS[(tier as usize - 1).min(3)];
    let candidates = ctx.catalog.advanced_items_of_tier(tier);
    if let Ok(adv) = rotate(&candidates, ctx.int(0, 1000, 2) as usize) {
        t.payload = EventPayload::AdvancedMaterial {
            advanced_id: adv.id.clone(),
            tier,
        };
    }
    t.deltas.exp = ctx.int(10, 30, 3) * tier as i64;
    t
}

fn gen_material_t1(ctx: &GenContext) -> EventTemplate {
    advanced_material(ctx, 1)
}

fn gen_material_t2(ctx: &GenContext) -> EventTemplate {
    advanced_material(ctx, 2)
}

fn gen_material_t3(ctx: &GenContext) -> EventTemplate {
    advanced_material(ctx, 3)
}

fn gen_material_t4(ctx: &GenContext) -> EventTemplate {
    advanced_material(ctx, 4)
}

fn gen_boss(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::BossEncounter,
        &[
            "The sky darkened. Something ancient has noticed you.",
            "A terrible pressure descends: a great enemy blocks your path.",
        ],
        Tone::Danger,
    );
    t.gate = RealmGate::between(BOSS_MIN_REALM, Realm::MAX);
    if let Ok(boss) = rotate(ctx.catalog.bosses(), ctx.int(0, 1000, 2) as usize) {
        t.payload = EventPayload::BossEncounter {
            boss_id: boss.id.clone(),
        };
    }
    t
}

fn gen_rule_unlock(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::RuleUnlock,
        &[
            "At the edge of heaven you glimpsed one of the world's laws.",
            "The Dao itself whispered a rule to you.",
        ],
        Tone::Special,
    );
    t.gate = RealmGate::between(Realm::MAX, Realm::MAX);
    if let Ok(rule) = rotate(ctx.catalog.rules(), ctx.int(0, 1000, 2) as usize) {
        t.payload = EventPayload::RuleUnlock {
            rule_id: rule.id.clone(),
        };
    }
    t
}

fn gen_lottery(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Lottery,
        &[
            "A fortune teller handed you some lottery tickets for free.",
            "You won lottery tickets in a roadside game of chance.",
        ],
        Tone::Gain,
    );
    t.payload = EventPayload::Lottery {
        tickets: ctx.int(1, 3, 2) as u32,
    };
    t
}

fn gen_inheritance(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.normal(
        EventKind::Inheritance,
        &[
            "You stumbled into the sealed vault of an ancient master.",
            "An inheritance formation recognised you as a worthy successor.",
        ],
        Tone::Special,
    );
    t.gate = RealmGate::between(Realm::Foundation, Realm::MAX);
    t.deltas.exp = ctx.int(50, 100, 2);
    t.payload = EventPayload::Inheritance;
    t
}

/// Registered normal sub-types and their relative frequency.
pub const NORMAL_GENERATORS: &[NormalGenerator] = &[
    NormalGenerator { kind: EventKind::Battle, weight: 12.0, generate: gen_battle },
    NormalGenerator { kind: EventKind::HerbLoot, weight: 10.0, generate: gen_herb_loot },
    NormalGenerator { kind: EventKind::Merchant, weight: 5.0, generate: gen_merchant },
    NormalGenerator { kind: EventKind::MiniDungeon, weight: 7.0, generate: gen_mini_dungeon },
    NormalGenerator { kind: EventKind::Insight, weight: 6.0, generate: gen_insight },
    NormalGenerator { kind: EventKind::TechniqueScroll, weight: 3.0, generate: gen_technique_scroll },
    NormalGenerator { kind: EventKind::Hazard, weight: 5.0, generate: gen_hazard },
    NormalGenerator { kind: EventKind::Stash, weight: 7.0, generate: gen_stash },
    NormalGenerator { kind: EventKind::Rescue, weight: 5.0, generate: gen_rescue },
    NormalGenerator { kind: EventKind::SpiritSpring, weight: 4.0, generate: gen_spirit_spring },
    NormalGenerator { kind: EventKind::PetEncounter, weight: 3.0, generate: gen_pet_encounter },
    NormalGenerator { kind: EventKind::PetGrowth, weight: 3.0, generate: gen_pet_growth },
    NormalGenerator { kind: EventKind::Trap, weight: 6.0, generate: gen_trap },
    NormalGenerator { kind: EventKind::HostileCultivator, weight: 5.0, generate: gen_hostile },
    NormalGenerator { kind: EventKind::ReputationChoice, weight: 4.0, generate: gen_reputation_choice },
    NormalGenerator { kind: EventKind::RareMaterial, weight: 3.0, generate: gen_rare_material },
    NormalGenerator { kind: EventKind::AdvancedMaterial(1), weight: 2.0, generate: gen_material_t1 },
    NormalGenerator { kind: EventKind::AdvancedMaterial(2), weight: 2.0, generate: gen_material_t2 },
    NormalGenerator { kind: EventKind::AdvancedMaterial(3), weight: 2.0, generate: gen_material_t3 },
    NormalGenerator { kind: EventKind::AdvancedMaterial(4), weight: 2.0, generate: gen_material_t4 },
    NormalGenerator { kind: EventKind::BossEncounter, weight: 2.0, generate: gen_boss },
    NormalGenerator { kind: EventKind::RuleUnlock, weight: 1.5, generate: gen_rule_unlock },
    NormalGenerator { kind: EventKind::Lottery, weight: 3.0, generate: gen_lottery },
    NormalGenerator { kind: EventKind::Inheritance, weight: 1.5, generate: gen_inheritance },
];

fn normal_generator_for(index: usize) -> &'static NormalGenerator {
    let total: f64 = NORMAL_GENERATORS.iter().map(|g| g.weight).sum();
    let mut roll = deterministic_random(index, 1) * total;
    for g in NORMAL_GENERATORS {
        if roll < g.weight {
            return g;
        }
        roll -= g.weight;
    }
    &NORMAL_GENERATORS[0]
}

pub fn generate_normal(ctx: &GenContext) -> EventTemplate {
    (normal_generator_for(ctx.index).generate)(ctx)
}

// ── Other categories ───────────────────────────────────────────

pub fn generate_lucky(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.base(
        EventCategory::Lucky,
        EventKind::LuckyFind,
        ctx.story(&[
            "Heaven smiled on you: a treasure fell from the clouds.",
            "You tripped over a root and landed on an immortal's cache.",
            "A passing immortal took a liking to you and left a gift.",
        ]),
        Tone::Special,
    );
    t.deltas.exp = ctx.int(100, 300, 2);
    t.deltas.spirit_stones = ctx.int(100, 300, 3);
    t.deltas.hp = ctx.int(0, 30, 4);
    let rarity = if ctx.chance(0.2, 5) {
        Rarity::Mythic
    } else {
        Rarity::Legendary
    };
    t.payload = ctx.loot(ctx.item(rarity).map(|mut item| {
        item.rarity = item.rarity.max(Rarity::Legendary);
        item
    }));
    t.bonus = if ctx.chance(0.08, 6) {
        Some(LuckyBonus::RealmLevelUp)
    } else if ctx.chance(0.05, 7) {
        Some(LuckyBonus::ChainSecretRealm)
    } else {
        None
    };
    t
}

pub fn generate_secret_realm(ctx: &GenContext, risk: RiskLevel) -> EventTemplate {
    let story = match risk {
        RiskLevel::Low => ctx.story(&[
            "The outer halls of the secret realm held modest treasures.",
            "You searched a quiet corner of the secret realm.",
        ]),
        RiskLevel::Medium => ctx.story(&[
            "Guardian puppets patrolled the secret realm's middle ring.",
            "You solved a formation puzzle deep in the secret realm.",
        ]),
        RiskLevel::High => ctx.story(&[
            "Ancient beasts guarded the secret realm's inner sanctum.",
            "You fought through killing formations to reach a treasure hall.",
        ]),
        RiskLevel::Extreme => ctx.story(&[
            "At the realm's core, spatial storms tore at your flesh.",
            "You entered the tomb of a fallen immortal. It was not empty.",
        ]),
    };
    let tone = if risk >= RiskLevel::High { Tone::Danger } else { Tone::Special };
    let mut t = ctx.base(EventCategory::SecretRealm, EventKind::SecretRealm, story, tone);
    t.risk_level = Some(risk);
    let reward = risk.reward_scale();
    t.deltas.exp = (ctx.int(50, 150, 2) as f64 * reward).round() as i64;
    t.deltas.spirit_stones = (ctx.int(40, 120, 3) as f64 * reward).round() as i64;
    t.deltas.hp = -(ctx.int(10, 25, 4) as f64 * risk.hp_cost_scale()).round() as i64;

    if risk == RiskLevel::Extreme && ctx.chance(0.3, 5) {
        t.payload = EventPayload::Hazard(AttributeReduction {
            attack: ctx.int(5, 15, 6),
            defense: ctx.int(5, 15, 7),
            spirit: ctx.int(3, 10, 8),
            physique: ctx.int(3, 10, 9),
            speed: ctx.int(2, 6, 10),
            max_hp: ctx.int(10, 40, 11),
        });
        return t;
    }

    let upgrade = match risk {
        RiskLevel::Low => 0.1,
        RiskLevel::Medium => 0.25,
        RiskLevel::High => 0.15,
        RiskLevel::Extreme => 0.3,
    };
    let floor = risk.rarity_floor();
    let rarity = if ctx.chance(upgrade, 12) { floor.next() } else { floor };
    if risk >= RiskLevel::High && ctx.chance(0.2, 13) {
        if let Ok(template) = rotate(ctx.catalog.rare_materials(), ctx.int(0, 1000, 14) as usize) {
            let mut item = ctx.catalog.normalize(template);
            item.rarity = item.rarity.max(floor);
            t.payload = EventPayload::RareMaterial(item);
            return t;
        }
    }
    t.payload = match ctx.item(rarity) {
        Some(mut item) => {
            item.rarity = item.rarity.max(floor);
            EventPayload::Loot(vec![item])
        }
        None => EventPayload::None,
    };
    t
}

pub fn generate_sect_challenge(ctx: &GenContext) -> EventTemplate {
    let mut t = ctx.base(
        EventCategory::SectChallenge,
        EventKind::SectChallenge,
        ctx.story(&[
            "You completed a sect mission to clear beasts from the spirit fields.",
            "You defeated a rival sect's disciple in a public duel.",
            "You escorted a sect elder through dangerous territory.",
        ]),
        Tone::Gain,
    );
    t.deltas.exp = ctx.int(30, 90, 2);
    t.deltas.spirit_stones = ctx.int(20, 80, 3);
    t.deltas.reputation = ctx.int(5, 20, 4);
    t.deltas.hp = -ctx.int(5, 20, 5);
    if ctx.chance(0.4, 6) {
        let rarity = if ctx.chance(0.2, 7) { Rarity::Legendary } else { Rarity::Rare };
        t.payload = match ctx.item(rarity) {
            Some(mut item) => {
                item.rarity = item.rarity.max(Rarity::Rare);
                EventPayload::Loot(vec![item])
            }
            None => EventPayload::None,
        };
    }
    t
}

/// Build the full pool in category order. Template ids are pool indices.
pub fn generate_template_pool(catalog: &ContentCatalog, counts: &TemplateCounts) -> Vec<EventTemplate> {
    let mut pool: Vec<EventTemplate> = Vec::with_capacity(counts.total());
    for _ in 0..counts.normal {
        let ctx = GenContext { index: pool.len(), catalog };
        pool.push(generate_normal(&ctx));
    }
    for _ in 0..counts.lucky {
        let ctx = GenContext { index: pool.len(), catalog };
        pool.push(generate_lucky(&ctx));
    }
    for i in 0..counts.secret_realm {
        let ctx = GenContext { index: pool.len(), catalog };
        pool.push(generate_secret_realm(&ctx, ALL_RISKS[i % ALL_RISKS.len()]));
    }
    for _ in 0..counts.sect_challenge {
        let ctx = GenContext { index: pool.len(), catalog };
        pool.push(generate_sect_challenge(&ctx));
    }
    tracing::debug!("generated {} event templates", pool.len());
    pool
}

/// The template pool, generated at most once.
#[derive(Default)]
pub struct TemplatePool {
    templates: Vec<EventTemplate>,
    initialized: bool,
}

impl TemplatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Generate the pool if it does not exist yet; otherwise a no-op.
    pub fn ensure_generated(&mut self, catalog: &ContentCatalog, counts: &TemplateCounts) -> &[EventTemplate] {
        if !self.initialized {
            self.templates = generate_template_pool(catalog, counts);
            self.initialized = true;
        }
        &self.templates
    }

    pub fn templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    pub fn reset(&mut self) {
        self.templates.clear();
        self.initialized = false;
    }
}
