//! Cultivation adventure state: data structures only, no adventure logic.
//!
//! PlayerState is treated as immutable per version: every handler clones
//! the previous version and returns a new one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Progression ────────────────────────────────────────────────

/// Coarse power rank. Seven ordinal stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Realm {
    QiRefining,
    Foundation,
    GoldenCore,
    NascentSoul,
    SpiritSevering,
    DaoSeeking,
    Immortal,
}

pub const ALL_REALMS: [Realm; 7] = [
    Realm::QiRefining,
    Realm::Foundation,
    Realm::GoldenCore,
    Realm::NascentSoul,
    Realm::SpiritSevering,
    Realm::DaoSeeking,
    Realm::Immortal,
];

/// Sub-levels within a realm run 1..=MAX_REALM_LEVEL.
pub const MAX_REALM_LEVEL: u32 = 9;

impl Realm {
    pub const MAX: Realm = Realm::Immortal;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Realm {
        ALL_REALMS[index.min(ALL_REALMS.len() - 1)]
    }

    /// Base reward multiplier: doubles every realm.
    pub fn base_multiplier(self) -> f64 {
        (1u32 << self.index()) as f64
    }

    pub fn name(self) -> &'static str {
        match self {
            Realm::QiRefining => "Qi Refining",
            Realm::Foundation => "Foundation Establishment",
            Realm::GoldenCore => "Golden Core",
            Realm::NascentSoul => "Nascent Soul",
            Realm::SpiritSevering => "Spirit Severing",
            Realm::DaoSeeking => "Dao Seeking",
            Realm::Immortal => "Immortal Ascension",
        }
    }
}

/// Normalized progression in [0, 1] across every realm and sub-level.
pub fn progress(realm: Realm, realm_level: u32) -> f64 {
    let steps = ALL_REALMS.len() as u32 * MAX_REALM_LEVEL - 1;
    let level = realm_level.clamp(1, MAX_REALM_LEVEL);
    let pos = realm.index() as u32 * MAX_REALM_LEVEL + (level - 1);
    (pos as f64 / steps as f64).clamp(0.0, 1.0)
}

// ── Items ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    Mythic,
}

pub const ALL_RARITIES: [Rarity; 4] = [
    Rarity::Common,
    Rarity::Rare,
    Rarity::Legendary,
    Rarity::Mythic,
];

impl Rarity {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Rarity {
        ALL_RARITIES[index.min(ALL_RARITIES.len() - 1)]
    }

    /// One tier up, saturating at Mythic.
    pub fn next(self) -> Rarity {
        Rarity::from_index(self.index() + 1)
    }

    /// How many tiers remain above this one.
    pub fn steps_to_top(self) -> usize {
        ALL_RARITIES.len() - 1 - self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Herb,
    Pill,
    Material,
    Weapon,
    Armor,
    Accessory,
    Artifact,
    Recipe,
    AdvancedItem,
}

impl ItemType {
    pub fn is_equippable(self) -> bool {
        matches!(
            self,
            ItemType::Weapon | ItemType::Armor | ItemType::Accessory | ItemType::Artifact
        )
    }

    pub fn is_consumable(self) -> bool {
        matches!(self, ItemType::Herb | ItemType::Pill)
    }

    /// Stackable entries merge by name; everything else is one entry per instance.
    pub fn is_stackable(self) -> bool {
        !self.is_equippable() && self != ItemType::AdvancedItem
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemType::Herb => "herb",
            ItemType::Pill => "pill",
            ItemType::Material => "material",
            ItemType::Weapon => "weapon",
            ItemType::Armor => "armor",
            ItemType::Accessory => "accessory",
            ItemType::Artifact => "artifact",
            ItemType::Recipe => "recipe",
            ItemType::AdvancedItem => "advanced item",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Helmet,
    Chest,
    Gloves,
    Boots,
    Ring,
    Necklace,
    Artifact,
}

impl EquipSlot {
    /// The item type that naturally occupies this slot.
    pub fn item_type(self) -> ItemType {
        match self {
            EquipSlot::Weapon => ItemType::Weapon,
            EquipSlot::Helmet | EquipSlot::Chest | EquipSlot::Gloves | EquipSlot::Boots => {
                ItemType::Armor
            }
            EquipSlot::Ring | EquipSlot::Necklace => ItemType::Accessory,
            EquipSlot::Artifact => ItemType::Artifact,
        }
    }
}

/// Numeric stat deltas. Used both for consumable effects and worn bonuses.
/// Zero means "not present".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effect {
    pub hp: i64,
    pub exp: i64,
    pub attack: i64,
    pub defense: i64,
    pub spirit: i64,
    pub physique: i64,
    pub speed: i64,
    pub max_hp: i64,
    pub lifespan: i64,
}

impl Effect {
    pub fn is_empty(&self) -> bool {
        *self == Effect::default()
    }

    /// Apply `f` to every numeric field.
    pub fn map(&self, f: impl Fn(i64) -> i64) -> Effect {
        Effect {
            hp: f(self.hp),
            exp: f(self.exp),
            attack: f(self.attack),
            defense: f(self.defense),
            spirit: f(self.spirit),
            physique: f(self.physique),
            speed: f(self.speed),
            max_hp: f(self.max_hp),
            lifespan: f(self.lifespan),
        }
    }
}

/// One inventory entry. Stackable types are keyed by name; equippable and
/// advanced items are unique per instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub rarity: Rarity,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub equip_slot: Option<EquipSlot>,
    /// Consumed-on-use effect, or the worn bonus for equippables.
    #[serde(default)]
    pub effect: Option<Effect>,
    /// Stat increase applied once on use. Never present on equippables.
    #[serde(default)]
    pub permanent_effect: Option<Effect>,
    /// Reference into the advanced-material table.
    #[serde(default)]
    pub advanced_id: Option<String>,
}

impl Item {
    pub fn is_equippable(&self) -> bool {
        self.item_type.is_equippable()
    }

    pub fn is_stackable(&self) -> bool {
        self.item_type.is_stackable()
    }
}

// ── Pets ───────────────────────────────────────────────────────

pub const MAX_PET_LEVEL: u32 = 100;
pub const MAX_EVOLUTION_STAGE: u8 = 2;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cooldown: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub template_id: String,
    pub name: String,
    /// At most one owned pet per species.
    pub species: String,
    pub rarity: Rarity,
    pub level: u32,
    pub exp: u64,
    pub max_exp: u64,
    /// 0, 1 or 2. Never decreases.
    pub evolution_stage: u8,
    pub attack: i64,
    pub defense: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub speed: i64,
    pub skills: Vec<PetSkill>,
    /// Remaining cooldown turns per skill id.
    #[serde(default)]
    pub skill_cooldowns: BTreeMap<String, u32>,
}

// ── Sects ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectRank {
    Outer,
    Inner,
    Core,
    Elder,
    Leader,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub sect_id: String,
    pub rank: SectRank,
    pub contribution: i64,
}

/// A sect's pursuit of the player after its members were killed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntState {
    pub sect_id: String,
    /// Assassin difficulty, 1..=MAX_HUNT_LEVEL.
    pub level: u8,
    pub until_ms: u64,
}

pub const MAX_HUNT_LEVEL: u8 = 4;
/// How long a hunt lasts after it starts or escalates.
pub const HUNT_DURATION_MS: u64 = 3 * 24 * 60 * 60 * 1000;

impl HuntState {
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.until_ms
    }
}

// ── Affinities ─────────────────────────────────────────────────

pub const AFFINITY_MAX: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Metal,
    Wood,
    Water,
    Fire,
    Earth,
}

/// Five elemental aptitudes, each 0..=100. Also used as a signed delta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Affinities {
    pub metal: i32,
    pub wood: i32,
    pub water: i32,
    pub fire: i32,
    pub earth: i32,
}

impl Affinities {
    pub fn is_zero(&self) -> bool {
        *self == Affinities::default()
    }

    pub fn get_mut(&mut self, element: Element) -> &mut i32 {
        match element {
            Element::Metal => &mut self.metal,
            Element::Wood => &mut self.wood,
            Element::Water => &mut self.water,
            Element::Fire => &mut self.fire,
            Element::Earth => &mut self.earth,
        }
    }

    pub fn single(element: Element, amount: i32) -> Affinities {
        let mut a = Affinities::default();
        *a.get_mut(element) = amount;
        a
    }
}

// ── Planted resources ──────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantedHerb {
    pub id: String,
    pub herb_name: String,
    pub rarity: Rarity,
    pub planted_at_ms: u64,
    pub mature_at_ms: u64,
    pub yield_quantity: u32,
}

// ── Statistics ─────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub adventures: u64,
    pub secret_realms: u64,
    pub battles_won: u64,
    pub battles_lost: u64,
    pub sect_members_slain: u64,
}

// ── Player ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub name: String,
    pub realm: Realm,
    pub realm_level: u32,
    pub exp: i64,
    pub spirit_stones: i64,
    pub lottery_tickets: u32,
    pub inheritance_level: u32,
    pub reputation: i64,

    pub hp: i64,
    /// Base max HP. Actual max HP adds bonuses (see `DerivedStats`).
    pub max_hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub spirit: i64,
    pub physique: i64,
    pub speed: i64,

    pub inventory: Vec<Item>,
    /// Slot → item id.
    pub equipped: BTreeMap<EquipSlot, String>,
    /// Serial used to mint unique instance ids.
    pub item_serial: u64,

    /// Always a subset of `unlocked_arts`.
    pub learned_arts: Vec<String>,
    pub unlocked_arts: Vec<String>,

    pub pets: Vec<Pet>,
    pub active_pet_id: Option<String>,

    pub sect: Option<Membership>,
    pub hunt: Option<HuntState>,

    pub lifespan: f64,
    pub max_lifespan: f64,
    pub affinities: Affinities,

    pub unlocked_rules: Vec<String>,

    pub planted: Vec<PlantedHerb>,
    pub auto_harvest: bool,

    pub stats: Statistics,
}

impl PlayerState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            realm: Realm::QiRefining,
            realm_level: 1,
            exp: 0,
            spirit_stones: 50,
            lottery_tickets: 0,
            inheritance_level: 0,
            reputation: 0,
            hp: 100,
            max_hp: 100,
            attack: 10,
            defense: 5,
            spirit: 10,
            physique: 10,
            speed: 10,
            inventory: Vec::new(),
            equipped: BTreeMap::new(),
            item_serial: 0,
            learned_arts: Vec::new(),
            unlocked_arts: Vec::new(),
            pets: Vec::new(),
            active_pet_id: None,
            sect: None,
            hunt: None,
            lifespan: 100.0,
            max_lifespan: 100.0,
            affinities: Affinities {
                metal: 20,
                wood: 20,
                water: 20,
                fire: 20,
                earth: 20,
            },
            unlocked_rules: Vec::new(),
            planted: Vec::new(),
            auto_harvest: false,
            stats: Statistics::default(),
        }
    }

    /// Mint a fresh instance id.
    pub fn next_item_id(&mut self, prefix: &str) -> String {
        self.item_serial += 1;
        format!("{}-{}", prefix, self.item_serial)
    }

    pub fn item_count(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|i| i.name == name)
            .map(|i| i.quantity)
            .sum()
    }

    pub fn active_pet(&self) -> Option<&Pet> {
        let id = self.active_pet_id.as_ref()?;
        self.pets.iter().find(|p| &p.id == id)
    }

    pub fn sect_id(&self) -> Option<&str> {
        self.sect.as_ref().map(|m| m.sect_id.as_str())
    }
}

// ── Log ────────────────────────────────────────────────────────

/// Severity/colour of a log line or event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Normal,
    Gain,
    Danger,
    Special,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub text: String,
    pub tone: Tone,
}

/// Destination for player-facing log lines.
pub trait LogSink {
    fn add_log(&mut self, text: &str, tone: Tone);
}

impl LogSink for Vec<LogEntry> {
    fn add_log(&mut self, text: &str, tone: Tone) {
        self.push(LogEntry {
            text: text.to_string(),
            tone,
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    ItemObtained,
    PetObtained,
    PetEvolved,
    ArtUnlocked,
    RuleUnlocked,
    RealmLevelUp,
    Danger,
}

/// Cosmetic notification for the host; nothing depends on it.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_multipliers_double() {
        let m: Vec<f64> = ALL_REALMS.iter().map(|r| r.base_multiplier()).collect();
        assert_eq!(m, vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]);
    }

    #[test]
    fn progress_spans_unit_interval() {
        assert_eq!(progress(Realm::QiRefining, 1), 0.0);
        assert_eq!(progress(Realm::Immortal, 9), 1.0);
        let mid = progress(Realm::NascentSoul, 5);
        assert!(mid > 0.4 && mid < 0.6, "got {}", mid);
    }

    #[test]
    fn rarity_next_saturates() {
        assert_eq!(Rarity::Common.next(), Rarity::Rare);
        assert_eq!(Rarity::Mythic.next(), Rarity::Mythic);
        assert_eq!(Rarity::Common.steps_to_top(), 3);
        assert_eq!(Rarity::Mythic.steps_to_top(), 0);
    }

    #[test]
    fn stackable_types() {
        assert!(ItemType::Herb.is_stackable());
        assert!(ItemType::Material.is_stackable());
        assert!(!ItemType::Weapon.is_stackable());
        assert!(!ItemType::AdvancedItem.is_stackable());
    }

    #[test]
    fn next_item_id_is_unique() {
        let mut s = PlayerState::new("Lin");
        let a = s.next_item_id("item");
        let b = s.next_item_id("item");
        assert_ne!(a, b);
    }

    #[test]
    fn effect_deserializes_partial() {
        let e: Effect = serde_json::from_str(r#"{ "hp": 30, "maxHp": 5 }"#).unwrap();
        assert_eq!(e.hp, 30);
        assert_eq!(e.max_hp, 5);
        assert_eq!(e.attack, 0);
    }
}
