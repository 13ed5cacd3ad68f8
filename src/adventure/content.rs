//! Static content lookup.
//!
//! Every item-bearing table is flattened into one pool at construction,
//! de-duplicated by name (first occurrence wins). The catalog is built once
//! and passed by reference; nothing here is global.

use std::collections::HashMap;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::rng::{blended_shuffle, deterministic_random, SHUFFLE_SEEDED_SHARE};
use super::state::{
    Effect, Element, EquipSlot, Item, ItemType, PetSkill, Rarity, Realm, ALL_RARITIES,
};
use crate::error::CoreError;

const BUILTIN_CONTENT: &str = include_str!("builtin.json");

/// Minimum candidate count before the rarity filter widens to neighbours.
const MIN_RARITY_CANDIDATES: usize = 3;

// ── Raw tables ─────────────────────────────────────────────────

/// An item as authored in content data. Type and rarity may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub rarity: Option<Rarity>,
    pub description: String,
    pub equip_slot: Option<EquipSlot>,
    pub effect: Option<Effect>,
    pub permanent_effect: Option<Effect>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PetStats {
    pub attack: i64,
    pub defense: i64,
    pub hp: i64,
    pub speed: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetTemplate {
    pub id: String,
    pub name: String,
    pub species: String,
    pub rarity: Rarity,
    pub base_stats: PetStats,
    #[serde(default)]
    pub skills: Vec<PetSkill>,
}

/// A cultivation technique that can be unlocked and later learned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technique {
    pub id: String,
    pub name: String,
    /// Lowest realm that can receive this technique.
    pub realm: Realm,
    /// Restricted to members of this sect.
    #[serde(default)]
    pub sect: Option<String>,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default)]
    pub bonus: Effect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedItem {
    pub id: String,
    pub name: String,
    /// 1..=4
    pub tier: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effect: Effect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sect {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boss {
    pub id: String,
    pub name: String,
    pub min_realm: Realm,
}

/// Everything the core reads from static data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentTables {
    pub starter_items: Vec<ItemTemplate>,
    pub item_templates: Vec<ItemTemplate>,
    pub recipe_results: Vec<ItemTemplate>,
    pub lottery_prizes: Vec<ItemTemplate>,
    pub shop_items: Vec<ItemTemplate>,
    pub rare_materials: Vec<ItemTemplate>,
    pub pets: Vec<PetTemplate>,
    pub techniques: Vec<Technique>,
    pub advanced_items: Vec<AdvancedItem>,
    pub rules: Vec<Rule>,
    pub sects: Vec<Sect>,
    pub bosses: Vec<Boss>,
}

// ── Name inference ─────────────────────────────────────────────

const NAME_RULES: &[(&[&str], ItemType, Option<EquipSlot>)] = &[
    (&["sword", "blade", "saber", "spear", "halberd", "staff", "whip"], ItemType::Weapon, Some(EquipSlot::Weapon)),
    (&["helm", "crown", "hat", "circlet"], ItemType::Armor, Some(EquipSlot::Helmet)),
    (&["robe", "armor", "armour", "vest", "mail"], ItemType::Armor, Some(EquipSlot::Chest)),
    (&["gauntlet", "glove", "bracer"], ItemType::Armor, Some(EquipSlot::Gloves)),
    (&["boots", "shoes", "sandals"], ItemType::Armor, Some(EquipSlot::Boots)),
    (&["ring"], ItemType::Accessory, Some(EquipSlot::Ring)),
    (&["pendant", "necklace", "amulet"], ItemType::Accessory, Some(EquipSlot::Necklace)),
    (&["bell", "mirror", "cauldron", "pagoda", "seal", "banner"], ItemType::Artifact, Some(EquipSlot::Artifact)),
    (&["pill", "elixir", "tonic"], ItemType::Pill, None),
    (&["herb", "grass", "ginseng", "lotus", "fruit", "mushroom", "flower"], ItemType::Herb, None),
    (&["recipe", "formula"], ItemType::Recipe, None),
    (&["ore", "iron", "jade", "crystal", "scale", "bone", "feather", "essence"], ItemType::Material, None),
];

fn has_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word || (w.starts_with(word) && w.len() <= word.len() + 1))
}

/// Guess type and slot from an item's name, then its description.
pub fn infer_kind(name: &str, description: &str) -> Option<(ItemType, Option<EquipSlot>)> {
    let name = name.to_lowercase();
    let description = description.to_lowercase();
    for text in [&name, &description] {
        for (words, item_type, slot) in NAME_RULES {
            if words.iter().any(|w| has_word(text, w)) {
                return Some((*item_type, *slot));
            }
        }
    }
    None
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Fallback effect for a consumable authored without one.
fn default_consumable_effect(rarity: Rarity) -> Effect {
    Effect {
        hp: 20 * (rarity.index() as i64 + 1),
        ..Effect::default()
    }
}

// ── Catalog ────────────────────────────────────────────────────

pub struct ContentCatalog {
    tables: ContentTables,
    items: Vec<ItemTemplate>,
    by_name: HashMap<String, usize>,
    diagnostics: bool,
}

impl ContentCatalog {
    pub fn new(tables: ContentTables) -> Self {
        let mut items = Vec::new();
        let mut by_name = HashMap::new();
        let sources = [
            &tables.starter_items,
            &tables.item_templates,
            &tables.recipe_results,
            &tables.lottery_prizes,
            &tables.shop_items,
            &tables.rare_materials,
        ];
        for template in sources.into_iter().flatten() {
            if template.name.is_empty() || by_name.contains_key(&template.name) {
                continue;
            }
            by_name.insert(template.name.clone(), items.len());
            items.push(template.clone());
        }
        tracing::debug!("content catalog merged {} items", items.len());
        Self {
            tables,
            items,
            by_name,
            diagnostics: cfg!(debug_assertions),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let tables: ContentTables = serde_json::from_str(json)?;
        Ok(Self::new(tables))
    }

    /// The starter tables shipped with the crate.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_json(BUILTIN_CONTENT)
    }

    pub fn with_diagnostics(mut self, on: bool) -> Self {
        self.diagnostics = on;
        self
    }

    pub fn tables(&self) -> &ContentTables {
        &self.tables
    }

    /// Merged, de-duplicated item pool.
    pub fn all_items(&self) -> &[ItemTemplate] {
        &self.items
    }

    pub fn template_by_name(&self, name: &str) -> Option<&ItemTemplate> {
        self.by_name.get(name).map(|&i| &self.items[i])
    }

    pub fn item_by_name(&self, name: &str) -> Option<Item> {
        self.template_by_name(name).map(|t| self.normalize(t))
    }

    /// Turn authored content into an inventory-ready item, filling gaps
    /// with safe defaults.
    pub fn normalize(&self, template: &ItemTemplate) -> Item {
        let inferred = infer_kind(&template.name, &template.description);
        let item_type = match template.item_type {
            Some(t) => t,
            None => {
                let t = inferred.map(|(t, _)| t).unwrap_or(ItemType::Material);
                if self.diagnostics {
                    tracing::warn!("item '{}' has no type, using {}", template.name, t.name());
                }
                t
            }
        };
        let rarity = match template.rarity {
            Some(r) => r,
            None => {
                if self.diagnostics {
                    tracing::warn!("item '{}' has no rarity, using common", template.name);
                }
                Rarity::Common
            }
        };
        let equip_slot = if item_type.is_equippable() {
            template
                .equip_slot
                .or_else(|| inferred.and_then(|(_, s)| s))
        } else {
            None
        };
        let mut effect = template.effect.clone();
        if item_type.is_consumable() && effect.is_none() && template.permanent_effect.is_none() {
            if self.diagnostics {
                tracing::warn!("consumable '{}' has no effect, synthesizing one", template.name);
            }
            effect = Some(default_consumable_effect(rarity));
        }
        Item {
            id: format!("item-{}", slug(&template.name)),
            name: template.name.clone(),
            item_type,
            rarity,
            quantity: 1,
            description: template.description.clone(),
            equip_slot,
            effect,
            permanent_effect: template.permanent_effect.clone(),
            advanced_id: None,
        }
    }

    fn rarity_candidates(&self, rarity: Rarity, filter: impl Fn(&ItemTemplate) -> bool) -> Vec<usize> {
        let eligible = |i: &usize| filter(&self.items[*i]);
        let of_rarity = |r: Rarity| {
            (0..self.items.len())
                .filter(eligible)
                .filter(move |&i| self.items[i].rarity.unwrap_or(Rarity::Common) == r)
        };
        let mut out: Vec<usize> = of_rarity(rarity).collect();
        if out.len() < MIN_RARITY_CANDIDATES {
            let idx = rarity.index();
            for r in ALL_RARITIES {
                if r != rarity && r.index().abs_diff(idx) == 1 {
                    out.extend(of_rarity(r));
                }
            }
        }
        if out.is_empty() {
            out = (0..self.items.len()).filter(eligible).collect();
        }
        out
    }

    fn pick(
        &self,
        rarity: Rarity,
        index: usize,
        filter: impl Fn(&ItemTemplate) -> bool,
        noise: &mut dyn FnMut() -> f64,
    ) -> Option<Item> {
        let mut candidates = self.rarity_candidates(rarity, filter);
        if candidates.is_empty() {
            return None;
        }
        blended_shuffle(&mut candidates, index, SHUFFLE_SEEDED_SHARE, noise);
        let item = self.normalize(&self.items[candidates[0]]);
        Some(item)
    }

    /// Generation-time pick: fully reproducible for `index`.
    pub fn seeded_item_of_rarity(&self, rarity: Rarity, index: usize) -> Option<Item> {
        self.seeded_item_matching(rarity, index, |_| true)
    }

    /// Generation-time pick restricted to templates accepted by `filter`.
    pub fn seeded_item_matching(
        &self,
        rarity: Rarity,
        index: usize,
        filter: impl Fn(&ItemTemplate) -> bool,
    ) -> Option<Item> {
        let mut k = 0u64;
        self.pick(rarity, index, filter, &mut || {
            k += 1;
            deterministic_random(index, 500 + k)
        })
    }

    /// A different item of the same type at exactly `rarity`, if one exists.
    pub fn same_type_item(
        &self,
        item_type: ItemType,
        rarity: Rarity,
        exclude: &str,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> Option<Item> {
        let mut candidates: Vec<usize> = (0..self.items.len())
            .filter(|&i| {
                let t = &self.items[i];
                t.name != exclude
                    && t.rarity == Some(rarity)
                    && t.item_type.or_else(|| infer_kind(&t.name, &t.description).map(|k| k.0))
                        == Some(item_type)
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        blended_shuffle(&mut candidates, index, SHUFFLE_SEEDED_SHARE, &mut || rng.gen::<f64>());
        Some(self.normalize(&self.items[candidates[0]]))
    }

    pub fn rare_materials(&self) -> &[ItemTemplate] {
        &self.tables.rare_materials
    }

    pub fn pet_templates(&self) -> &[PetTemplate] {
        &self.tables.pets
    }

    pub fn pet_template(&self, id: &str) -> Option<&PetTemplate> {
        self.tables.pets.iter().find(|p| p.id == id)
    }

    pub fn techniques(&self) -> &[Technique] {
        &self.tables.techniques
    }

    pub fn technique(&self, id: &str) -> Option<&Technique> {
        self.tables.techniques.iter().find(|t| t.id == id)
    }

    pub fn advanced_items_of_tier(&self, tier: u8) -> Vec<&AdvancedItem> {
        self.tables
            .advanced_items
            .iter()
            .filter(|a| a.tier == tier)
            .collect()
    }

    pub fn advanced_item(&self, id: &str) -> Option<&AdvancedItem> {
        self.tables.advanced_items.iter().find(|a| a.id == id)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.tables.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.tables.rules.iter().find(|r| r.id == id)
    }

    pub fn sects(&self) -> &[Sect] {
        &self.tables.sects
    }

    pub fn sect(&self, id: &str) -> Option<&Sect> {
        self.tables.sects.iter().find(|s| s.id == id)
    }

    pub fn bosses(&self) -> &[Boss] {
        &self.tables.bosses
    }

    pub fn boss(&self, id: &str) -> Option<&Boss> {
        self.tables.bosses.iter().find(|b| b.id == id)
    }
}
