//! Planted herbs: sowing, maturity and collection.

use super::content::ContentCatalog;
use super::state::{Item, ItemType, LogEntry, LogSink, PlantedHerb, PlayerState, Rarity, Tone};
use crate::time::PollClock;

const MINUTE_MS: u64 = 60 * 1000;

/// Time from planting to harvest.
pub fn growth_time_ms(rarity: Rarity) -> u64 {
    match rarity {
        Rarity::Common => 10 * MINUTE_MS,
        Rarity::Rare => 30 * MINUTE_MS,
        Rarity::Legendary => 120 * MINUTE_MS,
        Rarity::Mythic => 360 * MINUTE_MS,
    }
}

/// Herbs returned per planted seed.
pub fn yield_quantity(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::Common => 3,
        Rarity::Rare | Rarity::Legendary => 2,
        Rarity::Mythic => 1,
    }
}

/// Plant one herb from the inventory. A missing herb is a logged no-op.
pub fn plant_herb(prev: &PlayerState, herb_name: &str, now_ms: u64) -> (PlayerState, Vec<LogEntry>) {
    let mut s = prev.clone();
    let mut log = Vec::new();
    let Some(pos) = s
        .inventory
        .iter()
        .position(|i| i.name == herb_name && i.item_type == ItemType::Herb && i.quantity > 0)
    else {
        log.add_log(&format!("You have no {} to plant.", herb_name), Tone::Normal);
        return (s, log);
    };

    let rarity = s.inventory[pos].rarity;
    s.inventory[pos].quantity -= 1;
    if s.inventory[pos].quantity == 0 {
        s.inventory.remove(pos);
    }
    let id = s.next_item_id("plot");
    s.planted.push(PlantedHerb {
        id,
        herb_name: herb_name.to_string(),
        rarity,
        planted_at_ms: now_ms,
        mature_at_ms: now_ms + growth_time_ms(rarity),
        yield_quantity: yield_quantity(rarity),
    });
    log.add_log(&format!("You planted a {}.", herb_name), Tone::Normal);
    (s, log)
}

fn harvested_item(catalog: &ContentCatalog, plot: &PlantedHerb) -> Item {
    let mut item = catalog.item_by_name(&plot.herb_name).unwrap_or_else(|| Item {
        id: String::new(),
        name: plot.herb_name.clone(),
        item_type: ItemType::Herb,
        rarity: plot.rarity,
        quantity: 1,
        description: String::new(),
        equip_slot: None,
        effect: None,
        permanent_effect: None,
        advanced_id: None,
    });
    item.quantity = plot.yield_quantity;
    item
}

/// Move every matured plot into the inventory. Returns how many plots
/// were collected.
pub fn collect_matured(
    prev: &PlayerState,
    now_ms: u64,
    catalog: &ContentCatalog,
) -> (PlayerState, Vec<LogEntry>, usize) {
    let mut s = prev.clone();
    let mut log = Vec::new();
    let (ready, growing): (Vec<PlantedHerb>, Vec<PlantedHerb>) =
        s.planted.drain(..).partition(|p| p.mature_at_ms <= now_ms);
    s.planted = growing;

    for plot in &ready {
        let item = harvested_item(catalog, plot);
        match s.inventory.iter_mut().find(|i| i.name == item.name && i.is_stackable()) {
            Some(stack) => stack.quantity += item.quantity,
            None => {
                let mut item = item;
                item.id = s.next_item_id("item");
                s.inventory.push(item);
            }
        }
        log.add_log(
            &format!("Harvested {} x{}.", plot.herb_name, plot.yield_quantity),
            Tone::Gain,
        );
    }
    (s, log, ready.len())
}

/// Interval-driven auto collection. Feed it the latest state every frame.
pub struct HarvestPoller {
    clock: PollClock,
}

impl HarvestPoller {
    pub fn new(interval_ms: u64, debounce_ms: u64) -> Self {
        Self {
            clock: PollClock::new(interval_ms, debounce_ms),
        }
    }

    /// Scheduled poll. Collects only when auto-harvest is on and a plot
    /// has matured.
    pub fn poll(
        &mut self,
        latest: &PlayerState,
        now_ms: u64,
        catalog: &ContentCatalog,
    ) -> Option<(PlayerState, Vec<LogEntry>)> {
        if !self.clock.update(now_ms as f64) || !latest.auto_harvest {
            return None;
        }
        Self::collect(latest, now_ms, catalog)
    }

    /// Player-initiated harvest, debounced.
    pub fn request(
        &mut self,
        latest: &PlayerState,
        now_ms: u64,
        catalog: &ContentCatalog,
    ) -> Option<(PlayerState, Vec<LogEntry>)> {
        if !self.clock.request(now_ms as f64) {
            return None;
        }
        Self::collect(latest, now_ms, catalog)
    }

    fn collect(
        latest: &PlayerState,
        now_ms: u64,
        catalog: &ContentCatalog,
    ) -> Option<(PlayerState, Vec<LogEntry>)> {
        let (state, log, collected) = collect_matured(latest, now_ms, catalog);
        if collected == 0 {
            return None;
        }
        tracing::debug!(collected, "harvested matured plots");
        Some((state, log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_herbs(n: u32) -> (PlayerState, ContentCatalog) {
        let catalog = ContentCatalog::builtin().unwrap();
        let mut s = PlayerState::new("Lin");
        let mut herb = catalog.item_by_name("Healing Herb").unwrap();
        herb.quantity = n;
        s.inventory.push(herb);
        (s, catalog)
    }

    #[test]
    fn planting_consumes_one_herb() {
        let (s, _) = with_herbs(2);
        let (s, _) = plant_herb(&s, "Healing Herb", 0);
        assert_eq!(s.item_count("Healing Herb"), 1);
        assert_eq!(s.planted.len(), 1);
        let (s, _) = plant_herb(&s, "Healing Herb", 0);
        assert_eq!(s.item_count("Healing Herb"), 0);
        assert!(s.inventory.iter().all(|i| i.name != "Healing Herb"));
        let (after, log) = plant_herb(&s, "Healing Herb", 0);
        assert_eq!(after.planted.len(), 2);
        assert!(log[0].text.contains("no Healing Herb"));
    }

    #[test]
    fn only_matured_plots_are_collected() {
        let (s, catalog) = with_herbs(1);
        let (s, _) = plant_herb(&s, "Healing Herb", 0);
        let mature = s.planted[0].mature_at_ms;
        let (early, _, n) = collect_matured(&s, mature - 1, &catalog);
        assert_eq!(n, 0);
        assert_eq!(early.planted.len(), 1);
        let (late, log, n) = collect_matured(&s, mature, &catalog);
        assert_eq!(n, 1);
        assert!(late.planted.is_empty());
        assert_eq!(late.item_count("Healing Herb"), s.planted[0].yield_quantity);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn poller_respects_auto_flag_and_interval() {
        let (s, catalog) = with_herbs(1);
        let (mut s, _) = plant_herb(&s, "Healing Herb", 0);
        let mature = s.planted[0].mature_at_ms;
        let mut poller = HarvestPoller::new(30_000, 5_000);
        assert!(poller.poll(&s, mature, &catalog).is_none());
        assert!(poller.poll(&s, mature + 30_000, &catalog).is_none(), "auto-harvest is off");
        s.auto_harvest = true;
        assert!(poller.poll(&s, mature + 40_000, &catalog).is_none(), "interval not elapsed");
        let (after, _) = poller.poll(&s, mature + 60_000, &catalog).unwrap();
        assert!(after.planted.is_empty());
    }

    #[test]
    fn manual_requests_are_debounced() {
        let (s, catalog) = with_herbs(2);
        let (s, _) = plant_herb(&s, "Healing Herb", 0);
        let (s, _) = plant_herb(&s, "Healing Herb", 0);
        let mature = s.planted[0].mature_at_ms;
        let mut poller = HarvestPoller::new(30_000, 5_000);
        assert!(poller.request(&s, mature, &catalog).is_some());
        assert!(poller.request(&s, mature + 1_000, &catalog).is_none());
    }
}
