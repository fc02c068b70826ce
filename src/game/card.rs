use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Catalog identifier of a card definition.
pub type CardId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    SuperRare,
    UltraRare,
    SecretRare,
}

/// Combat numbers carried only by creatures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatureStats {
    pub attack: u32,
    pub defense: u32,
    pub level: u8,
}

impl CreatureStats {
    /// Creatures that must be sent from the field to normal summon this one.
    pub fn tributes_required(&self) -> usize {
        match self.level {
            0..=4 => 0,
            5 | 6 => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CardKind {
    Creature(CreatureStats),
    Effect,
    Trap,
}

impl CardKind {
    pub fn label(&self) -> &'static str {
        match self {
            CardKind::Creature(_) => "creature",
            CardKind::Effect => "effect",
            CardKind::Trap => "trap",
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDefinition {
    pub id: CardId,
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rarity: Rarity,
    pub kind: CardKind,
}

impl CardDefinition {
    pub fn creature(
        id: impl Into<CardId>,
        name: impl Into<String>,
        level: u8,
        attack: u32,
        defense: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: String::new(),
            rarity: Rarity::Common,
            kind: CardKind::Creature(CreatureStats {
                attack,
                defense,
                level,
            }),
        }
    }

    pub fn effect(id: impl Into<CardId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: String::new(),
            rarity: Rarity::Common,
            kind: CardKind::Effect,
        }
    }

    pub fn trap(id: impl Into<CardId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: String::new(),
            rarity: Rarity::Common,
            kind: CardKind::Trap,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn creature_stats(&self) -> Option<CreatureStats> {
        match self.kind {
            CardKind::Creature(stats) => Some(stats),
            CardKind::Effect | CardKind::Trap => None,
        }
    }
}

/// Read-only lookup from card id to definition.
pub trait CardCatalog {
    fn card(&self, id: &str) -> Option<&CardDefinition>;

    fn definitions(&self) -> Vec<&CardDefinition>;

    fn creature_stats(&self, id: &str) -> Option<CreatureStats> {
        self.card(id).and_then(CardDefinition::creature_stats)
    }

    fn name_of(&self, id: &str) -> String {
        self.card(id)
            .map(|card| card.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl<C: CardCatalog + ?Sized> CardCatalog for &C {
    fn card(&self, id: &str) -> Option<&CardDefinition> {
        (**self).card(id)
    }

    fn definitions(&self) -> Vec<&CardDefinition> {
        (**self).definitions()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardLibrary {
    cards: BTreeMap<CardId, CardDefinition>,
}

static BUILTIN: Lazy<CardLibrary> = Lazy::new(builtin_cards);

impl CardLibrary {
    pub fn new(definitions: impl IntoIterator<Item = CardDefinition>) -> Self {
        Self {
            cards: definitions
                .into_iter()
                .map(|card| (card.id.clone(), card))
                .collect(),
        }
    }

    /// The card pool shipped with the engine.
    pub fn builtin() -> &'static CardLibrary {
        &BUILTIN
    }

    pub fn insert(&mut self, card: CardDefinition) -> Option<CardDefinition> {
        self.cards.insert(card.id.clone(), card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for CardLibrary {
    fn card(&self, id: &str) -> Option<&CardDefinition> {
        self.cards.get(id)
    }

    fn definitions(&self) -> Vec<&CardDefinition> {
        self.cards.values().collect()
    }
}

/// Samples a deck with a creature core, effect cards and traps, then shuffles it.
pub fn build_random_deck<C, R>(catalog: &C, size: usize, rng: &mut R) -> Vec<CardId>
where
    C: CardCatalog + ?Sized,
    R: Rng + ?Sized,
{
    let mut creatures = Vec::new();
    let mut effects = Vec::new();
    let mut traps = Vec::new();
    for card in catalog.definitions() {
        match card.kind {
            CardKind::Creature(_) => creatures.push(card.id.clone()),
            CardKind::Effect => effects.push(card.id.clone()),
            CardKind::Trap => traps.push(card.id.clone()),
        }
    }

    let creature_count = (size * 2 / 5).max(15).min(size);
    let effect_count = (size * 35 / 100).min(size - creature_count);
    let trap_count = size - creature_count - effect_count;

    let mut deck = Vec::with_capacity(size);
    for (pool, count) in [
        (&creatures, creature_count),
        (&effects, effect_count),
        (&traps, trap_count),
    ] {
        // An empty category is topped up with creatures so the deck keeps its size.
        let pool = if pool.is_empty() { &creatures } else { pool };
        for _ in 0..count {
            if let Some(id) = pool.choose(rng) {
                deck.push(id.clone());
            }
        }
    }
    deck.shuffle(rng);
    deck
}

fn builtin_cards() -> CardLibrary {
    use Rarity::*;

    let creatures = [
        ("ember_pup", "Ember Pup", 1, 300, 200, Common),
        ("lantern_moth", "Lantern Moth", 2, 800, 600, Common),
        ("tin_sentry", "Tin Sentry", 3, 1000, 1800, Common),
        ("reed_archer", "Reed Archer", 3, 1400, 1000, Common),
        ("copper_hound", "Copper Hound", 3, 1600, 1200, Common),
        ("dusk_wanderer", "Dusk Wanderer", 4, 1500, 1200, Common),
        ("stone_warden", "Stone Warden", 4, 1200, 2000, Rare),
        ("gale_lancer", "Gale Lancer", 4, 1800, 1100, Rare),
        ("tide_caller", "Tide Caller", 4, 1700, 1400, Common),
        ("iron_boar", "Iron Boar", 4, 1900, 900, Rare),
        ("ashen_knight", "Ashen Knight", 5, 2100, 1600, SuperRare),
        ("mire_serpent", "Mire Serpent", 5, 1900, 2200, Rare),
        ("storm_herald", "Storm Herald", 6, 2400, 1500, SuperRare),
        ("crystal_golem", "Crystal Golem", 6, 1800, 2600, SuperRare),
        ("obsidian_wyrm", "Obsidian Wyrm", 7, 2500, 2100, UltraRare),
        ("sky_tyrant", "Sky Tyrant", 8, 3000, 2500, SecretRare),
    ];
    let effects = [
        ("deep_insight", "Deep Insight", "Draw 2 cards.", Rare),
        ("sundering_flame", "Sundering Flame", "Destroy 1 creature on the field.", Rare),
        ("tempest_sweep", "Tempest Sweep", "Destroy all effect and trap cards on the field.", SuperRare),
        ("rallying_banner", "Rallying Banner", "Your creatures gain 500 attack this turn.", Common),
        ("second_wind", "Second Wind", "Gain 1000 life points.", Common),
        ("grave_recall", "Grave Recall", "Return 1 creature from your discard pile to your hand.", UltraRare),
    ];
    let traps = [
        ("mirror_ward", "Mirror Ward", "Destroy the attacking creature.", SuperRare),
        ("snare_pit", "Snare Pit", "Destroy a creature with 1000 or more attack when it is summoned.", Common),
        ("counter_spark", "Counter Spark", "Negate an effect card activation.", Rare),
        ("bramble_wall", "Bramble Wall", "End the battle phase.", Common),
        ("shatter_rune", "Shatter Rune", "Destroy 1 creature; both sides take damage equal to its attack.", UltraRare),
    ];

    let mut library = CardLibrary::default();
    for (id, name, level, attack, defense, rarity) in creatures {
        library.insert(CardDefinition::creature(id, name, level, attack, defense).with_rarity(rarity));
    }
    for (id, name, text, rarity) in effects {
        library.insert(CardDefinition::effect(id, name).with_text(text).with_rarity(rarity));
    }
    for (id, name, text, rarity) in traps {
        library.insert(CardDefinition::trap(id, name).with_text(text).with_rarity(rarity));
    }
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::make_rng;

    #[test]
    fn tribute_cost_follows_level_bands() {
        let cost = |level| {
            CreatureStats {
                attack: 0,
                defense: 0,
                level,
            }
            .tributes_required()
        };
        assert_eq!(cost(1), 0);
        assert_eq!(cost(4), 0);
        assert_eq!(cost(5), 1);
        assert_eq!(cost(6), 1);
        assert_eq!(cost(7), 2);
        assert_eq!(cost(12), 2);
    }

    #[test]
    fn builtin_library_resolves_creatures() {
        let library = CardLibrary::builtin();
        let hound = library
            .creature_stats("copper_hound")
            .expect("copper hound should be a creature");
        assert_eq!((hound.attack, hound.defense, hound.level), (1600, 1200, 3));
        assert!(library.creature_stats("deep_insight").is_none());
        assert!(library.card("no_such_card").is_none());
    }

    #[test]
    fn random_deck_keeps_size_and_creature_floor() {
        let library = CardLibrary::builtin();
        let mut rng = make_rng(Some(11));
        let deck = build_random_deck(library, 40, &mut rng);
        assert_eq!(deck.len(), 40);
        let creatures = deck
            .iter()
            .filter(|id| library.creature_stats(id).is_some())
            .count();
        assert!(creatures >= 16, "expected 40% creatures, got {creatures}");
    }

    #[test]
    fn card_kind_serializes_with_category_tag() {
        let card = CardDefinition::creature("x", "X", 4, 1500, 1000);
        let json = serde_json::to_value(&card).expect("card serializes");
        assert_eq!(json["kind"]["category"], "creature");
        assert_eq!(json["kind"]["attack"], 1500);
    }
}
