use serde::{Deserialize, Serialize};

pub const DEFAULT_STARTING_LIFE: i32 = 8000;
pub const DEFAULT_OPENING_HAND: usize = 5;
pub const DEFAULT_DECK_SIZE: usize = 40;
pub const DEFAULT_MAX_HAND_SIZE: usize = 6;
pub const DEFAULT_FIELD_SLOTS: u8 = 5;

/// Fixed numbers a duel is created with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DuelConfig {
    pub starting_life: i32,
    pub opening_hand: usize,
    pub deck_size: usize,
    /// Hand size above which the end phase raises a discard obligation.
    pub max_hand_size: usize,
    pub field_slots: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub player_one_name: String,
    pub player_two_name: String,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            starting_life: DEFAULT_STARTING_LIFE,
            opening_hand: DEFAULT_OPENING_HAND,
            deck_size: DEFAULT_DECK_SIZE,
            max_hand_size: DEFAULT_MAX_HAND_SIZE,
            field_slots: DEFAULT_FIELD_SLOTS,
            seed: None,
            player_one_name: "Player 1".into(),
            player_two_name: "Player 2".into(),
        }
    }
}

impl DuelConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_starting_life(mut self, life: i32) -> Self {
        self.starting_life = life;
        self
    }

    pub fn with_deck_size(mut self, deck_size: usize) -> Self {
        self.deck_size = deck_size;
        self
    }

    pub fn with_names(mut self, one: impl Into<String>, two: impl Into<String>) -> Self {
        self.player_one_name = one.into();
        self.player_two_name = two.into();
        self
    }
}
