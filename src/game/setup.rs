use rand::Rng;
use tracing::debug;

use super::card::{build_random_deck, CardCatalog, CardId};
use super::config::DuelConfig;
use super::error::RuleError;
use super::state::{DuelEvent, DuelState, DuelStatus, Phase, SideId, Zone};
use crate::utils::{make_rng, now_millis};

/// Builds ready-to-play duels: decks created, opening hands dealt, status `active`.
pub struct DuelSetup<'a, C: CardCatalog + ?Sized> {
    catalog: &'a C,
    config: &'a DuelConfig,
}

impl<'a, C: CardCatalog + ?Sized> DuelSetup<'a, C> {
    pub fn new(catalog: &'a C, config: &'a DuelConfig) -> Self {
        Self { catalog, config }
    }

    /// Two shuffled decks sampled from the catalog, seeded by `config.seed` when set.
    pub fn random(&self) -> DuelState {
        let mut rng = make_rng(self.config.seed);
        let game_id = format!("duel_{}_{:08x}", now_millis(), rng.gen::<u32>());
        let one = build_random_deck(self.catalog, self.config.deck_size, &mut rng);
        let two = build_random_deck(self.catalog, self.config.deck_size, &mut rng);
        self.deal(game_id, [one, two])
    }

    /// Decks used exactly as listed, first entry on top.
    pub fn with_decklists(&self, one: &[CardId], two: &[CardId]) -> Result<DuelState, RuleError> {
        if let Some(unknown) = one
            .iter()
            .chain(two)
            .find(|card_id| self.catalog.card(card_id).is_none())
        {
            return Err(RuleError::UnknownCard {
                card_id: unknown.clone(),
            });
        }
        let mut rng = make_rng(self.config.seed);
        let game_id = format!("duel_{}_{:08x}", now_millis(), rng.gen::<u32>());
        Ok(self.deal(game_id, [one.to_vec(), two.to_vec()]))
    }

    fn deal(&self, game_id: String, decks: [Vec<CardId>; 2]) -> DuelState {
        let mut state = DuelState::new(game_id, self.config);
        for (side, deck) in SideId::ALL.into_iter().zip(decks) {
            for card_id in deck {
                let instance_id = state.create_instance(card_id, side, Zone::Deck);
                state.side_mut(side).deck.push(instance_id);
            }
            for _ in 0..self.config.opening_hand {
                if state.draw_card(side).is_none() {
                    break;
                }
            }
        }

        state.status = DuelStatus::Active;
        state.phase = Phase::Draw;
        state.current_side = SideId::PlayerOne;
        state.starting_side = SideId::PlayerOne;
        let description = format!("duel started, {} goes first", state.side(SideId::PlayerOne).name);
        state.record(
            SideId::PlayerOne,
            DuelEvent::DuelStarted {
                first: SideId::PlayerOne,
            },
            description,
        );
        debug!(game_id = %state.game_id, instances = state.instances.len(), "duel dealt");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::CardLibrary;

    #[test]
    fn random_setup_deals_opening_hands() {
        let config = DuelConfig::default().with_seed(7);
        let state = DuelSetup::new(CardLibrary::builtin(), &config).random();

        assert!(state.is_active());
        assert_eq!(state.phase, Phase::Draw);
        assert_eq!(state.turn, 1);
        for side in SideId::ALL {
            let view = state.side(side);
            assert_eq!(view.hand.len(), 5);
            assert_eq!(view.deck.len(), 35);
            assert_eq!(view.life_points, 8000);
            assert_eq!(state.owned_count(side), 40);
        }
        state.integrity_check().expect("fresh duel is consistent");
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn seeded_setups_share_their_decks() {
        let config = DuelConfig::default().with_seed(99);
        let deck_cards = |state: &DuelState| -> Vec<String> {
            let side = state.side(SideId::PlayerTwo);
            side.hand
                .iter()
                .chain(&side.deck)
                .filter_map(|id| state.instance(*id))
                .map(|instance| instance.card_id.clone())
                .collect()
        };
        let first = DuelSetup::new(CardLibrary::builtin(), &config).random();
        let second = DuelSetup::new(CardLibrary::builtin(), &config).random();
        assert_eq!(deck_cards(&first), deck_cards(&second));
    }

    #[test]
    fn decklists_keep_their_order() {
        let config = DuelConfig::default();
        let one: Vec<CardId> = ["copper_hound", "stone_warden", "ember_pup", "reed_archer", "tin_sentry", "iron_boar"]
            .map(String::from)
            .to_vec();
        let two = vec!["sky_tyrant".to_string()];
        let state = DuelSetup::new(CardLibrary::builtin(), &config)
            .with_decklists(&one, &two)
            .expect("known cards");

        let hand: Vec<_> = state
            .side(SideId::PlayerOne)
            .hand
            .iter()
            .filter_map(|id| state.instance(*id))
            .map(|instance| instance.card_id.as_str())
            .collect();
        assert_eq!(hand, ["copper_hound", "stone_warden", "ember_pup", "reed_archer", "tin_sentry"]);
        assert_eq!(state.side(SideId::PlayerOne).deck.len(), 1);
        assert_eq!(state.side(SideId::PlayerTwo).hand.len(), 1);
        assert!(state.side(SideId::PlayerTwo).deck.is_empty());
    }

    #[test]
    fn unknown_cards_are_refused() {
        let config = DuelConfig::default();
        let err = DuelSetup::new(CardLibrary::builtin(), &config)
            .with_decklists(&["mystery".to_string()], &[])
            .expect_err("unknown card");
        assert_eq!(
            err,
            RuleError::UnknownCard {
                card_id: "mystery".into()
            }
        );
    }
}
