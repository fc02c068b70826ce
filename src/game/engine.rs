use std::collections::BTreeSet;

use tracing::warn;

use super::action::{ActionKind, ActionRecord, ActionResult, GameAction};
use super::card::{CardCatalog, CardId, CardLibrary};
use super::config::DuelConfig;
use super::error::RuleError;
use super::phase;
use super::rules;
use super::setup::DuelSetup;
use super::state::{DuelState, DuelSummary, SideId, Stance};

/// Owns one duel.
#[derive(Debug, Clone)]
pub struct DuelEngine<C: CardCatalog = &'static CardLibrary> {
    state: DuelState,
    catalog: C,
    config: DuelConfig,
}

impl DuelEngine {
    /// Random duel over the built-in card pool.
    pub fn new(config: DuelConfig) -> Self {
        Self::with_catalog(CardLibrary::builtin(), config)
    }
}

impl<C: CardCatalog> DuelEngine<C> {
    pub fn with_catalog(catalog: C, config: DuelConfig) -> Self {
        let state = DuelSetup::new(&catalog, &config).random();
        Self {
            state,
            catalog,
            config,
        }
    }

    pub fn with_decklists(
        catalog: C,
        config: DuelConfig,
        one: &[CardId],
        two: &[CardId],
    ) -> Result<Self, RuleError> {
        let state = DuelSetup::new(&catalog, &config).with_decklists(one, two)?;
        Ok(Self {
            state,
            catalog,
            config,
        })
    }

    /// Resumes a previously saved duel.
    pub fn from_state(state: DuelState, catalog: C, config: DuelConfig) -> Result<Self, RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })?;
        Ok(Self {
            state,
            catalog,
            config,
        })
    }

    pub fn state(&self) -> &DuelState {
        &self.state
    }

    /// Adopts `state` as the current duel. A corrupt state is refused and the old one kept.
    pub fn replace_state(&mut self, state: DuelState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })?;
        self.state = state;
        Ok(())
    }

    pub fn into_state(self) -> DuelState {
        self.state
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn summary(&self) -> DuelSummary {
        self.state.summary()
    }

    pub fn can_advance(&self) -> bool {
        phase::blocking_reason(&self.state).is_none()
    }

    pub fn available_action_kinds(&self) -> Vec<ActionKind> {
        ActionKind::allowed_in(self.state.phase).to_vec()
    }

    /// Applies one action. A rejection leaves the duel exactly as it was.
    pub fn submit(&mut self, action: GameAction) -> ActionResult {
        match rules::apply_action(&mut self.state, &self.catalog, &self.config, &action) {
            Ok((message, detail)) => ActionResult::accepted(message, detail),
            Err(error) => {
                warn!(kind = %action.kind(), side = %action.side(), %error, "action rejected");
                ActionResult::rejected(error)
            }
        }
    }

    pub fn submit_record(&mut self, record: ActionRecord) -> ActionResult {
        match GameAction::try_from(record) {
            Ok(action) => self.submit(action),
            Err(error) => {
                warn!(%error, "malformed action record");
                ActionResult::rejected(error)
            }
        }
    }

    /// Every concrete action `side` could submit right now and have accepted.
    pub fn legal_actions(&self, side: SideId) -> Vec<GameAction> {
        let scratch = self.state.without_log();
        self.candidate_actions(side)
            .into_iter()
            .filter(|action| {
                let mut trial = scratch.clone();
                rules::apply_action(&mut trial, &self.catalog, &self.config, action).is_ok()
            })
            .collect()
    }

    fn candidate_actions(&self, side: SideId) -> Vec<GameAction> {
        let state = &self.state;
        if !state.is_active() || state.current_side != side {
            return Vec::new();
        }

        let mut candidates = vec![GameAction::AdvancePhase { side }];
        let mut seen = BTreeSet::new();
        let hand_cards = state
            .side(side)
            .hand
            .iter()
            .filter_map(|id| state.instance(*id))
            .map(|instance| instance.card_id.clone())
            .filter(|card_id| seen.insert(card_id.clone()));
        for card_id in hand_cards {
            for stance in [Stance::Attack, Stance::Defense] {
                candidates.push(GameAction::NormalSummon {
                    side,
                    card_id: card_id.clone(),
                    stance,
                });
            }
            candidates.push(GameAction::SetCreature {
                side,
                card_id: card_id.clone(),
            });
            candidates.push(GameAction::Discard { side, card_id });
        }

        let targets = state.field_creatures(side.opponent());
        for instance_id in state.field_creatures(side) {
            candidates.push(GameAction::FlipSummon { side, instance_id });
            for stance in [Stance::Attack, Stance::Defense] {
                candidates.push(GameAction::ChangeStance {
                    side,
                    instance_id,
                    stance,
                });
            }
            candidates.push(GameAction::DeclareAttack {
                side,
                attacker: instance_id,
                target: None,
            });
            for target in &targets {
                candidates.push(GameAction::DeclareAttack {
                    side,
                    attacker: instance_id,
                    target: Some(*target),
                });
            }
            candidates.push(GameAction::ForgoAttack { side, instance_id });
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::ActionDetail;
    use crate::game::error::ErrorCategory;
    use crate::game::state::Phase;

    fn fixture() -> DuelEngine {
        let deck: Vec<CardId> = ["copper_hound", "stone_warden", "ember_pup", "deep_insight", "mirror_ward", "iron_boar", "tin_sentry"]
            .map(String::from)
            .to_vec();
        DuelEngine::with_decklists(CardLibrary::builtin(), DuelConfig::default(), &deck, &deck)
            .expect("fixture decks are known")
    }

    fn advance_to(engine: &mut DuelEngine, phase: Phase) {
        while engine.state().phase != phase {
            let side = engine.state().current_side;
            let result = engine.submit(GameAction::AdvancePhase { side });
            assert!(result.success, "advance failed: {}", result.message);
        }
    }

    #[test]
    fn accepted_action_carries_detail() {
        let mut engine = fixture();
        advance_to(&mut engine, Phase::Main1);
        let result = engine.submit(GameAction::NormalSummon {
            side: SideId::PlayerOne,
            card_id: "copper_hound".into(),
            stance: Stance::Attack,
        });
        assert!(result.success, "{}", result.message);
        assert!(matches!(result.detail, Some(ActionDetail::Summoned(_))));
        assert_eq!(engine.summary().sides[0].field_creatures, 1);
    }

    #[test]
    fn malformed_record_is_a_contract_rejection() {
        let mut engine = fixture();
        let before = engine.state().clone();
        let result = engine.submit_record(ActionRecord {
            acting_side: SideId::PlayerOne,
            action_kind: "normal_summon".into(),
            card_id: None,
            instance_id: None,
            target_instance_id: None,
            requested_stance: None,
        });
        assert!(!result.success);
        assert!(matches!(
            result.detail,
            Some(ActionDetail::Rejected {
                category: ErrorCategory::Contract,
                ..
            })
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn legal_actions_follow_the_phase() {
        let mut engine = fixture();
        assert_eq!(
            engine.legal_actions(SideId::PlayerOne),
            vec![GameAction::AdvancePhase {
                side: SideId::PlayerOne
            }]
        );
        assert!(engine.legal_actions(SideId::PlayerTwo).is_empty());

        advance_to(&mut engine, Phase::Main1);
        let legal = engine.legal_actions(SideId::PlayerOne);
        assert!(legal.contains(&GameAction::SetCreature {
            side: SideId::PlayerOne,
            card_id: "stone_warden".into()
        }));
        assert!(!legal
            .iter()
            .any(|action| matches!(action, GameAction::NormalSummon { card_id, .. } if card_id == "deep_insight")));
        assert_eq!(engine.state().log.len(), 3, "dry runs leave the log alone");
    }

    #[test]
    fn replace_state_refuses_corrupt_input() {
        let mut engine = fixture();
        let mut corrupt = engine.state().clone();
        let dup = corrupt.side(SideId::PlayerOne).hand[0];
        corrupt.side_mut(SideId::PlayerOne).deck.push(dup);
        let err = engine.replace_state(corrupt).expect_err("duplicate listing");
        assert!(matches!(err, RuleError::IntegrityViolation { .. }));

        let mut resumed = engine.state().clone();
        resumed.phase = Phase::Standby;
        engine.replace_state(resumed).expect("consistent state is adopted");
        assert_eq!(engine.state().phase, Phase::Standby);
        assert!(engine.can_advance());
        assert_eq!(engine.available_action_kinds(), vec![ActionKind::AdvancePhase]);
    }
}
