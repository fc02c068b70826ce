//! Turn-phase state machine.
//!
//! `draw → standby → main_1 → battle → main_2 → end → draw` with the active side
//! swapped (and the turn counter bumped) on every `end → draw` wrap.

use tracing::debug;

use super::action::{ActionKind, PhaseReport};
use super::config::DuelConfig;
use super::error::RuleError;
use super::rules;
use super::state::{DuelEvent, DuelState, InstanceId, Phase, SideId, Stance, Zone};

/// What happened automatically when a phase was entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseEntry {
    pub drawn: Option<InstanceId>,
    pub discard_required: usize,
}

/// Reasons the current phase cannot be left yet, if any.
pub fn blocking_reason(state: &DuelState) -> Option<RuleError> {
    let blocked = !state.chain_stack.is_empty()
        || state.side(state.current_side).pending_discards > 0
        || (state.phase == Phase::Battle && has_pending_attack(state));
    blocked.then_some(RuleError::CannotAdvance { phase: state.phase })
}

/// True when the side to act still has a creature that could legally attack.
pub fn has_pending_attack(state: &DuelState) -> bool {
    state
        .field_creatures(state.current_side)
        .into_iter()
        .filter_map(|id| state.instance(id))
        .any(|instance| {
            instance.controller == state.current_side
                && instance.stance == Some(Stance::Attack)
                && instance.flags.can_attack
                && !instance.flags.has_attacked
                && instance.turn_placed != Some(state.turn)
        })
}

pub struct PhaseManager<'a> {
    state: &'a mut DuelState,
    config: &'a DuelConfig,
}

impl<'a> PhaseManager<'a> {
    pub fn new(state: &'a mut DuelState, config: &'a DuelConfig) -> Self {
        Self { state, config }
    }

    pub fn can_advance(&self) -> bool {
        blocking_reason(self.state).is_none()
    }

    pub fn available_action_kinds(&self) -> Vec<ActionKind> {
        ActionKind::allowed_in(self.state.phase).to_vec()
    }

    /// Validated phase advance requested by `side`.
    pub fn advance_phase(&mut self, side: SideId) -> Result<PhaseReport, RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::AdvancePhase)?;
        if let Some(reason) = blocking_reason(self.state) {
            return Err(reason);
        }

        let phase = self.advance();
        let entry = self.run_phase_entry_effects();
        Ok(PhaseReport {
            phase,
            side: self.state.current_side,
            turn: self.state.turn,
            drawn: entry.drawn,
            discard_required: entry.discard_required,
        })
    }

    /// Moves to the next phase unconditionally; check [`Self::can_advance`] first.
    pub fn advance(&mut self) -> Phase {
        let next = self.state.phase.next();
        if self.state.phase == Phase::End {
            self.switch_turn();
        }
        self.state.phase = next;
        let description = format!("{} entered the {} phase", self.side_name(), next);
        let side = self.state.current_side;
        self.state
            .record(side, DuelEvent::PhaseEntered { phase: next }, description);
        debug!(phase = %next, side = %self.state.current_side, turn = self.state.turn, "phase advanced");
        next
    }

    fn switch_turn(&mut self) {
        let next_side = self.state.current_side.opponent();
        self.state.current_side = next_side;
        self.state.turn += 1;

        let side = self.state.side_mut(next_side);
        side.flags.normal_summon_used = false;
        side.flags.may_draw = true;

        for instance in self.state.instances.values_mut() {
            if instance.controller == next_side && instance.zone == Zone::Field {
                instance.flags.has_attacked = false;
                instance.flags.can_attack = true;
                instance.flags.can_change_stance = true;
            }
        }

        let turn = self.state.turn;
        let description = format!("turn {turn} begins for {}", self.side_name());
        self.state
            .record(next_side, DuelEvent::TurnStarted { turn }, description);
    }

    /// Automatic effects of the phase just entered.
    pub fn run_phase_entry_effects(&mut self) -> PhaseEntry {
        match self.state.phase {
            Phase::Draw => PhaseEntry {
                drawn: self.execute_draw(),
                discard_required: 0,
            },
            Phase::End => PhaseEntry {
                drawn: None,
                discard_required: self.execute_end(),
            },
            // Reserved for continuous effects.
            Phase::Standby | Phase::Main1 | Phase::Battle | Phase::Main2 => PhaseEntry::default(),
        }
    }

    fn execute_draw(&mut self) -> Option<InstanceId> {
        let side = self.state.current_side;
        if self.state.turn == 1 && side == self.state.starting_side {
            return None;
        }
        if !self.state.side(side).flags.may_draw {
            return None;
        }

        let drawn = self.state.draw_card(side)?;
        self.state.side_mut(side).flags.may_draw = false;
        let card_id = self
            .state
            .instance(drawn)
            .map(|instance| instance.card_id.clone())
            .unwrap_or_default();
        let description = format!("{} drew a card", self.side_name());
        self.state.record(
            side,
            DuelEvent::CardDrawn {
                instance_id: drawn,
                card_id,
            },
            description,
        );
        Some(drawn)
    }

    fn execute_end(&mut self) -> usize {
        let side = self.state.current_side;
        let excess = self
            .state
            .side(side)
            .hand
            .len()
            .saturating_sub(self.config.max_hand_size);
        if excess == 0 {
            return 0;
        }

        self.state.side_mut(side).pending_discards = excess;
        let description = format!("{} must discard {excess} card(s)", self.side_name());
        self.state
            .record(side, DuelEvent::DiscardRequired { count: excess }, description);
        excess
    }

    /// Resolves one card of an outstanding end-phase discard obligation.
    pub fn discard(
        &mut self,
        side: SideId,
        card_id: &str,
    ) -> Result<(InstanceId, usize), RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::Discard)?;
        if self.state.side(side).pending_discards == 0 {
            return Err(RuleError::NoDiscardRequired);
        }
        let instance_id = self
            .state
            .find_in_hand(side, card_id)
            .ok_or_else(|| RuleError::CardNotInHand {
                card_id: card_id.to_string(),
            })?;

        let state = self.state.side_mut(side);
        state.remove_from_hand(instance_id);
        state.discard.push(instance_id);
        state.pending_discards -= 1;
        let remaining = state.pending_discards;
        if let Some(instance) = self.state.instance_mut(instance_id) {
            instance.zone = Zone::Discard;
            instance.face_up = true;
        }
        let description = format!("{} discarded a card", self.side_name());
        self.state.record(
            side,
            DuelEvent::CardDiscarded {
                instance_id,
                card_id: card_id.to_string(),
            },
            description,
        );
        debug!(%side, %instance_id, remaining, "card discarded");
        Ok((instance_id, remaining))
    }

    fn side_name(&self) -> String {
        self.state.side(self.state.current_side).name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{DuelStatus, FieldSlot, PendingEffect};

    fn active_state(deck: usize) -> DuelState {
        let mut state = DuelState::new("phase", &DuelConfig::default());
        for side in SideId::ALL {
            for _ in 0..deck {
                let id = state.create_instance("filler", side, Zone::Deck);
                state.side_mut(side).deck.push(id);
            }
        }
        state.status = DuelStatus::Active;
        state
    }

    fn place_attacker(state: &mut DuelState, side: SideId, turn_placed: u32) -> super::InstanceId {
        let id = state.create_instance("filler", side, Zone::Field);
        let slot = FieldSlot(1);
        state.side_mut(side).field.insert(slot, id);
        if let Some(instance) = state.instance_mut(id) {
            instance.slot = Some(slot);
            instance.stance = Some(Stance::Attack);
            instance.face_up = true;
            instance.turn_placed = Some(turn_placed);
        }
        id
    }

    #[test]
    fn full_cycle_swaps_side_and_bumps_turn() {
        let config = DuelConfig::default();
        let mut state = active_state(3);
        let mut manager = PhaseManager::new(&mut state, &config);

        let mut phases = Vec::new();
        for _ in 0..6 {
            let side = manager.state.current_side;
            let report = manager.advance_phase(side).expect("advance should succeed");
            phases.push(report.phase);
        }
        assert_eq!(
            phases,
            vec![
                Phase::Standby,
                Phase::Main1,
                Phase::Battle,
                Phase::Main2,
                Phase::End,
                Phase::Draw
            ]
        );
        assert_eq!(state.current_side, SideId::PlayerTwo);
        assert_eq!(state.turn, 2);
        assert_eq!(state.side(SideId::PlayerTwo).hand.len(), 1, "second side draws");
        assert!(!state.side(SideId::PlayerTwo).flags.may_draw);
    }

    #[test]
    fn first_draw_of_starting_side_is_skipped() {
        let config = DuelConfig::default();
        let mut state = active_state(3);
        let entry = PhaseManager::new(&mut state, &config).run_phase_entry_effects();
        assert_eq!(entry.drawn, None);
        assert_eq!(state.side(SideId::PlayerOne).deck.len(), 3);
        assert!(state.side(SideId::PlayerOne).flags.may_draw);
    }

    #[test]
    fn empty_deck_skips_draw() {
        let config = DuelConfig::default();
        let mut state = active_state(0);
        state.turn = 2;
        state.current_side = SideId::PlayerTwo;
        let entry = PhaseManager::new(&mut state, &config).run_phase_entry_effects();
        assert_eq!(entry.drawn, None);
        assert!(state.is_active());
    }

    #[test]
    fn battle_blocks_while_an_attack_is_available() {
        let config = DuelConfig::default();
        let mut state = active_state(0);
        state.turn = 3;
        state.phase = Phase::Battle;
        let attacker = place_attacker(&mut state, SideId::PlayerOne, 1);

        assert!(!PhaseManager::new(&mut state, &config).can_advance());

        if let Some(instance) = state.instance_mut(attacker) {
            instance.flags.has_attacked = true;
        }
        assert!(PhaseManager::new(&mut state, &config).can_advance());
    }

    #[test]
    fn freshly_placed_creature_does_not_block_battle() {
        let config = DuelConfig::default();
        let mut state = active_state(0);
        state.phase = Phase::Battle;
        place_attacker(&mut state, SideId::PlayerOne, 1);
        assert!(PhaseManager::new(&mut state, &config).can_advance());
    }

    #[test]
    fn end_phase_flags_discard_and_blocks_until_resolved() {
        let config = DuelConfig::default();
        let mut state = active_state(8);
        for _ in 0..8 {
            state.draw_card(SideId::PlayerOne);
        }
        state.phase = Phase::Main2;

        let mut manager = PhaseManager::new(&mut state, &config);
        let report = manager
            .advance_phase(SideId::PlayerOne)
            .expect("enter end phase");
        assert_eq!(report.phase, Phase::End);
        assert_eq!(report.discard_required, 2);
        assert!(!manager.can_advance());

        manager.discard(SideId::PlayerOne, "filler").expect("first discard");
        let (_, remaining) = manager.discard(SideId::PlayerOne, "filler").expect("second discard");
        assert_eq!(remaining, 0);
        assert!(manager.can_advance());
        assert_eq!(
            manager.discard(SideId::PlayerOne, "filler"),
            Err(RuleError::NoDiscardRequired)
        );
        state.integrity_check().expect("discard keeps the partition");
        assert_eq!(state.side(SideId::PlayerOne).hand.len(), 6);
    }

    #[test]
    fn pending_effects_block_advance() {
        let config = DuelConfig::default();
        let mut state = active_state(0);
        state.chain_stack.push(PendingEffect {
            source: None,
            description: "unresolved".into(),
        });
        let mut manager = PhaseManager::new(&mut state, &config);
        assert_eq!(
            manager.advance_phase(SideId::PlayerOne),
            Err(RuleError::CannotAdvance { phase: Phase::Draw })
        );
    }
}
