use tracing::debug;

use super::action::{ActionKind, SummonReport};
use super::card::{CardCatalog, CreatureStats};
use super::config::DuelConfig;
use super::error::RuleError;
use super::rules;
use super::state::{DuelEvent, DuelState, FieldSlot, InstanceId, SideId, Stance, Zone};

/// A creature placement that passed validation and only waits to be applied.
struct Placement {
    hand_instance: InstanceId,
    card_id: String,
    stats: CreatureStats,
    tributes: Vec<InstanceId>,
    slot: FieldSlot,
}

/// Moves creatures from hand onto the field.
pub struct SummoningManager<'a> {
    state: &'a mut DuelState,
    catalog: &'a dyn CardCatalog,
    config: &'a DuelConfig,
}

impl<'a> SummoningManager<'a> {
    pub fn new(state: &'a mut DuelState, catalog: &'a dyn CardCatalog, config: &'a DuelConfig) -> Self {
        Self {
            state,
            catalog,
            config,
        }
    }

    /// Face-up placement in `stance`, paying tributes by level.
    pub fn normal_summon(
        &mut self,
        side: SideId,
        card_id: &str,
        stance: Stance,
    ) -> Result<SummonReport, RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::NormalSummon)?;
        if stance.is_face_down() {
            return Err(RuleError::InvalidStance { stance });
        }
        let placement = self.validate(side, card_id, true)?;
        let tributes = placement.tributes.clone();
        let level = placement.stats.level;

        for tribute in &tributes {
            let tribute_card = self
                .state
                .instance(*tribute)
                .map(|instance| instance.card_id.clone())
                .unwrap_or_default();
            self.state.send_to_discard(*tribute, false);
            let description = format!("{} tributed {}", self.side_name(side), self.catalog.name_of(&tribute_card));
            self.state.record(
                side,
                DuelEvent::Tributed {
                    instance_id: *tribute,
                    card_id: tribute_card,
                },
                description,
            );
        }

        let report = self.place(side, placement, stance, true);
        let description = format!(
            "{} normal summoned {} in {} stance",
            self.side_name(side),
            self.catalog.name_of(card_id),
            stance
        );
        self.state.record(
            side,
            DuelEvent::NormalSummoned {
                instance_id: report.instance_id,
                card_id: report.card_id.clone(),
                slot: report.slot,
                stance,
                level,
                tributes,
            },
            description,
        );
        debug!(%side, card_id, instance_id = %report.instance_id, slot = %report.slot, "normal summon");
        Ok(report)
    }

    /// Face-down defense placement; never costs tributes.
    pub fn set_creature(&mut self, side: SideId, card_id: &str) -> Result<SummonReport, RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::SetCreature)?;
        let placement = self.validate(side, card_id, false)?;

        let report = self.place(side, placement, Stance::FaceDownDefense, false);
        let description = format!("{} set a creature face-down", self.side_name(side));
        self.state.record(
            side,
            DuelEvent::CreatureSet {
                instance_id: report.instance_id,
                card_id: report.card_id.clone(),
                slot: report.slot,
            },
            description,
        );
        debug!(%side, card_id, instance_id = %report.instance_id, "creature set");
        Ok(report)
    }

    /// Face-down to face-up attack. Attack eligibility is kept.
    pub fn flip_summon(&mut self, side: SideId, instance_id: InstanceId) -> Result<(), RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::FlipSummon)?;
        let instance = self
            .state
            .instance(instance_id)
            .ok_or(RuleError::InstanceNotFound { instance_id })?;
        if !instance.is_on_field() {
            return Err(RuleError::NotOnField { instance_id });
        }
        if instance.controller != side {
            return Err(RuleError::NotControlled { instance_id, side });
        }
        if instance.face_up || !instance.stance.map_or(false, Stance::is_face_down) {
            return Err(RuleError::NotFaceDown);
        }
        if !instance.flags.can_change_stance {
            return Err(RuleError::StanceLocked);
        }
        let card_id = instance.card_id.clone();
        let stats = self
            .catalog
            .creature_stats(&card_id)
            .ok_or_else(|| RuleError::NotACreature {
                card_id: card_id.clone(),
            })?;

        if let Some(instance) = self.state.instance_mut(instance_id) {
            instance.face_up = true;
            instance.stance = Some(Stance::Attack);
            instance.flags.can_change_stance = false;
        }
        let description = format!(
            "{} flip summoned {} ({}/{})",
            self.side_name(side),
            self.catalog.name_of(&card_id),
            stats.attack,
            stats.defense
        );
        self.state.record(
            side,
            DuelEvent::FlipSummoned {
                instance_id,
                card_id,
                attack: stats.attack,
                defense: stats.defense,
            },
            description,
        );
        debug!(%side, %instance_id, "flip summon");
        Ok(())
    }

    /// Every precondition shared by normal summon and set, checked without mutating.
    fn validate(&self, side: SideId, card_id: &str, pay_tributes: bool) -> Result<Placement, RuleError> {
        let definition = self.catalog.card(card_id).ok_or_else(|| RuleError::UnknownCard {
            card_id: card_id.to_string(),
        })?;
        let stats = definition.creature_stats().ok_or_else(|| RuleError::NotACreature {
            card_id: card_id.to_string(),
        })?;
        let hand_instance = self
            .state
            .find_in_hand(side, card_id)
            .ok_or_else(|| RuleError::CardNotInHand {
                card_id: card_id.to_string(),
            })?;
        if self.state.side(side).flags.normal_summon_used {
            return Err(RuleError::AlreadySummoned);
        }

        let tributes = if pay_tributes {
            let required = stats.tributes_required();
            let available = self.state.field_creatures(side);
            if available.len() < required {
                return Err(RuleError::InsufficientTributes {
                    level: stats.level,
                    required,
                    available: available.len(),
                });
            }
            available.into_iter().take(required).collect()
        } else {
            Vec::new()
        };

        // Slots the tributes vacate are available to the incoming creature.
        let slot = FieldSlot::all(self.config.field_slots)
            .find(|slot| match self.state.side(side).field.get(slot) {
                None => true,
                Some(occupant) => tributes.contains(occupant),
            })
            .ok_or(RuleError::NoEmptySlot)?;

        Ok(Placement {
            hand_instance,
            card_id: card_id.to_string(),
            stats,
            tributes,
            slot,
        })
    }

    /// Retires the hand instance and creates its field counterpart in `placement.slot`.
    fn place(&mut self, side: SideId, placement: Placement, stance: Stance, face_up: bool) -> SummonReport {
        let turn = self.state.turn;
        self.state.side_mut(side).remove_from_hand(placement.hand_instance);
        self.state.instances.remove(&placement.hand_instance);

        let instance_id = self.state.create_instance(placement.card_id.clone(), side, Zone::Field);
        if let Some(instance) = self.state.instance_mut(instance_id) {
            instance.slot = Some(placement.slot);
            instance.stance = Some(stance);
            instance.face_up = face_up;
            instance.turn_placed = Some(turn);
            instance.flags.has_attacked = false;
            instance.flags.can_attack = stance == Stance::Attack;
            instance.flags.can_change_stance = false;
        }
        let state = self.state.side_mut(side);
        state.field.insert(placement.slot, instance_id);
        state.flags.normal_summon_used = true;

        SummonReport {
            instance_id,
            card_id: placement.card_id,
            slot: placement.slot,
            stance,
            tributes: placement.tributes,
        }
    }

    fn side_name(&self, side: SideId) -> String {
        self.state.side(side).name.clone()
    }
}
