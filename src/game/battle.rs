//! Attack declaration and resolution, plus the battle-adjacent stance actions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::action::ActionKind;
use super::card::{CardCatalog, CardId, CreatureStats};
use super::error::RuleError;
use super::rules;
use super::state::{CardInstance, DuelEvent, DuelResult, DuelState, InstanceId, SideId, Stance};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    /// No defender; damage went straight to life points.
    Direct,
    AttackerWins,
    DefenderWins,
    /// Equal attack values, both creatures destroyed.
    MutualDestruction,
    /// Equal attack and defense, nothing happens.
    Stalemate,
}

/// Everything one attack resolution did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleReport {
    pub attacker: InstanceId,
    pub attacker_card: CardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_card: Option<CardId>,
    pub attacker_attack: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defender_stance: Option<Stance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defender_value: Option<u32>,
    pub outcome: BattleOutcome,
    pub damage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damaged_side: Option<SideId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destroyed: Vec<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DuelResult>,
}

impl BattleReport {
    pub fn describe(&self) -> String {
        let mut text = match (self.target, self.defender_stance, self.defender_value) {
            (Some(target), Some(stance), Some(value)) => format!(
                "{} ({} ATK) attacked {} in {} stance ({})",
                self.attacker, self.attacker_attack, target, stance, value
            ),
            _ => format!(
                "{} attacked directly for {}",
                self.attacker, self.attacker_attack
            ),
        };
        match self.outcome {
            BattleOutcome::Direct => {}
            BattleOutcome::AttackerWins => text.push_str(": attacker wins"),
            BattleOutcome::DefenderWins => text.push_str(": defender wins"),
            BattleOutcome::MutualDestruction => text.push_str(": both destroyed"),
            BattleOutcome::Stalemate => text.push_str(": no effect"),
        }
        if let (Some(side), true) = (self.damaged_side, self.damage > 0) {
            text.push_str(&format!(", {side} takes {} damage", self.damage));
        }
        text
    }
}

/// Numbers that decide a clash, taken before anything moves.
struct Clash {
    outcome: BattleOutcome,
    damage: u32,
    damaged_side: Option<SideId>,
    destroy_attacker: bool,
    destroy_defender: bool,
}

fn resolve_clash(side: SideId, attack: u32, defender_stance: Stance, defender: CreatureStats) -> Clash {
    let opponent = side.opponent();
    if defender_stance.is_attack_position() {
        let defense = defender.attack;
        match attack.cmp(&defense) {
            std::cmp::Ordering::Greater => Clash {
                outcome: BattleOutcome::AttackerWins,
                damage: attack - defense,
                damaged_side: Some(opponent),
                destroy_attacker: false,
                destroy_defender: true,
            },
            std::cmp::Ordering::Less => Clash {
                outcome: BattleOutcome::DefenderWins,
                damage: defense - attack,
                damaged_side: Some(side),
                destroy_attacker: true,
                destroy_defender: false,
            },
            std::cmp::Ordering::Equal => Clash {
                outcome: BattleOutcome::MutualDestruction,
                damage: 0,
                damaged_side: None,
                destroy_attacker: true,
                destroy_defender: true,
            },
        }
    } else {
        let defense = defender.defense;
        match attack.cmp(&defense) {
            std::cmp::Ordering::Greater => Clash {
                outcome: BattleOutcome::AttackerWins,
                damage: 0,
                damaged_side: None,
                destroy_attacker: false,
                destroy_defender: true,
            },
            std::cmp::Ordering::Less => Clash {
                outcome: BattleOutcome::DefenderWins,
                damage: defense - attack,
                damaged_side: Some(side),
                destroy_attacker: false,
                destroy_defender: false,
            },
            std::cmp::Ordering::Equal => Clash {
                outcome: BattleOutcome::Stalemate,
                damage: 0,
                damaged_side: None,
                destroy_attacker: false,
                destroy_defender: false,
            },
        }
    }
}

pub struct BattleManager<'a> {
    state: &'a mut DuelState,
    catalog: &'a dyn CardCatalog,
}

impl<'a> BattleManager<'a> {
    pub fn new(state: &'a mut DuelState, catalog: &'a dyn CardCatalog) -> Self {
        Self { state, catalog }
    }

    /// Resolves one attack by `attacker`, directly at the opponent when `target` is `None`.
    pub fn declare_attack(
        &mut self,
        side: SideId,
        attacker: InstanceId,
        target: Option<InstanceId>,
    ) -> Result<BattleReport, RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::DeclareAttack)?;
        let attacking = self.controlled_on_field(side, attacker)?;
        if attacking.stance != Some(Stance::Attack) || !attacking.face_up {
            return Err(RuleError::NotInAttackStance);
        }
        if !attacking.flags.can_attack || attacking.flags.has_attacked {
            return Err(RuleError::CannotAttack);
        }
        if attacking.turn_placed == Some(self.state.turn) {
            return Err(RuleError::PlacedThisTurn);
        }
        let attacker_card = attacking.card_id.clone();
        let attack = self.stats_of(&attacker_card)?.attack;
        let opponent = side.opponent();

        let mut report = BattleReport {
            attacker,
            attacker_card,
            target,
            target_card: None,
            attacker_attack: attack,
            defender_stance: None,
            defender_value: None,
            outcome: BattleOutcome::Direct,
            damage: 0,
            damaged_side: None,
            destroyed: Vec::new(),
            result: None,
        };

        let clash = match target {
            None => {
                if !self.state.field_creatures(opponent).is_empty() {
                    return Err(RuleError::DirectAttackBlocked);
                }
                Clash {
                    outcome: BattleOutcome::Direct,
                    damage: attack,
                    damaged_side: Some(opponent),
                    destroy_attacker: false,
                    destroy_defender: false,
                }
            }
            Some(target_id) => {
                let defending = self
                    .state
                    .instance(target_id)
                    .filter(|instance| {
                        instance.is_on_field() && !instance.destroyed && instance.controller == opponent
                    })
                    .ok_or(RuleError::InvalidTarget)?;
                let stance = defending.stance.ok_or(RuleError::InvalidTarget)?;
                let target_card = defending.card_id.clone();
                let defender = self.stats_of(&target_card)?;
                report.defender_stance = Some(stance);
                report.defender_value = Some(if stance.is_attack_position() {
                    defender.attack
                } else {
                    defender.defense
                });
                report.target_card = Some(target_card);
                resolve_clash(side, attack, stance, defender)
            }
        };

        // Validation is over; apply the result.
        if let Some(instance) = self.state.instance_mut(attacker) {
            instance.flags.has_attacked = true;
        }
        if clash.destroy_defender {
            if let Some(target_id) = target {
                self.state.send_to_discard(target_id, true);
                report.destroyed.push(target_id);
            }
        }
        if clash.destroy_attacker {
            self.state.send_to_discard(attacker, true);
            report.destroyed.push(attacker);
        }
        if let Some(damaged) = clash.damaged_side {
            if clash.damage > 0 {
                self.state.damage(damaged, clash.damage);
            }
        }
        report.outcome = clash.outcome;
        report.damage = clash.damage;
        report.damaged_side = clash.damaged_side.filter(|_| clash.damage > 0);
        report.result = self.state.settle_life_points();

        let description = report.describe();
        self.state.record(
            side,
            DuelEvent::Battle {
                report: report.clone(),
            },
            description,
        );
        debug!(%side, %attacker, outcome = ?report.outcome, damage = report.damage, "attack resolved");
        Ok(report)
    }

    /// Switches a face-up creature between attack and defense. Returns the previous stance.
    pub fn change_stance(
        &mut self,
        side: SideId,
        instance_id: InstanceId,
        stance: Stance,
    ) -> Result<Stance, RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::ChangeStance)?;
        if stance.is_face_down() {
            return Err(RuleError::InvalidStance { stance });
        }
        let instance = self.controlled_on_field(side, instance_id)?;
        let from = instance.stance.ok_or(RuleError::NotOnField { instance_id })?;
        if from.is_face_down() || !instance.face_up {
            return Err(RuleError::FaceDown);
        }
        if !instance.flags.can_change_stance {
            return Err(RuleError::StanceLocked);
        }
        if instance.flags.has_attacked {
            return Err(RuleError::AlreadyAttacked);
        }
        if from == stance {
            return Err(RuleError::InvalidStance { stance });
        }

        if let Some(instance) = self.state.instance_mut(instance_id) {
            instance.stance = Some(stance);
            instance.flags.can_change_stance = false;
        }
        let description = format!("{instance_id} changed from {from} to {stance} stance");
        self.state.record(
            side,
            DuelEvent::StanceChanged {
                instance_id,
                from,
                to: stance,
            },
            description,
        );
        debug!(%side, %instance_id, %from, to = %stance, "stance changed");
        Ok(from)
    }

    /// Gives up the remaining attack of a creature so the battle phase can end.
    pub fn forgo_attack(&mut self, side: SideId, instance_id: InstanceId) -> Result<(), RuleError> {
        rules::ensure_can_act(self.state, side, ActionKind::ForgoAttack)?;
        let instance = self.controlled_on_field(side, instance_id)?;
        if !instance.flags.can_attack || instance.flags.has_attacked {
            return Err(RuleError::CannotAttack);
        }

        if let Some(instance) = self.state.instance_mut(instance_id) {
            instance.flags.can_attack = false;
        }
        let description = format!("{instance_id} does not attack this turn");
        self.state
            .record(side, DuelEvent::AttackForgone { instance_id }, description);
        Ok(())
    }

    fn controlled_on_field(&self, side: SideId, instance_id: InstanceId) -> Result<&CardInstance, RuleError> {
        let instance = self
            .state
            .instance(instance_id)
            .ok_or(RuleError::InstanceNotFound { instance_id })?;
        if !instance.is_on_field() || instance.destroyed {
            return Err(RuleError::NotOnField { instance_id });
        }
        if instance.controller != side {
            return Err(RuleError::NotControlled { instance_id, side });
        }
        Ok(instance)
    }

    fn stats_of(&self, card_id: &str) -> Result<CreatureStats, RuleError> {
        self.catalog
            .creature_stats(card_id)
            .ok_or_else(|| RuleError::NotACreature {
                card_id: card_id.to_string(),
            })
    }
}
