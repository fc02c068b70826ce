use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::battle::BattleReport;
use super::card::CardId;
use super::error::{ErrorCategory, RuleError};
use super::state::{FieldSlot, InstanceId, Phase, SideId, Stance};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AdvancePhase,
    NormalSummon,
    SetCreature,
    FlipSummon,
    DeclareAttack,
    ChangeStance,
    ForgoAttack,
    Discard,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::AdvancePhase => "advance_phase",
            ActionKind::NormalSummon => "normal_summon",
            ActionKind::SetCreature => "set_creature",
            ActionKind::FlipSummon => "flip_summon",
            ActionKind::DeclareAttack => "declare_attack",
            ActionKind::ChangeStance => "change_stance",
            ActionKind::ForgoAttack => "forgo_attack",
            ActionKind::Discard => "discard",
        }
    }

    /// Kinds a side may submit during `phase`.
    pub fn allowed_in(phase: Phase) -> &'static [ActionKind] {
        match phase {
            Phase::Main1 | Phase::Main2 => &[
                ActionKind::NormalSummon,
                ActionKind::SetCreature,
                ActionKind::FlipSummon,
                ActionKind::ChangeStance,
                ActionKind::AdvancePhase,
            ],
            Phase::Battle => &[
                ActionKind::DeclareAttack,
                ActionKind::ForgoAttack,
                ActionKind::AdvancePhase,
            ],
            Phase::End => &[ActionKind::Discard, ActionKind::AdvancePhase],
            Phase::Draw | Phase::Standby => &[ActionKind::AdvancePhase],
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "advance_phase" => Ok(ActionKind::AdvancePhase),
            "normal_summon" => Ok(ActionKind::NormalSummon),
            "set_creature" | "set_monster" | "set" => Ok(ActionKind::SetCreature),
            "flip_summon" => Ok(ActionKind::FlipSummon),
            "declare_attack" | "attack" => Ok(ActionKind::DeclareAttack),
            "change_stance" | "change_position" => Ok(ActionKind::ChangeStance),
            "forgo_attack" | "skip_attack" => Ok(ActionKind::ForgoAttack),
            "discard" => Ok(ActionKind::Discard),
            _ => Err(RuleError::UnknownActionKind { kind: s.to_string() }),
        }
    }
}

/// One discrete action submitted by the side to act.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameAction {
    AdvancePhase {
        side: SideId,
    },
    NormalSummon {
        side: SideId,
        card_id: CardId,
        #[serde(default)]
        stance: Stance,
    },
    SetCreature {
        side: SideId,
        card_id: CardId,
    },
    FlipSummon {
        side: SideId,
        instance_id: InstanceId,
    },
    DeclareAttack {
        side: SideId,
        attacker: InstanceId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<InstanceId>,
    },
    ChangeStance {
        side: SideId,
        instance_id: InstanceId,
        stance: Stance,
    },
    ForgoAttack {
        side: SideId,
        instance_id: InstanceId,
    },
    Discard {
        side: SideId,
        card_id: CardId,
    },
}

impl GameAction {
    pub fn side(&self) -> SideId {
        match self {
            GameAction::AdvancePhase { side }
            | GameAction::NormalSummon { side, .. }
            | GameAction::SetCreature { side, .. }
            | GameAction::FlipSummon { side, .. }
            | GameAction::DeclareAttack { side, .. }
            | GameAction::ChangeStance { side, .. }
            | GameAction::ForgoAttack { side, .. }
            | GameAction::Discard { side, .. } => *side,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            GameAction::AdvancePhase { .. } => ActionKind::AdvancePhase,
            GameAction::NormalSummon { .. } => ActionKind::NormalSummon,
            GameAction::SetCreature { .. } => ActionKind::SetCreature,
            GameAction::FlipSummon { .. } => ActionKind::FlipSummon,
            GameAction::DeclareAttack { .. } => ActionKind::DeclareAttack,
            GameAction::ChangeStance { .. } => ActionKind::ChangeStance,
            GameAction::ForgoAttack { .. } => ActionKind::ForgoAttack,
            GameAction::Discard { .. } => ActionKind::Discard,
        }
    }
}

/// Loosely typed action payload as sent by external decision makers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    pub acting_side: SideId,
    pub action_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_instance_id: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_stance: Option<Stance>,
}

impl TryFrom<ActionRecord> for GameAction {
    type Error = RuleError;

    fn try_from(record: ActionRecord) -> Result<Self, Self::Error> {
        let side = record.acting_side;
        let kind: ActionKind = record.action_kind.parse()?;
        let card_id = |what: &str| {
            record
                .card_id
                .clone()
                .ok_or_else(|| RuleError::malformed(format!("card id required for {what}")))
        };
        // Single-subject actions also accept the subject as the target field.
        let subject = |what: &str| {
            record
                .instance_id
                .or(record.target_instance_id)
                .ok_or_else(|| RuleError::malformed(format!("instance id required for {what}")))
        };

        let action = match kind {
            ActionKind::AdvancePhase => GameAction::AdvancePhase { side },
            ActionKind::NormalSummon => GameAction::NormalSummon {
                side,
                card_id: card_id("normal summon")?,
                stance: record.requested_stance.unwrap_or_default(),
            },
            ActionKind::SetCreature => GameAction::SetCreature {
                side,
                card_id: card_id("set")?,
            },
            ActionKind::FlipSummon => GameAction::FlipSummon {
                side,
                instance_id: subject("flip summon")?,
            },
            ActionKind::DeclareAttack => GameAction::DeclareAttack {
                side,
                attacker: record
                    .instance_id
                    .ok_or_else(|| RuleError::malformed("attacker instance id required"))?,
                target: record.target_instance_id,
            },
            ActionKind::ChangeStance => GameAction::ChangeStance {
                side,
                instance_id: subject("stance change")?,
                stance: record
                    .requested_stance
                    .ok_or_else(|| RuleError::malformed("requested stance required"))?,
            },
            ActionKind::ForgoAttack => GameAction::ForgoAttack {
                side,
                instance_id: subject("forgo attack")?,
            },
            ActionKind::Discard => GameAction::Discard {
                side,
                card_id: card_id("discard")?,
            },
        };
        Ok(action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub side: SideId,
    pub turn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawn: Option<InstanceId>,
    #[serde(default)]
    pub discard_required: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummonReport {
    pub instance_id: InstanceId,
    pub card_id: CardId,
    pub slot: FieldSlot,
    pub stance: Stance,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tributes: Vec<InstanceId>,
}

/// Structured payload returned with an [`ActionResult`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDetail {
    PhaseAdvanced(PhaseReport),
    Summoned(SummonReport),
    Flipped {
        instance_id: InstanceId,
    },
    Battle(BattleReport),
    StanceChanged {
        instance_id: InstanceId,
        from: Stance,
        to: Stance,
    },
    AttackForgone {
        instance_id: InstanceId,
    },
    Discarded {
        instance_id: InstanceId,
        remaining: usize,
    },
    Rejected {
        category: ErrorCategory,
        error: RuleError,
    },
}

/// Uniform answer to every submitted action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ActionDetail>,
}

impl ActionResult {
    pub fn accepted(message: impl Into<String>, detail: ActionDetail) -> Self {
        Self {
            success: true,
            message: message.into(),
            detail: Some(detail),
        }
    }

    pub fn rejected(error: RuleError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            detail: Some(ActionDetail::Rejected {
                category: error.category(),
                error,
            }),
        }
    }

    pub fn error(&self) -> Option<&RuleError> {
        match &self.detail {
            Some(ActionDetail::Rejected { error, .. }) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str) -> ActionRecord {
        ActionRecord {
            acting_side: SideId::PlayerOne,
            action_kind: kind.into(),
            card_id: None,
            instance_id: None,
            target_instance_id: None,
            requested_stance: None,
        }
    }

    #[test]
    fn record_converts_to_typed_action() {
        let mut summon = record("normal-summon");
        summon.card_id = Some("copper_hound".into());
        assert_eq!(
            GameAction::try_from(summon),
            Ok(GameAction::NormalSummon {
                side: SideId::PlayerOne,
                card_id: "copper_hound".into(),
                stance: Stance::Attack,
            })
        );

        let mut flip = record("flip_summon");
        flip.target_instance_id = Some(InstanceId(9));
        assert_eq!(
            GameAction::try_from(flip),
            Ok(GameAction::FlipSummon {
                side: SideId::PlayerOne,
                instance_id: InstanceId(9),
            })
        );
    }

    #[test]
    fn unknown_kind_and_missing_fields_fail_closed() {
        let unknown = GameAction::try_from(record("activate_spell")).expect_err("unknown kind");
        assert_eq!(unknown.category(), ErrorCategory::Contract);

        let missing = GameAction::try_from(record("declare_attack")).expect_err("no attacker");
        assert!(matches!(missing, RuleError::MalformedAction { .. }));
    }

    #[test]
    fn main_phase_permits_summons_but_not_attacks() {
        let main = ActionKind::allowed_in(Phase::Main1);
        assert!(main.contains(&ActionKind::NormalSummon));
        assert!(!main.contains(&ActionKind::DeclareAttack));
        assert_eq!(ActionKind::allowed_in(Phase::Standby), &[ActionKind::AdvancePhase]);
    }

    #[test]
    fn typed_action_json_uses_kind_tag() {
        let action: GameAction =
            serde_json::from_str(r#"{"kind":"declare_attack","side":"player_two","attacker":4}"#)
                .expect("action parses");
        assert_eq!(
            action,
            GameAction::DeclareAttack {
                side: SideId::PlayerTwo,
                attacker: InstanceId(4),
                target: None,
            }
        );
    }
}
