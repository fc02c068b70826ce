use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use super::card::CardId;
use super::state::{InstanceId, IntegrityError, Phase, SideId, Stance};

/// Taxonomy a rejection belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Wrong phase, wrong side, or the duel is not running.
    IllegalTiming,
    /// Missing card, slot, tribute or similar resource.
    Resource,
    /// The referenced instance is unknown, foreign, or already used this turn.
    StateConsistency,
    /// The caller sent something that is not a well-formed action.
    Contract,
}

/// Why an action was rejected. Rejections never mutate the duel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleError {
    #[error("duel is not active")]
    DuelNotActive,
    #[error("duel is already finished")]
    DuelFinished,
    #[error("it is not {side}'s turn")]
    NotYourTurn { side: SideId },
    #[error("{kind} is not allowed during the {phase} phase")]
    ActionNotAllowed { kind: ActionKind, phase: Phase },
    #[error("cannot advance from the {phase} phase at this time")]
    CannotAdvance { phase: Phase },
    #[error("card {card_id} is not in hand")]
    CardNotInHand { card_id: CardId },
    #[error("unknown card {card_id}")]
    UnknownCard { card_id: CardId },
    #[error("card {card_id} is not a creature")]
    NotACreature { card_id: CardId },
    #[error("already normal summoned this turn")]
    AlreadySummoned,
    #[error("need {required} tribute(s) for a level {level} creature, {available} available")]
    InsufficientTributes {
        level: u8,
        required: usize,
        available: usize,
    },
    #[error("no empty creature slot")]
    NoEmptySlot,
    #[error("stance {stance} cannot be requested here")]
    InvalidStance { stance: Stance },
    #[error("instance {instance_id} not found")]
    InstanceNotFound { instance_id: InstanceId },
    #[error("instance {instance_id} is not on the field")]
    NotOnField { instance_id: InstanceId },
    #[error("instance {instance_id} is not controlled by {side}")]
    NotControlled {
        instance_id: InstanceId,
        side: SideId,
    },
    #[error("creature is not face-down")]
    NotFaceDown,
    #[error("face-down creatures must be flip summoned")]
    FaceDown,
    #[error("cannot change stance this turn")]
    StanceLocked,
    #[error("cannot change stance after attacking")]
    AlreadyAttacked,
    #[error("creature must be in attack stance")]
    NotInAttackStance,
    #[error("creature cannot attack")]
    CannotAttack,
    #[error("cannot attack on the turn it was placed")]
    PlacedThisTurn,
    #[error("cannot attack directly while the opponent controls creatures")]
    DirectAttackBlocked,
    #[error("target must be a creature on the opponent's field")]
    InvalidTarget,
    #[error("no discard is required")]
    NoDiscardRequired,
    #[error("malformed action: {reason}")]
    MalformedAction { reason: String },
    #[error("unknown action kind: {kind}")]
    UnknownActionKind { kind: String },
    #[error("state integrity violated: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RuleError::DuelNotActive
            | RuleError::DuelFinished
            | RuleError::NotYourTurn { .. }
            | RuleError::ActionNotAllowed { .. }
            | RuleError::CannotAdvance { .. } => ErrorCategory::IllegalTiming,
            RuleError::CardNotInHand { .. }
            | RuleError::UnknownCard { .. }
            | RuleError::NotACreature { .. }
            | RuleError::InsufficientTributes { .. }
            | RuleError::NoEmptySlot
            | RuleError::NoDiscardRequired => ErrorCategory::Resource,
            RuleError::InstanceNotFound { .. }
            | RuleError::NotOnField { .. }
            | RuleError::NotControlled { .. }
            | RuleError::AlreadySummoned
            | RuleError::NotFaceDown
            | RuleError::FaceDown
            | RuleError::StanceLocked
            | RuleError::AlreadyAttacked
            | RuleError::NotInAttackStance
            | RuleError::CannotAttack
            | RuleError::PlacedThisTurn
            | RuleError::DirectAttackBlocked
            | RuleError::InvalidTarget
            | RuleError::IntegrityViolation { .. } => ErrorCategory::StateConsistency,
            RuleError::InvalidStance { .. }
            | RuleError::MalformedAction { .. }
            | RuleError::UnknownActionKind { .. } => ErrorCategory::Contract,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RuleError::MalformedAction {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            RuleError::AlreadySummoned.to_string(),
            "already normal summoned this turn"
        );
        assert_eq!(
            RuleError::InsufficientTributes {
                level: 7,
                required: 2,
                available: 1
            }
            .to_string(),
            "need 2 tribute(s) for a level 7 creature, 1 available"
        );
    }

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            RuleError::NotYourTurn {
                side: SideId::PlayerTwo
            }
            .category(),
            ErrorCategory::IllegalTiming
        );
        assert_eq!(RuleError::NoEmptySlot.category(), ErrorCategory::Resource);
        assert_eq!(
            RuleError::InstanceNotFound {
                instance_id: InstanceId(3)
            }
            .category(),
            ErrorCategory::StateConsistency
        );
        assert_eq!(
            RuleError::UnknownActionKind {
                kind: "shuffle".into()
            }
            .category(),
            ErrorCategory::Contract
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(RuleError::NoEmptySlot).expect("error serializes");
        assert_eq!(json["type"], "no_empty_slot");
    }
}
