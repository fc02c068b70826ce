use tracing::debug;

use super::action::{ActionDetail, ActionKind, GameAction};
use super::battle::BattleManager;
use super::card::CardCatalog;
use super::config::DuelConfig;
use super::error::RuleError;
use super::phase::PhaseManager;
use super::state::{DuelState, DuelStatus, SideId};
use super::summon::SummoningManager;

pub fn ensure_active(state: &DuelState) -> Result<(), RuleError> {
    match state.status {
        DuelStatus::Active => Ok(()),
        DuelStatus::Waiting => Err(RuleError::DuelNotActive),
        DuelStatus::Finished => Err(RuleError::DuelFinished),
    }
}

pub fn ensure_turn_owner(state: &DuelState, side: SideId) -> Result<(), RuleError> {
    if state.current_side != side {
        return Err(RuleError::NotYourTurn { side });
    }
    Ok(())
}

pub fn ensure_phase_allows(state: &DuelState, kind: ActionKind) -> Result<(), RuleError> {
    if !ActionKind::allowed_in(state.phase).contains(&kind) {
        return Err(RuleError::ActionNotAllowed {
            kind,
            phase: state.phase,
        });
    }
    Ok(())
}

/// Timing checks shared by every action: running duel, right side, right phase.
pub fn ensure_can_act(state: &DuelState, side: SideId, kind: ActionKind) -> Result<(), RuleError> {
    ensure_active(state)?;
    ensure_turn_owner(state, side)?;
    ensure_phase_allows(state, kind)
}

/// An `Err` leaves `state` untouched.
pub fn apply_action(
    state: &mut DuelState,
    catalog: &dyn CardCatalog,
    config: &DuelConfig,
    action: &GameAction,
) -> Result<(String, ActionDetail), RuleError> {
    let side = action.side();
    ensure_can_act(state, side, action.kind())?;
    debug!(kind = %action.kind(), %side, turn = state.turn, phase = %state.phase, "applying action");

    match action {
        GameAction::AdvancePhase { side } => {
            let report = PhaseManager::new(state, config).advance_phase(*side)?;
            Ok((
                format!("advanced to the {} phase", report.phase),
                ActionDetail::PhaseAdvanced(report),
            ))
        }
        GameAction::Discard { side, card_id } => {
            let (instance_id, remaining) =
                PhaseManager::new(state, config).discard(*side, card_id)?;
            Ok((
                format!("discarded {}", catalog.name_of(card_id)),
                ActionDetail::Discarded {
                    instance_id,
                    remaining,
                },
            ))
        }
        GameAction::NormalSummon {
            side,
            card_id,
            stance,
        } => {
            let report =
                SummoningManager::new(state, catalog, config).normal_summon(*side, card_id, *stance)?;
            Ok((
                format!("successfully summoned {}", catalog.name_of(card_id)),
                ActionDetail::Summoned(report),
            ))
        }
        GameAction::SetCreature { side, card_id } => {
            let report = SummoningManager::new(state, catalog, config).set_creature(*side, card_id)?;
            Ok((
                "successfully set a creature face-down".to_string(),
                ActionDetail::Summoned(report),
            ))
        }
        GameAction::FlipSummon { side, instance_id } => {
            SummoningManager::new(state, catalog, config).flip_summon(*side, *instance_id)?;
            let name = state
                .instance(*instance_id)
                .map(|instance| catalog.name_of(&instance.card_id))
                .unwrap_or_default();
            Ok((
                format!("successfully flip summoned {name}"),
                ActionDetail::Flipped {
                    instance_id: *instance_id,
                },
            ))
        }
        GameAction::DeclareAttack {
            side,
            attacker,
            target,
        } => {
            let report = BattleManager::new(state, catalog).declare_attack(*side, *attacker, *target)?;
            Ok((report.describe(), ActionDetail::Battle(report)))
        }
        GameAction::ChangeStance {
            side,
            instance_id,
            stance,
        } => {
            let from = BattleManager::new(state, catalog).change_stance(*side, *instance_id, *stance)?;
            Ok((
                format!("changed {instance_id} from {from} to {stance}"),
                ActionDetail::StanceChanged {
                    instance_id: *instance_id,
                    from,
                    to: *stance,
                },
            ))
        }
        GameAction::ForgoAttack { side, instance_id } => {
            BattleManager::new(state, catalog).forgo_attack(*side, *instance_id)?;
            Ok((
                format!("{instance_id} will not attack this turn"),
                ActionDetail::AttackForgone {
                    instance_id: *instance_id,
                },
            ))
        }
    }
}
