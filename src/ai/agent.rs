use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::rules::apply_action;
use crate::game::{CardCatalog, DuelEngine, DuelState, GameAction, SideId, Stance};
use crate::utils::make_rng;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    Random,
    #[default]
    Aggressive,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" | "easy" => Ok(AiStrategy::Random),
            "aggressive" | "aggro" | "normal" => Ok(AiStrategy::Aggressive),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub strategy: AiStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl AiConfig {
    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<GameAction>,
    pub evaluation: f64,
    /// Number of legal actions the choice was made from.
    pub candidates: usize,
    pub strategy: AiStrategy,
    pub reason: String,
}

/// Picks one legal action for a side. Never mutates the duel it looks at.
pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        let rng = make_rng(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn decide_action<C: CardCatalog>(&mut self, engine: &DuelEngine<C>, side: SideId) -> AiDecision {
        let strategy = self.config.strategy;
        let mut legal = engine.legal_actions(side);
        if legal.is_empty() {
            return AiDecision {
                action: None,
                evaluation: evaluate(engine.state(), side),
                candidates: 0,
                strategy,
                reason: "no legal action".to_string(),
            };
        }

        let candidates = legal.len();
        let decision = match strategy {
            AiStrategy::Random => {
                let index = self.rng.gen_range(0..legal.len());
                let action = legal.swap_remove(index);
                AiDecision {
                    evaluation: self.score(engine, side, &action),
                    action: Some(action),
                    candidates,
                    strategy,
                    reason: "picked at random".to_string(),
                }
            }
            AiStrategy::Aggressive => {
                // Shuffle first so equal scores do not always favour the same action.
                legal.shuffle(&mut self.rng);
                let mut best: Option<(f64, GameAction)> = None;
                for action in legal {
                    let score = self.score(engine, side, &action);
                    if best.as_ref().map_or(true, |(top, _)| score > *top) {
                        best = Some((score, action));
                    }
                }
                let (evaluation, action) = match best {
                    Some((score, action)) => (score, Some(action)),
                    None => (evaluate(engine.state(), side), None),
                };
                AiDecision {
                    action,
                    evaluation,
                    candidates,
                    strategy,
                    reason: "highest board and life advantage".to_string(),
                }
            }
        };
        debug!(%side, ?strategy, candidates, evaluation = decision.evaluation, "ai decided");
        decision
    }

    /// Evaluation of the duel after `action`, with a small bias against passing the turn.
    fn score<C: CardCatalog>(&self, engine: &DuelEngine<C>, side: SideId, action: &GameAction) -> f64 {
        let mut trial = engine.state().without_log();
        if apply_action(&mut trial, engine.catalog(), engine.config(), action).is_err() {
            return f64::MIN;
        }
        let bias = match action {
            GameAction::AdvancePhase { .. } => -50.0,
            GameAction::ForgoAttack { .. } => -100.0,
            _ => 0.0,
        };
        evaluate_with(&trial, engine.catalog(), side) + bias
    }
}

/// Life difference only; used when no catalog lookup is at hand.
fn evaluate(state: &DuelState, side: SideId) -> f64 {
    let life = |side: SideId| f64::from(state.side(side).life_points);
    life(side) - life(side.opponent())
}

fn evaluate_with(state: &DuelState, catalog: &dyn CardCatalog, side: SideId) -> f64 {
    if state.is_finished() {
        return match state.winner {
            Some(winner) if winner == side => 1_000_000.0,
            Some(_) => -1_000_000.0,
            None => 0.0,
        };
    }
    let board = |side: SideId| -> f64 {
        state
            .field_creatures(side)
            .into_iter()
            .filter_map(|id| state.instance(id))
            .filter_map(|instance| {
                let stats = catalog.creature_stats(&instance.card_id)?;
                let value = match instance.stance {
                    Some(Stance::Attack) => stats.attack,
                    _ => stats.defense,
                };
                Some(f64::from(value))
            })
            .sum()
    };
    evaluate(state, side) + 1.5 * board(side) - 1.2 * board(side.opponent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CardId, CardLibrary, DuelConfig, Phase};

    fn engine_in_main() -> DuelEngine {
        let deck: Vec<CardId> = ["iron_boar", "copper_hound", "ember_pup", "deep_insight", "snare_pit", "tin_sentry"]
            .map(String::from)
            .to_vec();
        let mut engine =
            DuelEngine::with_decklists(CardLibrary::builtin(), DuelConfig::default(), &deck, &deck)
                .expect("known cards");
        while engine.state().phase != Phase::Main1 {
            let side = engine.state().current_side;
            engine.submit(GameAction::AdvancePhase { side });
        }
        engine
    }

    #[test]
    fn finished_duel_yields_no_action() {
        let mut engine = engine_in_main();
        let mut state = engine.state().clone();
        state.side_mut(SideId::PlayerTwo).life_points = 0;
        state.settle_life_points();
        engine.replace_state(state).expect("consistent");

        let decision = AiAgent::new(AiConfig::default()).decide_action(&engine, SideId::PlayerOne);
        assert!(decision.action.is_none());
        assert_eq!(decision.candidates, 0);
    }

    #[test]
    fn aggressive_agent_summons_its_strongest_creature() {
        let engine = engine_in_main();
        let mut agent = AiAgent::new(AiConfig::default().with_seed(3));
        let decision = agent.decide_action(&engine, SideId::PlayerOne);
        assert_eq!(
            decision.action,
            Some(GameAction::NormalSummon {
                side: SideId::PlayerOne,
                card_id: "iron_boar".into(),
                stance: Stance::Attack,
            })
        );
    }

    #[test]
    fn random_agent_only_picks_legal_actions() {
        let engine = engine_in_main();
        let legal = engine.legal_actions(SideId::PlayerOne);
        let mut agent = AiAgent::new(
            AiConfig::default()
                .with_strategy(AiStrategy::Random)
                .with_seed(11),
        );
        for _ in 0..20 {
            let decision = agent.decide_action(&engine, SideId::PlayerOne);
            let action = decision.action.expect("main phase has actions");
            assert!(legal.contains(&action));
        }
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("Aggro".parse(), Ok(AiStrategy::Aggressive));
        assert_eq!("random".parse(), Ok(AiStrategy::Random));
        assert_eq!("defensive".parse::<AiStrategy>(), Err(()));
    }
}
