pub mod ai;
pub mod game;
pub mod utils;

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

pub use ai::{AiAgent, AiConfig, AiDecision, AiStrategy};
pub use game::{
    ActionDetail, ActionKind, ActionRecord, ActionResult, BattleOutcome, BattleReport,
    CardCatalog, CardDefinition, CardId, CardKind, CardLibrary, CreatureStats, DuelConfig,
    DuelEngine, DuelEvent, DuelResult, DuelState, DuelStatus, DuelSummary, ErrorCategory,
    FieldSlot, GameAction, InstanceId, IntegrityError, Phase, RuleError, SideId, Stance, Zone,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_side(value: &str) -> Result<SideId, JsValue> {
    match value.to_ascii_lowercase().replace('-', "_").as_str() {
        "player_one" | "one" | "1" => Ok(SideId::PlayerOne),
        "player_two" | "two" | "2" => Ok(SideId::PlayerTwo),
        other => Err(JsValue::from_str(&format!("unknown side: {other}"))),
    }
}

fn ai_config(strategy: Option<String>, seed: Option<u64>) -> AiConfig {
    let strategy = strategy
        .as_deref()
        .and_then(|value| AiStrategy::from_str(value).ok())
        .unwrap_or_default();
    AiConfig { strategy, seed }
}

/// Both payload shapes callers may send: the typed action or the flat record.
#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingAction {
    Typed(GameAction),
    Record(ActionRecord),
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<ActionResult>,
}

#[wasm_bindgen]
pub struct DuelSession {
    engine: DuelEngine,
}

#[wasm_bindgen]
impl DuelSession {
    /// Starts a random duel; `config_json` may override any [`DuelConfig`] field.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<DuelSession, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => DuelConfig::default(),
        };
        Ok(DuelSession {
            engine: DuelEngine::new(config),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.state()).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: DuelState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.engine.replace_state(state).map_err(to_js_error)
    }

    /// Applies one action and returns the [`ActionResult`] as JSON. Rejections are results,
    /// not errors; only unparseable input fails.
    pub fn submit_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let result = match serde_json::from_str::<IncomingAction>(action_json) {
            Ok(IncomingAction::Typed(action)) => self.engine.submit(action),
            Ok(IncomingAction::Record(record)) => self.engine.submit_record(record),
            Err(error) => ActionResult::rejected(RuleError::MalformedAction {
                reason: error.to_string(),
            }),
        };
        serde_json::to_string(&result).map_err(serde_to_js_error)
    }

    pub fn summary_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.summary()).map_err(serde_to_js_error)
    }

    pub fn can_advance(&self) -> bool {
        self.engine.can_advance()
    }

    pub fn available_actions_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.available_action_kinds()).map_err(serde_to_js_error)
    }

    pub fn legal_actions_json(&self, side: &str) -> Result<String, JsValue> {
        let side = parse_side(side)?;
        serde_json::to_string(&self.engine.legal_actions(side)).map_err(serde_to_js_error)
    }

    /// Lets the built-in agent play one action for the side to act.
    pub fn ai_move_json(&mut self, strategy: Option<String>, seed: Option<u64>) -> Result<String, JsValue> {
        let side = self.engine.state().current_side;
        let mut agent = AiAgent::new(ai_config(strategy, seed));
        let decision = agent.decide_action(&self.engine, side);
        let applied = decision
            .action
            .clone()
            .map(|action| self.engine.submit(action));

        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }
}

/// Creates a freshly dealt duel state from an optional config object.
#[wasm_bindgen(js_name = "createDuelState")]
pub fn create_duel_state(config: JsValue) -> Result<JsValue, JsValue> {
    let config: DuelConfig = if config.is_undefined() || config.is_null() {
        DuelConfig::default()
    } else {
        from_value(config).map_err(JsValue::from)?
    };
    to_value(DuelEngine::new(config).state()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: DuelState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// Suggests, without applying, the agent's action for the side to act in `state`.
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(state: JsValue, strategy: Option<String>) -> Result<JsValue, JsValue> {
    let state: DuelState = from_value(state).map_err(JsValue::from)?;
    let side = state.current_side;
    let engine = DuelEngine::from_state(state, CardLibrary::builtin(), DuelConfig::default())
        .map_err(to_js_error)?;
    let decision = AiAgent::new(ai_config(strategy, None)).decide_action(&engine, side);
    to_value(&decision).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
