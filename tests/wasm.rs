#![cfg(target_arch = "wasm32")]

use duel_engine::{ActionResult, DuelSession, DuelState, DuelSummary};
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn session_plays_through_json() {
    let mut session =
        DuelSession::new(Some(r#"{"seed": 5, "player_one_name": "Ada"}"#.to_string())).expect("config parses");

    let state: DuelState = serde_json::from_str(&session.state_json().expect("state")).expect("state json");
    assert_eq!(state.side(duel_engine::SideId::PlayerOne).name, "Ada");
    assert_eq!(state.side(duel_engine::SideId::PlayerOne).hand.len(), 5);

    let result: ActionResult = serde_json::from_str(
        &session
            .submit_json(r#"{"acting_side":"player_one","action_kind":"advance_phase"}"#)
            .expect("submit"),
    )
    .expect("result json");
    assert!(result.success, "{}", result.message);

    let rejected: ActionResult =
        serde_json::from_str(&session.submit_json("not json").expect("submit")).expect("result json");
    assert!(!rejected.success);

    let summary: DuelSummary =
        serde_json::from_str(&session.summary_json().expect("summary")).expect("summary json");
    assert_eq!(summary.phase, duel_engine::Phase::Standby);

    let legal = session.legal_actions_json("player_one").expect("legal actions");
    assert!(legal.contains("advance_phase"));
    session.ai_move_json(Some("aggressive".into()), Some(1)).expect("ai move");
}
