//! Duel rules core: state model, card catalog, phase/summon/battle managers and the facade.

pub mod action;
pub mod battle;
pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod phase;
pub mod rules;
pub mod setup;
pub mod state;
pub mod summon;

pub use action::{
    ActionDetail, ActionKind, ActionRecord, ActionResult, GameAction, PhaseReport, SummonReport,
};
pub use battle::{BattleManager, BattleOutcome, BattleReport};
pub use card::{
    build_random_deck, CardCatalog, CardDefinition, CardId, CardKind, CardLibrary, CreatureStats,
    Rarity,
};
pub use config::DuelConfig;
pub use engine::DuelEngine;
pub use error::{ErrorCategory, RuleError};
pub use phase::PhaseManager;
pub use setup::DuelSetup;
pub use state::{
    CardInstance, DuelEvent, DuelResult, DuelState, DuelStatus, DuelSummary, FieldSlot,
    InstanceId, IntegrityError, LogEntry, Phase, SideId, SideState, SideSummary, Stance, Zone,
};
pub use summon::SummoningManager;
