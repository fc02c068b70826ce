use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::battle::BattleReport;
use super::card::CardId;
use super::config::DuelConfig;
use crate::utils::now_millis;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SideId {
    PlayerOne,
    PlayerTwo,
}

impl SideId {
    pub const ALL: [SideId; 2] = [SideId::PlayerOne, SideId::PlayerTwo];

    pub fn opponent(self) -> SideId {
        match self {
            SideId::PlayerOne => SideId::PlayerTwo,
            SideId::PlayerTwo => SideId::PlayerOne,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SideId::PlayerOne => "player_one",
            SideId::PlayerTwo => "player_two",
        }
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Creature slot on one side of the field, numbered from 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct FieldSlot(pub u8);

impl FieldSlot {
    pub fn all(count: u8) -> impl Iterator<Item = FieldSlot> {
        (1..=count).map(FieldSlot)
    }
}

impl fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "creature_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Deck,
    Hand,
    Field,
    Discard,
    Removed,
    ExtraDeck,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    #[default]
    Attack,
    Defense,
    FaceDownAttack,
    FaceDownDefense,
}

impl Stance {
    pub fn is_face_down(self) -> bool {
        matches!(self, Stance::FaceDownAttack | Stance::FaceDownDefense)
    }

    /// Attack-position stances compare attack against attack in battle.
    pub fn is_attack_position(self) -> bool {
        matches!(self, Stance::Attack | Stance::FaceDownAttack)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Attack => "attack",
            Stance::Defense => "defense",
            Stance::FaceDownAttack => "face_down_attack",
            Stance::FaceDownDefense => "face_down_defense",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Draw,
    Standby,
    #[serde(rename = "main_1")]
    Main1,
    Battle,
    #[serde(rename = "main_2")]
    Main2,
    End,
}

impl Phase {
    /// Phase that follows this one; `End` wraps to the next side's `Draw`.
    pub fn next(self) -> Phase {
        match self {
            Phase::Draw => Phase::Standby,
            Phase::Standby => Phase::Main1,
            Phase::Main1 => Phase::Battle,
            Phase::Battle => Phase::Main2,
            Phase::Main2 => Phase::End,
            Phase::End => Phase::Draw,
        }
    }

    pub fn is_main(self) -> bool {
        matches!(self, Phase::Main1 | Phase::Main2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Draw => "draw",
            Phase::Standby => "standby",
            Phase::Main1 => "main_1",
            Phase::Battle => "battle",
            Phase::Main2 => "main_2",
            Phase::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Waiting,
    Active,
    Finished,
}

/// Reset when the controller's turn starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceTurnFlags {
    pub has_attacked: bool,
    pub can_attack: bool,
    pub can_change_stance: bool,
}

impl Default for InstanceTurnFlags {
    fn default() -> Self {
        Self {
            has_attacked: false,
            can_attack: true,
            can_change_stance: true,
        }
    }
}

/// Turn-scoped flags of a side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideTurnFlags {
    pub normal_summon_used: bool,
    pub may_draw: bool,
}

impl Default for SideTurnFlags {
    fn default() -> Self {
        Self {
            normal_summon_used: false,
            may_draw: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInstance {
    pub instance_id: InstanceId,
    pub card_id: CardId,
    pub owner: SideId,
    pub controller: SideId,
    pub zone: Zone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<FieldSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
    pub face_up: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, i32>,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_placed: Option<u32>,
    #[serde(default)]
    pub flags: InstanceTurnFlags,
}

impl CardInstance {
    pub fn new(instance_id: InstanceId, card_id: impl Into<CardId>, owner: SideId, zone: Zone) -> Self {
        Self {
            instance_id,
            card_id: card_id.into(),
            owner,
            controller: owner,
            zone,
            slot: None,
            stance: None,
            face_up: false,
            counters: BTreeMap::new(),
            destroyed: false,
            turn_placed: None,
            flags: InstanceTurnFlags::default(),
        }
    }

    pub fn is_on_field(&self) -> bool {
        self.zone == Zone::Field && self.slot.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideState {
    pub side: SideId,
    pub name: String,
    pub life_points: i32,
    /// Index 0 is the top of the draw pile.
    #[serde(default)]
    pub deck: Vec<InstanceId>,
    #[serde(default)]
    pub hand: Vec<InstanceId>,
    #[serde(default)]
    pub field: BTreeMap<FieldSlot, InstanceId>,
    #[serde(default)]
    pub discard: Vec<InstanceId>,
    #[serde(default)]
    pub removed: Vec<InstanceId>,
    #[serde(default)]
    pub flags: SideTurnFlags,
    /// Cards that must still be discarded before the end phase can be left.
    #[serde(default)]
    pub pending_discards: usize,
}

impl SideState {
    pub fn new(side: SideId, name: impl Into<String>, life_points: i32) -> Self {
        Self {
            side,
            name: name.into(),
            life_points,
            deck: Vec::new(),
            hand: Vec::new(),
            field: BTreeMap::new(),
            discard: Vec::new(),
            removed: Vec::new(),
            flags: SideTurnFlags::default(),
            pending_discards: 0,
        }
    }

    pub fn field_instances(&self) -> Vec<InstanceId> {
        self.field.values().copied().collect()
    }

    pub fn empty_slots(&self, slot_count: u8) -> Vec<FieldSlot> {
        FieldSlot::all(slot_count)
            .filter(|slot| !self.field.contains_key(slot))
            .collect()
    }

    pub fn remove_from_hand(&mut self, instance_id: InstanceId) -> bool {
        match self.hand.iter().position(|id| *id == instance_id) {
            Some(pos) => {
                self.hand.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sides {
    pub player_one: SideState,
    pub player_two: SideState,
}

impl Sides {
    pub fn get(&self, side: SideId) -> &SideState {
        match side {
            SideId::PlayerOne => &self.player_one,
            SideId::PlayerTwo => &self.player_two,
        }
    }

    pub fn get_mut(&mut self, side: SideId) -> &mut SideState {
        match side {
            SideId::PlayerOne => &mut self.player_one,
            SideId::PlayerTwo => &mut self.player_two,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SideState> {
        [&self.player_one, &self.player_two].into_iter()
    }
}

/// Effect waiting on the last-in-first-out resolution stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingEffect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<InstanceId>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DuelEvent {
    DuelStarted {
        first: SideId,
    },
    PhaseEntered {
        phase: Phase,
    },
    TurnStarted {
        turn: u32,
    },
    CardDrawn {
        instance_id: InstanceId,
        card_id: CardId,
    },
    DiscardRequired {
        count: usize,
    },
    CardDiscarded {
        instance_id: InstanceId,
        card_id: CardId,
    },
    Tributed {
        instance_id: InstanceId,
        card_id: CardId,
    },
    NormalSummoned {
        instance_id: InstanceId,
        card_id: CardId,
        slot: FieldSlot,
        stance: Stance,
        level: u8,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tributes: Vec<InstanceId>,
    },
    CreatureSet {
        instance_id: InstanceId,
        card_id: CardId,
        slot: FieldSlot,
    },
    FlipSummoned {
        instance_id: InstanceId,
        card_id: CardId,
        attack: u32,
        defense: u32,
    },
    StanceChanged {
        instance_id: InstanceId,
        from: Stance,
        to: Stance,
    },
    AttackForgone {
        instance_id: InstanceId,
    },
    Battle {
        report: BattleReport,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub sequence: u64,
    pub turn: u32,
    pub phase: Phase,
    pub side: SideId,
    pub timestamp: u64,
    pub description: String,
    pub event: DuelEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityError {
    #[error("instance {instance_id} is listed more than once")]
    DuplicateInstance { instance_id: InstanceId },
    #[error("instance {instance_id} is listed but unknown")]
    UnknownInstance { instance_id: InstanceId },
    #[error("instance {instance_id} is not listed in any zone")]
    OrphanInstance { instance_id: InstanceId },
    #[error("instance {instance_id} is listed under {listed:?} but records {recorded:?}")]
    ZoneMismatch {
        instance_id: InstanceId,
        listed: Zone,
        recorded: Zone,
    },
    #[error("instance {instance_id} is listed by {listed} but owned by {owner}")]
    OwnerMismatch {
        instance_id: InstanceId,
        listed: SideId,
        owner: SideId,
    },
    #[error("slot {slot} of {side} disagrees with its occupant")]
    SlotMismatch { side: SideId, slot: FieldSlot },
    #[error("{side} is recorded under the wrong key")]
    SideMismatch { side: SideId },
    #[error("a winner is recorded but the duel is not finished")]
    StatusMismatch,
}

/// Outcome of checking both life totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DuelResult {
    Winner { side: SideId },
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelState {
    pub game_id: String,
    pub sides: Sides,
    #[serde(default)]
    pub instances: BTreeMap<InstanceId, CardInstance>,
    pub current_side: SideId,
    pub starting_side: SideId,
    pub phase: Phase,
    pub turn: u32,
    pub status: DuelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<SideId>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain_stack: Vec<PendingEffect>,
    #[serde(default)]
    pub next_instance_id: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

impl DuelState {
    /// Empty duel in `waiting` status; decks are dealt by the setup step.
    pub fn new(game_id: impl Into<String>, config: &DuelConfig) -> Self {
        let now = now_millis();
        Self {
            game_id: game_id.into(),
            sides: Sides {
                player_one: SideState::new(
                    SideId::PlayerOne,
                    config.player_one_name.clone(),
                    config.starting_life,
                ),
                player_two: SideState::new(
                    SideId::PlayerTwo,
                    config.player_two_name.clone(),
                    config.starting_life,
                ),
            },
            instances: BTreeMap::new(),
            current_side: SideId::PlayerOne,
            starting_side: SideId::PlayerOne,
            phase: Phase::Draw,
            turn: 1,
            status: DuelStatus::Waiting,
            winner: None,
            log: Vec::new(),
            chain_stack: Vec::new(),
            next_instance_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn side(&self, side: SideId) -> &SideState {
        self.sides.get(side)
    }

    pub fn side_mut(&mut self, side: SideId) -> &mut SideState {
        self.sides.get_mut(side)
    }

    pub fn instance(&self, instance_id: InstanceId) -> Option<&CardInstance> {
        self.instances.get(&instance_id)
    }

    pub fn instance_mut(&mut self, instance_id: InstanceId) -> Option<&mut CardInstance> {
        self.instances.get_mut(&instance_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == DuelStatus::Active
    }

    pub fn is_finished(&self) -> bool {
        self.status == DuelStatus::Finished
    }

    /// Registers a fresh instance. The caller places its id into a zone list.
    pub fn create_instance(&mut self, card_id: impl Into<CardId>, owner: SideId, zone: Zone) -> InstanceId {
        let instance_id = InstanceId(self.next_instance_id);
        self.next_instance_id += 1;
        self.instances
            .insert(instance_id, CardInstance::new(instance_id, card_id, owner, zone));
        instance_id
    }

    /// Instances on `side`'s creature slots, skipping any flagged destroyed.
    pub fn field_creatures(&self, side: SideId) -> Vec<InstanceId> {
        self.side(side)
            .field
            .values()
            .copied()
            .filter(|id| self.instance(*id).map_or(false, |instance| !instance.destroyed))
            .collect()
    }

    /// First hand instance of `side` backed by `card_id`.
    pub fn find_in_hand(&self, side: SideId, card_id: &str) -> Option<InstanceId> {
        self.side(side).hand.iter().copied().find(|id| {
            self.instance(*id)
                .map_or(false, |instance| instance.card_id == card_id)
        })
    }

    /// Moves a field instance to its owner's discard pile and frees its slot.
    pub fn send_to_discard(&mut self, instance_id: InstanceId, destroyed: bool) {
        let Some(instance) = self.instances.get_mut(&instance_id) else {
            return;
        };
        let owner = instance.owner;
        let slot = instance.slot.take();
        instance.zone = Zone::Discard;
        instance.stance = None;
        instance.face_up = true;
        instance.destroyed = destroyed;

        let side = self.sides.get_mut(owner);
        if let Some(slot) = slot {
            if side.field.get(&slot) == Some(&instance_id) {
                side.field.remove(&slot);
            }
        }
        side.discard.push(instance_id);
    }

    pub fn draw_card(&mut self, side: SideId) -> Option<InstanceId> {
        let state = self.sides.get_mut(side);
        if state.deck.is_empty() {
            return None;
        }
        let instance_id = state.deck.remove(0);
        state.hand.push(instance_id);
        if let Some(instance) = self.instances.get_mut(&instance_id) {
            instance.zone = Zone::Hand;
        }
        Some(instance_id)
    }

    /// May go below zero until settled.
    pub fn damage(&mut self, side: SideId, amount: u32) {
        let state = self.sides.get_mut(side);
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        state.life_points = state.life_points.saturating_sub(amount);
    }

    /// Ends the duel if a life total reached zero, then clamps totals at zero.
    pub fn settle_life_points(&mut self) -> Option<DuelResult> {
        let one_out = self.sides.player_one.life_points <= 0;
        let two_out = self.sides.player_two.life_points <= 0;
        let result = match (one_out, two_out) {
            (false, false) => return None,
            (true, true) => DuelResult::Draw,
            (true, false) => DuelResult::Winner {
                side: SideId::PlayerTwo,
            },
            (false, true) => DuelResult::Winner {
                side: SideId::PlayerOne,
            },
        };
        for side in SideId::ALL {
            let state = self.sides.get_mut(side);
            state.life_points = state.life_points.max(0);
        }
        self.status = DuelStatus::Finished;
        self.winner = match result {
            DuelResult::Winner { side } => Some(side),
            DuelResult::Draw => None,
        };
        tracing::info!(game_id = %self.game_id, ?result, "duel finished");
        Some(result)
    }

    pub fn record(&mut self, side: SideId, event: DuelEvent, description: impl Into<String>) {
        let timestamp = now_millis();
        let sequence = self.log.last().map_or(1, |entry| entry.sequence + 1);
        self.log.push(LogEntry {
            sequence,
            turn: self.turn,
            phase: self.phase,
            side,
            timestamp,
            description: description.into(),
            event,
        });
        self.updated_at = timestamp;
    }

    /// Checks that every instance sits in exactly one zone of its owner, as it records.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.winner.is_some() && self.status != DuelStatus::Finished {
            return Err(IntegrityError::StatusMismatch);
        }

        let mut seen = HashSet::new();
        for side_id in SideId::ALL {
            let side = self.side(side_id);
            if side.side != side_id {
                return Err(IntegrityError::SideMismatch { side: side_id });
            }

            let listed = [
                (Zone::Deck, &side.deck),
                (Zone::Hand, &side.hand),
                (Zone::Discard, &side.discard),
                (Zone::Removed, &side.removed),
            ];
            let field: Vec<InstanceId> = side.field_instances();
            for (zone, ids) in listed.into_iter().chain([(Zone::Field, &field)]) {
                for instance_id in ids {
                    let instance = self
                        .instance(*instance_id)
                        .ok_or(IntegrityError::UnknownInstance {
                            instance_id: *instance_id,
                        })?;
                    if !seen.insert(*instance_id) {
                        return Err(IntegrityError::DuplicateInstance {
                            instance_id: *instance_id,
                        });
                    }
                    if instance.zone != zone {
                        return Err(IntegrityError::ZoneMismatch {
                            instance_id: *instance_id,
                            listed: zone,
                            recorded: instance.zone,
                        });
                    }
                    if instance.owner != side_id {
                        return Err(IntegrityError::OwnerMismatch {
                            instance_id: *instance_id,
                            listed: side_id,
                            owner: instance.owner,
                        });
                    }
                }
            }

            for (slot, instance_id) in &side.field {
                let matches = self
                    .instance(*instance_id)
                    .map_or(false, |instance| instance.slot == Some(*slot));
                if !matches {
                    return Err(IntegrityError::SlotMismatch {
                        side: side_id,
                        slot: *slot,
                    });
                }
            }
        }

        if let Some(orphan) = self.instances.keys().find(|id| !seen.contains(*id)) {
            return Err(IntegrityError::OrphanInstance {
                instance_id: *orphan,
            });
        }
        Ok(())
    }

    /// Copy of the duel without its log, for trial moves.
    pub fn without_log(&self) -> DuelState {
        DuelState {
            game_id: self.game_id.clone(),
            sides: self.sides.clone(),
            instances: self.instances.clone(),
            current_side: self.current_side,
            starting_side: self.starting_side,
            phase: self.phase,
            turn: self.turn,
            status: self.status,
            winner: self.winner,
            log: Vec::new(),
            chain_stack: self.chain_stack.clone(),
            next_instance_id: self.next_instance_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn owned_count(&self, side: SideId) -> usize {
        self.instances
            .values()
            .filter(|instance| instance.owner == side)
            .count()
    }

    pub fn summary(&self) -> DuelSummary {
        DuelSummary {
            game_id: self.game_id.clone(),
            turn: self.turn,
            phase: self.phase,
            current_side: self.current_side,
            status: self.status,
            winner: self.winner,
            sides: self
                .sides
                .iter()
                .map(|side| SideSummary {
                    side: side.side,
                    name: side.name.clone(),
                    life_points: side.life_points,
                    hand_size: side.hand.len(),
                    deck_size: side.deck.len(),
                    field_creatures: self.field_creatures(side.side).len(),
                    discard_size: side.discard.len(),
                })
                .collect(),
        }
    }
}

/// Read-only projection for rendering layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelSummary {
    pub game_id: String,
    pub turn: u32,
    pub phase: Phase,
    pub current_side: SideId,
    pub status: DuelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<SideId>,
    pub sides: Vec<SideSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideSummary {
    pub side: SideId,
    pub name: String,
    pub life_points: i32,
    pub hand_size: usize,
    pub deck_size: usize,
    pub field_creatures: usize,
    pub discard_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_hand() -> DuelState {
        let mut state = DuelState::new("test", &DuelConfig::default());
        for card in ["a", "b", "c"] {
            let id = state.create_instance(card, SideId::PlayerOne, Zone::Deck);
            state.side_mut(SideId::PlayerOne).deck.push(id);
        }
        state
    }

    #[test]
    fn phase_order_wraps_at_end() {
        let mut phase = Phase::Draw;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(phase);
            phase = phase.next();
        }
        assert_eq!(
            seen,
            vec![
                Phase::Draw,
                Phase::Standby,
                Phase::Main1,
                Phase::Battle,
                Phase::Main2,
                Phase::End
            ]
        );
        assert_eq!(phase, Phase::Draw);
    }

    #[test]
    fn draw_moves_top_card_into_hand() {
        let mut state = state_with_hand();
        let top = state.side(SideId::PlayerOne).deck[0];
        assert_eq!(state.draw_card(SideId::PlayerOne), Some(top));
        assert_eq!(state.side(SideId::PlayerOne).hand, vec![top]);
        assert_eq!(state.instance(top).map(|i| i.zone), Some(Zone::Hand));
        state.integrity_check().expect("draw keeps the partition");
    }

    #[test]
    fn discard_frees_slot_and_keeps_partition() {
        let mut state = state_with_hand();
        let id = state.side(SideId::PlayerOne).deck[0];
        state.side_mut(SideId::PlayerOne).deck.remove(0);
        state.side_mut(SideId::PlayerOne).field.insert(FieldSlot(2), id);
        if let Some(instance) = state.instance_mut(id) {
            instance.zone = Zone::Field;
            instance.slot = Some(FieldSlot(2));
            instance.stance = Some(Stance::Attack);
        }
        state.integrity_check().expect("placed instance is consistent");

        state.send_to_discard(id, true);
        let side = state.side(SideId::PlayerOne);
        assert!(side.field.is_empty());
        assert_eq!(side.discard, vec![id]);
        let instance = state.instance(id).expect("instance kept");
        assert!(instance.destroyed);
        assert_eq!(instance.slot, None);
        state.integrity_check().expect("discard keeps the partition");
    }

    #[test]
    fn integrity_check_spots_duplicates() {
        let mut state = state_with_hand();
        let id = state.side(SideId::PlayerOne).deck[0];
        state.side_mut(SideId::PlayerOne).hand.push(id);
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::DuplicateInstance { instance_id: id })
        );
    }

    #[test]
    fn simultaneous_zero_is_a_draw() {
        let mut state = state_with_hand();
        state.status = DuelStatus::Active;
        state.damage(SideId::PlayerOne, 9000);
        state.damage(SideId::PlayerTwo, 8000);
        assert_eq!(state.settle_life_points(), Some(DuelResult::Draw));
        assert_eq!(state.winner, None);
        assert!(state.is_finished());
        assert_eq!(state.side(SideId::PlayerOne).life_points, 0);
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = state_with_hand();
        let json = serde_json::to_string(&state).expect("state serializes");
        let back: DuelState = serde_json::from_str(&json).expect("state deserializes");
        assert_eq!(back, state);
    }

    #[test]
    fn oversized_damage_saturates_instead_of_healing() {
        let mut state = DuelState::new("test", &DuelConfig::default());
        state.damage(SideId::PlayerTwo, u32::MAX);
        assert!(state.side(SideId::PlayerTwo).life_points < 0);
        assert_eq!(
            state.settle_life_points(),
            Some(DuelResult::Winner {
                side: SideId::PlayerOne
            })
        );
        assert_eq!(state.side(SideId::PlayerTwo).life_points, 0);
    }
}
