//! Move classification.
//!
//! A move is classified by running an ordered list of rules over a [`MoveContext`];
//! the first rule that returns a verdict wins. Every rule is a pure function of the
//! context so client mirrors and the server agree on the outcome.

use freecol_protocol::{
    Direction, MoveType, PlayerId, Position, SettlementId, Stance, UnitId, UnitLocation,
};

use crate::ability::{Ability, AbilitySet};
use crate::combat::settlement_defender;
use crate::cost::move_cost;
use crate::game::GameState;
use crate::map::Tile;
use crate::player::Player;
use crate::rules::CompiledRules;
use crate::settlement::{Settlement, SettlementKind};
use crate::unit::Unit;

/// Everything a rule may look at.
pub struct MoveContext<'a> {
    pub rules: &'a CompiledRules,
    pub state: &'a GameState,
    pub unit_id: UnitId,
    pub unit: &'a Unit,
    pub owner: &'a Player,
    pub abilities: AbilitySet,
    pub naval: bool,
    /// The unit is aboard a carrier rather than standing on the origin tile.
    pub aboard: bool,
    pub from: Position,
    pub target: Position,
    pub target_tile: Option<&'a Tile>,
    pub moves_left: u32,
}

impl MoveContext<'_> {
    fn stance_with(&self, other: PlayerId) -> Stance {
        self.state.stance(self.unit.owner, other)
    }

    /// War, or a unit that attacks regardless of diplomacy.
    fn is_hostile(&self, other: PlayerId) -> bool {
        self.stance_with(other) == Stance::War || self.abilities.has(Ability::Piracy)
    }

    fn is_offensive(&self) -> bool {
        self.unit.is_offensive(self.rules)
    }

    fn may_attack_from_ship(&self) -> bool {
        self.state.options.amphibious_moves || self.abilities.has(Ability::AmphibiousAssault)
    }

    fn target_is_land(&self) -> bool {
        self.target_tile.is_some_and(|t| t.is_land(self.rules))
    }

    /// First foreign unit on the destination tile, in id order.
    fn foreign_occupant(&self) -> Option<&Unit> {
        self.target_tile?
            .units
            .iter()
            .filter_map(|id| self.state.unit(*id))
            .find(|u| u.owner != self.unit.owner)
    }

    fn carrier_with_room(&self, owner: impl Fn(PlayerId) -> bool) -> bool {
        let needed = self.unit.kind(self.rules).space_taken;
        self.target_tile.is_some_and(|tile| {
            tile.units.iter().any(|id| {
                self.state.unit(*id).is_some_and(|u| {
                    owner(u.owner)
                        && u.kind(self.rules).can_carry_units()
                        && self.state.space_left(self.rules, *id) >= needed
                })
            })
        })
    }
}

type Rule = fn(&MoveContext<'_>) -> Option<MoveType>;

const RULES: [(&str, Rule); 9] = [
    ("no_moves", no_moves),
    ("under_repair", under_repair),
    ("not_adjacent", not_adjacent),
    ("off_map", off_map),
    ("land_onto_water", land_onto_water),
    ("naval_onto_land", naval_onto_land),
    ("settlement", settlement),
    ("occupied", occupied),
    ("open_tile", open_tile),
];

/// A classification together with the rule that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveDecision {
    pub move_type: MoveType,
    pub rule: &'static str,
}

/// Classifies a step of `unit` in `direction` from where it currently is.
pub fn classify_move(
    rules: &CompiledRules,
    state: &GameState,
    unit: UnitId,
    direction: Direction,
) -> MoveType {
    explain_move(rules, state, unit, direction).move_type
}

pub fn explain_move(
    rules: &CompiledRules,
    state: &GameState,
    unit: UnitId,
    direction: Direction,
) -> MoveDecision {
    let Some(u) = state.unit(unit) else {
        return decision(MoveType::MoveIllegal, "unknown_unit");
    };
    if u.moves_left == 0 {
        return decision(MoveType::MoveNoMoves, "no_moves");
    }
    let Some(from) = origin(state, u) else {
        return decision(MoveType::MoveNoTile, "not_on_tile");
    };
    explain_move_to(rules, state, unit, from, from.step(direction), u.moves_left)
}

/// Classifies a hypothetical step from `from` to `target` with `moves_left` points.
pub fn classify_move_to(
    rules: &CompiledRules,
    state: &GameState,
    unit: UnitId,
    from: Position,
    target: Position,
    moves_left: u32,
) -> MoveType {
    explain_move_to(rules, state, unit, from, target, moves_left).move_type
}

pub fn explain_move_to(
    rules: &CompiledRules,
    state: &GameState,
    unit_id: UnitId,
    from: Position,
    target: Position,
    moves_left: u32,
) -> MoveDecision {
    let Some(unit) = state.unit(unit_id) else {
        return decision(MoveType::MoveIllegal, "unknown_unit");
    };
    let Some(owner) = state.player(unit.owner) else {
        return decision(MoveType::MoveIllegal, "unknown_owner");
    };
    let ctx = MoveContext {
        rules,
        state,
        unit_id,
        unit,
        owner,
        abilities: unit.abilities(rules, owner),
        naval: unit.is_naval(rules),
        aboard: matches!(unit.location, UnitLocation::Carrier { .. }),
        from,
        target,
        target_tile: state.tile(target),
        moves_left,
    };
    for (name, rule) in RULES {
        if let Some(move_type) = rule(&ctx) {
            return decision(check_cost(&ctx, move_type), name);
        }
    }
    decision(MoveType::MoveIllegal, "unmatched")
}

fn decision(move_type: MoveType, rule: &'static str) -> MoveDecision {
    MoveDecision { move_type, rule }
}

/// Tile a unit moves from: its own tile, or its carrier's when aboard.
pub(crate) fn origin(state: &GameState, unit: &Unit) -> Option<Position> {
    match unit.location {
        UnitLocation::Tile { position } => Some(position),
        UnitLocation::Carrier { carrier } => match state.unit(carrier)?.location {
            UnitLocation::Tile { position } => Some(position),
            _ => None,
        },
        UnitLocation::Settlement { .. } | UnitLocation::Europe | UnitLocation::HighSeas => None,
    }
}

fn check_cost(ctx: &MoveContext<'_>, move_type: MoveType) -> MoveType {
    if !move_type.is_progress() || ctx.target_tile.is_none() {
        return move_type;
    }
    match move_cost(ctx.rules, ctx.state, ctx.unit, ctx.from, ctx.target, ctx.moves_left) {
        Some(cost) if cost > ctx.moves_left => MoveType::MoveNoMoves,
        _ => move_type,
    }
}

fn no_moves(ctx: &MoveContext<'_>) -> Option<MoveType> {
    (ctx.moves_left == 0).then_some(MoveType::MoveNoMoves)
}

fn under_repair(ctx: &MoveContext<'_>) -> Option<MoveType> {
    ctx.unit.is_damaged().then_some(MoveType::MoveNoRepair)
}

fn not_adjacent(ctx: &MoveContext<'_>) -> Option<MoveType> {
    (ctx.from.distance(ctx.target) != 1).then_some(MoveType::MoveIllegal)
}

fn off_map(ctx: &MoveContext<'_>) -> Option<MoveType> {
    if ctx.target_tile.is_some() {
        return None;
    }
    if !ctx.naval {
        return Some(MoveType::MoveIllegal);
    }
    if !ctx.owner.can_move_to_europe() {
        return Some(MoveType::MoveNoEurope);
    }
    let from_high_seas = ctx
        .state
        .tile(ctx.from)
        .is_some_and(|t| t.is_high_seas(ctx.rules));
    Some(if from_high_seas {
        MoveType::MoveHighSeas
    } else {
        MoveType::MoveIllegal
    })
}

fn land_onto_water(ctx: &MoveContext<'_>) -> Option<MoveType> {
    if ctx.naval || ctx.target_is_land() {
        return None;
    }
    if let Some(foreign) = ctx.foreign_occupant() {
        let other = foreign.owner;
        let stance = ctx.stance_with(other);
        if !stance.is_contacted() {
            return Some(MoveType::MoveNoAccessContact);
        }
        if ctx.is_hostile(other) {
            return Some(
                if ctx.is_offensive() && ctx.abilities.has(Ability::AmphibiousAssault) {
                    MoveType::AttackUnit
                } else {
                    MoveType::MoveNoAttackMarine
                },
            );
        }
        if stance.is_friendly() && ctx.carrier_with_room(|p| p == other) {
            return Some(MoveType::Embark);
        }
        if !ctx.carrier_with_room(|p| p == ctx.unit.owner) {
            return Some(MoveType::MoveNoAccessEmbark);
        }
        return Some(MoveType::Embark);
    }
    if ctx.carrier_with_room(|p| p == ctx.unit.owner) {
        return Some(MoveType::Embark);
    }
    let own_carrier = ctx.target_tile.is_some_and(|tile| {
        tile.units.iter().any(|id| {
            ctx.state
                .unit(*id)
                .is_some_and(|u| u.kind(ctx.rules).can_carry_units())
        })
    });
    Some(if own_carrier {
        MoveType::MoveNoAccessFull
    } else {
        MoveType::MoveNoAccessLand
    })
}

fn naval_onto_land(ctx: &MoveContext<'_>) -> Option<MoveType> {
    if !ctx.naval || !ctx.target_is_land() {
        return None;
    }
    if ctx.target_tile.is_some_and(|t| t.settlement.is_some()) {
        return None;
    }
    if let Some(foreign) = ctx.foreign_occupant() {
        if ctx.stance_with(foreign.owner).is_contacted() && ctx.is_hostile(foreign.owner) {
            return Some(MoveType::MoveNoAttackMarine);
        }
    }
    Some(MoveType::MoveNoAccessWater)
}

fn settlement(ctx: &MoveContext<'_>) -> Option<MoveType> {
    let id = ctx.target_tile?.settlement?;
    let Some(settlement) = ctx.state.settlement(id) else {
        return Some(MoveType::MoveIllegal);
    };
    if settlement.owner == ctx.unit.owner {
        return Some(MoveType::Move);
    }
    let stance = ctx.stance_with(settlement.owner);
    if !stance.is_contacted() {
        return Some(MoveType::MoveNoAccessContact);
    }
    let kind = ctx.unit.kind(ctx.rules);
    if ctx.naval || (kind.can_carry_goods() && !kind.person) {
        return Some(trade_move(ctx, settlement, stance));
    }
    Some(match &settlement.kind {
        SettlementKind::Colony { .. } => colony_visit(ctx, id, settlement),
        SettlementKind::Indian(_) => native_visit(ctx, id, settlement, stance),
    })
}

fn trade_move(ctx: &MoveContext<'_>, settlement: &Settlement, stance: Stance) -> MoveType {
    if stance == Stance::War {
        return MoveType::MoveNoAccessWar;
    }
    if settlement.is_colony() {
        if !ctx.abilities.has(Ability::TradeWithForeignColonies) {
            return MoveType::MoveNoAccessTrade;
        }
        if !ctx.unit.has_goods() {
            return MoveType::MoveNoAccessGoods;
        }
        return MoveType::EnterSettlementWithCarrierAndGoods;
    }
    if ctx.unit.has_goods() || ctx.state.options.empty_traders {
        MoveType::EnterSettlementWithCarrierAndGoods
    } else {
        MoveType::MoveNoAccessGoods
    }
}

/// An empty settlement has nobody for combat to resolve against, so it is closed.
fn attack_settlement(ctx: &MoveContext<'_>, id: SettlementId) -> MoveType {
    if settlement_defender(ctx.rules, ctx.state, ctx.unit_id, id).is_none() {
        return MoveType::MoveNoAccessSettlement;
    }
    if ctx.aboard && !ctx.may_attack_from_ship() {
        MoveType::MoveNoAttackMarine
    } else {
        MoveType::AttackSettlement
    }
}

fn colony_visit(ctx: &MoveContext<'_>, id: SettlementId, settlement: &Settlement) -> MoveType {
    if ctx.unit.is_scout(ctx.rules) {
        return MoveType::EnterForeignColonyWithScout;
    }
    if ctx.is_offensive() && ctx.is_hostile(settlement.owner) {
        return attack_settlement(ctx, id);
    }
    MoveType::MoveNoAccessSettlement
}

fn native_visit(
    ctx: &MoveContext<'_>,
    id: SettlementId,
    settlement: &Settlement,
    stance: Stance,
) -> MoveType {
    let Some(indian) = settlement.as_indian() else {
        return MoveType::MoveIllegal;
    };
    let rules = ctx.rules;
    if ctx.unit.is_scout(rules) {
        return MoveType::EnterIndianSettlementWithScout;
    }
    if ctx.unit.is_missionary(rules) {
        let own_mission = indian
            .missionary
            .and_then(|m| ctx.state.unit(m))
            .is_some_and(|m| m.owner == ctx.unit.owner);
        let banned = ctx
            .state
            .player(settlement.owner)
            .is_some_and(|natives| {
                natives.tension_toward(ctx.unit.owner) >= rules.combat.mission_ban_tension
            });
        return if own_mission || banned {
            MoveType::MoveNoAccessMissionBan
        } else {
            MoveType::EnterIndianSettlementWithMissionary
        };
    }
    let colonist = ctx.unit.is_person(rules) && ctx.unit.equipment.is_empty() && !ctx.is_offensive();
    if colonist {
        if stance == Stance::War {
            return MoveType::MoveNoAccessWar;
        }
        return match indian.learnable_skill {
            Some(skill) if ctx.unit.can_learn_from_natives(rules) && skill != ctx.unit.unit_type => {
                MoveType::EnterIndianSettlementWithFreeColonist
            }
            _ => MoveType::MoveNoAccessSkill,
        };
    }
    if ctx.is_offensive() && ctx.is_hostile(settlement.owner) {
        return attack_settlement(ctx, id);
    }
    tracing::trace!(settlement = ?id, "no interaction available");
    MoveType::MoveNoAccessSettlement
}

fn occupied(ctx: &MoveContext<'_>) -> Option<MoveType> {
    let foreign = ctx.foreign_occupant()?;
    let other = foreign.owner;
    if !ctx.stance_with(other).is_contacted() {
        return Some(MoveType::MoveNoAccessContact);
    }
    if ctx.is_hostile(other) {
        if !ctx.is_offensive() {
            return Some(if ctx.naval {
                MoveType::MoveNoAttackMarine
            } else {
                MoveType::MoveNoAttackCivilian
            });
        }
        if ctx.aboard && !ctx.may_attack_from_ship() {
            return Some(MoveType::MoveNoAttackMarine);
        }
        return Some(MoveType::AttackUnit);
    }
    if !ctx.naval && ctx.target_is_land() && foreign.is_naval(ctx.rules) {
        return Some(MoveType::MoveNoAccessBeached);
    }
    Some(MoveType::MoveNoAccessOccupied)
}

fn open_tile(ctx: &MoveContext<'_>) -> Option<MoveType> {
    let tile = ctx.target_tile?;
    if !ctx.naval && tile.lost_city_rumour && ctx.owner.is_european() {
        return Some(MoveType::ExploreLostCityRumour);
    }
    if ctx.naval && tile.is_high_seas(ctx.rules) && ctx.owner.can_move_to_europe() {
        return Some(MoveType::MoveHighSeas);
    }
    Some(MoveType::Move)
}
