//! Typed request/response mapping for every RPC the world exposes (spec.md
//! §4.8 "CommandDispatcher", REDESIGN FLAG: a closed `Command` enum in
//! place of the original per-endpoint dynamic dispatch). `parse_command`
//! turns the wire envelope into one variant; `dispatch` exhaustively
//! matches every variant so adding a command that isn't wired here is a
//! compile error, not a silent 404.

pub mod admin;
pub mod combat_cmds;
pub mod corporation_cmds;
pub mod credits;
pub mod garrison_cmds;
pub mod movement;
pub mod salvage_cmds;
pub mod ship_cmds;
pub mod status;
pub mod subscription_cmds;
pub mod trade;

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::wire::CommandRequest;
use crate::world::World;

pub enum Command {
    Join(status::JoinParams),
    MyStatus(status::MyStatusParams),
    MyMap(status::MyMapParams),
    Move(movement::MoveParams),
    PlotCourse(movement::PlotCourseParams),
    Trade(trade::TradeParams),
    RechargeWarpPower(trade::RechargeWarpPowerParams),
    PurchaseFighters(trade::PurchaseFightersParams),
    DumpCargo(trade::DumpCargoParams),
    TransferCredits(credits::TransferCreditsParams),
    TransferWarpPower(credits::TransferWarpPowerParams),
    BankTransfer(credits::BankTransferParams),
    SalvageCollect(salvage_cmds::SalvageCollectParams),
    CombatInitiate(combat_cmds::CombatInitiateParams),
    CombatAction(combat_cmds::CombatActionParams),
    CombatLeaveFighters(garrison_cmds::CombatLeaveFightersParams),
    CombatCollectFighters(garrison_cmds::CombatCollectFightersParams),
    CombatSetGarrisonMode(garrison_cmds::CombatSetGarrisonModeParams),
    CorporationCreate(corporation_cmds::CorporationCreateParams),
    CorporationJoin(corporation_cmds::CorporationJoinParams),
    CorporationLeave(corporation_cmds::CorporationLeaveParams),
    CorporationKick(corporation_cmds::CorporationKickParams),
    CorporationDisband(corporation_cmds::CorporationDisbandParams),
    CorporationRegenerateInviteCode(corporation_cmds::CorporationRegenerateInviteParams),
    CorporationShipPurchase(corporation_cmds::CorporationShipPurchaseParams),
    ShipPurchase(ship_cmds::ShipPurchaseParams),
    PauseEventDelivery(subscription_cmds::PauseEventDeliveryParams),
    ResumeEventDelivery(subscription_cmds::ResumeEventDeliveryParams),
    EventQuery(subscription_cmds::EventQueryParams),
    AdminTerminateCombat(admin::AdminTerminateCombatParams),
    #[cfg(feature = "test-reset")]
    TestReset(admin::TestResetParams),
}

/// Parses `request.command` + `request.payload` into a `Command`. Unknown
/// command names are a `Validation` error (spec.md §7: malformed requests
/// map to 400), not a panic.
pub fn parse_command(request: &CommandRequest) -> CoreResult<Command> {
    let payload = request.payload.clone();
    let from = |v: Value| -> CoreResult<_> { serde_json::from_value(v).map_err(|e| CoreError::TypeViolation(e.to_string())) };

    Ok(match request.command.as_str() {
        "join" => Command::Join(from(payload)?),
        "my_status" => Command::MyStatus(from(payload)?),
        "my_map" => Command::MyMap(from(payload)?),
        "move" => Command::Move(from(payload)?),
        "plot_course" => Command::PlotCourse(from(payload)?),
        "trade" => Command::Trade(from(payload)?),
        "recharge_warp_power" => Command::RechargeWarpPower(from(payload)?),
        "purchase_fighters" => Command::PurchaseFighters(from(payload)?),
        "dump_cargo" => Command::DumpCargo(from(payload)?),
        "transfer_credits" => Command::TransferCredits(from(payload)?),
        "transfer_warp_power" => Command::TransferWarpPower(from(payload)?),
        "bank_transfer" => Command::BankTransfer(from(payload)?),
        "salvage_collect" => Command::SalvageCollect(from(payload)?),
        "combat_initiate" => Command::CombatInitiate(from(payload)?),
        "combat_action" => Command::CombatAction(from(payload)?),
        "combat_leave_fighters" => Command::CombatLeaveFighters(from(payload)?),
        "combat_collect_fighters" => Command::CombatCollectFighters(from(payload)?),
        "combat_set_garrison_mode" => Command::CombatSetGarrisonMode(from(payload)?),
        "corporation_create" => Command::CorporationCreate(from(payload)?),
        "corporation_join" => Command::CorporationJoin(from(payload)?),
        "corporation_leave" => Command::CorporationLeave(from(payload)?),
        "corporation_kick" => Command::CorporationKick(from(payload)?),
        "corporation_disband" => Command::CorporationDisband(from(payload)?),
        "corporation_regenerate_invite_code" => Command::CorporationRegenerateInviteCode(from(payload)?),
        "corporation_ship_purchase" => Command::CorporationShipPurchase(from(payload)?),
        "ship_purchase" => Command::ShipPurchase(from(payload)?),
        "pause_event_delivery" => Command::PauseEventDelivery(from(payload)?),
        "resume_event_delivery" => Command::ResumeEventDelivery(from(payload)?),
        "event_query" => Command::EventQuery(from(payload)?),
        "admin_terminate_combat" => Command::AdminTerminateCombat(from(payload)?),
        #[cfg(feature = "test-reset")]
        "test_reset" => Command::TestReset(from(payload)?),
        other => return Err(CoreError::Validation(format!("unknown command '{other}'"))),
    })
}

/// Runs one parsed command against `world`. `subscribe_my_messages` has no
/// variant here — it hands back a live `SubscriberHandle` rather than a
/// JSON value, so the Socket.IO connection handler in `web_api_server`
/// calls `subscription_cmds::subscribe_my_messages` directly instead of
/// going through this generic path.
pub async fn dispatch(world: &World, command: Command) -> CoreResult<Value> {
    match command {
        Command::Join(params) => status::join(world, params).await,
        Command::MyStatus(params) => status::my_status(world, params).await,
        Command::MyMap(params) => status::my_map(world, params).await,
        Command::Move(params) => movement::move_character(world, params).await,
        Command::PlotCourse(params) => movement::plot_course(world, params).await,
        Command::Trade(params) => trade::trade(world, params).await,
        Command::RechargeWarpPower(params) => trade::recharge_warp_power(world, params).await,
        Command::PurchaseFighters(params) => trade::purchase_fighters(world, params).await,
        Command::DumpCargo(params) => trade::dump_cargo(world, params).await,
        Command::TransferCredits(params) => credits::transfer_credits(world, params).await,
        Command::TransferWarpPower(params) => credits::transfer_warp_power(world, params).await,
        Command::BankTransfer(params) => credits::bank_transfer(world, params).await,
        Command::SalvageCollect(params) => salvage_cmds::salvage_collect(world, params).await,
        Command::CombatInitiate(params) => combat_cmds::combat_initiate(world, params).await,
        Command::CombatAction(params) => combat_cmds::combat_action(world, params).await,
        Command::CombatLeaveFighters(params) => garrison_cmds::combat_leave_fighters(world, params).await,
        Command::CombatCollectFighters(params) => garrison_cmds::combat_collect_fighters(world, params).await,
        Command::CombatSetGarrisonMode(params) => garrison_cmds::combat_set_garrison_mode(world, params).await,
        Command::CorporationCreate(params) => corporation_cmds::corporation_create(world, params).await,
        Command::CorporationJoin(params) => corporation_cmds::corporation_join(world, params).await,
        Command::CorporationLeave(params) => corporation_cmds::corporation_leave(world, params).await,
        Command::CorporationKick(params) => corporation_cmds::corporation_kick(world, params).await,
        Command::CorporationDisband(params) => corporation_cmds::corporation_disband(world, params).await,
        Command::CorporationRegenerateInviteCode(params) => corporation_cmds::corporation_regenerate_invite_code(world, params).await,
        Command::CorporationShipPurchase(params) => corporation_cmds::corporation_ship_purchase(world, params).await,
        Command::ShipPurchase(params) => ship_cmds::ship_purchase(world, params).await,
        Command::PauseEventDelivery(params) => subscription_cmds::pause_event_delivery(world, params),
        Command::ResumeEventDelivery(params) => subscription_cmds::resume_event_delivery(world, params),
        Command::EventQuery(params) => subscription_cmds::event_query(world, params).await,
        Command::AdminTerminateCombat(params) => admin::admin_terminate_combat(world, params).await,
        #[cfg(feature = "test-reset")]
        Command::TestReset(params) => admin::test_reset(world, params).await,
    }
}
