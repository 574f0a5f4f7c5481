//! Request surface of the broker.
//!
//! Every call must return promptly: the engine invokes these from its
//! single event loop. Asynchronous results (ticks, fills, condition hits)
//! arrive separately as `GatewayEvent`s on the event channel.

use autotrade_core::{
    AccountNo, AccountSnapshot, ConditionIndex, OrderAck, PendingOrder, ScreenId, Symbol,
    SymbolLimits, UnfilledRow,
};

use crate::error::GatewayResult;
use crate::event::Tick;

pub trait BrokerGateway: Send {
    /// Establish the session. Failure aborts startup.
    fn connect(&mut self) -> GatewayResult<()>;

    /// Account numbers available to the session.
    fn accounts(&mut self) -> GatewayResult<Vec<AccountNo>>;

    /// Request the saved condition list; answered with
    /// `GatewayEvent::ConditionListLoaded`.
    fn load_conditions(&mut self) -> GatewayResult<()>;

    /// Start realtime condition search. Returns whether the broker accepted it.
    fn send_condition(
        &mut self,
        screen: ScreenId,
        name: &str,
        index: &ConditionIndex,
    ) -> GatewayResult<bool>;

    /// Stop realtime condition search.
    fn stop_condition(
        &mut self,
        screen: ScreenId,
        name: &str,
        index: &ConditionIndex,
    ) -> GatewayResult<()>;

    /// Subscribe to realtime trade ticks for `symbol`.
    fn register_realtime(&mut self, screen: ScreenId, symbol: &Symbol) -> GatewayResult<()>;

    /// Display name of a symbol.
    fn symbol_name(&mut self, symbol: &Symbol) -> GatewayResult<String>;

    fn submit_order(&mut self, order: &PendingOrder) -> GatewayResult<OrderAck>;

    fn request_account_snapshot(
        &mut self,
        screen: ScreenId,
        account: &AccountNo,
    ) -> GatewayResult<AccountSnapshot>;

    fn request_unfilled_orders(
        &mut self,
        screen: ScreenId,
        account: &AccountNo,
    ) -> GatewayResult<Vec<UnfilledRow>>;

    fn request_symbol_limits(
        &mut self,
        screen: ScreenId,
        symbol: &Symbol,
    ) -> GatewayResult<SymbolLimits>;

    /// Observe a tick before the engine processes it. Simulated brokers use
    /// this to mark positions and match resting orders.
    fn observe_tick(&mut self, _tick: &Tick) {}
}
