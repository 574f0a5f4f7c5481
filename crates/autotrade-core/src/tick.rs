//! Exchange tick-size rounding.
//!
//! Valid order prices depend on the price level. Each band applies
//! floor-to-multiple of its tick; every band's lower bound is itself a
//! multiple of the band's tick, so rounding never leaves the band.

use rust_decimal::Decimal;

use crate::decimal::Price;

/// (exclusive upper bound, tick) per band. The last band is unbounded.
const TICK_BANDS: [(Option<i64>, i64); 7] = [
    (Some(2_000), 1),
    (Some(5_000), 5),
    (Some(20_000), 10),
    (Some(50_000), 50),
    (Some(200_000), 100),
    (Some(500_000), 500),
    (None, 1_000),
];

/// Tick size for the band containing `price`.
pub fn tick_size(price: Price) -> Price {
    let value = price.inner();
    let tick = TICK_BANDS
        .iter()
        .find(|(upper, _)| upper.map_or(true, |u| value < Decimal::from(u)))
        .map(|&(_, tick)| tick)
        .unwrap_or(1_000);
    Price::from_units(tick)
}

/// Floor `price` to the nearest valid exchange tick at or below it.
///
/// Non-positive prices round to zero.
pub fn round_to_tick(price: Price) -> Price {
    if !price.is_positive() {
        return Price::ZERO;
    }
    let whole = Price::new(price.inner().floor());
    whole.round_to_tick(tick_size(whole))
}
