use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{DisplayState, PriceLevel, Snapshot, TickReport, TopOfBook};

/// Discord rejects nicknames longer than this
pub const MAX_NICKNAME_CHARS: usize = 32;

/// How a quote is rendered into the nickname and status texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFormat {
    pub digits: u32,
    pub suffix: String,
    pub currency: String,
}

impl DisplayFormat {
    pub fn new(digits: u32, suffix: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            digits,
            suffix: suffix.into(),
            currency: currency.into(),
        }
    }

    /// Nickname label, bid first: `"x: $99.00-$101.00"`
    ///
    /// Over the nickname limit the suffix is dropped first, then decimals are
    /// rounded away one at a time. Prices are never cut mid-number.
    pub fn label(&self, bid: &PriceLevel, ask: &PriceLevel) -> String {
        let quote = |digits: u32| {
            format!(
                "x: ${}-${}",
                format_fixed(bid.price, digits),
                format_fixed(ask.price, digits)
            )
        };

        let full = format!("{}{}", self.suffix, quote(self.digits));
        if full.chars().count() <= MAX_NICKNAME_CHARS {
            return full;
        }

        let mut digits = self.digits;
        loop {
            let label = quote(digits);
            if digits == 0 || label.chars().count() <= MAX_NICKNAME_CHARS {
                // digits == 0 and still too long: Discord rejects it and the push is logged
                return label;
            }
            digits -= 1;
        }
    }

    /// Status text: `"USDC | +9.09 %"`
    pub fn status(&self, change_pct: Decimal) -> String {
        format!("{} | {} %", self.currency, format_signed(change_pct))
    }
}

pub fn mid_price(bid: &PriceLevel, ask: &PriceLevel) -> Decimal {
    (ask.price + bid.price) / Decimal::TWO
}

/// Change of `mid` against the baseline, as a percentage of `mid`.
/// `None` when `mid` is zero.
pub fn change_pct(mid: Decimal, baseline: &Snapshot) -> Option<Decimal> {
    (mid - baseline.mid_price)
        .checked_div(mid)
        .map(|ratio| ratio * Decimal::ONE_HUNDRED)
}

/// A new baseline is due when none exists yet or a later UTC day has started
pub fn baseline_due(prior: Option<&Snapshot>, now: DateTime<Utc>) -> bool {
    match prior {
        None => true,
        Some(snapshot) => now.date_naive() > snapshot.date(),
    }
}

/// Derive everything one tick publishes from the prior baseline and a fresh book.
///
/// Returns the baseline to keep after this tick together with the report.
/// The evaluator does no I/O; the monitor pushes whatever the report says.
pub fn evaluate_tick(
    prior: Option<&Snapshot>,
    book: &TopOfBook,
    now: DateTime<Utc>,
    format: &DisplayFormat,
) -> (Option<Snapshot>, TickReport) {
    let Some((bid, ask)) = book.quote() else {
        return (prior.copied(), TickReport::Skipped);
    };

    let mid = mid_price(&bid, &ask);
    let display = DisplayState {
        label: format.label(&bid, &ask),
        change_pct: prior.and_then(|snapshot| change_pct(mid, snapshot)),
    };

    let baseline_replaced = baseline_due(prior, now);
    let next = if baseline_replaced {
        Some(Snapshot::new(now, mid))
    } else {
        prior.copied()
    };

    (
        next,
        TickReport::Published {
            mid_price: mid,
            display,
            baseline_replaced,
        },
    )
}

/// Round half away from zero and pad to exactly `digits` decimals
pub fn format_fixed(value: Decimal, digits: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(digits);
    rounded.to_string()
}

/// Two decimals, sign always shown
pub fn format_signed(value: Decimal) -> String {
    let text = format_fixed(value, 2);
    if text.starts_with('-') {
        if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
            // -0.001 rounds to zero
            return format!("+{}", text.trim_start_matches('-'));
        }
        text
    } else {
        format!("+{}", text)
    }
}
