//! Per-token pricing for the models this service is run against.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) USD price per token, or `None` for unknown models.
pub fn model_cost(model: &str) -> Option<(Decimal, Decimal)> {
    // Prices are quoted per million tokens.
    let (input, output) = match model {
        "gpt-4.1" => (dec!(2.00), dec!(8.00)),
        "gpt-4.1-mini" => (dec!(0.40), dec!(1.60)),
        "gpt-4.1-nano" => (dec!(0.10), dec!(0.40)),
        "gpt-4o" => (dec!(2.50), dec!(10.00)),
        "gpt-4o-mini" => (dec!(0.15), dec!(0.60)),
        _ => return None,
    };
    let per_million = dec!(1000000);
    Some((input / per_million, output / per_million))
}
