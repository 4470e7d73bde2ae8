//! Opening balances carried from one month into the next.

use crate::model::MonthRecord;
use crate::summary::summarize;

/// The balance the month after `prior` starts with: whatever was left over in `prior`, never less
/// than zero. A month with no prior record starts at zero.
pub fn compute_carry(prior: Option<&MonthRecord>) -> f64 {
    match prior {
        None => 0.0,
        Some(record) => summarize(record).remaining.max(0.0),
    }
}
