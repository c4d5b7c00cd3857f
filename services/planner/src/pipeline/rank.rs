use crate::schema::DecisionRow;
use std::cmp::Ordering;

/// All-time lows first, then score descending. Stable, so equal rows keep
/// arrival order.
pub fn rank(mut rows: Vec<DecisionRow>) -> Vec<DecisionRow> {
    rows.sort_by(compare);
    rows
}

fn compare(a: &DecisionRow, b: &DecisionRow) -> Ordering {
    b.is_all_time_low()
        .cmp(&a.is_all_time_low())
        .then_with(|| b.final_score.total_cmp(&a.final_score))
}
