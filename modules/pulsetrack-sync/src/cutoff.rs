use crate::scanner::RawEntry;

/// Entries may sit slightly above the first section marker and still belong
/// to the chronological timeline; anything further above is upcoming work.
pub const CUTOFF_TOLERANCE: f64 = 10.0;

/// Vertical boundary between the "upcoming/overdue" block and the
/// chronological timeline: the smallest section-marker offset, or `0.0` when
/// no marker exists (treat everything as past).
pub fn cutoff_position(section_marks: &[f64]) -> f64 {
    let min = section_marks.iter().copied().fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        min
    } else {
        0.0
    }
}

/// Keep only entries belonging to past activity.
///
/// An entry survives when it sits at or below `cutoff - CUTOFF_TOLERANCE`
/// (or when there is no cutoff at all). Entries mentioning "overdue" are
/// forward-looking obligations and are rejected regardless of position.
pub fn retain_past(entries: Vec<RawEntry>, cutoff: f64) -> Vec<RawEntry> {
    entries
        .into_iter()
        .filter(|e| !e.text.to_lowercase().contains("overdue"))
        .filter(|e| cutoff == 0.0 || e.y >= cutoff - CUTOFF_TOLERANCE)
        .collect()
}
