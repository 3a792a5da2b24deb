/// Integer average of progress percentages, rounded down.
///
/// An empty learning path has no progress to average and yields 0.
pub fn average_progress(percentages: &[i32]) -> i32 {
    if percentages.is_empty() {
        return 0;
    }
    let total: i64 = percentages.iter().map(|p| i64::from(*p)).sum();
    (total / percentages.len() as i64) as i32
}

/// Merge a partial progress update into the previous (percentage, completed) state.
///
/// An omitted percentage keeps its previous value (0 for a new row).
/// Reaching 100% marks the course completed, and completion is never undone.
pub fn apply_update(
    previous: Option<(i32, bool)>,
    percentage: Option<i32>,
    completed: Option<bool>,
) -> (i32, bool) {
    let (prev_percentage, prev_completed) = previous.unwrap_or((0, false));
    let percentage = percentage.unwrap_or(prev_percentage);
    let completed = prev_completed || completed.unwrap_or(false) || percentage >= 100;
    (percentage, completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_averages_to_zero() {
        assert_eq!(average_progress(&[]), 0);
    }

    #[test]
    fn average_is_floored() {
        assert_eq!(average_progress(&[100, 50, 0]), 50);
        assert_eq!(average_progress(&[100, 0]), 50);
        assert_eq!(average_progress(&[33, 33, 34]), 33);
        assert_eq!(average_progress(&[1, 0, 0]), 0);
    }

    #[test]
    fn single_course_average() {
        assert_eq!(average_progress(&[75]), 75);
    }

    #[test]
    fn new_row_starts_from_zero() {
        assert_eq!(apply_update(None, None, None), (0, false));
        assert_eq!(apply_update(None, Some(40), None), (40, false));
    }

    #[test]
    fn omitted_fields_keep_previous_values() {
        assert_eq!(apply_update(Some((60, false)), None, Some(true)), (60, true));
        assert_eq!(apply_update(Some((60, true)), Some(70), None), (70, true));
    }

    #[test]
    fn full_progress_completes_the_course() {
        assert_eq!(apply_update(Some((90, false)), Some(100), None), (100, true));
        assert_eq!(apply_update(None, Some(100), Some(false)), (100, true));
    }

    #[test]
    fn completion_is_sticky() {
        assert_eq!(apply_update(Some((100, true)), Some(50), Some(false)), (50, true));
    }
}
