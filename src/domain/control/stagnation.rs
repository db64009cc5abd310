//! Stagnation detection over a process variable history.

/// Whether the last `window` PV samples show less than `threshold` of spread.
///
/// Stateless: looks only at the trailing window. Fewer than `window` samples
/// means not enough data, which is never stagnant.
pub fn detect_stagnation(pv_history: &[f64], threshold: f64, window: usize) -> bool {
    if pv_history.len() < window || window == 0 {
        return false;
    }

    let recent = &pv_history[pv_history.len() - window..];
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);

    (max - min) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_history_is_stagnant() {
        let history = [0.5, 0.51, 0.49, 0.50];
        assert!(detect_stagnation(&history, 0.05, 4));
    }

    #[test]
    fn test_improving_history_is_not_stagnant() {
        let history = [0.1, 0.3, 0.5, 0.9];
        assert!(!detect_stagnation(&history, 0.05, 4));
    }

    #[test]
    fn test_insufficient_samples_never_stagnant() {
        let history = [0.5, 0.5];
        assert!(!detect_stagnation(&history, 0.05, 4));
    }

    #[test]
    fn test_only_trailing_window_counts() {
        // Early movement, flat tail: stagnant on the window.
        let history = [0.0, 0.9, 0.50, 0.51, 0.49, 0.50];
        assert!(detect_stagnation(&history, 0.05, 4));
    }

    #[test]
    fn test_range_equal_to_threshold_is_not_stagnant() {
        // Strict less-than: a spread exactly at the threshold counts as
        // progress.
        let history = [0.50, 0.55];
        assert!(!detect_stagnation(&history, 0.05, 2));
    }
}
