//! Tile-count to percentage arithmetic.

/// Percentage reported once every tile of a job is done.
pub const PERCENT_COMPLETE: u8 = 100;

/// `floor(done / total * 100)` in integer arithmetic.
///
/// `done` is clamped to `total`; a zero `total` reports 0.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as u64;
    ((done * u64::from(PERCENT_COMPLETE)) / total as u64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eighteen_tile_sequence() {
        let seq: Vec<u8> = (1..=18).map(|done| percent(done, 18)).collect();
        assert_eq!(
            seq,
            vec![5, 11, 16, 22, 27, 33, 38, 44, 50, 55, 61, 66, 72, 77, 83, 88, 94, 100]
        );
    }

    #[test]
    fn single_tile_jumps_to_complete() {
        assert_eq!(percent(0, 1), 0);
        assert_eq!(percent(1, 1), 100);
    }

    #[test]
    fn zero_total_is_zero() {
        assert_eq!(percent(3, 0), 0);
    }

    #[test]
    fn overshoot_is_clamped() {
        assert_eq!(percent(7, 4), 100);
    }

    #[test]
    fn hundred_only_on_last_tile() {
        for total in 1..=64 {
            for done in 1..total {
                assert!(percent(done, total) < 100, "{done}/{total}");
            }
            assert_eq!(percent(total, total), 100);
        }
    }
}
