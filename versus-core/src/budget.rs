/// Size estimates reported to the host.
///
/// None of these drive control flow; they let a UI show "about how many
/// questions are left" before the judge starts.
use crate::constants::REPEAT_FRACTION;

/// Expected number of comparisons to rank `num_items`: `floor(N * log2(N))`.
pub fn comparison_budget(num_items: usize) -> usize {
    if num_items < 2 {
        return 0;
    }
    let n = num_items as f64;
    (n * n.log2()).floor() as usize
}

/// Comparisons reserved for repeats: `ceil(comparison_budget * 0.2)`.
pub fn repeat_budget(num_items: usize) -> usize {
    (comparison_budget(num_items) as f64 * REPEAT_FRACTION).ceil() as usize
}

/// Height of a tree of `size` nodes built by median split.
///
/// Equals `ceil(log2(size + 1))`, which never exceeds `ceil(log2(size)) + 1`.
pub fn balanced_height(size: usize) -> usize {
    let mut height = 0;
    while (1usize << height) <= size {
        height += 1;
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_budget() {
        assert_eq!(comparison_budget(0), 0);
        assert_eq!(comparison_budget(1), 0);
        assert_eq!(comparison_budget(2), 2);
        assert_eq!(comparison_budget(3), 4); // 3 * 1.585 = 4.75
        assert_eq!(comparison_budget(8), 24);
        assert_eq!(comparison_budget(10), 33); // 10 * 3.32
    }

    #[test]
    fn test_repeat_budget() {
        assert_eq!(repeat_budget(2), 1); // ceil(0.4)
        assert_eq!(repeat_budget(8), 5); // ceil(4.8)
        assert_eq!(repeat_budget(10), 7); // ceil(6.6)
    }

    #[test]
    fn test_balanced_height() {
        assert_eq!(balanced_height(0), 0);
        assert_eq!(balanced_height(1), 1);
        assert_eq!(balanced_height(2), 2);
        assert_eq!(balanced_height(3), 2);
        assert_eq!(balanced_height(4), 3);
        assert_eq!(balanced_height(7), 3);
        assert_eq!(balanced_height(8), 4);
    }
}
