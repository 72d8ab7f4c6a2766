use std::collections::HashMap;

use fabric_types::Platform;

/// Allocate `num_cores` worker slots across all platforms: `floor(N/P)`
/// each, with the remainder handed out one slot at a time to
/// [`Platform::REMAINDER_PRIORITY`] in order.
pub fn allocate(num_cores: usize) -> HashMap<Platform, usize> {
    let platforms = Platform::ALL;
    let base = num_cores / platforms.len();
    let mut remainder = num_cores % platforms.len();

    let mut allocation: HashMap<Platform, usize> = platforms.iter().map(|p| (*p, base)).collect();

    for platform in Platform::REMAINDER_PRIORITY {
        if remainder == 0 {
            break;
        }
        *allocation.get_mut(&platform).expect("priority platform is in ALL") += 1;
        remainder -= 1;
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evenly_divisible_gives_equal_shares() {
        let alloc = allocate(18);
        for p in Platform::ALL {
            assert_eq!(alloc[&p], 2);
        }
    }

    #[test]
    fn remainder_goes_to_priority_platforms_in_order() {
        let alloc = allocate(9 + 3);
        assert_eq!(alloc[&Platform::Facebook], 2);
        assert_eq!(alloc[&Platform::Instagram], 2);
        assert_eq!(alloc[&Platform::TikTok], 2);
        assert_eq!(alloc[&Platform::Line], 1);
        assert_eq!(alloc[&Platform::Twitter], 1);
    }

    #[test]
    fn remainder_beyond_priority_list_is_dropped() {
        let alloc = allocate(9 + 8);
        assert_eq!(alloc[&Platform::Facebook], 2);
        assert_eq!(alloc[&Platform::Instagram], 2);
        assert_eq!(alloc[&Platform::TikTok], 2);
        assert_eq!(alloc[&Platform::Line], 2);
        assert_eq!(alloc[&Platform::Twitter], 1);
        let total: usize = alloc.values().sum();
        assert_eq!(total, 9 + 4);
    }

    #[test]
    fn total_matches_num_cores_when_remainder_fits() {
        let n = 9 + 2;
        let alloc = allocate(n);
        assert_eq!(alloc.values().sum::<usize>(), n);
    }
}
