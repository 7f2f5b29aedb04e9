//! Reward code generation

use carx_core::RewardType;
use rand::Rng;

/// Generate a redeemable reward code: three-letter type prefix plus a
/// five-digit random number, e.g. `DIS-48213`.
///
/// Known limitation: codes are not checked for collisions. The space is
/// 90,000 per prefix and codes are redeemed per user, so duplicates are
/// accepted.
pub fn generate_code(reward_type: RewardType) -> String {
    let number: u32 = rand::thread_rng().gen_range(10_000..100_000);
    format!("{}-{}", reward_type.code_prefix(), number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        for _ in 0..50 {
            let code = generate_code(RewardType::Discount);
            let (prefix, number) = code.split_once('-').unwrap();
            assert_eq!(prefix, "DIS");
            assert_eq!(number.len(), 5);
            let parsed: u32 = number.parse().unwrap();
            assert!((10_000..100_000).contains(&parsed));
        }
    }

    #[test]
    fn test_prefix_follows_type() {
        assert!(generate_code(RewardType::FreeService).starts_with("FRE-"));
        assert!(generate_code(RewardType::VipStatus).starts_with("VIP-"));
    }
}
