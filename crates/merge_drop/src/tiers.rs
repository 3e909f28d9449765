use bevy::prelude::*;

/// One size class of piece. Two touching pieces of the same tier fuse into the
/// next one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierSpec {
    /// Points awarded when two pieces of this tier merge
    pub score: u32,
    /// Diameter in pixels
    pub size: f32,
    /// Visual key, as 0xRRGGBB
    pub color: u32,
}

impl TierSpec {
    const fn new(score: u32, size: f32, color: u32) -> Self {
        Self { score, size, color }
    }

    pub const fn radius(&self) -> f32 {
        self.size / 2.0
    }

    pub fn color(&self) -> Color {
        let [_, red, green, blue] = self.color.to_be_bytes();
        Color::srgb_u8(red, green, blue)
    }
}

/// Ordered smallest to largest. The last entry is the final tier and never
/// promotes.
pub const TIERS: [TierSpec; 8] = [
    TierSpec::new(10, 50.0, 0xff5733),
    TierSpec::new(20, 75.0, 0x00bfa5),
    TierSpec::new(30, 90.0, 0x6f42c1),
    TierSpec::new(30, 110.0, 0x6f42c1),
    TierSpec::new(50, 140.0, 0x2ecc71),
    TierSpec::new(70, 170.0, 0xffc107),
    TierSpec::new(140, 200.0, 0x3498db),
    TierSpec::new(300, 240.0, 0xd32f2f),
];

/// Fresh drops are drawn from this many of the smallest tiers.
pub const DROP_TIER_COUNT: usize = 4;

pub fn tier_at(index: usize) -> Option<TierSpec> {
    TIERS.get(index).copied()
}

pub const fn tier_count() -> usize {
    TIERS.len()
}

pub const fn is_final_tier(index: usize) -> bool {
    index + 1 == TIERS.len()
}

/// The tier a piece of tier `index` promotes into, `None` for the final tier.
pub fn next_tier(index: usize) -> Option<TierSpec> {
    if index >= TIERS.len() {
        return None;
    }
    tier_at(index + 1)
}

/// Maps a rendered diameter back to its tier.
///
/// Physics reports the size a body is drawn at, which can drift by a fraction
/// of a pixel, so both sides are rounded before comparing.
pub fn tier_matching_size(size: f32) -> Option<usize> {
    let rounded = size.round();
    TIERS
        .iter()
        .position(|tier| (tier.size.round() - rounded).abs() < f32::EPSILON)
}

pub fn random_drop_tier(rng: &mut fastrand::Rng) -> usize {
    rng.usize(..DROP_TIER_COUNT.min(TIERS.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_strictly_increase() {
        for pair in TIERS.windows(2) {
            let [smaller, larger] = pair else {
                continue;
            };
            assert!(
                smaller.size < larger.size,
                "{} should be smaller than {}",
                smaller.size,
                larger.size
            );
        }
    }

    #[test]
    fn size_lookup_tolerates_rounding() {
        assert_eq!(tier_matching_size(50.0), Some(0), "exact size");
        assert_eq!(tier_matching_size(49.6), Some(0), "rounds up");
        assert_eq!(tier_matching_size(75.4), Some(1), "rounds down");
        assert_eq!(tier_matching_size(51.0), None, "no tier is 51px wide");
        assert_eq!(tier_matching_size(240.0), Some(7), "final tier");
    }

    #[test]
    fn final_tier_has_no_successor() {
        let last = tier_count() - 1;
        assert!(is_final_tier(last), "last index is the final tier");
        assert_eq!(next_tier(last), None, "final tier does not promote");
        assert_eq!(next_tier(0), tier_at(1), "tier 0 promotes into tier 1");
        assert_eq!(next_tier(tier_count()), None, "out of range index");
    }

    #[test]
    fn drops_come_from_the_smallest_tiers() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let tier = random_drop_tier(&mut rng);
            assert!(tier < DROP_TIER_COUNT, "tier {tier} is too large to drop");
        }
    }

    #[test]
    fn visual_key_decodes_to_rgb() {
        let Some(first) = tier_at(0) else {
            panic!("catalog is empty");
        };
        assert_eq!(
            first.color().to_srgba(),
            Srgba::rgb_u8(0xff, 0x57, 0x33),
            "0xff5733"
        );
    }
}
