use crate::carbon::RegionType;

use super::{BASE_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY, REDUCTION_SENSITIVITY};

/// Difficulty for the block being mined, as a function of its credited
/// reduction `total_reduction`, the chain's slow-moving baseline
/// `reference_reduction`, and the block's primary region type.
///
/// The adjustment decreases with reduction: more credited carbon reduction
/// makes the block cheaper to mine. The region compensation multiplies the
/// discount, so high-irradiance regions earn a smaller one. A block with
/// negative reduction (panels dirtier than the grid) lands above the base
/// difficulty, up to the clamp ceiling.
pub fn dynamic_difficulty(
    total_reduction: f64,
    reference_reduction: f64,
    region: RegionType,
) -> u32 {
    let reduction_factor = if reference_reduction > 0.0 {
        // ratio can dip to zero or below when reduction is strongly
        // negative; floor it to keep ln() finite
        (total_reduction / reference_reduction + 1.0)
            .max(f64::MIN_POSITIVE)
            .ln()
    } else {
        0.0
    };
    let adjustment =
        BASE_DIFFICULTY * (1.0 - REDUCTION_SENSITIVITY * reduction_factor * region.compensation());
    (adjustment.round() as i64).clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_reduction_hits_the_floor() {
        // R = 2000 against R0 = 1000 in a Type II region:
        // ln(3) = 1.0986, adjustment = 4 * (1 - 0.8 * 1.0986) = 0.48 -> floor 2
        assert_eq!(dynamic_difficulty(2000.0, 1000.0, RegionType::TypeII), 2);
    }

    #[test]
    fn negligible_reduction_stays_at_base() {
        // R = 10 against R0 = 1000 in a Type III region:
        // ln(1.01) = 0.00995, adjustment = 3.96 -> 4
        assert_eq!(dynamic_difficulty(10.0, 1000.0, RegionType::TypeIII), 4);
    }

    #[test]
    fn zero_reduction_is_exactly_base() {
        assert_eq!(
            dynamic_difficulty(0.0, 1000.0, RegionType::TypeIII),
            BASE_DIFFICULTY as u32
        );
    }

    #[test]
    fn negative_reduction_raises_difficulty() {
        let d = dynamic_difficulty(-500.0, 1000.0, RegionType::TypeIII);
        assert!(d > BASE_DIFFICULTY as u32);
        assert!(d <= MAX_DIFFICULTY);
    }

    #[test]
    fn plateau_discount_is_smaller_than_lowland() {
        let plateau = dynamic_difficulty(1500.0, 1000.0, RegionType::TypeI);
        let lowland = dynamic_difficulty(1500.0, 1000.0, RegionType::TypeIII);
        assert!(plateau >= lowland);
    }

    #[test]
    fn clamp_holds_across_extremes() {
        for r in [-1e9, -1.0, 0.0, 1.0, 1e9] {
            let d = dynamic_difficulty(r, 1000.0, RegionType::TypeIII);
            assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d));
        }
    }
}
