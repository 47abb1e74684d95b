//! Hit chance and accuracy calculations.

/// Hit chance with equal accuracy and evasion.
pub const BASE_HIT_CHANCE: i32 = 100;
pub const MIN_HIT_CHANCE: i32 = 5;
pub const MAX_HIT_CHANCE: i32 = 100;

/// Calculate hit chance based on accuracy vs evasion.
///
/// # Formula
///
/// ```text
/// hit_chance = base + (accuracy - evasion)
/// clamped to [min, max]
/// ```
///
/// Equal stats always hit; every point of evasion above the attacker's
/// accuracy removes one percent.
pub fn calculate_hit_chance(accuracy: f32, evasion: f32) -> u32 {
    let stat_diff = (accuracy - evasion).round() as i32;
    let hit_chance = BASE_HIT_CHANCE.saturating_add(stat_diff);

    hit_chance.clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE) as u32
}

/// Check if an attack hits based on accuracy, evasion, and a roll in `1..=100`.
///
/// # Arguments
///
/// * `accuracy` - Attacker's accuracy stat
/// * `evasion` - Defender's evasion stat
/// * `roll` - Random roll (1-100)
///
/// # Returns
///
/// `true` if attack hits, `false` if it misses.
pub fn check_hit(accuracy: f32, evasion: f32, roll: u32) -> bool {
    roll <= calculate_hit_chance(accuracy, evasion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_stats_always_hit() {
        assert_eq!(calculate_hit_chance(0.0, 0.0), 100);
        assert!(check_hit(3.0, 3.0, 100));
    }

    #[test]
    fn evasion_lowers_chance_down_to_floor() {
        assert_eq!(calculate_hit_chance(0.0, 30.0), 70);
        assert!(!check_hit(0.0, 30.0, 71));
        assert_eq!(calculate_hit_chance(0.0, 500.0), 5);
        assert_eq!(calculate_hit_chance(50.0, 0.0), 100);
    }
}
