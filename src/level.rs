//! Random level assignment for new nodes.

use rand::RngCore;

/// Maximum number of levels any node (including the header) can occupy.
pub const MAX_LEVEL: usize = 32;

/// Probability that a node is promoted one more level.
pub const LEVEL_P: f64 = 0.25;

const LEVEL_MASK: u32 = 0xFFFF;
// A 16-bit draw promotes when below 0.25 * 0xFFFF, i.e. at or below this.
const LEVEL_THRESHOLD: u32 = (LEVEL_P * LEVEL_MASK as f64) as u32;

/// Draws a level in `1..=MAX_LEVEL` from a geometric distribution with
/// success probability [`LEVEL_P`] per extra level.
///
/// Each draw consumes 16 random bits per promotion attempt, so the expected
/// level is about 1.33.
#[inline]
pub fn random_level<R: RngCore + ?Sized>(rng: &mut R) -> usize {
    let mut level = 1;
    while level < MAX_LEVEL && (rng.next_u32() & LEVEL_MASK) <= LEVEL_THRESHOLD {
        level += 1;
    }
    level
}
