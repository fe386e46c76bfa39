//! Vector-unit detection and the lane-parallel range predicate.
//!
//! Every kernel answers the same question for a batch of scores: which lanes
//! satisfy `min <= score <= max`. Bit `i` of the returned mask is set when lane
//! `i` is in range. Comparisons are ordered, so a NaN on either side clears the
//! lane exactly like the scalar `>=`/`<=` pair does.

#[cfg(feature = "serde")]
use serde::Serialize;

/// Vector capability used by the batched range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "snake_case"))]
pub enum VectorCapability {
    /// No usable vector unit.
    None,
    /// Two lanes emulated with ordinary comparisons.
    Portable,
    /// x86_64 SSE2, 2 x f64.
    Sse2,
    /// x86_64 AVX, 4 x f64.
    Avx,
    /// aarch64 NEON, 2 x f64.
    Neon,
}

impl VectorCapability {
    /// Best hardware capability of the running CPU.
    #[cfg(target_arch = "x86_64")]
    pub fn detect() -> Self {
        if std::is_x86_feature_detected!("avx") {
            VectorCapability::Avx
        } else {
            // SSE2 is part of the x86_64 baseline.
            VectorCapability::Sse2
        }
    }

    #[cfg(target_arch = "aarch64")]
    pub fn detect() -> Self {
        if std::arch::is_aarch64_feature_detected!("neon") {
            VectorCapability::Neon
        } else {
            VectorCapability::None
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    pub fn detect() -> Self {
        VectorCapability::None
    }

    /// f64 lanes compared per instruction. 1 when there is no vector unit.
    pub fn lanes(self) -> usize {
        match self {
            VectorCapability::None => 1,
            VectorCapability::Portable | VectorCapability::Sse2 | VectorCapability::Neon => 2,
            VectorCapability::Avx => 4,
        }
    }

    /// Whether this is a real vector unit rather than emulation or nothing.
    pub fn is_hardware(self) -> bool {
        matches!(
            self,
            VectorCapability::Sse2 | VectorCapability::Avx | VectorCapability::Neon
        )
    }

    /// Whether kernels for this capability may run on the current CPU.
    pub fn is_supported(self) -> bool {
        match self {
            VectorCapability::None | VectorCapability::Portable => true,
            #[cfg(target_arch = "x86_64")]
            VectorCapability::Sse2 => true,
            #[cfg(target_arch = "x86_64")]
            VectorCapability::Avx => std::is_x86_feature_detected!("avx"),
            #[cfg(target_arch = "aarch64")]
            VectorCapability::Neon => std::arch::is_aarch64_feature_detected!("neon"),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VectorCapability::None => "none",
            VectorCapability::Portable => "portable",
            VectorCapability::Sse2 => "sse2",
            VectorCapability::Avx => "avx",
            VectorCapability::Neon => "neon",
        }
    }
}

impl std::fmt::Display for VectorCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Kernels
// =============================================================================

#[inline]
pub(crate) fn range_mask_portable<const N: usize>(scores: &[f64; N], min: f64, max: f64) -> u32 {
    let mut mask = 0u32;
    for (i, &s) in scores.iter().enumerate() {
        if s >= min && s <= max {
            mask |= 1 << i;
        }
    }
    mask
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn range_mask_sse2(scores: &[f64; 2], min: f64, max: f64) -> u32 {
    use core::arch::x86_64::*;
    // SAFETY: caller guarantees SSE2; the load reads exactly the 2 lanes of `scores`.
    unsafe {
        let v = _mm_loadu_pd(scores.as_ptr());
        let ge = _mm_cmpge_pd(v, _mm_set1_pd(min));
        let le = _mm_cmple_pd(v, _mm_set1_pd(max));
        _mm_movemask_pd(_mm_and_pd(ge, le)) as u32
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
pub(crate) unsafe fn range_mask_avx(scores: &[f64; 4], min: f64, max: f64) -> u32 {
    use core::arch::x86_64::*;
    // SAFETY: caller guarantees AVX; the load reads exactly the 4 lanes of `scores`.
    unsafe {
        let v = _mm256_loadu_pd(scores.as_ptr());
        let ge = _mm256_cmp_pd::<_CMP_GE_OQ>(v, _mm256_set1_pd(min));
        let le = _mm256_cmp_pd::<_CMP_LE_OQ>(v, _mm256_set1_pd(max));
        _mm256_movemask_pd(_mm256_and_pd(ge, le)) as u32
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn range_mask_neon(scores: &[f64; 2], min: f64, max: f64) -> u32 {
    use core::arch::aarch64::*;
    // SAFETY: caller guarantees NEON; the load reads exactly the 2 lanes of `scores`.
    unsafe {
        let v = vld1q_f64(scores.as_ptr());
        let ge = vcgeq_f64(v, vdupq_n_f64(min));
        let le = vcleq_f64(v, vdupq_n_f64(max));
        let m = vandq_u64(ge, le);
        ((vgetq_lane_u64::<0>(m) & 1) | ((vgetq_lane_u64::<1>(m) & 1) << 1)) as u32
    }
}
