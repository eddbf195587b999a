use primitive_types::U256;

/// Average block count per year on the target chain (15s blocks).
pub const BLOCKS_PER_YEAR: u64 = 2_102_400;

/// Digits of a full-precision ether-style fixed point value.
pub const ETHERS_BASE_DIGITS: u32 = 18;

/// Fixed-point digits of one percent: `10^16` raw units equal 1%.
pub const PCT_BASE_DIGITS: u32 = 16;

pub fn pct_base() -> U256 {
    U256::exp10(PCT_BASE_DIGITS as usize)
}
