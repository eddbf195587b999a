//! Display-side derivation of [`AppState`]: annualized rates and ordering.

use serde::Serialize;
use shared::{
    codec::decimal_u256,
    constants::{pct_base, BLOCKS_PER_YEAR, PCT_BASE_DIGITS},
    domain::{Address, AppState, Policy, PolicyId},
    units::{format_units, parse_units, FormatOptions, UnitsError},
    U256, U512,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyView {
    pub id: PolicyId,
    pub beneficiary: Address,
    #[serde(with = "decimal_u256")]
    pub block_inflation_rate: U256,
    /// Per-block rate in percent, up to four decimals.
    pub block_rate: String,
    /// Annualized percentage with two decimals.
    pub annual_rate: String,
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppView {
    pub policies: Vec<PolicyView>,
    pub is_syncing: bool,
    pub token_symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateNormalizer {
    blocks_per_year: u64,
}

impl Default for RateNormalizer {
    fn default() -> Self {
        Self {
            blocks_per_year: BLOCKS_PER_YEAR,
        }
    }
}

impl RateNormalizer {
    pub fn with_blocks_per_year(blocks_per_year: u64) -> Self {
        Self { blocks_per_year }
    }

    pub fn blocks_per_year(&self) -> u64 {
        self.blocks_per_year
    }

    /// `(rate * blocks_per_year / pct_base) * 100`, two decimals, half-up.
    pub fn annualized_rate(&self, rate: U256) -> String {
        let base = U512::from(pct_base());
        let hundredths = rate.full_mul(U256::from(self.blocks_per_year) * U256::from(10_000u64));
        let mut quotient = hundredths / base;
        let remainder = hundredths % base;
        if remainder + remainder >= base {
            quotient += U512::one();
        }

        let digits = format!("{:0>3}", quotient.to_string());
        let (whole, fraction) = digits.split_at(digits.len() - 2);
        format!("{whole}.{fraction}")
    }

    pub fn view(&self, policy: &Policy) -> PolicyView {
        PolicyView {
            id: policy.id,
            beneficiary: policy.beneficiary,
            block_inflation_rate: policy.block_inflation_rate,
            block_rate: format_units(
                policy.block_inflation_rate,
                &FormatOptions {
                    digits: PCT_BASE_DIGITS,
                    replace_zero_by: "0".into(),
                    truncate_to_decimal_place: Some(4),
                    ..FormatOptions::default()
                },
            ),
            annual_rate: self.annualized_rate(policy.block_inflation_rate),
            executed: policy.executed,
        }
    }

    /// Derive the display model; an absent state normalizes like the initial one.
    pub fn normalize(&self, state: Option<&AppState>) -> AppView {
        let initial = AppState::initial();
        let state = state.unwrap_or(&initial);

        let mut policies: Vec<PolicyView> =
            state.policies.iter().map(|policy| self.view(policy)).collect();
        policies.sort_by(|left, right| right.id.cmp(&left.id));

        AppView {
            policies,
            is_syncing: state.is_syncing,
            token_symbol: state.token_symbol.clone(),
        }
    }
}

/// Convert a human per-block percentage (e.g. `"2.5"`) to the raw contract rate.
pub fn raw_rate_from_percent(percent: &str) -> Result<U256, UnitsError> {
    parse_units(percent, PCT_BASE_DIGITS)
}

#[cfg(test)]
mod tests {
    use shared::H160;

    use super::*;

    fn policy(id: u64, rate: U256) -> Policy {
        Policy {
            id: PolicyId(id),
            beneficiary: H160::repeat_byte(id as u8),
            block_inflation_rate: rate,
            executed: false,
        }
    }

    #[test]
    fn one_percent_per_block_annualizes_with_fixed_constants() {
        let normalizer = RateNormalizer::default();
        assert_eq!(normalizer.annualized_rate(U256::exp10(16)), "210240000.00");
    }

    #[test]
    fn small_rates_keep_two_decimals() {
        let normalizer = RateNormalizer::default();
        assert_eq!(normalizer.annualized_rate(U256::zero()), "0.00");
        // 10^6 * 2_102_400 * 100 / 10^16 = 0.021024 -> 0.02
        assert_eq!(normalizer.annualized_rate(U256::exp10(6)), "0.02");
        // 10^8 -> 2.1024 -> 2.10
        assert_eq!(normalizer.annualized_rate(U256::exp10(8)), "2.10");
    }

    #[test]
    fn rounds_half_up_at_hundredths() {
        let normalizer = RateNormalizer::with_blocks_per_year(1);
        // 5 * 10^11 / 10^16 * 100 = 0.005
        assert_eq!(normalizer.annualized_rate(U256::from(5) * U256::exp10(11)), "0.01");
        assert_eq!(normalizer.annualized_rate(U256::from(4) * U256::exp10(11)), "0.00");
    }

    #[test]
    fn max_rate_does_not_overflow() {
        let normalizer = RateNormalizer::default();
        let rendered = normalizer.annualized_rate(U256::MAX);
        let (whole, fraction) = rendered.split_once('.').expect("decimal point");
        assert_eq!(fraction.len(), 2);
        assert!(whole.len() > 60);
    }

    #[test]
    fn absent_or_empty_state_normalizes_to_empty_list() {
        let normalizer = RateNormalizer::default();
        let absent = normalizer.normalize(None);
        assert!(absent.policies.is_empty());
        assert!(absent.is_syncing);

        let empty = AppState {
            is_syncing: false,
            ..AppState::initial()
        };
        let view = normalizer.normalize(Some(&empty));
        assert!(view.policies.is_empty());
        assert!(!view.is_syncing);
        assert_eq!(normalizer.normalize(Some(&empty)), view);
    }

    #[test]
    fn sorts_by_descending_id() {
        let state = AppState {
            policies: vec![
                policy(2, U256::exp10(16)),
                policy(10, U256::exp10(16)),
                policy(0, U256::exp10(16)),
                policy(7, U256::exp10(16)),
            ],
            is_syncing: false,
            token_symbol: Some("IST".into()),
        };
        let view = RateNormalizer::default().normalize(Some(&state));
        let ids: Vec<u64> = view.policies.iter().map(|policy| policy.id.0).collect();
        assert_eq!(ids, vec![10, 7, 2, 0]);
        assert_eq!(view.token_symbol.as_deref(), Some("IST"));
        // Source order is untouched.
        assert_eq!(state.policies[0].id, PolicyId(2));
    }

    #[test]
    fn view_carries_raw_and_per_block_rates() {
        let rate = U256::from(25) * U256::exp10(14);
        let view = RateNormalizer::default().view(&policy(1, rate));
        assert_eq!(view.block_inflation_rate, rate);
        assert_eq!(view.block_rate, "0.25");
        assert!(!view.executed);

        let zero = RateNormalizer::default().view(&policy(1, U256::zero()));
        assert_eq!(zero.block_rate, "0");
    }

    #[test]
    fn percent_input_converts_to_raw_rate() {
        assert_eq!(raw_rate_from_percent("1").expect("parse"), U256::exp10(16));
        assert_eq!(
            raw_rate_from_percent("2.5").expect("parse"),
            U256::from(25) * U256::exp10(15)
        );
        assert!(raw_rate_from_percent("abc").is_err());
    }
}
