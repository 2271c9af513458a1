//! The deposit-to-shares computation.
//!
//! Shares are floored, so the sum of shares never exceeds the deposit and
//! the leftover is returned as an explicit remainder. The engine routes the
//! remainder wholly to the work owner; this module only does the split.

use super::registry::{SplitSet, TOTAL_BPS};

/// Result of splitting one deposit across a split set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Per-entry share, positionally aligned with the split set.
    pub shares: Vec<u64>,
    /// Amount left over after flooring, owed to the work owner.
    pub remainder: u64,
}

impl Distribution {
    /// Total value the distribution accounts for. Always equals the input
    /// amount; money is neither created nor destroyed by rounding.
    pub fn total(&self) -> u64 {
        self.shares.iter().sum::<u64>() + self.remainder
    }
}

/// Split `amount` across `splits` in entry order.
///
/// Each share is `floor(amount * share_bps / 10000)`; the widening to u128
/// makes the multiply exact for any u64 amount. Because the set's shares
/// sum to exactly 10000 bps, the floored shares can never over-distribute
/// and the remainder is always non-negative.
pub fn distribute(amount: u64, splits: &SplitSet) -> Distribution {
    let mut distributed: u64 = 0;
    let shares: Vec<u64> = splits
        .entries()
        .iter()
        .map(|entry| {
            let share =
                (u128::from(amount) * u128::from(entry.share_bps) / u128::from(TOTAL_BPS)) as u64;
            distributed += share;
            share
        })
        .collect();

    Distribution {
        shares,
        remainder: amount - distributed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn split(shares: &[u16]) -> SplitSet {
        let recipients = (1..=shares.len() as u128).map(Uuid::from_u128).collect();
        SplitSet::new(recipients, shares.to_vec()).expect("valid split")
    }

    #[test]
    fn worked_example_seventy_thirty() {
        let set = split(&[7000, 3000]);

        let d = distribute(100, &set);
        assert_eq!(d.shares, vec![70, 30]);
        assert_eq!(d.remainder, 0);

        // One unit floors both shares to zero; everything is remainder.
        let d = distribute(1, &set);
        assert_eq!(d.shares, vec![0, 0]);
        assert_eq!(d.remainder, 1);
    }

    #[test]
    fn conservation_holds_for_awkward_partitions() {
        let partitions: &[&[u16]] = &[
            &[10000],
            &[1, 9999],
            &[3333, 3333, 3334],
            &[1, 1, 1, 9997],
            &[2500, 2500, 2500, 2500],
            &[9999, 1],
            &[0, 10000],
        ];
        let amounts = [1u64, 2, 3, 7, 99, 100, 101, 12345, 1_000_000_007];

        for shares in partitions {
            let set = split(shares);
            for &amount in &amounts {
                let d = distribute(amount, &set);
                assert_eq!(
                    d.total(),
                    amount,
                    "conservation violated for amount {amount} with shares {shares:?}"
                );
            }
        }
    }

    #[test]
    fn conservation_holds_at_u64_max() {
        let set = split(&[3333, 3333, 3334]);
        let d = distribute(u64::MAX, &set);
        assert_eq!(d.total(), u64::MAX);

        let set = split(&[10000]);
        let d = distribute(u64::MAX, &set);
        assert_eq!(d.shares, vec![u64::MAX]);
        assert_eq!(d.remainder, 0);
    }

    #[test]
    fn remainder_never_exceeds_floor_loss() {
        // With n entries, each floor drops < 1 unit of amount/10000 scale;
        // the remainder is bounded by the number of entries.
        let set = split(&[1, 1, 1, 1, 9996]);
        for amount in 1..5000u64 {
            let d = distribute(amount, &set);
            assert!(d.remainder <= set.len() as u64 + 4);
            assert_eq!(d.total(), amount);
        }
    }
}
