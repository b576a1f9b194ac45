//! Proportional integer-cent allocation with an exact-sum guarantee.

use payloads::UserId;

use crate::money::Cents;

/// Distribute `pool` cents across users in proportion to their weights.
///
/// Largest-remainder method: each user gets the floor of their exact
/// rational share, and the leftover cents go to the largest fractional
/// remainders, ties broken by input order. The output always sums to
/// `pool` exactly, every entry is non-negative, and every input key is
/// present.
pub fn allocate_proportionally(
    weights: &[(UserId, Cents)],
    pool: Cents,
) -> Vec<(UserId, Cents)> {
    let weight_sum: i128 = weights.iter().map(|(_, w)| *w as i128).sum();
    if pool == 0 || weight_sum == 0 {
        return weights.iter().map(|(user_id, _)| (*user_id, 0)).collect();
    }

    let pool_wide = pool as i128;
    let mut out: Vec<(UserId, Cents)> = Vec::with_capacity(weights.len());
    // fractional remainders as numerators over the common denominator
    // weight_sum, so comparisons stay exact
    let mut remainders: Vec<(usize, i128)> =
        Vec::with_capacity(weights.len());
    let mut assigned: i128 = 0;

    for (i, (user_id, weight)) in weights.iter().enumerate() {
        let exact_numerator = pool_wide * (*weight as i128);
        let floor = exact_numerator.div_euclid(weight_sum);
        remainders.push((i, exact_numerator - floor * weight_sum));
        assigned += floor;
        out.push((*user_id, floor as Cents));
    }

    let mut deficit = pool_wide - assigned;
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (index, _) in &remainders {
        if deficit == 0 {
            break;
        }
        out[*index].1 += 1;
        deficit -= 1;
    }

    // exact integer math leaves no slack; push any residual onto the first
    // entry so the pool invariant holds regardless
    if deficit != 0 {
        out[0].1 += deficit as Cents;
    }

    out
}
