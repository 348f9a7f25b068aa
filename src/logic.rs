use itertools::Itertools;
use varisat::Lit;

/// No two of `lits` hold: `(!A + !B) * (!A + !C) * ...`, one clause per unordered pair.
pub(crate) fn at_most_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    lits.iter()
        .tuple_combinations()
        .map(|(a, b)| vec![!*a, !*b])
        .collect_vec()
}

/// At least one of `lits` holds, then no two do.
pub(crate) fn exactly_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    let mut clauses = Vec::with_capacity(lits.len() * (lits.len() + 1) / 2 + 1);

    // A + B + C + ...
    clauses.push(lits.to_vec());
    clauses.extend(at_most_one(lits));

    clauses
}

/// `antecedent` implies at least one of `lits`: `!X + A + B + ...`.
///
/// With no `lits` this is the unit clause `!X`.
pub(crate) fn implies_any(antecedent: Lit, lits: &[Lit]) -> Vec<Lit> {
    let mut clause = Vec::with_capacity(1 + lits.len());
    clause.push(!antecedent);
    clause.extend_from_slice(lits);
    clause
}

/// `antecedent` implies no two of `lits`: `(!X + !A + !B) * (!X + !A + !C) * ...`.
pub(crate) fn implies_at_most_one(antecedent: Lit, lits: &[Lit]) -> Vec<Vec<Lit>> {
    lits.iter()
        .tuple_combinations()
        .map(|(a, b)| vec![!antecedent, !*a, !*b])
        .collect_vec()
}

/// Not all of `lits` hold at once.
pub(crate) fn not_all(lits: impl IntoIterator<Item=Lit>) -> Vec<Lit> {
    lits.into_iter().map(|lit| !lit).collect_vec()
}

#[cfg(test)]
mod tests {
    use varisat::Lit;

    use crate::logic::{exactly_one, implies_any, implies_at_most_one, not_all};

    fn lits(dimacs: &[isize]) -> Vec<Lit> {
        dimacs.iter().map(|n| Lit::from_dimacs(*n)).collect()
    }

    #[test]
    fn exactly_one_of_three() {
        assert_eq!(exactly_one(&lits(&[1, 2, 3])), vec![
            lits(&[1, 2, 3]),
            lits(&[-1, -2]),
            lits(&[-1, -3]),
            lits(&[-2, -3]),
        ]);
    }

    #[test]
    fn implications() {
        assert_eq!(implies_any(Lit::from_dimacs(4), &lits(&[1, 2])), lits(&[-4, 1, 2]));
        assert_eq!(implies_any(Lit::from_dimacs(4), &[]), lits(&[-4]));
        assert_eq!(implies_at_most_one(Lit::from_dimacs(4), &lits(&[1, 2, 3])), vec![
            lits(&[-4, -1, -2]),
            lits(&[-4, -1, -3]),
            lits(&[-4, -2, -3]),
        ]);
        assert_eq!(not_all(lits(&[1, 2])), lits(&[-1, -2]));
    }
}
