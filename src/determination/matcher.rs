//! Context specificity matcher
//!
//! Resolves which configured determination rule applies to an arbitrary
//! combination of contextual dimensions (warehouse, product type, partner
//! type, ...). Rules are ranked by specificity: the number of dimensions
//! their criteria match. These are pure functions over data the caller has
//! already fetched; they never touch storage.

use std::collections::HashSet;

use crate::determination::rules::DeterminationRule;
use crate::types::MatchCriteria;

/// Search key of the catch-all rule with no criteria
pub const DEFAULT_KEY: &str = "default";

/// Build the canonical search key for a set of match criteria.
///
/// Returns `"default"` for empty criteria; otherwise joins the sorted
/// key/value pairs as `"k1:v1|k2:v2"`. The result depends only on the
/// mapping's content, never on insertion order.
pub fn canonical_key(criteria: &MatchCriteria) -> String {
    if criteria.is_empty() {
        return DEFAULT_KEY.to_string();
    }

    criteria
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("|")
}

/// Enumerate every search key a context could match, most specific first.
///
/// For a context of `k` dimensions this produces all `2^k - 1` non-empty
/// subsets in descending order of subset size (lexicographic within a size),
/// followed by the trailing `"default"`. Growth is `O(2^k)`; callers are
/// expected to keep `k` small (in practice <= 4) by configuration
/// discipline — the enumeration is deliberately not capped here.
pub fn candidate_keys(context: &MatchCriteria) -> Vec<String> {
    if context.is_empty() {
        return vec![DEFAULT_KEY.to_string()];
    }

    let keys: Vec<&String> = context.keys().collect();
    let mut candidates = Vec::with_capacity(1 << keys.len());

    for size in (1..=keys.len()).rev() {
        for combo in combinations(&keys, size) {
            let subset: MatchCriteria = combo
                .iter()
                .map(|k| ((*k).clone(), context[*k].clone()))
                .collect();
            candidates.push(canonical_key(&subset));
        }
    }

    candidates.push(DEFAULT_KEY.to_string());
    candidates
}

/// Find the best-matching rule for a context.
///
/// Filters the supplied rules to those whose `search_rule` appears in the
/// context's candidate keys and whose `modifier` matches exactly, then picks
/// the one with the highest priority. Priority equals specificity, so the
/// most specific configured rule wins over more general ones. Ties between
/// rules of equal priority are broken by the lowest rule id; the tie-break
/// is implementation-defined, chosen only for determinism.
pub fn best_rule<'a>(
    rules: &'a [DeterminationRule],
    context: &MatchCriteria,
    modifier: &str,
) -> Option<&'a DeterminationRule> {
    let candidates: HashSet<String> = candidate_keys(context).into_iter().collect();

    rules
        .iter()
        .filter(|rule| rule.modifier == modifier && candidates.contains(rule.search_rule()))
        .fold(None, |best: Option<&DeterminationRule>, rule| match best {
            None => Some(rule),
            Some(b)
                if rule.priority() > b.priority()
                    || (rule.priority() == b.priority() && rule.id < b.id) =>
            {
                Some(rule)
            }
            Some(b) => Some(b),
        })
}

/// All `size`-element combinations of `items`, in lexicographic index order
fn combinations<'a>(items: &[&'a String], size: usize) -> Vec<Vec<&'a String>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size);
    fn recurse<'a>(
        items: &[&'a String],
        size: usize,
        start: usize,
        current: &mut Vec<&'a String>,
        out: &mut Vec<Vec<&'a String>>,
    ) {
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for i in start..items.len() {
            current.push(items[i]);
            recurse(items, size, i + 1, current, out);
            current.pop();
        }
    }
    recurse(items, size, 0, &mut current, &mut out);
    out
}
