use std::collections::HashSet;

use crate::models::StreamingService;

/// Largest catalog whose subsets fit in a `u64` mask
pub const MAX_MASK_SERVICES: usize = 63;

/// A combination of services proposed for ranking
#[derive(Debug, Clone)]
pub struct BundleCandidate<'a> {
    pub services: Vec<&'a StreamingService>,
    pub additional_cost: f64,
}

impl BundleCandidate<'_> {
    /// Sorted, comma-joined service ids; equal for any ordering of the same set
    pub fn canonical_id(&self) -> String {
        canonical_id(self.services.iter().map(|s| s.id.as_str()))
    }
}

/// Canonical identity of a service set
pub fn canonical_id<'s>(ids: impl IntoIterator<Item = &'s str>) -> String {
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(",")
}

/// Collects candidates, keeping the first one generated for each service set
struct CandidateSet<'a> {
    seen: HashSet<String>,
    candidates: Vec<BundleCandidate<'a>>,
}

impl<'a> CandidateSet<'a> {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    fn add(&mut self, services: Vec<&'a StreamingService>, additional_cost: f64) {
        let candidate = BundleCandidate {
            services,
            additional_cost,
        };
        if self.seen.insert(candidate.canonical_id()) {
            self.candidates.push(candidate);
        }
    }
}

/// Generates the bounded candidate sample used for ranking
///
/// In order: current subscriptions alone; subscriptions plus one or two unsubscribed
/// services; every single service; every pair of services. This is deliberately not
/// the power set.
pub fn generate_candidates<'a>(
    all: &'a [StreamingService],
    subscribed_ids: &HashSet<String>,
) -> Vec<BundleCandidate<'a>> {
    let is_subscribed = |s: &StreamingService| subscribed_ids.contains(&s.id);
    let cost_of = |s: &StreamingService| if is_subscribed(s) { 0.0 } else { s.numeric_price };

    let subscribed: Vec<&StreamingService> = all.iter().filter(|s| is_subscribed(s)).collect();
    let non_subscribed: Vec<&StreamingService> =
        all.iter().filter(|s| !is_subscribed(s)).collect();

    let mut set = CandidateSet::new();

    if !subscribed.is_empty() {
        set.add(subscribed.clone(), 0.0);
    }

    for &extra in &non_subscribed {
        let mut services = subscribed.clone();
        services.push(extra);
        set.add(services, extra.numeric_price);
    }

    for (i, &first) in non_subscribed.iter().enumerate() {
        for &second in &non_subscribed[i + 1..] {
            let mut services = subscribed.clone();
            services.push(first);
            services.push(second);
            set.add(services, first.numeric_price + second.numeric_price);
        }
    }

    for service in all {
        set.add(vec![service], cost_of(service));
    }

    for (i, first) in all.iter().enumerate() {
        for second in &all[i + 1..] {
            set.add(vec![first, second], cost_of(first) + cost_of(second));
        }
    }

    tracing::debug!(
        subscribed = subscribed.len(),
        non_subscribed = non_subscribed.len(),
        candidates = set.candidates.len(),
        "Candidate bundles generated"
    );

    set.candidates
}

/// Every non-empty subset of `n` services, as bit masks in increasing order
pub fn non_empty_subsets(n: usize) -> impl Iterator<Item = u64> {
    let n = n.min(MAX_MASK_SERVICES);
    1..(1u64 << n)
}

/// Services selected by a subset mask, in catalog order
pub fn subset_members(mask: u64, services: &[StreamingService]) -> Vec<&StreamingService> {
    services
        .iter()
        .take(MAX_MASK_SERVICES)
        .enumerate()
        .filter(|(j, _)| mask & (1u64 << j) != 0)
        .map(|(_, s)| s)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> Vec<StreamingService> {
        vec![
            StreamingService::new("a", "Alpha", "$10"),
            StreamingService::new("b", "Beta", "$5"),
            StreamingService::new("c", "Gamma", "$7.50"),
        ]
    }

    fn subscribed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ids(candidates: &[BundleCandidate<'_>]) -> Vec<String> {
        candidates.iter().map(|c| c.canonical_id()).collect()
    }

    #[test]
    fn test_canonical_id_is_order_independent() {
        assert_eq!(canonical_id(["b", "a", "c"]), "a,b,c");
        assert_eq!(canonical_id(["c", "b", "a"]), "a,b,c");
    }

    #[test]
    fn test_without_subscriptions_no_subscribed_only_candidate() {
        let all = services();
        let candidates = generate_candidates(&all, &HashSet::new());

        // Singles then pairs; no empty bundle
        assert_eq!(ids(&candidates), vec!["a", "b", "c", "a,b", "a,c", "b,c"]);
        assert!(candidates.iter().all(|c| !c.services.is_empty()));
        assert_eq!(candidates[3].additional_cost, 15.0);
    }

    #[test]
    fn test_with_subscription() {
        let all = services();
        let candidates = generate_candidates(&all, &subscribed(&["a"]));

        assert_eq!(
            ids(&candidates),
            vec!["a", "a,b", "a,c", "a,b,c", "b", "c", "b,c"]
        );
        // Subscribed alone costs nothing extra
        assert_eq!(candidates[0].additional_cost, 0.0);
        // a + b pays only for b
        assert_eq!(candidates[1].additional_cost, 5.0);
        assert_eq!(candidates[3].additional_cost, 12.5);
    }

    #[test]
    fn test_pair_and_plus_one_share_identity() {
        let all = services();
        let candidates = generate_candidates(&all, &subscribed(&["a"]));

        // {a, b} comes from "subscribed + 1" first; the later pair is dropped
        let ab: Vec<&BundleCandidate<'_>> = candidates
            .iter()
            .filter(|c| c.canonical_id() == "a,b")
            .collect();
        assert_eq!(ab.len(), 1);
        assert_eq!(ab[0].additional_cost, 5.0);
    }

    #[test]
    fn test_no_duplicate_members() {
        let all = services();
        for subs in [vec![], vec!["a"], vec!["a", "c"]] {
            for candidate in generate_candidates(&all, &subscribed(&subs)) {
                let unique: HashSet<&str> =
                    candidate.services.iter().map(|s| s.id.as_str()).collect();
                assert_eq!(unique.len(), candidate.services.len());
            }
        }
    }

    #[test]
    fn test_empty_catalog() {
        let candidates = generate_candidates(&[], &HashSet::new());
        assert!(candidates.is_empty());
        assert_eq!(non_empty_subsets(0).count(), 0);
    }

    #[test]
    fn test_subsets() {
        let all = services();
        let masks: Vec<u64> = non_empty_subsets(all.len()).collect();
        assert_eq!(masks.len(), 7);

        let members: Vec<&str> = subset_members(0b101, &all)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(members, vec!["a", "c"]);
    }
}
