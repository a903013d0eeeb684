//! Reference resolution
//!
//! Turns a human-typed reference ("PayoutService") into one concrete node.
//! Candidate discovery walks four tiers — exact identifier, exact name,
//! qualified-name suffix, case-insensitive substring — and the winner is
//! chosen from the first non-empty tier. Weaker-tier matches are still
//! collected and reported as rejected alternatives, so callers can show
//! what else the reference could have meant.
//!
//! Strategies are a closed enumeration chosen at construction time; there
//! is no global registry to mutate.

use crate::error::{QueryError, Result};
use crate::graph::{GraphStore, Node};

/// Policy for picking one node when a reference matches several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    /// Raise [`QueryError::AmbiguousNode`] when the winning tier holds
    /// more than one candidate.
    Strict,
    /// Pick deterministically by identifier order. Legacy behavior.
    FirstMatch,
    /// Rank candidates — source over test, shorter path over longer — and
    /// return the top one.
    #[default]
    PreferSource,
    /// Ask a caller-supplied chooser; fall back to `PreferSource` when no
    /// chooser is installed.
    Interactive,
}

/// Candidate discovery tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    ExactId,
    ExactName,
    QualifiedSuffix,
    Substring,
}

impl MatchTier {
    /// Base score for candidates found in this tier.
    fn base_score(self) -> i64 {
        match self {
            MatchTier::ExactId => 400,
            MatchTier::ExactName => 300,
            MatchTier::QualifiedSuffix => 200,
            MatchTier::Substring => 100,
        }
    }
}

/// A scored resolution candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub file_path: Option<String>,
    pub tier: MatchTier,
    pub score: i64,
    pub looks_like_test: bool,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The winning node id.
    pub id: String,
    /// Candidates that were considered and rejected, best first.
    pub alternatives: Vec<Candidate>,
    /// Tier the winner was discovered in.
    pub method: MatchTier,
    /// Whether the reference matched more than one node across all tiers.
    pub was_ambiguous: bool,
}

/// Chooser callback for [`ResolutionStrategy::Interactive`]: receives the
/// ranked candidates, returns the index of the chosen one.
pub type Chooser = dyn Fn(&[Candidate]) -> Option<usize> + Send + Sync;

/// Resolves references against one [`GraphStore`] snapshot.
pub struct NodeResolver<'a> {
    store: &'a GraphStore,
    strategy: ResolutionStrategy,
    chooser: Option<Box<Chooser>>,
}

impl<'a> NodeResolver<'a> {
    pub fn new(store: &'a GraphStore, strategy: ResolutionStrategy) -> Self {
        Self {
            store,
            strategy,
            chooser: None,
        }
    }

    /// Install the chooser consulted under [`ResolutionStrategy::Interactive`].
    pub fn with_chooser(mut self, chooser: Box<Chooser>) -> Self {
        self.chooser = Some(chooser);
        self
    }

    /// Resolve a reference to one node.
    ///
    /// # Errors
    /// [`QueryError::NodeNotFound`] when no tier yields a candidate;
    /// [`QueryError::AmbiguousNode`] when the winning tier is tied under
    /// [`ResolutionStrategy::Strict`].
    pub fn resolve(&self, reference: &str) -> Result<Resolution> {
        let candidates = self.discover(reference)?;
        let was_ambiguous = candidates.len() > 1;

        // The winner comes from the strongest tier that matched.
        let primary_tier = candidates[0].tier;
        let primary_count = candidates
            .iter()
            .filter(|c| c.tier == primary_tier)
            .count();

        let winner_index = match self.strategy {
            ResolutionStrategy::Strict => {
                if primary_count > 1 {
                    return Err(QueryError::AmbiguousNode {
                        reference: reference.to_string(),
                        candidates: candidates.into_iter().map(|c| c.name).collect(),
                    });
                }
                0
            }
            ResolutionStrategy::FirstMatch => candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.tier == primary_tier)
                .min_by(|(_, a), (_, b)| a.id.cmp(&b.id))
                .map(|(i, _)| i)
                .unwrap_or(0),
            ResolutionStrategy::PreferSource => 0,
            ResolutionStrategy::Interactive => self
                .chooser
                .as_ref()
                .and_then(|chooser| chooser(&candidates))
                .filter(|&i| i < candidates.len())
                .unwrap_or(0),
        };

        let mut candidates = candidates;
        let winner = candidates.remove(winner_index);
        tracing::trace!(
            reference,
            winner = %winner.id,
            alternatives = candidates.len(),
            "reference resolved"
        );
        Ok(Resolution {
            id: winner.id,
            method: winner.tier,
            alternatives: candidates,
            was_ambiguous,
        })
    }

    /// Collect candidates across all tiers, ranked best-first. The first
    /// candidate always belongs to the strongest non-empty tier.
    ///
    /// An exact identifier match is precise; it short-circuits discovery.
    fn discover(&self, reference: &str) -> Result<Vec<Candidate>> {
        if let Some(node) = self.store.get(reference) {
            return Ok(vec![candidate(node, MatchTier::ExactId)]);
        }

        fn seen(candidates: &[Candidate], id: &str) -> bool {
            candidates.iter().any(|c| c.id == id)
        }

        let mut candidates: Vec<Candidate> = Vec::new();

        for id in self.store.ids_by_name(reference) {
            if let Some(node) = self.store.get(id) {
                candidates.push(candidate(node, MatchTier::ExactName));
            }
        }

        for node in self.store.nodes() {
            if is_qualified_suffix(&node.qualified_name, reference)
                && !seen(&candidates, &node.id)
            {
                candidates.push(candidate(node, MatchTier::QualifiedSuffix));
            }
        }

        let needle = reference.to_lowercase();
        for node in self.store.nodes() {
            let matched = node.name.to_lowercase().contains(&needle)
                || node.qualified_name.to_lowercase().contains(&needle);
            if matched && !seen(&candidates, &node.id) {
                candidates.push(candidate(node, MatchTier::Substring));
            }
        }

        if candidates.is_empty() {
            return Err(QueryError::NodeNotFound {
                reference: reference.to_string(),
            });
        }

        rank(&mut candidates);
        Ok(candidates)
    }
}

/// Rank candidates best-first: tier, then score descending, then shorter
/// file path, then identifier order for full determinism.
fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| path_len(a).cmp(&path_len(b)))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn path_len(candidate: &Candidate) -> usize {
    candidate.file_path.as_deref().map(str::len).unwrap_or(0)
}

fn candidate(node: &Node, tier: MatchTier) -> Candidate {
    let looks_like_test = node
        .file_path
        .as_deref()
        .map(looks_like_test_path)
        .unwrap_or(false);

    let mut score = tier.base_score();
    if looks_like_test {
        score -= 50;
    }
    // Shallow paths edge out deep ones within a tier.
    if let Some(path) = node.file_path.as_deref() {
        let depth = path.matches('/').count() as i64;
        score -= depth.min(25);
    }

    Candidate {
        id: node.id.clone(),
        name: node.name.clone(),
        file_path: node.file_path.clone(),
        tier,
        score,
        looks_like_test,
    }
}

/// Language-agnostic "looks like a test" classifier over path segments and
/// file name conventions.
fn looks_like_test_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    let segments: Vec<&str> = lowered.split('/').collect();

    if segments
        .iter()
        .any(|s| *s == "__tests__" || *s == "tests" || *s == "test" || *s == "testing")
    {
        return true;
    }

    let file = segments.last().copied().unwrap_or("");
    let stem = file.split('.').next().unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("tests")
        || file.contains(".spec.")
        || file.contains(".test.")
}

/// A reference matches as a qualified-name suffix on separator boundaries:
/// `payout.PayoutService` matches `billing.payout.PayoutService` but
/// `Service` alone does not match it.
fn is_qualified_suffix(qualified_name: &str, reference: &str) -> bool {
    if qualified_name == reference {
        return true;
    }
    qualified_name.ends_with(reference)
        && qualified_name[..qualified_name.len() - reference.len()].ends_with(['.', ':', '/'])
}
