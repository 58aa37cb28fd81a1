//! Ranking of active tools for eviction.

use std::collections::BTreeSet;

use toolset_primitives::ToolName;

/// An active tool as seen by the eviction ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvictionCandidate {
    /// Tool name.
    pub name: ToolName,
    /// Successful invocations so far.
    pub usage_frequency: u64,
    /// Display priority. Lower sorts first.
    pub priority: i32,
    /// Tool can never leave the active set.
    pub pinned: bool,
}

/// Returns up to `n` evictable tools, least used first.
///
/// Ties are broken by ascending priority, then by name. Pinned tools and
/// anything in `requested` are never suggested.
#[must_use]
pub fn suggest_eviction<I>(candidates: I, requested: &BTreeSet<ToolName>, n: usize) -> Vec<ToolName>
where
    I: IntoIterator<Item = EvictionCandidate>,
{
    let mut ranked: Vec<EvictionCandidate> = candidates
        .into_iter()
        .filter(|candidate| !candidate.pinned && !requested.contains(&candidate.name))
        .collect();
    ranked.sort_by(|a, b| {
        a.usage_frequency
            .cmp(&b.usage_frequency)
            .then(a.priority.cmp(&b.priority))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.into_iter().take(n).map(|candidate| candidate.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &'static str, usage: u64, priority: i32) -> EvictionCandidate {
        EvictionCandidate {
            name: ToolName::from_static(name),
            usage_frequency: usage,
            priority,
            pinned: false,
        }
    }

    #[test]
    fn least_used_first_then_priority_then_name() {
        let candidates = vec![
            candidate("render-video", 5, 1),
            candidate("list-projects", 0, 2),
            candidate("create-video", 0, 1),
            candidate("preview-composition", 0, 1),
        ];

        let suggested = suggest_eviction(candidates, &BTreeSet::new(), 3);
        let names: Vec<&str> = suggested.iter().map(ToolName::as_str).collect();
        assert_eq!(names, ["create-video", "preview-composition", "list-projects"]);
    }

    #[test]
    fn excludes_pinned_and_requested() {
        let mut pinned = candidate("discover-capabilities", 0, 0);
        pinned.pinned = true;
        let candidates = vec![pinned, candidate("list-renders", 0, 5), candidate("export-project", 1, 5)];
        let requested = BTreeSet::from([ToolName::from_static("list-renders")]);

        let suggested = suggest_eviction(candidates, &requested, 10);
        assert_eq!(suggested, [ToolName::from_static("export-project")]);
    }

    #[test]
    fn zero_suggestions() {
        let suggested = suggest_eviction(vec![candidate("list-renders", 0, 0)], &BTreeSet::new(), 0);
        assert!(suggested.is_empty());
    }
}
