use crate::casemap::candidates::{self, CandidateKind, CandidateSet};
use crate::casemap::config::{LayoutConfig, RunConfig};
use crate::casemap::store::BlobStore;
use crate::error::StoreError;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A name-variant folder exists.
    Matched { path: String, kind: CandidateKind },
    /// No variant exists but sampled documents sit in the catch-all folder.
    Fallback { path: String },
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub probes: usize,
    pub probe_failures: usize,
}

impl Resolution {
    pub fn path(&self) -> Option<&str> {
        match &self.outcome {
            ResolutionOutcome::Matched { path, .. } | ResolutionOutcome::Fallback { path } => {
                Some(path)
            }
            ResolutionOutcome::Unmapped => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProbeTally {
    probes: usize,
    failures: usize,
}

impl ProbeTally {
    // A failed probe counts as "not there" for that probe only.
    fn check(
        &mut self,
        project_id: i64,
        target: &str,
        probe: impl FnOnce() -> Result<bool, StoreError>,
    ) -> bool {
        self.probes += 1;
        match probe() {
            Ok(found) => {
                debug!(project_id, target, found, "probe");
                found
            }
            Err(err) => {
                self.failures += 1;
                warn!(project_id, target, error = %err, "probe failed, treating as miss");
                false
            }
        }
    }
}

pub struct Resolver<'a> {
    store: &'a dyn BlobStore,
    layout: &'a LayoutConfig,
    fallback_sample_size: usize,
    folder_boundary: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn BlobStore, layout: &'a LayoutConfig, run: &RunConfig) -> Self {
        Self {
            store,
            layout,
            fallback_sample_size: run.fallback_sample_size,
            folder_boundary: run.folder_boundary,
        }
    }

    fn probe_prefix(&self, path: &str) -> String {
        if self.folder_boundary {
            format!("{path}/")
        } else {
            path.to_string()
        }
    }

    /// Resolve one project given the filenames of its qualifying documents,
    /// in source order.
    pub fn resolve(&self, project_id: i64, project_name: &str, filenames: &[&str]) -> Resolution {
        let set = candidates::generate(self.layout, project_name);
        self.resolve_candidates(project_id, &set, filenames)
    }

    pub fn resolve_candidates(
        &self,
        project_id: i64,
        set: &CandidateSet,
        filenames: &[&str],
    ) -> Resolution {
        let mut tally = ProbeTally::default();
        debug!(project_id, candidates = set.len(), "resolving");

        // Priority order is the tie-break: stop at the first hit.
        let hit = set.probe_order().find(|candidate| {
            let prefix = self.probe_prefix(&candidate.path);
            tally.check(project_id, &prefix, || self.store.prefix_exists(&prefix))
        });
        if let Some(candidate) = hit {
            return Resolution {
                outcome: ResolutionOutcome::Matched {
                    path: candidate.path.clone(),
                    kind: candidate.kind,
                },
                probes: tally.probes,
                probe_failures: tally.failures,
            };
        }

        let fallback = candidates::fallback_path(self.layout);
        let in_fallback = filenames
            .iter()
            .take(self.fallback_sample_size)
            .any(|filename| {
                let key = format!("{fallback}/{filename}");
                tally.check(project_id, &key, || self.store.object_exists(&key))
            });

        let outcome = if in_fallback {
            ResolutionOutcome::Fallback { path: fallback }
        } else {
            ResolutionOutcome::Unmapped
        };
        Resolution {
            outcome,
            probes: tally.probes,
            probe_failures: tally.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casemap::store::ManifestStore;
    use crate::casemap::store::testing::ScriptedStore;

    fn layout() -> LayoutConfig {
        LayoutConfig {
            root: "root".to_string(),
            ..LayoutConfig::default()
        }
    }

    fn run() -> RunConfig {
        RunConfig::default()
    }

    #[test]
    fn raw_name_beats_numbered_duplicate() {
        let store = ManifestStore::from_keys(["root/Foo/a.pdf", "root/Foo (1)/b.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf"]);
        assert_eq!(got.path(), Some("root/Foo"));
        assert_eq!(got.probes, 1);
    }

    #[test]
    fn stops_probing_after_first_hit() {
        let store = ScriptedStore::new(&["root/Solar - Foo/y.pdf", "root/Solar - PNC Foo/z.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["y.pdf"]);
        assert_eq!(got.path(), Some("root/Solar - Foo"));
        let calls = store.calls();
        assert_eq!(calls.len(), 11);
        assert_eq!(calls[0], "root/Foo");
        assert_eq!(calls[1], "root/Foo (1)");
        assert_eq!(calls.last().map(String::as_str), Some("root/Solar - Foo"));
    }

    #[test]
    fn bare_keys_resolve_to_raw_name_first() {
        let store = ManifestStore::from_keys(["root/Foo", "root/Foo (1)"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf"]);
        assert_eq!(got.path(), Some("root/Foo"));
        assert_eq!(got.probes, 1);
    }

    #[test]
    fn raw_prefix_matches_longer_folder_names() {
        let store = ManifestStore::from_keys(["root/Foo 2019/a.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        assert_eq!(resolver.resolve(1, "Foo", &["a.pdf"]).path(), Some("root/Foo"));
    }

    #[test]
    fn sanitized_form_resolves_when_raw_is_absent() {
        let store = ManifestStore::from_keys(["root/O'Brien_Case/file.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "O'Brien/Case", &["file.pdf"]);
        assert_eq!(
            got.outcome,
            ResolutionOutcome::Matched {
                path: "root/O'Brien_Case".to_string(),
                kind: CandidateKind::Sanitized,
            }
        );
    }

    #[test]
    fn failed_probe_moves_on_to_next_candidate() {
        let store = ScriptedStore::new(&["root/Foo/a.pdf", "root/Foo (1)/a.pdf"])
            .failing_on(&["root/Foo"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf"]);
        assert_eq!(got.path(), Some("root/Foo (1)"));
        assert_eq!(got.probes, 2);
        assert_eq!(got.probe_failures, 1);
    }

    #[test]
    fn fallback_used_when_sampled_file_is_in_mailroom() {
        let store = ScriptedStore::new(&["root/zzz_mailroom_no_project_assigned/b.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(
            got.outcome,
            ResolutionOutcome::Fallback {
                path: "root/zzz_mailroom_no_project_assigned".to_string()
            }
        );
        let calls = store.calls();
        assert!(!calls.contains(&"root/zzz_mailroom_no_project_assigned/".to_string()));
        assert_eq!(
            calls.last().map(String::as_str),
            Some("root/zzz_mailroom_no_project_assigned/b.pdf")
        );
    }

    #[test]
    fn fallback_samples_only_first_files() {
        let store = ScriptedStore::new(&["root/zzz_mailroom_no_project_assigned/d.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);
        assert_eq!(got.outcome, ResolutionOutcome::Unmapped);
        let fallback_probes = store
            .calls()
            .iter()
            .filter(|c| c.starts_with("root/zzz_mailroom_no_project_assigned/"))
            .count();
        assert_eq!(fallback_probes, 3);
    }

    #[test]
    fn unmapped_when_nothing_exists() {
        let store = ManifestStore::from_keys(["root/Other/a.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf"]);
        assert_eq!(got.outcome, ResolutionOutcome::Unmapped);
        assert_eq!(got.path(), None);
        // 12 name variants plus one mailroom object check.
        assert_eq!(got.probes, 13);
        assert_eq!(got.probe_failures, 0);
    }

    #[test]
    fn outage_degrades_to_unmapped_without_panicking() {
        let store = ScriptedStore::new(&["root/Foo/a.pdf"]).outage();
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());

        let got = resolver.resolve(1, "Foo", &["a.pdf"]);
        assert_eq!(got.outcome, ResolutionOutcome::Unmapped);
        assert_eq!(got.probes, got.probe_failures);
    }

    #[test]
    fn folder_boundary_keeps_similar_names_apart() {
        let store = ScriptedStore::new(&["root/Smith v. Jones/a.pdf"]);
        let layout = layout();
        let resolver = Resolver::new(&store, &layout, &run());
        assert_eq!(resolver.resolve(1, "Smith", &["a.pdf"]).path(), Some("root/Smith"));

        let bounded = RunConfig {
            folder_boundary: true,
            ..RunConfig::default()
        };
        let resolver = Resolver::new(&store, &layout, &bounded);
        assert_eq!(resolver.resolve(2, "Smith", &["a.pdf"]).path(), None);
        assert!(store.calls().contains(&"root/Smith/".to_string()));
    }
}
