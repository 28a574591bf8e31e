use crate::casemap::config::CasemapConfig;
use crate::casemap::model::{Document, MappingStats, PathMapping, Project};
use crate::casemap::resolver::{Resolution, ResolutionOutcome, Resolver};
use crate::casemap::store::BlobStore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Number of sample filenames carried per project for review exports.
pub const SAMPLE_FILENAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Mapped,
    FallbackMapped,
    Unmapped,
    SkippedNoDocuments,
    SkippedNoFilenames,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
    pub project_id: i64,
    pub project_name: String,
    pub state: ProjectState,
    pub path: Option<String>,
    pub matched_rule: Option<String>,
    pub probes: usize,
    pub probe_failures: usize,
    pub total_documents: usize,
    pub qualifying_documents: usize,
    pub total_size_bytes: i64,
    pub sample_filenames: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub projects_total: usize,
    pub duplicate_projects_ignored: usize,
    pub projects_without_documents: usize,
    pub projects_without_filenames: usize,
    pub projects_considered: usize,
    pub mapped: usize,
    pub fallback_mapped: usize,
    pub unmapped: usize,
    pub documents_total: usize,
    pub documents_qualifying: usize,
    pub probes: usize,
    pub probe_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub mapping: PathMapping,
    pub stats: MappingStats,
    pub run: RunStats,
    pub outcomes: Vec<ProjectOutcome>,
}

impl ReconcileReport {
    /// Every probe was issued and every probe failed. A run like this cannot
    /// be told apart from "nothing matched" by the mapping alone.
    pub fn store_degraded(&self) -> bool {
        self.run.probes > 0 && self.run.probe_failures == self.run.probes
    }

    /// Hex sha256 of the serialised mapping; equal digests mean
    /// byte-identical mappings.
    pub fn digest(&self) -> String {
        mapping_digest(&self.mapping)
    }

    pub fn outcomes_in(&self, state: ProjectState) -> impl Iterator<Item = &ProjectOutcome> {
        self.outcomes.iter().filter(move |o| o.state == state)
    }
}

pub fn mapping_digest(mapping: &PathMapping) -> String {
    // Integer keys and string values always serialise.
    let bytes = serde_json::to_vec(mapping).expect("path mapping serialises to json");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

/// Documents bucketed by project id in a single pass.
#[derive(Debug, Default)]
pub struct DocumentGroups<'d> {
    all: BTreeMap<i64, Vec<&'d Document>>,
    qualifying: BTreeMap<i64, Vec<&'d Document>>,
}

impl<'d> DocumentGroups<'d> {
    pub fn build(documents: &'d [Document]) -> Self {
        let mut groups = Self::default();
        for doc in documents {
            let Some(project_id) = doc.project_id else {
                continue;
            };
            groups.all.entry(project_id).or_default().push(doc);
            if doc.is_qualifying() {
                groups.qualifying.entry(project_id).or_default().push(doc);
            }
        }
        groups
    }

    pub fn all_for(&self, project_id: i64) -> &[&'d Document] {
        self.all.get(&project_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn qualifying_for(&self, project_id: i64) -> &[&'d Document] {
        self.qualifying
            .get(&project_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn qualifying_count(&self) -> usize {
        self.qualifying.values().map(Vec::len).sum()
    }
}

struct WorkItem<'p> {
    slot: usize,
    project: &'p Project,
    filenames: Vec<&'p str>,
}

pub struct Reconciler<'a> {
    store: &'a dyn BlobStore,
    config: &'a CasemapConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn BlobStore, config: &'a CasemapConfig) -> Self {
        Self { store, config }
    }

    pub fn run(&self, projects: &[Project], documents: &[Document]) -> ReconcileReport {
        let groups = DocumentGroups::build(documents);
        let mut run = RunStats {
            documents_total: documents.len(),
            documents_qualifying: groups.qualifying_count(),
            ..RunStats::default()
        };

        let mut seen_ids = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(projects.len());
        let mut work = Vec::new();

        for project in projects {
            if !seen_ids.insert(project.id) {
                run.duplicate_projects_ignored += 1;
                continue;
            }
            let all = groups.all_for(project.id);
            let qualifying = groups.qualifying_for(project.id);
            let state = if all.is_empty() {
                ProjectState::SkippedNoDocuments
            } else if qualifying.is_empty() {
                ProjectState::SkippedNoFilenames
            } else {
                // Resolved below; the placeholder is overwritten.
                ProjectState::Unmapped
            };

            if state == ProjectState::Unmapped {
                work.push(WorkItem {
                    slot: outcomes.len(),
                    project,
                    filenames: qualifying
                        .iter()
                        .filter_map(|d| d.qualifying_filename())
                        .collect(),
                });
            }

            outcomes.push(ProjectOutcome {
                project_id: project.id,
                project_name: project.name.clone(),
                state,
                path: None,
                matched_rule: None,
                probes: 0,
                probe_failures: 0,
                total_documents: all.len(),
                qualifying_documents: qualifying.len(),
                total_size_bytes: qualifying
                    .iter()
                    .filter_map(|d| d.size)
                    .fold(0i64, i64::saturating_add),
                sample_filenames: qualifying
                    .iter()
                    .filter_map(|d| d.qualifying_filename())
                    .take(SAMPLE_FILENAMES)
                    .map(ToOwned::to_owned)
                    .collect(),
            });
        }

        let resolutions = self.resolve_all(&work);

        let mut mapping = PathMapping::new();
        for (item, resolution) in work.iter().zip(resolutions) {
            let outcome = &mut outcomes[item.slot];
            outcome.probes = resolution.probes;
            outcome.probe_failures = resolution.probe_failures;
            run.probes += resolution.probes;
            run.probe_failures += resolution.probe_failures;
            outcome.path = resolution.path().map(ToOwned::to_owned);

            let (state, rule) = match resolution.outcome {
                ResolutionOutcome::Matched { kind, .. } => (ProjectState::Mapped, Some(kind.label())),
                ResolutionOutcome::Fallback { .. } => {
                    (ProjectState::FallbackMapped, Some("fallback".to_string()))
                }
                ResolutionOutcome::Unmapped => (ProjectState::Unmapped, None),
            };
            outcome.state = state;
            outcome.matched_rule = rule;
            if let Some(path) = &outcome.path {
                mapping.insert(item.project.id, path.clone());
            }
        }

        run.projects_total = outcomes.len();
        run.projects_considered = work.len();
        for outcome in &outcomes {
            match outcome.state {
                ProjectState::Mapped => run.mapped += 1,
                ProjectState::FallbackMapped => run.fallback_mapped += 1,
                ProjectState::Unmapped => run.unmapped += 1,
                ProjectState::SkippedNoDocuments => run.projects_without_documents += 1,
                ProjectState::SkippedNoFilenames => run.projects_without_filenames += 1,
            }
        }

        let stats = MappingStats::from_mapping(&mapping);
        info!(
            projects = run.projects_total,
            considered = run.projects_considered,
            mapped = run.mapped,
            fallback_mapped = run.fallback_mapped,
            unmapped = run.unmapped,
            probes = run.probes,
            probe_failures = run.probe_failures,
            unique_paths = stats.unique_paths,
            "reconciliation finished"
        );

        ReconcileReport {
            mapping,
            stats,
            run,
            outcomes,
        }
    }

    /// Resolve every work item, returning results in work order.
    ///
    /// Runs on a pool of `max_concurrent` threads; each thread probes one
    /// project at a time, so in-flight probes never exceed the pool size.
    fn resolve_all(&self, work: &[WorkItem<'_>]) -> Vec<Resolution> {
        let resolver = Resolver::new(self.store, &self.config.layout, &self.config.run);
        let resolve_one =
            |item: &WorkItem<'_>| resolver.resolve(item.project.id, &item.project.name, &item.filenames);

        let workers = self.config.run.max_concurrent.min(work.len());
        if workers <= 1 {
            return work.iter().map(resolve_one).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build();
        match pool {
            Ok(pool) => pool.install(|| work.par_iter().map(resolve_one).collect()),
            Err(err) => {
                warn!(error = %err, "thread pool unavailable; resolving sequentially");
                work.iter().map(resolve_one).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casemap::config::LayoutConfig;
    use crate::casemap::store::ManifestStore;
    use crate::casemap::store::testing::ScriptedStore;

    fn config(max_concurrent: usize) -> CasemapConfig {
        let mut cfg = CasemapConfig {
            layout: LayoutConfig {
                root: "root".to_string(),
                ..LayoutConfig::default()
            },
            ..CasemapConfig::default()
        };
        cfg.run.max_concurrent = max_concurrent;
        cfg
    }

    fn project(id: i64, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
        }
    }

    fn doc(id: i64, project_id: Option<i64>, filename: Option<&str>, size: Option<i64>) -> Document {
        Document {
            id,
            project_id,
            filename: filename.map(ToOwned::to_owned),
            size,
        }
    }

    #[test]
    fn sanitized_scenario_resolves() {
        let store = ManifestStore::from_keys(["root/O'Brien_Case/file.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "O'Brien/Case")],
            &[doc(1, Some(1), Some("file.pdf"), None)],
        );
        assert_eq!(report.mapping.get(&1).map(String::as_str), Some("root/O'Brien_Case"));
        assert_eq!(report.outcomes[0].matched_rule.as_deref(), Some("sanitized"));
    }

    #[test]
    fn bare_key_store_maps_with_default_config() {
        let store = ManifestStore::from_keys(["root/Foo", "root/Foo (1)"]);
        let cfg = CasemapConfig {
            layout: LayoutConfig {
                root: "root".to_string(),
                ..LayoutConfig::default()
            },
            ..CasemapConfig::default()
        };
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[doc(1, Some(1), Some("a.pdf"), None)],
        );
        assert_eq!(report.mapping.get(&1).map(String::as_str), Some("root/Foo"));
        assert_eq!(report.outcomes[0].state, ProjectState::Mapped);
        assert_eq!(report.outcomes[0].matched_rule.as_deref(), Some("raw"));
    }

    #[test]
    fn projects_without_filenames_are_never_probed() {
        let store = ScriptedStore::new(&["root/Empty/a.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Empty"), project(2, "Lonely")],
            &[doc(1, Some(1), Some("  "), Some(5)), doc(2, Some(1), None, None)],
        );

        assert!(store.calls().is_empty());
        assert!(report.mapping.is_empty());
        assert_eq!(report.outcomes[0].state, ProjectState::SkippedNoFilenames);
        assert_eq!(report.outcomes[1].state, ProjectState::SkippedNoDocuments);
        assert_eq!(report.run.projects_without_filenames, 1);
        assert_eq!(report.run.projects_without_documents, 1);
        assert_eq!(report.run.unmapped, 0);
        assert_eq!(report.run.projects_considered, 0);
    }

    #[test]
    fn unmapped_is_counted_not_raised() {
        let store = ManifestStore::from_keys(["root/Other/x.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[doc(1, Some(1), Some("a.pdf"), Some(10))],
        );
        assert!(report.mapping.is_empty());
        assert_eq!(report.run.unmapped, 1);
        assert_eq!(report.outcomes[0].state, ProjectState::Unmapped);
        assert!(!report.store_degraded());
    }

    #[test]
    fn fallback_mapping_is_reported_separately() {
        let store =
            ManifestStore::from_keys(["root/zzz_mailroom_no_project_assigned/a.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[doc(1, Some(1), Some("a.pdf"), None)],
        );
        assert_eq!(
            report.mapping.get(&1).map(String::as_str),
            Some("root/zzz_mailroom_no_project_assigned")
        );
        assert_eq!(report.run.fallback_mapped, 1);
        assert_eq!(report.run.mapped, 0);
    }

    #[test]
    fn every_mapped_project_has_qualifying_documents() {
        let store = ManifestStore::from_keys([
            "root/A/x.pdf",
            "root/B/y.pdf",
            "root/C/z.pdf",
        ]);
        let cfg = config(1);
        let documents = vec![
            doc(1, Some(1), Some("x.pdf"), None),
            doc(2, Some(2), Some(""), None),
            doc(3, None, Some("z.pdf"), None),
        ];
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "A"), project(2, "B"), project(3, "C")],
            &documents,
        );

        assert_eq!(report.mapping.keys().copied().collect::<Vec<_>>(), vec![1]);
        for project_id in report.mapping.keys() {
            assert!(
                documents
                    .iter()
                    .any(|d| d.project_id == Some(*project_id) && d.is_qualifying())
            );
        }
    }

    #[test]
    fn duplicate_folders_collapse_in_stats() {
        let store = ManifestStore::from_keys(["root/Shared/a.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Shared"), project(2, "Shared")],
            &[
                doc(1, Some(1), Some("a.pdf"), None),
                doc(2, Some(2), Some("b.pdf"), None),
            ],
        );
        assert_eq!(report.stats.total_projects_mapped, 2);
        assert_eq!(report.stats.unique_paths, 1);
    }

    #[test]
    fn repeated_project_id_keeps_first_entry() {
        let store = ManifestStore::from_keys(["root/First/a.pdf", "root/Second/a.pdf"]);
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "First"), project(1, "Second")],
            &[doc(1, Some(1), Some("a.pdf"), None)],
        );
        assert_eq!(report.mapping.get(&1).map(String::as_str), Some("root/First"));
        assert_eq!(report.run.duplicate_projects_ignored, 1);
        assert_eq!(report.outcomes.len(), 1);
    }

    #[test]
    fn outage_is_flagged_as_degraded() {
        let store = ScriptedStore::new(&["root/Foo/a.pdf"]).outage();
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[doc(1, Some(1), Some("a.pdf"), None)],
        );
        assert!(report.mapping.is_empty());
        assert!(report.store_degraded());
        assert_eq!(report.run.probe_failures, report.run.probes);
    }

    #[test]
    fn outcome_carries_size_and_samples() {
        let store = ManifestStore::default();
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[
                doc(1, Some(1), Some("a.pdf"), Some(10)),
                doc(2, Some(1), Some("b.pdf"), None),
                doc(3, Some(1), Some("c.pdf"), Some(5)),
                doc(4, Some(1), Some("d.pdf"), Some(1)),
                doc(5, Some(1), None, Some(1000)),
            ],
        );
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.total_documents, 5);
        assert_eq!(outcome.qualifying_documents, 4);
        assert_eq!(outcome.total_size_bytes, 16);
        assert_eq!(outcome.sample_filenames, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn oversized_documents_saturate_total_size() {
        let store = ManifestStore::default();
        let cfg = config(1);
        let report = Reconciler::new(&store, &cfg).run(
            &[project(1, "Foo")],
            &[
                doc(1, Some(1), Some("a.pdf"), Some(i64::MAX)),
                doc(2, Some(1), Some("b.pdf"), Some(i64::MAX)),
            ],
        );
        assert_eq!(report.outcomes[0].total_size_bytes, i64::MAX);
    }

    #[test]
    fn mapping_digest_is_lowercase_sha256_hex() {
        let empty = mapping_digest(&PathMapping::new());
        // sha256 of "{}"
        assert_eq!(
            empty,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );

        let mut mapping = PathMapping::new();
        mapping.insert(1, "root/Foo".to_string());
        let digest = mapping_digest(&mapping);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(digest, empty);
    }

    #[test]
    fn parallel_run_matches_sequential_run() {
        let keys: Vec<String> = (0..40)
            .filter(|i| i % 3 != 0)
            .map(|i| format!("root/Case {i} ({})/doc.pdf", i % 4 + 1))
            .chain(["root/zzz_mailroom_no_project_assigned/doc-0.pdf".to_string()])
            .collect();
        let store = ManifestStore::from_keys(keys);
        let projects: Vec<Project> = (0..40).map(|i| project(i, &format!("Case {i}"))).collect();
        let documents: Vec<Document> = (0..40)
            .map(|i| doc(i, Some(i), Some(&format!("doc-{i}.pdf")), Some(i)))
            .collect();

        let sequential_cfg = config(1);
        let parallel_cfg = config(8);
        let sequential = Reconciler::new(&store, &sequential_cfg).run(&projects, &documents);
        let parallel = Reconciler::new(&store, &parallel_cfg).run(&projects, &documents);

        assert_eq!(sequential.mapping, parallel.mapping);
        assert_eq!(sequential.run, parallel.run);
        assert_eq!(sequential.digest(), parallel.digest());
        assert_eq!(
            sequential.mapping.get(&0).map(String::as_str),
            Some("root/zzz_mailroom_no_project_assigned")
        );
        assert_eq!(
            sequential.mapping.get(&1).map(String::as_str),
            Some("root/Case 1")
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let store = ManifestStore::from_keys(["root/A/x.pdf", "root/B (3)/y.pdf"]);
        let cfg = config(4);
        let projects = [project(2, "B"), project(1, "A"), project(3, "C")];
        let documents = [
            doc(1, Some(1), Some("x.pdf"), None),
            doc(2, Some(2), Some("y.pdf"), None),
            doc(3, Some(3), Some("z.pdf"), None),
        ];
        let first = Reconciler::new(&store, &cfg).run(&projects, &documents);
        let second = Reconciler::new(&store, &cfg).run(&projects, &documents);

        assert_eq!(
            serde_json::to_string(&first.mapping).expect("json"),
            serde_json::to_string(&second.mapping).expect("json")
        );
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.digest(), second.digest());
    }
}
