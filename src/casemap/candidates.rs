use crate::casemap::config::LayoutConfig;
use crate::casemap::sanitize::sanitize_project_name;
use std::collections::BTreeSet;

/// Highest numbered-duplicate suffix probed (` (1)` .. ` (9)`).
pub const MAX_DUPLICATE_SUFFIX: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Raw,
    Sanitized,
    Numbered { sanitized: bool, n: u8 },
    Prefixed { sanitized: bool, prefix_index: usize },
    Fallback,
}

impl CandidateKind {
    pub fn label(self) -> String {
        let form = |sanitized: bool| if sanitized { "sanitized" } else { "raw" };
        match self {
            Self::Raw => "raw".to_string(),
            Self::Sanitized => "sanitized".to_string(),
            Self::Numbered { sanitized, n } => format!("{}_numbered_{n}", form(sanitized)),
            Self::Prefixed {
                sanitized,
                prefix_index,
            } => format!("{}_prefix_{prefix_index}", form(sanitized)),
            Self::Fallback => "fallback".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub kind: CandidateKind,
}

/// Ordered probe list for one project. Earlier entries win.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Candidates for the main pass, in priority order (fallback excluded).
    pub fn probe_order(&self) -> impl Iterator<Item = &Candidate> {
        self.iter().filter(|c| c.kind != CandidateKind::Fallback)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

pub fn join_root(root: &str, segment: &str) -> String {
    format!("{}/{segment}", root.trim_end_matches('/'))
}

/// Storage prefix of the catch-all folder, e.g. `docs/Acme/zzz_mailroom`.
pub fn fallback_path(layout: &LayoutConfig) -> String {
    join_root(&layout.root, &layout.fallback_folder)
}

/// Build the candidate list for `project_name`.
///
/// Order: raw, sanitized, raw ` (1..9)`, sanitized ` (1..9)`, then each
/// configured prefix applied to raw and sanitized, then the fallback
/// folder. Repeated path strings keep their first position only.
pub fn generate(layout: &LayoutConfig, project_name: &str) -> CandidateSet {
    let sanitized = sanitize_project_name(project_name);
    let mut raw_list: Vec<(String, CandidateKind)> = Vec::new();

    raw_list.push((project_name.to_string(), CandidateKind::Raw));
    raw_list.push((sanitized.clone(), CandidateKind::Sanitized));
    for n in 1..=MAX_DUPLICATE_SUFFIX {
        raw_list.push((
            format!("{project_name} ({n})"),
            CandidateKind::Numbered {
                sanitized: false,
                n,
            },
        ));
    }
    for n in 1..=MAX_DUPLICATE_SUFFIX {
        raw_list.push((
            format!("{sanitized} ({n})"),
            CandidateKind::Numbered { sanitized: true, n },
        ));
    }
    for (prefix_index, prefix) in layout.variant_prefixes.iter().enumerate() {
        raw_list.push((
            format!("{prefix}{project_name}"),
            CandidateKind::Prefixed {
                sanitized: false,
                prefix_index,
            },
        ));
        raw_list.push((
            format!("{prefix}{sanitized}"),
            CandidateKind::Prefixed {
                sanitized: true,
                prefix_index,
            },
        ));
    }
    raw_list.push((layout.fallback_folder.clone(), CandidateKind::Fallback));

    let mut seen = BTreeSet::new();
    let mut candidates = Vec::with_capacity(raw_list.len());
    for (segment, kind) in raw_list {
        let path = join_root(&layout.root, &segment);
        if seen.insert(path.clone()) {
            candidates.push(Candidate { path, kind });
        }
    }

    CandidateSet { candidates }
}

/// Human-readable folder names for manual review of an unmapped project.
pub fn review_variants(layout: &LayoutConfig, project_name: &str) -> Vec<String> {
    let sanitized = sanitize_project_name(project_name);
    let mut out = vec![
        format!("{project_name} (1)"),
        format!("{sanitized} (1)"),
    ];
    for prefix in &layout.variant_prefixes {
        out.push(format!("{prefix}{project_name}"));
        out.push(format!("{prefix}{sanitized}"));
    }
    out.push(format!("{} (fallback)", layout.fallback_folder));
    out
}
