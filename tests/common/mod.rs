use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

// Each test binary compiles this module; not all of them use every helper.
#[allow(dead_code)]
pub const ROOT: &str = "docs/Bennett Legal";

const LISTING: &str = "\
# gsutil ls -r gs://bennett_bucket1/**
gs://bennett_bucket1/docs/Bennett Legal/Alpha/:
gs://bennett_bucket1/docs/Bennett Legal/Alpha/a.pdf
gs://bennett_bucket1/docs/Bennett Legal/Solar - Beta/b.pdf
gs://bennett_bucket1/docs/Bennett Legal/O'Brien_Case/c.pdf
gs://bennett_bucket1/docs/Bennett Legal/zzz_mailroom_no_project_assigned/m.pdf
";

const PROJECTS: &str = r#"[
  {"id": 1, "project_name": "Alpha"},
  {"id": 2, "project_name": "Beta"},
  {"id": 3, "project_name": "O'Brien/Case"},
  {"id": 4, "project_name": "Mailroom Only"},
  {"id": 5, "project_name": "Ghost"},
  {"id": 6, "project_name": "No Docs"},
  {"id": 7, "project_name": "Blank Names"}
]"#;

const DOCUMENTS: &str = r#"[
  {"id": 10, "project_id": 1, "filename": "a.pdf", "size": 100},
  {"id": 11, "project_id": 2, "filename": "b.pdf", "size": 200},
  {"id": 12, "project_id": 3, "filename": "c.pdf", "size": 300},
  {"id": 13, "project_id": 4, "filename": "m.pdf", "size": 400},
  {"id": 14, "project_id": 5, "filename": "g.pdf", "size": 500},
  {"id": 15, "project_id": 7, "filename": "  ", "size": 600},
  {"id": 16, "project_id": null, "filename": "orphan.pdf", "size": 1}
]"#;

/// A casemap home with a saved listing and a small legacy snapshot.
pub struct Fixture {
    pub home: PathBuf,
}

impl Fixture {
    pub fn new(dir: &Path) -> Self {
        let home = dir.join("home");
        let snapshot = home.join("snapshot");
        fs::create_dir_all(&snapshot).expect("mkdir snapshot");
        fs::write(snapshot.join("projects.json"), PROJECTS).expect("write projects");
        fs::write(snapshot.join("documents.json"), DOCUMENTS).expect("write documents");
        fs::write(home.join("listing.txt"), LISTING).expect("write listing");
        Self { home }
    }

    #[allow(dead_code)]
    pub fn export_dir(&self) -> PathBuf {
        self.home.join("exports")
    }

    pub fn command(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("casemap");
        cmd.current_dir(&self.home)
            .env("CASEMAP_HOME", &self.home)
            .env("CASEMAP_CONFIG_PATH", self.home.join("absent.toml"))
            .env("CASEMAP_STORE_BACKEND", "manifest")
            .env("CASEMAP_STORE_MANIFEST", self.home.join("listing.txt"))
            .env("CASEMAP_ROOT_PREFIX", ROOT)
            .env_remove("CASEMAP_PROJECTS_FILE")
            .env_remove("CASEMAP_DOCUMENTS_FILE")
            .env_remove("CASEMAP_EXPORT_DIR")
            .env_remove("CASEMAP_LOGS_DIR")
            .env_remove("CASEMAP_VARIANT_PREFIXES")
            .env_remove("CASEMAP_FALLBACK_FOLDER")
            .env_remove("CASEMAP_FOLDER_BOUNDARY")
            .env_remove("GCS_BUCKET_NAME");
        cmd
    }
}
