use crate::core::stage::Stage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const SUMMARY_FILE: &str = "run_summary.json";
const MAX_NAME_SUFFIX: u32 = 1_000;

#[derive(Debug, Error)]
#[error("Failed to {action} '{path}': {source}", path = path.display())]
pub struct FilesystemError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FilesystemError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Deterministic file naming inside one run directory.
///
/// Every stage owns `<stage>.in` (deck), `<stage>.out`/`<stage>.err` (captured
/// stdout/stderr) and its restart/trajectory files. The preparation stage also
/// writes the topology shared by all later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates `dir`, failing if it already exists. Parents are created as needed.
    pub fn create_exclusive(dir: &Path) -> Result<Self, FilesystemError> {
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| FilesystemError::new("create directory", parent, e))?;
        }
        fs::create_dir(dir).map_err(|e| FilesystemError::new("create run directory", dir, e))?;
        Ok(Self::new(dir))
    }

    /// Creates `<results_root>/md_<job>_<stamp>`, appending `_2`, `_3`, ... if the
    /// name is already taken by another run.
    pub fn create_timestamped(
        results_root: &Path,
        job_name: &str,
        stamp: &str,
    ) -> Result<Self, FilesystemError> {
        fs::create_dir_all(results_root)
            .map_err(|e| FilesystemError::new("create directory", results_root, e))?;

        let base = format!("md_{}_{}", job_name, stamp);
        for attempt in 1..=MAX_NAME_SUFFIX {
            let name = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let candidate = results_root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(Self::new(candidate)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Run directory {:?} already taken, trying next suffix.", candidate);
                }
                Err(e) => {
                    return Err(FilesystemError::new("create run directory", candidate, e));
                }
            }
        }
        Err(FilesystemError::new(
            "create run directory",
            results_root.join(base),
            io::Error::new(io::ErrorKind::AlreadyExists, "all name suffixes are taken"),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn deck(&self, stage: Stage) -> PathBuf {
        self.root.join(deck_name(stage))
    }
    pub fn stdout_log(&self, stage: Stage) -> PathBuf {
        self.root.join(format!("{}.out", stage.name()))
    }
    pub fn stderr_log(&self, stage: Stage) -> PathBuf {
        self.root.join(format!("{}.err", stage.name()))
    }
    pub fn topology(&self) -> PathBuf {
        self.root.join(topology_name())
    }
    pub fn solvated_structure(&self) -> PathBuf {
        self.root.join(format!("{}.pdb", Stage::Prep.name()))
    }
    pub fn coordinates(&self, stage: Stage) -> PathBuf {
        self.root.join(coordinates_name(stage))
    }
    pub fn trajectory(&self, stage: Stage) -> Option<PathBuf> {
        trajectory_name(stage).map(|name| self.root.join(name))
    }
    pub fn summary(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// Files that must exist and be non-empty for `stage` to count as succeeded.
    pub fn expected_outputs(&self, stage: Stage) -> Vec<PathBuf> {
        let mut outputs = Vec::with_capacity(2);
        if stage == Stage::Prep {
            outputs.push(self.topology());
        }
        outputs.push(self.coordinates(stage));
        outputs.extend(self.trajectory(stage));
        outputs
    }

    /// Subset of [`expected_outputs`](Self::expected_outputs) that is absent or empty.
    pub fn missing_outputs(&self, stage: Stage) -> Vec<PathBuf> {
        self.expected_outputs(stage)
            .into_iter()
            .filter(|path| !is_non_empty_file(path))
            .collect()
    }
}

pub fn deck_name(stage: Stage) -> String {
    format!("{}.in", stage.name())
}

pub fn topology_name() -> String {
    format!("{}.prmtop", Stage::Prep.name())
}

pub fn coordinates_name(stage: Stage) -> String {
    match stage {
        Stage::Prep => format!("{}.inpcrd", stage.name()),
        _ => format!("{}.rst7", stage.name()),
    }
}

pub fn trajectory_name(stage: Stage) -> Option<String> {
    stage
        .is_dynamics()
        .then(|| format!("{}.nc", stage.name()))
}

pub fn engine_report_name(stage: Stage) -> String {
    format!("{}.mdout", stage.name())
}

pub fn engine_info_name(stage: Stage) -> String {
    format!("{}.mdinfo", stage.name())
}

/// Whether `name` is usable as a single path component of a run directory name.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), FilesystemError> {
    fs::write(path, contents).map_err(|e| FilesystemError::new("write", path, e))
}

/// Last `max_lines` lines of `path`, or an empty string if it cannot be read.
pub fn tail_lines(path: &Path, max_lines: usize) -> String {
    let Ok(bytes) = fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Number of `ATOM`/`HETATM` records in a PDB file.
pub fn count_atoms(pdb: &Path) -> Result<usize, FilesystemError> {
    let text = fs::read_to_string(pdb).map_err(|e| FilesystemError::new("read", pdb, e))?;
    Ok(text
        .lines()
        .filter(|line| line.starts_with("ATOM") || line.starts_with("HETATM"))
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_names_are_derived_from_stage_names() {
        let layout = RunLayout::new("/runs/a");
        assert_eq!(layout.deck(Stage::HeatNvt), PathBuf::from("/runs/a/heat_nvt.in"));
        assert_eq!(layout.stdout_log(Stage::Prep), PathBuf::from("/runs/a/prep.out"));
        assert_eq!(layout.stderr_log(Stage::MinFree), PathBuf::from("/runs/a/min_free.err"));
        assert_eq!(layout.coordinates(Stage::Prep), PathBuf::from("/runs/a/prep.inpcrd"));
        assert_eq!(
            layout.coordinates(Stage::ProdNpt),
            PathBuf::from("/runs/a/prod_npt.rst7")
        );
        assert_eq!(layout.trajectory(Stage::MinRestrained), None);
        assert_eq!(
            layout.trajectory(Stage::ProdNpt),
            Some(PathBuf::from("/runs/a/prod_npt.nc"))
        );
        assert_eq!(layout.topology(), PathBuf::from("/runs/a/prep.prmtop"));
    }

    #[test]
    fn expected_outputs_per_stage_kind() {
        let layout = RunLayout::new("/r");
        assert_eq!(
            layout.expected_outputs(Stage::Prep),
            vec![PathBuf::from("/r/prep.prmtop"), PathBuf::from("/r/prep.inpcrd")]
        );
        assert_eq!(
            layout.expected_outputs(Stage::MinFree),
            vec![PathBuf::from("/r/min_free.rst7")]
        );
        assert_eq!(
            layout.expected_outputs(Stage::EquilNpt),
            vec![
                PathBuf::from("/r/equil_npt.rst7"),
                PathBuf::from("/r/equil_npt.nc")
            ]
        );
    }

    #[test]
    fn empty_outputs_count_as_missing() {
        let dir = tempdir().unwrap();
        let layout = RunLayout::new(dir.path());
        fs::write(layout.coordinates(Stage::HeatNvt), "restart").unwrap();
        fs::write(layout.trajectory(Stage::HeatNvt).unwrap(), "").unwrap();

        assert_eq!(
            layout.missing_outputs(Stage::HeatNvt),
            vec![layout.trajectory(Stage::HeatNvt).unwrap()]
        );

        fs::write(layout.trajectory(Stage::HeatNvt).unwrap(), "frames").unwrap();
        assert!(layout.missing_outputs(Stage::HeatNvt).is_empty());
    }

    #[test]
    fn create_exclusive_refuses_existing_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/run");
        assert!(RunLayout::create_exclusive(&target).is_ok());
        let err = RunLayout::create_exclusive(&target).unwrap_err();
        assert_eq!(err.source.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_timestamped_appends_suffix_on_collision() {
        let dir = tempdir().unwrap();
        let first = RunLayout::create_timestamped(dir.path(), "job", "20240101_000000").unwrap();
        let second = RunLayout::create_timestamped(dir.path(), "job", "20240101_000000").unwrap();
        assert_eq!(first.root(), dir.path().join("md_job_20240101_000000"));
        assert_eq!(second.root(), dir.path().join("md_job_20240101_000000_2"));
    }

    #[test]
    fn tail_lines_keeps_the_end_of_the_log() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stage.err");
        let text: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        fs::write(&log, text).unwrap();

        let tail = tail_lines(&log, 3);
        assert_eq!(tail, "line 28\nline 29\nline 30");
        assert_eq!(tail_lines(&dir.path().join("absent"), 3), "");
    }

    #[test]
    fn count_atoms_counts_coordinate_records() {
        let dir = tempdir().unwrap();
        let pdb = dir.path().join("prep.pdb");
        fs::write(
            &pdb,
            "CRYST1\nATOM      1  N\nATOM      2  CA\nHETATM    3  O\nTER\nEND\n",
        )
        .unwrap();
        assert_eq!(count_atoms(&pdb).unwrap(), 3);
    }

    #[test]
    fn safe_components_reject_separators() {
        assert!(is_safe_component("1l2y"));
        assert!(is_safe_component("trp-cage_v2.1"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("with space"));
    }
}
