//! Fake Amber executables for end-to-end workflow tests.
//!
//! The scripts behave like the real tools as far as the pipeline can tell: they
//! read their deck, check their input coordinates and write the files the stage
//! is expected to produce. Each invocation is appended to a calls log as
//! `<tool> <stage>`.

use super::options::RunOptions;
use crate::core::config::RawParams;
use crate::engine::environment::BaseEnvironment;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SYSTEM_PATH: &str = "/usr/bin:/bin";

const TLEAP: &str = r#"#!/bin/sh
echo "tleap prep" >> "@CALLS@"
if [ "$1" != "-f" ] || [ ! -s "$2" ]; then
  echo "usage: tleap -f <deck>" >&2
  exit 2
fi
if [ "prep" = "$FAIL_STAGE" ]; then
  echo "boom in $2" >&2
  exit 7
fi
echo "Loading $2"
printf 'ATOM      1  N   ASN A   1\nATOM      2  CA  ASN A   1\nHETATM    3  O   WAT W   2\nEND\n' > prep.pdb
echo topology > prep.prmtop
echo coordinates > prep.inpcrd
"#;

const ENGINE: &str = r#"#!/bin/sh
tool="${0##*/}"
input=""
coords=""
restart=""
traj=""
while [ $# -gt 0 ]; do
  case "$1" in
    -i) input="$2"; shift 2 ;;
    -c) coords="$2"; shift 2 ;;
    -r) restart="$2"; shift 2 ;;
    -x) traj="$2"; shift 2 ;;
    *) shift ;;
  esac
done
stage="${input%.in}"
echo "$tool $stage" >> "@CALLS@"
echo "CUDA_VISIBLE_DEVICES=${CUDA_VISIBLE_DEVICES:-unset}"
if [ ! -s "$input" ] || [ ! -s "$coords" ] || [ ! -s prep.prmtop ]; then
  echo "missing input for $stage" >&2
  exit 2
fi
if [ "$stage" = "$FAIL_STAGE" ]; then
  echo "boom in $input" >&2
  exit 7
fi
if [ "$stage" = "$HANG_STAGE" ]; then
  exec sleep 30
fi
if [ "$stage" = "$SKIP_STAGE" ]; then
  exit 0
fi
echo restart > "$restart"
if [ -n "$traj" ]; then
  echo frames > "$traj"
fi
"#;

pub(crate) struct FakeSuite {
    dir: TempDir,
    pub bin: PathBuf,
    pub structure: PathBuf,
    pub results: PathBuf,
    calls: PathBuf,
    vars: BTreeMap<String, String>,
}

impl FakeSuite {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let structure = dir.path().join("1l2y.pdb");
        fs::write(
            &structure,
            "ATOM      1  N   ASN A   1      -8.901   4.127  -0.555  1.00  0.00           N\nEND\n",
        )
        .unwrap();
        Self {
            results: dir.path().join("results"),
            calls: dir.path().join("calls.log"),
            bin,
            structure,
            dir,
            vars: BTreeMap::new(),
        }
    }

    /// `tleap` plus all three engines.
    pub fn with_full_install() -> Self {
        let suite = Self::new();
        suite.install_tleap();
        for engine in ["pmemd.cuda", "pmemd", "sander"] {
            suite.install_engine(engine);
        }
        suite
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn install(&self, name: &str, script: &str) {
        let path = self.bin.join(name);
        let body = script.replace("@CALLS@", &self.calls.display().to_string());
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn install_tleap(&self) {
        self.install("tleap", TLEAP);
    }

    pub fn install_engine(&self, name: &str) {
        self.install(name, ENGINE);
    }

    fn with_var(mut self, key: &str, stage: &str) -> Self {
        self.vars.insert(key.to_string(), stage.to_string());
        self
    }

    /// The named stage exits with code 7 after writing to stderr.
    pub fn fail_at(self, stage: &str) -> Self {
        self.with_var("FAIL_STAGE", stage)
    }

    /// The named stage exits cleanly without writing its outputs.
    pub fn skip_outputs_at(self, stage: &str) -> Self {
        self.with_var("SKIP_STAGE", stage)
    }

    /// The named stage never finishes on its own.
    pub fn hang_at(self, stage: &str) -> Self {
        self.with_var("HANG_STAGE", stage)
    }

    pub fn params(&self, sim_time_ns: f64) -> RawParams {
        RawParams::new(&self.structure, sim_time_ns)
    }

    pub fn options_with_path(&self, path: &str) -> RunOptions {
        let mut vars = self.vars.clone();
        vars.insert("PATH".to_string(), path.to_string());
        RunOptions::new(&self.results).with_base_environment(BaseEnvironment::Explicit(vars))
    }

    pub fn options(&self) -> RunOptions {
        self.options_with_path(&format!("{}:{}", self.bin.display(), SYSTEM_PATH))
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls)
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
