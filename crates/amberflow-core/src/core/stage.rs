use crate::core::layout::RunLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Integration timestep in picoseconds. Never user-configurable.
pub const TIMESTEP_PS: f64 = 0.002;
pub const STEPS_PER_PS: u64 = 500;
pub const STEPS_PER_NS: u64 = STEPS_PER_PS * 1_000;

pub const HEAT_WINDOW_PS: u64 = 50;
pub const HEAT_STEPS: u64 = HEAT_WINDOW_PS * STEPS_PER_PS;
pub const EQUIL_WINDOW_PS: u64 = 500;
pub const EQUIL_STEPS: u64 = EQUIL_WINDOW_PS * STEPS_PER_PS;

pub const MINIMIZATION_MAX_CYCLES: u32 = 5_000;
pub const MINIMIZATION_STEEPEST_DESCENT_CYCLES: u32 = 2_500;
pub const NONBONDED_CUTOFF_ANGSTROM: f64 = 10.0;
pub const TARGET_PRESSURE_BAR: f64 = 1.0;

/// Harmonic positional restraint applied to a subset of atoms during a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restraint {
    /// Force constant in kcal/(mol·Å²).
    pub weight: f64,
    /// Atom mask in the engine's selection syntax.
    pub mask: &'static str,
}

const HEAVY_ATOM_RESTRAINT: Restraint = Restraint {
    weight: 10.0,
    mask: "!@H=",
};
const HEATING_BACKBONE_RESTRAINT: Restraint = Restraint {
    weight: 5.0,
    mask: "@CA",
};
const EQUILIBRATION_BACKBONE_RESTRAINT: Restraint = Restraint {
    weight: 2.0,
    mask: "@CA",
};

/// One phase of the pipeline, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prep,
    MinRestrained,
    MinFree,
    HeatNvt,
    EquilNpt,
    ProdNpt,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Prep,
        Stage::MinRestrained,
        Stage::MinFree,
        Stage::HeatNvt,
        Stage::EquilNpt,
        Stage::ProdNpt,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Stage::Prep => "prep",
            Stage::MinRestrained => "min_restrained",
            Stage::MinFree => "min_free",
            Stage::HeatNvt => "heat_nvt",
            Stage::EquilNpt => "equil_npt",
            Stage::ProdNpt => "prod_npt",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Stage::Prep => "System preparation",
            Stage::MinRestrained => "Minimization (restrained)",
            Stage::MinFree => "Minimization (unrestrained)",
            Stage::HeatNvt => "Heating (NVT, 50 ps)",
            Stage::EquilNpt => "Equilibration (NPT, 500 ps)",
            Stage::ProdNpt => "Production (NPT)",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The stage whose coordinates feed this one.
    pub const fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Prep => None,
            Stage::MinRestrained => Some(Stage::Prep),
            Stage::MinFree => Some(Stage::MinRestrained),
            Stage::HeatNvt => Some(Stage::MinFree),
            Stage::EquilNpt => Some(Stage::HeatNvt),
            Stage::ProdNpt => Some(Stage::EquilNpt),
        }
    }

    /// Whether the MD engine runs this stage (as opposed to the preparation tool).
    pub const fn uses_engine(self) -> bool {
        !matches!(self, Stage::Prep)
    }

    /// Whether the stage integrates equations of motion and writes a trajectory.
    pub const fn is_dynamics(self) -> bool {
        matches!(self, Stage::HeatNvt | Stage::EquilNpt | Stage::ProdNpt)
    }

    pub const fn restraint(self) -> Option<Restraint> {
        match self {
            Stage::MinRestrained => Some(HEAVY_ATOM_RESTRAINT),
            Stage::HeatNvt => Some(HEATING_BACKBONE_RESTRAINT),
            Stage::EquilNpt => Some(EQUILIBRATION_BACKBONE_RESTRAINT),
            Stage::Prep | Stage::MinFree | Stage::ProdNpt => None,
        }
    }

    /// Stages from `Prep` up to and including `last`, in execution order.
    pub fn through(last: Stage) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().take(last.index() + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one stage's subprocess, retained on disk after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    /// `None` when the process never started or was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    /// Coordinates handed to the next stage. Present only on success.
    pub coordinates: Option<PathBuf>,
    pub trajectory: Option<PathBuf>,
}

impl StageResult {
    pub fn succeeded(&self) -> bool {
        self.coordinates.is_some()
    }

    /// The result a stage will have if it succeeds; used to chain decks in dry runs.
    pub fn planned(stage: Stage, layout: &RunLayout) -> Self {
        Self {
            stage,
            exit_code: Some(0),
            stdout_log: layout.stdout_log(stage),
            stderr_log: layout.stderr_log(stage),
            coordinates: Some(layout.coordinates(stage)),
            trajectory: layout.trajectory(stage),
        }
    }

    pub(crate) fn failed(stage: Stage, exit_code: Option<i32>, layout: &RunLayout) -> Self {
        Self {
            stage,
            exit_code,
            stdout_log: layout.stdout_log(stage),
            stderr_log: layout.stderr_log(stage),
            coordinates: None,
            trajectory: None,
        }
    }
}
