//! Input-deck generation for every pipeline stage.
//!
//! A deck is fully determined by the resolved configuration, the stage and the
//! result of the stage before it, so regenerating a deck rewrites the same bytes.

pub mod template;
mod templates;

use crate::core::config::SimulationConfig;
use crate::core::layout::{self, FilesystemError, RunLayout};
use crate::core::stage::{
    EQUIL_STEPS, HEAT_STEPS, MINIMIZATION_MAX_CYCLES, MINIMIZATION_STEEPEST_DESCENT_CYCLES,
    NONBONDED_CUTOFF_ANGSTROM, Stage, StageResult, TARGET_PRESSURE_BAR, TIMESTEP_PS,
};
use std::path::PathBuf;
use template::Values;
use thiserror::Error;
use tracing::debug;

pub use template::TemplateError;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

fn template_for(stage: Stage) -> &'static str {
    match stage {
        Stage::Prep => templates::PREP,
        Stage::MinRestrained => templates::MIN_RESTRAINED,
        Stage::MinFree => templates::MIN_FREE,
        Stage::HeatNvt => templates::HEAT_NVT,
        Stage::EquilNpt => templates::EQUIL_NPT,
        Stage::ProdNpt => templates::PROD_NPT,
    }
}

// Whole numbers keep one decimal ("300.0"); anything else is printed exactly.
fn real(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn stage_values(
    config: &SimulationConfig,
    stage: Stage,
    predecessor: Option<&StageResult>,
) -> Result<Values, TemplateError> {
    let found = predecessor.map(|p| p.stage);
    if found != stage.predecessor() {
        return Err(TemplateError::PredecessorMismatch {
            stage,
            expected: stage.predecessor(),
            found,
        });
    }

    let mut values = Values::new();

    if stage == Stage::Prep {
        values.insert(
            "force_field_source",
            config.force_field().leap_source().to_string(),
        );
        values.insert("water_source", config.water_model().leap_source().to_string());
        values.insert(
            "structure_path",
            config.structure_path().display().to_string(),
        );
        values.insert("solvent_box", config.water_model().solvent_box().to_string());
        values.insert("box_buffer", real(config.box_buffer_angstrom()));
        values.insert("topology", layout::topology_name());
        values.insert("coordinates", layout::coordinates_name(Stage::Prep));
        values.insert(
            "solvated_structure",
            format!("{}.pdb", Stage::Prep.name()),
        );
        return Ok(values);
    }

    // An unsuccessful predecessor leaves this key empty, which fails rendering.
    let source = predecessor
        .and_then(|p| p.coordinates.as_ref())
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    values.insert("source_coordinates", source);
    values.insert("cutoff", real(NONBONDED_CUTOFF_ANGSTROM));

    if let Some(restraint) = stage.restraint() {
        values.insert("restraint_weight", real(restraint.weight));
        values.insert("restraint_mask", restraint.mask.to_string());
    }

    if !stage.is_dynamics() {
        values.insert("max_cycles", MINIMIZATION_MAX_CYCLES.to_string());
        values.insert(
            "steepest_descent_cycles",
            MINIMIZATION_STEEPEST_DESCENT_CYCLES.to_string(),
        );
        return Ok(values);
    }

    let nstlim = match stage {
        Stage::HeatNvt => HEAT_STEPS,
        Stage::EquilNpt => EQUIL_STEPS,
        _ => config.production_steps(),
    };
    values.insert("nstlim", nstlim.to_string());
    values.insert("timestep", format!("{:.3}", TIMESTEP_PS));
    values.insert("temperature", real(config.temperature_k()));
    values.insert("pressure", real(TARGET_PRESSURE_BAR));
    Ok(values)
}

/// Renders the deck for `stage`. `predecessor` must be the result of
/// [`Stage::predecessor`], or `None` for the preparation stage.
pub fn render(
    config: &SimulationConfig,
    stage: Stage,
    predecessor: Option<&StageResult>,
) -> Result<String, TemplateError> {
    let values = stage_values(config, stage, predecessor)?;
    template::render(stage, template_for(stage), &values)
}

/// Renders and writes the deck for `stage` to its fixed location in `layout`.
pub fn generate(
    config: &SimulationConfig,
    layout: &RunLayout,
    stage: Stage,
    predecessor: Option<&StageResult>,
) -> Result<PathBuf, DeckError> {
    let text = render(config, stage, predecessor)?;
    let path = layout.deck(stage);
    layout::write_file(&path, &text)?;
    debug!(stage = %stage, "Wrote input deck to {:?}", path);
    Ok(path)
}

/// Writes the decks of every stage up to `last`, chaining each on the planned
/// (successful) result of its predecessor.
pub fn generate_through(
    config: &SimulationConfig,
    layout: &RunLayout,
    last: Stage,
) -> Result<Vec<PathBuf>, DeckError> {
    let mut previous: Option<StageResult> = None;
    let mut written = Vec::new();
    for stage in Stage::through(last) {
        written.push(generate(config, layout, stage, previous.as_ref())?);
        previous = Some(StageResult::planned(stage, layout));
    }
    Ok(written)
}
