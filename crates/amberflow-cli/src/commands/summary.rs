use amberflow::engine::state::StageState;
use amberflow::workflows::{RunReport, RunStatus};
use std::fmt::Write;
use std::path::Path;

fn state_label(state: StageState) -> &'static str {
    match state {
        StageState::Pending => "pending",
        StageState::Running => "running",
        StageState::Succeeded => "done",
        StageState::Failed => "FAILED",
    }
}

fn file_line(out: &mut String, label: &str, path: Option<&Path>) {
    if let Some(path) = path {
        let _ = writeln!(out, "  {:<20} {}", label, path.display());
    }
}

/// Human-readable summary of a finished workflow.
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();

    let headline = if report.is_success() {
        "✓ Run completed successfully".to_string()
    } else {
        format!("✗ Run failed: {}", report.status)
    };
    let _ = writeln!(out, "\n{}", headline);

    if let Some(dir) = &report.output_dir {
        let _ = writeln!(out, "  {:<20} {}", "Run directory:", dir.display());
    }
    if let Some(selected) = &report.engine {
        let _ = writeln!(
            out,
            "  {:<20} {} ({})",
            "Engine:",
            selected.engine,
            selected.path.display()
        );
    }
    if let Some(atoms) = report.solvated_atoms {
        let _ = writeln!(out, "  {:<20} {}", "Solvated atoms:", atoms);
    }

    if !report.stages.is_empty() {
        let _ = writeln!(out, "\nStages:");
        for record in &report.stages {
            let _ = writeln!(
                out,
                "  {:<16} {}",
                record.stage.name(),
                state_label(record.state)
            );
        }
    }

    if let RunStatus::StageFailed { log_excerpt, .. } = &report.status {
        if !log_excerpt.is_empty() {
            let _ = writeln!(out, "\nLast log lines:");
            for line in log_excerpt.lines() {
                let _ = writeln!(out, "  | {}", line);
            }
        }
    }

    let has_files = report.topology_path.is_some()
        || report.final_coordinates_path.is_some()
        || !report.decks.is_empty()
        || report.summary_path.is_some();
    if has_files {
        let _ = writeln!(out, "\nKey files:");
        file_line(&mut out, "Topology:", report.topology_path.as_deref());
        file_line(
            &mut out,
            "Solvated structure:",
            report.solvated_structure_path.as_deref(),
        );
        file_line(
            &mut out,
            "Final coordinates:",
            report.final_coordinates_path.as_deref(),
        );
        file_line(
            &mut out,
            "Trajectory:",
            report.final_trajectory_path.as_deref(),
        );
        if report.topology_path.is_none() && !report.decks.is_empty() {
            let _ = writeln!(out, "  {:<20} {}", "Input decks:", report.decks.len());
        }
        file_line(&mut out, "Summary:", report.summary_path.as_deref());
    }

    if let (Some(topology), Some(trajectory)) =
        (&report.topology_path, &report.final_trajectory_path)
    {
        let (topology, trajectory) = (topology.display(), trajectory.display());
        let _ = writeln!(out, "\nAnalysis hints:");
        let _ = writeln!(out, "  Visualize:  cpptraj -p {} -y {}", topology, trajectory);
        let _ = writeln!(
            out,
            "  RMSD:       cpptraj -p {} <<EOF\n              trajin {}\n              rms first @CA out rmsd.dat\n              run\n              EOF",
            topology, trajectory
        );
        let _ = writeln!(
            out,
            "  Frames:     cpptraj -p {} -y {} -x frames.pdb",
            topology, trajectory
        );
    }

    out
}
