use crate::core::simulation::Simulation;
use serde_json::Value;
use std::path::Path;

/// Parameter key whose values are output files of the simulator.
pub const OUTPUT_FILE_KEY: &str = "outputFilePath";

/// Places every `outputFilePath` under a folder named after the simulation.
///
/// Only the file name of the original value is kept, so the rewrite is idempotent.
/// Non-string values are left untouched.
pub fn rewrite_output_paths(simulation: &mut Simulation, simulation_name: &str) -> usize {
    let mut rewritten = 0;
    simulation.visit_parameters_mut(&mut |key, value| {
        if key != OUTPUT_FILE_KEY {
            return;
        }
        if let Value::String(path) = value {
            let target = relocate(path, simulation_name);
            if *path != target {
                *path = target;
                rewritten += 1;
            }
        }
    });
    rewritten
}

fn relocate(path: &str, simulation_name: &str) -> String {
    let normalized = path.replace('\\', "/");
    let file_name = Path::new(&normalized)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(normalized.as_str());
    format!("{simulation_name}/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::{Entry, EntryType};
    use serde_json::json;

    fn simulation() -> Simulation {
        let mut sim = Simulation::new();
        sim.simulation_step.insert(
            "write".into(),
            Entry::new(EntryType::new("WriteStep", "WriteStep"))
                .with_parameter("outputFilePath", "out/traj")
                .with_parameter("outputFormat", "sp"),
        );
        sim.simulation_step.insert(
            "thermo".into(),
            Entry::new(EntryType::new("ThermodynamicMeasuremetStep", "ThermodynamicQuantityMeasure"))
                .with_parameter("outputFilePath", "thermo.dat"),
        );
        sim
    }

    #[test]
    fn output_files_move_under_the_simulation_folder() {
        let mut sim = simulation();
        assert_eq!(rewrite_output_paths(&mut sim, "run1"), 2);
        assert_eq!(
            sim.simulation_step["write"].parameters["outputFilePath"],
            json!("run1/traj")
        );
        assert_eq!(
            sim.simulation_step["thermo"].parameters["outputFilePath"],
            json!("run1/thermo.dat")
        );
        assert_eq!(sim.simulation_step["write"].parameters["outputFormat"], json!("sp"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let mut once = simulation();
        rewrite_output_paths(&mut once, "run1");
        let mut twice = once.clone();
        assert_eq!(rewrite_output_paths(&mut twice, "run1"), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_output_files_are_relocated() {
        let mut sim = Simulation::new();
        let mut step = Entry::new(EntryType::new("WriteStep", "WriteStep"))
            .with_parameter("writers", json!([{"outputFilePath": "a/first.sp"}]))
            .with_parameter("extra", json!({"log": {"outputFilePath": "log.txt"}}))
            .with_labels(&["name", "options"]);
        step.push_row(vec![json!("w"), json!({"outputFilePath": "rows.dat"})]);
        sim.simulation_step.insert("write".into(), step);

        assert_eq!(rewrite_output_paths(&mut sim, "run1"), 3);
        let step = &sim.simulation_step["write"];
        assert_eq!(step.parameters["writers"][0]["outputFilePath"], json!("run1/first.sp"));
        assert_eq!(
            step.parameters["extra"]["log"]["outputFilePath"],
            json!("run1/log.txt")
        );
        assert_eq!(step.data[0][1]["outputFilePath"], json!("run1/rows.dat"));
    }

    #[test]
    fn windows_separators_are_handled() {
        assert_eq!(relocate(r"C:\data\traj.sp", "s"), "s/traj.sp");
        assert_eq!(relocate("traj.sp", "s"), "s/traj.sp");
    }
}
