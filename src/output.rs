// src/output.rs
use crate::solvers::Trajectory;
use std::fs::File;
use std::io::{self, Write};

/// Write a trajectory to CSV: a time column, one column per state
/// dimension, and a norm column when the integrator recorded norms.
pub fn write_trajectory_to_csv(filename: &str, traj: &Trajectory) -> io::Result<()> {
    let mut file = File::create(filename)?;
    let d = traj.y.ncols();

    let mut header = String::from("t");
    for col in 0..d {
        header.push_str(&format!(",y{}", col));
    }
    if traj.norms.is_some() {
        header.push_str(",norm");
    }
    writeln!(file, "{}", header)?;

    for row in 0..traj.len() {
        let mut line = format!("{}", traj.t[row]);
        for col in 0..d {
            line.push_str(&format!(",{}", traj.y[[row, col]]));
        }
        if let Some(norms) = traj.norms.as_ref() {
            line.push_str(&format!(",{}", norms[row]));
        }
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_csv_round_trip() {
        let traj = Trajectory {
            t: arr1(&[0.0, 0.1, 0.2]),
            y: arr2(&[[1.0, 2.0], [0.9, 1.8], [0.8, 1.6]]),
            norms: None,
        };
        let path = std::env::temp_dir().join("stochdiff_traj_test.csv");
        let path = path.to_str().unwrap();

        write_trajectory_to_csv(path, &traj).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "t,y0,y1");
        assert_eq!(lines.len(), 4);
        std::fs::remove_file(path).unwrap();
    }
}
