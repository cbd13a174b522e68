use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::sampling::{Grid, Macroscopic};
use crate::settings::Settings;
use crate::simulation::Totals;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use nalgebra::Point3;
    use ndarray::{Array3, Array4};

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("dsmc-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn macroscopic_rows() {
        let domain = Domain::new(Point3::origin(), Point3::new(2.0, 1.0, 1.0)).unwrap();
        let grid = Grid::new(domain, [2, 1, 1]).unwrap();
        let mut velocity = Array4::zeros((2, 1, 1, 3));
        velocity[[1, 0, 0, 0]] = 5.0;
        let fields = Macroscopic {
            density: Array3::from_elem((2, 1, 1), 3.0),
            velocity,
            temperature: Array3::from_elem((2, 1, 1), 300.0),
        };

        let dir = scratch_dir("macroscopic");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(MACROSCOPIC_FILE);
        write_macroscopic(&path, &grid, &fields).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(|line| line.split_whitespace().map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![1.5, 0.5, 0.5, 3.0, 5.0, 0.0, 0.0, 300.0]);

        fs::remove_dir_all(&dir).unwrap();
    }
}

pub const MACROSCOPIC_FILE: &str = "macroscopic.dat";
pub const SUMMARY_FILE: &str = "summary.json";

/// Run summary written next to the sampled fields.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub timestamp: String,
    pub steps: usize,
    pub particles: usize,
    pub samples: usize,
    pub totals: Totals,
    pub elapsed_seconds: f64,
    pub settings: &'a Settings,
}

/// Writes one line per cell: centre, density, mean velocity, temperature.
/// Cells are ordered with the last index varying fastest.
pub fn write_macroscopic(path: &Path, grid: &Grid, fields: &Macroscopic) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# x y z n ux uy uz T")?;
    for ((i, j, k), density) in fields.density.indexed_iter() {
        let center = grid.cell_center([i, j, k]);
        write!(writer, "{} {} {} {}", center.x, center.y, center.z, density)?;
        for c in 0..3 {
            write!(writer, " {}", fields.velocity[[i, j, k, c]])?;
        }
        writeln!(writer, " {}", fields.temperature[[i, j, k]])?;
    }
    writer.flush()?;

    Ok(())
}

pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .context("failed to serialise run summary")?;
    Ok(())
}

/// Writes the sampled fields and the run summary into `directory`, creating
/// it if needed.
pub fn writeup(
    directory: &Path,
    grid: &Grid,
    fields: &Macroscopic,
    summary: &Summary,
) -> Result<()> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create output directory {:?}", directory))?;
    write_macroscopic(&directory.join(MACROSCOPIC_FILE), grid, fields)?;
    write_summary(&directory.join(SUMMARY_FILE), summary)?;
    Ok(())
}
