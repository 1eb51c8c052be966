use itertools::Itertools;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::frame::Frame;

/// Writes a frame in VASP 5 POSCAR format with Cartesian coordinates.
///
/// Species are grouped into runs of consecutive identical symbols, so atom order
/// is preserved. A frame without a cell is written with a zero lattice.
pub fn write<W: Write>(w: &mut W, frame: &Frame) -> io::Result<()> {
    let runs = frame.symbol_runs();
    writeln!(w, "{}", runs.iter().map(|(s, _)| *s).join(" "))?;
    writeln!(w, "{:19.16}", 1.0)?;
    for row in frame.cell.row_iter() {
        writeln!(w, " {:21.16} {:21.16} {:21.16}", row[0], row[1], row[2])?;
    }
    writeln!(w, "{}", runs.iter().map(|(s, _)| format!("{s:>3}")).join(" "))?;
    writeln!(w, "{}", runs.iter().map(|(_, n)| format!("{n:>3}")).join(" "))?;
    writeln!(w, "Cartesian")?;
    for p in &frame.positions {
        writeln!(w, "{:19.16} {:19.16} {:19.16}", p.x, p.y, p.z)?;
    }
    Ok(())
}

pub fn save(frame: &Frame, path: &Path) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write(&mut w, frame)?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{point, Matrix3};

    #[test]
    fn test_layout() {
        let frame = Frame::new(
            vec!["O".into(), "H".into(), "H".into()],
            vec![
                point![0.0, 0.0, 0.0],
                point![0.96, 0.0, 0.0],
                point![-0.24, 0.93, 0.0],
            ],
        )
        .with_cell(Matrix3::identity() * 10.0, [false; 3]);
        let mut buf = Vec::new();
        write(&mut buf, &frame).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 1 + 1 + 3 + 2 + 1 + 3);
        assert_eq!(lines[0], "O H");
        assert_eq!(lines[1].trim().parse::<f64>().unwrap(), 1.0);
        let a = lines[2]
            .split_whitespace()
            .map(|v| v.parse::<f64>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(a, vec![10.0, 0.0, 0.0]);
        assert_eq!(lines[5].split_whitespace().collect::<Vec<_>>(), vec!["O", "H"]);
        assert_eq!(lines[6].split_whitespace().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(lines[7], "Cartesian");
        let last = lines[10]
            .split_whitespace()
            .map(|v| v.parse::<f64>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(last, vec![-0.24, 0.93, 0.0]);
    }
}
