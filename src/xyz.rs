use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;
use log::warn;
use nalgebra::{Matrix3, Point3};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::frame::{Frame, Trajectory};

fn comment_fields(comment: &str) -> Result<HashMap<String, String>> {
    let re = Regex::new(r#"(\w+)=(?:"([^"]*)"|(\S+))"#)?;
    Ok(re
        .captures_iter(comment)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((key, value))
        })
        .collect())
}

fn parse_flag(s: &str) -> Result<bool> {
    match s {
        "T" | "t" | "True" | "true" | "1" => Ok(true),
        "F" | "f" | "False" | "false" | "0" => Ok(false),
        other => bail!("invalid pbc flag {other:?}"),
    }
}

fn apply_comment(frame: Frame, comment: &str) -> Result<Frame> {
    let fields = comment_fields(comment)?;
    let mut frame = frame;
    if let Some(lattice) = fields.get("lattice") {
        let values = lattice
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .context("Parsing Lattice")?;
        if values.len() != 9 {
            bail!("Lattice has {} values, expected 9", values.len());
        }
        let pbc = match fields.get("pbc") {
            Some(flags) => {
                let flags = flags
                    .split_whitespace()
                    .map(parse_flag)
                    .collect::<Result<Vec<_>>>()?;
                match flags.as_slice() {
                    &[a, b, c] => [a, b, c],
                    _ => bail!("pbc has {} values, expected 3", flags.len()),
                }
            }
            None => [true; 3],
        };
        frame = frame.with_cell(Matrix3::from_row_slice(&values), pbc);
    }
    if let Some(energy) = fields.get("energy") {
        frame = frame.with_energy(energy.parse().context("Parsing energy")?);
    }
    Ok(frame)
}

/// Reads every frame of a (possibly extended) multi-frame XYZ file.
pub fn read_trajectory(path: &Path) -> Result<Trajectory> {
    let mut lines = BufReader::new(
        File::open(path).context(format!("Reading {}", path.to_string_lossy()))?,
    )
    .lines()
    .enumerate();
    let mut frames = Vec::new();
    let mut warned = false;
    loop {
        let count = match lines.next() {
            None => break,
            Some((_, line)) if line.as_ref().is_ok_and(|l| l.trim().is_empty()) => continue,
            Some((n, line)) => line?
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow!("line {}: expected an atom count", n + 1))?,
        };
        let (_, comment) = lines
            .next()
            .ok_or_else(|| anyhow!("frame {}: missing comment line", frames.len() + 1))?;
        let comment = comment?;
        let mut symbols = Vec::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        for _ in 0..count {
            let (n, line) = lines
                .next()
                .ok_or_else(|| anyhow!("frame {}: expected {count} atoms", frames.len() + 1))?;
            let line = line?;
            let parts = line.split_whitespace().collect::<Vec<_>>();
            if parts.len() < 4 {
                bail!("line {}: expected `symbol x y z`", n + 1);
            }
            if parts.len() > 4 && !warned {
                warn!("{}: ignoring extra per-atom columns", path.display());
                warned = true;
            }
            let xyz = parts[1..4]
                .iter()
                .map(|s| s.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| anyhow!("line {}: {err}", n + 1))?;
            symbols.push(parts[0].to_string());
            positions.push(Point3::new(xyz[0], xyz[1], xyz[2]));
        }
        frames.push(apply_comment(Frame::new(symbols, positions), &comment)?);
    }
    Ok(Trajectory::new(frames))
}

fn comment_line(frame: &Frame) -> String {
    let mut fields = Vec::new();
    if frame.has_cell() {
        let lattice = frame.cell.transpose().iter().map(|v| format!("{v:.8}")).join(" ");
        fields.push(format!("Lattice=\"{lattice}\""));
        let pbc = frame.pbc.iter().map(|&p| if p { "T" } else { "F" }).join(" ");
        fields.push(format!("pbc=\"{pbc}\""));
    }
    if let Some(energy) = frame.energy {
        fields.push(format!("energy={energy:.10}"));
    }
    fields.join(" ")
}

/// Writes a single frame as plain XYZ; the comment line carries the cell, if any.
pub fn write<W: Write>(w: &mut W, frame: &Frame) -> io::Result<()> {
    writeln!(w, "{}", frame.atoms_count())?;
    writeln!(w, "{}", comment_line(frame))?;
    for (symbol, p) in frame.symbols.iter().zip(&frame.positions) {
        writeln!(w, "{symbol:<2} {:>22.15} {:>22.15} {:>22.15}", p.x, p.y, p.z)?;
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
    use assert_float_eq::assert_f64_near;
    use nalgebra::point;
    use std::fs;

    #[test]
    fn test_read_multi_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neb.xyz");
        fs::write(
            &path,
            "2\nfirst\nH 0.0 0.0 0.0\nH 0.74 0.0 0.0\n\
             2\nenergy=-1.5 Lattice=\"10 0 0 0 11 0 0 0 12\" pbc=\"T T F\"\n\
             H 0.0 0.0 0.0 0.1 0.1 0.1\nH 0.80 0.0 0.0 0.1 0.1 0.1\n",
        )
        .unwrap();
        let trajectory = read_trajectory(&path).unwrap();
        assert_eq!(trajectory.len(), 2);
        let first = &trajectory.frames()[0];
        assert!(!first.has_cell());
        assert_eq!(first.energy, None);
        let second = &trajectory.frames()[1];
        assert_f64_near!(second.positions[1].x, 0.80);
        assert_eq!(second.energy, Some(-1.5));
        assert_eq!(second.pbc, [true, true, false]);
        assert_f64_near!(second.cell[(1, 1)], 11.0);
        assert_f64_near!(second.cell[(2, 2)], 12.0);
    }

    #[test]
    fn test_truncated_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xyz");
        fs::write(&path, "3\ncomment\nH 0 0 0\n").unwrap();
        assert!(read_trajectory(&path).is_err());
    }

    #[test]
    fn test_write_then_read_keeps_cell() {
        let frame = Frame::new(
            vec!["Cu".into(), "Cu".into()],
            vec![point![0.0, 0.0, 0.0], point![1.8, 1.8, 0.0]],
        )
        .with_cell(Matrix3::new(3.6, 0.0, 0.0, 0.0, 3.6, 0.0, 0.2, 0.0, 3.6), [true; 3]);
        let mut buf = Vec::new();
        write(&mut buf, &frame).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("2"));
        assert!(lines.next().unwrap().contains("pbc=\"T T T\""));
        assert!(lines.next().unwrap().starts_with("Cu "));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cu.xyz");
        save(&frame, &path).unwrap();
        let back = read_trajectory(&path).unwrap();
        let back = &back.frames()[0];
        assert_eq!(back.pbc, [true; 3]);
        assert_f64_near!(back.cell[(2, 0)], 0.2);
        assert_f64_near!(back.positions[1].y, 1.8);
    }
}
