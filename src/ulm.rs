//! Reader for ASE's `.traj` files.
//!
//! The container ("ulm") is a 48 byte header, a table of item offsets and one
//! JSON document per item. Large arrays are not inlined in the JSON: they are
//! stored as `{"ndarray": [shape, dtype, offset]}` pointing at raw little
//! endian data elsewhere in the file.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use nalgebra::{Matrix3, Point3};
use periodic_table_on_an_enum::Element;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::frame::{Frame, Trajectory};

pub const MAGIC: &[u8; 8] = b"- of Ulm";
const HEADER_LEN: usize = 48;
const TRAJECTORY_TAG: &str = "ASE-Trajectory";
const MAX_KNOWN_VERSION: i64 = 3;

pub struct UlmFile {
    tag: String,
    version: i64,
    data: Vec<u8>,
    offsets: Vec<usize>,
}

fn read_i64(data: &[u8], pos: usize) -> Result<i64> {
    let bytes = data
        .get(pos..pos + 8)
        .ok_or_else(|| anyhow!("unexpected end of file at byte {pos}"))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(i64::from_le_bytes(buf))
}

fn read_offset(data: &[u8], pos: usize) -> Result<usize> {
    let value = read_i64(data, pos)?;
    usize::try_from(value).map_err(|_| anyhow!("negative offset {value} at byte {pos}"))
}

impl UlmFile {
    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read(path).context(format!("Reading {}", path.to_string_lossy()))?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_LEN || &data[..8] != MAGIC {
            bail!("not a ulm file");
        }
        let tag = String::from_utf8_lossy(&data[8..24]).trim_end().to_string();
        let version = read_i64(&data, 24)?;
        let nitems = read_offset(&data, 32)?;
        let offsets_pos = read_offset(&data, 40)?;
        if version > MAX_KNOWN_VERSION {
            warn!("ulm version {version} is newer than {MAX_KNOWN_VERSION}, reading anyway");
        }
        let offsets = (0..nitems)
            .map(|i| read_offset(&data, offsets_pos + 8 * i))
            .collect::<Result<Vec<_>>>()
            .context("Reading item offsets")?;
        debug!("ulm tag {tag:?}, version {version}, {nitems} items");
        Ok(Self {
            tag,
            version,
            data,
            offsets,
        })
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// JSON document of item `i`.
    pub fn item(&self, i: usize) -> Result<Value> {
        let pos = *self
            .offsets
            .get(i)
            .ok_or_else(|| anyhow!("item {i} out of range"))?;
        let len = read_offset(&self.data, pos)?;
        let text = self
            .data
            .get(pos + 8..pos + 8 + len)
            .ok_or_else(|| anyhow!("item {i} runs past the end of the file"))?;
        serde_json::from_slice(text).context(format!("Decoding item {i}"))
    }

    /// Shape and values of an array field, converted to `f64`.
    pub fn array(&self, value: &Value) -> Result<(Vec<usize>, Vec<f64>)> {
        if let Some(reference) = value.get("ndarray") {
            let (shape, dtype, offset) = match reference.as_array().map(Vec::as_slice) {
                Some([shape, dtype, offset]) => (
                    parse_shape(shape)?,
                    dtype.as_str().ok_or_else(|| anyhow!("dtype is not a string"))?,
                    offset
                        .as_u64()
                        .ok_or_else(|| anyhow!("array offset is not an integer"))?
                        as usize,
                ),
                _ => bail!("malformed ndarray reference"),
            };
            let count = shape.iter().product::<usize>();
            let values = self.decode_raw(dtype, offset, count)?;
            return Ok((shape, values));
        }
        if let Some(reference) = value.get("__ndarray__") {
            return match reference.as_array().map(Vec::as_slice) {
                Some([shape, _dtype, flat]) => {
                    let shape = parse_shape(shape)?;
                    let values = flat
                        .as_array()
                        .ok_or_else(|| anyhow!("inline array data is not a list"))?
                        .iter()
                        .map(json_number)
                        .collect::<Result<Vec<_>>>()?;
                    check_len(&shape, &values)?;
                    Ok((shape, values))
                }
                _ => bail!("malformed inline ndarray"),
            };
        }
        match value {
            Value::Array(items) => {
                let rows = items
                    .iter()
                    .map(|item| match item {
                        Value::Array(inner) => inner.iter().map(json_number).collect(),
                        other => json_number(other).map(|v| vec![v]),
                    })
                    .collect::<Result<Vec<Vec<f64>>>>()?;
                let nested = items.iter().any(Value::is_array);
                let width = rows.first().map_or(0, Vec::len);
                let ragged = items
                    .iter()
                    .zip(&rows)
                    .any(|(item, row)| !item.is_array() || row.len() != width);
                if nested && ragged {
                    bail!("ragged nested array, rows must all have {width} values");
                }
                let shape = if nested {
                    vec![rows.len(), width]
                } else {
                    vec![rows.len()]
                };
                Ok((shape, rows.into_iter().flatten().collect()))
            }
            _ => bail!("value is not an array"),
        }
    }

    fn decode_raw(&self, dtype: &str, offset: usize, count: usize) -> Result<Vec<f64>> {
        let size = match dtype {
            "float64" | "int64" | "uint64" => 8,
            "float32" | "int32" | "uint32" => 4,
            "int8" | "uint8" | "bool" => 1,
            other => bail!("unsupported dtype {other}"),
        };
        let bytes = self
            .data
            .get(offset..offset + size * count)
            .ok_or_else(|| anyhow!("array at byte {offset} runs past the end of the file"))?;
        let values = bytes
            .chunks_exact(size)
            .map(|chunk| match dtype {
                "float64" => f64::from_le_bytes(chunk.try_into().unwrap_or_default()),
                "int64" => i64::from_le_bytes(chunk.try_into().unwrap_or_default()) as f64,
                "uint64" => u64::from_le_bytes(chunk.try_into().unwrap_or_default()) as f64,
                "float32" => f64::from(f32::from_le_bytes(chunk.try_into().unwrap_or_default())),
                "int32" => f64::from(i32::from_le_bytes(chunk.try_into().unwrap_or_default())),
                "uint32" => f64::from(u32::from_le_bytes(chunk.try_into().unwrap_or_default())),
                "int8" => f64::from(chunk[0] as i8),
                _ => f64::from(chunk[0]),
            })
            .collect();
        Ok(values)
    }
}

fn parse_shape(value: &Value) -> Result<Vec<usize>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("array shape is not a list"))?
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| anyhow!("array dimension is not an integer"))
        })
        .collect()
}

fn json_number(value: &Value) -> Result<f64> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => other
            .as_f64()
            .ok_or_else(|| anyhow!("expected a number, got {other}")),
    }
}

fn check_len(shape: &[usize], values: &[f64]) -> Result<()> {
    let expected = shape.iter().product::<usize>();
    if values.len() != expected {
        bail!("array of shape {shape:?} holds {} values", values.len());
    }
    Ok(())
}

fn to_points(shape: &[usize], values: &[f64]) -> Result<Vec<Point3<f64>>> {
    check_len(shape, values)?;
    match shape {
        [_, 3] => Ok(values
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect()),
        _ => bail!("positions have shape {shape:?}, expected [n, 3]"),
    }
}

fn to_cell(shape: &[usize], values: &[f64]) -> Result<Matrix3<f64>> {
    check_len(shape, values)?;
    match shape {
        [3, 3] => Ok(Matrix3::from_row_slice(values)),
        [3] => Ok(Matrix3::from_diagonal(&nalgebra::Vector3::new(
            values[0], values[1], values[2],
        ))),
        _ => bail!("cell has shape {shape:?}, expected [3, 3]"),
    }
}

/// Reads every frame of an ASE trajectory.
pub fn read_trajectory(path: &Path) -> Result<Trajectory> {
    let ulm = UlmFile::read(path)?;
    if ulm.tag() != TRAJECTORY_TAG {
        warn!("{}: unexpected ulm tag {:?}", path.display(), ulm.tag());
    }
    let mut symbols: Option<Vec<String>> = None;
    let mut pbc = [false; 3];
    let mut frames = Vec::with_capacity(ulm.len());
    for i in 0..ulm.len() {
        let item = ulm.item(i)?;
        if let Some(numbers) = item.get("numbers") {
            let (_, numbers) = ulm.array(numbers).context(format!("Item {i}: numbers"))?;
            symbols = Some(
                numbers
                    .iter()
                    .map(|&z| {
                        Element::from_atomic_number(z as usize)
                            .map(|element| element.get_symbol().to_string())
                            .ok_or_else(|| anyhow!("item {i}: unknown atomic number {z}"))
                    })
                    .collect::<Result<Vec<_>>>()?,
            );
        }
        if let Some(value) = item.get("pbc") {
            let (_, flags) = ulm.array(value).context(format!("Item {i}: pbc"))?;
            if flags.len() != 3 {
                bail!("item {i}: pbc has {} entries", flags.len());
            }
            pbc = [flags[0] != 0.0, flags[1] != 0.0, flags[2] != 0.0];
        }
        let current = symbols
            .clone()
            .ok_or_else(|| anyhow!("item {i}: atomic numbers missing"))?;
        let (shape, values) = ulm
            .array(
                item.get("positions")
                    .ok_or_else(|| anyhow!("item {i}: positions missing"))?,
            )
            .context(format!("Item {i}: positions"))?;
        let positions = to_points(&shape, &values)?;
        if positions.len() != current.len() {
            bail!(
                "item {i}: {} positions for {} atoms",
                positions.len(),
                current.len()
            );
        }
        let cell = match item.get("cell") {
            Some(value) => {
                let (shape, values) = ulm.array(value).context(format!("Item {i}: cell"))?;
                to_cell(&shape, &values)?
            }
            None => Matrix3::zeros(),
        };
        let mut frame = Frame::new(current, positions).with_cell(cell, pbc);
        frame.energy = item
            .get("calculator")
            .and_then(|calc| calc.get("energy"))
            .and_then(Value::as_f64);
        frames.push(frame);
    }
    Ok(Trajectory::new(frames))
}
