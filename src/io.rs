use crate::error::{Error, Result};
use crate::image::ScanImage;

use glam::{DVec3, Vec3};
use scanvox_core::{QuadMesh, TriangleMesh};

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// NRRD fields this reader understands. Anything else in the header is
/// ignored; encodings other than little-endian `raw` are rejected.
const SUPPORTED_TYPES: &[(&str, usize)] = &[
    ("float", 4),
    ("double", 8),
    ("short", 2),
    ("signed short", 2),
    ("ushort", 2),
    ("unsigned short", 2),
];

/// Reads a raw-encoded NRRD file into a [`ScanImage`].
///
/// NRRD lists `sizes` and `spacings` fastest axis first, while
/// [`ScanImage::dims`] is native order (slowest first), so the sizes are
/// reversed on the way in. All sample types widen to `f32`.
pub fn read_scan_image(path: &Path) -> Result<ScanImage> {
    let bytes = fs::read(path)?;
    let header_end = find_header_end(&bytes)
        .ok_or_else(|| Error::MalformedImage("missing blank line after NRRD header".into()))?;
    let header = std::str::from_utf8(&bytes[..header_end])
        .map_err(|_| Error::MalformedImage("NRRD header is not valid UTF-8".into()))?;

    let mut lines = header.lines();
    let magic = lines.next().unwrap_or("");
    if !magic.starts_with("NRRD") {
        return Err(Error::MalformedImage(format!(
            "bad magic line {magic:?}"
        )));
    }

    let mut sizes: Vec<usize> = Vec::new();
    let mut spacings: Vec<f64> = Vec::new();
    let mut directions: Vec<DVec3> = Vec::new();
    let mut origin = DVec3::ZERO;
    let mut sample_type = String::from("float");
    let mut encoding = String::from("raw");
    let mut endian = String::from("little");

    for line in lines {
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match field.trim() {
            "sizes" => {
                sizes = value
                    .split_whitespace()
                    .map(|s| {
                        s.parse()
                            .map_err(|_| Error::MalformedImage(format!("bad size {s:?}")))
                    })
                    .collect::<Result<_>>()?;
            }
            "spacings" => {
                spacings = value
                    .split_whitespace()
                    .map(|s| {
                        s.parse()
                            .map_err(|_| Error::MalformedImage(format!("bad spacing {s:?}")))
                    })
                    .collect::<Result<_>>()?;
            }
            "space directions" => {
                for part in value.split(')') {
                    let part = part.trim().trim_start_matches('(');
                    if part.is_empty() || part == "none" {
                        continue;
                    }
                    directions.push(parse_vector(&format!("({part})"))?);
                }
            }
            "space origin" => origin = parse_vector(value)?,
            "type" => sample_type = value.to_owned(),
            "encoding" => encoding = value.to_owned(),
            "endian" => endian = value.to_owned(),
            _ => {}
        }
    }

    if encoding != "raw" {
        return Err(Error::MalformedImage(format!(
            "unsupported encoding {encoding:?}"
        )));
    }
    if endian != "little" {
        return Err(Error::MalformedImage(format!(
            "unsupported endianness {endian:?}"
        )));
    }
    if sizes.is_empty() {
        return Err(Error::MalformedImage("header has no sizes field".into()));
    }

    let sample_len = SUPPORTED_TYPES
        .iter()
        .find(|(name, _)| *name == sample_type)
        .map(|&(_, len)| len)
        .ok_or_else(|| Error::MalformedImage(format!("unsupported type {sample_type:?}")))?;

    let count = sizes.iter().product::<usize>();
    let payload = &bytes[header_end..];
    if payload.len() < count * sample_len {
        return Err(Error::MalformedImage(format!(
            "payload holds {} bytes, sizes {:?} require {}",
            payload.len(),
            sizes,
            count * sample_len
        )));
    }
    let data = decode_samples(payload, &sample_type, count);

    if spacings.is_empty() && !directions.is_empty() {
        // Per-axis step length; any rotation in the frame is dropped.
        spacings = directions.iter().map(|dir| dir.length()).collect();
    }
    spacings.resize(3, 1.0);
    let spacing = DVec3::new(spacings[0], spacings[1], spacings[2]);
    // Fastest axis first in the file, slowest first in memory.
    sizes.reverse();

    log::debug!(
        "read {:?} {} image from {}",
        sizes,
        sample_type,
        path.display()
    );

    Ok(ScanImage {
        dims: sizes,
        origin,
        spacing,
        data,
    })
}

/// Writes a [`ScanImage`] as a little-endian raw-encoded `float` NRRD.
pub fn write_scan_image(path: &Path, image: &ScanImage) -> Result<()> {
    let mut sizes = image.dims.clone();
    sizes.reverse();

    let mut out = BufWriter::new(fs::File::create(path)?);
    writeln!(out, "NRRD0004")?;
    writeln!(out, "type: float")?;
    writeln!(out, "dimension: {}", sizes.len())?;
    writeln!(
        out,
        "sizes: {}",
        sizes
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    // One spacing per axis, fastest first, matching the sizes list.
    let spacing = [image.spacing.x, image.spacing.y, image.spacing.z];
    writeln!(
        out,
        "spacings: {}",
        spacing[..sizes.len()]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    writeln!(
        out,
        "space origin: ({},{},{})",
        image.origin.x, image.origin.y, image.origin.z
    )?;
    writeln!(out, "encoding: raw")?;
    writeln!(out, "endian: little")?;
    writeln!(out)?;
    for value in &image.data {
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Writes a triangle mesh as binary STL.
pub fn write_stl(path: &Path, mesh: &TriangleMesh) -> Result<()> {
    let mut out = Vec::with_capacity(84 + mesh.triangles.len() * 50);

    let mut header = [0u8; 80];
    let name = b"scanvox";
    header[..name.len()].copy_from_slice(name);
    out.extend_from_slice(&header);
    out.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());

    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| Vec3::from_array(mesh.positions[i as usize]));
        let normal = (b - a).cross(c - a).normalize_or_zero();

        for v in [normal, a, b, c] {
            out.extend_from_slice(&v.x.to_le_bytes());
            out.extend_from_slice(&v.y.to_le_bytes());
            out.extend_from_slice(&v.z.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    fs::write(path, out)?;
    Ok(())
}

/// Writes a quad mesh as Wavefront OBJ, keeping the quads intact.
pub fn write_obj(path: &Path, mesh: &QuadMesh) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for [x, y, z] in &mesh.positions {
        writeln!(out, "v {x} {y} {z}")?;
    }
    for [a, b, c, d] in &mesh.quads {
        // OBJ indices are 1-based.
        writeln!(out, "f {} {} {} {}", a + 1, b + 1, c + 1, d + 1)?;
    }
    out.flush()?;
    Ok(())
}

/// The byte offset of the data payload: one past the first blank line.
fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|i| i + 2)
        .or_else(|| {
            bytes
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .map(|i| i + 4)
        })
}

fn parse_vector(value: &str) -> Result<DVec3> {
    let inner = value
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let parts = inner
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|_| Error::MalformedImage(format!("bad vector {value:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    if parts.len() != 3 {
        return Err(Error::MalformedImage(format!("bad vector {value:?}")));
    }
    Ok(DVec3::new(parts[0], parts[1], parts[2]))
}

fn decode_samples(payload: &[u8], sample_type: &str, count: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(count);
    match sample_type {
        "double" => {
            for chunk in payload.chunks_exact(8).take(count) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                data.push(f64::from_le_bytes(raw) as f32);
            }
        }
        "short" | "signed short" => {
            for chunk in payload.chunks_exact(2).take(count) {
                data.push(i16::from_le_bytes([chunk[0], chunk[1]]) as f32);
            }
        }
        "ushort" | "unsigned short" => {
            for chunk in payload.chunks_exact(2).take(count) {
                data.push(u16::from_le_bytes([chunk[0], chunk[1]]) as f32);
            }
        }
        _ => {
            for chunk in payload.chunks_exact(4).take(count) {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                data.push(f32::from_le_bytes(raw));
            }
        }
    }
    data
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
