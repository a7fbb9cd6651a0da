use crate::error::GridError;
use crate::grid::{SparseGrid, CHUNK_SIZE};

use ahash::AHashMap;
use glam::{DVec3, IVec3};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use rkyv::{Archive, Deserialize, Serialize};
use scanvox_core::GridClass;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading bytes of a grid container file.
const MAGIC: &[u8; 8] = b"SVOXGRD1";

#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
struct ChunkRecord {
    coords: [i32; 3],
    values: Vec<f32>,
}

#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
struct GridRecord {
    name: String,
    creator: String,
    class: String,
    background: f32,
    shape: [u32; 3],
    origin: [f64; 3],
    spacing: [f64; 3],
    metadata: Vec<(String, String)>,
    chunks: Vec<ChunkRecord>,
}

impl GridRecord {
    fn from_grid(grid: &SparseGrid) -> Self {
        // Chunks are sorted so that identical grids always serialize to
        // identical bytes.
        let mut chunks: Vec<ChunkRecord> = grid
            .chunks()
            .iter()
            .map(|(coords, values)| ChunkRecord {
                coords: coords.to_array(),
                values: values.to_vec(),
            })
            .collect();
        chunks.sort_by_key(|chunk| chunk.coords);

        Self {
            name: grid.name().to_owned(),
            creator: grid.creator().to_owned(),
            class: grid.grid_class().as_str().to_owned(),
            background: grid.background(),
            shape: grid.shape(),
            origin: grid.origin().to_array(),
            spacing: grid.spacing().to_array(),
            metadata: grid
                .metadata()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            chunks,
        }
    }

    fn into_grid(self) -> Result<SparseGrid, GridError> {
        let mut chunks = AHashMap::with_capacity(self.chunks.len());
        for chunk in self.chunks {
            let values: Box<[f32; CHUNK_SIZE]> =
                chunk.values.into_boxed_slice().try_into().map_err(|_| {
                    GridError::Deserialize("chunk record has the wrong length".to_owned())
                })?;
            chunks.insert(IVec3::from_array(chunk.coords), values);
        }
        Ok(SparseGrid::from_parts(
            self.shape,
            DVec3::from_array(self.origin),
            DVec3::from_array(self.spacing),
            self.background,
            GridClass::from_name(&self.class),
            self.name,
            self.creator,
            self.metadata.into_iter().collect(),
            chunks,
        ))
    }
}

/// Serializes `grids`, in order, into a single container file at `path`.
///
/// Writing a slice of one grid produces exactly the same bytes as any
/// other way of writing that grid alone.
pub fn write_grids(grids: &[&SparseGrid], path: &Path) -> Result<(), GridError> {
    let records: Vec<GridRecord> = grids.iter().map(|g| GridRecord::from_grid(g)).collect();
    let bytes = rkyv::to_bytes::<_, 8192>(&records)
        .map_err(|e| GridError::Serialize(e.to_string()))?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    let mut encoder = FrameEncoder::new(writer);
    encoder.write_all(&bytes)?;
    let mut writer = encoder
        .finish()
        .map_err(|e| GridError::Serialize(e.to_string()))?;
    writer.flush()?;

    log::debug!("wrote {} grid(s) to {}", grids.len(), path.display());

    Ok(())
}

/// Restores every grid from a container file written by [`write_grids`].
pub fn read_grids(path: &Path) -> Result<Vec<SparseGrid>, GridError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(GridError::BadMagic);
    }

    let mut bytes = Vec::new();
    FrameDecoder::new(reader).read_to_end(&mut bytes)?;
    // rkyv validation wants the archive aligned.
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(&bytes);

    let records: Vec<GridRecord> = rkyv::from_bytes(&aligned)
        .map_err(|e| GridError::Deserialize(e.to_string()))?;
    records.into_iter().map(GridRecord::into_grid).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    use std::path::PathBuf;

    fn scratch_path(file: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scanvox-grid-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(file)
    }

    fn sample_grid() -> SparseGrid {
        let dense: Vec<f32> = (0..4096).map(|i| (i % 97) as f32 * 0.25).collect();
        let mut grid = SparseGrid::from_dense(
            &dense,
            [16, 16, 16],
            DVec3::new(-8.0, -8.0, -8.0),
            DVec3::new(0.5, 0.5, 1.0),
            0.0,
            0.0,
        )
        .unwrap();
        grid.set_grid_class(GridClass::FogVolume);
        grid.set_name("sample");
        grid.set_creator("scanvox-grid tests");
        grid.insert_metadata("study", "phantom-01");
        grid
    }

    #[test]
    fn container_round_trip() {
        let grid = sample_grid();
        let path = scratch_path("round_trip.svx");
        write_grids(&[&grid], &path).unwrap();

        let mut restored = read_grids(&path).unwrap();
        assert_eq!(restored.len(), 1);
        let restored = restored.pop().unwrap();

        assert_eq!(restored.shape(), grid.shape());
        assert_eq!(restored.origin(), grid.origin());
        assert_eq!(restored.spacing(), grid.spacing());
        assert_eq!(restored.background(), grid.background());
        assert_eq!(restored.grid_class(), GridClass::FogVolume);
        assert_eq!(restored.name(), "sample");
        assert_eq!(restored.creator(), "scanvox-grid tests");
        assert_eq!(restored.metadata(), grid.metadata());
        assert_eq!(restored.to_dense(), grid.to_dense());
    }

    #[test]
    fn multiple_grids_keep_their_order() {
        let mut first = sample_grid();
        first.set_name("first");
        let mut second = sample_grid();
        second.set_name("second");
        second.set_grid_class(GridClass::LevelSet);

        let path = scratch_path("ordered.svx");
        write_grids(&[&first, &second], &path).unwrap();

        let restored = read_grids(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].name(), "first");
        assert_eq!(restored[1].name(), "second");
        assert_eq!(restored[1].grid_class(), GridClass::LevelSet);
    }

    #[test]
    fn identical_writes_are_byte_identical() {
        let grid = sample_grid();
        let a = scratch_path("bytes_a.svx");
        let b = scratch_path("bytes_b.svx");
        write_grids(&[&grid], &a).unwrap();
        write_grids(&[&grid], &b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn rejects_foreign_files() {
        let path = scratch_path("not_a_container.svx");
        std::fs::write(&path, b"solid something-else").unwrap();
        assert!(matches!(read_grids(&path), Err(GridError::BadMagic)));
    }
}
