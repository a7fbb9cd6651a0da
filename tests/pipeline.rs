//! End-to-end runs of both conversion flows, including file emission.

use approx::assert_relative_eq;
use glam::DVec3;

use scanvox::{
    read_scan_image, GridAdapter, GridClass, Pipeline, PipelineConfig, ProductConfig, ScanImage,
    SparseEngine, Thresholds,
};

use std::path::PathBuf;

const RADIUS: f64 = 8.0;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scanvox-e2e-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A soft-shelled ball of raw value 3000 in a zero background, so
/// densities ramp smoothly through the isosurface.
fn sphere_phantom(n: usize, spacing: DVec3) -> ScanImage {
    let center = (n as f64 - 1.0) / 2.0;
    let mut data = vec![0.0f32; n * n * n];
    let mut linear = 0;
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let d = ((x as f64 - center).powi(2)
                    + (y as f64 - center).powi(2)
                    + (z as f64 - center).powi(2))
                .sqrt();
                let density = ((RADIUS - d + 1.0) / 2.0).clamp(0.0, 1.0);
                data[linear] = (3000.0 * density) as f32;
                linear += 1;
            }
        }
    }
    ScanImage {
        dims: vec![n, n, n],
        origin: DVec3::ZERO,
        spacing,
        data,
    }
}

fn ct_config() -> PipelineConfig {
    PipelineConfig {
        iso_value: 1500.0,
        thresholds: Thresholds::new(1000.0, 3000.0),
        creator: "scanvox-tests".to_owned(),
        fog_volume: ProductConfig {
            name: "fog_volume".to_owned(),
            ..Default::default()
        },
        level_set: ProductConfig {
            name: "level_set".to_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn full_run_emits_every_requested_product() {
    let dir = scratch_dir("products");
    let mut config = ct_config();
    config.fog_volume.grid_path = Some(dir.join("fog.svox"));
    config.fog_volume.mesh_path = Some(dir.join("fog.obj"));
    config.level_set.grid_path = Some(dir.join("sdf.svox"));
    config.level_set.image_path = Some(dir.join("sdf.nrrd"));
    config.level_set.mesh_path = Some(dir.join("sdf.stl"));

    let mut pipeline = Pipeline::new(SparseEngine, config);
    pipeline.run(&sphere_phantom(24, DVec3::ONE)).unwrap();

    for name in ["fog.svox", "fog.obj", "sdf.svox", "sdf.nrrd", "sdf.stl"] {
        let path = dir.join(name);
        assert!(path.is_file(), "{name} was not written");
        assert!(std::fs::metadata(&path).unwrap().len() > 0, "{name} is empty");
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn written_grids_survive_a_read_back() {
    let dir = scratch_dir("read-back");
    let path = dir.join("both.svox");

    let mut pipeline = Pipeline::new(SparseEngine, ct_config());
    pipeline.run(&sphere_phantom(24, DVec3::ONE)).unwrap();

    let adapter = pipeline.adapter();
    let fog = pipeline.fog_volume().unwrap();
    let sdf = pipeline.level_set().unwrap();
    adapter.write(&[fog, sdf], &path).unwrap();

    let restored = adapter.read(&path).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(adapter.grid_class(&restored[0]), GridClass::FogVolume);
    assert_eq!(adapter.grid_name(&restored[0]), "fog_volume");
    assert_eq!(adapter.grid_class(&restored[1]), GridClass::LevelSet);
    assert_eq!(adapter.grid_name(&restored[1]), "level_set");

    // Values and metadata come back intact.
    assert_eq!(adapter.probe(&restored[0], [11, 11, 11]), 1.0);
    let meta = adapter.metadata(&restored[1]);
    assert_eq!(meta["spacing"].as_dvec3(), Some(DVec3::ONE));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn single_grid_writes_match_one_element_lists() {
    let dir = scratch_dir("write-equivalence");
    let single = dir.join("single.svox");
    let listed = dir.join("listed.svox");

    let mut pipeline = Pipeline::new(SparseEngine, ct_config());
    pipeline
        .run_fog_volume(&sphere_phantom(16, DVec3::ONE))
        .unwrap();
    let adapter = pipeline.adapter();
    let fog = pipeline.fog_volume().unwrap();

    adapter.write_grid(fog, &single).unwrap();
    adapter.write(&[fog], &listed).unwrap();
    assert_eq!(
        std::fs::read(&single).unwrap(),
        std::fs::read(&listed).unwrap()
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn both_meshes_sit_on_the_phantom_surface() {
    let spacing = DVec3::new(0.5, 0.5, 1.0);
    let mut pipeline = Pipeline::new(SparseEngine, ct_config());
    pipeline.run(&sphere_phantom(24, spacing)).unwrap();
    let adapter = pipeline.adapter();

    let center = DVec3::new(11.5 * spacing.x, 11.5 * spacing.y, 11.5 * spacing.z);
    let iso = pipeline.rescaled_iso_value().unwrap() as f32;

    let fog_mesh = adapter
        .volume_to_mesh(pipeline.fog_volume().unwrap(), iso, 0.0)
        .unwrap();
    let sdf_mesh = adapter
        .volume_to_mesh(pipeline.level_set().unwrap(), 0.0, 0.0)
        .unwrap();
    assert!(!fog_mesh.is_empty());
    assert!(!sdf_mesh.is_empty());

    // The phantom surface is an ellipsoid in world space; measure radial
    // error in index space where it is a sphere of radius 8.
    for mesh in [&fog_mesh, &sdf_mesh] {
        for p in &mesh.positions {
            let r = ((p[0] as f64 - center.x) / spacing.x).powi(2)
                + ((p[1] as f64 - center.y) / spacing.y).powi(2)
                + ((p[2] as f64 - center.z) / spacing.z).powi(2);
            let error = (r.sqrt() - RADIUS).abs();
            assert!(error < 1.5, "vertex {p:?} is {error} voxels off the surface");
        }
    }
}

#[test]
fn level_set_image_round_trips_through_nrrd() {
    let dir = scratch_dir("nrrd");
    let path = dir.join("sdf.nrrd");
    let mut config = ct_config();
    config.level_set.image_path = Some(path.clone());

    let origin = DVec3::new(-5.0, 3.0, 12.0);
    let mut image = sphere_phantom(16, DVec3::splat(0.75));
    image.origin = origin;

    let mut pipeline = Pipeline::new(SparseEngine, config);
    pipeline.run(&image).unwrap();

    let restored = read_scan_image(&path).unwrap();
    assert_eq!(restored.dims, vec![16, 16, 16]);
    assert_eq!(restored.origin, origin);
    assert_eq!(restored.spacing, DVec3::splat(0.75));
    // Center of the ball is inside, so its distance is negative.
    let center = (8 * 16 + 8) * 16 + 8;
    assert!(restored.data[center] < 0.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn isovalue_rescaling_is_consistent_between_flows() {
    let mut pipeline = Pipeline::new(SparseEngine, ct_config());
    pipeline.run(&sphere_phantom(20, DVec3::ONE)).unwrap();
    assert_relative_eq!(pipeline.rescaled_iso_value().unwrap(), 0.25);

    let adapter = pipeline.adapter();
    let fog = pipeline.fog_volume().unwrap();
    let sdf = pipeline.level_set().unwrap();
    // Where the fog density crosses 0.25, the signed distance crosses 0:
    // walking along the center row, both grids flip on the same step.
    let mut fog_flip = None;
    let mut sdf_flip = None;
    for x in 0..20 {
        if fog_flip.is_none() && adapter.probe(fog, [x, 9, 9]) > 0.25 {
            fog_flip = Some(x);
        }
        if sdf_flip.is_none() && adapter.probe(sdf, [x, 9, 9]) < 0.0 {
            sdf_flip = Some(x);
        }
    }
    assert_eq!(fog_flip, sdf_flip);
}

#[test]
fn low_rank_images_convert_without_axis_swapping() {
    // A 2D image pads to a depth-1 volume; there is no depth axis to
    // reconcile, so index (x, y) matches the native (row, column) layout
    // reversed only by the canonical convention.
    let mut data = vec![0.0f32; 9 * 9];
    for y in 0..9 {
        for x in 0..9 {
            let d = ((x as f64 - 4.0).powi(2) + (y as f64 - 4.0).powi(2)).sqrt();
            if d < 3.0 {
                data[y * 9 + x] = 3000.0;
            }
        }
    }
    let image = ScanImage {
        dims: vec![9, 9],
        origin: DVec3::ZERO,
        spacing: DVec3::ONE,
        data,
    };

    let mut pipeline = Pipeline::new(SparseEngine, ct_config());
    pipeline.run_fog_volume(&image).unwrap();
    let adapter = pipeline.adapter();
    let fog = pipeline.fog_volume().unwrap();
    assert_eq!(adapter.probe(fog, [4, 4, 0]), 1.0);
    assert_eq!(adapter.probe(fog, [0, 0, 0]), 0.0);
}

#[test]
fn adapter_default_builds_the_sparse_backend() {
    let adapter: GridAdapter<SparseEngine> = GridAdapter::default();
    let volume = scanvox::PhysicalVolume::new(
        vec![0.0, 1.0, 0.5, 0.0],
        &[2, 2],
        DVec3::ZERO,
        DVec3::ONE,
    )
    .unwrap();
    let grid = adapter
        .fog_volume_from_array(&volume, "fog_volume", "scanvox-tests", 0.0)
        .unwrap();
    assert_eq!(adapter.grid_class(&grid), GridClass::FogVolume);
    assert_eq!(adapter.probe(&grid, [0, 1, 0]), 1.0);
}
