//! Runs configured from a TOML file on a Gmsh mesh.

use heatcond::{
  config::HeatConfig,
  mesh::{ElementKind, Mesh},
  pipeline::HeatConduction,
  region::RegionIndex,
  Error,
};

use std::path::PathBuf;

/// Unit square made of two triangles, inlet at x=0 and outlet at x=1.
const UNIT_SQUARE: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$PhysicalNames
3
1 1 \"inlet\"
1 2 \"outlet\"
2 3 \"domain\"
$EndPhysicalNames
$Entities
0 2 1 0
1 0 0 0 0 1 0 1 1 0
2 1 0 0 1 1 0 1 2 0
1 0 0 0 1 1 0 1 3 0
$EndEntities
$Nodes
1 4 1 4
2 1 0 4
1
2
3
4
0 0 0
1 0 0
1 1 0
0 1 0
$EndNodes
$Elements
3 4 1 4
1 1 1 1
1 4 1
1 2 1 1
2 2 3
2 1 2 2
3 1 2 3
4 1 3 4
$EndElements
";

fn temp_file(name: &str, contents: &str) -> PathBuf {
  let path = std::env::temp_dir().join(format!("heatcond-{}-{name}", std::process::id()));
  std::fs::write(&path, contents).unwrap();
  path
}

#[test]
fn physical_groups_become_regions() {
  let path = temp_file("square.msh", UNIT_SQUARE);
  let mesh = Mesh::load(&path).unwrap();
  std::fs::remove_file(&path).unwrap();

  assert_eq!(mesh.node_count(), 4);
  assert_eq!(mesh.dim(), 2);
  assert_eq!(mesh.dim_embedded(), 2);
  assert_eq!(mesh.ncells(), 2);
  assert_eq!(mesh.elements_of_type(ElementKind::Line).count(), 2);
  assert_eq!(mesh.max_coordinate(0), Some(1.0));

  let regions = RegionIndex::from_mesh(&mesh);
  assert_eq!(regions.len(), 3);
  let inlet = regions.lookup("inlet").unwrap();
  assert_eq!(inlet.nodes().iter().copied().collect::<Vec<_>>(), vec![0, 3]);
  assert_eq!(regions.lookup("domain").unwrap().elements().len(), 2);
}

#[test]
fn shuffled_node_tags_keep_their_coordinates() {
  let shuffled = UNIT_SQUARE.replace(
    "1\n2\n3\n4\n0 0 0\n1 0 0\n",
    "2\n1\n3\n4\n1 0 0\n0 0 0\n",
  );
  assert_ne!(shuffled, UNIT_SQUARE);
  let path = temp_file("shuffled.msh", &shuffled);
  let mesh = Mesh::load(&path).unwrap();
  std::fs::remove_file(&path).unwrap();

  let regions = RegionIndex::from_mesh(&mesh);
  let inlet = regions.lookup("inlet").unwrap();
  assert_eq!(inlet.nodes().iter().copied().collect::<Vec<_>>(), vec![1, 3]);

  let config = HeatConfig::default()
    .with_bc("inlet", 10.0)
    .with_bc("outlet", 35.0);
  let mut run = HeatConduction::new(config);
  run.with_mesh(mesh).unwrap();
  let field = run.run().unwrap();
  for (inode, expected) in [35.0, 10.0, 35.0, 10.0].into_iter().enumerate() {
    assert!((field.value_at(inode).unwrap() - expected).abs() < 1e-10);
  }
}

#[test]
fn missing_and_malformed_files_are_reported() {
  let err = Mesh::load("/nonexistent/square.msh").unwrap_err();
  assert!(matches!(err, Error::FileNotFound { .. }));

  let path = temp_file("broken.msh", "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n$Nodes\n1 2\n");
  let err = Mesh::load(&path).unwrap_err();
  std::fs::remove_file(&path).unwrap();
  assert!(matches!(err, Error::MeshFormat(_)));
}

#[test]
fn configured_run_solves_and_exports() {
  let mesh_path = temp_file("run.msh", UNIT_SQUARE);
  let output_path = std::env::temp_dir().join(format!("heatcond-{}-run.txt", std::process::id()));
  let config = format!(
    r#"
      mesh = "{}"
      output = "{}"

      [solver]
      mode = "iterative"
      tolerance = 1e-12

      [solver.fallback]
      mode = "direct"

      [[boundary_conditions]]
      region = "inlet"
      variable = "Temperature"
      value = 10.0

      [[boundary_conditions]]
      region = "outlet"
      variable = "Temperature"
      value = 35.0
    "#,
    mesh_path.display(),
    output_path.display()
  );
  let config_path = temp_file("run.toml", &config);

  let config = HeatConfig::from_file(&config_path).unwrap();
  let field = HeatConduction::new(config).run().unwrap();

  for (inode, expected) in [10.0, 35.0, 35.0, 10.0].into_iter().enumerate() {
    assert!((field.value_at(inode).unwrap() - expected).abs() < 1e-10);
  }
  let exported = std::fs::read_to_string(&output_path).unwrap();
  assert_eq!(exported.lines().count(), 4);

  for path in [mesh_path, output_path, config_path] {
    std::fs::remove_file(path).unwrap();
  }
}
