//! Level file format.
//!
//! One file per level, named `<prefix>_<level>.lod`:
//!
//! | section | content |
//! |---|---|
//! | header | magic `LODG`, cluster count, group count, vertex count (16 bytes) |
//! | cluster records | [`DiskClusterRecord`] per cluster (32 bytes each) |
//! | vertex block | `[f32; 3]` per vertex, three vertices per triangle, cluster after cluster |
//!
//! Numbers are stored in native byte order. Groups are not stored, the runtime rebuilds them from
//! the source and destination group of each cluster.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use bytemuck::{Pod, Zeroable};

use crate::*;

pub const LOD_LEVEL_MAGIC: [u8; 4] = *b"LODG";
pub const LOD_LEVEL_FILE_EXTENSION: &str = "lod";

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DiskLevelHeader {
  pub magic: [u8; 4],
  pub cluster_count: u32,
  pub group_count: u32,
  pub vertex_count: u32,
}

/// group index -1 means none
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DiskClusterRecord {
  pub vertex_offset: u32,
  pub vertex_count: u32,
  pub source_group: i32,
  pub destination_group: i32,
  pub bounding: [f32; 4],
}

fn group_to_disk(group: Option<u32>) -> i32 {
  group.map_or(-1, |g| g as i32)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiskCluster {
  /// range in the level vertex block
  pub vertices: OffsetSize,
  pub source_group: Option<u32>,
  pub destination_group: Option<u32>,
  pub bounding: BoundingSphere,
}

impl DiskCluster {
  pub fn vertex_count(&self) -> u32 {
    self.vertices.size
  }

  pub fn triangle_count(&self) -> u32 {
    self.vertices.size / 3
  }
}

#[derive(Clone, Debug)]
pub struct DiskLevel {
  pub header: DiskLevelHeader,
  pub clusters: Vec<DiskCluster>,
  pub vertices: Vec<Vec3>,
}

impl DiskLevel {
  pub fn cluster_vertices(&self, cluster: &DiskCluster) -> &[Vec3] {
    &self.vertices[cluster.vertices.into_range()]
  }
}

pub fn level_file_path(prefix: &Path, level: usize) -> PathBuf {
  let mut name = prefix.as_os_str().to_owned();
  name.push(format!("_{level}.{LOD_LEVEL_FILE_EXTENSION}"));
  PathBuf::from(name)
}

pub fn write_level(writer: &mut impl Write, level: &LodLevel) -> io::Result<()> {
  let mut ranges = OffsetSizeBufferBuilder::with_capacity(level.clusters.len());
  for cluster in &level.clusters {
    ranges.push_size(cluster.triangles.len() as u32 * 3);
  }
  let vertex_count = ranges.total_size();

  let records: Vec<DiskClusterRecord> = level
    .clusters
    .iter()
    .zip(ranges.finish())
    .map(|(cluster, range)| DiskClusterRecord {
      vertex_offset: range.offset,
      vertex_count: range.size,
      source_group: group_to_disk(cluster.source_group),
      destination_group: group_to_disk(cluster.destination_group),
      bounding: cluster.bounding.to_array(),
    })
    .collect();

  let vertices: Vec<[f32; 3]> = level
    .clusters
    .iter()
    .flat_map(|cluster| cluster.triangles.iter())
    .flat_map(|triangle| level.mesh.triangle_positions(*triangle))
    .map(|position| position.to_array())
    .collect();

  let header = DiskLevelHeader {
    magic: LOD_LEVEL_MAGIC,
    cluster_count: records.len() as u32,
    group_count: level.groups.len() as u32,
    vertex_count,
  };

  writer.write_all(bytemuck::bytes_of(&header))?;
  writer.write_all(bytemuck::cast_slice(&records))?;
  writer.write_all(bytemuck::cast_slice(&vertices))?;
  Ok(())
}

/// Read exactly `len` bytes. The buffer only grows with the data actually present, so a corrupt
/// count can not trigger a huge allocation.
fn read_section(
  reader: &mut impl Read,
  len: usize,
  level: usize,
  section: &'static str,
) -> Result<Vec<u8>, LodFileError> {
  let mut buffer = Vec::new();
  reader
    .by_ref()
    .take(len as u64)
    .read_to_end(&mut buffer)
    .map_err(|source| LodFileError::Io { level, source })?;

  if buffer.len() < len {
    return Err(LodFileError::Truncated {
      level,
      section,
      expected: len,
    });
  }
  Ok(buffer)
}

fn read_pod_array<T: Pod>(bytes: &[u8]) -> Vec<T> {
  bytes
    .chunks_exact(std::mem::size_of::<T>())
    .map(bytemuck::pod_read_unaligned)
    .collect()
}

pub fn read_level(reader: &mut impl Read, level: usize) -> Result<DiskLevel, LodFileError> {
  let magic = read_section(reader, LOD_LEVEL_MAGIC.len(), level, "magic tag")?;
  if magic != LOD_LEVEL_MAGIC {
    let mut found = [0; 4];
    found.copy_from_slice(&magic);
    return Err(LodFileError::BadMagic { level, found });
  }

  let mut header = DiskLevelHeader::zeroed();
  let counts = read_section(
    reader,
    std::mem::size_of::<DiskLevelHeader>() - LOD_LEVEL_MAGIC.len(),
    level,
    "header",
  )?;
  bytemuck::bytes_of_mut(&mut header)[LOD_LEVEL_MAGIC.len()..].copy_from_slice(&counts);
  header.magic = LOD_LEVEL_MAGIC;

  let record_bytes = read_section(
    reader,
    header.cluster_count as usize * std::mem::size_of::<DiskClusterRecord>(),
    level,
    "cluster records",
  )?;
  let records: Vec<DiskClusterRecord> = read_pod_array(&record_bytes);

  let vertex_bytes = read_section(
    reader,
    header.vertex_count as usize * std::mem::size_of::<[f32; 3]>(),
    level,
    "vertex block",
  )?;
  let vertices = read_pod_array::<[f32; 3]>(&vertex_bytes)
    .into_iter()
    .map(Vec3::from_array)
    .collect();

  let clusters = records
    .iter()
    .enumerate()
    .map(|(index, record)| disk_cluster(record, index as u32, &header, level))
    .collect::<Result<_, _>>()?;

  Ok(DiskLevel {
    header,
    clusters,
    vertices,
  })
}

fn disk_cluster(
  record: &DiskClusterRecord,
  cluster: u32,
  header: &DiskLevelHeader,
  level: usize,
) -> Result<DiskCluster, LodFileError> {
  let corrupt = |reason| LodFileError::CorruptCluster {
    level,
    cluster,
    reason,
  };

  let end = record.vertex_offset as u64 + record.vertex_count as u64;
  if end > header.vertex_count as u64 {
    return Err(corrupt("vertex range is outside the vertex block"));
  }
  if record.vertex_count % 3 != 0 {
    return Err(corrupt("vertex count is not a whole number of triangles"));
  }

  let group_from_disk = |group: i32| match group {
    -1 => Ok(None),
    g if g < 0 => Err(corrupt("negative group index")),
    g => Ok(Some(g as u32)),
  };
  let source_group = group_from_disk(record.source_group)?;
  let destination_group = group_from_disk(record.destination_group)?;

  if let Some(group) = destination_group {
    if group >= header.group_count {
      return Err(LodFileError::DanglingGroup {
        level,
        cluster,
        group,
        group_count: header.group_count,
      });
    }
  }

  Ok(DiskCluster {
    vertices: OffsetSize {
      offset: record.vertex_offset,
      size: record.vertex_count,
    },
    source_group,
    destination_group,
    bounding: BoundingSphere::from_array(record.bounding),
  })
}

/// Write every level to `<prefix>_<level>.lod`, returning the written paths.
pub fn write_lod_graph(prefix: &Path, graph: &LodGraph) -> Result<Vec<PathBuf>, LodFileError> {
  graph
    .levels
    .iter()
    .enumerate()
    .map(|(level_index, level)| {
      let path = level_file_path(prefix, level_index);
      let file = File::create(&path).map_err(|source| LodFileError::Open {
        level: level_index,
        path: path.clone(),
        source,
      })?;

      let mut writer = BufWriter::new(file);
      write_level(&mut writer, level)
        .and_then(|_| writer.flush())
        .map_err(|source| LodFileError::Io {
          level: level_index,
          source,
        })?;

      log::debug!("lod level {level_index} written to {path:?}");
      Ok(path)
    })
    .collect()
}

/// Read `<prefix>_0.lod`, `<prefix>_1.lod` and so on until the next file does not exist.
pub fn read_levels(prefix: &Path) -> Result<Vec<DiskLevel>, LodFileError> {
  let mut levels = Vec::new();
  loop {
    let level = levels.len();
    let path = level_file_path(prefix, level);
    let file = match File::open(&path) {
      Ok(file) => file,
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        if level == 0 {
          return Err(LodFileError::NoLevels {
            prefix: prefix.to_path_buf(),
          });
        }
        break;
      }
      Err(source) => return Err(LodFileError::Open { level, path, source }),
    };

    levels.push(read_level(&mut BufReader::new(file), level)?);
  }
  Ok(levels)
}

impl LodGraph {
  pub fn write_to_files(&self, prefix: impl AsRef<Path>) -> Result<Vec<PathBuf>, LodGraphBuildError> {
    write_lod_graph(prefix.as_ref(), self).map_err(|source| LodGraphBuildError::Serialization {
      level: source.level(),
      source,
    })
  }
}

#[cfg(test)]
mod test {
  use lod_mesh_test_util::*;

  use super::*;

  /// 3 clusters of 2, 3 and 4 triangles cut from a quad strip
  fn three_cluster_level() -> LodLevel {
    let strip = quad_strip(5);
    let mesh = MeshBufferSource {
      positions: strip.positions,
      indices: strip.indices[..27].to_vec(),
    };

    let clusters = [0..2, 2..5, 5..9]
      .into_iter()
      .enumerate()
      .map(|(i, triangles)| {
        let triangles: Vec<u32> = triangles.collect();
        let bounding =
          BoundingSphere::from_points(triangles.iter().flat_map(|t| mesh.triangle_positions(*t)));
        LodCluster {
          triangles,
          adjacency: AdjacencyWeights::new(),
          bounding,
          source_group: (i > 0).then(|| i as u32 - 1),
          destination_group: Some(0),
        }
      })
      .collect();

    LodLevel {
      mesh,
      clusters,
      groups: vec![LodClusterGroup {
        clusters: vec![0, 1, 2],
        adjacency: AdjacencyWeights::new(),
        produced_clusters: vec![],
        simplification_error: 0.,
      }],
    }
  }

  fn encode(level: &LodLevel) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_level(&mut bytes, level).unwrap();
    bytes
  }

  #[test]
  fn record_layout() {
    assert_eq!(std::mem::size_of::<DiskLevelHeader>(), 16);
    assert_eq!(std::mem::size_of::<DiskClusterRecord>(), 32);
  }

  #[test]
  fn three_clusters_read_back() {
    let level = three_cluster_level();
    let bytes = encode(&level);
    assert_eq!(bytes.len(), 16 + 3 * 32 + 27 * 12);

    let disk = read_level(&mut bytes.as_slice(), 1).unwrap();
    assert_eq!(disk.header.cluster_count, 3);
    assert_eq!(disk.header.group_count, 1);
    assert_eq!(disk.header.vertex_count, 27);

    for (cluster, (read, written)) in disk.clusters.iter().zip(&level.clusters).enumerate() {
      assert_eq!(read.vertex_count(), 3 * written.triangles.len() as u32);
      assert_eq!(read.source_group, written.source_group, "cluster {cluster}");
      assert_eq!(read.destination_group, written.destination_group);
      assert_eq!(read.bounding, written.bounding);

      let expected: Vec<Vec3> = written
        .triangles
        .iter()
        .flat_map(|t| level.mesh.triangle_positions(*t))
        .collect();
      assert_eq!(disk.cluster_vertices(read), expected.as_slice());
    }
  }

  #[test]
  fn bad_magic_is_fatal() {
    let mut bytes = encode(&three_cluster_level());
    bytes[0] = b'X';
    let err = read_level(&mut bytes.as_slice(), 2).unwrap_err();
    assert!(matches!(
      err,
      LodFileError::BadMagic {
        level: 2,
        found: [b'X', b'O', b'D', b'G']
      }
    ));
  }

  #[test]
  fn truncation_is_fatal() {
    let bytes = encode(&three_cluster_level());

    let err = read_level(&mut &bytes[..10], 0).unwrap_err();
    assert!(matches!(
      err,
      LodFileError::Truncated {
        section: "header",
        ..
      }
    ));

    let err = read_level(&mut &bytes[..16 + 40], 0).unwrap_err();
    assert!(matches!(
      err,
      LodFileError::Truncated {
        section: "cluster records",
        expected: 96,
        ..
      }
    ));

    let err = read_level(&mut &bytes[..bytes.len() - 1], 3).unwrap_err();
    assert!(matches!(
      err,
      LodFileError::Truncated {
        level: 3,
        section: "vertex block",
        ..
      }
    ));
  }

  #[test]
  fn corrupt_records_are_rejected() {
    let level = three_cluster_level();

    let mut bytes = encode(&level);
    // vertex count of the second record
    bytes[16 + 32 + 4..16 + 32 + 8].copy_from_slice(&1000u32.to_ne_bytes());
    let err = read_level(&mut bytes.as_slice(), 0).unwrap_err();
    assert!(matches!(err, LodFileError::CorruptCluster { cluster: 1, .. }));

    let mut bytes = encode(&level);
    // destination group of the first record
    bytes[16 + 12..16 + 16].copy_from_slice(&5i32.to_ne_bytes());
    let err = read_level(&mut bytes.as_slice(), 0).unwrap_err();
    assert!(matches!(
      err,
      LodFileError::DanglingGroup {
        cluster: 0,
        group: 5,
        group_count: 1,
        ..
      }
    ));
  }

  #[test]
  fn missing_first_level_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_levels(&dir.path().join("mesh")).unwrap_err();
    assert!(matches!(err, LodFileError::NoLevels { .. }));
    assert_eq!(err.level(), 0);
  }

  #[test]
  fn level_files_are_numbered() {
    let path = level_file_path(Path::new("out/bunny"), 3);
    assert_eq!(path, PathBuf::from("out/bunny_3.lod"));
  }
}
