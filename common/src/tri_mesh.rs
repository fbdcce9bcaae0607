use std::{f32::consts::TAU, path::Path};

use anyhow::{bail, Context};
use glam::{Vec2, Vec3, Vec4};
use gltf::mesh::util::ReadIndices;

use crate::mesh_vert::MeshVert;

/// Indexed triangle soup, as loaded from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub verts: Box<[Vec4]>,
    pub normals: Box<[Vec4]>,
    pub uvs: Box<[Vec2]>,
    pub indices: Box<[u32]>,
}

impl TriMesh {
    /// Load by file extension, either glTF (`.gltf`, `.glb`) or Wavefront (`.obj`)
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("gltf" | "glb") => Self::from_gltf(path),
            Some("obj") => Self::from_obj(path),
            _ => bail!("Unsupported mesh format {path:?}"),
        }
    }

    /// First primitive of the first mesh in the document
    pub fn from_gltf(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let (doc, buffers, _) = gltf::import(&path)
            .with_context(|| format!("Failed to import {:?}", path.as_ref()))?;

        let mesh = doc.meshes().next().context("Document contains no meshes")?;
        let p = mesh
            .primitives()
            .next()
            .context("Mesh contains no primitives")?;

        let reader = p.reader(|buffer| Some(&buffers[buffer.index()]));
        let verts: Box<[Vec4]> = reader
            .read_positions()
            .context("Primitive has no positions")?
            .map(|[x, y, z]| Vec4::new(x, y, z, 1.0))
            .collect();

        let indices = match reader.read_indices() {
            Some(ReadIndices::U8(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U16(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U32(iter)) => iter.collect(),
            None => (0..verts.len() as u32).collect(),
        };

        let uvs = match reader.read_tex_coords(0) {
            Some(uvs) => uvs.into_f32().map(Vec2::from).collect(),
            None => vec![Vec2::ZERO; verts.len()].into(),
        };

        let mut tri_mesh = TriMesh {
            normals: Box::new([]),
            uvs,
            indices,
            verts,
        };

        tri_mesh.normals = match reader.read_normals() {
            Some(norm_iter) => norm_iter
                .map(|[x, y, z]| Vec4::new(x, y, z, 0.0))
                .collect(),
            None => tri_mesh.compute_normals(),
        };

        Ok(tri_mesh)
    }

    /// Polygons are fan triangulated. Attributes are taken per position, ignoring per-corner normal/uv indices.
    pub fn from_obj(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let obj = obj::Obj::load(&path)
            .with_context(|| format!("Failed to load {:?}", path.as_ref()))?;
        let data = obj.data;

        let mut normals = vec![Vec4::ZERO; data.position.len()];
        let mut uvs = vec![Vec2::ZERO; data.position.len()];
        let mut indices = Vec::new();

        for poly in data
            .objects
            .iter()
            .flat_map(|o| &o.groups)
            .flat_map(|g| &g.polys)
        {
            for corner in &poly.0 {
                if let Some(t) = corner.1.and_then(|t| data.texture.get(t)) {
                    uvs[corner.0] = Vec2::from(*t);
                }
                if let Some(n) = corner.2.and_then(|n| data.normal.get(n)) {
                    normals[corner.0] = Vec3::from(*n).extend(0.0);
                }
            }

            for i in 1..poly.0.len().saturating_sub(1) {
                indices.push(poly.0[0].0 as u32);
                indices.push(poly.0[i].0 as u32);
                indices.push(poly.0[i + 1].0 as u32);
            }
        }

        let mut tri_mesh = TriMesh {
            verts: data
                .position
                .iter()
                .map(|&p| Vec3::from(p).extend(1.0))
                .collect(),
            normals: normals.into(),
            uvs: uvs.into(),
            indices: indices.into(),
        };

        if data.normal.is_empty() {
            tri_mesh.normals = tri_mesh.compute_normals();
        }

        Ok(tri_mesh)
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, v: usize) -> Vec3 {
        self.verts[v].truncate()
    }

    /// Area weighted average of the normals of every face around each vertex
    pub fn compute_normals(&self) -> Box<[Vec4]> {
        let mut normals = vec![Vec3::ZERO; self.verts.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.position(i as usize));
            // Unnormalised cross product is proportional to area
            let n = (b - a).cross(c - a);
            for &i in tri {
                normals[i as usize] += n;
            }
        }

        normals
            .into_iter()
            .map(|n| n.normalize_or_zero().extend(0.0))
            .collect()
    }

    pub fn mesh_verts(&self) -> Vec<MeshVert> {
        (0..self.verts.len())
            .map(|i| {
                MeshVert::new(
                    self.position(i),
                    self.normals.get(i).map(|n| n.truncate()).unwrap_or_default(),
                    self.uvs.get(i).copied().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Closed torus around the z axis with `rings * segments * 2` triangles.
    pub fn torus(major_radius: f32, minor_radius: f32, rings: usize, segments: usize) -> Self {
        let mut verts = Vec::with_capacity(rings * segments);
        let mut normals = Vec::with_capacity(rings * segments);
        let mut uvs = Vec::with_capacity(rings * segments);

        for r in 0..rings {
            let u = r as f32 / rings as f32;
            let (su, cu) = (u * TAU).sin_cos();
            for s in 0..segments {
                let v = s as f32 / segments as f32;
                let (sv, cv) = (v * TAU).sin_cos();

                let normal = Vec3::new(cu * cv, su * cv, sv);
                let center = Vec3::new(cu, su, 0.0) * major_radius;

                verts.push((center + normal * minor_radius).extend(1.0));
                normals.push(normal.extend(0.0));
                uvs.push(Vec2::new(u, v));
            }
        }

        let mut indices = Vec::with_capacity(rings * segments * 6);
        for r in 0..rings {
            for s in 0..segments {
                let i = |r: usize, s: usize| ((r % rings) * segments + (s % segments)) as u32;

                let (a, b, c, d) = (i(r, s), i(r + 1, s), i(r + 1, s + 1), i(r, s + 1));

                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }

        TriMesh {
            verts: verts.into(),
            normals: normals.into(),
            uvs: uvs.into(),
            indices: indices.into(),
        }
    }

    /// Closed sphere from latitude and longitude lines. The poles are triangle fans.
    pub fn uv_sphere(radius: f32, latitudes: usize, longitudes: usize) -> Self {
        let latitudes = latitudes.max(2);
        let longitudes = longitudes.max(3);

        let mut verts = vec![Vec4::new(0.0, 0.0, radius, 1.0)];
        let mut uvs = vec![Vec2::new(0.5, 0.0)];

        for lat in 1..latitudes {
            let v = lat as f32 / latitudes as f32;
            let (st, ct) = (v * TAU * 0.5).sin_cos();
            for lon in 0..longitudes {
                let u = lon as f32 / longitudes as f32;
                let (sp, cp) = (u * TAU).sin_cos();

                verts.push((Vec3::new(st * cp, st * sp, ct) * radius).extend(1.0));
                uvs.push(Vec2::new(u, v));
            }
        }

        verts.push(Vec4::new(0.0, 0.0, -radius, 1.0));
        uvs.push(Vec2::new(0.5, 1.0));

        let ring = |lat: usize, lon: usize| (1 + lat * longitudes + lon % longitudes) as u32;
        let south = (verts.len() - 1) as u32;

        let mut indices = Vec::new();
        for lon in 0..longitudes {
            indices.extend_from_slice(&[0, ring(0, lon), ring(0, lon + 1)]);
        }
        for lat in 0..latitudes - 2 {
            for lon in 0..longitudes {
                let (a, b, c, d) = (
                    ring(lat, lon),
                    ring(lat + 1, lon),
                    ring(lat + 1, lon + 1),
                    ring(lat, lon + 1),
                );
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
        for lon in 0..longitudes {
            indices.extend_from_slice(&[
                ring(latitudes - 2, lon),
                south,
                ring(latitudes - 2, lon + 1),
            ]);
        }

        let normals = verts
            .iter()
            .map(|v| v.truncate().normalize_or_zero().extend(0.0))
            .collect();

        TriMesh {
            verts: verts.into(),
            normals,
            uvs: uvs.into(),
            indices: indices.into(),
        }
    }

    /// Flat open grid in the xy plane with `width * height * 2` triangles.
    pub fn grid_plane(width: usize, height: usize) -> Self {
        let mut verts = Vec::with_capacity((width + 1) * (height + 1));
        let mut uvs = Vec::with_capacity((width + 1) * (height + 1));

        for y in 0..=height {
            for x in 0..=width {
                verts.push(Vec4::new(x as f32, y as f32, 0.0, 1.0));
                uvs.push(Vec2::new(x as f32 / width as f32, y as f32 / height as f32));
            }
        }

        let i = |x: usize, y: usize| (y * (width + 1) + x) as u32;
        let mut indices = Vec::with_capacity(width * height * 6);
        for y in 0..height {
            for x in 0..width {
                indices.extend_from_slice(&[
                    i(x, y),
                    i(x + 1, y),
                    i(x + 1, y + 1),
                    i(x, y),
                    i(x + 1, y + 1),
                    i(x, y + 1),
                ]);
            }
        }

        TriMesh {
            normals: vec![Vec4::Z; verts.len()].into(),
            verts: verts.into(),
            uvs: uvs.into(),
            indices: indices.into(),
        }
    }
}
