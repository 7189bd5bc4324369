use crate::bake::{BakeError, BakeSettings};
use crate::geom;
use nalgebra::{Matrix3, Matrix4, Point3, Vector2, Vector3};

/// Raw mesh data handed in by the scene provider: object-space vertices, a
/// triangle index list, the lightmap UV set (if the mesh has one) and the
/// world transform of the instance.
#[derive(Debug, Clone)]
pub struct MeshSource {
	pub positions: Vec<Vector3<f32>>,
	pub normals: Vec<Vector3<f32>>,
	pub lightmap_uvs: Option<Vec<Vector2<f32>>>,
	pub triangles: Vec<[u32; 3]>,
	pub transform: Matrix4<f32>
}

/// One raycastable triangle in world space, with its lightmap UVs.
#[derive(Debug, Clone)]
pub struct Triangle {
	pub positions: [Vector3<f32>; 3],
	pub normals: [Vector3<f32>; 3],
	pub uvs: [Vector2<f32>; 3]
}

impl Triangle {
	pub fn world_area(&self) -> f32 {
		geom::triangle_area(self.positions[0], self.positions[1], self.positions[2])
	}

	/// Face normal, or `None` for a degenerate triangle.
	pub fn face_normal(&self) -> Option<Vector3<f32>> {
		geom::triangle_normal(self.positions[0], self.positions[1], self.positions[2])
	}

	pub fn centroid(&self) -> Vector3<f32> {
		(self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
	}
}

/// A preprocessed surface: world-space triangles plus the raster it bakes
/// into. The raster is square; its side length is derived from the surface
/// area and the configured pixel density, clamped to the configured maximum.
#[derive(Debug, Clone)]
pub struct Surface {
	pub triangles: Vec<Triangle>,
	pub area: f32,
	pub size: u32
}

impl Surface {
	/// Builds a surface from raw mesh data. Returns `Ok(None)` when the mesh
	/// carries no lightmap UV set (the mesh is skipped with a warning).
	/// Non-finite UV components are replaced with zero and warned about.
	pub fn build(
		source: &MeshSource, settings: &BakeSettings, mesh: usize,
	) -> Result<Option<Surface>, BakeError> {
		let uvs = match &source.lightmap_uvs {
			Some(uvs) => uvs,
			None => {
				log::warn!("mesh {} has no lightmap UV set, skipping", mesh);
				return Ok(None);
			}
		};

		let normal_matrix = source
			.transform
			.fixed_view::<3, 3>(0, 0)
			.into_owned()
			.try_inverse()
			.map(|inverse| inverse.transpose())
			.unwrap_or_else(Matrix3::identity);

		let world_positions: Vec<Vector3<f32>> = source
			.positions
			.iter()
			.map(|position| source.transform.transform_point(&Point3::from(*position)).coords)
			.collect();

		let world_normals: Vec<Vector3<f32>> = source
			.normals
			.iter()
			.map(|normal| {
				(normal_matrix * normal).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y)
			})
			.collect();

		let mut bad_uvs = 0;
		let clean_uv = |uv: &Vector2<f32>, bad: &mut u32| {
			let mut uv = *uv;

			if !uv.x.is_finite() {
				uv.x = 0.0;
				*bad += 1;
			}

			if !uv.y.is_finite() {
				uv.y = 0.0;
				*bad += 1;
			}

			uv
		};

		let mut triangles = Vec::with_capacity(source.triangles.len());

		for indices in source.triangles.iter() {
			for &index in indices.iter() {
				if index as usize >= world_positions.len()
					|| index as usize >= world_normals.len()
					|| index as usize >= uvs.len()
				{
					return Err(BakeError::InvalidIndex { mesh });
				}
			}

			let [a, b, c] = [indices[0] as usize, indices[1] as usize, indices[2] as usize];

			triangles.push(Triangle {
				positions: [world_positions[a], world_positions[b], world_positions[c]],
				normals: [world_normals[a], world_normals[b], world_normals[c]],
				uvs: [
					clean_uv(&uvs[a], &mut bad_uvs),
					clean_uv(&uvs[b], &mut bad_uvs),
					clean_uv(&uvs[c], &mut bad_uvs),
				]
			});
		}

		if bad_uvs > 0 {
			log::warn!("mesh {}: replaced {} non-finite lightmap UV components with zero", mesh, bad_uvs);
		}

		let area: f32 = triangles.iter().map(Triangle::world_area).sum();
		let size = (area.sqrt() * settings.texels_per_unit as f32).ceil() as u32;
		let size = size.max(1).min(settings.max_raster_size);

		Ok(Some(Surface { triangles, area, size }))
	}
}
