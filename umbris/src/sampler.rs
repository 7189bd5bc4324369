use crate::geom;
use crate::light::Light;
use crate::mesh::Surface;
use crate::occlusion::{OcclusionWorld, SampleStrategy};
use crate::raster::{PixelBounds, TexelMapper};
use bitgrid::BitGrid;
use nalgebra::Vector3;
use rayon::prelude::*;

/// Extra pixels around each triangle's UV footprint kept in its shadow data,
/// so bilinear filtering near the footprint edge reads real values.
pub const BOUNDS_MARGIN: u32 = 2;

/// A surface normal (or face) may tilt this far past perpendicular before a
/// light is considered behind it.
pub const FACING_TOLERANCE: f32 = -0.1;

/// One (triangle, light) relation. The mask holds a lit bit per texel, local
/// to the owning triangle's shadow-data bounds.
#[derive(Debug, Clone)]
pub struct Association {
	pub light: usize,
	pub mask: BitGrid
}

/// Everything sampled for one triangle: which lights can reach it, the raster
/// rectangle its shadow data covers, and which of its texels were actually
/// sampled.
#[derive(Debug, Clone)]
pub struct TriangleShadow {
	pub triangle: usize,
	/// The triangle's raw UV footprint; only these pixels get sampled.
	pub footprint: PixelBounds,
	/// The footprint expanded by [`BOUNDS_MARGIN`]; masks are scoped to this.
	pub bounds: PixelBounds,
	pub associations: Vec<Association>,
	pub sampled: BitGrid
}

/// Builds the triangle/light relations for a surface. A light is associated
/// with a triangle when its influence sphere touches the triangle and the
/// triangle faces it within [`FACING_TOLERANCE`]; lights without a valid
/// channel never associate. Every triangle gets an entry, associated or not,
/// since the serialized buffer is indexed by triangle.
pub fn associate(surface: &Surface, lights: &[Light]) -> Vec<TriangleShadow> {
	surface
		.triangles
		.iter()
		.enumerate()
		.map(|(index, triangle)| {
			let footprint = PixelBounds::of_triangle(&triangle.uvs, surface.size);
			let bounds = footprint.expanded(BOUNDS_MARGIN, surface.size);

			let mut associations = Vec::new();

			if let Some(normal) = triangle.face_normal() {
				let [a, b, c] = triangle.positions;
				let centroid = triangle.centroid();

				for (light_index, light) in lights.iter().enumerate() {
					if !light.has_channel() {
						continue;
					}

					if !geom::sphere_touches_triangle(light.position, light.radius, a, b, c) {
						continue;
					}

					let toward = match (light.position - centroid).try_normalize(f32::EPSILON) {
						Some(toward) => toward,
						None => Vector3::y()
					};

					if normal.dot(&toward) <= FACING_TOLERANCE {
						continue;
					}

					associations.push(Association {
						light: light_index,
						mask: BitGrid::new(bounds.width as usize, bounds.height as usize)
					});
				}
			}

			TriangleShadow {
				triangle: index,
				footprint,
				bounds,
				associations,
				sampled: BitGrid::new(bounds.width as usize, bounds.height as usize)
			}
		})
		.collect()
}

/// Samples visibility for every (texel, light) pair of a surface. Triangles
/// are the parallel unit: each job owns its masks outright, so no two jobs
/// share mutable state. The caller folds the results into the surface raster
/// with [`SurfaceRaster::merge`] afterwards.
pub fn sample_surface<W>(
	surface: &Surface, lights: &[Light], shadows: &mut [TriangleShadow], world: &W,
	strategy: SampleStrategy,
) where
	W: OcclusionWorld + Sync,
{
	shadows
		.par_iter_mut()
		.for_each(|shadow| sample_triangle(surface, lights, shadow, world, strategy));
}

fn sample_triangle<W>(
	surface: &Surface, lights: &[Light], shadow: &mut TriangleShadow, world: &W,
	strategy: SampleStrategy,
) where
	W: OcclusionWorld + ?Sized,
{
	if shadow.associations.is_empty() {
		return;
	}

	let triangle = &surface.triangles[shadow.triangle];
	let mapper = TexelMapper::new(triangle, surface.size);

	let footprint = shadow.footprint;
	let bounds = shadow.bounds;

	for y in footprint.y..footprint.y + footprint.height {
		for x in footprint.x..footprint.x + footprint.width {
			let sample = match mapper.world_sample(x, y) {
				Some(sample) => sample,
				None => continue
			};

			let local_x = (x - bounds.x) as usize;
			let local_y = (y - bounds.y) as usize;

			for association in shadow.associations.iter_mut() {
				let light = &lights[association.light];

				let to_light = light.position - sample.position;
				let distance = to_light.norm();

				if distance > light.radius {
					continue;
				}

				if distance > f32::EPSILON {
					let direction = to_light / distance;

					if sample.normal.dot(&direction) <= FACING_TOLERANCE {
						continue;
					}
				}

				if strategy.lit(world, &sample, light) {
					association.mask.set_true(local_x, local_y);
				}

				// Visited regardless of the query's outcome.
				shadow.sampled.set_true(local_x, local_y);
			}
		}
	}
}

/// The per-surface raster buffers filled during baking: a channel bitmask per
/// texel and the visited mask the seam pass reads. Both live only for the
/// duration of one bake invocation.
#[derive(Debug, Clone)]
pub struct SurfaceRaster {
	pub size: u32,
	pub occlusion: Vec<u32>,
	pub visited: BitGrid
}

impl SurfaceRaster {
	pub fn new(size: u32) -> Self {
		SurfaceRaster {
			size,
			occlusion: vec![0; size as usize * size as usize],
			visited: BitGrid::new(size as usize, size as usize)
		}
	}

	pub fn index(&self, x: u32, y: u32) -> usize {
		x as usize + y as usize * self.size as usize
	}

	/// Folds sampled triangle masks into the raster: every sampled texel is
	/// marked visited, every lit (texel, light) bit raises that light's
	/// channel bit. Sequential; the parallel work happened upstream.
	pub fn merge(&mut self, shadows: &[TriangleShadow], lights: &[Light]) {
		for shadow in shadows.iter() {
			let bounds = shadow.bounds;

			for local_y in 0..bounds.height as usize {
				for local_x in 0..bounds.width as usize {
					if !shadow.sampled.get(local_x, local_y) {
						continue;
					}

					let x = bounds.x + local_x as u32;
					let y = bounds.y + local_y as u32;

					self.visited.set_true(x as usize, y as usize);

					let index = self.index(x, y);

					for association in shadow.associations.iter() {
						if association.mask.get(local_x, local_y) {
							self.occlusion[index] |= 1 << lights[association.light].channel;
						}
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::{associate, sample_surface, SurfaceRaster};
	use crate::bake::BakeSettings;
	use crate::light::Light;
	use crate::mesh::{MeshSource, Surface};
	use crate::occlusion::{SampleStrategy, TriangleSoup};
	use nalgebra::{Matrix4, Vector2, Vector3};

	fn quad_surface(size_clamp: u32) -> Surface {
		let source = MeshSource {
			positions: vec![
				Vector3::new(-1.0, 0.0, -1.0),
				Vector3::new(1.0, 0.0, -1.0),
				Vector3::new(1.0, 0.0, 1.0),
				Vector3::new(-1.0, 0.0, 1.0),
			],
			normals: vec![Vector3::y(); 4],
			lightmap_uvs: Some(vec![
				Vector2::new(0.0, 0.0),
				Vector2::new(1.0, 0.0),
				Vector2::new(1.0, 1.0),
				Vector2::new(0.0, 1.0),
			]),
			// Wound so the face normals agree with the +Y vertex normals.
			triangles: vec![[0, 2, 1], [0, 3, 2]],
			transform: Matrix4::identity()
		};

		let settings = BakeSettings {
			texels_per_unit: 128,
			max_raster_size: size_clamp,
			..BakeSettings::default()
		};

		Surface::build(&source, &settings, 0).unwrap().unwrap()
	}

	#[test]
	fn test_associations_respect_radius_and_facing() {
		let surface = quad_surface(32);

		let mut lights = vec![
			// Above the quad, in range.
			Light { position: Vector3::new(0.0, 2.0, 0.0), radius: 5.0, channel: 0 },
			// Far out of range.
			Light { position: Vector3::new(0.0, 50.0, 0.0), radius: 5.0, channel: 1 },
			// Below the quad: faces away.
			Light { position: Vector3::new(0.0, -2.0, 0.0), radius: 5.0, channel: 2 },
			// In range but never assigned a channel.
			Light::new(Vector3::new(0.0, 2.0, 0.0), 5.0),
		];
		lights[3].channel = Light::INVALID_CHANNEL;

		let shadows = associate(&surface, &lights);

		assert_eq!(shadows.len(), 2);

		for shadow in shadows.iter() {
			let associated: Vec<usize> =
				shadow.associations.iter().map(|association| association.light).collect();

			assert_eq!(associated, vec![0]);
		}
	}

	#[test]
	fn test_unobstructed_quad_is_fully_lit() {
		let surface = quad_surface(32);
		let lights = vec![Light { position: Vector3::new(0.0, 2.0, 0.0), radius: 8.0, channel: 3 }];

		let mut soup = TriangleSoup::new();
		soup.add_surface(&surface);

		let mut shadows = associate(&surface, &lights);
		sample_surface(&surface, &lights, &mut shadows, &soup, SampleStrategy::FromLight);

		let mut raster = SurfaceRaster::new(surface.size);
		raster.merge(&shadows, &lights);

		let mut visited = 0;

		for y in 0..surface.size {
			for x in 0..surface.size {
				if raster.visited.get(x as usize, y as usize) {
					visited += 1;
					assert_eq!(raster.occlusion[raster.index(x, y)], 1 << 3, "({}, {})", x, y);
				}
			}
		}

		// The two triangles tile the whole quad.
		assert!(visited > (surface.size * surface.size / 2) as usize);
	}
}
