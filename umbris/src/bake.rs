use crate::accel;
use crate::light::{assign_channels, Light};
use crate::mesh::{MeshSource, Surface};
use crate::occlusion::{OcclusionWorld, SampleStrategy};
use crate::sampler::{self, SurfaceRaster};
use crate::seams;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Knobs for one bake pass.
#[derive(Debug, Clone)]
pub struct BakeSettings {
	/// Lightmap pixel density: texels along one world unit.
	pub texels_per_unit: u32,
	/// Upper bound on a surface's raster side length.
	pub max_raster_size: u32,
	pub strategy: SampleStrategy,
	/// Whether the seam padding pass runs after sampling.
	pub pad_seams: bool
}

impl Default for BakeSettings {
	fn default() -> Self {
		BakeSettings {
			texels_per_unit: 128,
			max_raster_size: 2048,
			strategy: SampleStrategy::default(),
			pad_seams: true
		}
	}
}

/// Lets the caller stop a running bake from another thread. Cancellation is
/// honored between phases; parallel batches already in flight run to
/// completion first, and a cancelled pass publishes nothing.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// Raises the cancellation flag; the actual stop is not immediate.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst)
	}
}

/// Per-phase reporting hooks for the bake pass.
pub trait BakeTraces {
	fn channels_assigned(&self, lights: usize, failures: usize, duration: Duration);
	fn surface_skipped(&self, mesh: usize);
	fn surface_baked(
		&self, mesh: usize, size: u32, triangles: usize, associations: usize, duration: Duration,
	);
}

pub struct PrintTraces;

impl PrintTraces {
	fn us(duration: Duration) -> u64 {
		(duration.as_secs() * 1_000_000) + ((duration.subsec_nanos() / 1000) as u64)
	}
}

impl BakeTraces for PrintTraces {
	fn channels_assigned(&self, lights: usize, failures: usize, duration: Duration) {
		println!(
			"Assigned shadow channels to {} light(s) in {}us, {} without a free channel",
			lights,
			Self::us(duration),
			failures
		);
	}

	fn surface_skipped(&self, mesh: usize) {
		println!("Skipped mesh {}", mesh);
	}

	fn surface_baked(
		&self, mesh: usize, size: u32, triangles: usize, associations: usize, duration: Duration,
	) {
		let us = Self::us(duration);

		println!(
			"Baked mesh {} ({}x{}, {} triangles, {} light associations) in {}us ({}us per texel row)",
			mesh,
			size,
			size,
			triangles,
			associations,
			us,
			us / size.max(1) as u64
		);
	}
}

pub struct IgnoreTraces;

impl BakeTraces for IgnoreTraces {
	fn channels_assigned(&self, _: usize, _: usize, _: Duration) {}
	fn surface_skipped(&self, _: usize) {}
	fn surface_baked(&self, _: usize, _: u32, _: usize, _: usize, _: Duration) {}
}

#[derive(Debug, Error)]
pub enum BakeError {
	#[error("baking was cancelled")]
	Cancelled,
	#[error("triangle index out of bounds in mesh {mesh}")]
	InvalidIndex { mesh: usize }
}

/// The two buffers baked for one surface: the per-texel channel-mask raster
/// and the flat triangle shadow buffer, both ready for upload or storage.
#[derive(Debug, Clone)]
pub struct SurfaceBake {
	pub size: u32,
	pub lightmap: Vec<u32>,
	pub triangles: Vec<u32>
}

/// Everything one bake pass produced, keyed by mesh index.
#[derive(Debug, Default)]
pub struct BakeOutput {
	pub surfaces: FxHashMap<usize, SurfaceBake>,
	/// Lights that could not be assigned a shadow channel.
	pub light_failures: Vec<usize>
}

/// Runs the full bake pipeline: channel assignment, then per mesh UV
/// rasterization, visibility sampling, seam padding and triangle buffer
/// building. Sampling parallelizes across each surface's triangles; meshes
/// are processed one after another, each owning its raster buffers
/// exclusively.
pub fn bake<W, T>(
	meshes: &[MeshSource], lights: &mut [Light], world: &W, settings: &BakeSettings,
	token: &CancellationToken, tracer: &T,
) -> Result<BakeOutput, BakeError>
where
	W: OcclusionWorld + Sync,
	T: BakeTraces,
{
	let mut output = BakeOutput::default();

	let start = Instant::now();
	output.light_failures = assign_channels(lights);
	tracer.channels_assigned(lights.len(), output.light_failures.len(), start.elapsed());

	for (mesh, source) in meshes.iter().enumerate() {
		if token.is_cancelled() {
			return Err(BakeError::Cancelled);
		}

		let start = Instant::now();

		let surface = match Surface::build(source, settings, mesh)? {
			Some(surface) => surface,
			None => {
				tracer.surface_skipped(mesh);
				continue;
			}
		};

		let mut shadows = sampler::associate(&surface, lights);

		sampler::sample_surface(&surface, lights, &mut shadows, world, settings.strategy);

		if token.is_cancelled() {
			return Err(BakeError::Cancelled);
		}

		let mut raster = SurfaceRaster::new(surface.size);
		raster.merge(&shadows, lights);

		let lightmap = if settings.pad_seams {
			seams::pad_seams(&raster)
		} else {
			raster.occlusion.clone()
		};

		let triangles = accel::build_triangle_buffer(&shadows, lights, &lightmap, surface.size);

		let associations: usize =
			shadows.iter().map(|shadow| shadow.associations.len()).sum();

		tracer.surface_baked(
			mesh,
			surface.size,
			surface.triangles.len(),
			associations,
			start.elapsed(),
		);

		output.surfaces.insert(mesh, SurfaceBake { size: surface.size, lightmap, triangles });
	}

	Ok(output)
}

#[cfg(test)]
mod test {
	use super::{bake, BakeError, BakeOutput, BakeSettings, CancellationToken, IgnoreTraces};
	use crate::accel::TriangleBufferView;
	use crate::light::Light;
	use crate::mesh::{MeshSource, Surface};
	use crate::occlusion::TriangleSoup;
	use nalgebra::{Matrix4, Vector2, Vector3};

	/// A 2x2 quad in the XZ plane, facing +Y, UVs covering [0, 1].
	fn quad() -> MeshSource {
		MeshSource {
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
			triangles: vec![[0, 2, 1], [0, 3, 2]],
			transform: Matrix4::identity()
		}
	}

	fn world_with(meshes: &[MeshSource], settings: &BakeSettings) -> TriangleSoup {
		let mut soup = TriangleSoup::new();

		for (index, source) in meshes.iter().enumerate() {
			if let Some(surface) = Surface::build(source, settings, index).unwrap() {
				soup.add_surface(&surface);
			}
		}

		soup
	}

	fn run(meshes: &[MeshSource], lights: &mut [Light], extra: &[[Vector3<f32>; 3]]) -> BakeOutput {
		let settings = BakeSettings::default();

		let mut soup = world_with(meshes, &settings);
		for triangle in extra {
			soup.push(*triangle);
		}

		bake(meshes, lights, &soup, &settings, &CancellationToken::new(), &IgnoreTraces).unwrap()
	}

	#[test]
	fn test_unobstructed_quad_fully_lit() {
		let meshes = [quad()];
		let mut lights = vec![Light::new(Vector3::new(0.0, 2.0, 0.0), 5.0)];

		let output = run(&meshes, &mut lights, &[]);
		let surface = &output.surfaces[&0];

		// 2x2 units at density 128.
		assert_eq!(surface.size, 256);

		let channel = lights[0].channel;
		let mut lit = 0;

		for texel in surface.lightmap.iter() {
			if *texel != 0 {
				assert_eq!(*texel, 1 << channel);
				lit += 1;
			}
		}

		// Everything the rasterizer mapped (plus padding) reports lit.
		assert!(lit > 256 * 256 * 9 / 10, "only {} texels lit", lit);
	}

	#[test]
	fn test_wall_casts_matching_shadow() {
		let meshes = [quad()];
		let mut lights = vec![Light::new(Vector3::new(0.0, 2.0, 0.0), 5.0)];

		// A wall at y = 1 covering x >= 0: from a light at x = 0, its floor
		// shadow boundary falls exactly on x = 0.
		let wall = [
			[Vector3::new(0.0, 1.0, -4.0), Vector3::new(4.0, 1.0, -4.0), Vector3::new(4.0, 1.0, 4.0)],
			[Vector3::new(0.0, 1.0, -4.0), Vector3::new(4.0, 1.0, 4.0), Vector3::new(0.0, 1.0, 4.0)],
		];

		let output = run(&meshes, &mut lights, &wall);
		let surface = &output.surfaces[&0];
		let channel = lights[0].channel;

		let size = surface.size;
		let texel_width = 2.0 / (size - 1) as f32;
		let mut checked = 0;

		for y in 0..size {
			for x in 0..size {
				let texel = surface.lightmap[(x + y * size) as usize];

				// Texel center in world space.
				let world_x = (x as f32 / (size - 1) as f32) * 2.0 - 1.0;

				// Leave a few texels of slack around the shadow boundary.
				if world_x.abs() < 3.0 * texel_width {
					continue;
				}

				let expected = if world_x < 0.0 { 1 << channel } else { 0 };
				assert_eq!(texel, expected, "texel ({}, {}) at x = {}", x, y, world_x);
				checked += 1;
			}
		}

		assert!(checked > (size * size / 2) as usize);
	}

	#[test]
	fn test_triangle_buffer_agrees_with_lightmap() {
		let meshes = [quad()];
		let mut lights = vec![Light::new(Vector3::new(0.5, 2.0, 0.0), 5.0)];

		let output = run(&meshes, &mut lights, &[]);
		let surface = &output.surfaces[&0];

		let view = TriangleBufferView::new(&surface.triangles);
		let channel = lights[0].channel;

		for index in 0..2 {
			let triangle = view.triangle(index);
			assert_eq!(triangle.light_count(), 1);
			assert_eq!(triangle.light_index(0), 0);

			// Spot-check texels inside the triangle bounds against the raster.
			for y in triangle.y..(triangle.y + 40).min(surface.size) {
				for x in triangle.x..(triangle.x + 40).min(triangle.x + triangle.width) {
					let expected =
						surface.lightmap[(x + y * surface.size) as usize] & (1 << channel) != 0;

					assert_eq!(triangle.lit(0, x, y), expected, "({}, {})", x, y);
				}
			}
		}
	}

	#[test]
	fn test_cancelled_pass_publishes_nothing() {
		let meshes = [quad()];
		let mut lights = vec![Light::new(Vector3::new(0.0, 2.0, 0.0), 5.0)];
		let settings = BakeSettings::default();
		let soup = world_with(&meshes, &settings);

		let token = CancellationToken::new();
		token.cancel();

		let result = bake(&meshes, &mut lights, &soup, &settings, &token, &IgnoreTraces);

		assert!(matches!(result, Err(BakeError::Cancelled)));
	}

	#[test]
	fn test_mesh_without_uvs_is_skipped() {
		let mut broken = quad();
		broken.lightmap_uvs = None;

		let meshes = [broken, quad()];
		let mut lights = vec![Light::new(Vector3::new(0.0, 2.0, 0.0), 5.0)];

		let output = run(&meshes, &mut lights, &[]);

		assert!(!output.surfaces.contains_key(&0));
		assert!(output.surfaces.contains_key(&1));
	}
}
