use crate::geom;
use crate::light::Light;
use crate::mesh::Surface;
use crate::raster::TexelSample;
use nalgebra::Vector3;
use thiserror::Error;

/// A hit returned by the occlusion backend: the obstruction point and its
/// distance along the ray.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
	pub position: Vector3<f32>,
	pub distance: f32
}

/// An engine-specific fault inside the query backend. The sampler treats any
/// fault as "no obstruction" rather than aborting the bake.
#[derive(Debug, Error)]
#[error("occlusion query backend fault")]
pub struct QueryFault;

/// The scene geometry the sampler casts rays against. Implemented by whatever
/// raycast facility the host engine provides; [`TriangleSoup`] is the
/// self-contained reference implementation.
pub trait OcclusionWorld {
	/// Nearest hit along a normalized `direction`, within `max_distance`.
	fn raycast(
		&self, origin: Vector3<f32>, direction: Vector3<f32>, max_distance: f32,
	) -> Result<Option<RayHit>, QueryFault>;

	/// Whether anything obstructs the open segment between two points.
	fn obstructed(&self, from: Vector3<f32>, to: Vector3<f32>) -> Result<bool, QueryFault>;
}

/// Brute-force occlusion queries over a flat list of world triangles.
#[derive(Debug, Default, Clone)]
pub struct TriangleSoup {
	triangles: Vec<[Vector3<f32>; 3]>
}

impl TriangleSoup {
	pub fn new() -> Self {
		TriangleSoup::default()
	}

	pub fn push(&mut self, triangle: [Vector3<f32>; 3]) {
		self.triangles.push(triangle);
	}

	pub fn add_surface(&mut self, surface: &Surface) {
		for triangle in surface.triangles.iter() {
			self.triangles.push(triangle.positions);
		}
	}

	pub fn len(&self) -> usize {
		self.triangles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.triangles.is_empty()
	}
}

impl OcclusionWorld for TriangleSoup {
	fn raycast(
		&self, origin: Vector3<f32>, direction: Vector3<f32>, max_distance: f32,
	) -> Result<Option<RayHit>, QueryFault> {
		let mut nearest: Option<f32> = None;

		for [a, b, c] in self.triangles.iter().copied() {
			if let Some(distance) = geom::ray_triangle(origin, direction, a, b, c) {
				if distance <= max_distance && nearest.map(|best| distance < best).unwrap_or(true) {
					nearest = Some(distance);
				}
			}
		}

		Ok(nearest.map(|distance| RayHit { position: origin + direction * distance, distance }))
	}

	fn obstructed(&self, from: Vector3<f32>, to: Vector3<f32>) -> Result<bool, QueryFault> {
		let segment = to - from;
		let length = segment.norm();

		let direction = match segment.try_normalize(f32::EPSILON) {
			Some(direction) => direction,
			None => return Ok(false)
		};

		// Endpoint hits do not count as obstruction.
		let margin = (length * 1e-4).max(1e-4);

		for [a, b, c] in self.triangles.iter().copied() {
			if let Some(distance) = geom::ray_triangle(from, direction, a, b, c) {
				if distance > margin && distance < length - margin {
					return Ok(true);
				}
			}
		}

		Ok(false)
	}
}

/// A nearest hit within this distance of the texel still counts as reaching
/// it, covering the geometry the texel itself is embedded in.
const ACCEPT_DISTANCE: f32 = 0.01;

/// Bias floor and growth for [`SampleStrategy::OffsetTexel`]. The offset
/// scales with the texel's distance from the origin, keeping it above f32
/// resolution for far-away geometry.
const OFFSET_BIAS_MIN: f32 = 1e-4;
const OFFSET_BIAS_SCALE: f32 = 4e-5;

/// How a single (texel, light) visibility query is answered. Both strategies
/// are interchangeable; they trade self-intersection robustness differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStrategy {
	/// Cast from the light toward the texel and accept the texel as lit only
	/// when the nearest obstruction is the texel itself (within
	/// [`ACCEPT_DISTANCE`]).
	FromLight,
	/// Push the texel off its surface along the normal, then test the direct
	/// segment to the light for any obstruction.
	OffsetTexel
}

impl Default for SampleStrategy {
	fn default() -> Self {
		SampleStrategy::FromLight
	}
}

impl SampleStrategy {
	/// Whether the light reaches the texel. Backend faults count as lit.
	pub fn lit<W: OcclusionWorld + ?Sized>(
		&self, world: &W, texel: &TexelSample, light: &Light,
	) -> bool {
		let to_texel = texel.position - light.position;
		let distance = to_texel.norm();

		if distance <= f32::EPSILON {
			// The light sits on the texel.
			return true;
		}

		match self {
			SampleStrategy::FromLight => {
				let direction = to_texel / distance;

				match world.raycast(light.position, direction, distance + ACCEPT_DISTANCE) {
					Ok(Some(hit)) => hit.distance + ACCEPT_DISTANCE >= distance,
					Ok(None) => true,
					Err(_) => true
				}
			}
			SampleStrategy::OffsetTexel => {
				let bias = (texel.position.norm() * OFFSET_BIAS_SCALE).max(OFFSET_BIAS_MIN);
				let start = texel.position + texel.normal * bias;

				match world.obstructed(start, light.position) {
					Ok(blocked) => !blocked,
					Err(_) => true
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::{OcclusionWorld, SampleStrategy, TriangleSoup};
	use crate::light::Light;
	use crate::raster::TexelSample;
	use nalgebra::Vector3;

	/// A unit-ish wall in the XY plane at the given z.
	fn wall(soup: &mut TriangleSoup, z: f32, half: f32) {
		let a = Vector3::new(-half, -half, z);
		let b = Vector3::new(half, -half, z);
		let c = Vector3::new(half, half, z);
		let d = Vector3::new(-half, half, z);

		soup.push([a, b, c]);
		soup.push([a, c, d]);
	}

	#[test]
	fn test_raycast_reports_nearest() {
		let mut soup = TriangleSoup::new();
		wall(&mut soup, -3.0, 2.0);
		wall(&mut soup, -1.0, 2.0);

		let hit = soup
			.raycast(Vector3::new(0.0, 0.0, 4.0), Vector3::new(0.0, 0.0, -1.0), 100.0)
			.unwrap()
			.unwrap();

		assert!((hit.distance - 5.0).abs() < 1e-4);
		assert!((hit.position.z - (-1.0)).abs() < 1e-4);
	}

	#[test]
	fn test_obstructed_ignores_endpoints() {
		let mut soup = TriangleSoup::new();
		wall(&mut soup, 0.0, 2.0);

		let on_wall = Vector3::new(0.5, 0.5, 0.0);
		let above = Vector3::new(0.5, 0.5, 3.0);
		let below = Vector3::new(0.5, 0.5, -3.0);

		// Segment ending on the wall: the wall itself is not an obstruction.
		assert!(!soup.obstructed(above, on_wall).unwrap());
		// Segment passing through the wall is obstructed.
		assert!(soup.obstructed(above, below).unwrap());
	}

	#[test]
	fn test_strategies_agree_on_clear_and_blocked() {
		let mut soup = TriangleSoup::new();
		// The surface the texel lives on.
		wall(&mut soup, 0.0, 2.0);

		let texel = TexelSample {
			position: Vector3::new(0.5, 0.5, 0.0),
			normal: Vector3::new(0.0, 0.0, 1.0)
		};
		let light = Light { position: Vector3::new(0.0, 0.0, 4.0), radius: 10.0, channel: 0 };

		for strategy in &[SampleStrategy::FromLight, SampleStrategy::OffsetTexel] {
			assert!(strategy.lit(&soup, &texel, &light), "{:?}", strategy);
		}

		// Slide a blocker between the texel and the light.
		wall(&mut soup, 2.0, 2.0);

		for strategy in &[SampleStrategy::FromLight, SampleStrategy::OffsetTexel] {
			assert!(!strategy.lit(&soup, &texel, &light), "{:?}", strategy);
		}
	}
}
