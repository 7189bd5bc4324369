use crate::geom;
use crate::mesh::Triangle;
use nalgebra::{Vector2, Vector3};

/// An axis-aligned rectangle of raster pixels, stored as origin + extent.
/// Always at least 1x1 and entirely inside `[0, size)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32
}

impl PixelBounds {
	/// The pixel bounding box of a triangle's UV footprint on a `size`-wide
	/// square raster. UVs are expected in `[0, 1]`; the box is clamped into
	/// the raster and nudged to stay at least one pixel wide on each axis,
	/// covering the UV == 1.0 and collapsed-box edge cases.
	pub fn of_triangle(uvs: &[Vector2<f32>; 3], size: u32) -> PixelBounds {
		if size <= 1 {
			return PixelBounds { x: 0, y: 0, width: 1, height: 1 };
		}

		let scale = (size - 1) as f32;
		let last = (size - 1) as i64;

		let min_u = uvs[0].x.min(uvs[1].x).min(uvs[2].x);
		let max_u = uvs[0].x.max(uvs[1].x).max(uvs[2].x);
		let min_v = uvs[0].y.min(uvs[1].y).min(uvs[2].y);
		let max_v = uvs[0].y.max(uvs[1].y).max(uvs[2].y);

		let clamp = |value: i64| value.max(0).min(last);

		let mut min_x = clamp((min_u * scale).floor() as i64);
		let mut max_x = clamp((max_u * scale).ceil() as i64);
		let mut min_y = clamp((min_v * scale).floor() as i64);
		let mut max_y = clamp((max_v * scale).ceil() as i64);

		// A collapsed axis grows one pixel outward, inward at the far edge.
		if min_x == max_x {
			if max_x < last {
				max_x += 1;
			} else {
				min_x -= 1;
			}
		}

		if min_y == max_y {
			if max_y < last {
				max_y += 1;
			} else {
				min_y -= 1;
			}
		}

		PixelBounds {
			x: min_x as u32,
			y: min_y as u32,
			width: (max_x - min_x + 1) as u32,
			height: (max_y - min_y + 1) as u32
		}
	}

	/// Grows the rectangle by `margin` pixels on every side, clamped to the
	/// raster.
	pub fn expanded(&self, margin: u32, size: u32) -> PixelBounds {
		let x = self.x.saturating_sub(margin);
		let y = self.y.saturating_sub(margin);
		let right = (self.x + self.width + margin).min(size);
		let bottom = (self.y + self.height + margin).min(size);

		PixelBounds { x, y, width: right - x, height: bottom - y }
	}

	pub fn contains(&self, x: u32, y: u32) -> bool {
		x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
	}

	/// Words needed for a 1-bit-per-pixel mask over this rectangle.
	pub fn mask_words(&self) -> usize {
		(self.width as usize * self.height as usize + 31) / 32
	}
}

/// A world-space sample produced for one texel.
#[derive(Debug, Clone, Copy)]
pub struct TexelSample {
	pub position: Vector3<f32>,
	pub normal: Vector3<f32>
}

/// Maps raster pixels of one triangle back to world space. A pixel center is
/// converted to UV, tested against the triangle with signed barycentric
/// areas, and (when inside) interpolated to a world position and normal.
pub struct TexelMapper<'t> {
	triangle: &'t Triangle,
	scale: f32
}

impl<'t> TexelMapper<'t> {
	pub fn new(triangle: &'t Triangle, size: u32) -> Self {
		let scale = if size > 1 { 1.0 / (size - 1) as f32 } else { 0.0 };

		TexelMapper { triangle, scale }
	}

	pub fn uv(&self, x: u32, y: u32) -> Vector2<f32> {
		Vector2::new(x as f32 * self.scale, y as f32 * self.scale)
	}

	/// The world sample for pixel `(x, y)`, or `None` when the pixel lies
	/// outside the triangle's UV footprint (any negative barycentric weight)
	/// or the triangle is degenerate in UV space.
	pub fn world_sample(&self, x: u32, y: u32) -> Option<TexelSample> {
		let [uv_a, uv_b, uv_c] = self.triangle.uvs;

		let weights = geom::barycentric_2d(self.uv(x, y), uv_a, uv_b, uv_c)?;

		if weights.x < 0.0 || weights.y < 0.0 || weights.z < 0.0 {
			return None;
		}

		let [a, b, c] = self.triangle.positions;
		let [na, nb, nc] = self.triangle.normals;

		let position = geom::barycentric_mix(weights, a, b, c);
		let normal = geom::barycentric_mix(weights, na, nb, nc)
			.try_normalize(f32::EPSILON)
			.unwrap_or_else(Vector3::y);

		Some(TexelSample { position, normal })
	}
}
