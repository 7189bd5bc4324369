use crate::light::Light;
use crate::sampler::TriangleShadow;
use bitgrid::BitGrid;
use rayon::prelude::*;

/// Builds the flat triangle shadow buffer consumed by the shader. Layout, in
/// `u32` words:
///
/// ```text
/// for each triangle (4 words):       [light_data_offset, x, y, width]
/// at light_data_offset per triangle: [light_count,
///                                      light_index, shadow_data_offset, ...]
/// at each shadow_data_offset:        ceil(width * height / 32) words,
///                                      one bit per texel, row-major,
///                                      local to the triangle bounds
/// ```
///
/// Masks are cut from the seam-padded occlusion raster through each light's
/// channel bit, scoped to the triangle's expanded bounds so neighboring
/// padded texels survive filtering. Mask extraction runs per-triangle in
/// parallel; the offset bookkeeping is a sequential append pass.
pub fn build_triangle_buffer(
	shadows: &[TriangleShadow], lights: &[Light], occlusion: &[u32], size: u32,
) -> Vec<u32> {
	assert_eq!(occlusion.len(), size as usize * size as usize, "raster size mismatch");

	let masks: Vec<Vec<Vec<u32>>> = shadows
		.par_iter()
		.map(|shadow| {
			shadow
				.associations
				.iter()
				.map(|association| {
					extract_mask(occlusion, size, shadow, lights[association.light].channel)
				})
				.collect()
		})
		.collect();

	let mut buffer = vec![0u32; shadows.len() * 4];

	for (index, (shadow, masks)) in shadows.iter().zip(masks.into_iter()).enumerate() {
		let bounds = shadow.bounds;
		let light_data_offset = buffer.len() as u32;

		let header = index * 4;
		buffer[header] = light_data_offset;
		buffer[header + 1] = bounds.x;
		buffer[header + 2] = bounds.y;
		buffer[header + 3] = bounds.width;

		buffer.push(shadow.associations.len() as u32);

		// The mask block starts right after the light table.
		let mut shadow_data_offset =
			light_data_offset + 1 + 2 * shadow.associations.len() as u32;

		for (association, mask) in shadow.associations.iter().zip(masks.iter()) {
			buffer.push(association.light as u32);
			buffer.push(shadow_data_offset);

			shadow_data_offset += mask.len() as u32;
		}

		for mask in masks {
			debug_assert_eq!(mask.len(), bounds.mask_words());
			buffer.extend_from_slice(&mask);
		}

		assert_eq!(buffer.len() as u32, shadow_data_offset);
	}

	buffer
}

fn extract_mask(occlusion: &[u32], size: u32, shadow: &TriangleShadow, channel: u32) -> Vec<u32> {
	let bounds = shadow.bounds;
	let mut mask = BitGrid::new(bounds.width as usize, bounds.height as usize);

	for local_y in 0..bounds.height as usize {
		let row = (bounds.y as usize + local_y) * size as usize;

		for local_x in 0..bounds.width as usize {
			let texel = occlusion[row + bounds.x as usize + local_x];

			if texel & (1 << channel) != 0 {
				mask.set_true(local_x, local_y);
			}
		}
	}

	mask.into_words()
}

/// Read-side view of a flat triangle shadow buffer.
#[derive(Debug, Clone, Copy)]
pub struct TriangleBufferView<'b> {
	buffer: &'b [u32]
}

impl<'b> TriangleBufferView<'b> {
	pub fn new(buffer: &'b [u32]) -> Self {
		TriangleBufferView { buffer }
	}

	pub fn triangle(&self, index: usize) -> TriangleView<'b> {
		let header = index * 4;

		TriangleView {
			buffer: self.buffer,
			light_data_offset: self.buffer[header] as usize,
			x: self.buffer[header + 1],
			y: self.buffer[header + 2],
			width: self.buffer[header + 3]
		}
	}
}

/// One triangle's slice of the buffer: its bounds and per-light masks.
#[derive(Debug, Clone, Copy)]
pub struct TriangleView<'b> {
	buffer: &'b [u32],
	light_data_offset: usize,
	pub x: u32,
	pub y: u32,
	pub width: u32
}

impl<'b> TriangleView<'b> {
	pub fn light_count(&self) -> usize {
		self.buffer[self.light_data_offset] as usize
	}

	/// The global light index of the `slot`-th associated light.
	pub fn light_index(&self, slot: usize) -> usize {
		self.buffer[self.light_data_offset + 1 + slot * 2] as usize
	}

	fn shadow_data_offset(&self, slot: usize) -> usize {
		self.buffer[self.light_data_offset + 2 + slot * 2] as usize
	}

	/// The lit bit for raster texel `(x, y)` against the `slot`-th light.
	/// The texel must lie inside this triangle's bounds.
	pub fn lit(&self, slot: usize, x: u32, y: u32) -> bool {
		assert!(x >= self.x && y >= self.y, "texel outside triangle bounds");

		let local = ((y - self.y) * self.width + (x - self.x)) as usize;
		let word = self.buffer[self.shadow_data_offset(slot) + local / 32];

		(word >> (local % 32)) & 1 == 1
	}
}
