use crate::sampler::SurfaceRaster;
use rayon::prelude::*;

/// Axis steps probed for a donor texel, in priority order.
const PROBES: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Fills rasterization gaps: texels the sampler never visited inherit the
/// occlusion word of their nearest visited neighbor. Rows are processed in
/// parallel; every row reads only the immutable input raster and writes its
/// own slice of the output, so nothing aliases.
///
/// Texels with no visited neighbor within the probe radius keep their
/// original (empty) value.
pub fn pad_seams(raster: &SurfaceRaster) -> Vec<u32> {
	let size = raster.size as usize;
	let mut output = raster.occlusion.clone();

	output.par_chunks_mut(size).enumerate().for_each(|(y, row)| {
		for (x, texel) in row.iter_mut().enumerate() {
			if raster.visited.get(x, y) {
				continue;
			}

			if let Some(word) = donor_texel(raster, x as i64, y as i64) {
				*texel = word;
			}
		}
	});

	output
}

/// The occlusion word to copy into a gap texel, chosen by a fixed probe
/// order: the four axis neighbors at distance 1, then the four at distance 2.
/// A distance-2 probe is only taken through an unvisited (or out-of-bounds)
/// distance-1 neighbor. The order matters for reproducibility, not quality;
/// changing it changes which donor wins when several are visited.
fn donor_texel(raster: &SurfaceRaster, x: i64, y: i64) -> Option<u32> {
	let size = raster.size as i64;
	let in_bounds = |x: i64, y: i64| x >= 0 && x < size && y >= 0 && y < size;
	let visited = |x: i64, y: i64| in_bounds(x, y) && raster.visited.get(x as usize, y as usize);

	for &(dx, dy) in PROBES.iter() {
		if visited(x + dx, y + dy) {
			return Some(raster.occlusion[raster.index((x + dx) as u32, (y + dy) as u32)]);
		}
	}

	for &(dx, dy) in PROBES.iter() {
		let near = (x + dx, y + dy);
		let far = (x + 2 * dx, y + 2 * dy);

		if !visited(near.0, near.1) && visited(far.0, far.1) {
			return Some(raster.occlusion[raster.index(far.0 as u32, far.1 as u32)]);
		}
	}

	None
}
