use nalgebra::Vector3;

/// Total number of shadow bit-planes available to a scene.
pub const CHANNEL_LIMIT: u32 = 32;

/// Channels handed out by the rotating cursor; `[ROTATING_CHANNELS,
/// CHANNEL_LIMIT)` is the overflow range, scanned linearly.
const ROTATING_CHANNELS: u32 = 16;

/// A point-like shadow caster source: a world position, a hard cutoff radius
/// past which the light has no effect, and the shadow channel it was assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
	pub position: Vector3<f32>,
	pub radius: f32,
	pub channel: u32
}

impl Light {
	/// Channel value of a light that could not be assigned a bit-plane.
	pub const INVALID_CHANNEL: u32 = u32::MAX;

	pub fn new(position: Vector3<f32>, radius: f32) -> Self {
		Light { position, radius, channel: Light::INVALID_CHANNEL }
	}

	pub fn has_channel(&self) -> bool {
		self.channel != Light::INVALID_CHANNEL
	}

	/// Whether the influence spheres of two lights intersect.
	pub fn overlaps(&self, other: &Light) -> bool {
		let reach = self.radius + other.radius;

		(self.position - other.position).norm_squared() <= reach * reach
	}
}

/// Assigns every light a shadow channel such that no two overlapping lights
/// share one. Lights are processed in input order; each takes the first free
/// channel found by a cursor rotating through `[0, 16)`, falling back to a
/// linear scan of `[16, 32)`. The cursor advances past each assignment so
/// spatially close lights spread across channels instead of clustering.
///
/// A light that finds no free channel keeps [`Light::INVALID_CHANNEL`] and its
/// index is returned; the remaining lights are still processed.
pub fn assign_channels(lights: &mut [Light]) -> Vec<usize> {
	for light in lights.iter_mut() {
		light.channel = Light::INVALID_CHANNEL;
	}

	let mut cursor = 0;
	let mut failures = Vec::new();

	for index in 0..lights.len() {
		let mut used = 0u32;

		for other_index in 0..index {
			let other = &lights[other_index];

			if other.has_channel() && lights[index].overlaps(other) {
				used |= 1 << other.channel;
			}
		}

		let mut channel = Light::INVALID_CHANNEL;

		for step in 0..ROTATING_CHANNELS {
			let candidate = (cursor + step) % ROTATING_CHANNELS;

			if used & (1 << candidate) == 0 {
				channel = candidate;
				cursor = (candidate + 1) % ROTATING_CHANNELS;
				break;
			}
		}

		if channel == Light::INVALID_CHANNEL {
			for candidate in ROTATING_CHANNELS..CHANNEL_LIMIT {
				if used & (1 << candidate) == 0 {
					channel = candidate;
					break;
				}
			}
		}

		if channel == Light::INVALID_CHANNEL {
			log::error!(
				"light {} overlaps lights on all {} channels, it will not cast baked shadows",
				index,
				CHANNEL_LIMIT
			);

			failures.push(index);
		} else {
			lights[index].channel = channel;
		}
	}

	failures
}
