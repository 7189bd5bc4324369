use crate::writer::Output;
use deflate::write::ZlibEncoder;
use deflate::Compression;
use std::io::Write;

/// A finished zlib stream, ready to be placed into the store.
pub struct ZlibBuffer(pub(crate) Vec<u8>);

impl ZlibBuffer {
	pub fn compressed_len(&self) -> usize {
		self.0.len()
	}
}

/// An [`Output`] that compresses everything written through it. Small writes
/// are staged in a local buffer so the encoder sees reasonably sized blocks.
pub struct ZlibOutput {
	staged: Vec<u8>,
	encoder: ZlibEncoder<Vec<u8>>
}

const STAGE_LIMIT: usize = 512;

impl ZlibOutput {
	pub fn new() -> Self {
		Self::with_capacity(4096)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		ZlibOutput {
			staged: Vec::with_capacity(STAGE_LIMIT),
			encoder: ZlibEncoder::new(Vec::with_capacity(capacity), Compression::Default)
		}
	}

	fn drain(&mut self) {
		self.encoder.write_all(&self.staged).unwrap();
		self.staged.clear();
	}

	pub fn finish(mut self) -> ZlibBuffer {
		self.drain();

		ZlibBuffer(self.encoder.finish().unwrap())
	}
}

impl Default for ZlibOutput {
	fn default() -> Self {
		ZlibOutput::new()
	}
}

impl Output for ZlibOutput {
	fn push(&mut self, byte: u8) {
		self.staged.push(byte);

		if self.staged.len() >= STAGE_LIMIT {
			self.drain();
		}
	}

	fn extend_from_slice(&mut self, slice: &[u8]) {
		if slice.len() < STAGE_LIMIT {
			self.staged.extend_from_slice(slice);

			if self.staged.len() >= STAGE_LIMIT {
				self.drain();
			}
		} else {
			self.drain();
			self.encoder.write_all(slice).unwrap();
		}
	}
}

#[cfg(test)]
mod test {
	use super::ZlibOutput;
	use crate::writer::Output;

	#[test]
	fn test_compress_inflate_round_trip() {
		let mut sink = ZlibOutput::new();

		let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
		sink.extend_from_slice(&data);
		sink.push(42);

		let buffer = sink.finish();
		assert!(buffer.compressed_len() < data.len());

		let inflated = inflate::inflate_bytes_zlib(&buffer.0).unwrap();
		assert_eq!(inflated.len(), data.len() + 1);
		assert_eq!(&inflated[..data.len()], &data[..]);
		assert_eq!(inflated[data.len()], 42);
	}
}
