use crate::bake::BakeOutput;
use bakestore::{Payload, StoreReader, StoreWriter, ZlibOutput};
use std::io::{Error, ErrorKind, Read, Result, Seek, Write};

/// Writes every baked surface into a store, keyed by mesh index, and returns
/// the underlying output. Surfaces are written in ascending key order so the
/// resulting file is deterministic.
pub fn store_output<O>(output: &BakeOutput, out: O) -> Result<O>
where
	O: Write + Seek,
{
	let mut writer = StoreWriter::start(out)?;

	let mut keys: Vec<usize> = output.surfaces.keys().copied().collect();
	keys.sort_unstable();

	for mesh in keys {
		let surface = &output.surfaces[&mesh];

		let mut sink = ZlibOutput::new();
		bakestore::write_payload(
			&mut sink,
			surface.size,
			surface.size,
			&surface.lightmap,
			&surface.triangles,
		);

		writer.entry(mesh as u16, &sink.finish())?;
	}

	writer.finish()
}

/// Loads one surface's baked buffers back out of a store. `None` when the
/// mesh has no entry.
pub fn load_surface<I>(input: I, mesh: u16) -> Result<Option<Payload>>
where
	I: Read + Seek,
{
	let mut reader = StoreReader::open(input)?;

	match reader.payload(mesh)? {
		Some(bytes) => bakestore::read_payload(&bytes)
			.map(Some)
			.ok_or_else(|| Error::new(ErrorKind::InvalidData, "malformed surface payload")),
		None => Ok(None)
	}
}
