#![forbid(unsafe_code)]

//! # `umbris`: static shadow-mask baking
//!
//! Precomputes, per surface texel, which static lights can see that patch of
//! geometry, and packs the result into two flat `u32` buffers a shader can
//! index directly: a per-texel channel-mask raster and a per-triangle shadow
//! buffer with locally-scoped bit masks.
//!
//! The pipeline is a one-shot batch: immutable mesh and light snapshots in,
//! immutable buffers out. Lights are first assigned shadow channels so that
//! no two overlapping lights share a bit-plane; each mesh is then rasterized
//! in lightmap UV space, every (texel, light) pair is resolved with an
//! occlusion query against the scene, rasterization gaps are repaired from
//! neighboring texels, and the per-triangle masks are packed. Visibility
//! sampling is the dominant cost and runs data-parallel across triangles;
//! everything else is cheap bookkeeping around it.

/// Per-triangle shadow bounds and the flat shadow buffer format.
pub mod accel;

/// Pipeline orchestration: settings, phases, cancellation, tracing.
pub mod bake;

/// Triangle and barycentric math shared by the raster and sampler stages.
pub mod geom;

/// Lights and shadow-channel assignment.
pub mod light;

/// Mesh-to-world preprocessing and raster sizing.
pub mod mesh;

/// The occlusion-query seam and the sampling strategies built on it.
pub mod occlusion;

/// Storing baked output through `bakestore`.
pub mod persist;

/// UV-space rasterization: pixel bounds and texel-to-world mapping.
pub mod raster;

/// Triangle/light association and parallel visibility sampling.
pub mod sampler;

/// Repair of texels the rasterizer never visited.
pub mod seams;

pub use crate::accel::{build_triangle_buffer, TriangleBufferView};
pub use crate::bake::{
	bake, BakeError, BakeOutput, BakeSettings, BakeTraces, CancellationToken, IgnoreTraces,
	PrintTraces, SurfaceBake,
};
pub use crate::light::{assign_channels, Light};
pub use crate::mesh::{MeshSource, Surface};
pub use crate::occlusion::{OcclusionWorld, QueryFault, RayHit, SampleStrategy, TriangleSoup};
pub use crate::persist::{load_surface, store_output};
