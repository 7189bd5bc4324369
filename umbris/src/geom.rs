use nalgebra::{Vector2, Vector3};

/// Twice the signed area of the 2D triangle `abc`. Positive for
/// counter-clockwise winding.
pub fn double_area_2d(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> f32 {
	(b - a).perp(&(c - a))
}

pub fn triangle_area(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> f32 {
	(b - a).cross(&(c - a)).norm() * 0.5
}

/// Unit normal of the triangle `abc`, or `None` for a degenerate triangle.
pub fn triangle_normal(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Option<Vector3<f32>> {
	(b - a).cross(&(c - a)).try_normalize(f32::EPSILON)
}

/// Barycentric weights of `point` with respect to the 2D triangle `abc`,
/// computed from signed sub-areas. Weights are negative for points on the
/// outer side of the corresponding edge; a degenerate triangle yields `None`.
pub fn barycentric_2d(
	point: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>,
) -> Option<Vector3<f32>> {
	let total = double_area_2d(a, b, c);

	if total == 0.0 {
		return None;
	}

	Some(Vector3::new(
		double_area_2d(point, b, c) / total,
		double_area_2d(a, point, c) / total,
		double_area_2d(a, b, point) / total,
	))
}

/// Barycentric weights of `point` with respect to the 3D triangle `abc`,
/// assuming the point lies on (or near) the triangle's plane.
pub fn barycentric_3d(
	point: Vector3<f32>, a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>,
) -> Option<Vector3<f32>> {
	let v0 = b - a;
	let v1 = c - a;
	let v2 = point - a;

	let d00 = v0.dot(&v0);
	let d01 = v0.dot(&v1);
	let d11 = v1.dot(&v1);
	let d20 = v2.dot(&v0);
	let d21 = v2.dot(&v1);

	let denominator = d00 * d11 - d01 * d01;

	if denominator.abs() < f32::EPSILON {
		return None;
	}

	let v = (d11 * d20 - d01 * d21) / denominator;
	let w = (d00 * d21 - d01 * d20) / denominator;

	Some(Vector3::new(1.0 - v - w, v, w))
}

pub fn barycentric_mix(
	weights: Vector3<f32>, a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>,
) -> Vector3<f32> {
	a * weights.x + b * weights.y + c * weights.z
}

pub fn barycentric_mix_2d(
	weights: Vector3<f32>, a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>,
) -> Vector2<f32> {
	a * weights.x + b * weights.y + c * weights.z
}

/// The point on triangle `abc` closest to `point` (Ericson, Real-Time
/// Collision Detection, 5.1.5).
pub fn closest_point_on_triangle(
	point: Vector3<f32>, a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>,
) -> Vector3<f32> {
	let ab = b - a;
	let ac = c - a;

	let ap = point - a;
	let d1 = ab.dot(&ap);
	let d2 = ac.dot(&ap);

	if d1 <= 0.0 && d2 <= 0.0 {
		return a;
	}

	let bp = point - b;
	let d3 = ab.dot(&bp);
	let d4 = ac.dot(&bp);

	if d3 >= 0.0 && d4 <= d3 {
		return b;
	}

	let vc = d1 * d4 - d3 * d2;

	if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
		return a + ab * (d1 / (d1 - d3));
	}

	let cp = point - c;
	let d5 = ab.dot(&cp);
	let d6 = ac.dot(&cp);

	if d6 >= 0.0 && d5 <= d6 {
		return c;
	}

	let vb = d5 * d2 - d1 * d6;

	if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
		return a + ac * (d2 / (d2 - d6));
	}

	let va = d3 * d6 - d5 * d4;

	if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
		return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
	}

	let denominator = 1.0 / (va + vb + vc);
	a + ab * (vb * denominator) + ac * (vc * denominator)
}

/// Whether the sphere at `center` with `radius` touches the triangle `abc`.
pub fn sphere_touches_triangle(
	center: Vector3<f32>, radius: f32, a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>,
) -> bool {
	let closest = closest_point_on_triangle(center, a, b, c);

	(closest - center).norm_squared() <= radius * radius
}

/// Möller–Trumbore ray/triangle intersection. `direction` must be normalized;
/// the return value is the hit distance along the ray. Backface hits count.
pub fn ray_triangle(
	origin: Vector3<f32>, direction: Vector3<f32>, a: Vector3<f32>, b: Vector3<f32>,
	c: Vector3<f32>,
) -> Option<f32> {
	let edge1 = b - a;
	let edge2 = c - a;

	let h = direction.cross(&edge2);
	let determinant = edge1.dot(&h);

	if determinant.abs() < 1e-9 {
		return None;
	}

	let inverse = 1.0 / determinant;
	let s = origin - a;
	let u = inverse * s.dot(&h);

	if u < 0.0 || u > 1.0 {
		return None;
	}

	let q = s.cross(&edge1);
	let v = inverse * direction.dot(&q);

	if v < 0.0 || u + v > 1.0 {
		return None;
	}

	let distance = inverse * edge2.dot(&q);

	if distance > 1e-6 {
		Some(distance)
	} else {
		None
	}
}
