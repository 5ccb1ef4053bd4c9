use nalgebra::Vector3;

/// Converts a position from left-handed Y-up source space to right-handed
/// Z-up target space, applying a uniform scale.
///
/// `(x, y, z)` becomes `(x * scale, z * scale, y * scale)`.
pub fn convert_position(position: &Vector3<f32>, scale: f32) -> Vector3<f32> {
    Vector3::new(position.x * scale, position.z * scale, position.y * scale)
}

/// Converts Euler rotation angles between the same two spaces.
///
/// The axes are permuted like positions and negated for the handedness flip:
/// `(rx, ry, rz)` becomes `(-rx, -rz, -ry)`.
pub fn convert_rotation(rotation: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-rotation.x, -rotation.z, -rotation.y)
}
