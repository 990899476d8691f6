use cgmath::{
    InnerSpace, Matrix, Matrix3, Matrix4, Quaternion, SquareMatrix, Vector3, Zero,
};
use serde::{Deserialize, Serialize};

/// Default epsilon for comparing transforms from well-behaved sources.
pub const DEFAULT_EPSILON: f32 = 0.001;

/// Determinant tolerance used when checking that a rotation is proper.
pub const ROTATION_DET_TOLERANCE: f32 = 0.01;

/// Affine transform restricted to translation, orthonormal rotation and
/// uniform scale.
///
/// Applying a transform to a point `p` yields `translation + scale * rotation * p`.
/// The rotation must stay orthonormal; `invert` relies on it (transpose
/// instead of a general inverse) and does not check it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransformRepr", into = "TransformRepr")]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Matrix3<f32>,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(translation: Vector3<f32>, rotation: Matrix3<f32>, scale: f32) -> Self {
        Transform {
            translation,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Transform {
            translation: Vector3::zero(),
            rotation: Matrix3::identity(),
            scale: 1.0,
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Transform {
            translation,
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: Matrix3<f32>) -> Self {
        Transform {
            rotation,
            ..Self::identity()
        }
    }

    /// Build a 4x4 column-major matrix (translate * rotate * scale).
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from(self.rotation * self.scale)
    }

    /// Decompose a matrix produced by [`Transform::to_matrix`].
    ///
    /// The scale is the mean length of the three basis columns; matrices
    /// with shear or non-uniform scale come back with their rotation part
    /// only approximately orthonormal.
    pub fn from_matrix(mat: &Matrix4<f32>) -> Self {
        let translation = mat.w.truncate();

        let mut col0 = mat.x.truncate();
        let mut col1 = mat.y.truncate();
        let mut col2 = mat.z.truncate();

        let scale = (col0.magnitude() + col1.magnitude() + col2.magnitude()) / 3.0;
        if scale != 0.0 {
            col0 /= scale;
            col1 /= scale;
            col2 /= scale;
        }

        Transform {
            translation,
            rotation: Matrix3::from_cols(col0, col1, col2),
            scale: if scale != 0.0 { scale } else { 1.0 },
        }
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * (other.translation * self.scale),
            rotation: self.rotation * other.rotation,
            scale: self.scale * other.scale,
        }
    }

    /// Inverse transform. The rotation must be orthonormal and the scale
    /// non-zero; neither is checked here.
    pub fn invert(&self) -> Transform {
        let rotation = self.rotation.transpose();
        let scale = 1.0 / self.scale;
        Transform {
            translation: -(rotation * self.translation) * scale,
            rotation,
            scale,
        }
    }

    pub fn transform_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.translation + self.rotation * (p * self.scale)
    }

    /// Compare translation, rotation (elementwise) and scale independently.
    pub fn near_equal(&self, other: &Transform, epsilon: f32) -> bool {
        let t = self.translation - other.translation;
        if t.x.abs() > epsilon || t.y.abs() > epsilon || t.z.abs() > epsilon {
            return false;
        }

        for c in 0..3 {
            for r in 0..3 {
                if (self.rotation[c][r] - other.rotation[c][r]).abs() > epsilon {
                    return false;
                }
            }
        }

        (self.scale - other.scale).abs() <= epsilon
    }

    pub fn is_identity(&self, epsilon: f32) -> bool {
        self.near_equal(&Transform::identity(), epsilon)
    }

    /// Whether the rotation is a proper rotation (determinant ≈ 1).
    pub fn has_proper_rotation(&self) -> bool {
        (self.rotation.determinant() - 1.0).abs() <= ROTATION_DET_TOLERANCE
    }

    /// Elementwise mean of a set of transforms.
    ///
    /// The mean rotation is re-orthonormalized so the result still satisfies
    /// the rotation invariant. Returns `None` for an empty input.
    pub fn average<'a, I>(transforms: I) -> Option<Transform>
    where
        I: IntoIterator<Item = &'a Transform>,
    {
        let mut count = 0usize;
        let mut translation = Vector3::zero();
        let mut rotation = Matrix3::zero();
        let mut scale = 0.0f32;

        for t in transforms {
            translation += t.translation;
            rotation = rotation + t.rotation;
            scale += t.scale;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        let n = count as f32;
        Some(Transform {
            translation: translation / n,
            rotation: orthonormalize(rotation * (1.0 / n)),
            scale: scale / n,
        })
    }

    pub fn to_quaternion(&self) -> Quaternion<f32> {
        Quaternion::from(self.rotation).normalize()
    }
}

/// Gram-Schmidt on the first two columns, third column rebuilt as their
/// cross product so the result is right-handed.
pub fn orthonormalize(m: Matrix3<f32>) -> Matrix3<f32> {
    let x = m.x;
    let y = m.y;
    if x.magnitude2() == 0.0 || y.magnitude2() == 0.0 {
        return Matrix3::identity();
    }

    let x = x.normalize();
    let y = y - x * x.dot(y);
    if y.magnitude2() == 0.0 {
        return Matrix3::identity();
    }
    let y = y.normalize();
    let z = x.cross(y);
    Matrix3::from_cols(x, y, z)
}

/// Comparison tolerances for one family of source data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceProfile {
    /// Epsilon for `Transform::near_equal` when matching bind transforms.
    pub transform_epsilon: f32,
    /// Epsilon for the bind-vs-reference consistency check.
    pub consistency_epsilon: f32,
}

impl ToleranceProfile {
    /// Sources whose bind data is exported cleanly.
    pub const STANDARD: ToleranceProfile = ToleranceProfile {
        transform_epsilon: DEFAULT_EPSILON,
        consistency_epsilon: 0.8,
    };

    /// Sources known to carry rounding noise in their skin transforms.
    pub const NOISY: ToleranceProfile = ToleranceProfile {
        transform_epsilon: 0.05,
        consistency_epsilon: 3.0,
    };
}

impl Default for ToleranceProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn default_rotation_rows() -> [[f32; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

fn default_scale() -> f32 {
    1.0
}

/// On-disk form: translation, rotation as rows, scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransformRepr {
    #[serde(default)]
    translation: [f32; 3],
    #[serde(default = "default_rotation_rows")]
    rotation: [[f32; 3]; 3],
    #[serde(default = "default_scale")]
    scale: f32,
}

impl From<TransformRepr> for Transform {
    fn from(raw: TransformRepr) -> Self {
        let r = raw.rotation;
        Transform {
            translation: Vector3::new(raw.translation[0], raw.translation[1], raw.translation[2]),
            rotation: Matrix3::from_cols(
                Vector3::new(r[0][0], r[1][0], r[2][0]),
                Vector3::new(r[0][1], r[1][1], r[2][1]),
                Vector3::new(r[0][2], r[1][2], r[2][2]),
            ),
            scale: raw.scale,
        }
    }
}

impl From<Transform> for TransformRepr {
    fn from(t: Transform) -> Self {
        let m = &t.rotation;
        TransformRepr {
            translation: [t.translation.x, t.translation.y, t.translation.z],
            rotation: [
                [m.x.x, m.y.x, m.z.x],
                [m.x.y, m.y.y, m.z.y],
                [m.x.z, m.y.z, m.z.z],
            ],
            scale: t.scale,
        }
    }
}
