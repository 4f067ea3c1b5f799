use na::{Isometry3, Matrix4, SVector, Translation3, UnitQuaternion, Vector3};

use crate::types::Float;

/// Rigid pose of a frame: orientation followed by position.
#[derive(Clone, Debug, PartialEq, Copy)]
pub struct Pose {
    pub rotation: UnitQuaternion<Float>,
    pub translation: Vector3<Float>,
}

impl Pose {
    pub fn new(rotation: UnitQuaternion<Float>, translation: Vector3<Float>) -> Self {
        Pose {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Pose {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_matrix(matrix: &Matrix4<Float>) -> Self {
        let rotation = UnitQuaternion::from_matrix(&matrix.fixed_view::<3, 3>(0, 0).into_owned());
        let translation = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        Pose {
            rotation,
            translation,
        }
    }

    pub fn to_matrix(&self) -> Matrix4<Float> {
        let mut matrix = Matrix4::identity();
        let rotation = self.rotation.to_rotation_matrix();

        matrix.view_mut((0, 0), (3, 3)).copy_from(rotation.matrix());
        matrix.view_mut((0, 3), (3, 1)).copy_from(&self.translation);
        matrix
    }

    pub fn to_isometry(&self) -> Isometry3<Float> {
        let translation = Translation3::from(self.translation);
        Isometry3::from_parts(translation, self.rotation)
    }

    /// Quaternion-position form of the pose: [w, x, y, z, tx, ty, tz].
    ///
    /// q and -q describe the same rotation; the representative with w >= 0
    /// is returned so that the difference of two nearby poses stays small.
    pub fn quatpos(&self) -> SVector<Float, 7> {
        let q = self.rotation.quaternion();
        let sign = if q.w < 0. { -1. } else { 1. };
        let t = &self.translation;

        #[rustfmt::skip]
        let quatpos = SVector::<Float, 7>::from_column_slice(&[
            sign * q.w, sign * q.coords.x, sign * q.coords.y, sign * q.coords.z,
            t.x, t.y, t.z,
        ]);
        quatpos
    }
}

impl From<Isometry3<Float>> for Pose {
    fn from(iso: Isometry3<Float>) -> Self {
        Pose {
            rotation: iso.rotation,
            translation: iso.translation.vector,
        }
    }
}
