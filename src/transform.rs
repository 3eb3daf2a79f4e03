//! 2D affine transforms and their decomposition for interpolation.

use cgmath::{InnerSpace, Matrix3, Rad, Vector2};
use core::f32::consts::PI;
use serde::{Deserialize, Serialize};

/// A 2D affine transform mapping `(x, y)` to `(a x + c y + tx, b x + d y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for AffineTransform {
    fn default() -> Self {
        AffineTransform::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.,
        b: 0.,
        c: 0.,
        d: 1.,
        tx: 0.,
        ty: 0.,
    };

    pub fn translation(tx: f32, ty: f32) -> AffineTransform {
        AffineTransform {
            tx,
            ty,
            ..AffineTransform::IDENTITY
        }
    }

    pub fn rotation(radians: f32) -> AffineTransform {
        AffineTransform::from_matrix(Matrix3::from_angle_z(Rad(radians)))
    }

    pub fn scale(sx: f32, sy: f32) -> AffineTransform {
        AffineTransform {
            a: sx,
            d: sy,
            ..AffineTransform::IDENTITY
        }
    }

    /// Homogeneous matrix (column-major, last row `0 0 1`).
    pub fn to_matrix(&self) -> Matrix3<f32> {
        Matrix3::new(self.a, self.b, 0., self.c, self.d, 0., self.tx, self.ty, 1.)
    }

    pub fn from_matrix(m: Matrix3<f32>) -> AffineTransform {
        AffineTransform {
            a: m.x.x,
            b: m.x.y,
            c: m.y.x,
            d: m.y.y,
            tx: m.z.x,
            ty: m.z.y,
        }
    }

    /// Applies `self` first, then `next`.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        AffineTransform::from_matrix(next.to_matrix() * self.to_matrix())
    }

    /// Splits the transform into translation, rotation, skew and scale.
    ///
    /// The result recomposes as `translate * rotate * skew_x * scale`. Reflections end up as a
    /// negative y scale.
    pub fn decompose(&self) -> Decomposed {
        let col0 = Vector2::new(self.a, self.b);
        let col1 = Vector2::new(self.c, self.d);
        let scale_x = col0.magnitude();
        let rotation = if scale_x > f32::EPSILON {
            self.b.atan2(self.a)
        } else {
            0.
        };
        let (sin, cos) = rotation.sin_cos();
        let u = Vector2::new(cos, sin);
        let v = Vector2::new(-sin, cos);
        let scale_y = col1.dot(v);
        let skew = if scale_y.abs() > f32::EPSILON {
            col1.dot(u) / scale_y
        } else {
            0.
        };

        Decomposed {
            translate: Vector2::new(self.tx, self.ty),
            rotation,
            skew,
            scale: Vector2::new(scale_x, scale_y),
        }
    }
}

/// Independently interpolable components of an affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translate: Vector2<f32>,
    /// Radians.
    pub rotation: f32,
    /// Horizontal shear factor, applied before rotation.
    pub skew: f32,
    pub scale: Vector2<f32>,
}

impl Decomposed {
    pub fn recompose(&self) -> AffineTransform {
        let translate = Matrix3::from_translation(self.translate);
        let rotate = Matrix3::from_angle_z(Rad(self.rotation));
        let skew = Matrix3::new(1., 0., 0., self.skew, 1., 0., 0., 0., 1.);
        let scale = Matrix3::new(self.scale.x, 0., 0., 0., self.scale.y, 0., 0., 0., 1.);
        AffineTransform::from_matrix(translate * rotate * skew * scale)
    }

    /// Interpolates every component separately; rotation takes the shorter way around.
    pub fn lerp(&self, to: &Decomposed, t: f32) -> Decomposed {
        let mut delta = to.rotation - self.rotation;
        if delta > PI {
            delta -= 2. * PI;
        } else if delta < -PI {
            delta += 2. * PI;
        }

        Decomposed {
            translate: self.translate + (to.translate - self.translate) * t,
            rotation: self.rotation + delta * t,
            skew: self.skew + (to.skew - self.skew) * t,
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &AffineTransform, b: &AffineTransform) {
        let pairs = [(a.a, b.a), (a.b, b.b), (a.c, b.c), (a.d, b.d), (a.tx, b.tx), (a.ty, b.ty)];
        for (x, y) in pairs.iter() {
            assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn identity_decomposes_to_unit_scale() {
        let d = AffineTransform::IDENTITY.decompose();
        assert_eq!(d.rotation, 0.);
        assert_eq!(d.skew, 0.);
        assert_eq!(d.scale, Vector2::new(1., 1.));
    }

    #[test]
    fn decompose_roundtrips_rotation_scale_skew() {
        let skew = AffineTransform {
            c: 0.3,
            ..AffineTransform::IDENTITY
        };
        let t = AffineTransform::scale(2., 0.5)
            .then(&skew)
            .then(&AffineTransform::rotation(1.1))
            .then(&AffineTransform::translation(12., -4.));
        assert_close(&t.decompose().recompose(), &t);

        let mirrored = AffineTransform::scale(1., -3.).then(&AffineTransform::rotation(-0.4));
        assert_close(&mirrored.decompose().recompose(), &mirrored);
    }

    #[test]
    fn halfway_rotation_keeps_unit_scale() {
        let from = AffineTransform::IDENTITY.decompose();
        let to = AffineTransform::rotation(PI / 2.).decompose();
        let mid = from.lerp(&to, 0.5).recompose();
        assert_close(&mid, &AffineTransform::rotation(PI / 4.));

        // a raw matrix average would shrink the node to ~0.7 of its size
        let d = mid.decompose();
        assert!((d.scale.x - 1.).abs() < 1e-4);
        assert!((d.scale.y - 1.).abs() < 1e-4);
    }

    #[test]
    fn rotation_takes_shortest_path() {
        let from = AffineTransform::rotation(PI - 0.1).decompose();
        let to = AffineTransform::rotation(-PI + 0.1).decompose();
        let mid = from.lerp(&to, 0.5);
        assert!((mid.rotation.abs() - PI).abs() < 1e-4);
    }
}
