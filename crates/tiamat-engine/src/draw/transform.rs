use glam::{Mat4, Vec3};

use crate::paint::Color;

/// Rotation about one axis, around a center point.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rotation {
    pub radians: f32,
    pub center: Vec3,
}

impl Rotation {
    pub const NONE: Self = Self {
        radians: 0.0,
        center: Vec3::ZERO,
    };

    #[inline]
    pub const fn new(radians: f32, center: Vec3) -> Self {
        Self { radians, center }
    }

    #[inline]
    pub const fn about_origin(radians: f32) -> Self {
        Self::new(radians, Vec3::ZERO)
    }

    #[inline]
    fn around(self, axis: Mat4) -> Mat4 {
        Mat4::from_translation(self.center) * axis * Mat4::from_translation(-self.center)
    }
}

/// Partial transform update. Unset fields keep their current value.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct TransformUpdate {
    pub translation: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub rotation_x: Option<Rotation>,
    pub rotation_y: Option<Rotation>,
    pub rotation_z: Option<Rotation>,
}

impl TransformUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translation(mut self, v: Vec3) -> Self {
        self.translation = Some(v);
        self
    }

    pub fn scale(mut self, v: Vec3) -> Self {
        self.scale = Some(v);
        self
    }

    pub fn rotation_x(mut self, r: Rotation) -> Self {
        self.rotation_x = Some(r);
        self
    }

    pub fn rotation_y(mut self, r: Rotation) -> Self {
        self.rotation_y = Some(r);
        self
    }

    pub fn rotation_z(mut self, r: Rotation) -> Self {
        self.rotation_z = Some(r);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Model transform of a draw operation.
///
/// Composed as `T · S · Rx · Ry · Rz`, each rotation applied around its own
/// center. The composed matrix is cached until the next update.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    translation: Vec3,
    scale: Vec3,
    rotation_x: Rotation,
    rotation_y: Rotation,
    rotation_z: Rotation,
    cached: Option<Mat4>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_x: Rotation::NONE,
            rotation_y: Rotation::NONE,
            rotation_z: Rotation::NONE,
            cached: None,
        }
    }
}

impl Transform {
    pub fn apply(&mut self, update: &TransformUpdate) {
        if update.is_empty() {
            return;
        }
        if let Some(v) = update.translation {
            self.translation = v;
        }
        if let Some(v) = update.scale {
            self.scale = v;
        }
        if let Some(r) = update.rotation_x {
            self.rotation_x = r;
        }
        if let Some(r) = update.rotation_y {
            self.rotation_y = r;
        }
        if let Some(r) = update.rotation_z {
            self.rotation_z = r;
        }
        self.cached = None;
    }

    /// Returns the composed model matrix, recomputing it only after an update.
    pub fn matrix(&mut self) -> Mat4 {
        *self.cached.get_or_insert_with(|| {
            Mat4::from_translation(self.translation)
                * Mat4::from_scale(self.scale)
                * self.rotation_x.around(Mat4::from_rotation_x(self.rotation_x.radians))
                * self.rotation_y.around(Mat4::from_rotation_y(self.rotation_y.radians))
                * self.rotation_z.around(Mat4::from_rotation_z(self.rotation_z.radians))
        })
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[inline]
    pub fn rotation_x(&self) -> Rotation {
        self.rotation_x
    }

    #[inline]
    pub fn rotation_y(&self) -> Rotation {
        self.rotation_y
    }

    #[inline]
    pub fn rotation_z(&self) -> Rotation {
        self.rotation_z
    }
}

/// Per-operation color transform: `out = color * multiply + add`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorTransform {
    pub multiply: [f32; 4],
    pub add: [f32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorTransform {
    pub const IDENTITY: Self = Self {
        multiply: [1.0; 4],
        add: [0.0; 4],
    };

    pub fn tint(color: Color) -> Self {
        Self {
            multiply: color.to_array(),
            add: [0.0; 4],
        }
    }

    pub fn apply(&self, color: [f32; 4]) -> [f32; 4] {
        std::array::from_fn(|i| color[i] * self.multiply[i] + self.add[i])
    }
}

/// GPU layout of the per-operation transform uniform.
///
/// WGSL:
/// ```wgsl
/// struct Model {
///     model: mat4x4<f32>,
///     color_mul: vec4<f32>,
///     color_add: vec4<f32>,
/// };
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
    pub color_mul: [f32; 4],
    pub color_add: [f32; 4],
}

impl TransformUniform {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(model: Mat4, color: ColorTransform) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color_mul: color.multiply,
            color_add: color.add,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    // ── composition ───────────────────────────────────────────────────────

    #[test]
    fn default_is_identity() {
        let mut t = Transform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_then_scale() {
        let mut t = Transform::default();
        t.apply(
            &TransformUpdate::new()
                .translation(Vec3::new(10.0, 20.0, 0.0))
                .scale(Vec3::new(2.0, 3.0, 1.0)),
        );
        let p = t.matrix().transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!(approx(p, Vec3::new(12.0, 23.0, 0.0)));
    }

    #[test]
    fn rotation_keeps_its_center_fixed() {
        let center = Vec3::new(5.0, 5.0, 0.0);
        let mut t = Transform::default();
        t.apply(&TransformUpdate::new().rotation_z(Rotation::new(FRAC_PI_2, center)));
        let m = t.matrix();
        assert!(approx(m.transform_point3(center), center));
        // (6,5) is one unit right of center; a quarter turn moves it one unit down-axis.
        assert!(approx(
            m.transform_point3(Vec3::new(6.0, 5.0, 0.0)),
            Vec3::new(5.0, 6.0, 0.0)
        ));
    }

    // ── caching ───────────────────────────────────────────────────────────

    #[test]
    fn update_invalidates_cached_matrix() {
        let mut t = Transform::default();
        t.matrix();
        assert!(t.is_cached());

        t.apply(&TransformUpdate::new().translation(Vec3::X));
        assert!(!t.is_cached());
        assert!(approx(t.matrix().transform_point3(Vec3::ZERO), Vec3::X));
    }

    #[test]
    fn empty_update_keeps_cache() {
        let mut t = Transform::default();
        t.matrix();
        t.apply(&TransformUpdate::new());
        assert!(t.is_cached());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let mut t = Transform::default();
        t.apply(&TransformUpdate::new().scale(Vec3::splat(2.0)));
        t.apply(&TransformUpdate::new().translation(Vec3::Y));
        assert_eq!(t.scale(), Vec3::splat(2.0));
        assert_eq!(t.translation(), Vec3::Y);
    }

    // ── color ─────────────────────────────────────────────────────────────

    #[test]
    fn color_transform_multiplies_then_adds() {
        let c = ColorTransform {
            multiply: [0.5, 1.0, 1.0, 1.0],
            add: [0.0, 0.25, 0.0, 0.0],
        };
        assert_eq!(c.apply([1.0, 0.5, 0.2, 1.0]), [0.5, 0.75, 0.2, 1.0]);
        assert_eq!(ColorTransform::IDENTITY.apply([0.1, 0.2, 0.3, 0.4]), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn uniform_is_96_bytes() {
        assert_eq!(TransformUniform::SIZE, 96);
    }
}
