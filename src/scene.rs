//! The washer and screw assembly: object table and lighting.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3, Vec4};

use crate::camera::ProjectionMode;
use crate::shapes::Shape;

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const YELLOW: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
const OLIVE: Vec4 = Vec4::new(0.5, 0.5, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);
const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);

const fn degrees(value: f32) -> f32 {
    value * PI / 180.0
}

/// Rotation of `angle` radians about `axis` (need not be unit length).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub axis: Vec3,
    pub angle: f32,
}

impl Rotation {
    pub const fn new(axis: Vec3, angle: f32) -> Self {
        Self { axis, angle }
    }

    pub fn matrix(&self) -> Mat4 {
        let axis = self.axis.normalize_or_zero();
        if axis == Vec3::ZERO || self.angle == 0.0 {
            return Mat4::IDENTITY;
        }
        Mat4::from_axis_angle(axis, self.angle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneObject {
    pub name: &'static str,
    pub shape: Shape,
    pub texture_unit: usize,
    pub scale: Vec3,
    pub rotation: Rotation,
    pub translation: Vec3,
    pub color: Vec4,
    /// Drawn only under the perspective projection.
    pub perspective_only: bool,
}

impl SceneObject {
    /// Translation, then rotation, then scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * self.rotation.matrix()
            * Mat4::from_scale(self.scale)
    }

    pub fn visible_in(&self, mode: ProjectionMode) -> bool {
        !self.perspective_only || mode == ProjectionMode::Perspective
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub position: Vec3,
    pub specular_intensity: f32,
    pub highlight_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub ambient_strength: f32,
    pub ambient_color: Vec3,
    pub lights: [PointLight; 2],
}

pub const SCENE_LIGHTING: Lighting = Lighting {
    ambient_strength: 0.4,
    ambient_color: Vec3::new(0.2, 0.2, 0.2),
    lights: [
        // Warm key light.
        PointLight {
            color: Vec3::new(1.0, 0.5, 0.1),
            position: Vec3::new(8.0, 3.0, 2.0),
            specular_intensity: 0.6,
            highlight_size: 12.0,
        },
        PointLight {
            color: Vec3::new(1.0, 1.0, 1.0),
            position: Vec3::new(-2.0, 3.0, 2.0),
            specular_intensity: 0.6,
            highlight_size: 12.0,
        },
    ],
};

const GROUND: SceneObject = SceneObject {
    name: "ground plane",
    shape: Shape::Plane,
    texture_unit: 2,
    scale: Vec3::new(6.0, 1.0, 6.0),
    rotation: UNROTATED,
    translation: Vec3::ZERO,
    color: RED,
    perspective_only: false,
};

const UNROTATED: Rotation = Rotation::new(Vec3::ONE, 0.0);
const ANGLED_SCREW_ROTATION: Rotation = Rotation::new(Vec3::new(-13.0, 0.0, 1.0), degrees(-60.0));
const ANGLED_SCREW_POSITION: Vec3 = Vec3::new(-2.0, 0.37, -1.7);

/// Draw order matters only for the duplicated ground plane, which loses the
/// depth test against itself.
pub const WASHER_AND_SCREW: [SceneObject; 14] = [
    GROUND,
    SceneObject {
        perspective_only: true,
        ..GROUND
    },
    SceneObject {
        name: "main cylinder",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.5, 2.0, 0.5),
        rotation: UNROTATED,
        translation: Vec3::ZERO,
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "angled box",
        shape: Shape::Box,
        texture_unit: 0,
        scale: Vec3::new(3.0, 0.35, 0.6),
        rotation: Rotation::new(Vec3::Z, degrees(-45.0)),
        translation: Vec3::new(1.7, 1.2, 0.0),
        color: OLIVE,
        perspective_only: false,
    },
    SceneObject {
        name: "washer",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.5, 0.1, 0.5),
        rotation: UNROTATED,
        translation: Vec3::new(-3.0, 0.0, 4.0),
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "washer middle",
        shape: Shape::Torus,
        texture_unit: 1,
        scale: Vec3::new(0.2, 0.2, 0.5),
        rotation: Rotation::new(Vec3::X, FRAC_PI_2),
        translation: Vec3::new(-3.0, 0.1, 4.0),
        color: BLUE,
        perspective_only: false,
    },
    SceneObject {
        name: "button 1",
        shape: Shape::Cylinder,
        texture_unit: 4,
        scale: Vec3::new(0.3, 0.1, 0.3),
        rotation: UNROTATED,
        translation: Vec3::new(0.0, 0.0, 1.5),
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "button 2",
        shape: Shape::Cylinder,
        texture_unit: 4,
        scale: Vec3::new(0.3, 0.1, 0.3),
        rotation: UNROTATED,
        translation: Vec3::new(-2.0, 0.0, -1.5),
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "angled screw shaft",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.1, -0.57, 0.1),
        rotation: ANGLED_SCREW_ROTATION,
        translation: ANGLED_SCREW_POSITION,
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "angled screw head",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.3, 0.1, 0.3),
        rotation: ANGLED_SCREW_ROTATION,
        translation: ANGLED_SCREW_POSITION,
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "cylinder top ring",
        shape: Shape::Torus,
        texture_unit: 1,
        scale: Vec3::new(0.5, 0.5, 1.0),
        rotation: Rotation::new(Vec3::X, FRAC_PI_2),
        translation: Vec3::new(0.0, 2.0, 0.0),
        color: BLUE,
        perspective_only: false,
    },
    SceneObject {
        name: "straight screw bottom",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.3, 0.1, 0.3),
        rotation: Rotation::new(Vec3::new(1.0, 0.0, 1.0), 0.0),
        translation: Vec3::new(-2.8, 0.0, -3.7),
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "straight screw",
        shape: Shape::Cylinder,
        texture_unit: 0,
        scale: Vec3::new(0.1, -0.65, 0.1),
        rotation: Rotation::new(Vec3::new(1.0, 0.0, 1.0), 0.0),
        translation: Vec3::new(-2.8, 0.7, -3.7),
        color: YELLOW,
        perspective_only: false,
    },
    SceneObject {
        name: "sun",
        shape: Shape::Sphere,
        texture_unit: 3,
        scale: Vec3::ONE,
        rotation: UNROTATED,
        translation: Vec3::new(10.0, 6.0, -4.0),
        color: GREEN,
        perspective_only: false,
    },
];

/// Objects and lights drawn every frame.
#[derive(Clone, Copy, Debug)]
pub struct Scene {
    pub objects: &'static [SceneObject],
    pub lighting: Lighting,
}

impl Scene {
    pub fn washer_and_screw() -> Self {
        Self {
            objects: &WASHER_AND_SCREW,
            lighting: SCENE_LIGHTING,
        }
    }

    /// Objects to draw under `mode`, in table order.
    pub fn visible(&self, mode: ProjectionMode) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects.iter().filter(move |object| object.visible_in(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TEXTURE_UNIT_COUNT;

    #[test]
    fn ground_plane_is_drawn_twice_in_perspective() {
        let scene = Scene::washer_and_screw();

        assert_eq!(scene.visible(ProjectionMode::Perspective).count(), 14);
        assert_eq!(scene.visible(ProjectionMode::Orthographic).count(), 13);

        let planes: Vec<_> = scene
            .visible(ProjectionMode::Perspective)
            .take(2)
            .map(|o| o.model_matrix())
            .collect();
        assert_eq!(planes[0], planes[1]);
    }

    #[test]
    fn table_matches_assembly_literals() {
        use Shape::*;

        // (shape, unit, scale, axis, degrees, translation, rgb)
        #[rustfmt::skip]
        let expected: [(Shape, usize, [f32; 3], [f32; 3], f32, [f32; 3], [f32; 3]); 14] = [
            (Plane,    2, [6.0, 1.0, 6.0],    [1.0, 1.0, 1.0],   0.0,  [0.0, 0.0, 0.0],    [1.0, 0.0, 0.0]),
            (Plane,    2, [6.0, 1.0, 6.0],    [1.0, 1.0, 1.0],   0.0,  [0.0, 0.0, 0.0],    [1.0, 0.0, 0.0]),
            (Cylinder, 0, [0.5, 2.0, 0.5],    [1.0, 1.0, 1.0],   0.0,  [0.0, 0.0, 0.0],    [1.0, 1.0, 0.0]),
            (Box,      0, [3.0, 0.35, 0.6],   [0.0, 0.0, 1.0],   -45.0, [1.7, 1.2, 0.0],   [0.5, 0.5, 0.0]),
            (Cylinder, 0, [0.5, 0.1, 0.5],    [1.0, 1.0, 1.0],   0.0,  [-3.0, 0.0, 4.0],   [1.0, 1.0, 0.0]),
            (Torus,    1, [0.2, 0.2, 0.5],    [1.0, 0.0, 0.0],   90.0, [-3.0, 0.1, 4.0],   [0.0, 0.0, 1.0]),
            (Cylinder, 4, [0.3, 0.1, 0.3],    [1.0, 1.0, 1.0],   0.0,  [0.0, 0.0, 1.5],    [1.0, 1.0, 0.0]),
            (Cylinder, 4, [0.3, 0.1, 0.3],    [1.0, 1.0, 1.0],   0.0,  [-2.0, 0.0, -1.5],  [1.0, 1.0, 0.0]),
            (Cylinder, 0, [0.1, -0.57, 0.1],  [-13.0, 0.0, 1.0], -60.0, [-2.0, 0.37, -1.7], [1.0, 1.0, 0.0]),
            (Cylinder, 0, [0.3, 0.1, 0.3],    [-13.0, 0.0, 1.0], -60.0, [-2.0, 0.37, -1.7], [1.0, 1.0, 0.0]),
            (Torus,    1, [0.5, 0.5, 1.0],    [1.0, 0.0, 0.0],   90.0, [0.0, 2.0, 0.0],    [0.0, 0.0, 1.0]),
            (Cylinder, 0, [0.3, 0.1, 0.3],    [1.0, 0.0, 1.0],   0.0,  [-2.8, 0.0, -3.7],  [1.0, 1.0, 0.0]),
            (Cylinder, 0, [0.1, -0.65, 0.1],  [1.0, 0.0, 1.0],   0.0,  [-2.8, 0.7, -3.7],  [1.0, 1.0, 0.0]),
            (Sphere,   3, [1.0, 1.0, 1.0],    [1.0, 1.0, 1.0],   0.0,  [10.0, 6.0, -4.0],  [0.0, 1.0, 0.0]),
        ];

        for (object, (shape, unit, scale, axis, angle, translation, rgb)) in
            WASHER_AND_SCREW.iter().zip(expected)
        {
            assert_eq!(object.shape, shape, "{}", object.name);
            assert_eq!(object.texture_unit, unit, "{}", object.name);
            assert_eq!(object.scale, Vec3::from(scale), "{}", object.name);
            assert_eq!(object.rotation.axis, Vec3::from(axis), "{}", object.name);
            assert!(
                (object.rotation.angle - angle.to_radians()).abs() < 1e-6,
                "{}",
                object.name
            );
            assert_eq!(object.translation, Vec3::from(translation), "{}", object.name);
            assert_eq!(object.color, Vec3::from(rgb).extend(1.0), "{}", object.name);
        }
        assert_eq!(
            WASHER_AND_SCREW.map(|o| o.perspective_only),
            [false, true, false, false, false, false, false, false, false, false, false, false, false, false]
        );
    }

    #[test]
    fn texture_units_are_in_range() {
        assert!(
            WASHER_AND_SCREW
                .iter()
                .all(|o| o.texture_unit < TEXTURE_UNIT_COUNT)
        );
    }

    #[test]
    fn model_matrix_scales_before_translating() {
        let button = &WASHER_AND_SCREW[6];
        let rim = button.model_matrix().transform_point3(Vec3::new(1.0, 1.0, 0.0));

        assert!(rim.abs_diff_eq(Vec3::new(0.3, 0.1, 1.5), 1e-6));
    }

    #[test]
    fn angled_box_rotates_about_z() {
        let angled = &WASHER_AND_SCREW[3];
        let end = angled.model_matrix().transform_point3(Vec3::new(0.5, 0.0, 0.0));

        // Half the 3-unit length, tipped 45 degrees down to the right.
        let half = 1.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert!(end.abs_diff_eq(Vec3::new(1.7 + half, 1.2 - half, 0.0), 1e-5));
    }

    #[test]
    fn zero_angle_rotations_are_identity() {
        assert_eq!(GROUND.rotation.matrix(), Mat4::IDENTITY);
        assert_eq!(WASHER_AND_SCREW[11].rotation.matrix(), Mat4::IDENTITY);
        assert_eq!(Rotation::new(Vec3::ZERO, 1.0).matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn torus_rings_lie_flat() {
        let ring = &WASHER_AND_SCREW[10];
        // Generated in the XY plane, so +Y swings onto +Z.
        let p = ring.model_matrix().transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(0.0, 2.0, 0.5), 1e-5));
    }

    #[test]
    fn angled_screw_parts_share_a_pose() {
        let shaft = &WASHER_AND_SCREW[8];
        let head = &WASHER_AND_SCREW[9];

        assert_eq!(shaft.rotation, head.rotation);
        assert_eq!(shaft.translation, head.translation);
        assert!(shaft.scale.y < 0.0);
    }

    #[test]
    fn lighting_constants() {
        let lighting = Scene::washer_and_screw().lighting;

        assert_eq!(lighting.ambient_strength, 0.4);
        assert_eq!(lighting.lights[0].color, Vec3::new(1.0, 0.5, 0.1));
        assert_eq!(lighting.lights[1].position, Vec3::new(-2.0, 3.0, 2.0));
        assert!(lighting.lights.iter().all(|l| l.highlight_size == 12.0));
    }
}
