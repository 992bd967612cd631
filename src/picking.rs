//! Ray casting against scene colliders.
//!
//! - [`Ray`]: a world-space ray, built from a controller pose or a screen point
//! - [`Collider`]: the hit shape attached to an interactable node
//! - [`RayHit`]: the nearest intersection found by [`raycast`]
//!
//! Colliders are tested in the node's local space: the ray is carried through
//! the inverse of the node's world matrix, intersected against the untransformed
//! shape, and the hit point is carried back. Rotation, non-uniform scale and
//! parent transforms therefore all behave, which matters for the panel's flat
//! quads.
//!
//! ```
//! use vr180::{Collider, Ray, Vec2, Vec3, Mat4};
//! use vr180::picking::raycast;
//!
//! let world = hecs::World::new().reserve_entity();
//! let quad = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0));
//! let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
//! let hit = raycast([(world, quad, Collider::quad(Vec2::ONE))], &ray, 0.1, 5.0).unwrap();
//! assert!((hit.distance - 2.0).abs() < 1e-5);
//! ```

use glam::{Mat4, Vec2, Vec3};

/// A ray with a normalized direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray through a screen pixel, starting on the near plane.
    pub fn from_screen(
        screen_x: f32,
        screen_y: f32,
        screen_width: f32,
        screen_height: f32,
        view_matrix: Mat4,
        projection_matrix: Mat4,
    ) -> Self {
        let ndc_x = (2.0 * screen_x / screen_width) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen_y / screen_height); // Y is flipped

        let near_clip = glam::Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far_clip = glam::Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let inv_view_proj = (projection_matrix * view_matrix).inverse();

        let near_world = inv_view_proj * near_clip;
        let far_world = inv_view_proj * far_clip;

        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the z = 0 plane within `half_size` of the origin.
    ///
    /// Both faces count; panel quads are hit from either side.
    pub fn intersect_quad(&self, half_size: Vec2) -> Option<f32> {
        if self.direction.z.abs() < f32::EPSILON {
            return None;
        }
        let t = -self.origin.z / self.direction.z;
        if t <= 0.0 {
            return None;
        }
        let p = self.point_at(t);
        (p.x.abs() <= half_size.x && p.y.abs() <= half_size.y).then_some(t)
    }

    /// Distance to the nearest forward intersection with a sphere.
    ///
    /// From inside the sphere this is the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }

    /// This ray expressed in the space `matrix` maps *into*.
    pub fn transformed(&self, matrix: Mat4) -> Self {
        Self::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
        )
    }
}

/// Hit shape of an interactable, in the node's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// A rectangle in the local XY plane, centered on the origin.
    Quad { half_size: Vec2 },
    /// A sphere centered on the origin.
    Sphere { radius: f32 },
}

impl Collider {
    /// Rectangle of full dimensions `size`.
    pub fn quad(size: Vec2) -> Self {
        Self::Quad {
            half_size: size * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Local-space hit distance along `local_ray`.
    pub fn intersect_local(&self, local_ray: &Ray) -> Option<f32> {
        match self {
            Collider::Quad { half_size } => local_ray.intersect_quad(*half_size),
            Collider::Sphere { radius } => local_ray.intersect_sphere(Vec3::ZERO, *radius),
        }
    }

    /// World-space hit of `ray` against this collider placed by `world`.
    ///
    /// Returns the world distance and the world hit point.
    pub fn intersect(&self, ray: &Ray, world: Mat4) -> Option<(f32, Vec3)> {
        let inverse = world.inverse();
        if !inverse.is_finite() {
            return None;
        }
        let local_ray = ray.transformed(inverse);
        let t = self.intersect_local(&local_ray)?;
        let point = world.transform_point3(local_ray.point_at(t));
        let distance = (point - ray.origin).dot(ray.direction);
        Some((distance, point))
    }
}

/// The nearest intersection along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: hecs::Entity,
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
}

/// Cast `ray` against `candidates` and keep the closest hit in `[near, far]`.
///
/// Hits behind the closest one are discarded even if they are interactable.
pub fn raycast(
    candidates: impl IntoIterator<Item = (hecs::Entity, Mat4, Collider)>,
    ray: &Ray,
    near: f32,
    far: f32,
) -> Option<RayHit> {
    candidates
        .into_iter()
        .filter_map(|(entity, world, collider)| {
            let (distance, point) = collider.intersect(ray, world)?;
            (distance >= near && distance <= far).then_some(RayHit {
                entity,
                distance,
                point,
            })
        })
        .min_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
