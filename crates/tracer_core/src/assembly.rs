//! Assemblies, instances, and the closed `Object` variant set.
//!
//! An `Assembly` is a bag of objects, sub-assemblies, and instances
//! pointing into its own `objects` vector (which may itself hold
//! `Object::AssemblyRef` entries referencing `sub_assemblies`). Mutable
//! during scene build, then `finalize`d exactly once into an immutable,
//! renderable form with its own instance BVH and light index.

use std::ops::Range;

use tracer_math::{Aabb, Mat4, Vec3};

use crate::bvh::{traverse_stream, AnyBvh, Boundable, BvhWidth, FlatBvh};
use crate::config::Config;
use crate::error::BuildError;
use crate::intersection::Intersection;
use crate::patch::{BicubicBezierPatch, BilinearPatch};
use crate::primitives::{RectangleLight, Sphere, SphereLight};
use crate::ray::Ray;
use crate::shading::ShaderTable;
use crate::transform::Transform;

/// A parametric surface built from a coarse control cage, refined by
/// subdivision. No subdivision-refinement algorithm is implemented here —
/// `Assembly::finalize`'s closed `Object` set names this variant, but the
/// subdivision math itself is not one of the components this crate
/// builds. It is represented, and intersected, as the bilinear patch over
/// its boundary cage; a renderer that needs true Catmull-Clark refinement
/// would replace this with a real limit-surface evaluator.
#[derive(Debug, Clone)]
pub struct SubdivisionSurface(pub BilinearPatch);

impl SubdivisionSurface {
    pub fn bounds(&self) -> Vec<Aabb> {
        self.0.bound().samples().to_vec()
    }
}

/// The closed set of geometric and light primitives an instance can point
/// to. Dispatch is a `match`, not a trait object — the set of kinds is
/// fixed, so there is no open-ended extension point to support.
pub enum Object {
    Sphere(Sphere),
    BilinearPatch(BilinearPatch),
    BicubicPatch(BicubicBezierPatch),
    SubdivisionSurface(SubdivisionSurface),
    RectangleLight(RectangleLight),
    SphereLight(SphereLight),
    /// A reference to one of this assembly's `sub_assemblies`, so nested
    /// assemblies are just another object kind rather than a separate
    /// addressing scheme.
    AssemblyRef(u32),
}

impl Object {
    pub fn local_bounds(&self) -> Vec<Aabb> {
        match self {
            Object::Sphere(s) => s.bounds(),
            Object::BilinearPatch(p) => p.bound().samples().to_vec(),
            Object::BicubicPatch(p) => p.bound().samples().to_vec(),
            Object::SubdivisionSurface(s) => s.bounds(),
            Object::RectangleLight(r) => r.bounds(),
            Object::SphereLight(s) => s.bounds(),
            // Resolved through the owning `Assembly::object_bounds`, which
            // has access to `sub_assemblies` and this variant alone does
            // not.
            Object::AssemblyRef(_) => Vec::new(),
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self, Object::RectangleLight(_) | Object::SphereLight(_))
    }
}

/// A placement of an object (or sub-assembly, via `Object::AssemblyRef`)
/// into the scene graph, with its own name, shader assignment, and a
/// range into the assembly's flat `transforms` array. An empty range means
/// identity; length 1 is static; length >= 2 is transform motion blur.
pub struct Instance {
    pub name: String,
    pub object_index: u32,
    pub transform_range: Range<u32>,
    pub shader_name: Option<String>,
}

/// One level of the scene graph. Mutable during build via `add_object`/
/// `add_assembly`/`instance_object`/`instance_assembly`; immutable (and
/// only then renderable) after `finalize`.
pub struct Assembly {
    objects: Vec<Object>,
    sub_assemblies: Vec<Assembly>,
    instances: Vec<Instance>,
    transforms: Vec<Mat4>,
    bvh: Option<AnyBvh>,
    light_index: Vec<u32>,
    finalized: bool,
}

impl Default for Assembly {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembly {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            sub_assemblies: Vec::new(),
            instances: Vec::new(),
            transforms: Vec::new(),
            bvh: None,
            light_index: Vec::new(),
            finalized: false,
        }
    }

    pub fn add_object(&mut self, object: Object) -> u32 {
        self.objects.push(object);
        (self.objects.len() - 1) as u32
    }

    /// Add a sub-assembly, returning the `Object` index that refers to it
    /// (via `Object::AssemblyRef`) — the value `instance_object`/
    /// `instance_assembly` both key off of.
    pub fn add_assembly(&mut self, assembly: Assembly) -> u32 {
        assert!(
            assembly.finalized,
            "a sub-assembly must be finalized before it is added, so cyclic references are structurally impossible"
        );
        let sub_index = self.sub_assemblies.len() as u32;
        self.sub_assemblies.push(assembly);
        self.add_object(Object::AssemblyRef(sub_index))
    }

    fn push_transforms(&mut self, transforms: &[Mat4]) -> Range<u32> {
        let start = self.transforms.len() as u32;
        self.transforms.extend_from_slice(transforms);
        start..(start + transforms.len() as u32)
    }

    pub fn instance_object(
        &mut self,
        name: impl Into<String>,
        object_index: u32,
        transforms: &[Mat4],
        shader_name: Option<String>,
    ) -> u32 {
        let transform_range = self.push_transforms(transforms);
        self.instances.push(Instance {
            name: name.into(),
            object_index,
            transform_range,
            shader_name,
        });
        (self.instances.len() - 1) as u32
    }

    /// Convenience wrapper for instancing a sub-assembly that was already
    /// added via `add_assembly` — equivalent to `instance_object` with the
    /// `Object::AssemblyRef` index `add_assembly` returned.
    pub fn instance_assembly(
        &mut self,
        name: impl Into<String>,
        assembly_object_index: u32,
        transforms: &[Mat4],
    ) -> u32 {
        self.instance_object(name, assembly_object_index, transforms, None)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn sub_assemblies(&self) -> &[Assembly] {
        &self.sub_assemblies
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn bvh(&self) -> Option<&AnyBvh> {
        self.bvh.as_ref()
    }

    pub fn light_index(&self) -> &[u32] {
        &self.light_index
    }

    fn object_bounds(&self, object_index: u32) -> Vec<Aabb> {
        match &self.objects[object_index as usize] {
            Object::AssemblyRef(sub_index) => root_bvh_bounds(&self.sub_assemblies[*sub_index as usize]),
            other => other.local_bounds(),
        }
    }

    /// World-space time-sampled bounds of one instance: interpolate its
    /// transform, interpolate the referenced object's local bounds, and
    /// transform the latter through the former. For an assembly instance
    /// this recurses through the sub-assembly's own root BVH bounds.
    pub fn instance_bounds(&self, instance_index: u32) -> Vec<Aabb> {
        let instance = &self.instances[instance_index as usize];
        let local_bounds = self.object_bounds(instance.object_index);
        let samples = (instance.transform_range.start..instance.transform_range.end)
            .map(|i| self.transforms[i as usize])
            .collect::<Vec<_>>();

        if samples.is_empty() {
            return local_bounds;
        }
        let transform = Transform::from_samples(&samples);
        let n = local_bounds.len().max(samples.len());
        (0..n)
            .map(|i| {
                let t = if n == 1 { 0.0 } else { i as f32 / (n - 1) as f32 };
                let local = crate::bvh::bvh2::sample_bounds(&local_bounds, t);
                transform.transform_bounds(t, local)
            })
            .collect()
    }

    /// World-space bounds of this instance at a single time `t`.
    pub fn instance_bounds_at(&self, t: f32, instance_index: u32) -> Aabb {
        let instance = &self.instances[instance_index as usize];
        let local_bounds = self.object_bounds(instance.object_index);
        let local = crate::bvh::bvh2::sample_bounds(&local_bounds, t);
        let samples: Vec<Mat4> = (instance.transform_range.start..instance.transform_range.end)
            .map(|i| self.transforms[i as usize])
            .collect();
        let transform = Transform::from_samples(&samples);
        transform.transform_bounds(t, local)
    }

    /// Build the instance BVH and the light-sampling index, and validate
    /// the scene graph: duplicate instance names, shader references that
    /// don't resolve against `shaders`, and (structurally, since
    /// sub-assemblies can only be added already-finalized) cyclic
    /// assembly references are all rejected here. `width` picks the
    /// flattened layout the instance BVH is built as.
    pub fn finalize(&mut self, shaders: &ShaderTable, width: BvhWidth) -> Result<(), BuildError> {
        let mut seen_names = std::collections::HashSet::new();
        for instance in &self.instances {
            if !seen_names.insert(instance.name.clone()) {
                return Err(BuildError::DuplicateInstanceName(instance.name.clone()));
            }
            if let Some(shader) = &instance.shader_name {
                if !shaders.contains(shader) {
                    return Err(BuildError::UnknownShader {
                        instance: instance.name.clone(),
                        shader: shader.clone(),
                    });
                }
            }
            if (instance.object_index as usize) >= self.objects.len() {
                return Err(BuildError::DanglingReference(instance.name.clone()));
            }
        }

        // Bvh2::build is generic over `Boundable`; instances need their
        // index to look up bounds, so build over a thin indexable wrapper
        // instead of implementing `Boundable` on `Instance` itself (which
        // has no back-reference to the owning assembly).
        struct InstanceRef {
            bounds: Vec<Aabb>,
        }
        impl Boundable for InstanceRef {
            fn bounds(&self) -> Vec<Aabb> {
                self.bounds.clone()
            }
        }
        let refs: Vec<InstanceRef> = (0..self.instances.len() as u32)
            .map(|i| InstanceRef {
                bounds: self.instance_bounds(i),
            })
            .collect();
        self.bvh = Some(AnyBvh::build(&refs, width));

        self.light_index = self
            .instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| {
                matches!(
                    self.objects.get(inst.object_index as usize),
                    Some(o) if o.is_light()
                )
            })
            .map(|(i, _)| i as u32)
            .collect();

        self.finalized = true;
        log::info!(
            "finalized assembly: {} instances, {} lights, {} bvh nodes",
            self.instances.len(),
            self.light_index.len(),
            self.bvh.as_ref().map_or(0, AnyBvh::node_count)
        );
        Ok(())
    }

    /// Intersect a ray-id-addressed batch against this assembly's
    /// instance BVH. Instance leaves transform the batch into local
    /// space via `arena`, dispatch to the referenced object (or recurse
    /// into a sub-assembly), then results write back through the same
    /// `ray_ids`, which is what keeps intersections correctly addressed
    /// to the original ray regardless of how many instance levels deep
    /// the traversal went.
    pub fn intersect_batch(
        &self,
        rays: &mut [Ray],
        hits: &mut [Intersection],
        ray_ids: &mut [u32],
        arena: &mut crate::arena::ScratchArena,
        config: &Config,
    ) {
        let Some(bvh) = &self.bvh else {
            return;
        };
        traverse_stream(bvh, rays, hits, ray_ids, |instance_index, rays, hits, ids| {
            self.intersect_instance(instance_index, rays, hits, ids, arena, config);
        });
    }

    /// Transform the batch addressed by `ray_ids` into this instance's
    /// local space, dispatch to its object (recursing through the arena
    /// for a nested assembly), then fold the local results — `max_t`,
    /// `done`, and any recorded `Intersection` — back into the caller's
    /// world-space `rays`/`hits` by original ray id.
    fn intersect_instance(
        &self,
        instance_index: u32,
        rays: &mut [Ray],
        hits: &mut [Intersection],
        ray_ids: &mut [u32],
        arena: &mut crate::arena::ScratchArena,
        config: &Config,
    ) {
        let instance = &self.instances[instance_index as usize];
        let samples: Vec<Mat4> = (instance.transform_range.start..instance.transform_range.end)
            .map(|i| self.transforms[i as usize])
            .collect();
        let transform = Transform::from_samples(&samples);

        let local_rays: Vec<Ray> = ray_ids
            .iter()
            .map(|&id| {
                let outer = &rays[id as usize];
                let inv = transform.inverse_sample(outer.time());
                let origin = inv.transform_point3(outer.origin());
                let dir = inv.transform_vector3(outer.direction());
                let mut local = *outer;
                local.math.origin = origin;
                local.math.direction = dir;
                local.inv_dir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
                local
            })
            .collect();
        let mut local_hits: Vec<Intersection> = ray_ids.iter().map(|&id| hits[id as usize].clone()).collect();
        let mut local_ids: Vec<u32> = (0..ray_ids.len() as u32).collect();

        let frame = arena.push(local_rays);

        match &self.objects[instance.object_index as usize] {
            Object::Sphere(s) => {
                s.intersect_batch(arena.frame_mut(frame), &mut local_hits, &local_ids, instance_index)
            }
            Object::BilinearPatch(p) => crate::patch::intersect_patch_stream(
                p,
                arena.frame_mut(frame),
                &mut local_hits,
                &mut local_ids,
                config,
                instance_index,
            ),
            Object::BicubicPatch(p) => crate::patch::intersect_patch_stream(
                p,
                arena.frame_mut(frame),
                &mut local_hits,
                &mut local_ids,
                config,
                instance_index,
            ),
            Object::SubdivisionSurface(s) => crate::patch::intersect_patch_stream(
                &s.0,
                arena.frame_mut(frame),
                &mut local_hits,
                &mut local_ids,
                config,
                instance_index,
            ),
            Object::RectangleLight(r) => {
                r.intersect_batch(arena.frame_mut(frame), &mut local_hits, &local_ids, instance_index)
            }
            Object::SphereLight(s) => {
                s.intersect_batch(arena.frame_mut(frame), &mut local_hits, &local_ids, instance_index)
            }
            Object::AssemblyRef(sub_index) => {
                // Pop back to plain ownership before recursing so the
                // sub-assembly's own traversal is free to push further
                // frames of its own at the same arena depth.
                let mut taken = arena.pop(frame);
                self.sub_assemblies[*sub_index as usize].intersect_batch(
                    &mut taken,
                    &mut local_hits,
                    &mut local_ids,
                    arena,
                    config,
                );
                let restored = arena.push(taken);
                debug_assert_eq!(restored, frame);
            }
        }

        let local_rays = arena.pop(frame);
        for (slot, &id) in ray_ids.iter().enumerate() {
            let id = id as usize;
            let local = &local_rays[slot];
            if local.max_t < rays[id].max_t {
                rays[id].max_t = local.max_t;
                if local_hits[slot].hit {
                    let mut h = local_hits[slot].clone();
                    h.point = transform.transform_point(local.time(), h.point);
                    h.normal = transform.transform_normal(local.time(), h.normal).normalize_or_zero();
                    h.world_to_local = h.world_to_local * transform.inverse_sample(local.time());
                    hits[id] = h;
                }
            }
            if local.flags.is_done() {
                rays[id].flags.set_done();
            }
        }
    }
}

fn root_bvh_bounds(assembly: &Assembly) -> Vec<Aabb> {
    match assembly.bvh() {
        Some(bvh) => match bvh.root() {
            Some(root) => {
                // A Bvh2's root bound isn't exposed directly by `FlatBvh`
                // (which only reports *child* bounds); union the bounds of
                // the root's own children at each time sample instead.
                if bvh.is_leaf(root) {
                    // Single-instance assembly: the "root" bound is that
                    // instance's own bound, recovered via instance_bounds.
                    assembly.instance_bounds(bvh.payload(root))
                } else {
                    let count = bvh.child_count(root);
                    let mut acc: Option<Vec<Aabb>> = None;
                    for c in 0..count {
                        let b = vec![bvh.child_bounds_at(root, c, 0.0), bvh.child_bounds_at(root, c, 1.0)];
                        acc = Some(match acc {
                            None => b,
                            Some(prev) => crate::bvh::build::merge_bounds(&prev, &b),
                        });
                    }
                    acc.unwrap_or_default()
                }
            }
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Sphere;

    #[test]
    fn test_add_object_and_instance() {
        let mut assembly = Assembly::new();
        let sphere = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        assembly.instance_object("ball", sphere, &[Mat4::IDENTITY], None);
        assert_eq!(assembly.instances().len(), 1);
    }

    #[test]
    fn test_finalize_rejects_duplicate_names() {
        let mut assembly = Assembly::new();
        let sphere = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        assembly.instance_object("ball", sphere, &[], None);
        assembly.instance_object("ball", sphere, &[], None);
        let shaders = ShaderTable::new();
        assert!(matches!(
            assembly.finalize(&shaders, BvhWidth::Two),
            Err(BuildError::DuplicateInstanceName(_))
        ));
    }

    #[test]
    fn test_finalize_rejects_unknown_shader() {
        let mut assembly = Assembly::new();
        let sphere = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        assembly.instance_object("ball", sphere, &[], Some("missing".into()));
        let shaders = ShaderTable::new();
        assert!(matches!(
            assembly.finalize(&shaders, BvhWidth::Two),
            Err(BuildError::UnknownShader { .. })
        ));
    }

    #[test]
    fn test_finalize_builds_light_index() {
        let mut assembly = Assembly::new();
        let ball = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        let light = assembly.add_object(Object::SphereLight(SphereLight {
            sphere: Sphere::new(vec![Vec3::new(5.0, 0.0, 0.0)], 0.5),
            radiance: [10.0, 10.0, 10.0],
        }));
        assembly.instance_object("ball", ball, &[], None);
        assembly.instance_object("sun", light, &[], None);
        let shaders = ShaderTable::new();
        assembly.finalize(&shaders, BvhWidth::Two).unwrap();
        assert_eq!(assembly.light_index(), &[1]);
    }

    #[test]
    fn test_finalize_can_build_a_width_four_hierarchy() {
        let mut assembly = Assembly::new();
        let sphere = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        for (i, x) in [-10.0, -3.0, 3.0, 10.0].into_iter().enumerate() {
            assembly.instance_object(
                format!("ball{i}"),
                sphere,
                &[Mat4::from_translation(Vec3::new(x, 0.0, 0.0))],
                None,
            );
        }
        let shaders = ShaderTable::new();
        assembly.finalize(&shaders, BvhWidth::Four).unwrap();
        assert!(matches!(assembly.bvh(), Some(crate::bvh::AnyBvh::Four(_))));

        let root = assembly.bvh().unwrap().root().unwrap();
        assert_eq!(assembly.bvh().unwrap().child_count(root), 4);
    }

    #[test]
    fn test_empty_transform_range_means_identity_bounds() {
        let mut assembly = Assembly::new();
        let ball = assembly.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        assembly.instance_object("ball", ball, &[], None);
        let bounds = assembly.instance_bounds(0);
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].x.min, -1.0);
    }
}
