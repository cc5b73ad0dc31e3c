use crate::config_map::{ConfigItem, ConfigMap, ConfigMapExt};
use bevy_heavy::ComputeMassProperties3d;
use bevy_math::primitives;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// The closed set of entity types that can request item plugins.
///
/// Supporting another type means adding a variant here and to [`Entity`];
/// the attachment logic itself is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Heightfield,
    Plane,
    Box,
    Capsule,
    Cylinder,
    Mesh,
    Sphere,
    Link,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        Self::Heightfield,
        Self::Plane,
        Self::Box,
        Self::Capsule,
        Self::Cylinder,
        Self::Mesh,
        Self::Sphere,
        Self::Link,
    ];

    /// Value of the `type` key in a full configuration map.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Heightfield => "heightfield",
            Self::Plane => "plane",
            Self::Box => "box",
            Self::Capsule => "capsule",
            Self::Cylinder => "cylinder",
            Self::Mesh => "mesh",
            Self::Sphere => "sphere",
            Self::Link => "link",
        }
    }
}

/// Extraction of the generic configuration map from a typed payload.
pub trait FullConfigMap {
    /// The entity's generated keys (`type`, `name`, dimensions, `mass`)
    /// merged with its user configuration. User keys win.
    fn full_config_map(&self) -> ConfigMap;
}

/// A terrain patch sampled from an image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Heightfield {
    pub name: String,
    /// Path of the height image.
    pub file: String,
    /// Extent along x and y, height scale along z.
    pub size: Vec3,
    pub config: ConfigMap,
}

/// An infinite plane, `size` only affects visualisation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plane {
    pub name: String,
    pub size: Vec2,
    pub config: ConfigMap,
}

/// A box defined by its full edge lengths.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cuboid {
    pub name: String,
    pub size: Vec3,
    /// Density in kg/m³. When set, the full configuration reports `mass`.
    pub density: Option<f32>,
    pub config: ConfigMap,
}

/// A capsule aligned along its local z axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capsule {
    pub name: String,
    pub radius: f32,
    /// Length of the cylindrical section.
    pub length: f32,
    pub density: Option<f32>,
    pub config: ConfigMap,
}

/// A cylinder aligned along its local z axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cylinder {
    pub name: String,
    pub radius: f32,
    pub length: f32,
    pub density: Option<f32>,
    pub config: ConfigMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub file: String,
    pub scale: Vec3,
    pub config: ConfigMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sphere {
    pub name: String,
    pub radius: f32,
    pub density: Option<f32>,
    pub config: ConfigMap,
}

/// A kinematic link. Carries no geometry of its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub config: ConfigMap,
}

impl Heightfield {
    pub fn new(name: impl Into<String>, file: impl Into<String>, size: Vec3) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            size,
            config: ConfigMap::new(),
        }
    }
}

impl Plane {
    pub fn new(name: impl Into<String>, size: Vec2) -> Self {
        Self {
            name: name.into(),
            size,
            config: ConfigMap::new(),
        }
    }
}

impl Cuboid {
    pub fn new(name: impl Into<String>, size: Vec3) -> Self {
        Self {
            name: name.into(),
            size,
            density: None,
            config: ConfigMap::new(),
        }
    }
}

impl Capsule {
    pub fn new(name: impl Into<String>, radius: f32, length: f32) -> Self {
        Self {
            name: name.into(),
            radius,
            length,
            density: None,
            config: ConfigMap::new(),
        }
    }
}

impl Cylinder {
    pub fn new(name: impl Into<String>, radius: f32, length: f32) -> Self {
        Self {
            name: name.into(),
            radius,
            length,
            density: None,
            config: ConfigMap::new(),
        }
    }
}

impl Mesh {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            scale: Vec3::ONE,
            config: ConfigMap::new(),
        }
    }
}

impl Sphere {
    pub fn new(name: impl Into<String>, radius: f32) -> Self {
        Self {
            name: name.into(),
            radius,
            density: None,
            config: ConfigMap::new(),
        }
    }
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigMap::new(),
        }
    }
}

/// A type-erased wrapper so we can call [`ComputeMassProperties3d`] on any solid shape.
#[derive(Clone, Copy, Debug)]
pub enum SolidPrimitive {
    Cuboid(primitives::Cuboid),
    Cylinder(primitives::Cylinder),
    Sphere(primitives::Sphere),
    Capsule(primitives::Capsule3d),
}

impl ComputeMassProperties3d for SolidPrimitive {
    fn mass(&self, density: f32) -> f32 {
        match self {
            Self::Cuboid(s) => s.mass(density),
            Self::Cylinder(s) => s.mass(density),
            Self::Sphere(s) => s.mass(density),
            Self::Capsule(s) => s.mass(density),
        }
    }

    fn unit_principal_angular_inertia(&self) -> Vec3 {
        match self {
            Self::Cuboid(s) => s.unit_principal_angular_inertia(),
            Self::Cylinder(s) => s.unit_principal_angular_inertia(),
            Self::Sphere(s) => s.unit_principal_angular_inertia(),
            Self::Capsule(s) => s.unit_principal_angular_inertia(),
        }
    }

    fn center_of_mass(&self) -> Vec3 {
        match self {
            Self::Cuboid(s) => s.center_of_mass(),
            Self::Cylinder(s) => s.center_of_mass(),
            Self::Sphere(s) => s.center_of_mass(),
            Self::Capsule(s) => s.center_of_mass(),
        }
    }
}

fn vec3_item(v: Vec3) -> ConfigItem {
    let mut map = ConfigMap::new();
    map.insert("x".into(), f64::from(v.x).into());
    map.insert("y".into(), f64::from(v.y).into());
    map.insert("z".into(), f64::from(v.z).into());
    ConfigItem::Mapping(map)
}

fn vec2_item(v: Vec2) -> ConfigItem {
    let mut map = ConfigMap::new();
    map.insert("x".into(), f64::from(v.x).into());
    map.insert("y".into(), f64::from(v.y).into());
    ConfigItem::Mapping(map)
}

fn base_config(kind: EntityKind, name: &str) -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("type".into(), kind.type_name().into());
    map.insert("name".into(), name.into());
    map
}

fn set(map: &mut ConfigMap, key: &str, value: impl Into<ConfigItem>) {
    map.insert(key.into(), value.into());
}

/// Inserts `mass` when a density is known, then layers the user config on top.
fn finish(
    mut map: ConfigMap,
    solid: Option<(SolidPrimitive, f32)>,
    user: &ConfigMap,
) -> ConfigMap {
    if let Some((shape, density)) = solid {
        set(&mut map, "density", f64::from(density));
        set(&mut map, "mass", f64::from(shape.mass(density)));
    }
    map.merge(user);
    map
}

impl FullConfigMap for Heightfield {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Heightfield, &self.name);
        set(&mut map, "file", self.file.as_str());
        set(&mut map, "size", vec3_item(self.size));
        finish(map, None, &self.config)
    }
}

impl FullConfigMap for Plane {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Plane, &self.name);
        set(&mut map, "size", vec2_item(self.size));
        finish(map, None, &self.config)
    }
}

impl FullConfigMap for Cuboid {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Box, &self.name);
        set(&mut map, "size", vec3_item(self.size));
        let solid = SolidPrimitive::Cuboid(primitives::Cuboid::from_size(self.size));
        finish(map, self.density.map(|d| (solid, d)), &self.config)
    }
}

impl FullConfigMap for Capsule {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Capsule, &self.name);
        set(&mut map, "radius", f64::from(self.radius));
        set(&mut map, "length", f64::from(self.length));
        let solid = SolidPrimitive::Capsule(primitives::Capsule3d::new(self.radius, self.length));
        finish(map, self.density.map(|d| (solid, d)), &self.config)
    }
}

impl FullConfigMap for Cylinder {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Cylinder, &self.name);
        set(&mut map, "radius", f64::from(self.radius));
        set(&mut map, "length", f64::from(self.length));
        let solid = SolidPrimitive::Cylinder(primitives::Cylinder::new(self.radius, self.length));
        finish(map, self.density.map(|d| (solid, d)), &self.config)
    }
}

impl FullConfigMap for Mesh {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Mesh, &self.name);
        set(&mut map, "file", self.file.as_str());
        set(&mut map, "scale", vec3_item(self.scale));
        finish(map, None, &self.config)
    }
}

impl FullConfigMap for Sphere {
    fn full_config_map(&self) -> ConfigMap {
        let mut map = base_config(EntityKind::Sphere, &self.name);
        set(&mut map, "radius", f64::from(self.radius));
        let solid = SolidPrimitive::Sphere(primitives::Sphere::new(self.radius));
        finish(map, self.density.map(|d| (solid, d)), &self.config)
    }
}

impl FullConfigMap for Link {
    fn full_config_map(&self) -> ConfigMap {
        finish(base_config(EntityKind::Link, &self.name), None, &self.config)
    }
}

/// Payload of any supported entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Entity {
    Heightfield(Heightfield),
    Plane(Plane),
    Box(Cuboid),
    Capsule(Capsule),
    Cylinder(Cylinder),
    Mesh(Mesh),
    Sphere(Sphere),
    Link(Link),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Heightfield(_) => EntityKind::Heightfield,
            Self::Plane(_) => EntityKind::Plane,
            Self::Box(_) => EntityKind::Box,
            Self::Capsule(_) => EntityKind::Capsule,
            Self::Cylinder(_) => EntityKind::Cylinder,
            Self::Mesh(_) => EntityKind::Mesh,
            Self::Sphere(_) => EntityKind::Sphere,
            Self::Link(_) => EntityKind::Link,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Heightfield(e) => &e.name,
            Self::Plane(e) => &e.name,
            Self::Box(e) => &e.name,
            Self::Capsule(e) => &e.name,
            Self::Cylinder(e) => &e.name,
            Self::Mesh(e) => &e.name,
            Self::Sphere(e) => &e.name,
            Self::Link(e) => &e.name,
        }
    }

    /// The user part of the configuration, without generated keys.
    pub fn config(&self) -> &ConfigMap {
        match self {
            Self::Heightfield(e) => &e.config,
            Self::Plane(e) => &e.config,
            Self::Box(e) => &e.config,
            Self::Capsule(e) => &e.config,
            Self::Cylinder(e) => &e.config,
            Self::Mesh(e) => &e.config,
            Self::Sphere(e) => &e.config,
            Self::Link(e) => &e.config,
        }
    }

    fn config_mut(&mut self) -> &mut ConfigMap {
        match self {
            Self::Heightfield(e) => &mut e.config,
            Self::Plane(e) => &mut e.config,
            Self::Box(e) => &mut e.config,
            Self::Capsule(e) => &mut e.config,
            Self::Cylinder(e) => &mut e.config,
            Self::Mesh(e) => &mut e.config,
            Self::Sphere(e) => &mut e.config,
            Self::Link(e) => &mut e.config,
        }
    }

    /// Replaces the user configuration (builder pattern).
    pub fn with_config(mut self, config: ConfigMap) -> Self {
        *self.config_mut() = config;
        self
    }
}

impl FullConfigMap for Entity {
    fn full_config_map(&self) -> ConfigMap {
        match self {
            Self::Heightfield(e) => e.full_config_map(),
            Self::Plane(e) => e.full_config_map(),
            Self::Box(e) => e.full_config_map(),
            Self::Capsule(e) => e.full_config_map(),
            Self::Cylinder(e) => e.full_config_map(),
            Self::Mesh(e) => e.full_config_map(),
            Self::Sphere(e) => e.full_config_map(),
            Self::Link(e) => e.full_config_map(),
        }
    }
}

macro_rules! entity_from {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Entity {
                fn from(payload: $payload) -> Self {
                    Self::$variant(payload)
                }
            }
        )*
    };
}

entity_from! {
    Heightfield => Heightfield,
    Plane => Plane,
    Cuboid => Box,
    Capsule => Capsule,
    Cylinder => Cylinder,
    Mesh => Mesh,
    Sphere => Sphere,
    Link => Link,
}
