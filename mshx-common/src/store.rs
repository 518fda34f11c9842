//! Geometry store
//!
//! A single owned container for everything a conversion works on: vertex,
//! normal and texture coordinate arrays, faces that index into them, and the
//! material table. Pipeline stages take `&mut GeometryStore` and must leave
//! every face index valid when they return.

use glam::Vec3;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Per-corner index array of a face (3 or 4 entries, or empty when absent)
pub type Corners = SmallVec<[u32; 4]>;

/// Vertex position with homogeneous w and an ARGB color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub a: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Vertex {
    /// Origin, w = 1.0, opaque white
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
            a: 1.0,
            r: 1.0,
            g: 1.0,
            b: 1.0,
        }
    }
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    /// Vertex with an explicit RGB color (alpha stays opaque)
    pub fn with_color(x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> Self {
        Self {
            r,
            g,
            b,
            ..Self::new(x, y, z)
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Unit-length normal direction (w = 0.0)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Normal {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Normal {
    /// Create a normal from a raw direction, normalizing it.
    ///
    /// A zero-length direction yields the zero vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        let n = Vec3::new(x, y, z).normalize_or_zero();
        Self {
            x: n.x,
            y: n.y,
            z: n.z,
            w: 0.0,
        }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Texture coordinate (a third source component is not retained)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
}

impl TexCoord {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Tangent frame. Reserved: the pipeline never populates tangents and the
/// serialized tangent count is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tangent {
    pub tangent: Normal,
    pub bitangent: Normal,
}

/// Mesh-wide vertex record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum VertexType {
    /// x, y, z
    #[default]
    Position = 0,
    /// x, y, z, a, r, g, b
    PositionColor = 1,
}

impl VertexType {
    #[inline]
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Position),
            1 => Some(Self::PositionColor),
            _ => None,
        }
    }

    #[inline]
    pub fn has_color(self) -> bool {
        self == Self::PositionColor
    }
}

/// Selects one of a face's per-corner index arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerSet {
    Vertex,
    Normal,
    TexCoord,
    Tangent,
}

impl CornerSet {
    pub const ALL: [CornerSet; 4] = [
        CornerSet::Vertex,
        CornerSet::Normal,
        CornerSet::TexCoord,
        CornerSet::Tangent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CornerSet::Vertex => "vertex",
            CornerSet::Normal => "normal",
            CornerSet::TexCoord => "texture coordinate",
            CornerSet::Tangent => "tangent",
        }
    }
}

/// Polygon face (triangle or quad)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Face {
    /// Vertex indices; the face degree is `v.len()`
    pub v: Corners,
    /// Normal indices (empty when the source has none)
    pub n: Corners,
    /// Texture coordinate indices (empty when the source has none)
    pub uv: Corners,
    /// Tangent indices (never populated by the current pipeline)
    pub t: Corners,
    /// Index into the material table, resolved from `material_name`
    pub material_id: u32,
    /// Material name as referenced by the source
    pub material_name: String,
    /// Morton code of the face centroid, only meaningful during optimization
    pub spatial_code: u32,
}

impl Face {
    pub fn new(v: &[u32]) -> Self {
        Self {
            v: Corners::from_slice(v),
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, n: &[u32]) -> Self {
        self.n = Corners::from_slice(n);
        self
    }

    pub fn with_uvs(mut self, uv: &[u32]) -> Self {
        self.uv = Corners::from_slice(uv);
        self
    }

    pub fn with_material(mut self, name: impl Into<String>) -> Self {
        self.material_name = name.into();
        self
    }

    /// Polygon degree (3 or 4 for a valid face)
    #[inline]
    pub fn edges(&self) -> u8 {
        self.v.len() as u8
    }

    #[inline]
    pub fn is_quad(&self) -> bool {
        self.v.len() == 4
    }

    pub fn corners(&self, set: CornerSet) -> &Corners {
        match set {
            CornerSet::Vertex => &self.v,
            CornerSet::Normal => &self.n,
            CornerSet::TexCoord => &self.uv,
            CornerSet::Tangent => &self.t,
        }
    }

    pub fn corners_mut(&mut self, set: CornerSet) -> &mut Corners {
        match set {
            CornerSet::Vertex => &mut self.v,
            CornerSet::Normal => &mut self.n,
            CornerSet::TexCoord => &mut self.uv,
            CornerSet::Tangent => &mut self.t,
        }
    }
}

/// Illumination model and surface parameters of one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    /// Lookup key only, not serialized
    pub name: String,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub ambient: [f32; 3],
    pub transmissive: [f32; 3],
    pub emissive: [f32; 3],
    /// Specular power (Ns)
    pub power: f32,
    pub transparency: f32,
    pub refractivity: f32,
    /// Illumination mode (0-10)
    pub illum: u32,
    pub roughness: f32,
    pub metallic: f32,
    pub sheen: f32,
    pub clearcoat_thickness: f32,
    pub clearcoat_roughness: f32,
    pub aniso: f32,
    pub aniso_rotation: f32,
    /// Diffuse texture map filename
    pub texture: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Bounding sphere of the mesh vertices
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// True if `point` lies within `radius + epsilon` of the center
    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        let d = (point - self.center).as_dvec3().length();
        d <= f64::from(self.radius) + f64::from(epsilon)
    }

    /// `[center.x, center.y, center.z, radius]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.center.x, self.center.y, self.center.z, self.radius]
    }

    pub fn from_array(a: [f32; 4]) -> Self {
        Self::new(Vec3::new(a[0], a[1], a[2]), a[3])
    }
}

/// Index consistency violations found by [`GeometryStore::check_indices`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("face {face}: unsupported polygon degree {edges} (only triangles and quads)")]
    UnsupportedDegree { face: usize, edges: usize },

    #[error("face {face}: {attribute} index {index} out of range (count {count})")]
    IndexOutOfRange {
        face: usize,
        attribute: &'static str,
        index: u32,
        count: usize,
    },

    #[error("face {face}: has {len} {attribute} indices but {edges} corners")]
    CornerCountMismatch {
        face: usize,
        attribute: &'static str,
        len: usize,
        edges: usize,
    },

    #[error("face {face}: missing {attribute} indices while the mesh has {count} entries")]
    MissingCorners {
        face: usize,
        attribute: &'static str,
        count: usize,
    },

    #[error("face {face}: material {material} out of range (count {count})")]
    MaterialOutOfRange {
        face: usize,
        material: u32,
        count: usize,
    },
}

/// Owned mesh data passed through every pipeline stage
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    pub vertices: Vec<Vertex>,
    pub normals: Vec<Normal>,
    pub tex_coords: Vec<TexCoord>,
    /// Always empty in this pipeline version
    pub tangents: Vec<Tangent>,
    pub faces: Vec<Face>,
    pub materials: Vec<Material>,
    /// Material name -> index into `materials`
    pub material_map: HashMap<String, u32>,
    pub vertex_type: VertexType,
    pub bound_sphere: BoundSphere,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a material and register its name.
    ///
    /// A repeated name re-points the lookup at the newest definition.
    pub fn add_material(&mut self, material: Material) -> u32 {
        let index = self.materials.len() as u32;
        self.material_map.insert(material.name.clone(), index);
        self.materials.push(material);
        index
    }

    pub fn material_index(&self, name: &str) -> Option<u32> {
        self.material_map.get(name).copied()
    }

    /// Resolve every face's `material_name` to a `material_id`.
    ///
    /// Names missing from the table resolve to index 0. Returns the number of
    /// faces that missed.
    pub fn resolve_materials(&mut self) -> usize {
        let mut misses = 0;
        for face in &mut self.faces {
            face.material_id = match self.material_map.get(face.material_name.as_str()) {
                Some(&index) => index,
                None => {
                    misses += 1;
                    0
                }
            };
        }
        misses
    }

    /// Number of entries in the attribute array a corner set indexes
    pub fn attribute_len(&self, set: CornerSet) -> usize {
        match set {
            CornerSet::Vertex => self.vertices.len(),
            CornerSet::Normal => self.normals.len(),
            CornerSet::TexCoord => self.tex_coords.len(),
            CornerSet::Tangent => self.tangents.len(),
        }
    }

    /// Check that every face references valid attribute and material entries.
    pub fn check_indices(&self) -> Result<(), StoreError> {
        for (fi, face) in self.faces.iter().enumerate() {
            let edges = face.v.len();
            if !(3..=4).contains(&edges) {
                return Err(StoreError::UnsupportedDegree { face: fi, edges });
            }

            for set in CornerSet::ALL {
                let corners = face.corners(set);
                let count = self.attribute_len(set);

                if corners.is_empty() {
                    if count > 0 && matches!(set, CornerSet::Normal | CornerSet::TexCoord) {
                        return Err(StoreError::MissingCorners {
                            face: fi,
                            attribute: set.name(),
                            count,
                        });
                    }
                    continue;
                }

                if corners.len() != edges {
                    return Err(StoreError::CornerCountMismatch {
                        face: fi,
                        attribute: set.name(),
                        len: corners.len(),
                        edges,
                    });
                }

                if let Some(&index) = corners.iter().find(|&&i| i as usize >= count) {
                    return Err(StoreError::IndexOutOfRange {
                        face: fi,
                        attribute: set.name(),
                        index,
                        count,
                    });
                }
            }

            // A mesh without a material library may only use the default slot
            let count = self.materials.len();
            let valid = if count == 0 {
                face.material_id == 0
            } else {
                (face.material_id as usize) < count
            };
            if !valid {
                return Err(StoreError::MaterialOutOfRange {
                    face: fi,
                    material: face.material_id,
                    count,
                });
            }
        }
        Ok(())
    }
}
