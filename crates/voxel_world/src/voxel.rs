//! Voxel identity and the per-type property registry.

/// A single voxel's type identity. `0` is always AIR.
pub type VoxelId = u8;

pub const AIR: VoxelId = 0;

/// How many distinct texture tiles a block type needs, and which faces share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacePattern {
    /// One tile for all six faces.
    Uniform,
    /// One tile for top+bottom, one for the four sides.
    TopBottomDifferent,
    /// Separate top, side, bottom tiles.
    AllDifferent,
    /// Four tiles keyed by horizontal orientation (e.g. furnace front).
    Directional,
    /// All six faces independently textured.
    AllFacesDifferent,
}

impl FacePattern {
    /// Number of distinct atlas tile-slots this pattern requires.
    pub fn atlas_slot_count(self) -> u8 {
        match self {
            FacePattern::Uniform => 1,
            FacePattern::TopBottomDifferent => 2,
            FacePattern::AllDifferent => 3,
            FacePattern::Directional => 4,
            FacePattern::AllFacesDifferent => 6,
        }
    }

    pub fn requires_side_atlas(self) -> bool {
        !matches!(self, FacePattern::Uniform)
    }

    pub fn requires_bottom_atlas(self) -> bool {
        matches!(
            self,
            FacePattern::AllDifferent | FacePattern::AllFacesDifferent
        )
    }
}

/// Cardinal face direction, used to select which atlas tile a quad samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Top,
    Bottom,
    North,
    South,
    East,
    West,
}

impl Face {
    /// Face corresponding to a unit-length axis-aligned normal.
    pub fn from_normal(nx: i32, ny: i32, nz: i32) -> Self {
        if ny > 0 {
            Face::Top
        } else if ny < 0 {
            Face::Bottom
        } else if nx > 0 {
            Face::East
        } else if nx < 0 {
            Face::West
        } else if nz > 0 {
            Face::South
        } else {
            Face::North
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Face::North | Face::South | Face::East | Face::West)
    }
}

/// Which physical atlas texture a vertex samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtlasSlot {
    Main = 0,
    Side = 1,
    Bottom = 2,
}

/// Static properties of one voxel type. Registered once at process start.
#[derive(Debug, Clone)]
pub struct VoxelProperties {
    pub name: &'static str,
    pub solid: bool,
    pub transparent: bool,
    pub face_pattern: FacePattern,
}

impl VoxelProperties {
    const fn new(name: &'static str, solid: bool, transparent: bool, pattern: FacePattern) -> Self {
        VoxelProperties {
            name,
            solid,
            transparent,
            face_pattern: pattern,
        }
    }

    /// Atlas slot a given face should sample from, per this type's face pattern.
    pub fn atlas_slot_for(&self, face: Face) -> AtlasSlot {
        match self.face_pattern {
            FacePattern::Uniform => AtlasSlot::Main,
            FacePattern::TopBottomDifferent => {
                if face.is_horizontal() {
                    AtlasSlot::Side
                } else {
                    AtlasSlot::Main
                }
            }
            FacePattern::AllDifferent | FacePattern::Directional | FacePattern::AllFacesDifferent => {
                match face {
                    Face::Top => AtlasSlot::Main,
                    Face::Bottom => AtlasSlot::Bottom,
                    _ => AtlasSlot::Side,
                }
            }
        }
    }
}

const DEFAULT_PROPS: VoxelProperties = VoxelProperties::new("unknown", false, true, FacePattern::Uniform);

/// The fixed, process-wide table of known voxel types.
///
/// Indexed by `VoxelId`; any id beyond the table's length is treated as
/// [`DEFAULT_PROPS`] (non-solid, transparent) rather than a lookup failure.
static REGISTRY: &[VoxelProperties] = &[
    VoxelProperties::new("air", false, true, FacePattern::Uniform), // 0
    VoxelProperties::new("stone", true, false, FacePattern::Uniform), // 1
    VoxelProperties::new("dirt", true, false, FacePattern::Uniform), // 2
    VoxelProperties::new("grass", true, false, FacePattern::AllDifferent), // 3
    VoxelProperties::new("wood", true, false, FacePattern::TopBottomDifferent), // 4
    VoxelProperties::new("leaves", true, true, FacePattern::Uniform), // 5
    VoxelProperties::new("water", false, true, FacePattern::Uniform), // 6
    VoxelProperties::new("sand", true, false, FacePattern::Uniform), // 7
];

/// Look up a voxel type's static properties. Infallible: unknown ids get a
/// non-solid, transparent default rather than erroring.
pub fn properties(id: VoxelId) -> &'static VoxelProperties {
    REGISTRY.get(id as usize).unwrap_or(&DEFAULT_PROPS)
}

pub fn is_solid(id: VoxelId) -> bool {
    id != AIR && properties(id).solid
}

pub fn is_transparent(id: VoxelId) -> bool {
    properties(id).transparent
}
