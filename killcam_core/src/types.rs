//! Shared value types: samples, roles, entity addressing, invalidation tokens.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// One recorded observation of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Position in the flat-earth engineering frame
    pub position: Vector3<f64>,

    /// Orientation [roll, pitch, yaw] in degrees
    pub rotation_deg: [f64; 3],

    /// Seconds, non-decreasing within an entity
    pub time: f64,
}

impl Sample {
    /// Creates a sample with zero orientation.
    pub fn new(position: Vector3<f64>, time: f64) -> Self {
        Self {
            position,
            rotation_deg: [0.0; 3],
            time,
        }
    }

    /// Creates a sample with an orientation given in degrees.
    pub fn with_rotation(position: Vector3<f64>, rotation_deg: [f64; 3], time: f64) -> Self {
        Self {
            position,
            rotation_deg,
            time,
        }
    }

    /// Orientation as a unit quaternion (roll about X, pitch about Y, yaw about Z).
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        let [roll, pitch, yaw] = self.rotation_deg;
        UnitQuaternion::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians())
    }
}

/// The three load-bearing participants of a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The initiator
    Killer,
    /// The munition
    Weapon,
    /// The entity that was hit
    Target,
}

impl Role {
    /// All primary roles in payload order.
    pub const ALL: [Role; 3] = [Role::Killer, Role::Weapon, Role::Target];

    /// Returns the role name as used in payloads and controls.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Killer => "killer",
            Role::Weapon => "weapon",
            Role::Target => "target",
        }
    }

    /// The look role implied by following this role.
    ///
    /// Following the weapon or the killer looks at the target; following the
    /// target looks back at the killer.
    pub fn derived_look(&self) -> Role {
        match self {
            Role::Weapon => Role::Target,
            Role::Killer => Role::Target,
            Role::Target => Role::Killer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "killer" | "initiator" => Ok(Role::Killer),
            "weapon" | "munition" => Ok(Role::Weapon),
            "target" => Ok(Role::Target),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Stable id of a bystander: its index in the payload's `other` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BystanderId(pub usize);

/// Addresses one entity of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySlot {
    Primary(Role),
    Bystander(BystanderId),
}

impl std::fmt::Display for EntitySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitySlot::Primary(role) => write!(f, "{}", role),
            EntitySlot::Bystander(id) => write!(f, "other_{}", id.0),
        }
    }
}

impl From<Role> for EntitySlot {
    fn from(role: Role) -> Self {
        EntitySlot::Primary(role)
    }
}

/// Visual category of an entity, derived from the payload `cat` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Missiles and other weapons (`Weapon+Missile`)
    Munition,
    /// Fixed- and rotary-wing aircraft (`Air+FixedWing`)
    Aircraft,
    Other,
}

impl Category {
    /// Maps a recorder type tag onto a category.
    pub fn from_tag(tag: &str) -> Self {
        if tag.contains("Weapon") {
            Category::Munition
        } else if tag.contains("Air") {
            Category::Aircraft
        } else {
            Category::Other
        }
    }
}

/// Invalidation token for one loaded replay.
///
/// Every load and every teardown moves the session to a new generation;
/// anything tagged with an older generation is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    /// Returns the following generation.
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
