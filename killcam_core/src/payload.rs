//! The inbound kill payload.
//!
//! This is the fixed JSON shape returned by the retrieval service. It is
//! validated once at load time; everything downstream can rely on the array
//! lengths and time ordering checked here.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{KillcamError, Result};
use crate::types::{Category, Role, Sample};

/// Distance between weapon and target at impact.
///
/// The retrieval service sends either a number or a label such as `"3.21m"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImpactDistance {
    Meters(f64),
    Label(String),
}

impl ImpactDistance {
    /// Numeric distance, if one can be read.
    pub fn meters(&self) -> Option<f64> {
        match self {
            ImpactDistance::Meters(m) => Some(*m),
            ImpactDistance::Label(label) => label.trim().trim_end_matches('m').trim().parse().ok(),
        }
    }
}

/// Recorded track of one entity, as delivered by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Recorder object id
    #[serde(default)]
    pub id: Option<i64>,

    pub name: String,

    /// Vehicle or weapon type name
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Recorder category tag, e.g. `Air+FixedWing`
    pub cat: String,

    pub color: String,

    /// Positions [x, y, z]
    pub coord: Vec<[f64; 3]>,

    /// Orientations [roll, pitch, yaw] in degrees
    pub rot: Vec<[f64; 3]>,

    /// Sample times in seconds
    pub time_step: Vec<f64>,

    /// Heading in degrees, when the recorder provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<Vec<f64>>,
}

impl EntityRecord {
    /// Number of samples in this record.
    pub fn len(&self) -> usize {
        self.time_step.len()
    }

    /// Returns true if the record has no samples.
    pub fn is_empty(&self) -> bool {
        self.time_step.is_empty()
    }

    /// Visual category derived from the `cat` tag.
    pub fn category(&self) -> Category {
        Category::from_tag(&self.cat)
    }

    /// Zips the parallel arrays into samples.
    pub fn samples(&self) -> Vec<Sample> {
        self.coord
            .iter()
            .zip(&self.rot)
            .zip(&self.time_step)
            .map(|((c, r), t)| Sample::with_rotation(Vector3::new(c[0], c[1], c[2]), *r, *t))
            .collect()
    }

    /// Checks array lengths, finiteness and time ordering.
    ///
    /// Short records pass: fewer than two samples is reported later, when the
    /// track is built, so one bad entity does not sink the whole replay.
    pub fn validate(&self, label: &str) -> Result<()> {
        let n = self.time_step.len();
        if self.coord.len() != n || self.rot.len() != n {
            return Err(KillcamError::malformed(format!(
                "{}: coord/rot/time_step lengths differ ({}/{}/{})",
                label,
                self.coord.len(),
                self.rot.len(),
                n
            )));
        }
        if let Some(heading) = &self.heading {
            if heading.len() != n {
                return Err(KillcamError::malformed(format!(
                    "{}: heading has {} entries, expected {}",
                    label,
                    heading.len(),
                    n
                )));
            }
        }

        let non_finite = self
            .coord
            .iter()
            .flatten()
            .chain(self.rot.iter().flatten())
            .chain(self.time_step.iter())
            .any(|v| !v.is_finite());
        if non_finite {
            return Err(KillcamError::malformed(format!("{}: non-finite value", label)));
        }

        if let Some(i) = self.time_step.windows(2).position(|w| w[1] < w[0]) {
            return Err(KillcamError::malformed(format!(
                "{}: time_step decreases at index {} ({} -> {})",
                label,
                i + 1,
                self.time_step[i],
                self.time_step[i + 1]
            )));
        }

        Ok(())
    }
}

/// A complete kill as delivered by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillPayload {
    pub impact_id: i64,
    pub impact_dist: ImpactDistance,

    /// Earliest sample time across all entities
    pub min_ts: f64,

    /// Latest sample time across all entities
    pub max_ts: f64,

    pub killer: EntityRecord,
    pub weapon: EntityRecord,
    pub target: EntityRecord,

    /// Bystanders
    #[serde(default)]
    pub other: Vec<EntityRecord>,
}

impl KillPayload {
    /// Parses and validates a payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: KillPayload = serde_json::from_str(text)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Returns the record for a primary role.
    pub fn record(&self, role: Role) -> &EntityRecord {
        match role {
            Role::Killer => &self.killer,
            Role::Weapon => &self.weapon,
            Role::Target => &self.target,
        }
    }

    /// Iterates over every record with a label (`killer`, ..., `other_0`, ...).
    pub fn labelled_records(&self) -> impl Iterator<Item = (String, &EntityRecord)> {
        Role::ALL
            .into_iter()
            .map(move |role| (role.name().to_string(), self.record(role)))
            .chain(
                self.other
                    .iter()
                    .enumerate()
                    .map(|(i, record)| (format!("other_{}", i), record)),
            )
    }

    /// Validates every record and the replay-wide time bounds.
    pub fn validate(&self) -> Result<()> {
        if !self.min_ts.is_finite() || !self.max_ts.is_finite() || self.min_ts > self.max_ts {
            return Err(KillcamError::malformed(format!(
                "invalid time bounds [{}, {}]",
                self.min_ts, self.max_ts
            )));
        }

        for (label, record) in self.labelled_records() {
            record.validate(&label)?;
            if let (Some(first), Some(last)) = (record.time_step.first(), record.time_step.last()) {
                if *first < self.min_ts || *last > self.max_ts {
                    return Err(KillcamError::malformed(format!(
                        "{}: samples [{}, {}] fall outside replay bounds [{}, {}]",
                        label, first, last, self.min_ts, self.max_ts
                    )));
                }
            }
        }

        Ok(())
    }
}
