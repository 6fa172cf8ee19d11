//! Synthetic kill payloads.
//!
//! The generator plays the part of the retrieval service: it produces kill
//! payloads in the exact inbound JSON shape, from simple kinematics plus
//! seeded position noise. Y is up.

use killcam_core::payload::{EntityRecord, ImpactDistance, KillPayload};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// The straight-line kill used as the engine's reference case.
///
/// Killer flies (0,0,0) → (0,0,1000) over t = 0, 5, 10; the target sits at
/// (0,0,1500); the weapon follows the killer's line and lands at t = 9.9.
pub fn straight_shot() -> KillPayload {
    let path = [[0.0, 0.0, 0.0], [0.0, 0.0, 500.0], [0.0, 0.0, 1000.0]];
    KillPayload {
        impact_id: 1,
        impact_dist: ImpactDistance::Meters(0.0),
        min_ts: 0.0,
        max_ts: 10.0,
        killer: record("Viper 1-1", "F-16C_50", "Air+FixedWing", "Blue", &path, &[0.0, 5.0, 10.0]),
        weapon: record("AIM-120C", "AIM_120C", "Weapon+Missile", "Blue", &path, &[0.0, 5.0, 9.9]),
        target: record(
            "Fulcrum 1",
            "MiG-29S",
            "Air+FixedWing",
            "Red",
            &[[0.0, 0.0, 1500.0]; 3],
            &[0.0, 5.0, 10.0],
        ),
        other: Vec::new(),
    }
}

fn record(
    name: &str,
    kind: &str,
    cat: &str,
    color: &str,
    coord: &[[f64; 3]],
    times: &[f64],
) -> EntityRecord {
    EntityRecord {
        id: None,
        name: name.to_string(),
        kind: kind.to_string(),
        cat: cat.to_string(),
        color: color.to_string(),
        coord: coord.to_vec(),
        rot: vec![[0.0; 3]; coord.len()],
        time_step: times.to_vec(),
        heading: None,
    }
}

/// Straight-line motion.
#[derive(Debug, Clone, Copy)]
struct Kinematic {
    start: Vector3<f64>,
    velocity: Vector3<f64>,
}

impl Kinematic {
    fn at(&self, t: f64) -> Vector3<f64> {
        self.start + self.velocity * t
    }
}

/// Generates seeded pursuit kills.
pub struct KillGenerator {
    rng: ChaCha8Rng,

    /// Position noise standard deviation
    position_noise_std: f64,

    /// Seconds between recorded samples
    sample_interval: f64,

    /// Replay length in seconds
    duration: f64,

    /// Add one bystander with a single sample
    short_bystander: bool,

    next_id: i64,
}

impl KillGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            position_noise_std: 2.0,
            sample_interval: 1.0,
            duration: 30.0,
            short_bystander: false,
            next_id: 1000,
        }
    }

    /// Sets the replay length in seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = secs.max(self.sample_interval);
        self
    }

    pub fn with_noise(mut self, std_dev: f64) -> Self {
        self.position_noise_std = std_dev.max(0.0);
        self
    }

    /// Includes a bystander too short to build a track from.
    pub fn with_short_bystander(mut self) -> Self {
        self.short_bystander = true;
        self
    }

    /// A killer closing on a moving target, firing mid-replay.
    pub fn pursuit(&mut self, bystanders: usize) -> KillPayload {
        let d = self.duration;

        let target = Kinematic {
            start: Vector3::new(
                self.rng.gen_range(-2000.0..2000.0),
                self.rng.gen_range(3000.0..6000.0),
                self.rng.gen_range(8000.0..12000.0),
            ),
            velocity: Vector3::new(
                self.rng.gen_range(-150.0..150.0),
                0.0,
                self.rng.gen_range(-150.0..150.0),
            ),
        };

        let killer_start = Vector3::new(0.0, 4000.0, 0.0);
        let killer = Kinematic {
            start: killer_start,
            velocity: (target.at(d) - killer_start) * 0.6 / d,
        };

        let launch = (d * self.rng.gen_range(0.3..0.5)).floor();
        let weapon_start = killer.at(launch);
        let weapon = Kinematic {
            start: weapon_start - (target.at(d) - weapon_start) / (d - launch) * launch,
            velocity: (target.at(d) - weapon_start) / (d - launch),
        };

        let full = self.times(0.0, d);
        let weapon_times = self.times(launch, d);

        let killer_record = self.track("Viper 1-1", "F-16C_50", "Air+FixedWing", "Blue", killer, &full);
        let weapon_record = self.track("AIM-120C", "AIM_120C", "Weapon+Missile", "Blue", weapon, &weapon_times);
        let target_record = self.track("Fulcrum 1", "MiG-29S", "Air+FixedWing", "Red", target, &full);

        let mut other = Vec::with_capacity(bystanders + 1);
        for i in 0..bystanders {
            let orbit = Kinematic {
                start: Vector3::new(
                    self.rng.gen_range(-8000.0..8000.0),
                    self.rng.gen_range(1000.0..8000.0),
                    self.rng.gen_range(-2000.0..14000.0),
                ),
                velocity: Vector3::new(
                    self.rng.gen_range(-250.0..250.0),
                    self.rng.gen_range(-10.0..10.0),
                    self.rng.gen_range(-250.0..250.0),
                ),
            };
            let name = format!("Wingman {}", i + 2);
            other.push(self.track(&name, "F-15C", "Air+FixedWing", "Blue", orbit, &full));
        }
        if self.short_bystander {
            let parked = Kinematic {
                start: Vector3::new(500.0, 0.0, 500.0),
                velocity: Vector3::zeros(),
            };
            other.push(self.track("Tanker", "KC-135", "Air+Tanker", "Blue", parked, &[d / 2.0]));
        }

        let miss = (weapon.at(d) - target.at(d)).norm();
        self.next_id += 1;

        KillPayload {
            impact_id: self.next_id,
            impact_dist: ImpactDistance::Label(format!("{:.2}m", miss)),
            min_ts: 0.0,
            max_ts: d,
            killer: killer_record,
            weapon: weapon_record,
            target: target_record,
            other,
        }
    }

    /// Sample times from `from` to `to`, both included.
    fn times(&self, from: f64, to: f64) -> Vec<f64> {
        let steps = ((to - from) / self.sample_interval).round().max(1.0) as usize;
        (0..=steps)
            .map(|i| (from + i as f64 * self.sample_interval).min(to))
            .collect()
    }

    fn track(
        &mut self,
        name: &str,
        kind: &str,
        cat: &str,
        color: &str,
        motion: Kinematic,
        times: &[f64],
    ) -> EntityRecord {
        let noise = Normal::new(0.0, self.position_noise_std).ok();
        let heading = motion.velocity;
        let yaw = heading.x.atan2(heading.z).to_degrees();
        let pitch = heading.y.atan2(heading.xz().norm()).to_degrees();

        let mut coord = Vec::with_capacity(times.len());
        for &t in times {
            let mut p = motion.at(t);
            if let Some(noise) = &noise {
                p += Vector3::new(
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                );
            }
            coord.push([p.x, p.y, p.z]);
        }

        self.next_id += 1;
        EntityRecord {
            id: Some(self.next_id),
            name: name.to_string(),
            kind: kind.to_string(),
            cat: cat.to_string(),
            color: color.to_string(),
            coord,
            rot: vec![[0.0, pitch, yaw]; times.len()],
            time_step: times.to_vec(),
            heading: Some(vec![yaw; times.len()]),
        }
    }
}
