use alloc::vec::Vec;

use snafu::ensure;

use crate::{error, Result};

/// One tick of a recorded trajectory, for both sides of the drive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileSample {
    /// Native units per 100 ms.
    Velocity { left: f64, right: f64 },
    /// Native encoder units.
    Position { left: f64, right: f64 },
}

/// Supplies one sample per tick during trajectory playback.
pub trait ProfileSource {
    /// The next sample, or `None` once the profile is exhausted.
    fn next_sample(&mut self) -> Option<ProfileSample>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Velocity,
    Position,
}

/// A precomputed trajectory held in memory.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    samples: Vec<ProfileSample>,
    index: usize,
}

impl Trajectory {
    pub fn new(samples: Vec<ProfileSample>) -> Self {
        Self { samples, index: 0 }
    }

    /// Pair up separately generated left and right side setpoints.
    pub fn from_sides(kind: ProfileKind, left: &[f64], right: &[f64]) -> Result<Self> {
        ensure!(
            left.len() == right.len(),
            error::MismatchedProfileSnafu {
                left: left.len(),
                right: right.len()
            }
        );

        let samples = left
            .iter()
            .zip(right)
            .map(|(&left, &right)| match kind {
                ProfileKind::Velocity => ProfileSample::Velocity { left, right },
                ProfileKind::Position => ProfileSample::Position { left, right },
            })
            .collect();
        Ok(Self::new(samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.index
    }
}

impl ProfileSource for Trajectory {
    fn next_sample(&mut self) -> Option<ProfileSample> {
        let sample = self.samples.get(self.index).copied()?;
        self.index += 1;
        Some(sample)
    }
}
