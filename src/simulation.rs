/*
 * Simulation Module
 *
 * Drives any number of independent flocks ("fish types"). Each flock pairs
 * the settings the caller edits with the FlockInstance that applies them.
 * Every frame each flock takes a snapshot of its settings and runs its own
 * pipeline; flocks never see each other's fish, so they step in parallel.
 *
 * Errors stay with the flock that raised them: a rejected configuration or a
 * failed reallocation is reported for that flock while the others carry on.
 */

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::debug::{FrameStats, StageTimings};
use crate::error::{FlockError, Result};
use crate::flock::FlockInstance;
use crate::params::{FlockParams, SceneConfig};

#[derive(Default)]
pub struct Simulation {
    flocks: Vec<FlockInstance>,
    // Caller-editable settings, one per flock, snapshotted each frame
    settings: Vec<FlockParams>,
    stats: FrameStats,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    // Build from a list of fish types, skipping (and returning) those that fail
    pub fn from_params(params: impl IntoIterator<Item = FlockParams>) -> (Self, Vec<FlockError>) {
        let mut simulation = Self::new();
        let mut errors = Vec::new();
        for p in params {
            if let Err(err) = simulation.add_flock(p) {
                errors.push(err);
            }
        }
        (simulation, errors)
    }

    pub fn from_scene(scene: &SceneConfig) -> (Self, Vec<FlockError>) {
        Self::from_params(scene.flock_params())
    }

    /// Create a flock and return its index.
    pub fn add_flock(&mut self, params: FlockParams) -> Result<usize> {
        let flock = match FlockInstance::new(params.clone()) {
            Ok(flock) => flock,
            Err(err) => {
                warn!(flock = %params.name, error = %err, "flock not created");
                return Err(err);
            }
        };
        self.flocks.push(flock);
        self.settings.push(params);
        Ok(self.flocks.len() - 1)
    }

    // Drop a flock and all of its buffers
    pub fn remove_flock(&mut self, index: usize) -> Option<FlockInstance> {
        if index >= self.flocks.len() {
            return None;
        }
        self.settings.remove(index);
        let flock = self.flocks.remove(index);
        info!(flock = %flock.name(), "flock removed");
        Some(flock)
    }

    // Release every flock
    pub fn clear(&mut self) {
        self.flocks.clear();
        self.settings.clear();
        debug!("all flocks released");
    }

    pub fn len(&self) -> usize {
        self.flocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flocks.is_empty()
    }

    pub fn flocks(&self) -> &[FlockInstance] {
        &self.flocks
    }

    pub fn flock(&self, index: usize) -> Option<&FlockInstance> {
        self.flocks.get(index)
    }

    pub fn flock_mut(&mut self, index: usize) -> Option<&mut FlockInstance> {
        self.flocks.get_mut(index)
    }

    pub fn settings(&self, index: usize) -> Option<&FlockParams> {
        self.settings.get(index)
    }

    // Edits take effect at the start of the next step
    pub fn settings_mut(&mut self, index: usize) -> Option<&mut FlockParams> {
        self.settings.get_mut(index)
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn fish_count(&self) -> usize {
        self.flocks.iter().map(FlockInstance::len).sum()
    }

    /// Run one frame for every flock.
    ///
    /// Returns the errors raised this frame, one per affected flock. Every
    /// flock still advances, on its previous settings if the new ones failed.
    pub fn step(&mut self, delta_time: f32) -> Vec<FlockError> {
        let start = Instant::now();

        let errors: Vec<FlockError> = self
            .flocks
            .par_iter_mut()
            .zip(self.settings.par_iter())
            .filter_map(|(flock, params)| flock.step(params, delta_time).err())
            .collect();

        let mut stages = StageTimings::default();
        for flock in &self.flocks {
            stages += flock.timings();
        }
        self.stats
            .record(delta_time, stages, self.fish_count(), self.flocks.len());

        debug!(
            flocks = self.flocks.len(),
            errors = errors.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "simulation step"
        );
        errors
    }
}
