/*
 * Flock Parameters Module
 *
 * This module defines the FlockParams struct holding everything one fish type
 * needs: instance count, world bounds, grid cell size, swimming speed and the
 * three flocking weights. The caller owns and mutates these between frames;
 * a flock keeps its own snapshot of the last applied values and compares
 * against it to decide what has to be rebuilt.
 *
 * It also defines the JSON scene description used to load several fish types
 * at once.
 */

use std::fs;
use std::path::Path;

use nannou::prelude::{vec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::cell_sort::SortStrategy;
use crate::error::{FlockError, Result};
use crate::spatial_grid::GridDims;

// Parameters for one flock ("fish type")
#[derive(Clone, Debug, PartialEq)]
pub struct FlockParams {
    pub name: String,
    pub instance_count: usize,
    // Full extents of the swimming volume, centered at the origin
    pub bounds: Vec3,
    pub cell_size: u32,
    pub fish_speed: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    // Neighbors closer than cell_size * separation_factor push each other away
    pub separation_factor: f32,
    // How quickly a fish turns toward its steering vector, per second
    pub turn_rate: f32,
    // Optional point every fish is attracted to
    pub target: Option<Vec3>,
    pub target_weight: f32,
    // Seed for placing fish; None draws a fresh seed from the thread rng
    pub seed: Option<u64>,
    pub sort: SortStrategy,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            name: String::from("fish"),
            instance_count: 1000,
            bounds: vec3(50.0, 25.0, 50.0),
            cell_size: 5,
            fish_speed: 1.0,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            separation_factor: 0.5,
            turn_rate: 2.0,
            target: None,
            target_weight: 0.0,
            seed: None,
            sort: SortStrategy::Comparison,
        }
    }
}

// What differs between two parameter snapshots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub instance_count: bool,
    pub grid: bool,
    pub behaviour: bool,
}

impl ParamChanges {
    pub fn any(&self) -> bool {
        self.instance_count || self.grid || self.behaviour
    }
}

impl FlockParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check that these parameters describe a flock that can exist.
    ///
    /// An empty grid (bounds smaller than the cell size) is allowed; every
    /// fish then lands in a single degenerate cell.
    pub fn validate(&self) -> Result<()> {
        if self.instance_count == 0 {
            return Err(FlockError::invalid(&self.name, "instance count must be positive"));
        }
        if self.cell_size == 0 {
            return Err(FlockError::invalid(&self.name, "cell size must be positive"));
        }
        let b = self.bounds;
        if !(b.x > 0.0 && b.y > 0.0 && b.z > 0.0) || !b.is_finite() {
            return Err(FlockError::invalid(
                &self.name,
                format!("bounds must be positive and finite, got ({}, {}, {})", b.x, b.y, b.z),
            ));
        }

        let scalars = [
            ("fish speed", self.fish_speed),
            ("separation weight", self.separation_weight),
            ("alignment weight", self.alignment_weight),
            ("cohesion weight", self.cohesion_weight),
            ("separation factor", self.separation_factor),
            ("turn rate", self.turn_rate),
            ("target weight", self.target_weight),
        ];
        for (label, value) in scalars {
            if !value.is_finite() {
                return Err(FlockError::invalid(&self.name, format!("{label} must be finite")));
            }
        }
        if let Some(target) = self.target {
            if !target.is_finite() {
                return Err(FlockError::invalid(&self.name, "target must be finite"));
            }
        }
        Ok(())
    }

    pub fn grid_dims(&self) -> GridDims {
        GridDims::from_bounds(self.bounds, self.cell_size)
    }

    pub fn total_cells(&self) -> usize {
        self.grid_dims().total_cells()
    }

    // Neighbor search radius. Never larger than one cell, so the 27 surrounding
    // cells always contain every candidate.
    #[inline]
    pub fn interaction_radius(&self) -> f32 {
        self.cell_size as f32
    }

    #[inline]
    pub fn separation_radius(&self) -> f32 {
        self.interaction_radius() * self.separation_factor.clamp(0.0, 1.0)
    }

    // Compare against a previously applied snapshot
    pub fn detect_changes(&self, previous: &FlockParams) -> ParamChanges {
        ParamChanges {
            instance_count: self.instance_count != previous.instance_count,
            grid: self.bounds != previous.bounds || self.cell_size != previous.cell_size,
            behaviour: self.fish_speed != previous.fish_speed
                || self.separation_weight != previous.separation_weight
                || self.alignment_weight != previous.alignment_weight
                || self.cohesion_weight != previous.cohesion_weight
                || self.separation_factor != previous.separation_factor
                || self.turn_rate != previous.turn_rate
                || self.target != previous.target
                || self.target_weight != previous.target_weight
                || self.name != previous.name
                || self.seed != previous.seed
                || self.sort != previous.sort,
        }
    }
}

// One fish type as written in a scene file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FishTypeConfig {
    pub name: String,
    pub instance_count: usize,
    pub bounds: [f32; 3],
    pub cell_size: u32,
    pub fish_speed: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub separation_factor: f32,
    pub turn_rate: f32,
    pub target: Option<[f32; 3]>,
    pub target_weight: f32,
    pub seed: Option<u64>,
    pub sort: SortStrategy,
}

impl Default for FishTypeConfig {
    fn default() -> Self {
        FlockParams::default().into()
    }
}

impl From<FishTypeConfig> for FlockParams {
    fn from(config: FishTypeConfig) -> Self {
        Self {
            name: config.name,
            instance_count: config.instance_count,
            bounds: Vec3::from(config.bounds),
            cell_size: config.cell_size,
            fish_speed: config.fish_speed,
            separation_weight: config.separation_weight,
            alignment_weight: config.alignment_weight,
            cohesion_weight: config.cohesion_weight,
            separation_factor: config.separation_factor,
            turn_rate: config.turn_rate,
            target: config.target.map(Vec3::from),
            target_weight: config.target_weight,
            seed: config.seed,
            sort: config.sort,
        }
    }
}

impl From<FlockParams> for FishTypeConfig {
    fn from(params: FlockParams) -> Self {
        Self {
            name: params.name,
            instance_count: params.instance_count,
            bounds: params.bounds.to_array(),
            cell_size: params.cell_size,
            fish_speed: params.fish_speed,
            separation_weight: params.separation_weight,
            alignment_weight: params.alignment_weight,
            cohesion_weight: params.cohesion_weight,
            separation_factor: params.separation_factor,
            turn_rate: params.turn_rate,
            target: params.target.map(|t| t.to_array()),
            target_weight: params.target_weight,
            seed: params.seed,
            sort: params.sort,
        }
    }
}

// A full scene: every fish type that should swim at once
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SceneConfig {
    #[serde(default)]
    pub fish_types: Vec<FishTypeConfig>,
}

impl SceneConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn flock_params(&self) -> Vec<FlockParams> {
        self.fish_types.iter().cloned().map(FlockParams::from).collect()
    }
}
