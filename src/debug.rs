/*
 * Debug Information Module
 *
 * Frame statistics shown by the viewer:
 * - Frame time and FPS, each averaged over the last 60 frames
 * - Time spent in each pipeline stage during the last frame
 * - Number of fish simulated across all flocks
 */

use std::collections::VecDeque;
use std::ops::AddAssign;
use std::time::Duration;

// Number of frames the moving averages cover
pub const STATS_WINDOW: usize = 60;

// Wall time spent in each stage of one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub assign: Duration,
    pub sort: Duration,
    pub build: Duration,
    pub update: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.assign + self.sort + self.build + self.update
    }
}

impl AddAssign for StageTimings {
    fn add_assign(&mut self, other: Self) {
        self.assign += other.assign;
        self.sort += other.sort;
        self.build += other.build;
        self.update += other.update;
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameStats {
    frame_times: VecDeque<f32>,
    fps_values: VecDeque<f32>,
    pub frames: u64,
    pub fish_count: usize,
    pub flock_count: usize,
    pub stages: StageTimings,
}

impl FrameStats {
    pub fn record(
        &mut self,
        delta_time: f32,
        stages: StageTimings,
        fish_count: usize,
        flock_count: usize,
    ) {
        self.frames += 1;
        self.stages = stages;
        self.fish_count = fish_count;
        self.flock_count = flock_count;

        // A zero or negative delta has no meaningful rate
        if delta_time <= 0.0 || !delta_time.is_finite() {
            return;
        }
        push_bounded(&mut self.frame_times, delta_time);
        push_bounded(&mut self.fps_values, 1.0 / delta_time);
    }

    // Saturates when the window holds deltas too large for a Duration
    pub fn average_frame_time(&self) -> Duration {
        Duration::try_from_secs_f32(mean(&self.frame_times)).unwrap_or(Duration::MAX)
    }

    pub fn average_fps(&self) -> f32 {
        mean(&self.fps_values)
    }

    pub fn samples(&self) -> usize {
        self.frame_times.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} fish in {} flocks | {:.0} FPS | {} ms between frames | sim {:.2} ms",
            self.fish_count,
            self.flock_count,
            self.average_fps(),
            self.average_frame_time().as_millis(),
            self.stages.total().as_secs_f64() * 1000.0,
        )
    }
}

fn push_bounded(queue: &mut VecDeque<f32>, value: f32) {
    queue.push_back(value);
    if queue.len() > STATS_WINDOW {
        queue.pop_front();
    }
}

fn mean(values: &VecDeque<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
