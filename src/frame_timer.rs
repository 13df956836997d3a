use log::debug;
use std::time::{Duration, Instant};

static NATIVE_SLEEP_ACCURACY: Duration = Duration::from_micros(500);

/// Paces a frame loop to a target rate and measures the achieved rate.
#[derive(Debug)]
pub struct FrameTimer {
    iteration_start: Instant,
    pub iteration_duration: Duration,
    window_start: Instant,
    window_frames: u32,
    measured_fps: f64,
}

impl FrameTimer {
    pub fn new(fps: f64) -> FrameTimer {
        let now = Instant::now();
        FrameTimer {
            iteration_start: now,
            iteration_duration: Duration::from_secs_f64(1.0 / fps.max(1.0)),
            window_start: now,
            window_frames: 0,
            measured_fps: 0.0,
        }
    }

    fn high_resolution_sleep_until(done: &Instant) {
        let now = Instant::now();
        let system_sleep_until = done.checked_sub(NATIVE_SLEEP_ACCURACY).unwrap_or(now);
        if now < system_sleep_until {
            std::thread::sleep(system_sleep_until.duration_since(now));
        }
        while Instant::now() < *done {
            std::hint::spin_loop();
        }
    }

    /// Waits out the rest of the current frame budget and returns the time
    /// since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let sleep_until = self.iteration_start + self.iteration_duration;
        let now = Instant::now();
        if now > sleep_until {
            debug!("Over time budget by: {:?}", now - sleep_until);
        } else {
            FrameTimer::high_resolution_sleep_until(&sleep_until);
        }
        let delta_t = self.iteration_start.elapsed();
        self.iteration_start = Instant::now();

        self.window_frames += 1;
        let window = self.window_start.elapsed();
        if window >= Duration::from_secs(1) {
            self.measured_fps = self.window_frames as f64 / window.as_secs_f64();
            self.window_frames = 0;
            self.window_start = Instant::now();
        }
        delta_t
    }

    /// Frames per second over the last complete one-second window.
    pub fn measured_fps(&self) -> f64 {
        self.measured_fps
    }
}
