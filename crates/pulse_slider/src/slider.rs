//! Headless vertical slider
//!
//! A track, an indicator that slides along it, a numeric readout and two
//! buttons that send the indicator to either end. Touches start animations;
//! every layout pass cancels whatever is in flight before the widgets move.

use anyhow::Result;
use pulse_animation::{
    AnimationContext, AnimationId, AnimationSpec, Color, DriverConfig, Property, Signal, Tween,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Samples in the slider's envelope signals
const ENVELOPE_SAMPLES: usize = 256;

/// Indicator travel time for the min/max buttons
const BUTTON_DURATION: Duration = Duration::from_millis(500);

/// Duration of one indicator highlight pulse
const PULSE_DURATION: Duration = Duration::from_millis(900);

const PRIMARY: u32 = 0x607D8B;
const ACCENT: u32 = 0xFF6E40;

/// Widget placement produced by a layout pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub track_y: f32,
    pub track_height: f32,
    pub indicator_height: f32,
}

impl Geometry {
    /// Lay the slider out on a screen of the given size in pixels
    pub fn for_screen(width_px: u32, height_px: u32) -> Self {
        let step = width_px as f32 / 8.0;
        let track_height = height_px as f32 * 0.6;
        Self {
            track_y: (height_px as f32 - track_height) / 2.0,
            track_height,
            indicator_height: step / 4.0 * 1.5,
        }
    }

    /// Lowest indicator position
    pub fn min_y(&self) -> f32 {
        self.track_y
    }

    /// Highest indicator position (indicator flush with the track's end)
    pub fn max_y(&self) -> f32 {
        (self.track_y + self.track_height - self.indicator_height).max(self.track_y)
    }

    pub fn clamp(&self, y: f32) -> f32 {
        y.clamp(self.min_y(), self.max_y())
    }

    /// Indicator position as a percentage of the track's travel
    pub fn percent(&self, y: f32) -> i32 {
        let travel = self.max_y() - self.min_y();
        if travel <= 0.0 {
            return 0;
        }
        ((y - self.min_y()) / travel * 100.0).round() as i32
    }
}

/// Slider options
#[derive(Clone, Copy, Debug)]
pub struct SliderOptions {
    /// Indicator travel time for touches on the track
    pub touch_duration: Duration,
    /// Keep the indicator's color pulsing with a looping animation
    pub pulse: bool,
}

impl Default for SliderOptions {
    fn default() -> Self {
        Self {
            touch_duration: Duration::from_millis(200),
            pulse: false,
        }
    }
}

/// The slider application state
pub struct SliderApp {
    ctx: AnimationContext,
    options: SliderOptions,
    geometry: Geometry,
    indicator_y: Property<f32>,
    indicator_color: Property<Color>,
    readout: Arc<Mutex<String>>,
    pulse: Option<AnimationId>,
}

impl SliderApp {
    pub fn new(config: DriverConfig, options: SliderOptions) -> Result<Self> {
        let mut ctx = AnimationContext::new_current(config)?;
        ctx.register_signal("envelope", rise_and_fall(ENVELOPE_SAMPLES));
        ctx.register_signal("pulse", rise_and_fall(ENVELOPE_SAMPLES / 4));

        Ok(Self {
            ctx,
            options,
            geometry: Geometry::for_screen(0, 0),
            indicator_y: Property::new(0.0),
            indicator_color: Property::new(Color::from_hex(ACCENT)),
            readout: Arc::new(Mutex::new(String::from("0"))),
            pulse: None,
        })
    }

    pub fn context(&self) -> &AnimationContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AnimationContext {
        &mut self.ctx
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn indicator_y(&self) -> f32 {
        self.indicator_y.get()
    }

    pub fn indicator_color(&self) -> Color {
        self.indicator_color.get()
    }

    /// Whether the looping highlight animation is running
    pub fn is_pulsing(&self) -> bool {
        self.pulse
            .map(|id| self.ctx.registry().contains(id))
            .unwrap_or(false)
    }

    pub fn readout(&self) -> String {
        self.readout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Size event: stop every animation, then reposition the widgets
    pub fn on_layout(&mut self, width_px: u32, height_px: u32) -> Result<()> {
        let cancelled = self.ctx.layout_changed();
        self.pulse = None;

        self.geometry = Geometry::for_screen(width_px, height_px);
        let y = self.geometry.clamp(self.indicator_y.get());
        self.indicator_y.set(y);
        self.set_readout(self.geometry.percent(y));

        tracing::info!(
            "layout {}x{}: track {:.0}..{:.0}, {} animations cancelled",
            width_px,
            height_px,
            self.geometry.min_y(),
            self.geometry.max_y(),
            cancelled
        );

        if self.options.pulse {
            self.start_pulse()?;
        }
        Ok(())
    }

    /// Touch on the track: slide the indicator to the touched position
    pub fn on_touch(&mut self, y: f32) -> Result<AnimationId> {
        let target = self.geometry.clamp(y);
        tracing::info!("touch at {:.1} -> target {:.1}", y, target);
        self.slide_to(target, self.options.touch_duration)
    }

    /// "Min" button
    pub fn slider_min(&mut self) -> Result<AnimationId> {
        self.slide_to(self.geometry.min_y(), BUTTON_DURATION)
    }

    /// "Max" button
    pub fn slider_max(&mut self) -> Result<AnimationId> {
        self.slide_to(self.geometry.max_y(), BUTTON_DURATION)
    }

    /// Application teardown
    pub fn on_stop(&mut self) {
        self.pulse = None;
        self.ctx.shutdown();
    }

    fn slide_to(&mut self, target: f32, duration: Duration) -> Result<AnimationId> {
        let signal = self.envelope("envelope");
        let readout = Arc::clone(&self.readout);
        let percent = self.geometry.percent(target);

        let spec = AnimationSpec::new(signal, duration)
            .on_start(move || {
                *readout.lock().unwrap_or_else(PoisonError::into_inner) = percent.to_string();
            })
            .tween(Tween::approach(self.indicator_y.clone(), target));

        Ok(self.ctx.animate(spec)?)
    }

    fn start_pulse(&mut self) -> Result<()> {
        let spec = AnimationSpec::new(self.envelope("pulse"), PULSE_DURATION)
            .looping(true)
            .tween(Tween::between(
                self.indicator_color.clone(),
                Color::from_hex(ACCENT),
                Color::from_hex(PRIMARY),
            ));
        self.pulse = Some(self.ctx.animate(spec)?);
        Ok(())
    }

    fn envelope(&self, name: &str) -> Signal {
        self.ctx
            .signal(name)
            .unwrap_or_else(|| rise_and_fall(ENVELOPE_SAMPLES))
    }

    fn set_readout(&self, percent: i32) {
        *self.readout.lock().unwrap_or_else(PoisonError::into_inner) = percent.to_string();
    }
}

/// Exponential rise followed by its mirror image, normalized to 0..=1
fn rise_and_fall(samples: usize) -> Signal {
    let rise = Signal::exp(samples);
    rise.to_builder()
        .append(&rise.to_builder().unit_inverse().build())
        .normalize_range(0.0, 1.0)
        .build()
}
