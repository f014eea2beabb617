//! Pulse Slider
//!
//! Headless run of the slider demo: a paced frame clock stands in for the
//! display, and a scripted session of size events and touches stands in for
//! the user.
//!
//! Usage:
//!   pulse-slider                  # 60fps, 200ms touch animations
//!   pulse-slider --fps 120        # Faster frame pacing
//!   pulse-slider --pulse          # Keep the indicator color pulsing
//!
//! Set `RUST_LOG=pulse_animation=debug` to trace playback loops.

mod slider;

use anyhow::Result;
use clap::Parser;
use pulse_animation::DriverConfig;
use slider::{SliderApp, SliderOptions};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pulse-slider", about = "Headless slider driven by Pulse animations")]
struct Args {
    /// Frames per second presented by the pacer
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Indicator travel time for touches on the track, in milliseconds
    #[arg(long, default_value_t = 200)]
    touch_ms: u64,

    /// Screen width in pixels
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Screen height in pixels
    #[arg(long, default_value_t = 1920)]
    height: u32,

    /// Pulse the indicator color with a looping animation
    #[arg(long)]
    pulse: bool,
}

/// One scripted user or system event
#[derive(Clone, Copy, Debug)]
enum Step {
    /// Size event (width, height)
    Layout(u32, u32),
    /// Touch on the track at a fraction of the screen height
    Touch(f32),
    Min,
    Max,
    /// Let frames run
    Wait(u64),
}

fn script(width: u32, height: u32) -> Vec<Step> {
    vec![
        Step::Layout(width, height),
        Step::Wait(100),
        Step::Touch(0.5),
        Step::Wait(300),
        Step::Max,
        Step::Wait(250),
        // Rotate mid-animation; the max animation is cancelled
        Step::Layout(height, width),
        Step::Wait(100),
        Step::Min,
        Step::Wait(600),
        Step::Touch(0.7),
        Step::Wait(300),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = DriverConfig::default().with_target_fps(args.fps);
    let options = SliderOptions {
        touch_duration: Duration::from_millis(args.touch_ms),
        pulse: args.pulse,
    };

    let mut app = SliderApp::new(config, options)?;
    app.context_mut().start_pacer(&Handle::current());

    let mut screen_height = args.height;
    for step in script(args.width, args.height) {
        match step {
            Step::Layout(width, height) => {
                screen_height = height;
                app.on_layout(width, height)?;
            }
            Step::Touch(fraction) => {
                app.on_touch(screen_height as f32 * fraction)?;
            }
            Step::Min => {
                app.slider_min()?;
            }
            Step::Max => {
                app.slider_max()?;
            }
            Step::Wait(ms) => observe(&app, Duration::from_millis(ms)).await,
        }
    }

    let geometry = app.geometry();
    tracing::info!(
        "final: indicator at {:.1} on track {:.0}..{:.0} (readout {}), pulsing: {}, {} animations still running",
        app.indicator_y(),
        geometry.min_y(),
        geometry.max_y(),
        app.readout(),
        app.is_pulsing(),
        app.context().active_animations()
    );

    app.on_stop();
    Ok(())
}

/// Let frames run for `duration`, logging the indicator every 50ms
async fn observe(app: &SliderApp, duration: Duration) {
    let sample = Duration::from_millis(50);
    let mut waited = Duration::ZERO;
    while waited < duration {
        tokio::time::sleep(sample).await;
        waited += sample;

        let color = app.indicator_color();
        tracing::info!(
            "indicator y={:.1} readout={} color=({:.2}, {:.2}, {:.2}) active={}",
            app.indicator_y(),
            app.readout(),
            color.r,
            color.g,
            color.b,
            app.context().active_animations()
        );
    }
}
