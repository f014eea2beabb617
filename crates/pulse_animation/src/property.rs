//! Animated properties
//!
//! A [`Property`] is a caller-owned value cell that playback loops write
//! into. A [`Tween`] names exactly which property an animation drives and
//! where it should end up, so an animation's reach is explicit in its
//! construction rather than hidden in whatever a closure happened to
//! capture.
//!
//! ```ignore
//! let indicator_y = Property::new(0.0_f32);
//!
//! let spec = AnimationSpec::new(signal, Duration::from_millis(200))
//!     .tween(Tween::approach(indicator_y.clone(), 480.0));
//! animator.start(spec)?;
//!
//! // Read by the renderer on the next frame
//! let y = indicator_y.get();
//! ```

use crate::values::Interpolate;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A shared, animatable value
///
/// Clones refer to the same underlying value. Two animations writing the
/// same property are not coordinated: the last write wins.
pub struct Property<T> {
    value: Arc<Mutex<T>>,
}

impl<T: Interpolate> Property<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Overwrite the value
    pub fn set(&self, value: T) {
        *self.lock() = value;
    }

    /// Update the value in place, returning the closure's result
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Whether both handles refer to the same value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    // A panicking callback must not freeze the property for everyone else
    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Interpolate + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.get()).finish()
    }
}

impl<T: Interpolate + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// How a tween maps the shaped value onto its property
#[derive(Clone, Debug, PartialEq)]
pub enum TweenMode<T> {
    /// Each tick moves the live value a `dt` fraction of the remaining
    /// distance to the target: `v = v.lerp(target, dt)`
    ///
    /// The current value is re-read on every tick, so the motion adapts if
    /// something else moved the property in between.
    Approach,
    /// Each tick places the value at `from.lerp(target, dt)`
    Between(T),
}

/// One property animation: which property, where to, and how
#[derive(Clone, Debug)]
pub struct Tween<T: Interpolate> {
    property: Property<T>,
    target: T,
    mode: TweenMode<T>,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(property: Property<T>, target: T, mode: TweenMode<T>) -> Self {
        Self {
            property,
            target,
            mode,
        }
    }

    /// Move towards `target` relative to the live value
    pub fn approach(property: Property<T>, target: T) -> Self {
        Self::new(property, target, TweenMode::Approach)
    }

    /// Move from a fixed `from` value to `target`
    pub fn between(property: Property<T>, from: T, target: T) -> Self {
        Self::new(property, target, TweenMode::Between(from))
    }

    pub fn property(&self) -> &Property<T> {
        &self.property
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn mode(&self) -> &TweenMode<T> {
        &self.mode
    }

    /// Apply one tick with shaped value `dt`
    pub fn apply(&self, dt: f32) {
        match &self.mode {
            TweenMode::Approach => self
                .property
                .update(|value| *value = value.lerp(&self.target, dt)),
            TweenMode::Between(from) => self.property.set(from.lerp(&self.target, dt)),
        }
    }

    /// Snap the property to the target
    pub fn finish(&self) {
        self.property.set(self.target.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{Color, Vec2};

    #[test]
    fn test_property_shared_between_clones() {
        let a = Property::new(1.0_f32);
        let b = a.clone();
        b.set(5.0);

        assert_eq!(a.get(), 5.0);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Property::new(5.0)));
    }

    #[test]
    fn test_update_returns_result() {
        let p = Property::new(Vec2::new(1.0, 2.0));
        let old_x = p.update(|v| {
            let old = v.x;
            v.x = 10.0;
            old
        });

        assert_eq!(old_x, 1.0);
        assert_eq!(p.get(), Vec2::new(10.0, 2.0));
    }

    #[test]
    fn test_approach_rereads_live_value() {
        let y = Property::new(0.0_f32);
        let tween = Tween::approach(y.clone(), 100.0);

        tween.apply(0.5);
        assert!((y.get() - 50.0).abs() < 1e-4);

        tween.apply(0.5);
        assert!((y.get() - 75.0).abs() < 1e-4);

        // Someone else moved the property; the next step starts from there
        y.set(90.0);
        tween.apply(0.5);
        assert!((y.get() - 95.0).abs() < 1e-4);

        tween.finish();
        assert_eq!(y.get(), 100.0);
    }

    #[test]
    fn test_between_is_absolute() {
        let color = Property::new(Color::BLACK);
        let tween = Tween::between(color.clone(), Color::BLACK, Color::WHITE);

        tween.apply(0.25);
        tween.apply(0.25);
        assert!(color.get().approx_eq(&Color::rgb(0.25, 0.25, 0.25), 1e-6));

        tween.apply(1.0);
        assert!(color.get().approx_eq(&Color::WHITE, 1e-6));
    }

    #[test]
    fn test_poisoned_property_still_usable() {
        let p = Property::new(3.0_f32);
        let q = p.clone();

        let _ = std::thread::spawn(move || {
            q.update(|_| panic!("callback bug"));
        })
        .join();

        p.set(4.0);
        assert_eq!(p.get(), 4.0);
    }
}
