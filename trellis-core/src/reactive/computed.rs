//! Computed values: a signal written only by an effect.
//!
//! The effect's body receives the inner signal and writes to it; readers see
//! a read-only signal. Writes go through the inner signal's normal write
//! contract, so equality suppression and subscriber delivery behave exactly
//! as for a plain [`Signal`]. Until the first run writes, the value is
//! `T::default()`.

use std::fmt::{self, Debug, Display};

use super::effect::{Effect, EffectOptions};
use super::signal::{Observable, Signal, Trackable};
use super::subscriber::SubscriberId;

/// A value derived from other signals by an effect.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Computed, Signal};
///
/// let count = Signal::new(2);
/// let source = count.clone();
/// let doubled = Computed::new(move |out| { out.set(source.get() * 2); }, &[&count]);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T: 'static> {
    value: Signal<T>,
    effect: Effect,
}

impl<T: Clone + Default + PartialEq + 'static> Computed<T> {
    /// Create a computed value compared with `PartialEq`.
    pub fn new(expression: impl Fn(&Signal<T>) + 'static, dependencies: &[&dyn Trackable]) -> Self {
        Self::build(
            Signal::new(T::default()),
            expression,
            dependencies,
            EffectOptions::default(),
        )
    }

    /// Derive a value from a single signal.
    pub fn from_signal<S: Clone + 'static>(source: &Signal<S>, map: impl Fn(&S) -> T + 'static) -> Self {
        let reader = source.clone();
        Self::new(move |out| {
            out.set(reader.with(&map));
        }, &[source])
    }
}

impl<T: Clone + Default + 'static> Computed<T> {
    /// Create a computed value with a custom equality and effect options.
    pub fn with_equality(
        expression: impl Fn(&Signal<T>) + 'static,
        dependencies: &[&dyn Trackable],
        equality: impl Fn(&T, &T) -> bool + 'static,
        options: EffectOptions,
    ) -> Self {
        Self::build(
            Signal::with_equality(T::default(), equality),
            expression,
            dependencies,
            options,
        )
    }

    fn build(
        value: Signal<T>,
        expression: impl Fn(&Signal<T>) + 'static,
        dependencies: &[&dyn Trackable],
        options: EffectOptions,
    ) -> Self {
        let setter = value.clone();
        let released = value.clone();
        let effect = Effect::with_release_hook(
            move || expression(&setter),
            dependencies,
            options,
            // No further writes will happen, so nothing would ever compact
            // the subscriber list again.
            move || released.release(),
        );
        Self { value, effect }
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Read the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// Id of the inner signal.
    pub fn id(&self) -> u64 {
        self.value.id()
    }

    pub fn on(&self, callback: impl Fn(&T) + 'static) -> SubscriberId {
        self.value.on(callback)
    }

    pub fn on_while(
        &self,
        callback: impl Fn(&T) + 'static,
        condition: impl Fn() -> bool + 'static,
    ) -> SubscriberId {
        self.value.on_while(callback, condition)
    }

    pub fn off(&self, id: SubscriberId) -> bool {
        self.value.off(id)
    }

    pub fn equals(&self, other: &T) -> bool {
        self.value.equals(other)
    }

    /// Notify the inner signal's subscribers and dependents.
    pub fn trigger(&self) {
        self.value.trigger();
    }

    /// Check the effect's liveness, releasing everything if it fails.
    pub fn check(&self) -> bool {
        self.effect.check()
    }

    /// Release the effect and drop the inner signal's subscribers.
    pub fn release(&self) {
        self.effect.release();
        self.value.release();
    }

    pub fn is_released(&self) -> bool {
        self.effect.is_released()
    }

    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }

    pub(crate) fn signal(&self) -> &Signal<T> {
        &self.value
    }

    /// The effect that keeps this value current.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Render the current value with the inner signal's formatter, falling
    /// back to `fallback`.
    pub fn format_with(&self, fallback: impl FnOnce(&T) -> String) -> String {
        self.value.format_with(fallback)
    }
}

impl<T: Clone + Display + 'static> Computed<T> {
    pub fn format(&self) -> String {
        self.value.format()
    }
}

impl<T: 'static> Trackable for Computed<T> {
    fn signal_id(&self) -> u64 {
        self.value.signal_id()
    }
}

impl<T: Clone + 'static> Observable for Computed<T> {
    type Value = T;

    fn observe_while(
        &self,
        callback: impl Fn(&T) + 'static,
        condition: impl Fn() -> bool + 'static,
    ) -> SubscriberId {
        self.on_while(callback, condition)
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.value)
            .field("effect", &self.effect)
            .finish()
    }
}
