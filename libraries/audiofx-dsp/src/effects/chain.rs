//! Effect chain for processing audio
//!
//! Effects are created in a chain-owned table and referenced by handle. The
//! host decides which of them form the chain, in which order, and whether
//! each is enabled. Every block flows through the enabled members in order
//! and ends at the chain's sink.
//!
//! Each effect hands its output to the next destination itself, so an effect
//! may emit fewer, more or differently sized blocks than it receives (the
//! convolver emits only full blocks, plus a tail on finalize).

use super::{
    Convolver, FirGraphicEq, Gain, IirGraphicEq, Noise, ParametricEq, Silence,
};
use crate::error::{DspError, Result};
use crate::pcm;
use crate::sink::AudioSink;
use tracing::debug;

/// Audio effect that forwards its output to the next destination
///
/// # Real-Time Constraints
/// `write_audio` runs on the audio thread:
/// - No allocations
/// - No blocking operations
/// - Must not fail; configuration errors are reported by setters instead
pub trait AudioEffect: Send {
    /// Process one block and pass the result to `next`
    ///
    /// `buf` holds one equally long sequence per channel and may be modified
    /// in place. Buffering effects may call `next` zero or more times.
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink);

    /// Clear processing state (delay lines, buffered input) but keep the configuration
    fn reset(&mut self);

    /// Flush buffered output at the end of a stream
    fn finalize(&mut self, next: &mut dyn AudioSink) {
        let _ = next;
    }

    /// Effect name (for debugging)
    fn name(&self) -> &str;
}

/// Every effect a chain can hold
pub enum Effect {
    Gain(Gain),
    Noise(Noise),
    Silence(Silence),
    ParametricEq(ParametricEq),
    GraphicEqIir(IirGraphicEq),
    GraphicEqFir(FirGraphicEq),
    Convolver(Convolver),
}

macro_rules! dispatch_effect {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Effect::Gain($e) => $body,
            Effect::Noise($e) => $body,
            Effect::Silence($e) => $body,
            Effect::ParametricEq($e) => $body,
            Effect::GraphicEqIir($e) => $body,
            Effect::GraphicEqFir($e) => $body,
            Effect::Convolver($e) => $body,
        }
    };
}

impl AudioEffect for Effect {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        dispatch_effect!(self, e => e.write_audio(buf, next));
    }

    fn reset(&mut self) {
        dispatch_effect!(self, e => e.reset());
    }

    fn finalize(&mut self, next: &mut dyn AudioSink) {
        dispatch_effect!(self, e => e.finalize(next));
    }

    fn name(&self) -> &str {
        dispatch_effect!(self, e => e.name())
    }
}

macro_rules! impl_from_effect {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Effect {
                fn from(effect: $ty) -> Self {
                    Effect::$variant(effect)
                }
            }
        )*
    };
}

impl_from_effect!(
    Gain(Gain),
    Noise(Noise),
    Silence(Silence),
    ParametricEq(ParametricEq),
    GraphicEqIir(IirGraphicEq),
    GraphicEqFir(FirGraphicEq),
    Convolver(Convolver),
);

/// Handle to an effect owned by an [`EffectChain`]
///
/// Handles go stale when their effect is destroyed; a stale handle never
/// refers to a later effect that reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId {
    index: usize,
    generation: u32,
}

/// Destination of a node's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Sink,
    Effect(usize),
}

struct Node {
    effect: Effect,
    enabled: bool,
    next: Route,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    /// None when the slot is free
    node: Option<Box<Node>>,
}

/// Ordered chain of effects ending in a sink
pub struct EffectChain<S> {
    sample_rate: f32,
    channels: usize,
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Chain members in processing order
    order: Vec<EffectId>,
    /// Slot indices of enabled members in processing order
    active: Vec<usize>,
    entry: Route,
    sink: S,
    /// De-interleave buffers for PCM input
    input_bufs: Vec<Vec<f32>>,
}

/// Continuation handed to an effect: the rest of the chain
struct Downstream<'a, S> {
    slots: &'a mut [Slot],
    sink: &'a mut S,
    route: Route,
}

impl<S: AudioSink> AudioSink for Downstream<'_, S> {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        dispatch(self.slots, self.sink, self.route, buf);
    }
}

/// Feed `buf` to `route` and everything after it
fn dispatch<S: AudioSink>(slots: &mut [Slot], sink: &mut S, route: Route, buf: &mut [Vec<f32>]) {
    match route {
        Route::Sink => sink.write_audio(buf),
        Route::Effect(index) => {
            // Moved out while it runs so the rest of the chain stays reachable
            let Some(mut node) = slots[index].node.take() else {
                return;
            };
            let mut next = Downstream {
                slots: &mut *slots,
                sink: &mut *sink,
                route: node.next,
            };
            node.effect.write_audio(buf, &mut next);
            slots[index].node = Some(node);
        }
    }
}

impl<S: AudioSink> EffectChain<S> {
    /// Create an empty chain that writes straight to `sink`
    pub fn new(sample_rate: f32, channels: usize, sink: S) -> Self {
        Self {
            sample_rate,
            channels,
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            active: Vec::new(),
            entry: Route::Sink,
            sink,
            input_bufs: vec![Vec::new(); channels],
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Take ownership of an effect; it is not part of the chain yet
    pub fn create_effect(&mut self, effect: impl Into<Effect>) -> EffectId {
        let node = Box::new(Node {
            effect: effect.into(),
            enabled: true,
            next: Route::Sink,
        });

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.node = Some(node);

        EffectId {
            index,
            generation: slot.generation,
        }
    }

    /// Destroy an effect, removing it from the chain first
    ///
    /// # Errors
    /// Fails with [`DspError::UnknownEffect`] for a stale handle.
    pub fn destroy_effect(&mut self, id: EffectId) -> Result<Effect> {
        self.check(id)?;
        self.remove_effect(id)?;

        let slot = &mut self.slots[id.index];
        let node = slot.node.take().ok_or(DspError::UnknownEffect)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        Ok(node.effect)
    }

    /// Append an effect to the end of the chain
    ///
    /// # Errors
    /// Stale handle, or the effect is already in the chain.
    pub fn add_effect(&mut self, id: EffectId) -> Result<()> {
        self.check(id)?;
        if self.order.contains(&id) {
            return Err(DspError::DuplicateEffect);
        }

        self.order.push(id);
        self.rewire();
        Ok(())
    }

    /// Remove an effect from the chain without destroying it
    ///
    /// Removing an effect that is not in the chain does nothing.
    ///
    /// # Errors
    /// Fails with [`DspError::UnknownEffect`] for a stale handle.
    pub fn remove_effect(&mut self, id: EffectId) -> Result<()> {
        self.check(id)?;

        let before = self.order.len();
        self.order.retain(|&member| member != id);
        if self.order.len() != before {
            if let Some(node) = self.slots[id.index].node.as_mut() {
                node.next = Route::Sink;
            }
            self.rewire();
        }
        Ok(())
    }

    /// Empty the chain; effects stay alive
    pub fn clear_effects(&mut self) {
        self.order.clear();
        self.rewire();
    }

    /// Chain members in processing order
    pub fn effects(&self) -> &[EffectId] {
        &self.order
    }

    /// Enable or bypass an effect
    ///
    /// Disabled chain members are skipped entirely.
    ///
    /// # Errors
    /// Fails with [`DspError::UnknownEffect`] for a stale handle.
    pub fn set_enabled(&mut self, id: EffectId, enabled: bool) -> Result<()> {
        self.node_mut(id)?.enabled = enabled;
        self.rewire();
        Ok(())
    }

    /// Whether an effect is enabled
    ///
    /// # Errors
    /// Fails with [`DspError::UnknownEffect`] for a stale handle.
    pub fn is_enabled(&self, id: EffectId) -> Result<bool> {
        self.node(id).map(|n| n.enabled)
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.node(id).ok().map(|n| &n.effect)
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.node_mut(id).ok().map(|n| &mut n.effect)
    }

    /// Replace the sink, returning the previous one
    pub fn set_sink(&mut self, sink: S) -> S {
        std::mem::replace(&mut self.sink, sink)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Run one block through the chain
    ///
    /// # Errors
    /// The block must have one sequence per channel, all of equal length.
    /// Nothing is processed otherwise.
    pub fn write_audio(&mut self, buf: &mut [Vec<f32>]) -> Result<()> {
        if buf.len() != self.channels {
            return Err(DspError::ChannelCountMismatch {
                expected: self.channels,
                actual: buf.len(),
            });
        }
        if let Some(first) = buf.first() {
            if buf.iter().any(|ch| ch.len() != first.len()) {
                return Err(DspError::UnevenChannels);
            }
        }

        dispatch(&mut self.slots, &mut self.sink, self.entry, buf);
        Ok(())
    }

    /// De-interleave float PCM and run it through the chain
    ///
    /// # Errors
    /// Fails with [`DspError::UnevenChannels`] if `raw` holds a partial frame.
    pub fn write_interleaved_f32(&mut self, raw: &[f32]) -> Result<()> {
        self.check_frames(raw.len())?;
        let mut bufs = std::mem::take(&mut self.input_bufs);
        pcm::deinterleave_f32(raw, &mut bufs);
        let result = self.write_audio(&mut bufs);
        self.input_bufs = bufs;
        result
    }

    /// De-interleave S16 PCM and run it through the chain
    ///
    /// # Errors
    /// Fails with [`DspError::UnevenChannels`] if `raw` holds a partial frame.
    pub fn write_interleaved_s16(&mut self, raw: &[i16]) -> Result<()> {
        self.check_frames(raw.len())?;
        let mut bufs = std::mem::take(&mut self.input_bufs);
        pcm::deinterleave_s16(raw, &mut bufs);
        let result = self.write_audio(&mut bufs);
        self.input_bufs = bufs;
        result
    }

    /// Reset every chain member
    pub fn reset(&mut self) {
        for id in &self.order {
            if let Some(node) = self.slots[id.index].node.as_mut() {
                node.effect.reset();
            }
        }
    }

    /// Flush every enabled member in order
    ///
    /// Output flushed by one effect passes through the effects after it
    /// before they are flushed themselves.
    pub fn finalize(&mut self) {
        for pos in 0..self.active.len() {
            let index = self.active[pos];
            let Some(mut node) = self.slots[index].node.take() else {
                continue;
            };
            let mut next = Downstream {
                slots: &mut self.slots,
                sink: &mut self.sink,
                route: node.next,
            };
            node.effect.finalize(&mut next);
            self.slots[index].node = Some(node);
        }
    }

    fn check_frames(&self, samples: usize) -> Result<()> {
        if self.channels == 0 || samples % self.channels != 0 {
            return Err(DspError::UnevenChannels);
        }
        Ok(())
    }

    fn check(&self, id: EffectId) -> Result<()> {
        self.node(id).map(|_| ())
    }

    fn node(&self, id: EffectId) -> Result<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_deref())
            .ok_or(DspError::UnknownEffect)
    }

    fn node_mut(&mut self, id: EffectId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_deref_mut())
            .ok_or(DspError::UnknownEffect)
    }

    /// Point every enabled member at the next enabled one
    fn rewire(&mut self) {
        self.active.clear();
        for id in &self.order {
            if self.slots[id.index].node.as_ref().is_some_and(|n| n.enabled) {
                self.active.push(id.index);
            }
        }

        self.entry = self.active.first().map_or(Route::Sink, |&i| Route::Effect(i));
        for (pos, &index) in self.active.iter().enumerate() {
            let next = self
                .active
                .get(pos + 1)
                .map_or(Route::Sink, |&i| Route::Effect(i));
            if let Some(node) = self.slots[index].node.as_mut() {
                node.next = next;
            }
        }

        debug!(
            members = self.order.len(),
            active = self.active.len(),
            "effect chain rewired"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingF32Sink;

    fn chain() -> EffectChain<CollectingF32Sink> {
        EffectChain::new(48_000.0, 1, CollectingF32Sink::new(1, 64))
    }

    #[test]
    fn empty_chain_writes_to_sink() {
        let mut chain = chain();
        chain.write_audio(&mut [vec![0.25, -0.25]]).unwrap();

        assert_eq!(chain.sink().buffer(), &[0.25, -0.25]);
        assert!(chain.effects().is_empty());
    }

    #[test]
    fn effects_run_in_order() {
        let mut chain = chain();
        let silence = chain.create_effect(Silence);
        let gain = chain.create_effect(Gain::new(0.0));
        chain.add_effect(gain).unwrap();
        chain.add_effect(silence).unwrap();

        chain.write_audio(&mut [vec![1.0; 4]]).unwrap();
        assert_eq!(chain.sink().buffer(), &[0.0; 4]);
        assert_eq!(chain.effects(), &[gain, silence]);
    }

    #[test]
    fn gains_compose() {
        let mut chain = chain();
        for db in [6.0206, -12.0412] {
            let id = chain.create_effect(Gain::new(db));
            chain.add_effect(id).unwrap();
        }

        chain.write_audio(&mut [vec![1.0]]).unwrap();
        assert!((chain.sink().buffer()[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn disabled_first_effect_is_bypassed() {
        let mut chain = chain();
        let silence = chain.create_effect(Silence);
        chain.add_effect(silence).unwrap();
        chain.set_enabled(silence, false).unwrap();

        chain.write_audio(&mut [vec![0.5; 3]]).unwrap();
        assert_eq!(chain.sink().buffer(), &[0.5; 3]);
        assert_eq!(chain.is_enabled(silence), Ok(false));

        chain.set_enabled(silence, true).unwrap();
        chain.write_audio(&mut [vec![0.5; 3]]).unwrap();
        assert_eq!(&chain.sink().buffer()[3..], &[0.0; 3]);
    }

    #[test]
    fn remove_and_destroy() {
        let mut chain = chain();
        let silence = chain.create_effect(Silence);
        chain.add_effect(silence).unwrap();

        chain.remove_effect(silence).unwrap();
        chain.write_audio(&mut [vec![0.5]]).unwrap();
        assert_eq!(chain.sink().buffer(), &[0.5]);

        // Still alive and can be re-added
        chain.add_effect(silence).unwrap();
        let effect = chain.destroy_effect(silence).unwrap();
        assert_eq!(effect.name(), "Silence");
        assert!(chain.effects().is_empty());

        assert_eq!(chain.add_effect(silence), Err(DspError::UnknownEffect));
        assert!(chain.effect(silence).is_none());
    }

    #[test]
    fn reused_slot_does_not_revive_stale_handle() {
        let mut chain = chain();
        let old = chain.create_effect(Silence);
        chain.destroy_effect(old).unwrap();

        let new = chain.create_effect(Gain::new(0.0));
        assert_ne!(old, new);
        assert!(chain.effect(old).is_none());
        assert_eq!(chain.effect(new).map(AudioEffect::name), Some("Gain"));
    }

    #[test]
    fn duplicate_add_rejected() {
        let mut chain = chain();
        let gain = chain.create_effect(Gain::new(0.0));
        chain.add_effect(gain).unwrap();
        assert_eq!(chain.add_effect(gain), Err(DspError::DuplicateEffect));
    }

    #[test]
    fn clear_effects_routes_to_sink() {
        let mut chain = chain();
        let silence = chain.create_effect(Silence);
        chain.add_effect(silence).unwrap();
        chain.clear_effects();

        chain.write_audio(&mut [vec![0.75]]).unwrap();
        assert_eq!(chain.sink().buffer(), &[0.75]);
        assert!(chain.effect(silence).is_some());
    }

    #[test]
    fn precondition_violations_rejected() {
        let mut chain: EffectChain<CollectingF32Sink> =
            EffectChain::new(48_000.0, 2, CollectingF32Sink::new(2, 4));

        assert_eq!(
            chain.write_audio(&mut [vec![0.0; 4]]),
            Err(DspError::ChannelCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            chain.write_audio(&mut [vec![0.0; 4], vec![0.0; 3]]),
            Err(DspError::UnevenChannels)
        );
        assert_eq!(
            chain.write_interleaved_f32(&[0.0; 3]),
            Err(DspError::UnevenChannels)
        );
        assert!(chain.sink().buffer().is_empty());
    }

    #[test]
    fn interleaved_s16_round_trip() {
        let mut chain: EffectChain<CollectingF32Sink> =
            EffectChain::new(48_000.0, 2, CollectingF32Sink::new(2, 2));

        chain.write_interleaved_s16(&[16384, -16384, 0, 8192]).unwrap();
        assert_eq!(chain.sink().buffer(), &[0.5, -0.5, 0.0, 0.25]);
    }

    #[test]
    fn finalize_tail_passes_through_later_effects() {
        let mut chain = chain();
        let mut convolver = Convolver::new(1, 4).unwrap();
        convolver.set_filter(&[1.0, 1.0]).unwrap();
        let conv = chain.create_effect(convolver);
        let gain = chain.create_effect(Gain::new(6.0206));
        chain.add_effect(conv).unwrap();
        chain.add_effect(gain).unwrap();

        chain.write_audio(&mut [vec![1.0, 0.0, 0.0]]).unwrap();
        assert!(chain.sink().buffer().is_empty());

        chain.finalize();
        let out = chain.sink().buffer();
        assert_eq!(out.len(), 4);
        let expected = [2.0, 2.0, 0.0, 0.0];
        for (a, b) in out.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-3, "{a} != {b}");
        }
    }

    #[test]
    fn set_sink_takes_effect_immediately() {
        let mut chain = chain();
        let gain = chain.create_effect(Gain::new(0.0));
        chain.add_effect(gain).unwrap();

        chain.write_audio(&mut [vec![0.1]]).unwrap();
        let old = chain.set_sink(CollectingF32Sink::new(1, 1));
        chain.write_audio(&mut [vec![0.2]]).unwrap();

        assert_eq!(old.buffer(), &[0.1]);
        assert_eq!(chain.sink().buffer(), &[0.2]);
    }
}
