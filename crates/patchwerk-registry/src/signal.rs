//! Signal nodes: `sig~` and `*~`.
//!
//! Control messages arrive on the patcher's threads while the process runs
//! on the engine's. The node and its process share their parameter through
//! a bit-cast `f32` in an atomic, so neither side takes a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use patchwerk_core::{Atom, Builder, Context, InletKind, Object, OutletKind, Process};

/// A lock-free `f32` shared by a node and its process.
#[derive(Debug, Clone)]
struct SharedValue(Arc<AtomicU32>);

impl SharedValue {
    fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    #[inline]
    fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    #[inline]
    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }
}

fn initial_value(builder: &Builder<'_>) -> Result<f32, String> {
    match builder.arg(0) {
        Atom::Null => Ok(0.0),
        value if value.is_number() => Ok(value.as_float() as f32),
        other => Err(format!("expects a number, got \"{other}\"")),
    }
}

/// Stores a number arriving on `expected_inlet` into `value`.
fn set_from(value: &SharedValue, expected_inlet: usize, inlet: usize, message: &[Atom]) -> bool {
    match message {
        [number] if inlet == expected_inlet && number.is_number() => {
            value.set(number.as_float() as f32);
            true
        }
        _ => false,
    }
}

struct Sig {
    value: SharedValue,
}

struct SigProcess {
    value: SharedValue,
}

impl Process for SigProcess {
    fn perform(&mut self, _inputs: &[Vec<f32>], outputs: &mut [Vec<f32>]) {
        outputs[0].fill(self.value.get());
    }
}

impl Object for Sig {
    fn receive(&mut self, _ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        set_from(&self.value, 0, inlet, message)
    }

    fn prepare_dsp(&mut self, _sample_rate: f64, _block_size: usize) -> Option<Box<dyn Process>> {
        Some(Box::new(SigProcess {
            value: self.value.clone(),
        }))
    }
}

pub(crate) fn create_sig(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let value = initial_value(builder)?;
    builder.inlet(InletKind::Cold).outlet(OutletKind::Signal);
    Ok(Box::new(Sig {
        value: SharedValue::new(value),
    }))
}

struct Multiply {
    factor: SharedValue,
}

struct MultiplyProcess {
    factor: SharedValue,
}

impl Process for MultiplyProcess {
    fn perform(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>]) {
        let factor = self.factor.get();
        for (out, input) in outputs[0].iter_mut().zip(&inputs[0]) {
            *out = input * factor;
        }
    }
}

impl Object for Multiply {
    fn receive(&mut self, _ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        set_from(&self.factor, 1, inlet, message)
    }

    fn prepare_dsp(&mut self, _sample_rate: f64, _block_size: usize) -> Option<Box<dyn Process>> {
        Some(Box::new(MultiplyProcess {
            factor: self.factor.clone(),
        }))
    }
}

pub(crate) fn create_multiply(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let factor = initial_value(builder)?;
    builder
        .inlet(InletKind::Signal)
        .inlet(InletKind::Cold)
        .outlet(OutletKind::Signal);
    Ok(Box::new(Multiply {
        factor: SharedValue::new(factor),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_sees_later_updates() {
        let value = SharedValue::new(0.5);
        let mut process = SigProcess {
            value: value.clone(),
        };
        let mut outputs = vec![vec![0.0; 4]];
        process.perform(&[], &mut outputs);
        assert_eq!(outputs[0], [0.5; 4]);

        value.set(-1.0);
        process.perform(&[], &mut outputs);
        assert_eq!(outputs[0], [-1.0; 4]);
    }

    #[test]
    fn multiply_scales_input() {
        let mut process = MultiplyProcess {
            factor: SharedValue::new(2.0),
        };
        let inputs = vec![vec![0.25, 0.5, -1.0], vec![0.0; 3]];
        let mut outputs = vec![vec![0.0; 3]];
        process.perform(&inputs, &mut outputs);
        assert_eq!(outputs[0], [0.5, 1.0, -2.0]);
    }
}
