//! Small node types shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use patchwerk_core::{
    AttrFlags, Atom, Attribute, Clock, Context, InletKind, NodeId, Object, OutletKind, Patcher,
    Process, Runtime,
};

/// Adds its cold operand to integers arriving on the hot inlet.
pub struct Adder {
    right: i64,
}

impl Object for Adder {
    fn receive(&mut self, ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        match (inlet, message) {
            (0, [value]) if value.is_number() => {
                ctx.send(0, vec![Atom::Int(value.as_int() + self.right)]);
                true
            }
            (1, [value]) if value.is_number() => {
                self.right = value.as_int();
                true
            }
            _ => false,
        }
    }
}

/// Keeps every message and passes it on.
#[derive(Default)]
pub struct Recorder {
    pub received: Vec<Vec<Atom>>,
}

impl Object for Recorder {
    fn receive(&mut self, ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        if inlet != 0 || message.first().is_some_and(|a| a.as_tag().is_some_and(|t| t.as_str().starts_with('@'))) {
            return false;
        }
        self.received.push(message.to_vec());
        ctx.send(0, message.to_vec());
        true
    }
}

/// Counts the messages it receives in its opaque `count` attribute.
pub struct Counter;

impl Object for Counter {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        if message.first().is_some_and(|a| a.as_tag().is_some_and(|t| t.as_str().starts_with('@'))) {
            return false;
        }
        let count = ctx.attribute("count").first().map_or(0, Atom::as_int) + 1;
        ctx.set_attribute("count", &[Atom::Int(count)]).is_ok()
    }
}

/// Appends its own ID to a shared log for every message.
pub struct Tracer {
    log: Arc<Mutex<Vec<NodeId>>>,
}

impl Object for Tracer {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, _message: &[Atom]) -> bool {
        self.log.lock().push(ctx.id());
        true
    }
}

/// Binds to the beacon named by its argument and outputs what it receives.
pub struct Receiver {
    name: String,
}

impl Object for Receiver {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        ctx.send(0, message.to_vec());
        true
    }

    fn loaded(&mut self, ctx: &mut Context<'_>) {
        ctx.bind(&self.name);
    }
}

/// Re-emits messages after its argument in milliseconds.
pub struct Delayer {
    clock: Clock,
    ms: f64,
}

impl Object for Delayer {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        self.clock.delay(&ctx.handle(), message.to_vec(), self.ms);
        true
    }

    fn tick(&mut self, ctx: &mut Context<'_>, message: &[Atom]) {
        ctx.send(0, message.to_vec());
    }
}

struct Fill(f32);

impl Process for Fill {
    fn perform(&mut self, _inputs: &[Vec<f32>], outputs: &mut [Vec<f32>]) {
        outputs[0].fill(self.0);
    }
}

struct Scale(f32);

impl Process for Scale {
    fn perform(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>]) {
        for (o, i) in outputs[0].iter_mut().zip(&inputs[0]) {
            *o = i * self.0;
        }
    }
}

/// Constant signal source, or a signal scaler, or a signal node that
/// provides no process at all.
pub enum Signal {
    Source(f32),
    Scaler(f32),
    Broken,
}

impl Object for Signal {
    fn receive(&mut self, _ctx: &mut Context<'_>, _inlet: usize, _message: &[Atom]) -> bool {
        false
    }

    fn prepare_dsp(&mut self, _sample_rate: f64, _block_size: usize) -> Option<Box<dyn Process>> {
        match *self {
            Signal::Source(v) => Some(Box::new(Fill(v))),
            Signal::Scaler(v) => Some(Box::new(Scale(v))),
            Signal::Broken => None,
        }
    }
}

/// Registers the test node types and returns the log written by `trace`.
pub fn install(runtime: &Runtime) -> Arc<Mutex<Vec<NodeId>>> {
    let prototypes = runtime.prototypes();
    prototypes.add_prototype(runtime.tag("+"), |b| {
        let right = b.arg(0).as_int();
        b.inlet(InletKind::Hot)
            .inlet(InletKind::Cold)
            .outlet(OutletKind::Data);
        Ok(Box::new(Adder { right }))
    });
    prototypes.add_prototype(runtime.tag("recorder"), |b| {
        let gain = b.tag("gain");
        b.inlet(InletKind::Hot)
            .outlet(OutletKind::Data)
            .attribute(Attribute::int(gain, 1).with_range(0.0, 10.0));
        Ok(Box::new(Recorder::default()))
    });
    prototypes.add_prototype(runtime.tag("counter"), |b| {
        let count = b.tag("count");
        b.inlet(InletKind::Hot).attribute(
            Attribute::int(count, 0).with_flags(AttrFlags::default().union(AttrFlags::OPAQUE)),
        );
        Ok(Box::new(Counter))
    });
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&log);
    prototypes.add_prototype(runtime.tag("trace"), move |b| {
        b.inlet(InletKind::Hot);
        Ok(Box::new(Tracer {
            log: Arc::clone(&shared),
        }))
    });
    prototypes.add_prototype(runtime.tag("receive"), |b| {
        let name = b
            .arg(0)
            .as_tag()
            .map(ToString::to_string)
            .ok_or_else(|| "needs a name".to_string())?;
        b.inlet(InletKind::Cold).outlet(OutletKind::Data);
        Ok(Box::new(Receiver { name }))
    });
    prototypes.add_prototype(runtime.tag("delay"), |b| {
        let ms = b.arg(0).as_float();
        b.inlet(InletKind::Hot).outlet(OutletKind::Data);
        Ok(Box::new(Delayer {
            clock: Clock::new(),
            ms,
        }))
    });
    prototypes.add_prototype(runtime.tag("source~"), |b| {
        let value = b.arg(0).as_float() as f32;
        b.outlet(OutletKind::Signal);
        Ok(Box::new(Signal::Source(value)))
    });
    prototypes.add_prototype(runtime.tag("scale~"), |b| {
        let value = b.arg(0).as_float() as f32;
        b.inlet(InletKind::Signal).outlet(OutletKind::Signal);
        Ok(Box::new(Signal::Scaler(value)))
    });
    prototypes.add_prototype(runtime.tag("broken~"), |b| {
        b.inlet(InletKind::Signal);
        Ok(Box::new(Signal::Broken))
    });
    log
}

/// Messages recorded by the recorder `id`.
pub fn recorded(patcher: &Patcher, id: NodeId) -> Vec<Vec<Atom>> {
    patcher
        .node(id)
        .and_then(|n| n.inspect::<Recorder, _>(|r| r.received.clone()))
        .unwrap_or_default()
}

/// First node whose type is `name`.
pub fn find(patcher: &Patcher, name: &str) -> Option<NodeId> {
    patcher
        .nodes()
        .iter()
        .find(|n| n.name().as_str() == name)
        .map(|n| n.id())
}
