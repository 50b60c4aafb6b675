//! `delay`: outputs a message some milliseconds after it arrived.
//!
//! Every message on the left inlet re-arms the clock, so a burst produces a
//! single output carrying the last message. `stop` cancels. The right inlet
//! and the `time` attribute set the delay.

use patchwerk_core::{Atom, Attribute, Builder, Clock, Context, InletKind, Object, OutletKind};

struct Delay {
    clock: Clock,
}

impl Delay {
    fn time(ctx: &Context<'_>) -> f64 {
        ctx.attribute("time").first().map_or(0.0, Atom::as_float)
    }
}

impl Object for Delay {
    fn receive(&mut self, ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        match (inlet, message) {
            (0, [selector]) if selector.is_tag("stop") => {
                self.clock.cancel();
                true
            }
            (0, []) => {
                let bang = vec![Atom::from(ctx.tag("bang"))];
                self.clock.delay(&ctx.handle(), bang, Self::time(ctx));
                true
            }
            (0, [Atom::Tag(selector), ..]) if selector.as_str().starts_with('@') => false,
            (0, _) => {
                self.clock.delay(&ctx.handle(), message.to_vec(), Self::time(ctx));
                true
            }
            (1, [value]) if value.is_number() => {
                if let Err(err) = ctx.set_attribute("time", &[value.clone()]) {
                    ctx.error(err.to_string());
                }
                true
            }
            _ => false,
        }
    }

    fn tick(&mut self, ctx: &mut Context<'_>, message: &[Atom]) {
        ctx.send(0, message.to_vec());
    }
}

pub(crate) fn create_delay(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let time = builder.tag("time");
    builder
        .inlet(InletKind::Hot)
        .inlet(InletKind::Cold)
        .outlet(OutletKind::Data)
        .attribute(Attribute::float(time, 0.0).with_min(0.0));
    match builder.arg(0) {
        Atom::Null => {}
        value if value.is_number() => builder.init_attribute("time", &[value])?,
        other => return Err(format!("delay time must be a number, got \"{other}\"")),
    }
    Ok(Box::new(Delay {
        clock: Clock::new(),
    }))
}
