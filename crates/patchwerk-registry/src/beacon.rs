//! `send` and `receive`: messaging by name through the runtime's beacons.

use patchwerk_core::{Atom, Builder, Context, InletKind, Object, OutletKind};

fn beacon_name(builder: &Builder<'_>) -> Result<String, String> {
    match builder.arg(0) {
        Atom::Tag(name) => Ok(name.to_string()),
        Atom::Null => Err("needs a name".to_string()),
        other => Err(format!("name must be a word, got \"{other}\"")),
    }
}

struct Sender {
    name: String,
}

impl Object for Sender {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        ctx.beacon_send(&self.name, message.to_vec());
        true
    }
}

pub(crate) fn create_send(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let name = beacon_name(builder)?;
    builder.inlet(InletKind::Cold);
    Ok(Box::new(Sender { name }))
}

struct Receiver {
    name: String,
}

impl Object for Receiver {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        match message {
            [selector, Atom::Tag(name)] if selector.is_tag("set") => {
                ctx.unbind(&self.name);
                self.name = name.to_string();
                ctx.bind(&self.name);
            }
            _ => ctx.send(0, message.to_vec()),
        }
        true
    }

    fn loaded(&mut self, ctx: &mut Context<'_>) {
        ctx.bind(&self.name);
    }
}

pub(crate) fn create_receive(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let name = beacon_name(builder)?;
    builder.inlet(InletKind::Cold).outlet(OutletKind::Data);
    Ok(Box::new(Receiver { name }))
}
