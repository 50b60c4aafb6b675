//! `print` and `recorder`.

use std::collections::VecDeque;

use patchwerk_core::{
    Atom, Attribute, Builder, Context, InletKind, MessageDisplay, Object, OutletKind, Tag,
};

const DEFAULT_CAPACITY: i64 = 1024;

struct Print {
    prefix: String,
}

impl Object for Print {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        ctx.post(format!("{}: {}", self.prefix, MessageDisplay(message)));
        true
    }
}

pub(crate) fn create_print(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let prefix = match builder.args() {
        [] => "print".to_string(),
        args => MessageDisplay(args).to_string(),
    };
    builder.inlet(InletKind::Cold);
    Ok(Box::new(Print { prefix }))
}

/// Keeps the messages it receives, oldest first, and passes them on.
///
/// `clear` forgets everything. The `capacity` attribute caps how many
/// messages are kept; the oldest are dropped first.
#[derive(Debug, Default)]
pub struct Recorder {
    messages: VecDeque<Vec<Atom>>,
}

impl Recorder {
    /// Kept messages, oldest first.
    pub fn messages(&self) -> Vec<Vec<Atom>> {
        self.messages.iter().cloned().collect()
    }

    /// Number of kept messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is kept.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn trim(&mut self, ctx: &Context<'_>) {
        let capacity = ctx
            .attribute("capacity")
            .first()
            .map_or(DEFAULT_CAPACITY, Atom::as_int)
            .max(1) as usize;
        while self.messages.len() > capacity {
            self.messages.pop_front();
        }
    }
}

impl Object for Recorder {
    fn receive(&mut self, ctx: &mut Context<'_>, _inlet: usize, message: &[Atom]) -> bool {
        match message {
            [selector] if selector.is_tag("clear") => {
                self.messages.clear();
                true
            }
            [Atom::Tag(t), ..] if t.as_str().starts_with('@') => false,
            _ => {
                self.messages.push_back(message.to_vec());
                self.trim(ctx);
                ctx.send(0, message.to_vec());
                true
            }
        }
    }

    fn attribute_changed(&mut self, ctx: &mut Context<'_>, name: &Tag) -> bool {
        if name.as_str() == "capacity" {
            self.trim(ctx);
        }
        true
    }
}

pub(crate) fn create_recorder(builder: &mut Builder<'_>) -> Result<Box<dyn Object>, String> {
    let capacity = builder.tag("capacity");
    builder
        .inlet(InletKind::Hot)
        .outlet(OutletKind::Data)
        .attribute(Attribute::int(capacity, DEFAULT_CAPACITY).with_min(1.0));
    match builder.arg(0) {
        Atom::Null => {}
        value if value.is_number() => builder.init_attribute("capacity", &[value])?,
        other => return Err(format!("capacity must be a number, got \"{other}\"")),
    }
    Ok(Box::new(Recorder::default()))
}
