//! Seam between a patcher and a signal engine.
//!
//! [`Patcher::dsp_start`](crate::Patcher::dsp_start) hands the engine one
//! [`Process`] per node owning a signal port and one [`Connection`] per
//! signal link, then asks it to compile and start. The engine decides how
//! processes are scheduled.
//!
//! [`BlockEngine`] is a small single-threaded engine that runs processes in
//! topological order, one block per [`tick`](Engine::tick). Inputs fed by
//! several links are summed.

use thiserror::Error;

use crate::node::{AsAny, NodeId};

/// Audio-rate computation of one node.
///
/// `inputs` and `outputs` hold one buffer per inlet and outlet of the node,
/// each `block_size` samples long. Buffers of data ports stay silent.
pub trait Process: Send {
    /// Computes one block.
    fn perform(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>]);
}

/// A signal link as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Sending node.
    pub from: NodeId,
    /// Outlet of the sending node.
    pub outlet: usize,
    /// Receiving node.
    pub to: NodeId,
    /// Inlet of the receiving node.
    pub inlet: usize,
}

/// Reason an engine refused a graph.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{reason}")]
pub struct CompileError {
    /// Node at fault, when the engine can name one.
    pub node: Option<NodeId>,
    /// What went wrong.
    pub reason: String,
}

impl CompileError {
    /// Creates an error about `node`.
    pub fn at(node: NodeId, reason: impl Into<String>) -> Self {
        Self {
            node: Some(node),
            reason: reason.into(),
        }
    }
}

/// A signal engine driven by a patcher.
pub trait Engine: AsAny + Send {
    /// Adds the process of `node`, which has `inlets` inlets and `outlets`
    /// outlets.
    fn add_process(&mut self, node: NodeId, inlets: usize, outlets: usize, process: Box<dyn Process>);

    /// Adds a signal link.
    fn add_connection(&mut self, connection: Connection);

    /// Builds the execution plan.
    fn compile(&mut self, sample_rate: f64, block_size: usize) -> Result<(), CompileError>;

    /// Starts processing.
    fn start(&mut self);

    /// Processes one block.
    fn tick(&mut self);

    /// Stops processing.
    fn stop(&mut self);
}

struct Entry {
    node: NodeId,
    process: Box<dyn Process>,
    inputs: Vec<Vec<f32>>,
    outputs: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    from: usize,
    outlet: usize,
    to: usize,
    inlet: usize,
}

/// Reference engine running every process once per tick.
#[derive(Default)]
pub struct BlockEngine {
    entries: Vec<Entry>,
    connections: Vec<Connection>,
    routes: Vec<Route>,
    order: Vec<usize>,
    sample_rate: f64,
    block_size: usize,
    running: bool,
    ticks: u64,
}

impl BlockEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample rate given to the last successful compile.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Block size given to the last successful compile.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks processed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns `true` between [`start`](Engine::start) and
    /// [`stop`](Engine::stop).
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Nodes in execution order.
    pub fn order(&self) -> Vec<NodeId> {
        self.order.iter().map(|&i| self.entries[i].node).collect()
    }

    /// Last block written to `outlet` of `node`.
    pub fn output(&self, node: NodeId, outlet: usize) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .and_then(|e| e.outputs.get(outlet))
            .map(Vec::as_slice)
    }

    fn index_of(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.node == node)
    }

    fn resolve(&self, c: &Connection) -> Result<Route, CompileError> {
        let from = self
            .index_of(c.from)
            .ok_or_else(|| CompileError::at(c.from, "no process"))?;
        let to = self
            .index_of(c.to)
            .ok_or_else(|| CompileError::at(c.to, "no process"))?;
        if c.outlet >= self.entries[from].outputs.len() {
            return Err(CompileError::at(c.from, format!("no outlet {}", c.outlet)));
        }
        if c.inlet >= self.entries[to].inputs.len() {
            return Err(CompileError::at(c.to, format!("no inlet {}", c.inlet)));
        }
        Ok(Route {
            from,
            outlet: c.outlet,
            to,
            inlet: c.inlet,
        })
    }

    fn kahn_sort(&self, routes: &[Route]) -> Result<Vec<usize>, CompileError> {
        let n = self.entries.len();
        let mut in_degree = vec![0u32; n];
        for r in routes {
            in_degree[r.to] += 1;
        }

        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for r in routes.iter().filter(|r| r.from == idx) {
                in_degree[r.to] -= 1;
                if in_degree[r.to] == 0 {
                    queue.push(r.to);
                }
            }
        }

        if sorted.len() != n {
            let stuck = (0..n).find(|i| !sorted.contains(i)).unwrap_or(0);
            return Err(CompileError::at(self.entries[stuck].node, "signal feedback loop"));
        }
        Ok(sorted)
    }
}

/// Adds the output buffer of one entry into the input buffer of another.
fn mix(entries: &mut [Entry], route: Route) {
    let (source, target) = if route.from < route.to {
        let (head, tail) = entries.split_at_mut(route.to);
        (&head[route.from], &mut tail[0])
    } else {
        let (head, tail) = entries.split_at_mut(route.from);
        (&tail[0], &mut head[route.to])
    };
    let input = &mut target.inputs[route.inlet];
    for (d, s) in input.iter_mut().zip(&source.outputs[route.outlet]) {
        *d += s;
    }
}

impl Engine for BlockEngine {
    fn add_process(&mut self, node: NodeId, inlets: usize, outlets: usize, process: Box<dyn Process>) {
        self.entries.push(Entry {
            node,
            process,
            inputs: vec![Vec::new(); inlets],
            outputs: vec![Vec::new(); outlets],
        });
    }

    fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    fn compile(&mut self, sample_rate: f64, block_size: usize) -> Result<(), CompileError> {
        let routes = self
            .connections
            .iter()
            .map(|c| self.resolve(c))
            .collect::<Result<Vec<_>, _>>()?;
        let order = self.kahn_sort(&routes)?;
        for entry in &mut self.entries {
            for buffer in entry.inputs.iter_mut().chain(entry.outputs.iter_mut()) {
                *buffer = vec![0.0; block_size];
            }
        }
        tracing::debug!("engine_compile: {} processes, {} routes", order.len(), routes.len());
        self.routes = routes;
        self.order = order;
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn tick(&mut self) {
        if !self.running {
            return;
        }
        for i in 0..self.order.len() {
            let idx = self.order[i];
            for buffer in &mut self.entries[idx].inputs {
                buffer.fill(0.0);
            }
            for r in 0..self.routes.len() {
                let route = self.routes[r];
                if route.to == idx {
                    mix(&mut self.entries, route);
                }
            }
            let entry = &mut self.entries[idx];
            entry.process.perform(&entry.inputs, &mut entry.outputs);
        }
        self.ticks += 1;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
