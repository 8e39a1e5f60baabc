//! Demand-driven pipeline of filters with cached, timestamped outputs.
//!
//! An update runs three phases from a terminal node:
//!
//! ```text
//! A  update_output_information   producers first   largest regions, components
//! B  propagate_requested_region  consumers first   requested regions, staleness
//! C  update_output_data          producers first   generate stale nodes
//! ```

mod context;
mod filter;
mod node;


use std::mem::take;

use common::is_debug;
use hashbrown::HashMap;

pub use context::ExecutionContext;
pub use filter::{AsAny, Filter, OutputInformation};
pub use node::{NodeId, NodeState};

use crate::buffer::ImageBuffer;
use crate::error::{StreamError, StreamResult};
use crate::region::Region;
use node::Node;

#[derive(Debug)]
enum VisitCause {
    Terminal,
    InputRequest,
    Done,
}

#[derive(Debug)]
struct Visit {
    node_idx: usize,
    cause: VisitCause,
}

// used only for traversal assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ProcessState {
    #[default]
    None,
    Processing,
    Visited,
}

/// Arena of filter nodes. Edges only point at nodes that already exist, so the
/// graph is acyclic by construction.
#[derive(Default)]
pub struct Pipeline<const D: usize> {
    nodes: Vec<Node<D>>,
    names: HashMap<String, NodeId>,
    clock: u64,
}

impl<const D: usize> Pipeline<D> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            names: HashMap::new(),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_source<F: Filter<D>>(
        &mut self,
        name: impl Into<String>,
        filter: F,
    ) -> StreamResult<NodeId> {
        self.add_filter(name, filter, &[])
    }

    pub fn add_filter<F: Filter<D>>(
        &mut self,
        name: impl Into<String>,
        filter: F,
        inputs: &[NodeId],
    ) -> StreamResult<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(StreamError::DuplicateNodeName(name));
        }
        for &input in inputs {
            self.node(input)?;
        }

        let id = NodeId::from_index(self.nodes.len());
        let mtime = self.tick();
        for &input in inputs {
            let consumers = &mut self.nodes[input.index()].consumers;
            if !consumers.contains(&id) {
                consumers.push(id);
            }
        }

        tracing::debug!(node = %id, name = %name, inputs = inputs.len(), "Added pipeline node");

        self.names.insert(name.clone(), id);
        self.nodes
            .push(Node::new(id, name, Box::new(filter), inputs.to_vec(), mtime));

        Ok(id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> StreamResult<&str> {
        Ok(&self.node(id)?.name)
    }

    pub fn inputs(&self, id: NodeId) -> StreamResult<&[NodeId]> {
        Ok(&self.node(id)?.inputs)
    }

    pub fn filter<F: Filter<D>>(&self, id: NodeId) -> Option<&F> {
        let filter: &dyn Filter<D> = &*self.nodes.get(id.index())?.filter;
        filter.as_any().downcast_ref::<F>()
    }

    /// Mutable access that does not mark the node modified. Changes that affect the
    /// output must go through [`Pipeline::modify_filter`].
    pub fn filter_mut<F: Filter<D>>(&mut self, id: NodeId) -> Option<&mut F> {
        let filter: &mut dyn Filter<D> = &mut *self.nodes.get_mut(id.index())?.filter;
        filter.as_any_mut().downcast_mut::<F>()
    }

    /// Mutates a filter in place and marks the node modified, so the next update
    /// recomputes it and everything downstream.
    pub fn modify_filter<F: Filter<D>, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut F) -> R,
    ) -> Option<R> {
        let mtime = self.tick();
        let node = self.nodes.get_mut(id.index())?;
        let filter: &mut dyn Filter<D> = &mut *node.filter;
        let result = f(filter.as_any_mut().downcast_mut::<F>()?);
        node.mtime = mtime;

        tracing::debug!(node = %id, mtime, "Filter modified");

        Some(result)
    }

    /// Number of nodes an update of `id` touches, `id` included.
    pub fn stage_count(&self, id: NodeId) -> StreamResult<usize> {
        self.node(id)?;
        Ok(self.upstream_order(id).len())
    }

    pub fn set_requested_region(&mut self, id: NodeId, region: Region<D>) -> StreamResult<()> {
        let node = self.node_mut(id)?;
        node.requested_region = region;
        node.requested_set = true;
        Ok(())
    }

    pub fn requested_region(&self, id: NodeId) -> StreamResult<Region<D>> {
        Ok(self.node(id)?.requested_region)
    }

    pub fn buffered_region(&self, id: NodeId) -> StreamResult<Region<D>> {
        Ok(self.node(id)?.buffered_region())
    }

    /// Valid after Phase A.
    pub fn largest_possible_region(&self, id: NodeId) -> StreamResult<Region<D>> {
        Ok(self.node(id)?.info.largest_possible_region)
    }

    pub fn output_information(&self, id: NodeId) -> StreamResult<OutputInformation<D>> {
        Ok(self.node(id)?.info)
    }

    pub fn output(&self, id: NodeId) -> StreamResult<&ImageBuffer<D>> {
        Ok(&self.node(id)?.output)
    }

    pub fn node_state(&self, id: NodeId) -> StreamResult<NodeState> {
        Ok(self.node(id)?.state)
    }

    pub fn is_data_released(&self, id: NodeId) -> StreamResult<bool> {
        Ok(self.node(id)?.data_released)
    }

    /// Release this node's buffer after its consumers read it, regardless of the
    /// execution context.
    pub fn set_release_data_flag(&mut self, id: NodeId, release: bool) -> StreamResult<()> {
        self.node_mut(id)?.release_data_flag = release;
        Ok(())
    }

    pub fn release_data(&mut self, id: NodeId) -> StreamResult<()> {
        self.node_mut(id)?.release();
        tracing::debug!(node = %id, "Released node data");
        Ok(())
    }

    /// Marks `id` and every transitive consumer as data-released.
    pub fn invalidate(&mut self, id: NodeId) -> StreamResult<()> {
        self.node(id)?;

        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            let node = &mut self.nodes[id.index()];
            node.data_released = true;
            node.state = NodeState::Stale;
            stack.extend(node.consumers.iter().copied());
        }

        Ok(())
    }

    /// Returns nodes left mid-execution by a failed update to `Stale`.
    pub fn reset_pipeline(&mut self, id: NodeId) -> StreamResult<()> {
        self.node(id)?;

        for idx in self.upstream_order(id) {
            let node = &mut self.nodes[idx];
            node.needs_generate = false;
            if node.state == NodeState::Computing {
                node.state = NodeState::Stale;
                node.data_released = true;
            }
        }

        tracing::debug!(node = %id, "Pipeline reset");
        Ok(())
    }

    /// Runs all three phases for `id`.
    pub fn update(&mut self, id: NodeId, ctx: &ExecutionContext) -> StreamResult<()> {
        self.update_output_information(id)?;
        self.propagate_requested_region(id)?;
        self.update_output_data(id, ctx)
    }

    /// Phase A: refreshes pipeline timestamps and output information, producers first.
    pub fn update_output_information(&mut self, id: NodeId) -> StreamResult<()> {
        self.node(id)?;

        for idx in self.upstream_order(id) {
            let upstream_mtime = self.nodes[idx]
                .inputs
                .iter()
                .map(|input| self.nodes[input.index()].pipeline_mtime)
                .max()
                .unwrap_or(0);
            let node = &mut self.nodes[idx];
            node.pipeline_mtime = node.mtime.max(upstream_mtime);
            if node.information_mtime >= node.pipeline_mtime {
                continue;
            }

            let node = &self.nodes[idx];
            let input_infos: Vec<OutputInformation<D>> = node
                .inputs
                .iter()
                .map(|input| self.nodes[input.index()].info)
                .collect();
            let info = node
                .filter
                .output_information(&input_infos)
                .map_err(|source| StreamError::OutputInformation {
                    node: node.id,
                    source,
                })?;

            let stamp = self.tick();
            let node = &mut self.nodes[idx];
            node.info = info;
            node.information_mtime = stamp;

            tracing::debug!(
                node = %node.id,
                largest = %info.largest_possible_region,
                components = info.components,
                "Output information updated"
            );
        }

        Ok(())
    }

    /// Phase B: pushes requested regions upstream and decides which nodes must run.
    ///
    /// A node's requested region is the bounding union of what its demanding
    /// consumers need. Nodes whose cached output already serves the request do not
    /// propagate further. Calling this twice in a row changes nothing.
    pub fn propagate_requested_region(&mut self, id: NodeId) -> StreamResult<()> {
        self.node(id)?;

        let order = self.upstream_order(id);
        let mut demand: Vec<Option<Region<D>>> = vec![None; self.nodes.len()];
        for &idx in &order {
            self.nodes[idx].needs_generate = false;
        }

        let terminal = &self.nodes[id.index()];
        demand[id.index()] = Some(if terminal.requested_set {
            terminal.requested_region
        } else {
            terminal.info.largest_possible_region
        });

        for &idx in order.iter().rev() {
            let Some(requested) = demand[idx] else {
                continue;
            };

            let node = &mut self.nodes[idx];
            node.requested_region = requested;

            let largest = node.info.largest_possible_region;
            if !largest.contains(&requested) {
                return Err(StreamError::RegionConsistency {
                    node: node.id,
                    requested: requested.to_string(),
                    largest: largest.to_string(),
                });
            }

            if !node.is_stale_for(&requested) {
                node.state = NodeState::Fresh;
                continue;
            }
            node.state = NodeState::Stale;
            node.needs_generate = true;

            let node = &self.nodes[idx];
            for (input_index, input) in node.inputs.iter().enumerate() {
                let input_largest = self.nodes[input.index()].info.largest_possible_region;
                let needed =
                    node.filter
                        .compute_requested_region(input_index, &requested, &input_largest);
                let merged = match demand[input.index()] {
                    Some(existing) => existing.union(&needed),
                    None => needed,
                };
                demand[input.index()] = Some(merged);
            }
        }

        tracing::debug!(
            node = %id,
            requested = %self.nodes[id.index()].requested_region,
            stale = order.iter().filter(|&&idx| self.nodes[idx].needs_generate).count(),
            "Requested region propagated"
        );

        Ok(())
    }

    /// Phase C: generates every node Phase B marked, producers first.
    pub fn update_output_data(&mut self, id: NodeId, ctx: &ExecutionContext) -> StreamResult<()> {
        self.node(id)?;

        let order = self.upstream_order(id);

        // consumers still to run per producer, for early release
        let mut pending = vec![0usize; self.nodes.len()];
        for &idx in &order {
            if self.nodes[idx].needs_generate {
                for input in &self.nodes[idx].inputs {
                    pending[input.index()] += 1;
                }
            }
        }

        for &idx in &order {
            if !self.nodes[idx].needs_generate {
                continue;
            }

            self.generate_node(idx, ctx)?;

            for input_pos in 0..self.nodes[idx].inputs.len() {
                let input = self.nodes[idx].inputs[input_pos];
                pending[input.index()] -= 1;
                if pending[input.index()] == 0 && input != id {
                    let producer = &mut self.nodes[input.index()];
                    if ctx.release_data() || producer.release_data_flag {
                        producer.release();
                        tracing::debug!(node = %input, "Released consumed data");
                    }
                }
            }
        }

        Ok(())
    }

    fn generate_node(&mut self, idx: usize, ctx: &ExecutionContext) -> StreamResult<()> {
        let node = &mut self.nodes[idx];
        let id = node.id;
        let requested = node.requested_region;
        let components = node.info.components;
        node.state = NodeState::Computing;

        node.filter
            .before_generate(&requested)
            .map_err(|source| StreamError::Generate { node: id, source })?;

        let mut output = take(&mut node.output);
        if *output.region() != requested || output.components() != components {
            output = ImageBuffer::new(requested, components);
        }

        let node = &self.nodes[idx];
        let inputs: Vec<&ImageBuffer<D>> = node
            .inputs
            .iter()
            .map(|input| &self.nodes[input.index()].output)
            .collect();

        if is_debug() {
            for (input_index, (input_id, input)) in node.inputs.iter().zip(&inputs).enumerate() {
                let input_largest = self.nodes[input_id.index()].info.largest_possible_region;
                let needed =
                    node.filter
                        .compute_requested_region(input_index, &requested, &input_largest);
                assert!(
                    input.region().contains(&needed),
                    "input {input_id} of {id} buffers {} but {needed} is needed",
                    input.region()
                );
            }
        }

        ctx.dispatch()
            .run(&*node.filter, &inputs, &mut output)
            .map_err(|source| StreamError::Generate { node: id, source })?;

        let stamp = self.tick();
        let node = &mut self.nodes[idx];
        node.filter
            .after_generate()
            .map_err(|source| StreamError::Generate { node: id, source })?;

        node.output = output;
        node.update_mtime = stamp;
        node.data_released = false;
        node.state = NodeState::Fresh;
        node.needs_generate = false;

        tracing::debug!(node = %id, name = %node.name, region = %requested, "Generated output");

        Ok(())
    }

    /// `id` and everything upstream of it, producers before consumers.
    fn upstream_order(&self, id: NodeId) -> Vec<usize> {
        let mut states = vec![ProcessState::None; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![Visit {
            node_idx: id.index(),
            cause: VisitCause::Terminal,
        }];

        while let Some(visit) = stack.pop() {
            match visit.cause {
                VisitCause::Terminal | VisitCause::InputRequest => {}
                VisitCause::Done => {
                    assert_eq!(states[visit.node_idx], ProcessState::Processing);
                    states[visit.node_idx] = ProcessState::Visited;
                    order.push(visit.node_idx);
                    continue;
                }
            }

            match states[visit.node_idx] {
                ProcessState::None => {}
                ProcessState::Processing => unreachable!("inputs always precede their consumers"),
                ProcessState::Visited => continue,
            }

            states[visit.node_idx] = ProcessState::Processing;
            stack.push(Visit {
                node_idx: visit.node_idx,
                cause: VisitCause::Done,
            });
            for input in self.nodes[visit.node_idx].inputs.iter().rev() {
                stack.push(Visit {
                    node_idx: input.index(),
                    cause: VisitCause::InputRequest,
                });
            }
        }

        order
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn node(&self, id: NodeId) -> StreamResult<&Node<D>> {
        self.nodes
            .get(id.index())
            .ok_or(StreamError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> StreamResult<&mut Node<D>> {
        self.nodes
            .get_mut(id.index())
            .ok_or(StreamError::UnknownNode(id))
    }
}
