//! Pointer interaction state machine for the graph canvas.
//!
//! Pointer-down always forces the canvas back into an interactive state
//! before dispatching, and pointer-up always clears transient drag state,
//! so a dismissed dialog or an interrupted drag can never leave the canvas
//! latched.

use super::layout::{self, WidgetZone};
use super::Viewport;
use crate::graph::{Graph, NodeId};
use crate::graph::WidgetValue;
use crate::registry::{NodeRegistry, WidgetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionFlags {
    pub allow_interaction: bool,
    pub read_only: bool,
    pub block_click: bool,
}

impl Default for InteractionFlags {
    fn default() -> Self {
        Self {
            allow_interaction: true,
            read_only: false,
            block_click: false,
        }
    }
}

impl InteractionFlags {
    pub fn force_interactive(&mut self) {
        *self = Self::default();
    }

    /// State while a modal dialog owns the keyboard.
    pub fn latch_modal(&mut self) {
        self.allow_interaction = false;
        self.block_click = true;
    }

    pub fn is_interactive(&self) -> bool {
        self.allow_interaction && !self.read_only && !self.block_click
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Node {
        node_id: NodeId,
        grab: [f64; 2],
        moved: bool,
    },
    Pan {
        last: [f64; 2],
    },
    Connection {
        origin_id: NodeId,
        origin_slot: usize,
        type_tag: String,
        cursor: [f64; 2],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    OutputSlot { node_id: NodeId, slot: usize },
    InputSlot { node_id: NodeId, slot: usize },
    Title { node_id: NodeId },
    Widget { node_id: NodeId, index: usize, zone: WidgetZone },
    Body { node_id: NodeId },
    Empty,
}

/// What the caller has to act on after a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    Nothing,
    /// Selection or drag state changed; redraw.
    Redraw,
    /// The graph structure or a node position changed.
    GraphEdited,
    WidgetEdit {
        node_id: NodeId,
        widget_index: usize,
        value: WidgetValue,
    },
    OpenPrompt {
        node_id: NodeId,
        widget_index: usize,
    },
}

/// Ordered dispatch: output slot, input slot, title, widget, body.  The
/// topmost node wins.
pub fn hit_test(graph: &Graph, registry: &NodeRegistry, world: [f64; 2]) -> PointerTarget {
    for node in graph.nodes.iter().rev() {
        let lx = world[0] - node.pos[0];
        let ly = world[1] - node.pos[1];
        if let Some(slot) = layout::hit_output_slot(node, lx, ly) {
            return PointerTarget::OutputSlot { node_id: node.id, slot };
        }
        if let Some(slot) = layout::hit_input_slot(node, lx, ly) {
            return PointerTarget::InputSlot { node_id: node.id, slot };
        }
        if layout::hit_title(node, lx, ly) {
            return PointerTarget::Title { node_id: node.id };
        }
        if let Some(desc) = registry.get(&node.type_id) {
            if let Some((index, zone)) = layout::hit_widget(node, &desc.widgets, lx, ly) {
                return PointerTarget::Widget {
                    node_id: node.id,
                    index,
                    zone,
                };
            }
        }
        if node.contains(world[0], world[1]) {
            return PointerTarget::Body { node_id: node.id };
        }
    }
    PointerTarget::Empty
}

#[derive(Debug, Default)]
pub struct Interaction {
    pub flags: InteractionFlags,
    pub drag: DragState,
    pub selected: Option<NodeId>,
    pub dialog_open: bool,
}

impl Interaction {
    pub fn pointer_down(
        &mut self,
        graph: &mut Graph,
        registry: &NodeRegistry,
        world: [f64; 2],
        screen: [f64; 2],
    ) -> PointerOutcome {
        self.flags.force_interactive();

        match hit_test(graph, registry, world) {
            PointerTarget::OutputSlot { node_id, slot } => {
                let type_tag = graph
                    .node(node_id)
                    .and_then(|n| n.outputs.get(slot))
                    .map(|s| s.type_tag.clone())
                    .unwrap_or_default();
                self.drag = DragState::Connection {
                    origin_id: node_id,
                    origin_slot: slot,
                    type_tag,
                    cursor: world,
                };
                PointerOutcome::Redraw
            }
            PointerTarget::InputSlot { node_id, slot } => {
                let existing = graph
                    .node(node_id)
                    .and_then(|n| n.inputs.get(slot))
                    .and_then(|s| s.link);
                match existing.and_then(|link_id| graph.remove_link(link_id)) {
                    Some(link) => {
                        self.drag = DragState::Connection {
                            origin_id: link.origin_id,
                            origin_slot: link.origin_slot,
                            type_tag: link.type_tag,
                            cursor: world,
                        };
                        PointerOutcome::GraphEdited
                    }
                    None => PointerOutcome::Nothing,
                }
            }
            PointerTarget::Title { node_id } | PointerTarget::Body { node_id } => {
                self.start_node_drag(graph, node_id, world);
                PointerOutcome::Redraw
            }
            PointerTarget::Widget {
                node_id,
                index,
                zone,
            } => {
                self.selected = Some(node_id);
                widget_action(graph, registry, node_id, index, zone)
            }
            PointerTarget::Empty => {
                self.selected = None;
                self.drag = DragState::Pan { last: screen };
                PointerOutcome::Redraw
            }
        }
    }

    fn start_node_drag(&mut self, graph: &mut Graph, node_id: NodeId, world: [f64; 2]) {
        self.selected = Some(node_id);
        graph.bring_to_front(node_id);
        if let Some(node) = graph.node(node_id) {
            self.drag = DragState::Node {
                node_id,
                grab: [world[0] - node.pos[0], world[1] - node.pos[1]],
                moved: false,
            };
        }
    }

    /// Returns true when something visible changed.
    pub fn pointer_move(
        &mut self,
        graph: &mut Graph,
        viewport: &mut Viewport,
        world: [f64; 2],
        screen: [f64; 2],
    ) -> bool {
        match &mut self.drag {
            DragState::Idle => false,
            DragState::Node {
                node_id,
                grab,
                moved,
            } => {
                if let Some(node) = graph.node_mut(*node_id) {
                    node.pos = [world[0] - grab[0], world[1] - grab[1]];
                    *moved = true;
                }
                true
            }
            DragState::Pan { last } => {
                viewport.pan_by(screen[0] - last[0], screen[1] - last[1]);
                *last = screen;
                true
            }
            DragState::Connection { cursor, .. } => {
                *cursor = world;
                true
            }
        }
    }

    pub fn pointer_up(&mut self, graph: &mut Graph, world: [f64; 2]) -> PointerOutcome {
        match std::mem::take(&mut self.drag) {
            DragState::Connection {
                origin_id,
                origin_slot,
                ..
            } => {
                let target = graph.nodes.iter().rev().find_map(|n| {
                    layout::hit_input_slot(n, world[0] - n.pos[0], world[1] - n.pos[1])
                        .map(|slot| (n.id, slot))
                });
                match target {
                    Some((target_id, slot)) => {
                        match graph.connect(origin_id, origin_slot, target_id, slot) {
                            Ok(_) => PointerOutcome::GraphEdited,
                            Err(e) => {
                                debug_log!("connect rejected: {}", e);
                                PointerOutcome::Redraw
                            }
                        }
                    }
                    None => PointerOutcome::Redraw,
                }
            }
            DragState::Node { moved: true, .. } => PointerOutcome::GraphEdited,
            DragState::Node { .. } | DragState::Pan { .. } => PointerOutcome::Redraw,
            DragState::Idle => PointerOutcome::Nothing,
        }
    }

    pub fn open_dialog(&mut self) {
        self.dialog_open = true;
        self.flags.latch_modal();
    }

    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
        self.flags.force_interactive();
    }
}

fn widget_action(
    graph: &Graph,
    registry: &NodeRegistry,
    node_id: NodeId,
    index: usize,
    zone: WidgetZone,
) -> PointerOutcome {
    let Some(node) = graph.node(node_id) else {
        return PointerOutcome::Nothing;
    };
    let Some(widget) = registry
        .get(&node.type_id)
        .and_then(|d| d.widgets.get(index))
    else {
        return PointerOutcome::Nothing;
    };
    let current = node
        .widgets_values
        .get(index)
        .cloned()
        .unwrap_or_else(|| widget.default.clone());

    let value = match (widget.kind, zone) {
        (WidgetKind::Number, WidgetZone::Decrement) => widget.step_value(&current, -1.0),
        (WidgetKind::Number, WidgetZone::Increment) => widget.step_value(&current, 1.0),
        (WidgetKind::Combo, WidgetZone::Decrement) => widget.cycle_value(&current, false),
        (WidgetKind::Combo, _) => widget.cycle_value(&current, true),
        (WidgetKind::Number, WidgetZone::Middle) | (WidgetKind::Text, _) => {
            return PointerOutcome::OpenPrompt {
                node_id,
                widget_index: index,
            };
        }
    };
    PointerOutcome::WidgetEdit {
        node_id,
        widget_index: index,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::layout::{compute_widget_layout, slot_anchor_y};
    use crate::constants::NODE_TITLE_HEIGHT;

    fn setup() -> (Graph, NodeRegistry) {
        let mut registry = NodeRegistry::new();
        registry.register_all();
        let mut graph = Graph::default();
        let latent = registry.instantiate("EmptyLatentImage", 0, [0.0, 0.0]).unwrap();
        let sampler = registry.instantiate("KSampler", 0, [400.0, 0.0]).unwrap();
        graph.add_node(latent).unwrap();
        graph.add_node(sampler).unwrap();
        (graph, registry)
    }

    fn widget_center(graph: &Graph, registry: &NodeRegistry, node_id: NodeId, index: usize, dx: f64) -> [f64; 2] {
        let node = graph.node(node_id).unwrap();
        let r = compute_widget_layout(node, &registry.get(&node.type_id).unwrap().widgets)[index];
        [node.pos[0] + r.x + r.w / 2.0 + dx, node.pos[1] + r.y + r.h / 2.0]
    }

    #[test]
    fn pointer_down_restores_latched_flags() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction::default();
        ix.flags = InteractionFlags {
            allow_interaction: false,
            read_only: true,
            block_click: true,
        };
        ix.pointer_down(&mut graph, &registry, [-500.0, -500.0], [0.0, 0.0]);
        assert!(ix.flags.is_interactive());
    }

    #[test]
    fn pointer_up_always_clears_drag() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction::default();
        ix.pointer_down(&mut graph, &registry, [10.0, -NODE_TITLE_HEIGHT / 2.0], [0.0, 0.0]);
        assert!(matches!(ix.drag, DragState::Node { .. }));
        ix.pointer_up(&mut graph, [0.0, 0.0]);
        assert_eq!(ix.drag, DragState::Idle);
    }

    #[test]
    fn dragging_from_output_to_input_links_nodes() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction::default();
        let latent = graph.node(1).unwrap().clone();
        let out = [latent.pos[0] + latent.size[0], slot_anchor_y(0)];
        ix.pointer_down(&mut graph, &registry, out, out);
        assert!(matches!(ix.drag, DragState::Connection { origin_id: 1, .. }));

        let target = [400.0, slot_anchor_y(3)];
        assert_eq!(ix.pointer_up(&mut graph, target), PointerOutcome::GraphEdited);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.node(2).unwrap().inputs[3].link, Some(graph.links[0].id));
        assert!(graph.link_is_compatible(&graph.links[0]));
    }

    #[test]
    fn grabbing_a_linked_input_detaches_it() {
        let (mut graph, registry) = setup();
        graph.connect(1, 0, 2, 3).unwrap();
        let mut ix = Interaction::default();
        let at = [400.0, slot_anchor_y(3)];
        assert_eq!(
            ix.pointer_down(&mut graph, &registry, at, at),
            PointerOutcome::GraphEdited
        );
        assert!(graph.links.is_empty());
        assert!(matches!(ix.drag, DragState::Connection { origin_id: 1, .. }));
        // Released on empty canvas: the link stays gone.
        ix.pointer_up(&mut graph, [1000.0, 1000.0]);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn number_arrows_step_and_middle_prompts() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction::default();
        let node_w = graph.node(1).unwrap().size[0];
        let half = (node_w - 2.0 * crate::constants::WIDGET_SIDE_MARGIN) / 2.0;

        let right = widget_center(&graph, &registry, 1, 0, half - 2.0);
        assert_eq!(
            ix.pointer_down(&mut graph, &registry, right, right),
            PointerOutcome::WidgetEdit {
                node_id: 1,
                widget_index: 0,
                value: WidgetValue::Number(576.0)
            }
        );
        let middle = widget_center(&graph, &registry, 1, 0, 0.0);
        assert_eq!(
            ix.pointer_down(&mut graph, &registry, middle, middle),
            PointerOutcome::OpenPrompt {
                node_id: 1,
                widget_index: 0
            }
        );
        assert_eq!(ix.selected, Some(1));
    }

    #[test]
    fn combo_middle_cycles_forward() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction::default();
        let at = widget_center(&graph, &registry, 2, 3, 0.0);
        assert_eq!(
            ix.pointer_down(&mut graph, &registry, at, at),
            PointerOutcome::WidgetEdit {
                node_id: 2,
                widget_index: 3,
                value: WidgetValue::from("euler_a")
            }
        );
    }

    #[test]
    fn empty_click_deselects_and_pans() {
        let (mut graph, registry) = setup();
        let mut ix = Interaction {
            selected: Some(1),
            ..Default::default()
        };
        ix.pointer_down(&mut graph, &registry, [-300.0, -300.0], [5.0, 5.0]);
        assert_eq!(ix.selected, None);
        let mut vp = Viewport::default();
        assert!(ix.pointer_move(&mut graph, &mut vp, [0.0, 0.0], [15.0, 25.0]));
        assert_eq!(vp.offset, [10.0, 20.0]);
    }

    #[test]
    fn dialog_close_restores_interaction() {
        let mut ix = Interaction::default();
        ix.open_dialog();
        assert!(!ix.flags.is_interactive());
        ix.close_dialog();
        assert!(ix.flags.is_interactive());
        assert!(!ix.dialog_open);
    }
}
