//! Workflow graph model.
//!
//! The serialized layout is the LiteGraph-compatible JSON the gateway
//! accepts in `comfyui` format: nodes carry `widgets_values`, links are
//! positional arrays `[id, origin_id, origin_slot, target_id, target_slot,
//! type]`.  Fields we do not model are kept in `extra` maps so a
//! load/serialize cycle does not lose them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrontendError, Result};

pub type NodeId = u32;
pub type LinkId = u32;

/// Wildcard type tag accepted by every port.
pub const ANY_TYPE: &str = "*";

/// A widget value as stored in `widgets_values`.  Custom node packs also
/// write booleans, nulls and structured values; those pass through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    Other(Value),
}

impl WidgetValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WidgetValue::Number(n) => Some(*n),
            WidgetValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            WidgetValue::Number(n) => crate::utils::format_number(*n),
            WidgetValue::Text(s) => s.clone(),
            WidgetValue::Bool(b) => b.to_string(),
            WidgetValue::Null => String::new(),
            WidgetValue::Other(v) => v.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<f64> for WidgetValue {
    fn from(n: f64) -> Self {
        WidgetValue::Number(n)
    }
}

impl From<&str> for WidgetValue {
    fn from(s: &str) -> Self {
        WidgetValue::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub link: Option<LinkId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<LinkId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputSlot {
    pub fn new(name: &str, type_tag: &str) -> Self {
        Self {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            link: None,
            extra: Map::new(),
        }
    }
}

impl OutputSlot {
    pub fn new(name: &str, type_tag: &str) -> Self {
        Self {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            links: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Exported graphs may leave `null` holes where links were deleted.
fn skip_null_links<'de, D>(deserializer: D) -> std::result::Result<Vec<GraphLink>, D::Error>
where
    D: Deserializer<'de>,
{
    let links = Option::<Vec<Option<GraphLink>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(links.into_iter().flatten().collect())
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<LinkId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LinkId>>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_size() -> [f64; 2] {
    [crate::constants::NODE_MIN_WIDTH, 60.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pos: [f64; 2],
    #[serde(default = "default_size")]
    pub size: [f64; 2],
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub widgets_values: Vec<WidgetValue>,
    /// Custom vertical start of the widget area, in node-local units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets_start_y: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    /// True when `(x, y)` (world coordinates) falls inside the node body or
    /// its title bar.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let top = self.pos[1] - crate::constants::NODE_TITLE_HEIGHT;
        x >= self.pos[0]
            && x <= self.pos[0] + self.size[0]
            && y >= top
            && y <= self.pos[1] + self.size[1]
    }
}

/// Links serialize as positional arrays; this is the wire shape.
#[derive(Serialize, Deserialize)]
struct LinkTuple(LinkId, NodeId, usize, NodeId, usize, #[serde(default)] Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LinkTuple", into = "LinkTuple")]
pub struct GraphLink {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
    pub type_tag: String,
}

impl From<LinkTuple> for GraphLink {
    fn from(t: LinkTuple) -> Self {
        let type_tag = match t.5 {
            Value::String(s) => s,
            _ => ANY_TYPE.to_string(),
        };
        GraphLink {
            id: t.0,
            origin_id: t.1,
            origin_slot: t.2,
            target_id: t.3,
            target_slot: t.4,
            type_tag,
        }
    }
}

impl From<GraphLink> for LinkTuple {
    fn from(l: GraphLink) -> Self {
        LinkTuple(
            l.id,
            l.origin_id,
            l.origin_slot,
            l.target_id,
            l.target_slot,
            Value::String(l.type_tag),
        )
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_version() -> f64 {
    0.4
}

/// Port type compatibility.  Advisory only: incompatible links are still
/// created, the renderer just draws them in a warning color.
pub fn types_compatible(a: &str, b: &str) -> bool {
    a == ANY_TYPE || b == ANY_TYPE || a.eq_ignore_ascii_case(b)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub last_node_id: NodeId,
    #[serde(default)]
    pub last_link_id: LinkId,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, deserialize_with = "skip_null_links")]
    pub links: Vec<GraphLink>,
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default = "empty_object")]
    pub extra: Value,
    #[serde(default = "default_version")]
    pub version: f64,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            last_node_id: 0,
            last_link_id: 0,
            nodes: Vec::new(),
            links: Vec::new(),
            groups: Vec::new(),
            config: empty_object(),
            extra: empty_object(),
            version: default_version(),
        }
    }
}

impl Graph {
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut graph: Graph = serde_json::from_value(value.clone())?;
        // Older exports omit the counters; never hand out an id twice.
        let max_node = graph.nodes.iter().map(|n| n.id).max().unwrap_or(0);
        let max_link = graph.links.iter().map(|l| l.id).max().unwrap_or(0);
        graph.last_node_id = graph.last_node_id.max(max_node);
        graph.last_link_id = graph.last_link_id.max(max_link);
        Ok(graph)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| empty_object())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&GraphLink> {
        self.links.iter().find(|l| l.id == id)
    }

    /// Insert `node`, assigning it a fresh id.  Returns that id.
    pub fn add_node(&mut self, mut node: GraphNode) -> Result<NodeId> {
        let id = self
            .last_node_id
            .checked_add(1)
            .ok_or_else(|| FrontendError::Graph("node ids exhausted".into()))?;
        self.last_node_id = id;
        node.id = id;
        self.nodes.push(node);
        Ok(id)
    }

    /// Topmost node under the world point `(x, y)`; later nodes draw on top.
    pub fn node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        self.nodes.iter().rev().find(|n| n.contains(x, y)).map(|n| n.id)
    }

    /// Move a node to the end of the draw order.
    pub fn bring_to_front(&mut self, id: NodeId) {
        if let Some(idx) = self.nodes.iter().position(|n| n.id == id) {
            let node = self.nodes.remove(idx);
            self.nodes.push(node);
        }
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        let attached: Vec<LinkId> = self
            .links
            .iter()
            .filter(|l| l.origin_id == id || l.target_id == id)
            .map(|l| l.id)
            .collect();
        for link_id in attached {
            self.remove_link(link_id);
        }
        Some(self.nodes.remove(idx))
    }

    pub fn remove_link(&mut self, link_id: LinkId) -> Option<GraphLink> {
        let idx = self.links.iter().position(|l| l.id == link_id)?;
        let link = self.links.remove(idx);
        if let Some(origin) = self.node_mut(link.origin_id) {
            if let Some(slot) = origin.outputs.get_mut(link.origin_slot) {
                slot.links.retain(|l| *l != link_id);
            }
        }
        if let Some(target) = self.node_mut(link.target_id) {
            if let Some(slot) = target.inputs.get_mut(link.target_slot) {
                if slot.link == Some(link_id) {
                    slot.link = None;
                }
            }
        }
        Some(link)
    }

    /// Connect `origin.outputs[origin_slot]` to `target.inputs[target_slot]`.
    /// An input holds at most one link, so an existing one is replaced.
    pub fn connect(
        &mut self,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
    ) -> Result<LinkId> {
        if origin_id == target_id {
            return Err(FrontendError::Graph("cannot link a node to itself".into()));
        }
        let type_tag = self
            .node(origin_id)
            .and_then(|n| n.outputs.get(origin_slot))
            .map(|s| s.type_tag.clone())
            .ok_or_else(|| {
                FrontendError::Graph(format!("node {} has no output {}", origin_id, origin_slot))
            })?;
        let existing = self
            .node(target_id)
            .and_then(|n| n.inputs.get(target_slot))
            .ok_or_else(|| {
                FrontendError::Graph(format!("node {} has no input {}", target_id, target_slot))
            })?
            .link;
        let id = self
            .last_link_id
            .checked_add(1)
            .ok_or_else(|| FrontendError::Graph("link ids exhausted".into()))?;
        if let Some(old) = existing {
            self.remove_link(old);
        }

        self.last_link_id = id;
        self.links.push(GraphLink {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            type_tag,
        });
        if let Some(slot) = self
            .node_mut(origin_id)
            .and_then(|n| n.outputs.get_mut(origin_slot))
        {
            slot.links.push(id);
        }
        if let Some(slot) = self
            .node_mut(target_id)
            .and_then(|n| n.inputs.get_mut(target_slot))
        {
            slot.link = Some(id);
        }
        Ok(id)
    }

    /// Whether the link's source type matches its target port type.
    pub fn link_is_compatible(&self, link: &GraphLink) -> bool {
        match self
            .node(link.target_id)
            .and_then(|n| n.inputs.get(link.target_slot))
        {
            Some(input) => types_compatible(&link.type_tag, &input.type_tag),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "last_node_id": 2,
            "last_link_id": 1,
            "nodes": [
                {
                    "id": 1, "type": "EmptyLatentImage", "pos": [10, 20], "size": [220, 150],
                    "outputs": [{"name": "LATENT", "type": "LATENT", "links": [1]}],
                    "widgets_values": [512, 512, 1],
                    "mode": 0, "flags": {}
                },
                {
                    "id": 2, "type": "KSampler", "pos": [300, 20], "size": [320, 240],
                    "inputs": [{"name": "latent_image", "type": "LATENT", "link": 1}],
                    "outputs": [{"name": "LATENT", "type": "LATENT", "links": null}],
                    "widgets_values": [0, 20, 8, "euler", "normal", 1]
                }
            ],
            "links": [[1, 1, 0, 2, 0, "LATENT"]],
            "groups": [],
            "config": {},
            "extra": {"ds": {"scale": 1}},
            "version": 0.4
        })
    }

    #[test]
    fn load_and_serialize_preserves_links_and_unknown_fields() {
        let graph = Graph::from_json(&sample()).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links[0].type_tag, "LATENT");
        assert_eq!(graph.nodes[1].outputs[0].links, Vec::<LinkId>::new());

        let out = graph.to_json();
        assert_eq!(out["links"][0], json!([1, 1, 0, 2, 0, "LATENT"]));
        assert_eq!(out["nodes"][0]["mode"], json!(0));
        assert_eq!(out["extra"]["ds"]["scale"], json!(1));
        assert_eq!(out["nodes"][1]["widgets_values"][3], json!("euler"));
    }

    #[test]
    fn connect_replaces_existing_input_link() {
        let mut graph = Graph::from_json(&sample()).unwrap();
        let mut extra = graph.nodes[0].clone();
        extra.id = 0;
        extra.outputs[0].links.clear();
        let new_id = graph.add_node(extra).unwrap();
        assert_eq!(new_id, 3);

        let link = graph.connect(3, 0, 2, 0).unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.node(2).unwrap().inputs[0].link, Some(link));
        assert!(graph.node(1).unwrap().outputs[0].links.is_empty());
    }

    #[test]
    fn removing_a_node_drops_its_links() {
        let mut graph = Graph::from_json(&sample()).unwrap();
        graph.remove_node(1).unwrap();
        assert!(graph.links.is_empty());
        assert_eq!(graph.node(2).unwrap().inputs[0].link, None);
    }

    #[test]
    fn compatibility_is_advisory() {
        assert!(types_compatible("LATENT", "LATENT"));
        assert!(types_compatible("*", "IMAGE"));
        assert!(!types_compatible("IMAGE", "LATENT"));
    }

    #[test]
    fn counters_never_lag_behind_ids() {
        let graph = Graph::from_json(&json!({
            "nodes": [{"id": 7, "type": "VAEDecode"}],
            "links": []
        }))
        .unwrap();
        assert_eq!(graph.last_node_id, 7);
    }

    #[test]
    fn loose_widget_values_and_link_holes_survive_a_load() {
        let mut doc = sample();
        doc["nodes"][1]["widgets_values"] = json!([0, 20, 8, "euler", "normal", 1, null, true, {"k": 1}]);
        doc["links"] = json!([null, [1, 1, 0, 2, 0, "LATENT"], null]);
        let graph = Graph::from_json(&doc).unwrap();
        assert_eq!(graph.links.len(), 1);
        let values = &graph.nodes[1].widgets_values;
        assert_eq!(values[6], WidgetValue::Null);
        assert_eq!(values[7], WidgetValue::Bool(true));
        assert_eq!(values[8], WidgetValue::Other(json!({"k": 1})));
        assert_eq!(values[7].as_text(), "true");
        assert_eq!(values[6].as_f64(), None);

        let out = graph.to_json();
        assert_eq!(out["nodes"][1]["widgets_values"][6], Value::Null);
        assert_eq!(out["nodes"][1]["widgets_values"][7], json!(true));
        assert_eq!(out["nodes"][1]["widgets_values"][8], json!({"k": 1}));
        assert_eq!(out["links"], json!([[1, 1, 0, 2, 0, "LATENT"]]));
    }

    #[test]
    fn exhausted_ids_are_an_error_not_a_wrap() {
        let mut graph = Graph::from_json(&json!({
            "last_node_id": u32::MAX,
            "last_link_id": u32::MAX,
            "nodes": [
                {"id": 1, "type": "EmptyLatentImage", "outputs": [{"name": "LATENT", "type": "LATENT"}]},
                {"id": 2, "type": "KSampler", "inputs": [{"name": "latent_image", "type": "LATENT"}]}
            ]
        }))
        .unwrap();
        let node = graph.nodes[0].clone();
        assert!(matches!(graph.add_node(node), Err(FrontendError::Graph(_))));
        assert_eq!(graph.nodes.len(), 2);
        assert!(matches!(graph.connect(1, 0, 2, 0), Err(FrontendError::Graph(_))));
        assert!(graph.links.is_empty());
        assert_eq!(graph.last_node_id, u32::MAX);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert!(Graph::from_json(&json!({"nodes": "nope"})).is_err());
    }
}
