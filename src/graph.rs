//! The host graph, seen from this crate.
//!
//! The graph itself is an external collaborator. Runs read element text through
//! [`ElementSource`] and hand results back through [`GraphSink`]. [`InMemoryGraph`]
//! implements both and is what the tests and demo use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Identifier of a graph node or edge.
pub type ElementId = u32;

/// Identifier of a cluster.
pub type ClusterId = u32;

/// Which kind of graph element a run works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Graph nodes.
    #[default]
    Vertex,
    /// Graph edges.
    Transaction,
}

/// Read access to element text.
///
/// Implementations are shared across tokenizing workers, hence `Sync`.
pub trait ElementSource: Sync {
    /// Number of elements of `element_type`.
    fn element_count(&self, element_type: ElementType) -> usize;

    /// Element id at `position` (`0..element_count`).
    fn element_at(&self, element_type: ElementType, position: usize) -> ElementId;

    /// Whether `attribute` exists for `element_type`.
    fn has_attribute(&self, element_type: ElementType, attribute: &str) -> bool;

    /// The attribute's value for `element`, if set.
    fn string_value(&self, element_type: ElementType, attribute: &str, element: ElementId) -> Option<String>;

    /// Whether `element` is currently selected.
    fn is_selected(&self, element_type: ElementType, element: ElementId) -> bool;
}

/// A similarity edge to be materialized between two elements.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityEdge {
    /// Source element.
    pub source: ElementId,
    /// Destination element.
    pub destination: ElementId,
    /// Similarity score.
    pub similarity: f32,
    /// Top level edge type.
    pub edge_type: String,
    /// Type hierarchy, top level first.
    pub subtype: String,
    /// Display name.
    pub name: String,
    /// Display colour as `#rrggbb`.
    pub color: String,
}

/// Write access used by follow-up actions.
pub trait GraphSink {
    /// All elements of `element_type`.
    fn element_ids(&self, element_type: ElementType) -> Vec<ElementId>;

    /// Set the string-valued named-cluster attribute of `element`.
    fn set_cluster(&mut self, element_type: ElementType, element: ElementId, cluster: &str) -> Result<()>;

    /// Create a named selection containing `members`.
    fn create_named_selection(&mut self, name: &str, members: &[ElementId]) -> Result<()>;

    /// Add one undirected edge between two vertices.
    fn add_similarity_edge(&mut self, edge: SimilarityEdge) -> Result<()>;
}

/// A small graph held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    elements: HashMap<ElementType, Vec<ElementId>>,
    attributes: HashMap<(ElementType, String), HashMap<ElementId, String>>,
    selected: HashMap<ElementType, BTreeSet<ElementId>>,
    clusters: HashMap<ElementType, BTreeMap<ElementId, String>>,
    named_selections: Vec<(String, Vec<ElementId>)>,
    edges: Vec<SimilarityEdge>,
    mutations: usize,
}

impl InMemoryGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vertex-only graph whose vertices carry `attribute`.
    pub fn with_vertex_text<'a>(attribute: &str, vertices: impl IntoIterator<Item = (ElementId, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (id, text) in vertices {
            graph.add_element(ElementType::Vertex, id);
            graph.set_string(ElementType::Vertex, attribute, id, text);
        }
        graph
    }

    /// Add an element without any attribute values.
    pub fn add_element(&mut self, element_type: ElementType, id: ElementId) {
        let ids = self.elements.entry(element_type).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Set a string attribute, creating the attribute if needed.
    pub fn set_string(&mut self, element_type: ElementType, attribute: &str, id: ElementId, value: &str) {
        self.attributes
            .entry((element_type, attribute.to_string()))
            .or_default()
            .insert(id, value.to_string());
    }

    /// Declare an attribute with no values yet.
    pub fn add_attribute(&mut self, element_type: ElementType, attribute: &str) {
        self.attributes
            .entry((element_type, attribute.to_string()))
            .or_default();
    }

    /// Mark an element as selected.
    pub fn select(&mut self, element_type: ElementType, id: ElementId) {
        self.selected.entry(element_type).or_default().insert(id);
    }

    /// Named-cluster attribute values written so far.
    pub fn clusters(&self, element_type: ElementType) -> Option<&BTreeMap<ElementId, String>> {
        self.clusters.get(&element_type)
    }

    /// Named selections created so far.
    pub fn named_selections(&self) -> &[(String, Vec<ElementId>)] {
        &self.named_selections
    }

    /// Similarity edges added so far.
    pub fn edges(&self) -> &[SimilarityEdge] {
        &self.edges
    }

    /// Number of write operations performed through [`GraphSink`].
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    fn contains(&self, element_type: ElementType, id: ElementId) -> bool {
        self.elements
            .get(&element_type)
            .is_some_and(|ids| ids.contains(&id))
    }
}

impl ElementSource for InMemoryGraph {
    fn element_count(&self, element_type: ElementType) -> usize {
        self.elements.get(&element_type).map_or(0, Vec::len)
    }

    fn element_at(&self, element_type: ElementType, position: usize) -> ElementId {
        self.elements[&element_type][position]
    }

    fn has_attribute(&self, element_type: ElementType, attribute: &str) -> bool {
        self.attributes
            .contains_key(&(element_type, attribute.to_string()))
    }

    fn string_value(&self, element_type: ElementType, attribute: &str, element: ElementId) -> Option<String> {
        self.attributes
            .get(&(element_type, attribute.to_string()))
            .and_then(|values| values.get(&element))
            .cloned()
    }

    fn is_selected(&self, element_type: ElementType, element: ElementId) -> bool {
        self.selected
            .get(&element_type)
            .is_some_and(|ids| ids.contains(&element))
    }
}

impl GraphSink for InMemoryGraph {
    fn element_ids(&self, element_type: ElementType) -> Vec<ElementId> {
        self.elements.get(&element_type).cloned().unwrap_or_default()
    }

    fn set_cluster(&mut self, element_type: ElementType, element: ElementId, cluster: &str) -> Result<()> {
        if !self.contains(element_type, element) {
            return Err(Error::Other(format!("no {element_type:?} with id {element}")));
        }
        self.mutations += 1;
        self.clusters
            .entry(element_type)
            .or_default()
            .insert(element, cluster.to_string());
        Ok(())
    }

    fn create_named_selection(&mut self, name: &str, members: &[ElementId]) -> Result<()> {
        if self.named_selections.iter().any(|(existing, _)| existing == name) {
            return Err(Error::Other(format!("named selection {name:?} already exists")));
        }
        self.mutations += 1;
        self.named_selections.push((name.to_string(), members.to_vec()));
        Ok(())
    }

    fn add_similarity_edge(&mut self, edge: SimilarityEdge) -> Result<()> {
        for id in [edge.source, edge.destination] {
            if !self.contains(ElementType::Vertex, id) {
                return Err(Error::Other(format!("no vertex with id {id}")));
            }
        }
        self.mutations += 1;
        let id = self.edges.len() as ElementId;
        self.add_element(ElementType::Transaction, id);
        self.edges.push(edge);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_text_and_selection() {
        let mut g = InMemoryGraph::with_vertex_text("Label", [(4, "alpha"), (9, "beta")]);
        g.select(ElementType::Vertex, 9);

        assert_eq!(g.element_count(ElementType::Vertex), 2);
        assert_eq!(g.element_at(ElementType::Vertex, 1), 9);
        assert!(g.has_attribute(ElementType::Vertex, "Label"));
        assert!(!g.has_attribute(ElementType::Transaction, "Label"));
        assert_eq!(g.string_value(ElementType::Vertex, "Label", 4).as_deref(), Some("alpha"));
        assert!(g.is_selected(ElementType::Vertex, 9));
        assert!(!g.is_selected(ElementType::Vertex, 4));
    }

    #[test]
    fn writes_are_counted_and_checked() {
        let mut g = InMemoryGraph::with_vertex_text("Label", [(1, "a"), (2, "b")]);
        g.set_cluster(ElementType::Vertex, 1, "0").unwrap();
        assert!(g.set_cluster(ElementType::Vertex, 7, "0").is_err());
        g.create_named_selection("s", &[1, 2]).unwrap();
        assert!(g.create_named_selection("s", &[1]).is_err());
        assert_eq!(g.mutation_count(), 2);
    }
}
