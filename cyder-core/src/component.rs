//! Components of the repository and the arena that holds them.
//!
//! Components form a containment hierarchy: waste forms sit in waste packages,
//! packages in buffers, buffers in the far field. The hierarchy is stored as a
//! directed graph whose edges run from parent to child, so every relation is
//! an index into the arena rather than a shared pointer.
//!
//! Instances are only ever made by copying a template with
//! [`ComponentTree::copy`], which gives the copy a fresh identity, its own
//! geometry and an empty nuclide model.

use crate::errors::{CyderError, CyderResult};
use crate::geometry::{Geometry, Point};
use crate::history::MassSnapshot;
use crate::material::{Material, MASS_EPS};
use crate::nuclide_model::{DaughterBoundary, NuclideModel};
use crate::types::{CompMap, FloatValue, Time};
use log::{debug, error, warn};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Handle of a component in a [`ComponentTree`]
pub type ComponentIndex = NodeIndex;

/// Identity of a component, unique for the lifetime of its tree
pub type ComponentId = u64;

// ============================================================================
// Type registries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    Buffer,
    Env,
    FarField,
    NearField,
    WasteForm,
    WastePackage,
}

const COMPONENT_TYPE_NAMES: [(ComponentType, &str); 6] = [
    (ComponentType::Buffer, "BUFFER"),
    (ComponentType::Env, "ENV"),
    (ComponentType::FarField, "FF"),
    (ComponentType::NearField, "NF"),
    (ComponentType::WasteForm, "WF"),
    (ComponentType::WastePackage, "WP"),
];

impl ComponentType {
    pub fn name(&self) -> &'static str {
        COMPONENT_TYPE_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }
}

impl FromStr for ComponentType {
    type Err = CyderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&COMPONENT_TYPE_NAMES, s, "component type")
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Heat transport model of a component
///
/// Heat transport is not modelled; the selection is carried so configurations
/// can name it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum ThermalModelType {
    Lumped,
    Stc,
    #[default]
    Stub,
}

const THERMAL_MODEL_NAMES: [(ThermalModelType, &str); 3] = [
    (ThermalModelType::Lumped, "LumpedThermal"),
    (ThermalModelType::Stc, "STCThermal"),
    (ThermalModelType::Stub, "StubThermal"),
];

impl ThermalModelType {
    pub fn name(&self) -> &'static str {
        THERMAL_MODEL_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("UnknownThermal")
    }
}

impl FromStr for ThermalModelType {
    type Err = CyderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&THERMAL_MODEL_NAMES, s, "thermal model")
    }
}

fn lookup<T: Copy>(table: &[(T, &str)], s: &str, what: &str) -> CyderResult<T> {
    table
        .iter()
        .find(|(_, name)| *name == s)
        .map(|(kind, _)| *kind)
        .ok_or_else(|| {
            let options: Vec<&str> = table.iter().map(|(_, n)| *n).collect();
            let msg = format!(
                "'{}' does not name a valid {}. Options are: {}",
                s,
                what,
                options.join(", ")
            );
            error!("{}", msg);
            CyderError::Configuration(msg)
        })
}

// ============================================================================
// Component
// ============================================================================

/// Scalar description of a component, shared by a template and its copies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentParameters {
    pub name: String,
    pub component_type: ComponentType,
    pub thermal_model: ThermalModelType,
    /// Maximum number of children. `None` never fills.
    pub capacity: Option<usize>,
    /// unit: K
    /// default: 373.0
    pub temperature_limit: FloatValue,
    /// default: 10.0
    pub toxicity_limit: FloatValue,
}

impl ComponentParameters {
    pub fn new(name: &str, component_type: ComponentType) -> Self {
        Self {
            name: name.to_string(),
            component_type,
            thermal_model: ThermalModelType::default(),
            capacity: None,
            temperature_limit: 373.0,
            toxicity_limit: 10.0,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    parameters: ComponentParameters,
    geometry: Geometry,
    nuclide_model: Box<dyn NuclideModel>,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.parameters.name
    }

    pub fn component_type(&self) -> ComponentType {
        self.parameters.component_type
    }

    pub fn parameters(&self) -> &ComponentParameters {
        &self.parameters
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn nuclide_model(&self) -> &dyn NuclideModel {
        self.nuclide_model.as_ref()
    }

    pub fn nuclide_model_mut(&mut self) -> &mut dyn NuclideModel {
        self.nuclide_model.as_mut()
    }

    pub fn centroid(&self) -> Point {
        self.geometry.centroid()
    }

    fn set_placement(&mut self, centroid: Point) {
        self.geometry.set_centroid(centroid);
        self.nuclide_model.set_geometry(self.geometry.clone());
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Hands out component identities
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: ComponentId,
}

impl IdGenerator {
    pub fn next_id(&mut self) -> ComponentId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Arena of components and their containment relations
#[derive(Debug, Default)]
pub struct ComponentTree {
    graph: StableDiGraph<Component, ()>,
    ids: IdGenerator,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root component
    ///
    /// The model's geometry is replaced by the component's.
    pub fn add(
        &mut self,
        parameters: ComponentParameters,
        geometry: Geometry,
        mut nuclide_model: Box<dyn NuclideModel>,
    ) -> ComponentIndex {
        nuclide_model.set_geometry(geometry.clone());
        let component = Component {
            id: self.ids.next_id(),
            parameters,
            geometry,
            nuclide_model,
        };
        debug!(
            "Added component {} '{}'",
            component.id, component.parameters.name
        );
        self.graph.add_node(component)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn get(&self, index: ComponentIndex) -> CyderResult<&Component> {
        self.graph
            .node_weight(index)
            .ok_or_else(|| missing_component(index))
    }

    pub fn get_mut(&mut self, index: ComponentIndex) -> CyderResult<&mut Component> {
        self.graph
            .node_weight_mut(index)
            .ok_or_else(|| missing_component(index))
    }

    /// Deep copy of `template` and all of its descendants
    ///
    /// Each copy gets a fresh identity and an empty nuclide model whose clock
    /// starts at `time`. The copy is a new root at the template's position.
    pub fn copy(&mut self, template: ComponentIndex, time: Time) -> CyderResult<ComponentIndex> {
        let source = self.get(template)?;
        let geometry = source.geometry.copy(source.geometry.centroid());
        let model = source.nuclide_model.fresh_copy(geometry.clone(), time);
        let parameters = source.parameters.clone();
        let copied = self.add(parameters, geometry, model);
        for child in self.children(template) {
            let child_copy = self.copy(child, time)?;
            self.load(copied, child_copy)?;
        }
        Ok(copied)
    }

    /// Make `child` a child of `parent`
    ///
    /// A component can only have one parent.
    pub fn load(&mut self, parent: ComponentIndex, child: ComponentIndex) -> CyderResult<()> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child {
            return Err(CyderError::Configuration(
                "A component cannot contain itself".to_string(),
            ));
        }
        if let Some(existing) = self.parent(child) {
            let msg = format!(
                "Component {} already belongs to component {}",
                self.get(child)?.id,
                self.get(existing)?.id
            );
            error!("{}", msg);
            return Err(CyderError::Configuration(msg));
        }
        self.graph.add_edge(parent, child, ());
        Ok(())
    }

    pub fn parent(&self, index: ComponentIndex) -> Option<ComponentIndex> {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
    }

    /// Children in the order they were loaded
    pub fn children(&self, index: ComponentIndex) -> Vec<ComponentIndex> {
        let mut children: Vec<ComponentIndex> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        children.sort_by_key(|c| self.graph.node_weight(*c).map(|n| n.id));
        children
    }

    /// True once the number of children reaches the component's capacity
    pub fn is_full(&self, index: ComponentIndex) -> CyderResult<bool> {
        let component = self.get(index)?;
        Ok(match component.parameters.capacity {
            Some(capacity) => self.children(index).len() >= capacity,
            None => false,
        })
    }

    pub fn set_placement(&mut self, index: ComponentIndex, centroid: Point) -> CyderResult<()> {
        self.get_mut(index)?.set_placement(centroid);
        Ok(())
    }

    pub fn absorb(&mut self, index: ComponentIndex, material: Material) -> CyderResult<()> {
        self.get_mut(index)?.nuclide_model.absorb(material);
        Ok(())
    }

    pub fn extract(
        &mut self,
        index: ComponentIndex,
        composition: &CompMap,
        mass: FloatValue,
    ) -> CyderResult<Material> {
        self.get_mut(index)?.nuclide_model.extract(composition, mass)
    }

    /// Remove a component and everything it contains
    pub fn remove(&mut self, index: ComponentIndex) -> CyderResult<()> {
        self.get(index)?;
        let mut dfs = DfsPostOrder::new(&self.graph, index);
        let mut doomed = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            doomed.push(node);
        }
        for node in doomed {
            self.graph.remove_node(node);
        }
        Ok(())
    }

    /// Couple a component to its children, then advance its model to `time`
    ///
    /// Children must already have been transported for this step. The uptake
    /// from each child is capped at what the child contains.
    pub fn transport(&mut self, index: ComponentIndex, time: Time) -> CyderResult<()> {
        let children = self.children(index);
        let mut boundaries = Vec::with_capacity(children.len());
        for child in &children {
            let model = self.get(*child)?.nuclide_model();
            boundaries.push(DaughterBoundary {
                source_term: model.source_term()?,
                dirichlet: model.dirichlet(time)?,
                free_fluid_volume: model.free_fluid_volume()?,
            });
        }
        let uptakes = self
            .get(index)?
            .nuclide_model()
            .update_inner_bc(time, &boundaries)?;

        for (child, uptake) in children.into_iter().zip(uptakes) {
            if uptake.mass() <= MASS_EPS {
                continue;
            }
            let contained = self.get(child)?.nuclide_model().contained();
            let capped = cap_to_contents(&uptake, &contained)?;
            if capped.mass() + MASS_EPS < uptake.mass() {
                warn!(
                    "Uptake of {} kg from component {} capped at {} kg",
                    uptake.mass(),
                    self.get(child)?.id,
                    capped.mass()
                );
            }
            if capped.mass() <= MASS_EPS {
                continue;
            }
            let moved = self
                .get_mut(child)?
                .nuclide_model
                .extract(&capped.composition(), capped.mass())?;
            debug!(
                "Component {} takes {} kg from component {} at t={}",
                self.get(index)?.id,
                moved.mass(),
                self.get(child)?.id,
                time
            );
            self.get_mut(index)?.nuclide_model.absorb(moved);
        }
        self.get_mut(index)?.nuclide_model.transport(time)
    }

    /// Transport every component below and including `root`, innermost first
    pub fn transport_subtree(&mut self, root: ComponentIndex, time: Time) -> CyderResult<()> {
        self.get(root)?;
        let mut order = Vec::new();
        let mut dfs = DfsPostOrder::new(&self.graph, root);
        while let Some(node) = dfs.next(&self.graph) {
            order.push(node);
        }
        for node in order {
            self.transport(node, time)?;
        }
        Ok(())
    }
}

fn missing_component(index: ComponentIndex) -> CyderError {
    CyderError::Configuration(format!("No component at index {}", index.index()))
}

fn cap_to_contents(uptake: &Material, contained: &MassSnapshot) -> CyderResult<Material> {
    let capped: BTreeMap<_, _> = uptake
        .masses()
        .iter()
        .map(|(iso, want)| {
            let held = contained.composition.get(iso).copied().unwrap_or(0.0) * contained.mass;
            (*iso, want.min(held).max(0.0))
        })
        .filter(|(_, m)| *m > 0.0)
        .collect();
    Material::from_masses(capped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MassSnapshot;
    use crate::nuclide_model::{NuclideModelType, NuclidePool};
    use crate::types::{IsoConcMap, Radius};
    use approx::assert_relative_eq;

    /// Releases everything it holds
    #[derive(Debug, Clone)]
    struct PassThrough {
        geometry: Geometry,
        pool: NuclidePool,
    }

    impl PassThrough {
        fn boxed() -> Box<dyn NuclideModel> {
            Box::new(Self {
                geometry: Geometry::new(0.0, 1.0, Point::default(), 1.0).unwrap(),
                pool: NuclidePool::default(),
            })
        }
    }

    impl NuclideModel for PassThrough {
        fn model_type(&self) -> NuclideModelType {
            NuclideModelType::Stub
        }
        fn geometry(&self) -> &Geometry {
            &self.geometry
        }
        fn set_geometry(&mut self, geometry: Geometry) {
            self.geometry = geometry;
        }
        fn pool(&self) -> &NuclidePool {
            &self.pool
        }
        fn pool_mut(&mut self) -> &mut NuclidePool {
            &mut self.pool
        }
        fn transport(&mut self, time: Time) -> CyderResult<()> {
            self.pool.record(time, IsoConcMap::new())
        }
        fn source_term(&self) -> CyderResult<MassSnapshot> {
            Ok(self.pool.contained())
        }
        fn dirichlet(&self, _time: Time) -> CyderResult<IsoConcMap> {
            Ok(IsoConcMap::new())
        }
        fn neumann(&self, _: &IsoConcMap, _: Radius, _: Time) -> CyderResult<IsoConcMap> {
            Ok(IsoConcMap::new())
        }
        fn cauchy(&self, _: &IsoConcMap, _: Radius, _: Time) -> CyderResult<IsoConcMap> {
            Ok(IsoConcMap::new())
        }
        fn free_fluid_volume(&self) -> CyderResult<FloatValue> {
            Ok(1.0)
        }
        fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel> {
            Box::new(Self {
                geometry,
                pool: NuclidePool::starting_at(time),
            })
        }
    }

    fn geometry() -> Geometry {
        Geometry::new(0.0, 1.0, Point::new(1.0, 1.0, 1.0), 2.0).unwrap()
    }

    fn u235(mass: FloatValue) -> Material {
        Material::from_composition(&CompMap::from([(92235, 1.0)]), mass).unwrap()
    }

    #[test]
    fn type_names_round_trip() {
        for (kind, name) in COMPONENT_TYPE_NAMES {
            assert_eq!(name.parse::<ComponentType>().unwrap(), kind);
            assert_eq!(kind.to_string(), name);
        }
        assert_eq!(
            "STCThermal".parse::<ThermalModelType>().unwrap(),
            ThermalModelType::Stc
        );
        assert_eq!(ThermalModelType::default().name(), "StubThermal");
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        assert!(matches!(
            "BARRIER".parse::<ComponentType>(),
            Err(CyderError::Configuration(_))
        ));
        assert!(matches!(
            "HotThermal".parse::<ThermalModelType>(),
            Err(CyderError::Configuration(_))
        ));
    }

    #[test]
    fn load_sets_parent() {
        let mut tree = ComponentTree::new();
        let wp = tree.add(
            ComponentParameters::new("wp", ComponentType::WastePackage),
            geometry(),
            PassThrough::boxed(),
        );
        let wf = tree.add(
            ComponentParameters::new("wf", ComponentType::WasteForm),
            geometry(),
            PassThrough::boxed(),
        );
        tree.load(wp, wf).unwrap();
        assert_eq!(tree.parent(wf), Some(wp));
        assert_eq!(tree.children(wp), vec![wf]);
        assert_eq!(tree.parent(wp), None);
    }

    #[test]
    fn a_child_has_one_parent() {
        let mut tree = ComponentTree::new();
        let params = ComponentParameters::new("c", ComponentType::Buffer);
        let a = tree.add(params.clone(), geometry(), PassThrough::boxed());
        let b = tree.add(params.clone(), geometry(), PassThrough::boxed());
        let c = tree.add(params, geometry(), PassThrough::boxed());
        tree.load(a, c).unwrap();
        assert!(matches!(tree.load(b, c), Err(CyderError::Configuration(_))));
        assert!(matches!(tree.load(a, a), Err(CyderError::Configuration(_))));
    }

    #[test]
    fn capacity_decides_fullness() {
        let mut tree = ComponentTree::new();
        let wp = tree.add(
            ComponentParameters::new("wp", ComponentType::WastePackage).with_capacity(2),
            geometry(),
            PassThrough::boxed(),
        );
        let unbounded = tree.add(
            ComponentParameters::new("ff", ComponentType::FarField),
            geometry(),
            PassThrough::boxed(),
        );
        for _ in 0..2 {
            assert!(!tree.is_full(wp).unwrap());
            let wf = tree.add(
                ComponentParameters::new("wf", ComponentType::WasteForm),
                geometry(),
                PassThrough::boxed(),
            );
            tree.load(wp, wf).unwrap();
        }
        assert!(tree.is_full(wp).unwrap());
        assert!(!tree.is_full(unbounded).unwrap());
    }

    #[test]
    fn copy_is_deep_and_fresh() {
        let mut tree = ComponentTree::new();
        let wp = tree.add(
            ComponentParameters::new("wp", ComponentType::WastePackage),
            geometry(),
            PassThrough::boxed(),
        );
        let wf = tree.add(
            ComponentParameters::new("wf", ComponentType::WasteForm),
            geometry(),
            PassThrough::boxed(),
        );
        tree.load(wp, wf).unwrap();
        tree.absorb(wf, u235(3.0)).unwrap();

        let copy = tree.copy(wp, 4).unwrap();
        let copied = tree.get(copy).unwrap();
        assert_ne!(copied.id(), tree.get(wp).unwrap().id());
        assert_eq!(copied.name(), "wp");
        assert_eq!(copied.geometry(), tree.get(wp).unwrap().geometry());

        let copied_children = tree.children(copy);
        assert_eq!(copied_children.len(), 1);
        let child = tree.get(copied_children[0]).unwrap();
        assert_eq!(child.name(), "wf");
        assert_eq!(child.nuclide_model().contained_mass(), 0.0);
        assert_eq!(child.nuclide_model().pool().last_updated(), 4);
        assert_eq!(tree.parent(copied_children[0]), Some(copy));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn placement_moves_model_geometry() {
        let mut tree = ComponentTree::new();
        let ff = tree.add(
            ComponentParameters::new("ff", ComponentType::FarField),
            geometry(),
            PassThrough::boxed(),
        );
        tree.set_placement(ff, Point::new(5.0, 6.0, 7.0)).unwrap();
        let component = tree.get(ff).unwrap();
        assert_eq!(component.centroid(), Point::new(5.0, 6.0, 7.0));
        assert_eq!(
            component.nuclide_model().geometry().centroid(),
            Point::new(5.0, 6.0, 7.0)
        );
    }

    #[test]
    fn transport_moves_mass_outward_and_conserves_it() {
        let mut tree = ComponentTree::new();
        let outer = tree.add(
            ComponentParameters::new("wp", ComponentType::WastePackage),
            geometry(),
            PassThrough::boxed(),
        );
        let inner = tree.add(
            ComponentParameters::new("wf", ComponentType::WasteForm),
            geometry(),
            PassThrough::boxed(),
        );
        tree.load(outer, inner).unwrap();
        tree.absorb(inner, u235(5.0)).unwrap();

        tree.transport_subtree(outer, 1).unwrap();
        let inner_mass = tree.get(inner).unwrap().nuclide_model().contained_mass();
        let outer_mass = tree.get(outer).unwrap().nuclide_model().contained_mass();
        assert_relative_eq!(inner_mass, 0.0);
        assert_relative_eq!(outer_mass, 5.0);
        assert_relative_eq!(
            tree.get(inner)
                .unwrap()
                .nuclide_model()
                .vector_history()
                .mass_at(1),
            5.0
        );
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = ComponentTree::new();
        let wp = tree.add(
            ComponentParameters::new("wp", ComponentType::WastePackage),
            geometry(),
            PassThrough::boxed(),
        );
        let wf = tree.add(
            ComponentParameters::new("wf", ComponentType::WasteForm),
            geometry(),
            PassThrough::boxed(),
        );
        tree.load(wp, wf).unwrap();
        tree.remove(wp).unwrap();
        assert!(tree.is_empty());
        assert!(tree.get(wf).is_err());
    }

    #[test]
    fn extract_beyond_contents_fails() {
        let mut tree = ComponentTree::new();
        let wf = tree.add(
            ComponentParameters::new("wf", ComponentType::WasteForm),
            geometry(),
            PassThrough::boxed(),
        );
        tree.absorb(wf, u235(1.0)).unwrap();
        assert!(matches!(
            tree.extract(wf, &CompMap::from([(92235, 1.0)]), 2.0),
            Err(CyderError::InsufficientMass { .. })
        ));
    }
}
