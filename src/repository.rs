//! Waste emplacement and per-step transport of a generic repository.
//!
//! Material arrives as stocks, one stream per batch. Each step the repository
//! moves it through the containment stages
//!
//! 1. **Conditioned**: the stream is absorbed into a copy of the waste form
//!    template registered for its commodity
//! 2. **Packaged**: the waste form is loaded into a waste package copied from
//!    the template registered for that waste form, reusing a package of the
//!    same kind that is not yet full
//! 3. **Emplaced**: a full package is loaded into the active buffer. A full
//!    buffer is replaced by a new one while the footprint allows; after that
//!    the repository is full and stops emplacing
//!
//! and then transports nuclides outward, waste forms first and the far field
//! last.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::config::RepositoryConfig;
use cyder_core::component::{ComponentIndex, ComponentTree, ComponentType};
use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Point;
use cyder_core::material::Material;
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, Time};
use log::{debug, error, info};

/// Material waiting to be conditioned, tagged with its commodity
#[derive(Debug, Clone, PartialEq)]
pub struct WasteStream {
    pub material: Material,
    pub commodity: String,
}

/// Request for material of one commodity
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub commodity: String,
    /// unit: kg
    pub amount: FloatValue,
}

#[derive(Debug)]
pub struct Repository {
    config: RepositoryConfig,
    tree: ComponentTree,
    far_field: ComponentIndex,
    buffer_template: ComponentIndex,
    /// Waste form template by commodity
    wf_templates: BTreeMap<String, ComponentIndex>,
    /// Waste package template by waste form name
    wp_templates: BTreeMap<String, ComponentIndex>,
    in_commods: VecDeque<String>,
    stocks: VecDeque<WasteStream>,
    inventory: VecDeque<WasteStream>,
    waste_forms: Vec<ComponentIndex>,
    /// Packages still being filled
    current_packages: Vec<ComponentIndex>,
    /// Packages loaded into a buffer
    waste_packages: Vec<ComponentIndex>,
    buffers: Vec<ComponentIndex>,
    is_full: bool,
}

impl Repository {
    /// Register the component templates and lay out the far field and first buffer
    ///
    /// Exactly one `BUFFER` and one `FF` template are needed. `WF` templates are
    /// registered for each of their allowed commodities and `WP` templates for
    /// each allowed waste form, which must already be declared.
    pub fn from_config(
        config: RepositoryConfig,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Self> {
        let mut tree = ComponentTree::new();
        let mut buffer_template = None;
        let mut far_field_template = None;
        let mut wf_templates = BTreeMap::new();
        let mut wf_names = Vec::new();
        let mut wp_templates = BTreeMap::new();

        for component in &config.components {
            let kind = component.component_type()?;
            let model =
                component.build_nuclide_model(config.advective_velocity, Arc::clone(&properties))?;
            let index = tree.add(component.parameters()?, component.geometry()?, model);
            match kind {
                ComponentType::Buffer => set_once(&mut buffer_template, index, kind)?,
                ComponentType::FarField => set_once(&mut far_field_template, index, kind)?,
                ComponentType::WasteForm => {
                    for commod in &component.allowed_commods {
                        wf_templates.insert(commod.clone(), index);
                    }
                    wf_names.push(component.name.clone());
                }
                ComponentType::WastePackage => {
                    for waste in &component.allowed_wastes {
                        if !wf_names.contains(waste) {
                            return Err(configuration_error(format!(
                                "Waste package '{}' allows '{}', which is not a declared waste form",
                                component.name, waste
                            )));
                        }
                        wp_templates.insert(waste.clone(), index);
                    }
                }
                ComponentType::NearField | ComponentType::Env => {
                    return Err(configuration_error(format!(
                        "Component '{}' has type {}, which is not a template role",
                        component.name, kind
                    )));
                }
            }
        }

        let buffer_template = buffer_template
            .ok_or_else(|| configuration_error("No BUFFER template is defined".to_string()))?;
        let far_field_template = far_field_template
            .ok_or_else(|| configuration_error("No FF template is defined".to_string()))?;

        info!(
            "Repository starting operation in {}-{:02} for {} steps",
            config.start_operation_year, config.start_operation_month, config.lifetime
        );
        let far_field = tree.copy(far_field_template, 0)?;
        let in_commods = config.in_commods.iter().cloned().collect();
        let mut repository = Self {
            config,
            tree,
            far_field,
            buffer_template,
            wf_templates,
            wp_templates,
            in_commods,
            stocks: VecDeque::new(),
            inventory: VecDeque::new(),
            waste_forms: Vec::new(),
            current_packages: Vec::new(),
            waste_packages: Vec::new(),
            buffers: Vec::new(),
            is_full: false,
        };
        repository.add_buffer(0)?;
        Ok(repository)
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn far_field(&self) -> ComponentIndex {
        self.far_field
    }

    pub fn buffers(&self) -> &[ComponentIndex] {
        &self.buffers
    }

    /// Packages loaded into a buffer
    pub fn waste_packages(&self) -> &[ComponentIndex] {
        &self.waste_packages
    }

    /// Packages not yet emplaced
    pub fn current_packages(&self) -> &[ComponentIndex] {
        &self.current_packages
    }

    pub fn waste_forms(&self) -> &[ComponentIndex] {
        &self.waste_forms
    }

    pub fn stocks(&self) -> &VecDeque<WasteStream> {
        &self.stocks
    }

    pub fn inventory(&self) -> &VecDeque<WasteStream> {
        &self.inventory
    }

    /// True once no more buffers fit in the footprint
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// Accept a batch of material into stocks
    pub fn add_resource(&mut self, material: Material, commodity: &str) {
        debug!(
            "Repository received {} kg of {}",
            material.mass(),
            commodity
        );
        self.stocks.push_front(WasteStream {
            material,
            commodity: commodity.to_string(),
        });
    }

    /// Mass of conditioned material
    /// unit: kg
    pub fn check_inventory(&self) -> FloatValue {
        self.inventory.iter().map(|s| s.material.mass()).sum()
    }

    /// Mass waiting to be conditioned
    /// unit: kg
    pub fn check_stocks(&self) -> FloatValue {
        self.stocks.iter().map(|s| s.material.mass()).sum()
    }

    /// Mass of `commodity` that can be accepted this step
    ///
    /// $$ \max(0, \min(capacity, inventory_{max} - inventory - stocks)) $$
    ///
    /// Zero for a full repository or a commodity that is not requested.
    pub fn get_capacity(&self, commodity: &str) -> FloatValue {
        if self.is_full || !self.in_commods.iter().any(|c| c == commodity) {
            return 0.0;
        }
        let space = self.config.inventory_size - self.check_inventory() - self.check_stocks();
        self.config.capacity.min(space).max(0.0)
    }

    /// Request the next commodity in rotation
    pub fn make_request(&mut self) -> Option<Request> {
        let commodity = self.in_commods.pop_front()?;
        self.in_commods.push_back(commodity.clone());
        let amount = self.get_capacity(&commodity);
        if amount <= 0.0 {
            return None;
        }
        debug!("Repository requests {} kg of {}", amount, commodity);
        Some(Request { commodity, amount })
    }

    /// Start of a step: place the far field on the first step, then request material
    ///
    /// No material is requested once the lifetime has passed.
    pub fn handle_tick(&mut self, time: Time) -> CyderResult<Option<Request>> {
        if time == 0 {
            self.set_placement(self.far_field)?;
        }
        if time >= self.config.lifetime {
            return Ok(None);
        }
        Ok(self.make_request())
    }

    /// End of a step: emplace what arrived, then transport nuclides
    pub fn handle_tock(&mut self, time: Time) -> CyderResult<()> {
        self.emplace_waste(time)?;
        self.transport_nuclides(time)
    }

    /// Condition, package and emplace stocks, oldest first
    ///
    /// A stream with no waste form template, or whose waste form has no
    /// package template, stays in stocks.
    pub fn emplace_waste(&mut self, time: Time) -> CyderResult<()> {
        while !self.is_full {
            let Some(stream) = self.stocks.back() else {
                break;
            };
            let template = self.waste_form_template(&stream.commodity)?;
            let package_template = self.package_template(template)?;
            let Some(stream) = self.stocks.pop_back() else {
                break;
            };
            let waste_form = self.condition(template, &stream, time)?;
            self.inventory.push_back(stream);

            let package = self.package(waste_form, package_template, time)?;
            if self.tree.is_full(package)? {
                self.emplace(package, time)?;
            }
        }
        if self.is_full && !self.stocks.is_empty() {
            info!(
                "Repository is full, {} kg stays in stock",
                self.check_stocks()
            );
        }
        Ok(())
    }

    /// Advance every component to `time`, innermost first
    pub fn transport_nuclides(&mut self, time: Time) -> CyderResult<()> {
        let order: Vec<ComponentIndex> = self
            .waste_forms
            .iter()
            .chain(&self.current_packages)
            .chain(&self.waste_packages)
            .chain(&self.buffers)
            .chain(std::iter::once(&self.far_field))
            .copied()
            .collect();
        for index in order {
            self.tree.transport(index, time)?;
        }
        debug!("Transported {} components at t={}", self.tree.len(), time);
        Ok(())
    }

    /// Position a component according to its type and return the new centroid
    pub fn set_placement(&mut self, index: ComponentIndex) -> CyderResult<Point> {
        let config = &self.config;
        let component = self.tree.get(index)?;
        let centroid = match component.component_type() {
            ComponentType::FarField => Point::new(config.x / 2.0, config.y / 2.0, config.z / 2.0),
            ComponentType::Buffer => Point::new(
                (self.buffers.len() as FloatValue - 0.5) * config.dx,
                config.y / 2.0,
                config.dz,
            ),
            ComponentType::WastePackage => {
                let parent = self.placed_parent(index)?;
                let n_emplaced = self.tree.children(parent).len() as FloatValue;
                Point::new(
                    self.tree.get(parent)?.centroid().x,
                    n_emplaced * config.dy - config.dy / 2.0,
                    config.dz,
                )
            }
            ComponentType::WasteForm => {
                let parent = self.placed_parent(index)?;
                self.tree.get(parent)?.centroid()
            }
            kind => {
                return Err(configuration_error(format!(
                    "Components of type {} have no placement rule",
                    kind
                )));
            }
        };
        self.tree.set_placement(index, centroid)?;
        Ok(centroid)
    }

    fn placed_parent(&self, index: ComponentIndex) -> CyderResult<ComponentIndex> {
        self.tree.parent(index).ok_or_else(|| {
            configuration_error(format!(
                "Component at index {} must be loaded before it is placed",
                index.index()
            ))
        })
    }

    fn waste_form_template(&self, commodity: &str) -> CyderResult<ComponentIndex> {
        self.wf_templates.get(commodity).copied().ok_or_else(|| {
            configuration_error(format!(
                "No waste form template conditions commodity '{}'",
                commodity
            ))
        })
    }

    /// Package template registered for the waste form copied from `waste_form_template`
    fn package_template(&self, waste_form_template: ComponentIndex) -> CyderResult<ComponentIndex> {
        let wf_name = self.tree.get(waste_form_template)?.name();
        self.wp_templates.get(wf_name).copied().ok_or_else(|| {
            configuration_error(format!(
                "No waste package template holds waste form '{}'",
                wf_name
            ))
        })
    }

    fn condition(
        &mut self,
        template: ComponentIndex,
        stream: &WasteStream,
        time: Time,
    ) -> CyderResult<ComponentIndex> {
        let waste_form = self.tree.copy(template, time)?;
        self.tree.absorb(waste_form, stream.material.clone())?;
        self.waste_forms.push(waste_form);
        info!(
            "Conditioned {} kg of {} into '{}'",
            stream.material.mass(),
            stream.commodity,
            self.tree.get(waste_form)?.name()
        );
        Ok(waste_form)
    }

    /// Load a waste form into a package of the kind registered for it
    fn package(
        &mut self,
        waste_form: ComponentIndex,
        template: ComponentIndex,
        time: Time,
    ) -> CyderResult<ComponentIndex> {
        let wf_name = self.tree.get(waste_form)?.name().to_string();
        let wp_name = self.tree.get(template)?.name().to_string();

        let mut open = None;
        for candidate in &self.current_packages {
            if self.tree.get(*candidate)?.name() == wp_name && !self.tree.is_full(*candidate)? {
                open = Some(*candidate);
                break;
            }
        }
        let package = match open {
            Some(package) => package,
            None => {
                let package = self.tree.copy(template, time)?;
                self.current_packages.push(package);
                package
            }
        };
        self.tree.load(package, waste_form)?;
        info!("Packaged '{}' into '{}'", wf_name, wp_name);
        Ok(package)
    }

    /// Load a full package into the active buffer, rotating buffers as needed
    fn emplace(&mut self, package: ComponentIndex, time: Time) -> CyderResult<()> {
        let mut buffer = self.active_buffer()?;
        if self.tree.is_full(buffer)? {
            if !self.rotate_buffer(time)? {
                return Ok(());
            }
            buffer = self.active_buffer()?;
        }
        self.tree.load(buffer, package)?;
        self.set_placement(package)?;
        for waste_form in self.tree.children(package) {
            self.set_placement(waste_form)?;
        }
        self.current_packages.retain(|p| *p != package);
        self.waste_packages.push(package);
        info!(
            "Emplaced package {} in buffer {}",
            self.tree.get(package)?.id(),
            self.tree.get(buffer)?.id()
        );
        Ok(())
    }

    fn active_buffer(&self) -> CyderResult<ComponentIndex> {
        self.buffers
            .last()
            .copied()
            .ok_or_else(|| configuration_error("The repository has no buffer".to_string()))
    }

    /// Start a new buffer if one fits, otherwise mark the repository full
    fn rotate_buffer(&mut self, time: Time) -> CyderResult<bool> {
        let n_buffers = self.buffers.len() as FloatValue;
        if (n_buffers + 1.0) * self.config.dx <= self.config.x {
            self.add_buffer(time)?;
            info!("Rotated to buffer {}", self.buffers.len());
            Ok(true)
        } else {
            self.is_full = true;
            info!(
                "Repository is full with {} buffers",
                self.buffers.len()
            );
            Ok(false)
        }
    }

    fn add_buffer(&mut self, time: Time) -> CyderResult<()> {
        let buffer = self.tree.copy(self.buffer_template, time)?;
        self.tree.load(self.far_field, buffer)?;
        self.buffers.push(buffer);
        self.set_placement(buffer)?;
        Ok(())
    }
}

fn set_once(
    slot: &mut Option<ComponentIndex>,
    index: ComponentIndex,
    kind: ComponentType,
) -> CyderResult<()> {
    if slot.is_some() {
        return Err(configuration_error(format!(
            "Only one {} template may be defined",
            kind
        )));
    }
    *slot = Some(index);
    Ok(())
}

fn configuration_error(msg: String) -> CyderError {
    error!("{}", msg);
    CyderError::Configuration(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentConfig, NuclideModelConfig};
    use cyder_core::properties::MaterialTable;
    use cyder_core::types::CompMap;

    fn component(name: &str, kind: &str, capacity: Option<usize>) -> ComponentConfig {
        ComponentConfig {
            name: name.to_string(),
            component_type: kind.to_string(),
            inner_radius: 0.0,
            outer_radius: if kind == "FF" { FloatValue::INFINITY } else { 1.0 },
            length: 1.0,
            capacity,
            temperature_limit: 373.0,
            toxicity_limit: 10.0,
            thermal_model: "StubThermal".to_string(),
            nuclide_model: NuclideModelConfig {
                model: "StubNuclide".to_string(),
                parameters: toml::Table::new(),
            },
            allowed_commods: vec![],
            allowed_wastes: vec![],
        }
    }

    fn config() -> RepositoryConfig {
        let mut wf = component("glass", "WF", None);
        wf.allowed_commods = vec!["spent_fuel".to_string()];
        let mut wp = component("canister", "WP", Some(1));
        wp.allowed_wastes = vec!["glass".to_string()];
        RepositoryConfig {
            x: 20.0,
            y: 20.0,
            z: 20.0,
            dx: 10.0,
            dy: 2.0,
            dz: 5.0,
            advective_velocity: 0.0,
            capacity: 100.0,
            inventory_size: 70000.0,
            lifetime: 10,
            start_operation_year: 2030,
            start_operation_month: 1,
            in_commods: vec!["spent_fuel".to_string()],
            components: vec![
                wf,
                wp,
                component("bentonite", "BUFFER", Some(1)),
                component("granite", "FF", None),
            ],
        }
    }

    fn repository(config: RepositoryConfig) -> CyderResult<Repository> {
        Repository::from_config(config, Arc::new(MaterialTable::new()))
    }

    fn fuel(mass: FloatValue) -> Material {
        Material::from_composition(&CompMap::from([(92235, 0.05), (92238, 0.95)]), mass).unwrap()
    }

    #[test]
    fn capacity_is_the_monthly_throughput() {
        let repository = repository(config()).unwrap();
        assert_eq!(repository.check_inventory(), 0.0);
        assert_eq!(repository.check_stocks(), 0.0);
        assert_eq!(repository.get_capacity("spent_fuel"), 100.0);
        assert_eq!(repository.get_capacity("plutonium"), 0.0);
    }

    #[test]
    fn no_capacity_when_inventory_is_at_its_limit() {
        let mut repository = repository(config()).unwrap();
        repository.add_resource(fuel(30000.0), "spent_fuel");
        repository.add_resource(fuel(40000.0), "spent_fuel");
        assert_eq!(repository.get_capacity("spent_fuel"), 0.0);
        assert_eq!(repository.make_request(), None);
    }

    #[test]
    fn capacity_shrinks_near_the_limit() {
        let mut repository = repository(config()).unwrap();
        repository.add_resource(fuel(69950.0), "spent_fuel");
        assert_eq!(repository.get_capacity("spent_fuel"), 50.0);
    }

    #[test]
    fn requests_rotate_through_commodities() {
        let mut config = config();
        config.in_commods = vec!["spent_fuel".to_string(), "mox".to_string()];
        let mut repository = repository(config).unwrap();
        let first = repository.make_request().unwrap();
        let second = repository.make_request().unwrap();
        let third = repository.make_request().unwrap();
        assert_eq!(first.commodity, "spent_fuel");
        assert_eq!(second.commodity, "mox");
        assert_eq!(third.commodity, "spent_fuel");
        assert_eq!(first.amount, 100.0);
    }

    #[test]
    fn no_requests_without_commodities_or_after_lifetime() {
        let mut config = config();
        config.in_commods.clear();
        assert_eq!(repository(config).unwrap().make_request(), None);

        let mut repository = repository(self::config()).unwrap();
        assert!(repository.handle_tick(0).unwrap().is_some());
        assert_eq!(repository.handle_tick(10).unwrap(), None);
    }

    #[test]
    fn first_tick_places_the_far_field() {
        let mut repository = repository(config()).unwrap();
        repository.handle_tick(0).unwrap();
        let far_field = repository.tree().get(repository.far_field()).unwrap();
        assert_eq!(far_field.centroid(), Point::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn first_buffer_is_loaded_into_the_far_field() {
        let repository = repository(config()).unwrap();
        assert_eq!(repository.buffers().len(), 1);
        let buffer = repository.buffers()[0];
        assert_eq!(repository.tree().parent(buffer), Some(repository.far_field()));
        assert_eq!(
            repository.tree().get(buffer).unwrap().centroid(),
            Point::new(5.0, 10.0, 5.0)
        );
    }

    #[test]
    fn template_roles_are_validated() {
        let mut missing_buffer = config();
        missing_buffer.components.remove(2);
        assert!(matches!(
            repository(missing_buffer),
            Err(CyderError::Configuration(_))
        ));

        let mut near_field = config();
        near_field.components.push(component("nf", "NF", None));
        assert!(matches!(
            repository(near_field),
            Err(CyderError::Configuration(_))
        ));

        let mut two_far_fields = config();
        two_far_fields.components.push(component("ff2", "FF", None));
        assert!(matches!(
            repository(two_far_fields),
            Err(CyderError::Configuration(_))
        ));

        let mut unknown_waste = config();
        unknown_waste.components[1].allowed_wastes = vec!["ceramic".to_string()];
        assert!(matches!(
            repository(unknown_waste),
            Err(CyderError::Configuration(_))
        ));
    }

    #[test]
    fn waste_form_without_package_template_stays_in_stock() {
        let mut config = config();
        config.components[1].allowed_wastes.clear();
        let mut repository = repository(config).unwrap();
        repository.add_resource(fuel(10.0), "spent_fuel");
        let n_components = repository.tree().len();
        assert!(matches!(
            repository.emplace_waste(1),
            Err(CyderError::Configuration(_))
        ));
        assert_eq!(repository.check_stocks(), 10.0);
        assert_eq!(repository.check_inventory(), 0.0);
        assert!(repository.waste_forms().is_empty());
        assert!(repository.current_packages().is_empty());
        assert_eq!(repository.tree().len(), n_components);
    }

    #[test]
    fn unknown_commodity_stays_in_stock() {
        let mut repository = repository(config()).unwrap();
        repository.add_resource(fuel(10.0), "plutonium");
        assert!(matches!(
            repository.emplace_waste(1),
            Err(CyderError::Configuration(_))
        ));
        assert_eq!(repository.check_stocks(), 10.0);
        assert_eq!(repository.check_inventory(), 0.0);
    }

    #[test]
    fn emplaced_waste_form_sits_at_its_package() {
        let mut repository = repository(config()).unwrap();
        repository.add_resource(fuel(10.0), "spent_fuel");
        repository.emplace_waste(1).unwrap();
        let waste_form = repository.waste_forms()[0];
        let package = repository.waste_packages()[0];
        assert_eq!(
            repository.tree().get(waste_form).unwrap().centroid(),
            repository.tree().get(package).unwrap().centroid()
        );
    }
}
