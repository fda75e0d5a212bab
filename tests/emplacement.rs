//! Emplacement of waste streams into packages, buffers and the far field.

use std::sync::Arc;

use approx::assert_relative_eq;
use cyder::config::RepositoryConfig;
use cyder::repository::Repository;
use cyder_core::geometry::Point;
use cyder_core::material::Material;
use cyder_core::properties::MaterialTable;
use cyder_core::types::CompMap;

fn config(package_capacity: usize, buffer_capacity: usize) -> RepositoryConfig {
    let toml = format!(
        r#"
x = 20.0
y = 20.0
z = 20.0
dx = 10.0
dy = 2.0
dz = 5.0
capacity = 1000.0
inventory_size = 70000.0
lifetime = 120
in_commods = ["spent_fuel"]

[[components]]
name = "glass"
component_type = "WF"
inner_radius = 0.0
outer_radius = 0.25
length = 1.0
allowed_commods = ["spent_fuel"]
[components.nuclide_model]
model = "StubNuclide"

[[components]]
name = "canister"
component_type = "WP"
inner_radius = 0.25
outer_radius = 0.5
length = 1.0
capacity = {package_capacity}
allowed_wastes = ["glass"]
[components.nuclide_model]
model = "StubNuclide"

[[components]]
name = "bentonite"
component_type = "BUFFER"
inner_radius = 0.5
outer_radius = 1.0
length = 1.0
capacity = {buffer_capacity}
[components.nuclide_model]
model = "StubNuclide"

[[components]]
name = "granite"
component_type = "FF"
inner_radius = 1.0
outer_radius = inf
length = 20.0
[components.nuclide_model]
model = "StubNuclide"
"#
    );
    RepositoryConfig::from_toml_str(&toml).unwrap()
}

fn repository(package_capacity: usize, buffer_capacity: usize) -> Repository {
    Repository::from_config(
        config(package_capacity, buffer_capacity),
        Arc::new(MaterialTable::new()),
    )
    .unwrap()
}

fn fuel(mass: f64) -> Material {
    Material::from_composition(&CompMap::from([(92235, 0.05), (92238, 0.95)]), mass).unwrap()
}

mod filling {
    use super::*;

    #[test]
    fn streams_fill_buffers_until_the_footprint_is_used() {
        let mut repository = repository(1, 1);
        repository.handle_tick(0).unwrap();
        for mass in [1.0, 2.0, 3.0, 4.0] {
            repository.add_resource(fuel(mass), "spent_fuel");
        }
        repository.handle_tock(1).unwrap();

        assert!(repository.is_full());
        assert_eq!(repository.buffers().len(), 2);
        assert_eq!(repository.waste_packages().len(), 2);
        // The third package could not be emplaced
        assert_eq!(repository.current_packages().len(), 1);
        assert_eq!(repository.waste_forms().len(), 3);

        // Oldest streams are conditioned first, the newest waits in stock
        assert_relative_eq!(repository.check_inventory(), 6.0, max_relative = 1e-12);
        assert_relative_eq!(repository.check_stocks(), 4.0, max_relative = 1e-12);
        assert_eq!(repository.get_capacity("spent_fuel"), 0.0);
        assert_eq!(repository.make_request(), None);
    }

    #[test]
    fn buffers_are_spaced_along_x() {
        let mut repository = repository(1, 1);
        repository.handle_tick(0).unwrap();
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.handle_tock(1).unwrap();

        let tree = repository.tree();
        let centroids: Vec<Point> = repository
            .buffers()
            .iter()
            .map(|b| tree.get(*b).unwrap().centroid())
            .collect();
        assert_eq!(
            centroids,
            vec![Point::new(5.0, 10.0, 5.0), Point::new(15.0, 10.0, 5.0)]
        );
        for buffer in repository.buffers() {
            assert_eq!(tree.parent(*buffer), Some(repository.far_field()));
        }
    }

    #[test]
    fn packages_are_reused_until_full() {
        let mut repository = repository(2, 1);
        repository.handle_tick(0).unwrap();
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.handle_tock(1).unwrap();
        assert_eq!(repository.current_packages().len(), 1);
        assert!(repository.waste_packages().is_empty());

        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.handle_tock(2).unwrap();
        assert!(repository.current_packages().is_empty());
        assert_eq!(repository.waste_packages().len(), 1);

        let tree = repository.tree();
        let package = repository.waste_packages()[0];
        assert_eq!(tree.children(package), repository.waste_forms().to_vec());
        assert!(!repository.is_full());
    }
}

mod placement {
    use super::*;

    #[test]
    fn packages_and_forms_follow_their_buffer() {
        let mut repository = repository(1, 2);
        repository.handle_tick(0).unwrap();
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.handle_tock(1).unwrap();

        let tree = repository.tree();
        assert_eq!(repository.buffers().len(), 1);
        let packages = repository.waste_packages();
        assert_eq!(
            tree.get(packages[0]).unwrap().centroid(),
            Point::new(5.0, 1.0, 5.0)
        );
        assert_eq!(
            tree.get(packages[1]).unwrap().centroid(),
            Point::new(5.0, 3.0, 5.0)
        );
        for (form, package) in repository.waste_forms().iter().zip(packages) {
            assert_eq!(tree.parent(*form), Some(*package));
            assert_eq!(
                tree.get(*form).unwrap().centroid(),
                tree.get(*package).unwrap().centroid()
            );
        }
    }

    #[test]
    fn copies_get_fresh_identities() {
        let mut repository = repository(1, 1);
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.add_resource(fuel(1.0), "spent_fuel");
        repository.handle_tock(1).unwrap();

        let tree = repository.tree();
        let mut ids: Vec<u64> = repository
            .waste_forms()
            .iter()
            .chain(repository.waste_packages())
            .chain(repository.buffers())
            .map(|i| tree.get(*i).unwrap().id())
            .collect();
        let n_components = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n_components);
        assert_eq!(tree.get(repository.waste_forms()[0]).unwrap().name(), "glass");
    }
}
