use crate::unit_tests::{set_value, COMPONENT_NAMES};
use fenris_phasefield::error::ConfigurationError;
use fenris_phasefield::kernel::derivatives::BulkEnergyDerivatives;
use fenris_phasefield::material::MaterialPropertyStore;
use fenris_phasefield::nalgebra::Vector3;
use fenris_phasefield::{derivative_property_name, PropertyRegistry};
use util::assert_panics;

fn gather(n: usize) -> (BulkEnergyDerivatives, MaterialPropertyStore<f64>) {
    let mut store = MaterialPropertyStore::new();
    let derivatives = BulkEnergyDerivatives::gather(&mut store, "fbulk", "eta", &COMPONENT_NAMES[..n]).unwrap();
    store.resize(1);
    (derivatives, store)
}

#[test]
fn gather_declares_all_required_derivatives() {
    let (derivatives, store) = gather(2);
    let expected_names = [
        "fbulk",
        "dfbulk/deta",
        "d^2fbulk/deta^2",
        "dfbulk/ddpx",
        "d^2fbulk/ddpxdeta",
        "d^2fbulk/ddpx^2",
        "d^2fbulk/ddpxddpy",
        "dfbulk/ddpy",
        "d^2fbulk/ddpydeta",
        "d^2fbulk/ddpy^2",
    ];
    let mut names: Vec<_> = store.property_names().collect();
    let mut expected_names = expected_names.to_vec();
    names.sort_unstable();
    expected_names.sort_unstable();
    assert_eq!(names, expected_names);

    assert_eq!(derivatives.num_components(), 2);
    assert_eq!(Some(derivatives.fbulk()), store.property_id("fbulk"));
    assert_eq!(Some(derivatives.dfbulk_dvar()), store.property_id("dfbulk/deta"));
    assert_eq!(Some(derivatives.d2fbulk_dvar2()), store.property_id("d^2fbulk/deta^2"));
    assert_eq!(Some(derivatives.dfbulk_darg()[1]), store.property_id("dfbulk/ddpy"));
    assert_eq!(Some(derivatives.d2fbulk_dvar_darg()[0]), store.property_id("d^2fbulk/ddpxdeta"));
    assert_eq!(Some(derivatives.d2fbulk_darg2(0, 1)), store.property_id("d^2fbulk/ddpxddpy"));
    assert_eq!(derivatives.d2fbulk_darg2(0, 1), derivatives.d2fbulk_darg2(1, 0));
}

#[test]
fn gather_number_of_distinct_properties() {
    for n in 0..=3 {
        let (_, store) = gather(n);
        // f, df/deta, d^2f/deta^2, then df/dp_i, d^2f/deta dp_i and the upper triangle of d^2f/dp^2
        assert_eq!(store.num_properties(), 3 + 2 * n + n * (n + 1) / 2);
    }
}

#[test]
fn gather_reuses_existing_declarations() {
    let mut store = MaterialPropertyStore::<f64>::new();
    let existing = store.declare_property(&derivative_property_name("fbulk", &["eta"]));
    let derivatives = BulkEnergyDerivatives::gather(&mut store, "fbulk", "eta", &["dpx"]).unwrap();
    assert_eq!(derivatives.dfbulk_dvar(), existing);
}

#[test]
fn gather_rejects_self_coupling_in_any_position() {
    for n in 1..=3 {
        for position in 0..n {
            let mut components = COMPONENT_NAMES[..n].to_vec();
            components[position] = "eta";

            let mut store = MaterialPropertyStore::<f64>::new();
            let result = BulkEnergyDerivatives::gather(&mut store, "fbulk", "eta", &components);
            assert_eq!(
                result,
                Err(ConfigurationError::SelfCoupling {
                    parameter: "gradient_component_names".to_string(),
                    variable: "eta".to_string(),
                })
            );
            assert_eq!(store.num_properties(), 0, "Nothing may be declared on failure");
        }
    }
}

#[test]
fn gather_rejects_colliding_derivative_names() {
    // (a, db) and (ad, b) both concatenate to `daddb`
    let mut store = MaterialPropertyStore::<f64>::new();
    let result = BulkEnergyDerivatives::gather(&mut store, "F", "a", &["db", "ad", "b"]);
    assert_eq!(
        result,
        Err(ConfigurationError::AmbiguousDerivativeName {
            parameter: "gradient_component_names".to_string(),
            name: "d^2F/daddb".to_string(),
        })
    );
    assert_eq!(store.num_properties(), 0);

    // Without the colliding component the names are distinct
    let derivatives = BulkEnergyDerivatives::gather(&mut store, "F", "a", &["db", "b"]).unwrap();
    assert_eq!(derivatives.num_components(), 2);
}

#[test]
fn assemble_first_zero_fills_inactive_components() {
    let values = [4.0, 5.0, 6.0];
    let expected = [
        Vector3::zeros(),
        Vector3::new(4.0, 0.0, 0.0),
        Vector3::new(4.0, 5.0, 0.0),
        Vector3::new(4.0, 5.0, 6.0),
    ];

    for n in 0..=3 {
        let (derivatives, mut store) = gather(n);
        for k in 0..n {
            set_value(&mut store, "fbulk", &[COMPONENT_NAMES[k]], values[k]);
        }
        // Unrelated derivatives must not leak into the vector
        set_value(&mut store, "fbulk", &["eta"], -1.0);
        assert_eq!(derivatives.assemble_first(&store, 0), expected[n]);
    }
}

#[test]
fn assemble_second_row_zero_fills_inactive_components() {
    let (derivatives, mut store) = gather(2);
    set_value(&mut store, "fbulk", &["dpx", "dpx"], 1.0);
    set_value(&mut store, "fbulk", &["dpx", "dpy"], 2.0);
    set_value(&mut store, "fbulk", &["dpy", "dpy"], 3.0);

    assert_eq!(derivatives.assemble_second_row(&store, 0, 0), Vector3::new(1.0, 2.0, 0.0));
    assert_eq!(derivatives.assemble_second_row(&store, 1, 0), Vector3::new(2.0, 3.0, 0.0));

    let (derivatives, mut store) = gather(3);
    set_value(&mut store, "fbulk", &["dpz", "dpx"], 7.0);
    set_value(&mut store, "fbulk", &["dpz", "dpz"], 8.0);
    assert_eq!(derivatives.assemble_second_row(&store, 2, 0), Vector3::new(7.0, 0.0, 8.0));
}

#[test]
fn assemble_second_row_panics_for_inactive_rows() {
    for n in 0..=3 {
        let (derivatives, store) = gather(n);
        for i in n..=3 {
            assert_panics!(derivatives.assemble_second_row::<f64, _>(&store, i, 0));
        }
    }
}

#[test]
#[should_panic]
fn second_derivative_handle_panics_out_of_bounds() {
    let (derivatives, _) = gather(1);
    derivatives.d2fbulk_darg2(0, 1);
}
