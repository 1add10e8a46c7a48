//! Unit tests for the simulator plugin.

use lsm_plugin::test_support::{ScriptedTransport, params};
use lsm_plugin::{
    Dispatcher, LsmError, OperationFailure, OperationTable, Response, Termination, error_number,
};
use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::inventory::{Inventory, Pool, SIM_SYSTEM_ID, SimulatedArray, System};
use crate::{DEFAULT_TIMEOUT_MS, PLUGIN_DESCRIPTION, SimPlugin};

mock! {
    Array {}

    impl Inventory for Array {
        fn systems(&self) -> Vec<System>;
        fn pools(&self) -> Vec<Pool>;
    }
}

fn call<I: Inventory + 'static>(
    plugin: &mut SimPlugin<I>,
    method: &str,
    arguments: Value,
) -> Result<Value, LsmError> {
    let table = OperationTable::<SimPlugin<I>>::for_plugin().expect("lifecycle ops declared");
    match table.invoke(plugin, method, Some(params(arguments))) {
        Some(Ok(value)) => Ok(value),
        Some(Err(OperationFailure::Domain(error))) => Err(error),
        Some(Err(other)) => panic!("unexpected failure: {other}"),
        None => panic!("operation {method} is not declared"),
    }
}

#[fixture]
fn registered() -> SimPlugin {
    let mut plugin = SimPlugin::default();
    call(&mut plugin, "plugin_register", json!({"uri": "sim://", "password": null, "timeout": 1500, "flags": 0}))
        .expect("registration succeeds");
    plugin
}

#[rstest]
#[case("systems", json!({}))]
#[case("pools", json!({}))]
#[case("plugin_info", json!({}))]
#[case("time_out_get", json!({}))]
#[case("time_out_set", json!({"ms": 10}))]
fn operations_require_registration(#[case] method: &str, #[case] arguments: Value) {
    let mut plugin = SimPlugin::default();

    let error = call(&mut plugin, method, arguments).expect_err("not registered");

    assert_eq!(error.code(), error_number::INVALID_ARGUMENT);
    assert_eq!(error.message(), "plugin not registered");
}

#[test]
fn rejects_foreign_uri_schemes() {
    let mut plugin = SimPlugin::default();

    let error = call(&mut plugin, "plugin_register", json!({"uri": "ontap://filer"}))
        .expect_err("scheme rejected");

    assert_eq!(error.code(), error_number::INVALID_ARGUMENT);
    assert!(error.message().contains("sim://"));
    assert!(!plugin.is_registered());
}

#[rstest]
fn register_applies_default_timeout() {
    let mut plugin = SimPlugin::default();
    call(&mut plugin, "plugin_register", json!({"uri": "sim://"})).expect("registers");

    let timeout = call(&mut plugin, "time_out_get", json!({})).expect("timeout");

    assert_eq!(timeout, json!(DEFAULT_TIMEOUT_MS));
}

#[rstest]
fn timeout_round_trips(mut registered: SimPlugin) {
    assert_eq!(call(&mut registered, "time_out_get", json!({})), Ok(json!(1500)));

    call(&mut registered, "time_out_set", json!({"ms": 45_000})).expect("set timeout");

    assert_eq!(call(&mut registered, "time_out_get", json!({})), Ok(json!(45_000)));
}

#[rstest]
fn plugin_info_reports_description_and_version(mut registered: SimPlugin) {
    let info = call(&mut registered, "plugin_info", json!({})).expect("info");

    assert_eq!(info, json!([PLUGIN_DESCRIPTION, env!("CARGO_PKG_VERSION")]));
}

#[rstest]
fn lists_the_simulated_system(mut registered: SimPlugin) {
    let systems = call(&mut registered, "systems", json!({})).expect("systems");

    assert_eq!(systems.pointer("/0/id"), Some(&json!(SIM_SYSTEM_ID)));
    assert_eq!(systems.as_array().map(Vec::len), Some(1));
}

#[rstest]
#[case(json!({}), 3)]
#[case(json!({"search_key": "id", "search_value": "POO2"}), 1)]
#[case(json!({"search_key": "system_id", "search_value": SIM_SYSTEM_ID}), 3)]
#[case(json!({"search_key": "system_id", "search_value": "sim-99"}), 0)]
fn pools_honour_search(
    mut registered: SimPlugin,
    #[case] arguments: Value,
    #[case] expected: usize,
) {
    let pools = call(&mut registered, "pools", arguments).expect("pools");

    assert_eq!(pools.as_array().map(Vec::len), Some(expected));
}

#[rstest]
fn pools_reject_unknown_search_keys(mut registered: SimPlugin) {
    let error = call(
        &mut registered,
        "pools",
        json!({"search_key": "colour", "search_value": "blue"}),
    )
    .expect_err("unsupported key");

    assert_eq!(error.code(), error_number::UNSUPPORTED_SEARCH_KEY);
}

#[rstest]
#[case("systems", json!({"flags": 1}))]
#[case("pools", json!({"flags": 4}))]
#[case("plugin_unregister", json!({"flags": 2}))]
fn reserved_flags_must_be_zero(
    mut registered: SimPlugin,
    #[case] method: &str,
    #[case] arguments: Value,
) {
    let error = call(&mut registered, method, arguments).expect_err("flags rejected");

    assert_eq!(error.code(), error_number::INVALID_ARGUMENT);
    assert!(registered.is_registered());
}

#[test]
fn systems_come_from_the_inventory() {
    let mut array = MockArray::new();
    array.expect_systems().times(1).returning(|| {
        vec![System {
            id: String::from("mock-7"),
            name: String::from("mocked"),
            status: 0,
            status_info: String::from("degraded"),
            fw_version: String::from("0.0"),
        }]
    });
    array.expect_pools().never();
    let mut plugin = SimPlugin::new(array);
    call(&mut plugin, "plugin_register", json!({"uri": "sim://mock"})).expect("registers");

    let systems = call(&mut plugin, "systems", json!({})).expect("systems");

    assert_eq!(systems.pointer("/0/id"), Some(&json!("mock-7")));
    assert_eq!(systems.pointer("/0/status_info"), Some(&json!("degraded")));
}

#[test]
fn simulated_array_pools_belong_to_its_system() {
    let pools = SimulatedArray.pools();

    assert_eq!(pools.len(), 3);
    assert!(pools.iter().all(|pool| pool.system_id == SIM_SYSTEM_ID));
    assert!(pools.iter().all(|pool| pool.free_space <= pool.total_space));
}

#[test]
fn session_ends_gracefully_through_the_dispatcher() {
    let mut transport = ScriptedTransport::new();
    transport
        .push_call("plugin_register", 1, Some(params(json!({"uri": "sim://"}))))
        .push_call("systems", 2, None)
        .push_call("plugin_unregister", 3, None);

    let termination = Dispatcher::for_plugin(SimPlugin::default(), &mut transport)
        .expect("lifecycle ops declared")
        .run();

    assert_eq!(termination, Termination::Graceful);
    assert!(matches!(transport.sent().get(1), Some(Response::Success { .. })));
    assert_eq!(transport.sent().len(), 3);
}
