//! Binary entrypoint for the storage simulator plugin.

use std::process::ExitCode;

use lsm_plugin_sim::SimPlugin;

fn main() -> ExitCode {
    lsm_plugin::run(std::env::args_os(), || Ok(SimPlugin::default()))
}
