//! Storage objects reported by the simulator.

use lsm_plugin::SearchableRecord;
use serde::Serialize;

/// System status bit meaning "operating normally".
pub const SYSTEM_STATUS_OK: u32 = 1 << 1;

/// Pool status bit meaning "operating normally".
pub const POOL_STATUS_OK: u64 = 1 << 1;

/// Pool element type bit: the pool can host volumes.
pub const POOL_ELEMENT_TYPE_VOLUME: u64 = 1 << 1;

/// A storage system (array or controller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct System {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Status bit field.
    pub status: u32,
    /// Free-form status detail.
    pub status_info: String,
    /// Firmware version string.
    pub fw_version: String,
}

/// A storage pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pool {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Kinds of element the pool can create.
    pub element_type: u64,
    /// Actions the pool does not support.
    pub unsupported_actions: u64,
    /// Capacity in bytes.
    pub total_space: u64,
    /// Unallocated capacity in bytes.
    pub free_space: u64,
    /// Status bit field.
    pub status: u64,
    /// Free-form status detail.
    pub status_info: String,
    /// Identifier of the owning system.
    pub system_id: String,
}

impl SearchableRecord for Pool {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id"];

    fn search_value(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "system_id" => Some(self.system_id.clone()),
            _ => None,
        }
    }
}

/// Source of the objects a simulator session reports.
pub trait Inventory {
    /// Lists storage systems.
    fn systems(&self) -> Vec<System>;

    /// Lists storage pools.
    fn pools(&self) -> Vec<Pool>;
}

/// Identifier of the single simulated system.
pub const SIM_SYSTEM_ID: &str = "sim-01";

const GIB: u64 = 1 << 30;

/// Fixed in-memory array: one system with three pools.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedArray;

impl Inventory for SimulatedArray {
    fn systems(&self) -> Vec<System> {
        vec![System {
            id: SIM_SYSTEM_ID.to_owned(),
            name: String::from("LSM simulated storage plug-in"),
            status: SYSTEM_STATUS_OK,
            status_info: String::new(),
            fw_version: String::from(env!("CARGO_PKG_VERSION")),
        }]
    }

    fn pools(&self) -> Vec<Pool> {
        [("POO1", "Pool 1", 2048), ("POO2", "Pool 2", 4096), ("POO3", "Pool 3", 8192)]
            .into_iter()
            .map(|(id, name, total_gib)| Pool {
                id: id.to_owned(),
                name: name.to_owned(),
                element_type: POOL_ELEMENT_TYPE_VOLUME,
                unsupported_actions: 0,
                total_space: total_gib * GIB,
                free_space: total_gib * GIB,
                status: POOL_STATUS_OK,
                status_info: String::new(),
                system_id: SIM_SYSTEM_ID.to_owned(),
            })
            .collect()
    }
}
