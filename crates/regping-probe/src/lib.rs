//! Region registry, probing, and the cycle loop.

pub mod prober;
pub mod registry;
pub mod runner;

pub use prober::{HttpProber, ProbeSettings, RegionProber};
pub use registry::{
    fetch_registry, load_registry_file, parse_registry, select_targets, Selection,
    CLOUD_REGIONS_URL,
};
pub use runner::{run_cycles, CancelFlag, CycleEvent, RunOutcome, RunSettings};
