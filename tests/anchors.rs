
#[path = "anchors/fallback_direction.rs"]
pub mod fallback_direction;

#[path = "anchors/scan_bounds.rs"]
pub mod scan_bounds;

#[path = "anchors/startup_logging.rs"]
pub mod startup_logging;

#[path = "anchors/store_write_once.rs"]
pub mod store_write_once;
