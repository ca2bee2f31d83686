// ── Controller endpoint paths ──
//
// Only the endpoints the operations in this crate dispatch to. Paths are
// controller-relative; the transport joins them onto the base URL.

const IMAGE_MANAGEMENT: &str = "/appcenter/cisco/ndfc/api/v1/imagemanagement/rest";
const LAN_FABRIC: &str = "/appcenter/cisco/ndfc/api/v1/lan-fabric/rest";

/// Bulk image (ISSU) status for every switch.
pub fn image_status() -> String {
    format!("{IMAGE_MANAGEMENT}/packagemgnt/issu")
}

pub fn stage_image() -> String {
    format!("{IMAGE_MANAGEMENT}/stagingmanagement/stage-image")
}

pub fn validate_image() -> String {
    format!("{IMAGE_MANAGEMENT}/stagingmanagement/validate-image")
}

pub fn upgrade_image() -> String {
    format!("{IMAGE_MANAGEMENT}/imageupgrade/upgrade-image")
}

/// Bulk switch inventory, including `mode` / `systemMode`.
pub fn switch_inventory() -> String {
    format!("{LAN_FABRIC}/inventory/allswitches")
}

/// POST enters maintenance mode, DELETE returns to normal mode.
pub fn maintenance_mode(fabric: &str, serial: &str) -> String {
    format!("{LAN_FABRIC}/control/fabrics/{fabric}/switches/{serial}/maintenance-mode")
}

pub fn deploy_maintenance_mode(fabric: &str, serial: &str) -> String {
    format!("{LAN_FABRIC}/control/fabrics/{fabric}/switches/{serial}/deploy-maintenance-mode")
}
