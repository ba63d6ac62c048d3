/*
 * This module provides data acquisition abilities for the topology core.
 * It defines the seams to the device inventory and the per-device interface fetcher,
 * plus the file-backed and replay implementations of both.
 */

pub mod core;
pub mod inventory;
pub mod snapshot;
pub mod timeout;
