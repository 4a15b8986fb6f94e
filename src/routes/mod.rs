/// Router Module Index
///
/// Splits the routing table by audience. Authorization never depends on which
/// router a route lives in: every handler that mutates data runs the capability
/// check itself.

/// Routes with no identity requirement (health, API data, image resources).
pub mod public;

/// The user-facing note pages and their form action.
pub mod notes;
