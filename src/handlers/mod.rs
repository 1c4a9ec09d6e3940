// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod bookings;
mod health;
mod metrics;
mod middleware;
mod root;
mod shared_types;
mod unlock;
mod webauthn_authenticate;
mod webauthn_register;

// Core handlers
pub use health::health_check;
pub use metrics::metrics_handler;
pub use root::root_handler;

// Passkey ceremonies
pub use webauthn_authenticate::{login_begin, login_finish, logout};
pub use webauthn_register::{register_begin, register_finish};

// Bookings and the door
pub use bookings::{create_booking, list_bookings};
pub use unlock::unlock_door;

// Layers
pub use middleware::{rate_limit, track_http};
