// Entity Models
//
// Account owns the balance; Movement is the immutable record of each change.

pub mod account;
pub mod movement;

pub use account::Account;
pub use movement::{Movement, MovementKind, UnknownMovementKind};
