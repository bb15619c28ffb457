// Domain layer: aggregates, value objects and in-memory invariants
pub mod permission;
pub mod permission_group;
pub mod role;
pub mod user;
