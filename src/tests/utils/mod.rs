pub mod controller_double;
pub mod memory_lease_store;
