// # State
//
// In-memory state owned by individual components. Nothing here persists
// across restarts: a fresh process starts with every IP "unknown".

pub mod current_ip;

pub use current_ip::CurrentIp;
