//! End-to-end and adversarial test suite for the Locker vault.
//!
//! Scenarios drive a full [`Runtime`](locker_node_lib::Runtime) through deposit,
//! reward, and withdrawal round-trips and check payouts to the unit. The
//! adversarial suite throws spoofed senders and garbage bodies at the actors.

pub mod helpers;
