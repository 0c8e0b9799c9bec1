//! # minilib-net-core
//!
//! Safe Rust logic behind the minilib-net socket and resolver helpers.
//!
//! Everything here is pure bookkeeping: `<sys/socket.h>` constants and
//! validators, the `sockaddr_in` byte layout, the fixed-buffer address list
//! used by the resolver, and the runtime configuration. The libc calls
//! themselves live in `minilib-net-abi`.

#![deny(unsafe_code)]

pub mod config;
pub mod heal;
pub mod inet;
pub mod resolv;
pub mod socket;
