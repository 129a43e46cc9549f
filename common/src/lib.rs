// SPDX-License-Identifier: MIT

//! Domain logic of the Hub monitoring dashboard.
//!
//! Everything in here is UI-free: the desktop app converts these types into
//! Slint structs and forwards user input back into them.

pub mod api;
pub mod auth;
pub mod bim;
pub mod config;
pub mod dashboard;
pub mod plugin;
pub mod sensor;
