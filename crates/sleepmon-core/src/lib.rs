//! Hardware-independent core library for sleepmon
//!
//! This crate contains all platform-agnostic logic for the sleepmon sensor
//! node: the fixed-capacity sensor event log and its export path, the
//! persisted Wi-Fi settings record, the network provisioning state machine and
//! the cloud relay registration client.
//!
//! Radio, captive portal, TLS and sensor hardware are reached only through the
//! traits in [`network`], [`sensors`] and [`storage`], so the crate compiles on
//! embedded targets and on desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod config;
pub mod network;
pub mod sampling;
pub mod sensors;
pub mod storage;

#[cfg(test)]
mod mock;
