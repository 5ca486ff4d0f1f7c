// Copyright 2026 Oxide Computer Company

//! Integration tests for the specdiff server.
//!
//! These are all combined into the same file to ensure that a single binary is
//! generated, speeding up link times.

#[macro_use]
extern crate slog;

mod breaking;
mod common;
mod diff;
mod failures;
mod slow_clients;
