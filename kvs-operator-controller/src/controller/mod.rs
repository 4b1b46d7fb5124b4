// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

pub mod context;
pub mod dispatch;
pub mod events;
pub mod keyvault_secret;
pub mod materializer;
pub mod object_key;
pub mod traits;
pub mod utils;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{start, Dispatcher};
pub use keyvault_secret::{reconcile, ReconcileOutcome};
