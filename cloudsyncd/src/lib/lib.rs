#![allow(async_fn_in_trait)]

pub mod logging;
pub mod service;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use crate::service::{Clock, CycleReport, Service, TokioClock};
