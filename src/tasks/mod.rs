//! Background tasks

mod drain;

pub use drain::DrainTask;
