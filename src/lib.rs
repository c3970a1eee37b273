#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod beach;
mod builder;
mod circle;
mod exact;
mod geom;
mod num;
mod predicates;
mod site;

pub mod diagram;

pub use builder::Builder;
pub use diagram::Diagram;
pub use geom::{Point, Segment};
pub use site::SourceCategory;
