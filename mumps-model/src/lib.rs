#![allow(dead_code)]

mod global;
mod path;
mod subscript;
mod value;

pub use global::{is_global_name, normalize_global_name};
pub use path::Path;
pub use subscript::SubscriptElement;
pub use value::Value;
