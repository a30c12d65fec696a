#![allow(dead_code)]

mod command;
mod expr;
mod globalref;
mod subscripts;

pub use command::{parse_line, AssignTarget, Command, ZWriteTarget};
pub use expr::{parse_value_expr, parse_value_expr_list, ExprContext, ValueExpr};
pub use globalref::split_global_ref;
pub use subscripts::{parse_path, parse_subscript_token, split_top_level};
