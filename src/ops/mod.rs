pub mod check;
pub mod tree_ops;
