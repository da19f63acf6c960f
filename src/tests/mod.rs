#[cfg(test)]
mod common;

#[cfg(test)]
mod code_tree_test;
