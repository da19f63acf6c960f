pub mod code_tree;
pub mod kernel;
pub mod saturation;

#[cfg(test)]
mod tests;
