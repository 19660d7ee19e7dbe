pub mod fixtures;
pub mod test_helpers;
