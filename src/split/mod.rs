pub mod imbalanced_split;
pub mod layout;
pub mod sampling;
