pub mod annotation;
pub mod bar;
pub mod interaction_mode;
pub mod point;
