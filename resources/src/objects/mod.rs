use std::collections::HashMap;

pub mod function;
pub mod metrics;

pub type Labels = HashMap<String, String>;
