pub mod cli;
pub mod decoder;
pub mod naming;
pub mod node;

pub fn get_version() -> String {
    "0.1.0".to_string()
}
