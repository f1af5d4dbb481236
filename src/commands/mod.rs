mod generate;
mod inspect;

pub use generate::run_generate;
pub use inspect::run_inspect;
