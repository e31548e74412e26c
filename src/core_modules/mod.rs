pub mod coverage_oracle;
pub mod grid;
pub mod optimizer;
pub mod region;
pub mod regions_converter;
