#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
pub mod codes;
pub mod data;
pub mod export;
pub mod features;
pub mod impute;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod scores;
pub mod validate;
