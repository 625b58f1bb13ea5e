pub mod blocks;
pub mod delimited;
pub mod summation;
pub mod topology;
pub mod zonal;
