//! AS-level topology from BGP table dumps: adjacency statistics (stage 1) and degree-ratio
//! relationship inference with customer cone sizes (stage 2).

pub mod extractor;
pub mod shared;
pub mod topology;

pub use extractor::{AggregateTables, Aggregator, AggregatorConfig, ExtractConfig, Extractor, PathParser};
pub use shared::{AsRankError, NeighborSide, Relationship, Result, ASN};
pub use topology::{ConeCalculator, ConeConfig, ConeRunner, CustomerGraph, DegreeTable, RelationshipClassifier};
