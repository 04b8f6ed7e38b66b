//! Query building and the search document model

pub mod builder;
pub mod types;

pub use builder::QueryBuilder;
pub use types::{
    Aggregation, BoolQuery, Clause, Collapse, CompiledSearch, Occur, Operator, RangeOp,
    RangeParams, SearchBody, SortClause, SortOrder, SourceFilter,
};
