pub mod error;
pub mod table;
pub mod config;
pub mod csv_io;
pub mod html;
pub mod dates;
pub mod cleaner;
pub mod text_anonymizer;
pub mod identifiers;
pub mod text_column;
pub mod metrics;
pub mod segment;
pub mod pipeline;
pub mod query;
