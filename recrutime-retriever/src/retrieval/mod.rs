pub mod chunking_strategy;
pub mod knowledge_base;
pub mod search_engine;
pub mod term_index;
