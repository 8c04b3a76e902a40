//! Security rule assignment, status classification and per-user exceptions.

pub mod classifier;
pub mod exceptions;
pub mod rule_service;

pub use classifier::{
    classify_snapshot, latest_date, merge_snapshots, roll_up_reviews, select_rollup_date,
    SecurityClassifier,
};
pub use exceptions::{is_visible, ExceptionResolver, Visibility};
pub use rule_service::SecurityRuleService;
