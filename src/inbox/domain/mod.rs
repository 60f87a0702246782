//! Domain types for inbox filtering: conditions, contexts and saved views.

mod condition;
mod view;

pub use condition::{
    FILTERABLE_FIELDS, FilterCondition, FilterContext, FilterOperator, MatchType,
    normalize_tag_ids,
};
pub use view::{
    ALL_VIEW_KEY, CLOSED_VIEW_KEY, ConversationView, GROUPS_VIEW_KEY, ViewAccess,
    synthesize_group_views,
};
