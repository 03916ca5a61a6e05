// Dashboard list view: interview cards fed by live collection snapshots.

pub mod card;
pub mod handlers;
pub mod view;
