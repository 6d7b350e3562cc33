//! Points module - ledger models, ledger capabilities, and the ledger service.

mod points_model;
mod points_service;
mod points_traits;


pub use points_model::{
    Balance, NewPointEvent, PointEvent, PointEventKind, PointEventReason, PointsWindow,
};
pub use points_service::PointsService;
pub use points_traits::{LedgerReader, LedgerWriter, PointsServiceTrait};
