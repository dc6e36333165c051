pub mod users;
pub mod trucks;
pub mod gate;
pub mod weighbridge;
pub mod docks;
pub mod approvals;
pub mod registers;
pub mod reports;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(trucks::routes())
        .merge(gate::routes())
        .merge(weighbridge::routes())
        .merge(docks::routes())
        .merge(approvals::routes())
        .merge(registers::routes())
        .merge(reports::routes())
}
