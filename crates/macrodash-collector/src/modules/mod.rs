//! 수집 작업 모듈.

pub mod equity_scan;
pub mod indicator_refresh;
pub mod screening_view;

pub use equity_scan::{parse_symbols, scan_exchanges};
pub use indicator_refresh::{render_catalog, render_snapshot, run_daemon, run_refresh};
pub use screening_view::{load_screening, render_rows};
